//! Expression checking.

use indexmap::IndexMap;

use crate::ast::{self, ExprKind, Literal};
use crate::checked::{Callee, CheckedExpr, CheckedExprKind, InstanceRef};
use crate::data_type::DataType;
use crate::decl::DeclKind;
use crate::error::SemaError;
use crate::generic::{GenericParam, Substitution, infer_generic_args};
use crate::operator::{BinaryOp, UnaryOp};
use crate::resolver::CastDecision;
use crate::scope::ScopeId;
use crate::span::Span;
use crate::symbol::{DeclId, LocalId, SymbolKind, SymbolRef};

use super::{Analyzer, BodyCtx};

/// Overload candidate that accepted the arguments.
struct Attempt {
    decl: DeclId,
    generic_args: Vec<DataType>,
    param_types: Vec<DataType>,
    return_type: DataType,
    casts: Vec<CastDecision>,
}

impl Attempt {
    fn cost(&self) -> usize {
        self.casts.iter().filter(|c| **c != CastDecision::NoCast).count()
    }
}

fn type_list(types: impl Iterator<Item = DataType>) -> String {
    types.map(|dt| dt.to_string()).collect::<Vec<_>>().join(", ")
}

impl Analyzer {
    pub(crate) fn check_expr(
        &mut self,
        expr: &ast::Expr,
        expected: Option<&DataType>,
        scope: ScopeId,
        ctx: &BodyCtx,
    ) -> CheckedExpr {
        let span = expr.span;
        match &expr.kind {
            ExprKind::Literal(lit) => self.check_literal(lit, expected, span),
            ExprKind::Identifier(name) => self.check_path(&[name.as_str()], span, scope, ctx),
            ExprKind::Path(segments) => {
                let path: Vec<&str> = segments.iter().map(String::as_str).collect();
                self.check_path(&path, span, scope, ctx)
            }
            ExprKind::Call {
                callee,
                generic_args,
                args,
            } => self.check_call(callee, generic_args, args, span, scope, ctx),
            ExprKind::MethodCall {
                receiver,
                method,
                generic_args,
                args,
            } => self.check_method_call(receiver, method, generic_args, args, span, scope, ctx),
            ExprKind::RecordInit {
                name,
                generic_args,
                fields,
            } => self.check_record_init(name, generic_args, fields, expected, span, scope, ctx),
            ExprKind::VariantInit {
                enum_name,
                generic_args,
                variant,
                payload,
            } => self.check_variant_init(
                enum_name,
                generic_args,
                variant,
                payload.as_deref(),
                expected,
                span,
                scope,
                ctx,
            ),
            ExprKind::Field { base, field } => {
                let base = self.check_expr(base, None, scope, ctx);
                let field_type = self.resolver().field_type(&base.data_type, field);
                let data_type = field_type.unwrap_or_else(|err| {
                    self.report(err, span);
                    DataType::Unknown
                });
                CheckedExpr::new(
                    CheckedExprKind::Field {
                        base: Box::new(base),
                        field: field.clone(),
                    },
                    data_type,
                    span,
                )
            }
            ExprKind::Binary { op, lhs, rhs } => self.check_binary(*op, lhs, rhs, span, scope, ctx),
            ExprKind::Unary { op, operand } => {
                let hint = match op {
                    UnaryOp::Neg | UnaryOp::BitNot => expected,
                    _ => None,
                };
                let operand = self.check_expr(operand, hint, scope, ctx);
                let result = self
                    .operators
                    .check_unary(&self.resolver(), *op, &operand.data_type);
                let data_type = result.unwrap_or_else(|err| {
                    self.report(err, span);
                    DataType::Unknown
                });
                CheckedExpr::new(
                    CheckedExprKind::Unary {
                        op: *op,
                        operand: Box::new(operand),
                    },
                    data_type,
                    span,
                )
            }
            ExprKind::Cast { expr, data_type } => {
                let target = self.resolve_type(data_type, scope, &ctx.generics, span);
                let inner = self.check_expr(expr, None, scope, ctx);
                let decision = self.resolver().explicit_cast(&inner.data_type, &target);
                let cast = decision.unwrap_or_else(|err| {
                    self.report(err, span);
                    CastDecision::NoCast
                });
                CheckedExpr::new(
                    CheckedExprKind::Cast {
                        expr: Box::new(inner),
                        cast,
                    },
                    target,
                    span,
                )
            }
            ExprKind::Tuple(items) => {
                let hints: Vec<DataType> = match expected.map(|e| self.resolver().value_type(e)) {
                    Some(DataType::Tuple(hints)) if hints.len() == items.len() => hints,
                    _ => Vec::new(),
                };
                let items: Vec<CheckedExpr> = items
                    .iter()
                    .enumerate()
                    .map(|(i, item)| self.check_expr(item, hints.get(i), scope, ctx))
                    .collect();
                let data_type =
                    DataType::Tuple(items.iter().map(|i| self.value_type_of(i)).collect());
                CheckedExpr::new(CheckedExprKind::Tuple(items), data_type, span)
            }
            ExprKind::List(items) => {
                let hint = match expected.map(|e| self.resolver().value_type(e)) {
                    Some(DataType::List(element)) => Some(*element),
                    _ => None,
                };
                let (items, element) = self.check_elements(items, hint, scope, ctx);
                CheckedExpr::new(CheckedExprKind::List(items), DataType::list(element), span)
            }
            ExprKind::Array(items) => {
                let hint = match expected.map(|e| self.resolver().value_type(e)) {
                    Some(DataType::Array(array)) => Some(*array.element),
                    _ => None,
                };
                let len = items.len() as u64;
                let (items, element) = self.check_elements(items, hint, scope, ctx);
                CheckedExpr::new(
                    CheckedExprKind::Array(items),
                    DataType::sized_array(element, len),
                    span,
                )
            }
        }
    }

    /// Type a value is stored with: captured locals are read through
    /// their virtual reference.
    pub(crate) fn value_type_of(&self, expr: &CheckedExpr) -> DataType {
        match &expr.kind {
            CheckedExprKind::Local { captured: true, .. } => {
                self.resolver().value_type(&expr.data_type)
            }
            _ => expr.data_type.clone(),
        }
    }

    fn check_literal(&mut self, lit: &Literal, expected: Option<&DataType>, span: Span) -> CheckedExpr {
        let expected = expected.map(|e| self.resolver().value_type(e));
        let data_type = match lit {
            Literal::Bool(_) => DataType::Bool,
            Literal::Char(_) => DataType::Char,
            Literal::Str(_) => DataType::Str,
            Literal::Unit => DataType::Unit,
            Literal::Int {
                suffix: Some(suffix),
                ..
            }
            | Literal::Float {
                suffix: Some(suffix),
                ..
            } => suffix.clone(),
            Literal::Int { suffix: None, .. } => match expected {
                Some(dt) if dt.is_numeric() => dt,
                _ => DataType::Int32,
            },
            Literal::Float { suffix: None, .. } => match expected {
                Some(dt) if dt.is_float() => dt,
                _ => DataType::Float64,
            },
        };
        CheckedExpr::new(CheckedExprKind::Literal(lit.clone()), data_type, span)
    }

    // ------------------------------------------------------------------
    // Names
    // ------------------------------------------------------------------

    fn check_path(&mut self, path: &[&str], span: Span, scope: ScopeId, ctx: &BodyCtx) -> CheckedExpr {
        let found = self
            .scopes
            .lookup_path(scope, path)
            .map(|hit| (hit.symbol.kind, hit.symbol.targets()));
        let (kind, targets) = match found {
            Ok(found) => found,
            Err(err) => {
                self.report(err, span);
                return CheckedExpr::error(span);
            }
        };
        match (kind, targets.first().copied()) {
            (SymbolKind::Variable | SymbolKind::Param, Some(SymbolRef::Local(local))) => {
                self.use_local(local, scope, span)
            }
            (SymbolKind::Constant, Some(SymbolRef::Decl(id))) => {
                let data_type = match &self.decls.get(id).kind {
                    DeclKind::Constant { data_type } => data_type.clone(),
                    _ => DataType::Unknown,
                };
                CheckedExpr::new(CheckedExprKind::Constant(id), data_type, span)
            }
            (SymbolKind::Fun | SymbolKind::Method, Some(SymbolRef::Decl(id))) => {
                self.fun_ref(id, span, ctx)
            }
            _ => {
                self.report(
                    SemaError::UnknownSymbol {
                        name: path.join("."),
                    },
                    span,
                );
                CheckedExpr::error(span)
            }
        }
    }

    pub(crate) fn use_local(&mut self, id: LocalId, scope: ScopeId, span: Span) -> CheckedExpr {
        let local = self.locals.get(id).clone();
        let captured = local.scope != scope && self.scopes.get(scope).kind.is_compound();
        let data_type = match self.vscopes.for_scope(scope) {
            Some(vscope) if captured => self.vscopes.capture(vscope, id, &local),
            _ => local.data_type.clone(),
        };
        CheckedExpr::new(
            CheckedExprKind::Local {
                local: id,
                captured,
            },
            data_type,
            span,
        )
    }

    /// Function used as a value. Generic parameters that cannot be known
    /// here become compiler placeholders.
    fn fun_ref(&mut self, id: DeclId, span: Span, ctx: &BodyCtx) -> CheckedExpr {
        let decl = self.decls.get(id);
        let Some(fun) = decl.kind.as_fun() else {
            return CheckedExpr::error(span);
        };
        let fun = fun.clone();
        let params = decl.generic_params.clone();
        let args: Vec<DataType> = params.iter().map(|_| self.namer.fresh()).collect();
        let subst = positional(&params, &args);
        let data_type = DataType::lambda(
            fun.params
                .iter()
                .map(|p| self.resolver().resolve_with(&p.data_type, &subst))
                .collect(),
            self.resolver().resolve_with(&fun.return_type, &subst),
        );
        let signature = self.request_instance(ctx, id, args, span);
        CheckedExpr::new(
            CheckedExprKind::FunRef(InstanceRef {
                decl: id,
                signature,
            }),
            data_type,
            span,
        )
    }

    // ------------------------------------------------------------------
    // Calls
    // ------------------------------------------------------------------

    fn check_call(
        &mut self,
        callee: &ast::Expr,
        generic_args: &[DataType],
        args: &[ast::Expr],
        span: Span,
        scope: ScopeId,
        ctx: &BodyCtx,
    ) -> CheckedExpr {
        let path: Option<Vec<&str>> = match &callee.kind {
            ExprKind::Identifier(name) => Some(vec![name.as_str()]),
            ExprKind::Path(segments) => Some(segments.iter().map(String::as_str).collect()),
            _ => None,
        };
        if let Some(path) = &path {
            let found = self
                .scopes
                .lookup_path(scope, path)
                .map(|hit| (hit.symbol.kind, hit.symbol.targets()));
            if let Ok((kind, targets)) = found {
                if kind.is_callable() {
                    let candidates: Vec<DeclId> = targets
                        .into_iter()
                        .filter_map(|t| match t {
                            SymbolRef::Decl(id) => Some(id),
                            SymbolRef::Local(_) => None,
                        })
                        .collect();
                    let explicit: Vec<DataType> = generic_args
                        .iter()
                        .map(|a| self.resolve_type(a, scope, &ctx.generics, span))
                        .collect();
                    let name = path.join(".");
                    return self.call_overloaded(&name, candidates, &explicit, None, args, span, scope, ctx);
                }
            }
        }

        // Call through a lambda value.
        let callee = self.check_expr(callee, None, scope, ctx);
        let lambda = match self.resolver().value_type(&callee.data_type) {
            DataType::Lambda(lambda) => Some(lambda),
            _ => None,
        };
        let checked_args: Vec<CheckedExpr> = args
            .iter()
            .enumerate()
            .map(|(i, arg)| {
                let hint = lambda.as_ref().and_then(|l| l.params.get(i)).cloned();
                self.check_expr(arg, hint.as_ref(), scope, ctx)
            })
            .collect();
        let data_type = match lambda {
            Some(lambda) if lambda.params.len() == checked_args.len() => {
                let args = checked_args
                    .into_iter()
                    .zip(&lambda.params)
                    .map(|(arg, param)| self.coerce(arg, param))
                    .collect();
                return CheckedExpr::new(
                    CheckedExprKind::Call {
                        callee: Callee::Value(Box::new(callee)),
                        args,
                    },
                    *lambda.return_type,
                    span,
                );
            }
            _ if callee.data_type.is_unknown() => DataType::Unknown,
            _ => {
                let found = DataType::lambda(
                    checked_args.iter().map(|a| a.data_type.clone()).collect(),
                    DataType::Unknown,
                );
                self.report(
                    SemaError::TypeMismatch {
                        expected: callee.data_type.clone(),
                        found,
                    },
                    span,
                );
                DataType::Unknown
            }
        };
        CheckedExpr::new(
            CheckedExprKind::Call {
                callee: Callee::Value(Box::new(callee)),
                args: checked_args,
            },
            data_type,
            span,
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn check_method_call(
        &mut self,
        receiver: &ast::Expr,
        method: &str,
        generic_args: &[DataType],
        args: &[ast::Expr],
        span: Span,
        scope: ScopeId,
        ctx: &BodyCtx,
    ) -> CheckedExpr {
        let receiver = self.check_expr(receiver, None, scope, ctx);
        let receiver_type = self.resolver().value_type(&receiver.data_type);
        if receiver_type.is_unknown() {
            for arg in args {
                self.check_expr(arg, None, scope, ctx);
            }
            return CheckedExpr::error(span);
        }
        let class = self
            .decls
            .of_custom(&receiver_type)
            .filter(|decl| matches!(decl.kind, DeclKind::Class { .. }))
            .and_then(|decl| self.scopes.scope_of(decl.id));
        let symbol = class.and_then(|class_scope| {
            let symbol = self.scopes.get(class_scope).symbols.get(method)?;
            Some((class_scope, symbol.visibility, symbol.targets()))
        });
        let Some((class_scope, visibility, targets)) = symbol else {
            self.report(
                SemaError::UnknownSymbol {
                    name: format!("{receiver_type}.{method}"),
                },
                span,
            );
            return CheckedExpr::error(span);
        };
        if !visibility.is_public() && !self.scopes.is_ancestor_or_self(class_scope, scope) {
            self.report(
                SemaError::PrivateSymbol {
                    name: format!("{receiver_type}.{method}"),
                },
                span,
            );
        }
        let candidates = targets
            .into_iter()
            .filter_map(|t| match t {
                SymbolRef::Decl(id) => Some(id),
                SymbolRef::Local(_) => None,
            })
            .collect();
        let explicit: Vec<DataType> = generic_args
            .iter()
            .map(|a| self.resolve_type(a, scope, &ctx.generics, span))
            .collect();
        let name = format!("{receiver_type}.{method}");
        self.call_overloaded(&name, candidates, &explicit, Some(receiver), args, span, scope, ctx)
    }

    /// Overload resolution: every candidate whose parameters accept the
    /// arguments qualifies; the one needing the fewest implicit casts
    /// wins, declaration order breaking ties.
    #[allow(clippy::too_many_arguments)]
    fn call_overloaded(
        &mut self,
        name: &str,
        candidates: Vec<DeclId>,
        explicit: &[DataType],
        receiver: Option<CheckedExpr>,
        args: &[ast::Expr],
        span: Span,
        scope: ScopeId,
        ctx: &BodyCtx,
    ) -> CheckedExpr {
        let mut checked: Vec<CheckedExpr> = receiver.into_iter().collect();
        let offset = checked.len();
        let arity = args.len() + offset;

        // A single candidate of the right arity gives literal arguments
        // their expected type.
        let mut fitting = candidates.iter().filter(|id| {
            self.decls
                .get(**id)
                .kind
                .as_fun()
                .is_some_and(|f| f.params.len() == arity)
        });
        let hints: Vec<DataType> = match (fitting.next(), fitting.next()) {
            (Some(id), None) => self
                .decls
                .get(*id)
                .kind
                .as_fun()
                .map(|f| f.params.iter().map(|p| p.data_type.clone()).collect())
                .unwrap_or_default(),
            _ => Vec::new(),
        };
        for (i, arg) in args.iter().enumerate() {
            let hint = hints.get(i + offset).filter(|dt| !dt.contains_generic()).cloned();
            let arg = self.check_expr(arg, hint.as_ref(), scope, ctx);
            checked.push(arg);
        }

        let mut best: Option<Attempt> = None;
        let mut first_error = None;
        for &id in &candidates {
            match self.try_candidate(id, explicit, &checked) {
                Ok(attempt) => {
                    if best.as_ref().is_none_or(|b| attempt.cost() < b.cost()) {
                        best = Some(attempt);
                    }
                }
                Err(err) => {
                    first_error.get_or_insert(err);
                }
            }
        }

        let Some(attempt) = best else {
            let err = match (candidates.len(), first_error) {
                (1, Some(err)) => err,
                _ => SemaError::UnknownSymbol {
                    name: format!(
                        "{name}({})",
                        type_list(checked.iter().map(|a| a.data_type.clone()))
                    ),
                },
            };
            if !checked.iter().any(|a| a.data_type.contains_unknown()) {
                self.report(err, span);
            }
            return CheckedExpr::error(span);
        };

        let signature = self.request_instance(ctx, attempt.decl, attempt.generic_args, span);
        let args = checked
            .into_iter()
            .zip(attempt.casts)
            .zip(attempt.param_types)
            .map(|((arg, cast), param)| match cast {
                CastDecision::NoCast => arg,
                cast => {
                    let arg_span = arg.span;
                    CheckedExpr::new(
                        CheckedExprKind::ImplicitCast {
                            expr: Box::new(arg),
                            cast,
                        },
                        param.strip_mut().clone(),
                        arg_span,
                    )
                }
            })
            .collect();
        CheckedExpr::new(
            CheckedExprKind::Call {
                callee: Callee::Fun(InstanceRef {
                    decl: attempt.decl,
                    signature,
                }),
                args,
            },
            attempt.return_type,
            span,
        )
    }

    fn try_candidate(
        &mut self,
        id: DeclId,
        explicit: &[DataType],
        args: &[CheckedExpr],
    ) -> Result<Attempt, SemaError> {
        let decl = self.decls.get(id);
        let Some(fun) = decl.kind.as_fun() else {
            return Err(SemaError::UnknownSymbol {
                name: decl.name.clone(),
            });
        };
        let fun = fun.clone();
        let params = decl.generic_params.clone();
        let decl_name = decl.name.clone();
        let class_generics = fun
            .class
            .map(|class| self.decls.get(class).generic_params.len())
            .unwrap_or(0);

        if fun.params.len() != args.len() {
            return Err(SemaError::TypeMismatch {
                expected: DataType::lambda(
                    fun.params.iter().map(|p| p.data_type.clone()).collect(),
                    fun.return_type.clone(),
                ),
                found: DataType::lambda(
                    args.iter().map(|a| a.data_type.clone()).collect(),
                    DataType::Unknown,
                ),
            });
        }

        let mut inferred = IndexMap::new();
        for (param, arg) in fun.params.iter().zip(args) {
            infer_generic_args(&param.data_type, &arg.data_type, &params, &mut inferred);
        }
        let generic_args: Vec<DataType> = if explicit.is_empty() {
            params
                .iter()
                .map(|p| match inferred.get(p.name()) {
                    Some(dt) => dt.clone(),
                    None => self.namer.fresh(),
                })
                .collect()
        } else if explicit.len() == params.len() {
            explicit.to_vec()
        } else if explicit.len() + class_generics == params.len() {
            // Class arguments come from the receiver.
            params[..class_generics]
                .iter()
                .map(|p| inferred.get(p.name()).cloned().unwrap_or(DataType::Unknown))
                .chain(explicit.iter().cloned())
                .collect()
        } else {
            return Err(SemaError::GenericArity {
                name: decl_name,
                expected: params.len() - class_generics,
                found: explicit.len(),
            });
        };

        let subst = positional(&params, &generic_args);
        let resolver = self.resolver();
        let param_types: Vec<DataType> = fun
            .params
            .iter()
            .map(|p| resolver.resolve_with(&p.data_type, &subst))
            .collect();
        let casts = args
            .iter()
            .zip(&param_types)
            .map(|(arg, param)| resolver.implicit_cast(&arg.data_type, param))
            .collect::<Result<Vec<_>, _>>()?;
        let return_type = resolver.resolve_with(&fun.return_type, &subst);
        Ok(Attempt {
            decl: id,
            generic_args,
            param_types,
            return_type,
            casts,
        })
    }

    // ------------------------------------------------------------------
    // Record and variant construction
    // ------------------------------------------------------------------

    /// Resolves a record, class or enum name used in an expression.
    pub(crate) fn lookup_type_decl(
        &mut self,
        name: &str,
        accept: impl Fn(&DeclKind) -> bool,
        scope: ScopeId,
        span: Span,
    ) -> Option<DeclId> {
        let path: Vec<&str> = name.split('.').collect();
        let found = self
            .scopes
            .lookup_path(scope, &path)
            .map(|hit| hit.symbol.first());
        match found {
            Ok(SymbolRef::Decl(id)) if accept(&self.decls.get(id).kind) => Some(id),
            Ok(_) => {
                self.report(
                    SemaError::UnknownSymbol {
                        name: name.to_string(),
                    },
                    span,
                );
                None
            }
            Err(err) => {
                self.report(err, span);
                None
            }
        }
    }

    /// Generic arguments written at a construction site, or taken from
    /// the expected type when it names the same declaration.
    fn known_generic_args(
        &mut self,
        id: DeclId,
        written: &[DataType],
        expected: Option<&DataType>,
        span: Span,
        scope: ScopeId,
        ctx: &BodyCtx,
    ) -> Option<Vec<DataType>> {
        let decl = self.decls.get(id);
        let (count, global_name, name) = (
            decl.generic_params.len(),
            decl.global_name.clone(),
            decl.name.clone(),
        );
        if !written.is_empty() {
            if written.len() != count {
                self.report(
                    SemaError::GenericArity {
                        name,
                        expected: count,
                        found: written.len(),
                    },
                    span,
                );
                return None;
            }
            return Some(
                written
                    .iter()
                    .map(|a| self.resolve_type(a, scope, &ctx.generics, span))
                    .collect(),
            );
        }
        match expected.map(|e| self.resolver().value_type(e)) {
            Some(DataType::Custom(custom))
                if custom.name == global_name && custom.generic_args.len() == count =>
            {
                Some(custom.generic_args)
            }
            _ => None,
        }
    }

    fn complete_generic_args(
        &mut self,
        params: &[GenericParam],
        inferred: &IndexMap<String, DataType>,
    ) -> Vec<DataType> {
        params
            .iter()
            .map(|p| match inferred.get(p.name()) {
                Some(dt) => dt.clone(),
                None => self.namer.fresh(),
            })
            .collect()
    }

    #[allow(clippy::too_many_arguments)]
    fn check_record_init(
        &mut self,
        name: &str,
        generic_args: &[DataType],
        fields: &[ast::FieldInit],
        expected: Option<&DataType>,
        span: Span,
        scope: ScopeId,
        ctx: &BodyCtx,
    ) -> CheckedExpr {
        let accept = |kind: &DeclKind| matches!(kind, DeclKind::Record { .. } | DeclKind::Class { .. });
        let Some(id) = self.lookup_type_decl(name, accept, scope, span) else {
            for field in fields {
                self.check_expr(&field.value, None, scope, ctx);
            }
            return CheckedExpr::error(span);
        };
        let known = self.known_generic_args(id, generic_args, expected, span, scope, ctx);
        let decl = self.decls.get(id);
        let declared = decl.kind.fields().to_vec();
        let params = decl.generic_params.clone();
        let global_name = decl.global_name.clone();
        let known_subst = known.as_ref().map(|args| positional(&params, args));

        let mut values: Vec<(String, CheckedExpr, Option<DataType>)> = Vec::new();
        for init in fields {
            if values.iter().any(|(n, _, _)| *n == init.name) {
                self.report(
                    SemaError::DuplicateSymbol {
                        name: format!("{name}.{}", init.name),
                    },
                    init.value.span,
                );
                continue;
            }
            let field_type = declared
                .iter()
                .find(|f| f.name == init.name)
                .map(|f| f.data_type.clone());
            if field_type.is_none() {
                self.report(
                    SemaError::UnknownSymbol {
                        name: format!("{name}.{}", init.name),
                    },
                    init.value.span,
                );
            }
            let hint = match (&field_type, &known_subst) {
                (Some(dt), Some(subst)) => Some(subst.apply(dt)),
                (Some(dt), None) if !dt.contains_generic() => Some(dt.clone()),
                _ => None,
            };
            let value = self.check_expr(&init.value, hint.as_ref(), scope, ctx);
            values.push((init.name.clone(), value, field_type));
        }
        for field in &declared {
            if !values.iter().any(|(n, _, _)| *n == field.name) {
                self.report(
                    SemaError::MissingField {
                        record: name.to_string(),
                        field: field.name.clone(),
                    },
                    span,
                );
            }
        }

        let args = match known {
            Some(args) => args,
            None => {
                let mut inferred = IndexMap::new();
                for (_, value, field_type) in &values {
                    if let Some(field_type) = field_type {
                        let actual = self.value_type_of(value);
                        infer_generic_args(field_type, &actual, &params, &mut inferred);
                    }
                }
                self.complete_generic_args(&params, &inferred)
            }
        };
        let subst = positional(&params, &args);
        let fields = values
            .into_iter()
            .map(|(field, value, field_type)| {
                let value = match field_type {
                    Some(dt) => {
                        let expected = self.resolver().resolve_with(&dt, &subst);
                        self.coerce(value, &expected)
                    }
                    None => value,
                };
                (field, value)
            })
            .collect();
        let signature = self.request_instance(ctx, id, args.clone(), span);
        CheckedExpr::new(
            CheckedExprKind::RecordInit {
                record: InstanceRef {
                    decl: id,
                    signature,
                },
                fields,
            },
            DataType::custom(global_name, args),
            span,
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn check_variant_init(
        &mut self,
        enum_name: &str,
        generic_args: &[DataType],
        variant: &str,
        payload: Option<&ast::Expr>,
        expected: Option<&DataType>,
        span: Span,
        scope: ScopeId,
        ctx: &BodyCtx,
    ) -> CheckedExpr {
        let accept = |kind: &DeclKind| matches!(kind, DeclKind::Enum { .. });
        let Some(id) = self.lookup_type_decl(enum_name, accept, scope, span) else {
            if let Some(payload) = payload {
                self.check_expr(payload, None, scope, ctx);
            }
            return CheckedExpr::error(span);
        };
        let known = self.known_generic_args(id, generic_args, expected, span, scope, ctx);
        let decl = self.decls.get(id);
        let params = decl.generic_params.clone();
        let global_name = decl.global_name.clone();
        let declared = match &decl.kind {
            DeclKind::Enum { variants } => variants.iter().find(|v| v.name == variant).cloned(),
            _ => None,
        };
        let Some(declared) = declared else {
            self.report(
                SemaError::UnknownSymbol {
                    name: format!("{enum_name}:{variant}"),
                },
                span,
            );
            return CheckedExpr::error(span);
        };

        let hint = match (&declared.payload, &known) {
            (Some(dt), Some(args)) => Some(positional(&params, args).apply(dt)),
            (Some(dt), None) if !dt.contains_generic() => Some(dt.clone()),
            _ => None,
        };
        let value = payload.map(|p| self.check_expr(p, hint.as_ref(), scope, ctx));
        let args = match known {
            Some(args) => args,
            None => {
                let mut inferred = IndexMap::new();
                if let (Some(dt), Some(value)) = (&declared.payload, &value) {
                    let actual = self.value_type_of(value);
                    infer_generic_args(dt, &actual, &params, &mut inferred);
                }
                self.complete_generic_args(&params, &inferred)
            }
        };
        let subst = positional(&params, &args);
        let payload = match (declared.payload, value) {
            (Some(dt), Some(value)) => {
                let expected = self.resolver().resolve_with(&dt, &subst);
                Some(Box::new(self.coerce(value, &expected)))
            }
            (None, None) => None,
            (Some(dt), None) => {
                let expected = self.resolver().resolve_with(&dt, &subst);
                self.report(
                    SemaError::TypeMismatch {
                        expected,
                        found: DataType::Unit,
                    },
                    span,
                );
                None
            }
            (None, Some(value)) => {
                self.report(
                    SemaError::TypeMismatch {
                        expected: DataType::Unit,
                        found: value.data_type.clone(),
                    },
                    value.span,
                );
                None
            }
        };
        let signature = self.request_instance(ctx, id, args.clone(), span);
        CheckedExpr::new(
            CheckedExprKind::VariantInit {
                enum_decl: InstanceRef {
                    decl: id,
                    signature,
                },
                variant: variant.to_string(),
                payload,
            },
            DataType::custom(global_name, args),
            span,
        )
    }

    // ------------------------------------------------------------------
    // Operators and element lists
    // ------------------------------------------------------------------

    fn check_binary(
        &mut self,
        op: BinaryOp,
        lhs: &ast::Expr,
        rhs: &ast::Expr,
        span: Span,
        scope: ScopeId,
        ctx: &BodyCtx,
    ) -> CheckedExpr {
        let lhs_hint = matches!(op, BinaryOp::And | BinaryOp::Or).then_some(DataType::Bool);
        let lhs = self.check_expr(lhs, lhs_hint.as_ref(), scope, ctx);
        let rhs_hint = match op {
            BinaryOp::Shl | BinaryOp::Shr => Some(DataType::Usize),
            _ => Some(self.resolver().value_type(&lhs.data_type)),
        };
        let rhs = self.check_expr(rhs, rhs_hint.as_ref(), scope, ctx);
        let result = self
            .operators
            .check_binary(&self.resolver(), op, &lhs.data_type, &rhs.data_type);
        let data_type = result.unwrap_or_else(|err| {
            self.report(err, span);
            DataType::Unknown
        });
        CheckedExpr::new(
            CheckedExprKind::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            },
            data_type,
            span,
        )
    }

    /// Checks list or array elements against one common element type.
    fn check_elements(
        &mut self,
        items: &[ast::Expr],
        hint: Option<DataType>,
        scope: ScopeId,
        ctx: &BodyCtx,
    ) -> (Vec<CheckedExpr>, DataType) {
        let mut element = hint.clone();
        let mut checked = Vec::with_capacity(items.len());
        for item in items {
            let item = self.check_expr(item, element.as_ref(), scope, ctx);
            let item_type = self.value_type_of(&item);
            element = match element {
                None => Some(item_type),
                Some(current) => match self.resolver().unify(&current, &item_type) {
                    Some(common) => Some(common),
                    None => {
                        self.report(
                            SemaError::TypeMismatch {
                                expected: current.clone(),
                                found: item_type,
                            },
                            item.span,
                        );
                        Some(current)
                    }
                },
            };
            checked.push(item);
        }
        let element = element.unwrap_or(DataType::Unknown);
        if hint.is_some() {
            return (checked, element);
        }
        let checked = checked
            .into_iter()
            .map(|item| self.coerce(item, &element))
            .collect();
        (checked, element)
    }
}

/// Positional binding of `params` to `args`.
pub(crate) fn positional(params: &[GenericParam], args: &[DataType]) -> Substitution {
    let mut subst = Substitution::new();
    for (param, arg) in params.iter().zip(args) {
        subst.insert(param.name(), arg.clone());
    }
    subst
}
