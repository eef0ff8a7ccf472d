//! Bodies, statements, patterns and case tables.

use crate::ast::{self, StmtKind};
use crate::case_table::{Case, CaseStatus, CaseTable};
use crate::checked::{
    CheckedBlock, CheckedBody, CheckedConstant, CheckedExpr, CheckedExprKind, CheckedGuard,
    CheckedMatchCase, CheckedStmt, CheckedStmtKind,
};
use crate::data_type::DataType;
use crate::decl::DeclKind;
use crate::error::SemaError;
use crate::pattern::{Pattern, PatternLiteral, SwitchCaseValue};
use crate::scope::{ScopeId, ScopeKind};
use crate::span::Span;
use crate::symbol::{DeclId, Local, LocalId, SymbolKind, SymbolRef, Visibility};

use super::decls::ConstantItem;
use super::{Analyzer, BodyCtx};

impl Analyzer {
    pub(crate) fn check_fun_body(&mut self, id: DeclId, fun: &ast::FunDecl) {
        let decl = self.decls.get(id);
        let Some(resolved) = decl.kind.as_fun() else {
            return;
        };
        let params = resolved.params.clone();
        let return_type = resolved.return_type.clone();
        let kind = if resolved.class.is_some() {
            ScopeKind::Method
        } else {
            ScopeKind::Function
        };
        let (parent, generics, span) = (decl.scope, decl.generic_params.clone(), decl.span);
        let _span = tracing::debug_span!("body", name = %decl.global_name).entered();

        let scope = self
            .scopes
            .create(kind, Some(parent), Visibility::Private, Some(id));
        let params: Vec<LocalId> = params
            .into_iter()
            .map(|param| {
                self.bind_local(&param.name, param.data_type, param.mutable, true, scope, span)
            })
            .collect();
        let ctx = BodyCtx {
            owner: Some(id),
            generics,
            return_type: return_type.clone(),
        };
        let stmts = self.check_stmts(&fun.body, scope, &ctx);

        let needs_value = !matches!(
            return_type,
            DataType::Unit | DataType::Never | DataType::Unknown
        );
        if needs_value && !always_returns(&stmts) {
            self.report(
                SemaError::TypeMismatch {
                    expected: return_type,
                    found: DataType::Unit,
                },
                span,
            );
        }
        self.bodies.push(CheckedBody {
            decl: id,
            scope,
            params,
            stmts,
        });
    }

    pub(crate) fn check_constant(&mut self, item: &ConstantItem<'_>) {
        let decl = self.decls.get(item.id);
        let data_type = match &decl.kind {
            DeclKind::Constant { data_type } => data_type.clone(),
            _ => return,
        };
        let ctx = BodyCtx {
            owner: None,
            generics: Default::default(),
            return_type: DataType::Unit,
        };
        let value = self.check_expr(item.value, Some(&data_type), item.scope, &ctx);
        let value = self.coerce(value, &data_type);
        self.constants.push(CheckedConstant {
            decl: item.id,
            value,
        });
    }

    /// Declares a local in `scope`.
    fn bind_local(
        &mut self,
        name: &str,
        data_type: DataType,
        mutable: bool,
        is_param: bool,
        scope: ScopeId,
        span: Span,
    ) -> LocalId {
        let kind = if is_param {
            SymbolKind::Param
        } else {
            SymbolKind::Variable
        };
        if !is_param {
            self.warn_naming(name, kind, span);
        }
        let local = self.locals.push(Local {
            name: name.to_string(),
            data_type,
            mutable,
            is_param,
            scope,
            span,
        });
        let registered =
            self.scopes
                .register(scope, name, kind, SymbolRef::Local(local), Visibility::Private);
        if let Err(err) = registered {
            self.report(err, span);
        }
        local
    }

    /// Compound body with its own scope and virtual scope.
    fn enter_compound(&mut self, kind: ScopeKind, parent: ScopeId) -> ScopeId {
        let scope = self
            .scopes
            .create(kind, Some(parent), Visibility::Private, None);
        let outer = self.vscopes.for_scope(parent);
        self.vscopes.create(scope, outer);
        scope
    }

    fn check_block(
        &mut self,
        stmts: &[ast::Stmt],
        kind: ScopeKind,
        parent: ScopeId,
        ctx: &BodyCtx,
    ) -> CheckedBlock {
        let scope = self.enter_compound(kind, parent);
        let stmts = self.check_stmts(stmts, scope, ctx);
        CheckedBlock { scope, stmts }
    }

    fn check_stmts(&mut self, stmts: &[ast::Stmt], scope: ScopeId, ctx: &BodyCtx) -> Vec<CheckedStmt> {
        stmts
            .iter()
            .map(|stmt| CheckedStmt {
                kind: self.check_stmt(stmt, scope, ctx),
                span: stmt.span,
            })
            .collect()
    }

    fn check_condition(&mut self, cond: &ast::Expr, scope: ScopeId, ctx: &BodyCtx) -> CheckedExpr {
        let cond = self.check_expr(cond, Some(&DataType::Bool), scope, ctx);
        self.coerce(cond, &DataType::Bool)
    }

    fn check_stmt(&mut self, stmt: &ast::Stmt, scope: ScopeId, ctx: &BodyCtx) -> CheckedStmtKind {
        let span = stmt.span;
        match &stmt.kind {
            StmtKind::Variable {
                name,
                data_type,
                mutable,
                value,
            } => {
                let declared = data_type
                    .as_ref()
                    .map(|dt| self.resolve_type(dt, scope, &ctx.generics, span));
                let value = self.check_expr(value, declared.as_ref(), scope, ctx);
                let (value, data_type) = match declared {
                    Some(declared) => (self.coerce(value, &declared), declared),
                    None => {
                        let data_type = self.value_type_of(&value);
                        (value, data_type)
                    }
                };
                let local = self.bind_local(name, data_type, *mutable, false, scope, span);
                CheckedStmtKind::Variable { local, value }
            }
            StmtKind::Assign { target, value } => {
                let target = self.check_expr(target, None, scope, ctx);
                if let CheckedExprKind::Local { local, .. } = target.kind {
                    let local = self.locals.get(local);
                    if !local.mutable && !matches!(local.data_type, DataType::Mut(_)) {
                        let found = local.data_type.clone();
                        self.report(
                            SemaError::TypeMismatch {
                                expected: DataType::mutable(found.clone()),
                                found,
                            },
                            target.span,
                        );
                    }
                }
                let expected = self.resolver().value_type(&target.data_type);
                let value = self.check_expr(value, Some(&expected), scope, ctx);
                let value = self.coerce(value, &expected);
                CheckedStmtKind::Assign { target, value }
            }
            StmtKind::Expr(expr) => CheckedStmtKind::Expr(self.check_expr(expr, None, scope, ctx)),
            StmtKind::Return(value) => {
                let expected = ctx.return_type.clone();
                match value {
                    Some(value) => {
                        let value = self.check_expr(value, Some(&expected), scope, ctx);
                        CheckedStmtKind::Return(Some(self.coerce(value, &expected)))
                    }
                    None => {
                        if !matches!(expected, DataType::Unit | DataType::Unknown) {
                            self.report(
                                SemaError::TypeMismatch {
                                    expected,
                                    found: DataType::Unit,
                                },
                                span,
                            );
                        }
                        CheckedStmtKind::Return(None)
                    }
                }
            }
            StmtKind::If {
                branches,
                else_body,
            } => {
                let branches = branches
                    .iter()
                    .map(|branch| {
                        let cond = self.check_condition(&branch.cond, scope, ctx);
                        let body = self.check_block(&branch.body, ScopeKind::If, scope, ctx);
                        (cond, body)
                    })
                    .collect();
                let else_body = else_body
                    .as_ref()
                    .map(|body| self.check_block(body, ScopeKind::If, scope, ctx));
                CheckedStmtKind::If {
                    branches,
                    else_body,
                }
            }
            StmtKind::While { cond, body } => {
                let cond = self.check_condition(cond, scope, ctx);
                let body = self.check_block(body, ScopeKind::While, scope, ctx);
                CheckedStmtKind::While { cond, body }
            }
            StmtKind::For {
                name,
                iterable,
                body,
            } => {
                let iterable = self.check_expr(iterable, None, scope, ctx);
                let element = match self.resolver().value_type(&iterable.data_type) {
                    DataType::List(element) => *element,
                    DataType::Array(array) => *array.element,
                    DataType::Str => DataType::Char,
                    DataType::Unknown => DataType::Unknown,
                    found => {
                        self.report(
                            SemaError::TypeMismatch {
                                expected: DataType::list(DataType::Unknown),
                                found,
                            },
                            iterable.span,
                        );
                        DataType::Unknown
                    }
                };
                let for_scope = self.enter_compound(ScopeKind::For, scope);
                let local = self.bind_local(name, element, false, false, for_scope, span);
                let stmts = self.check_stmts(body, for_scope, ctx);
                CheckedStmtKind::For {
                    local,
                    iterable,
                    body: CheckedBlock {
                        scope: for_scope,
                        stmts,
                    },
                }
            }
            StmtKind::Block(stmts) => {
                CheckedStmtKind::Block(self.check_block(stmts, ScopeKind::Block, scope, ctx))
            }
            StmtKind::Match { scrutinee, arms } => self.check_match(scrutinee, arms, span, scope, ctx),
            StmtKind::Switch { scrutinee, arms } => {
                self.check_switch(scrutinee, arms, span, scope, ctx)
            }
            StmtKind::Break => CheckedStmtKind::Break,
            StmtKind::Continue => CheckedStmtKind::Continue,
        }
    }

    // ------------------------------------------------------------------
    // match / switch
    // ------------------------------------------------------------------

    fn check_match(
        &mut self,
        scrutinee: &ast::Expr,
        arms: &[ast::MatchArm],
        span: Span,
        scope: ScopeId,
        ctx: &BodyCtx,
    ) -> CheckedStmtKind {
        let scrutinee = self.check_expr(scrutinee, None, scope, ctx);
        let scrutinee_type = self.value_type_of(&scrutinee);
        let mut table: CaseTable<Pattern, CheckedGuard, CheckedBlock> = CaseTable::new();
        for arm in arms {
            let arm_scope = self.enter_compound(ScopeKind::MatchCase, scope);
            self.check_pattern(&arm.pattern, &scrutinee_type, arm_scope, arm.span);
            let bindings: Vec<LocalId> = self
                .scopes
                .get(arm_scope)
                .symbols
                .iter()
                .filter_map(|(_, symbol)| match symbol.first() {
                    SymbolRef::Local(local) => Some(local),
                    SymbolRef::Decl(_) => None,
                })
                .collect();
            let guard = arm.guard.as_ref().map(|guard| CheckedGuard {
                expr: self.check_condition(guard, arm_scope, ctx),
                bindings,
            });
            let status = table.classify(&arm.pattern, guard.as_ref());
            let stmts = self.check_stmts(&arm.body, arm_scope, ctx);
            if let Err(err) = status.into_result() {
                self.report(err, arm.span);
                continue;
            }
            table.add(
                arm.pattern.clone(),
                guard,
                CheckedBlock {
                    scope: arm_scope,
                    stmts,
                },
            );
        }

        if self.config.exhaustiveness && !table.has_else() {
            if let Some(missing) = self.missing_cases(&scrutinee_type, table.cases()) {
                self.report(SemaError::NonExhaustiveMatch { missing }, span);
            }
        }
        let has_else = table.has_else();
        CheckedStmtKind::Match {
            scrutinee,
            cases: table.into_cases(),
            has_else,
        }
    }

    /// Values of a `Bool` or enum scrutinee no closed case covers.
    fn missing_cases(&self, scrutinee: &DataType, cases: &[CheckedMatchCase]) -> Option<String> {
        let closed = || cases.iter().filter(|case| case.is_closed()).map(|case| &case.key);
        if closed().any(Pattern::is_irrefutable) {
            return None;
        }
        let missing: Vec<String> = match scrutinee {
            DataType::Bool => [true, false]
                .into_iter()
                .filter(|value| {
                    let key = Pattern::Literal(PatternLiteral::Bool(*value));
                    !closed().any(|k| k == &key)
                })
                .map(|value| value.to_string())
                .collect(),
            DataType::Custom(custom) => {
                let decl = self.decls.of_custom(scrutinee)?;
                let DeclKind::Enum { variants } = &decl.kind else {
                    return None;
                };
                variants
                    .iter()
                    .filter(|v| !closed().any(|k| k.covered_variant() == Some(v.name.as_str())))
                    .map(|v| format!("{}:{}", custom.name, v.name))
                    .collect()
            }
            _ => return None,
        };
        (!missing.is_empty()).then(|| missing.join(", "))
    }

    fn check_switch(
        &mut self,
        scrutinee: &ast::Expr,
        arms: &[ast::SwitchArm],
        span: Span,
        scope: ScopeId,
        ctx: &BodyCtx,
    ) -> CheckedStmtKind {
        let scrutinee = self.check_expr(scrutinee, None, scope, ctx);
        let scrutinee_type = self.value_type_of(&scrutinee);
        let accepted = scrutinee_type.is_unknown()
            || scrutinee_type.is_numeric()
            || self.resolver().is_numeric(&scrutinee_type);
        if !accepted {
            self.report(
                SemaError::TypeMismatch {
                    expected: DataType::Int32,
                    found: scrutinee_type.clone(),
                },
                span,
            );
        }
        let mut table: CaseTable<SwitchCaseValue, (), CheckedBlock> = CaseTable::new();
        for arm in arms {
            let fits = match &arm.value {
                SwitchCaseValue::Int(_) | SwitchCaseValue::Uint(_) => {
                    !accepted || scrutinee_type.is_unknown() || self.resolver().is_integer(&scrutinee_type)
                }
                SwitchCaseValue::Float(_) => {
                    !accepted || scrutinee_type.is_unknown() || self.resolver().is_float(&scrutinee_type)
                }
                SwitchCaseValue::Else => true,
            };
            if !fits {
                let found = match arm.value {
                    SwitchCaseValue::Float(_) => DataType::Float64,
                    _ => DataType::Int32,
                };
                self.report(
                    SemaError::TypeMismatch {
                        expected: scrutinee_type.clone(),
                        found,
                    },
                    arm.span,
                );
            }
            let body = self.check_block(&arm.body, ScopeKind::Block, scope, ctx);
            let status = table.add(arm.value.clone(), None, body);
            if status != CaseStatus::Ok {
                if let Err(err) = status.into_result() {
                    self.report(err, arm.span);
                }
            }
        }
        let has_else = table.has_else();
        CheckedStmtKind::Switch {
            scrutinee,
            cases: table.into_cases(),
            has_else,
        }
    }

    // ------------------------------------------------------------------
    // Patterns
    // ------------------------------------------------------------------

    /// Checks `pattern` against `expected` and binds its names in `scope`.
    fn check_pattern(&mut self, pattern: &Pattern, expected: &DataType, scope: ScopeId, span: Span) {
        let expected = self.resolver().value_type(expected);
        match pattern {
            Pattern::Wildcard => {}
            Pattern::Name(name) => {
                self.bind_local(name, expected, false, false, scope, span);
            }
            Pattern::Literal(lit) => self.check_pattern_literal(lit, &expected, span),
            Pattern::Range { start, end, .. } => {
                self.check_pattern_literal(start, &expected, span);
                self.check_pattern_literal(end, &expected, span);
            }
            Pattern::Tuple(items) => {
                let element_types = match &expected {
                    DataType::Tuple(types) if types.len() == items.len() => types.clone(),
                    DataType::Unknown => vec![DataType::Unknown; items.len()],
                    _ => {
                        self.report(
                            SemaError::TypeMismatch {
                                expected: expected.clone(),
                                found: DataType::Tuple(vec![DataType::Unknown; items.len()]),
                            },
                            span,
                        );
                        vec![DataType::Unknown; items.len()]
                    }
                };
                for (item, dt) in items.iter().zip(&element_types) {
                    self.check_pattern(item, dt, scope, span);
                }
            }
            Pattern::List(items) => {
                let element = match &expected {
                    DataType::List(element) => (**element).clone(),
                    DataType::Array(array) => (*array.element).clone(),
                    DataType::Unknown => DataType::Unknown,
                    _ => {
                        self.report(
                            SemaError::TypeMismatch {
                                expected: expected.clone(),
                                found: DataType::list(DataType::Unknown),
                            },
                            span,
                        );
                        DataType::Unknown
                    }
                };
                for item in items {
                    self.check_pattern(item, &element, scope, span);
                }
            }
            Pattern::Record { name, fields } => {
                let accept = |kind: &DeclKind| matches!(kind, DeclKind::Record { .. } | DeclKind::Class { .. });
                let decl = self.lookup_type_decl(name, accept, scope, span);
                let matches_decl = decl.is_some() && self.pattern_names_type(decl, &expected, span);
                for field in fields {
                    let field_type = if matches_decl {
                        let found = self.resolver().field_type(&expected, &field.name);
                        found.unwrap_or_else(|err| {
                            self.report(err, span);
                            DataType::Unknown
                        })
                    } else {
                        DataType::Unknown
                    };
                    self.check_pattern(&field.pattern, &field_type, scope, span);
                }
            }
            Pattern::Variant {
                enum_name,
                variant,
                payload,
            } => {
                let accept = |kind: &DeclKind| matches!(kind, DeclKind::Enum { .. });
                let decl = self.lookup_type_decl(enum_name, accept, scope, span);
                let matches_decl = decl.is_some() && self.pattern_names_type(decl, &expected, span);
                let payload_type = if matches_decl {
                    let found = self.resolver().variant_payload(&expected, variant);
                    match found {
                        Ok(payload_type) => payload_type,
                        Err(err) => {
                            self.report(err, span);
                            Some(DataType::Unknown)
                        }
                    }
                } else {
                    Some(DataType::Unknown)
                };
                match (payload, payload_type) {
                    (Some(payload), Some(dt)) => self.check_pattern(payload, &dt, scope, span),
                    (Some(payload), None) => {
                        self.report(
                            SemaError::TypeMismatch {
                                expected: DataType::Unit,
                                found: DataType::Unknown,
                            },
                            span,
                        );
                        self.check_pattern(payload, &DataType::Unknown, scope, span);
                    }
                    (None, _) => {}
                }
            }
            Pattern::As { pattern, name } => {
                self.check_pattern(pattern, &expected, scope, span);
                self.bind_local(name, expected, false, false, scope, span);
            }
        }
    }

    /// Whether `expected` is an instance of `decl`; reports a mismatch
    /// otherwise. Unknown scrutinees never mismatch.
    fn pattern_names_type(&mut self, decl: Option<DeclId>, expected: &DataType, span: Span) -> bool {
        let Some(decl) = decl else {
            return false;
        };
        if expected.is_unknown() {
            return false;
        }
        let decl = self.decls.get(decl);
        if let DataType::Custom(custom) = expected {
            if custom.name == decl.global_name {
                return true;
            }
        }
        let found = DataType::custom(decl.global_name.clone(), Vec::new());
        self.report(
            SemaError::TypeMismatch {
                expected: expected.clone(),
                found,
            },
            span,
        );
        false
    }

    fn check_pattern_literal(&mut self, lit: &PatternLiteral, expected: &DataType, span: Span) {
        if expected.is_unknown() {
            return;
        }
        let resolver = self.resolver();
        let (fits, found) = match lit {
            PatternLiteral::Int(_) => (resolver.is_numeric(expected), DataType::Int32),
            PatternLiteral::Uint(_) => (resolver.is_integer(expected), DataType::Uint32),
            PatternLiteral::Float(_) => (resolver.is_float(expected), DataType::Float64),
            PatternLiteral::Bool(_) => (expected.is_bool(), DataType::Bool),
            PatternLiteral::Char(_) => (matches!(expected, DataType::Char), DataType::Char),
            PatternLiteral::Str(_) => (matches!(expected, DataType::Str), DataType::Str),
        };
        if !fits {
            self.report(
                SemaError::TypeMismatch {
                    expected: expected.clone(),
                    found,
                },
                span,
            );
        }
    }
}

/// Whether control never falls off the end of `stmts`.
fn always_returns(stmts: &[CheckedStmt]) -> bool {
    let Some(last) = stmts.last() else {
        return false;
    };
    match &last.kind {
        CheckedStmtKind::Return(_) => true,
        CheckedStmtKind::Block(block) => always_returns(&block.stmts),
        CheckedStmtKind::If {
            branches,
            else_body: Some(else_body),
        } => {
            branches.iter().all(|(_, body)| always_returns(&body.stmts))
                && always_returns(&else_body.stmts)
        }
        CheckedStmtKind::Match { cases, .. } => !cases.is_empty() && cases_return(cases),
        CheckedStmtKind::Switch {
            cases,
            has_else: true,
            ..
        } => cases_return(cases),
        _ => false,
    }
}

fn cases_return<K, G>(cases: &[Case<K, G, CheckedBlock>]) -> bool {
    cases
        .iter()
        .flat_map(|case| &case.subcases)
        .all(|sub| always_returns(&sub.body.stmts))
}

#[cfg(test)]
mod tests {
    use crate::analysis::analyze;
    use crate::ast::SourceUnit;
    use crate::checked::{CheckedExprKind, CheckedStmtKind};
    use crate::config::AnalysisConfig;
    use crate::data_type::DataType;
    use crate::error::SemaError;

    fn analyze_one(json: &str) -> crate::analysis::CheckedPackage {
        let unit = SourceUnit::from_json(json).expect("unit");
        analyze(&[unit], &AnalysisConfig::default())
    }

    fn count(package: &crate::analysis::CheckedPackage, pred: impl Fn(&SemaError) -> bool) -> usize {
        package
            .diagnostics
            .iter()
            .filter(|d| d.kind.as_ref().is_some_and(&pred))
            .count()
    }

    #[test]
    fn bool_match_reports_duplicate_and_unused_arms() {
        let package = analyze_one(
            r#"{ "name": "main", "decls": [
                { "name": "pick", "kind": { "Fun": {
                    "params": [
                        { "name": "b", "data_type": "Bool" },
                        { "name": "g", "data_type": "Bool" } ],
                    "body": [ { "kind": { "Match": {
                        "scrutinee": { "kind": { "Identifier": "b" } },
                        "arms": [
                            { "pattern": { "Literal": { "Bool": true } }, "body": [] },
                            { "pattern": { "Literal": { "Bool": true } }, "body": [] },
                            { "pattern": { "Literal": { "Bool": true } },
                              "guard": { "kind": { "Identifier": "g" } }, "body": [] },
                            { "pattern": { "Literal": { "Bool": false } }, "body": [] }
                        ] } } } ] } } }
            ] }"#,
        );
        assert_eq!(count(&package, |e| matches!(e, SemaError::DuplicateCase)), 1);
        assert_eq!(count(&package, |e| matches!(e, SemaError::UnusedCase)), 1);
        assert_eq!(count(&package, |e| matches!(e, SemaError::NonExhaustiveMatch { .. })), 0);
    }

    #[test]
    fn same_guard_over_fresh_bindings_is_a_duplicate() {
        let arm = |bound: f64| {
            format!(
                r#"{{ "pattern": {{ "Variant": {{ "enum_name": "Shape", "variant": "Circle",
                        "payload": {{ "Name": "r" }} }} }},
                    "guard": {{ "kind": {{ "Binary": {{ "op": "Gt",
                        "lhs": {{ "kind": {{ "Identifier": "r" }} }},
                        "rhs": {{ "kind": {{ "Literal": {{ "Float": {{ "value": {bound:?} }} }} }} }} }} }} }},
                    "body": [] }}"#
            )
        };
        let arms = [arm(0.0), arm(1.0), arm(0.0), r#"{ "pattern": "Wildcard", "body": [] }"#.to_string()];
        let package = analyze_one(&format!(
            r#"{{ "name": "main", "decls": [
                {{ "name": "Shape", "kind": {{ "Enum": {{ "variants": [
                    {{ "name": "Circle", "payload": "Float64" }},
                    {{ "name": "Empty" }} ] }} }} }},
                {{ "name": "size", "kind": {{ "Fun": {{
                    "params": [ {{ "name": "s", "data_type": {{ "Custom": {{ "name": "Shape" }} }} }} ],
                    "body": [ {{ "kind": {{ "Match": {{
                        "scrutinee": {{ "kind": {{ "Identifier": "s" }} }},
                        "arms": [ {} ] }} }} }} ] }} }} }}
            ] }}"#,
            arms.join(", ")
        ));
        assert_eq!(
            count(&package, |e| matches!(e, SemaError::DuplicateCase)),
            1,
            "{:?}",
            package.diagnostics
        );
        assert_eq!(package.diagnostics.error_count(), 1);
    }

    #[test]
    fn enum_match_without_else_lists_missing_variants() {
        let package = analyze_one(
            r#"{ "name": "main", "decls": [
                { "name": "Shape", "kind": { "Enum": { "variants": [
                    { "name": "Circle", "payload": "Float64" },
                    { "name": "Square", "payload": "Float64" },
                    { "name": "Empty" } ] } } },
                { "name": "area", "kind": { "Fun": {
                    "params": [ { "name": "s", "data_type": { "Custom": { "name": "Shape" } } } ],
                    "body": [ { "kind": { "Match": {
                        "scrutinee": { "kind": { "Identifier": "s" } },
                        "arms": [
                            { "pattern": { "Variant": { "enum_name": "Shape", "variant": "Circle",
                                "payload": { "Name": "r" } } }, "body": [] }
                        ] } } } ] } } }
            ] }"#,
        );
        let missing: Vec<String> = package
            .diagnostics
            .errors_matching(|e| matches!(e, SemaError::NonExhaustiveMatch { .. }))
            .map(|d| d.message.clone())
            .collect();
        assert_eq!(missing.len(), 1);
        assert!(missing[0].contains("main.Shape:Square"));
        assert!(missing[0].contains("main.Shape:Empty"));
        assert!(!missing[0].contains("Circle"));
    }

    #[test]
    fn switch_rejects_repeated_values() {
        let package = analyze_one(
            r#"{ "name": "main", "decls": [
                { "name": "classify", "kind": { "Fun": {
                    "params": [ { "name": "n", "data_type": "Int32" } ],
                    "body": [ { "kind": { "Switch": {
                        "scrutinee": { "kind": { "Identifier": "n" } },
                        "arms": [
                            { "value": { "Int": 1 }, "body": [] },
                            { "value": { "Int": 1 }, "body": [] },
                            { "value": "Else", "body": [] },
                            { "value": { "Int": 2 }, "body": [] }
                        ] } } } ] } } }
            ] }"#,
        );
        assert_eq!(count(&package, |e| matches!(e, SemaError::DuplicateCase)), 1);
        assert_eq!(count(&package, |e| matches!(e, SemaError::UnusedCase)), 1);
    }

    #[test]
    fn mutable_local_is_captured_by_reference_in_nested_block() {
        let package = analyze_one(
            r#"{ "name": "main", "decls": [
                { "name": "count", "kind": { "Fun": {
                    "return_type": "Int32",
                    "body": [
                        { "kind": { "Variable": { "name": "total", "mutable": true,
                            "value": { "kind": { "Literal": { "Int": { "value": 0 } } } } } } },
                        { "kind": { "Block": [
                            { "kind": { "Assign": {
                                "target": { "kind": { "Identifier": "total" } },
                                "value": { "kind": { "Literal": { "Int": { "value": 1 } } } } } } }
                        ] } },
                        { "kind": { "Return": { "kind": { "Identifier": "total" } } } }
                    ] } } }
            ] }"#,
        );
        assert!(!package.diagnostics.has_errors(), "{:?}", package.diagnostics);
        let body = &package.bodies[0];
        let CheckedStmtKind::Block(block) = &body.stmts[1].kind else {
            panic!("block");
        };
        let CheckedStmtKind::Assign { target, .. } = &block.stmts[0].kind else {
            panic!("assign");
        };
        assert!(matches!(target.kind, CheckedExprKind::Local { captured: true, .. }));
        assert_eq!(target.data_type, DataType::ref_mut(DataType::Int32));
        let vscope = package
            .virtual_scopes
            .for_scope(block.scope)
            .expect("virtual scope");
        assert_eq!(package.virtual_scopes.get(vscope).variables.len(), 1);
    }

    #[test]
    fn assigning_an_immutable_local_is_reported() {
        let package = analyze_one(
            r#"{ "name": "main", "decls": [
                { "name": "main", "kind": { "Fun": { "body": [
                    { "kind": { "Variable": { "name": "x",
                        "value": { "kind": { "Literal": { "Int": { "value": 0 } } } } } } },
                    { "kind": { "Assign": {
                        "target": { "kind": { "Identifier": "x" } },
                        "value": { "kind": { "Literal": { "Int": { "value": 1 } } } } } } }
                ] } } }
            ] }"#,
        );
        assert_eq!(count(&package, |e| matches!(e, SemaError::TypeMismatch { .. })), 1);
    }

    #[test]
    fn missing_return_value_is_reported() {
        let package = analyze_one(
            r#"{ "name": "main", "decls": [
                { "name": "answer", "kind": { "Fun": { "return_type": "Int32", "body": [] } } }
            ] }"#,
        );
        assert_eq!(
            count(&package, |e| matches!(
                e,
                SemaError::TypeMismatch { found: DataType::Unit, .. }
            )),
            1
        );
    }
}
