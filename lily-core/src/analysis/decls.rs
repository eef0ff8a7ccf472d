//! Declaration passes: collection, type resolution, function
//! registration, recursive types and signature seeding.

use crate::ast;
use crate::data_type::{CustomType, DataType};
use crate::decl::{DeclKind, Field, FunDecl, Param, Prototype, Variant};
use crate::error::SemaError;
use crate::generic::{GenericParam, GenericParams, merge_generic_params};
use crate::scope::{ScopeId, ScopeKind};
use crate::span::Span;
use crate::symbol::{DeclId, SymbolKind, SymbolRef, Visibility};

use super::Analyzer;

/// Non-function declaration awaiting type resolution.
pub(crate) struct TypeItem<'u> {
    pub id: DeclId,
    pub ast: &'u ast::Decl,
    /// Scope the declaration is registered in.
    pub scope: ScopeId,
}

/// Function or method awaiting registration.
pub(crate) struct FunItem<'u> {
    pub ast: &'u ast::Decl,
    pub fun: &'u ast::FunDecl,
    pub scope: ScopeId,
    pub prefix: String,
    pub class: Option<DeclId>,
}

pub(crate) struct ConstantItem<'u> {
    pub id: DeclId,
    pub value: &'u ast::Expr,
    pub scope: ScopeId,
}

#[derive(Default)]
pub(crate) struct Items<'u> {
    pub types: Vec<TypeItem<'u>>,
    pub funs: Vec<FunItem<'u>>,
    pub constants: Vec<ConstantItem<'u>>,
}

/// Kind with empty contents, replaced once member types are resolved.
fn placeholder_kind(kind: &ast::DeclKind) -> DeclKind {
    match kind {
        ast::DeclKind::Record { .. } => DeclKind::Record { fields: Vec::new() },
        ast::DeclKind::Enum { .. } => DeclKind::Enum {
            variants: Vec::new(),
        },
        ast::DeclKind::Class { .. } => DeclKind::Class {
            fields: Vec::new(),
            methods: Vec::new(),
            implements: Vec::new(),
        },
        ast::DeclKind::Trait { .. } => DeclKind::Trait {
            prototypes: Vec::new(),
        },
        ast::DeclKind::Alias { .. } => DeclKind::Alias {
            data_type: DataType::Unknown,
        },
        ast::DeclKind::Constant { .. } => DeclKind::Constant {
            data_type: DataType::Unknown,
        },
        ast::DeclKind::Error { .. } => DeclKind::Error { payload: None },
        ast::DeclKind::Module { .. } | ast::DeclKind::Fun(_) => DeclKind::Module,
    }
}

fn scope_kind(kind: &DeclKind) -> Option<ScopeKind> {
    match kind {
        DeclKind::Module => Some(ScopeKind::Module),
        DeclKind::Record { .. } => Some(ScopeKind::Record),
        DeclKind::Enum { .. } => Some(ScopeKind::Enum),
        DeclKind::Class { .. } => Some(ScopeKind::Class),
        DeclKind::Trait { .. } => Some(ScopeKind::Trait),
        _ => None,
    }
}

impl Analyzer {
    // ------------------------------------------------------------------
    // Pass 1: collection
    // ------------------------------------------------------------------

    pub(crate) fn collect<'u>(&mut self, units: &'u [ast::SourceUnit]) -> Items<'u> {
        let mut items = Items::default();
        for unit in units {
            let span = Span::new(unit.file, 0, 0);
            self.warn_naming(&unit.name, SymbolKind::Module, span);
            let id = self.decls.push(
                &unit.name,
                unit.name.clone(),
                DeclKind::Module,
                GenericParams::new(),
                self.package,
                Visibility::Public,
                span,
            );
            if let Err(err) = self.scopes.register(
                self.package,
                &unit.name,
                SymbolKind::Module,
                SymbolRef::Decl(id),
                Visibility::Public,
            ) {
                self.report(err, span);
            }
            let scope = self.scopes.create(
                ScopeKind::Module,
                Some(self.package),
                Visibility::Public,
                Some(id),
            );
            self.collect_decls(&unit.decls, scope, &unit.name, &mut items);
        }
        items
    }

    fn collect_decls<'u>(
        &mut self,
        decls: &'u [ast::Decl],
        scope: ScopeId,
        prefix: &str,
        items: &mut Items<'u>,
    ) {
        for decl in decls {
            if let ast::DeclKind::Fun(fun) = &decl.kind {
                items.funs.push(FunItem {
                    ast: decl,
                    fun,
                    scope,
                    prefix: prefix.to_string(),
                    class: None,
                });
                continue;
            }

            let kind = placeholder_kind(&decl.kind);
            let symbol_kind = kind.symbol_kind();
            self.warn_naming(&decl.name, symbol_kind, decl.span);
            let global_name = format!("{prefix}.{}", decl.name);
            let generic_params: GenericParams = decl.generic_params.iter().cloned().collect();
            let id = self.decls.push(
                &decl.name,
                global_name.clone(),
                kind,
                generic_params,
                scope,
                decl.visibility,
                decl.span,
            );
            if let Err(err) = self.scopes.register(
                scope,
                &decl.name,
                symbol_kind,
                SymbolRef::Decl(id),
                decl.visibility,
            ) {
                self.report(err, decl.span);
            }
            let own_scope = scope_kind(&self.decls.get(id).kind)
                .map(|kind| self.scopes.create(kind, Some(scope), decl.visibility, Some(id)));

            match &decl.kind {
                ast::DeclKind::Module { decls } => {
                    if let Some(own_scope) = own_scope {
                        self.collect_decls(decls, own_scope, &global_name, items);
                    }
                }
                ast::DeclKind::Class { methods, .. } => {
                    for method in methods {
                        let ast::DeclKind::Fun(fun) = &method.kind else {
                            self.report(
                                SemaError::UnknownSymbol {
                                    name: format!("{}.{}", decl.name, method.name),
                                },
                                method.span,
                            );
                            continue;
                        };
                        items.funs.push(FunItem {
                            ast: method,
                            fun,
                            scope: own_scope.unwrap_or(scope),
                            prefix: global_name.clone(),
                            class: Some(id),
                        });
                    }
                    items.types.push(TypeItem {
                        id,
                        ast: decl,
                        scope,
                    });
                }
                ast::DeclKind::Constant { value, .. } => {
                    items.constants.push(ConstantItem { id, value, scope });
                    items.types.push(TypeItem {
                        id,
                        ast: decl,
                        scope,
                    });
                }
                _ => items.types.push(TypeItem {
                    id,
                    ast: decl,
                    scope,
                }),
            }
        }
    }

    // ------------------------------------------------------------------
    // Pass 2: declaration types
    // ------------------------------------------------------------------

    /// Resolves a type as written in the source: generic parameter names
    /// become `Generic` leaves and custom names become global names.
    pub(crate) fn resolve_type(
        &mut self,
        data_type: &DataType,
        scope: ScopeId,
        generics: &[GenericParam],
        span: Span,
    ) -> DataType {
        data_type.fold(&mut |node| match node {
            DataType::Custom(custom) => Some(self.resolve_custom(custom, scope, generics, span)),
            _ => None,
        })
    }

    fn resolve_custom(
        &mut self,
        custom: &CustomType,
        scope: ScopeId,
        generics: &[GenericParam],
        span: Span,
    ) -> DataType {
        if custom.generic_args.is_empty() && generics.iter().any(|p| p.name() == custom.name) {
            return DataType::Generic(custom.name.clone());
        }
        let path: Vec<&str> = custom.name.split('.').collect();
        let found = self
            .scopes
            .lookup_path(scope, &path)
            .map(|hit| (hit.symbol.kind, hit.symbol.first()));
        let id = match found {
            Ok((kind, SymbolRef::Decl(id))) if kind.is_type() => id,
            Ok(_) => {
                self.report(
                    SemaError::UnknownSymbol {
                        name: custom.name.clone(),
                    },
                    span,
                );
                return DataType::Unknown;
            }
            Err(err) => {
                self.report(err, span);
                return DataType::Unknown;
            }
        };
        let decl = self.decls.get(id);
        let expected = decl.generic_params.len();
        let global_name = decl.global_name.clone();
        if expected != custom.generic_args.len() {
            self.report(
                SemaError::GenericArity {
                    name: custom.name.clone(),
                    expected,
                    found: custom.generic_args.len(),
                },
                span,
            );
            return DataType::Unknown;
        }
        let args = custom
            .generic_args
            .iter()
            .map(|arg| self.resolve_type(arg, scope, generics, span))
            .collect();
        DataType::custom(global_name, args)
    }

    /// Resolves the constraint lists of `params`.
    fn resolve_generic_params(
        &mut self,
        params: &[GenericParam],
        scope: ScopeId,
        outer: &[GenericParam],
        span: Span,
    ) -> GenericParams {
        let visible = merge_generic_params(outer, params);
        params
            .iter()
            .map(|param| match param {
                GenericParam::Normal { .. } => param.clone(),
                GenericParam::Constraint { name, constraints } => GenericParam::Constraint {
                    name: name.clone(),
                    constraints: constraints
                        .iter()
                        .map(|c| self.resolve_type(c, scope, &visible, span))
                        .collect(),
                },
            })
            .collect()
    }

    pub(crate) fn resolve_items(&mut self, items: &Items<'_>) {
        for item in &items.types {
            let ast = item.ast;
            let span = ast.span;
            let generic_params =
                self.resolve_generic_params(&ast.generic_params, item.scope, &[], span);
            let generics = generic_params.clone();
            let mut resolve = |this: &mut Analyzer, dt: &DataType| {
                this.resolve_type(dt, item.scope, &generics, span)
            };
            let kind = match &ast.kind {
                ast::DeclKind::Record { fields } => DeclKind::Record {
                    fields: self.resolve_fields(fields, span, &mut resolve),
                },
                ast::DeclKind::Enum { variants } => DeclKind::Enum {
                    variants: variants
                        .iter()
                        .map(|v| Variant {
                            name: v.name.clone(),
                            payload: v.payload.as_ref().map(|p| resolve(self, p)),
                        })
                        .collect(),
                },
                ast::DeclKind::Class {
                    fields, implements, ..
                } => DeclKind::Class {
                    fields: self.resolve_fields(fields, span, &mut resolve),
                    methods: Vec::new(),
                    implements: implements.iter().map(|i| resolve(self, i)).collect(),
                },
                ast::DeclKind::Trait { prototypes } => DeclKind::Trait {
                    prototypes: prototypes
                        .iter()
                        .map(|p| Prototype {
                            name: p.name.clone(),
                            params: p.params.iter().map(|dt| resolve(self, dt)).collect(),
                            return_type: resolve(self, &p.return_type),
                        })
                        .collect(),
                },
                ast::DeclKind::Alias { data_type } => DeclKind::Alias {
                    data_type: resolve(self, data_type),
                },
                ast::DeclKind::Constant { data_type, .. } => DeclKind::Constant {
                    data_type: resolve(self, data_type),
                },
                ast::DeclKind::Error { payload } => DeclKind::Error {
                    payload: payload.as_ref().map(|p| resolve(self, p)),
                },
                ast::DeclKind::Module { .. } | ast::DeclKind::Fun(_) => DeclKind::Module,
            };
            let decl = self.decls.get_mut(item.id);
            decl.kind = kind;
            decl.generic_params = generic_params;
        }
        self.check_implements(items);
    }

    fn resolve_fields(
        &mut self,
        fields: &[ast::Field],
        span: Span,
        resolve: &mut impl FnMut(&mut Analyzer, &DataType) -> DataType,
    ) -> Vec<Field> {
        let mut seen: Vec<&str> = Vec::new();
        let mut out = Vec::with_capacity(fields.len());
        for field in fields {
            if seen.contains(&field.name.as_str()) {
                self.report(
                    SemaError::DuplicateSymbol {
                        name: field.name.clone(),
                    },
                    span,
                );
                continue;
            }
            seen.push(&field.name);
            out.push(Field {
                name: field.name.clone(),
                data_type: resolve(self, &field.data_type),
            });
        }
        out
    }

    /// Every `implements` entry must name a trait.
    fn check_implements(&mut self, items: &Items<'_>) {
        for item in &items.types {
            let DeclKind::Class { implements, .. } = &self.decls.get(item.id).kind else {
                continue;
            };
            let bad: Vec<DataType> = implements
                .iter()
                .filter(|imp| {
                    !imp.is_unknown()
                        && !matches!(
                            self.decls.of_custom(imp).map(|d| &d.kind),
                            Some(DeclKind::Trait { .. })
                        )
                })
                .cloned()
                .collect();
            for imp in bad {
                self.report(
                    SemaError::TypeMismatch {
                        expected: DataType::custom("trait", Vec::new()),
                        found: imp,
                    },
                    item.ast.span,
                );
            }
        }
    }

    /// Creates function and method declarations and registers their
    /// overloads. Returns the functions whose bodies need checking.
    pub(crate) fn register_funs<'u>(
        &mut self,
        funs: &[FunItem<'u>],
    ) -> Vec<(DeclId, &'u ast::FunDecl)> {
        let mut out = Vec::with_capacity(funs.len());
        for item in funs {
            let ast = item.ast;
            let span = ast.span;
            let (outer, self_type) = match item.class {
                Some(class) => {
                    let class = self.decls.get(class);
                    (class.generic_params.clone(), Some(class.self_type()))
                }
                None => (GenericParams::new(), None),
            };
            let own = self.resolve_generic_params(&ast.generic_params, item.scope, &outer, span);
            let generics = merge_generic_params(&outer, &own);

            let mut params = Vec::with_capacity(item.fun.params.len() + 1);
            if let Some(self_type) = self_type {
                params.push(Param {
                    name: "self".to_string(),
                    data_type: self_type,
                    mutable: false,
                });
            }
            for param in &item.fun.params {
                self.warn_naming(&param.name, SymbolKind::Param, span);
                params.push(Param {
                    name: param.name.clone(),
                    data_type: self.resolve_type(&param.data_type, item.scope, &generics, span),
                    mutable: param.mutable,
                });
            }
            let return_type = self.resolve_type(&item.fun.return_type, item.scope, &generics, span);

            let symbol_kind = if item.class.is_some() {
                SymbolKind::Method
            } else {
                SymbolKind::Fun
            };
            self.warn_naming(&ast.name, symbol_kind, span);
            let base = format!("{}.{}", item.prefix, ast.name);
            let mut global_name = base.clone();
            let mut n = 1;
            while self.decls.by_global_name(&global_name).is_some() {
                global_name = format!("{base}#{n}");
                n += 1;
            }
            let param_types: Vec<DataType> = params.iter().map(|p| p.data_type.clone()).collect();
            let id = self.decls.push(
                &ast.name,
                global_name,
                DeclKind::Fun(FunDecl {
                    params,
                    return_type,
                    class: item.class,
                }),
                generics,
                item.scope,
                ast.visibility,
                span,
            );
            if let Err(err) = self.scopes.register_fun(
                item.scope,
                &ast.name,
                symbol_kind,
                id,
                param_types,
                ast.visibility,
            ) {
                self.report(err, span);
            }
            if let Some(class) = item.class {
                if let DeclKind::Class { methods, .. } = &mut self.decls.get_mut(class).kind {
                    methods.push(id);
                }
            }
            out.push((id, item.fun));
        }
        out
    }

    // ------------------------------------------------------------------
    // Pass 3 and 4
    // ------------------------------------------------------------------

    pub(crate) fn check_recursive_types(&mut self) {
        for id in self.decls.detect_recursive_types() {
            let decl = self.decls.get(id);
            let (name, span) = (decl.name.clone(), decl.span);
            self.report(SemaError::RecursiveTypeWithoutIndirection { name }, span);
        }
    }

    /// Non-generic declarations get their single signature.
    pub(crate) fn seed_signatures(&mut self) {
        for id in self.decls.ids() {
            let decl = self.decls.get(id);
            if decl.is_generic() || decl.recursion_error || matches!(decl.kind, DeclKind::Module) {
                continue;
            }
            let span = decl.span;
            if let Err(err) = self.instantiator().instantiate(id, Vec::new(), span) {
                self.report(err, span);
            }
        }
    }
}
