//! Semantic analysis driver.
//!
//! Runs the passes over a set of parser units in order:
//!
//! 1. collect declarations and create module/type scopes,
//! 2. resolve declaration types and register functions,
//! 3. detect recursive types,
//! 4. seed signatures of non-generic declarations,
//! 5. check function bodies and constant initializers.
//!
//! Every pass runs to completion; errors go to [`Diagnostics`] and the
//! offending type becomes `DataType::Unknown`.
//!
//! 各パスは最後まで走り、エラーは診断として蓄積される。

mod decls;
mod expr;
mod stmt;

use crate::ast::SourceUnit;
use crate::checked::{CheckedBody, CheckedConstant, CheckedExpr, CheckedExprKind};
use crate::config::AnalysisConfig;
use crate::data_type::DataType;
use crate::decl::{Decl, DeclTable, PendingInstantiation};
use crate::diagnostic::Diagnostics;
use crate::error::{CoreError, SemaError};
use crate::generic::{CompilerGenericNamer, GenericParams};
use crate::monomorph::{Instantiator, MonomorphStats, mentions_generic_param};
use crate::operator::OperatorRegister;
use crate::resolver::{CastDecision, DataTypeResolver};
use crate::scope::{ScopeArena, ScopeId, ScopeKind};
use crate::span::Span;
use crate::symbol::{DeclId, Locals, Visibility};
use crate::virtual_scope::VirtualScopeArena;

/// Result of [`analyze`]: everything IR lowering needs.
#[derive(Debug)]
pub struct CheckedPackage {
    pub decls: DeclTable,
    pub scopes: ScopeArena,
    pub virtual_scopes: VirtualScopeArena,
    pub locals: Locals,
    pub bodies: Vec<CheckedBody>,
    pub constants: Vec<CheckedConstant>,
    pub diagnostics: Diagnostics,
    pub stats: MonomorphStats,
    pub package_scope: ScopeId,
}

impl CheckedPackage {
    /// Phase barrier before lowering: refuses a package with errors.
    pub fn finish_for_lowering(self) -> Result<CheckedPackage, CoreError> {
        let errors = self.diagnostics.error_count();
        if errors != 0 {
            tracing::warn!(errors, "code generation refused");
            return Err(CoreError::CodegenRefused { errors });
        }
        Ok(self)
    }

    pub fn decl(&self, global_name: &str) -> Option<&Decl> {
        self.decls.by_global_name(global_name).map(|id| self.decls.get(id))
    }

    pub fn body_of(&self, decl: DeclId) -> Option<&CheckedBody> {
        self.bodies.iter().find(|body| body.decl == decl)
    }
}

/// Analyzes `units` as one package.
pub fn analyze(units: &[SourceUnit], config: &AnalysisConfig) -> CheckedPackage {
    let _span = tracing::info_span!("analyze", units = units.len()).entered();
    let mut analyzer = Analyzer::new(config.clone());

    tracing::info!("pass: collect declarations");
    let items = analyzer.collect(units);

    tracing::info!(decls = analyzer.decls.len(), "pass: resolve declarations");
    analyzer.resolve_items(&items);
    let funs = analyzer.register_funs(&items.funs);

    tracing::info!("pass: recursive types");
    analyzer.check_recursive_types();

    tracing::info!("pass: seed signatures");
    analyzer.seed_signatures();

    tracing::info!(bodies = funs.len(), "pass: check bodies");
    for (id, fun) in &funs {
        analyzer.check_fun_body(*id, fun);
    }
    for constant in &items.constants {
        analyzer.check_constant(constant);
    }

    let package = analyzer.finish();
    tracing::info!(
        errors = package.diagnostics.error_count(),
        warnings = package.diagnostics.warning_count(),
        signatures_created = package.stats.created(),
        signatures_reused = package.stats.reused(),
        "analysis finished"
    );
    package
}

/// Context of the body being checked.
#[derive(Debug, Clone)]
pub(crate) struct BodyCtx {
    /// Function, method or constant owning the body.
    pub owner: Option<DeclId>,
    /// Generic parameters in scope, as declared by the owner.
    pub generics: GenericParams,
    pub return_type: DataType,
}

pub(crate) struct Analyzer {
    config: AnalysisConfig,
    decls: DeclTable,
    scopes: ScopeArena,
    vscopes: VirtualScopeArena,
    locals: Locals,
    diagnostics: Diagnostics,
    operators: OperatorRegister,
    namer: CompilerGenericNamer,
    stats: MonomorphStats,
    bodies: Vec<CheckedBody>,
    constants: Vec<CheckedConstant>,
    package: ScopeId,
}

impl Analyzer {
    fn new(config: AnalysisConfig) -> Self {
        let mut scopes = ScopeArena::new();
        let package = scopes.create(ScopeKind::Package, None, Visibility::Public, None);
        Analyzer {
            config,
            decls: DeclTable::new(),
            scopes,
            vscopes: VirtualScopeArena::new(),
            locals: Locals::new(),
            diagnostics: Diagnostics::new(),
            operators: OperatorRegister::new(),
            namer: CompilerGenericNamer::new(),
            stats: MonomorphStats::new(),
            bodies: Vec::new(),
            constants: Vec::new(),
            package,
        }
    }

    fn finish(self) -> CheckedPackage {
        CheckedPackage {
            decls: self.decls,
            scopes: self.scopes,
            virtual_scopes: self.vscopes,
            locals: self.locals,
            bodies: self.bodies,
            constants: self.constants,
            diagnostics: self.diagnostics,
            stats: self.stats,
            package_scope: self.package,
        }
    }

    fn report(&mut self, err: SemaError, span: Span) {
        self.diagnostics.report(err, span);
    }

    fn warn_naming(&mut self, name: &str, kind: crate::symbol::SymbolKind, span: Span) {
        if !self.config.naming_conventions {
            return;
        }
        if let Some(message) = crate::naming::check_name(name, kind) {
            self.diagnostics.warn(message, span);
        }
    }

    fn resolver(&self) -> DataTypeResolver<'_> {
        DataTypeResolver::new(&self.decls, self.config.allow_implicit_cast)
    }

    fn instantiator(&mut self) -> Instantiator<'_> {
        Instantiator::new(
            &mut self.decls,
            &mut self.diagnostics,
            &self.stats,
            self.config.allow_implicit_cast,
            self.config.max_instantiation_depth,
        )
    }

    /// Requests the instance `target[args]` from a body owned by `ctx`.
    ///
    /// Arguments naming the owner's generic parameters become a pending
    /// instantiation of the owner; compiler placeholders defer. Returns
    /// the signature index when one exists.
    fn request_instance(
        &mut self,
        ctx: &BodyCtx,
        target: DeclId,
        args: Vec<DataType>,
        span: Span,
    ) -> Option<usize> {
        if args.iter().any(mentions_generic_param) {
            if let Some(owner) = ctx.owner {
                self.instantiator().add_pending(
                    owner,
                    PendingInstantiation {
                        target,
                        generic_args: args,
                        span,
                    },
                );
            }
            return None;
        }
        match self.instantiator().instantiate(target, args, span) {
            Ok(outcome) => outcome.index(),
            Err(err) => {
                self.report(err, span);
                None
            }
        }
    }

    /// Uses `expr` where `expected` is required, inserting an implicit
    /// cast or reporting a mismatch.
    fn coerce(&mut self, expr: CheckedExpr, expected: &DataType) -> CheckedExpr {
        let decision = self.resolver().implicit_cast(&expr.data_type, expected);
        match decision {
            Ok(CastDecision::NoCast) => expr,
            Ok(cast) => {
                let span = expr.span;
                let data_type = self.resolver().normalize(expected).strip_mut().clone();
                CheckedExpr::new(
                    CheckedExprKind::ImplicitCast {
                        expr: Box::new(expr),
                        cast,
                    },
                    data_type,
                    span,
                )
            }
            Err(err) => {
                self.report(err, expr.span);
                expr
            }
        }
    }
}
