//! Checked tree handed to IR lowering.
//!
//! Every expression carries its resolved `DataType` and span. Names are
//! resolved to locals and declarations; generic calls point at the
//! signature they instantiate (or at nothing yet, inside generic bodies).
//!
//! `CheckedExpr` は必ず `DataType` と `Span` を持つ。

use crate::ast::Literal;
use crate::case_table::{Case, StructuralEq};
use crate::data_type::DataType;
use crate::operator::{BinaryOp, UnaryOp};
use crate::pattern::{Pattern, SwitchCaseValue};
use crate::resolver::CastDecision;
use crate::scope::ScopeId;
use crate::span::Span;
use crate::symbol::{DeclId, LocalId};

#[derive(Debug, Clone, PartialEq)]
pub struct CheckedExpr {
    pub kind: CheckedExprKind,
    pub data_type: DataType,
    pub span: Span,
}

impl CheckedExpr {
    pub fn new(kind: CheckedExprKind, data_type: DataType, span: Span) -> Self {
        CheckedExpr {
            kind,
            data_type,
            span,
        }
    }

    /// Placeholder for an expression that failed to check.
    pub fn error(span: Span) -> Self {
        CheckedExpr::new(CheckedExprKind::Error, DataType::Unknown, span)
    }
}

/// Use of a declaration instance: the declaration plus the index of its
/// signature, `None` while the generic arguments are not concrete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstanceRef {
    pub decl: DeclId,
    pub signature: Option<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Callee {
    Fun(InstanceRef),
    /// Value of lambda type.
    Value(Box<CheckedExpr>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum CheckedExprKind {
    Literal(Literal),
    Local {
        local: LocalId,
        /// Read through the virtual scope of a compound body.
        captured: bool,
    },
    Constant(DeclId),
    /// Function used as a value.
    FunRef(InstanceRef),
    Call {
        callee: Callee,
        args: Vec<CheckedExpr>,
    },
    RecordInit {
        record: InstanceRef,
        fields: Vec<(String, CheckedExpr)>,
    },
    VariantInit {
        enum_decl: InstanceRef,
        variant: String,
        payload: Option<Box<CheckedExpr>>,
    },
    Field {
        base: Box<CheckedExpr>,
        field: String,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<CheckedExpr>,
        rhs: Box<CheckedExpr>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<CheckedExpr>,
    },
    /// Explicit `as` cast.
    Cast {
        expr: Box<CheckedExpr>,
        cast: CastDecision,
    },
    /// Cast inserted by the analysis.
    ImplicitCast {
        expr: Box<CheckedExpr>,
        cast: CastDecision,
    },
    Tuple(Vec<CheckedExpr>),
    List(Vec<CheckedExpr>),
    Array(Vec<CheckedExpr>),
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CheckedStmt {
    pub kind: CheckedStmtKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CheckedBlock {
    pub scope: ScopeId,
    pub stmts: Vec<CheckedStmt>,
}

pub type CheckedMatchCase = Case<Pattern, CheckedGuard, CheckedBlock>;
pub type CheckedSwitchCase = Case<SwitchCaseValue, (), CheckedBlock>;

#[derive(Debug, Clone, PartialEq)]
pub enum CheckedStmtKind {
    Variable {
        local: LocalId,
        value: CheckedExpr,
    },
    Assign {
        target: CheckedExpr,
        value: CheckedExpr,
    },
    Expr(CheckedExpr),
    Return(Option<CheckedExpr>),
    If {
        branches: Vec<(CheckedExpr, CheckedBlock)>,
        else_body: Option<CheckedBlock>,
    },
    While {
        cond: CheckedExpr,
        body: CheckedBlock,
    },
    For {
        local: LocalId,
        iterable: CheckedExpr,
        body: CheckedBlock,
    },
    Block(CheckedBlock),
    Match {
        scrutinee: CheckedExpr,
        cases: Vec<CheckedMatchCase>,
        has_else: bool,
    },
    Switch {
        scrutinee: CheckedExpr,
        cases: Vec<CheckedSwitchCase>,
        has_else: bool,
    },
    Break,
    Continue,
}

/// Checked body of a function or method.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckedBody {
    pub decl: DeclId,
    pub scope: ScopeId,
    pub params: Vec<LocalId>,
    pub stmts: Vec<CheckedStmt>,
}

/// Checked initializer of a constant.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckedConstant {
    pub decl: DeclId,
    pub value: CheckedExpr,
}

impl CheckedExpr {
    /// Compares kinds and types, never spans. Locals are equal when
    /// `same_local` says so.
    fn same_shape(&self, other: &Self, same_local: &dyn Fn(LocalId, LocalId) -> bool) -> bool {
        use CheckedExprKind as K;

        let all = |a: &[CheckedExpr], b: &[CheckedExpr]| {
            a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.same_shape(y, same_local))
        };

        if self.data_type != other.data_type {
            return false;
        }
        match (&self.kind, &other.kind) {
            (K::Literal(a), K::Literal(b)) => a == b,
            (
                K::Local {
                    local: a,
                    captured: _,
                },
                K::Local {
                    local: b,
                    captured: _,
                },
            ) => same_local(*a, *b),
            (K::Constant(a), K::Constant(b)) => a == b,
            (K::FunRef(a), K::FunRef(b)) => a == b,
            (
                K::Call {
                    callee: ca,
                    args: aa,
                },
                K::Call {
                    callee: cb,
                    args: ab,
                },
            ) => {
                let same_callee = match (ca, cb) {
                    (Callee::Fun(a), Callee::Fun(b)) => a == b,
                    (Callee::Value(a), Callee::Value(b)) => a.same_shape(b, same_local),
                    _ => false,
                };
                same_callee && all(aa, ab)
            }
            (
                K::RecordInit {
                    record: ra,
                    fields: fa,
                },
                K::RecordInit {
                    record: rb,
                    fields: fb,
                },
            ) => {
                ra == rb
                    && fa.len() == fb.len()
                    && fa
                        .iter()
                        .zip(fb)
                        .all(|((na, ea), (nb, eb))| na == nb && ea.same_shape(eb, same_local))
            }
            (
                K::VariantInit {
                    enum_decl: da,
                    variant: va,
                    payload: pa,
                },
                K::VariantInit {
                    enum_decl: db,
                    variant: vb,
                    payload: pb,
                },
            ) => {
                da == db
                    && va == vb
                    && match (pa, pb) {
                        (None, None) => true,
                        (Some(a), Some(b)) => a.same_shape(b, same_local),
                        _ => false,
                    }
            }
            (K::Field { base: ba, field: fa }, K::Field { base: bb, field: fb }) => {
                fa == fb && ba.same_shape(bb, same_local)
            }
            (
                K::Binary {
                    op: oa,
                    lhs: la,
                    rhs: ra,
                },
                K::Binary {
                    op: ob,
                    lhs: lb,
                    rhs: rb,
                },
            ) => oa == ob && la.same_shape(lb, same_local) && ra.same_shape(rb, same_local),
            (
                K::Unary {
                    op: oa,
                    operand: a,
                },
                K::Unary {
                    op: ob,
                    operand: b,
                },
            ) => oa == ob && a.same_shape(b, same_local),
            (K::Cast { expr: a, cast: ca }, K::Cast { expr: b, cast: cb })
            | (K::ImplicitCast { expr: a, cast: ca }, K::ImplicitCast { expr: b, cast: cb }) => {
                ca == cb && a.same_shape(b, same_local)
            }
            (K::Tuple(a), K::Tuple(b)) | (K::List(a), K::List(b)) | (K::Array(a), K::Array(b)) => {
                all(a, b)
            }
            // Two failed expressions never count as the same guard.
            _ => false,
        }
    }
}

impl StructuralEq for CheckedExpr {
    fn structural_eq(&self, other: &Self) -> bool {
        self.same_shape(other, &|a, b| a == b)
    }
}

/// Guard of a match arm together with the locals its pattern binds, in
/// binding order.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckedGuard {
    pub expr: CheckedExpr,
    pub bindings: Vec<LocalId>,
}

impl StructuralEq for CheckedGuard {
    /// Pattern bindings compare by position, so `Some(x) if x > 0` written
    /// twice is the same guard.
    fn structural_eq(&self, other: &Self) -> bool {
        let position = |bindings: &[LocalId], local: LocalId| bindings.iter().position(|b| *b == local);
        self.expr.same_shape(&other.expr, &|a, b| {
            match (position(&self.bindings, a), position(&other.bindings, b)) {
                (Some(i), Some(j)) => i == j,
                (None, None) => a == b,
                _ => false,
            }
        })
    }
}
