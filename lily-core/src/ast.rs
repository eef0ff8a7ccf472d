//! Parser output consumed by the analysis.
//!
//! The parser is an external collaborator; it hands over one
//! [`SourceUnit`] per file, usually as JSON. Names are unresolved here:
//! `DataType::Custom` carries the name as written (possibly dotted, e.g.
//! `geo.Point`) and generic parameters appear as `Custom` without
//! arguments until the analysis rewrites them.

use std::io::Read;

use serde::{Deserialize, Serialize};

use crate::data_type::DataType;
use crate::error::CoreError;
use crate::generic::GenericParam;
use crate::operator::{BinaryOp, UnaryOp};
use crate::pattern::{Pattern, SwitchCaseValue};
use crate::span::{FileId, Span};
use crate::symbol::Visibility;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceUnit {
    /// Module name of the unit.
    pub name: String,
    #[serde(default)]
    pub file: FileId,
    #[serde(default)]
    pub decls: Vec<Decl>,
}

impl SourceUnit {
    pub fn from_json(text: &str) -> Result<SourceUnit, CoreError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn from_reader(reader: impl Read) -> Result<SourceUnit, CoreError> {
        Ok(serde_json::from_reader(reader)?)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decl {
    pub name: String,
    #[serde(default)]
    pub visibility: Visibility,
    #[serde(default)]
    pub span: Span,
    #[serde(default)]
    pub generic_params: Vec<GenericParam>,
    pub kind: DeclKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Param {
    pub name: String,
    pub data_type: DataType,
    #[serde(default)]
    pub mutable: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub data_type: DataType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variant {
    pub name: String,
    #[serde(default)]
    pub payload: Option<DataType>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prototype {
    pub name: String,
    #[serde(default)]
    pub params: Vec<DataType>,
    #[serde(default = "unit")]
    pub return_type: DataType,
}

fn unit() -> DataType {
    DataType::Unit
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunDecl {
    #[serde(default)]
    pub params: Vec<Param>,
    #[serde(default = "unit")]
    pub return_type: DataType,
    #[serde(default)]
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DeclKind {
    Fun(FunDecl),
    Record {
        fields: Vec<Field>,
    },
    Enum {
        variants: Vec<Variant>,
    },
    Class {
        #[serde(default)]
        fields: Vec<Field>,
        /// Every entry is a `Fun` declaration. `self` is implicit.
        #[serde(default)]
        methods: Vec<Decl>,
        #[serde(default)]
        implements: Vec<DataType>,
    },
    Trait {
        prototypes: Vec<Prototype>,
    },
    Alias {
        data_type: DataType,
    },
    Constant {
        data_type: DataType,
        value: Expr,
    },
    Error {
        #[serde(default)]
        payload: Option<DataType>,
    },
    Module {
        decls: Vec<Decl>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stmt {
    pub kind: StmtKind,
    #[serde(default)]
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IfBranch {
    pub cond: Expr,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchArm {
    pub pattern: Pattern,
    #[serde(default)]
    pub guard: Option<Expr>,
    pub body: Vec<Stmt>,
    #[serde(default)]
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwitchArm {
    pub value: SwitchCaseValue,
    pub body: Vec<Stmt>,
    #[serde(default)]
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StmtKind {
    Variable {
        name: String,
        #[serde(default)]
        data_type: Option<DataType>,
        #[serde(default)]
        mutable: bool,
        value: Expr,
    },
    Assign {
        target: Expr,
        value: Expr,
    },
    Expr(Expr),
    Return(Option<Expr>),
    /// `if` / `elif` branches in order, then `else`.
    If {
        branches: Vec<IfBranch>,
        #[serde(default)]
        else_body: Option<Vec<Stmt>>,
    },
    While {
        cond: Expr,
        body: Vec<Stmt>,
    },
    For {
        name: String,
        iterable: Expr,
        body: Vec<Stmt>,
    },
    Block(Vec<Stmt>),
    Match {
        scrutinee: Expr,
        arms: Vec<MatchArm>,
    },
    Switch {
        scrutinee: Expr,
        arms: Vec<SwitchArm>,
    },
    Break,
    Continue,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expr {
    pub kind: ExprKind,
    #[serde(default)]
    pub span: Span,
}

impl Expr {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Expr { kind, span }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Literal {
    Bool(bool),
    Char(char),
    /// Unsuffixed integers take the expected integer or float type.
    Int {
        value: i64,
        #[serde(default)]
        suffix: Option<DataType>,
    },
    Float {
        value: f64,
        #[serde(default)]
        suffix: Option<DataType>,
    },
    Str(String),
    Unit,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldInit {
    pub name: String,
    pub value: Expr,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExprKind {
    Literal(Literal),
    Identifier(String),
    /// `a.b.c` resolved through module scopes.
    Path(Vec<String>),
    Call {
        callee: Box<Expr>,
        #[serde(default)]
        generic_args: Vec<DataType>,
        #[serde(default)]
        args: Vec<Expr>,
    },
    MethodCall {
        receiver: Box<Expr>,
        method: String,
        #[serde(default)]
        generic_args: Vec<DataType>,
        #[serde(default)]
        args: Vec<Expr>,
    },
    RecordInit {
        name: String,
        #[serde(default)]
        generic_args: Vec<DataType>,
        fields: Vec<FieldInit>,
    },
    VariantInit {
        enum_name: String,
        #[serde(default)]
        generic_args: Vec<DataType>,
        variant: String,
        #[serde(default)]
        payload: Option<Box<Expr>>,
    },
    Field {
        base: Box<Expr>,
        field: String,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Cast {
        expr: Box<Expr>,
        data_type: DataType,
    },
    Tuple(Vec<Expr>),
    List(Vec<Expr>),
    Array(Vec<Expr>),
}
