use thiserror::Error;

use crate::data_type::DataType;

/// Errors of the outer surface: things that stop a caller from using the
/// analysis result at all.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("failed to read source unit: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed source unit: {0}")]
    MalformedUnit(#[from] serde_json::Error),
    #[error("code generation refused: analysis reported {errors} error(s)")]
    CodegenRefused { errors: usize },
    #[error("semantic error: {0}")]
    Semantic(#[from] SemaError),
}

/// Diagnostic taxonomy of the semantic analysis.
///
/// Engine operations return these through `Result`; the analyzer turns
/// them into diagnostics and keeps going.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SemaError {
    #[error("unknown symbol `{name}`")]
    UnknownSymbol { name: String },
    #[error("`{name}` is not public")]
    PrivateSymbol { name: String },
    #[error("duplicate symbol `{name}`")]
    DuplicateSymbol { name: String },
    #[error(
        "`{data_type}` does not satisfy the constraint `{constraint}` of generic parameter `{param}`"
    )]
    ConstraintViolation {
        param: String,
        data_type: DataType,
        constraint: DataType,
    },
    #[error("mismatched types: expected `{expected}`, found `{found}`")]
    TypeMismatch { expected: DataType, found: DataType },
    #[error("`{name}` expects {expected} generic argument(s), found {found}")]
    GenericArity {
        name: String,
        expected: usize,
        found: usize,
    },
    #[error("record `{record}` is missing field `{field}`")]
    MissingField { record: String, field: String },
    #[error("duplicate case")]
    DuplicateCase,
    #[error("unused case: an earlier arm already matches this pattern unconditionally")]
    UnusedCase,
    #[error(
        "recursive type `{name}` has infinite size; insert an indirection (pointer, reference or list)"
    )]
    RecursiveTypeWithoutIndirection { name: String },
    #[error("instantiation depth limit ({limit}) reached while instantiating `{name}`")]
    InstantiationDepthExceeded { name: String, limit: usize },
    #[error("non-exhaustive match: {missing} not covered")]
    NonExhaustiveMatch { missing: String },
    #[error("mangled name `{ser_global_name}` already names a different instantiation")]
    ManglingCollision { ser_global_name: String },
}

impl SemaError {
    /// Short stable code used by reporters.
    pub fn code(&self) -> &'static str {
        match self {
            SemaError::UnknownSymbol { .. } => "unknown-symbol",
            SemaError::PrivateSymbol { .. } => "private-symbol",
            SemaError::DuplicateSymbol { .. } => "duplicate-symbol",
            SemaError::ConstraintViolation { .. } => "constraint-violation",
            SemaError::TypeMismatch { .. } => "type-mismatch",
            SemaError::GenericArity { .. } => "generic-arity",
            SemaError::MissingField { .. } => "missing-field",
            SemaError::DuplicateCase => "duplicate-case",
            SemaError::UnusedCase => "unused-case",
            SemaError::RecursiveTypeWithoutIndirection { .. } => "recursive-type",
            SemaError::InstantiationDepthExceeded { .. } => "instantiation-depth",
            SemaError::NonExhaustiveMatch { .. } => "non-exhaustive-match",
            SemaError::ManglingCollision { .. } => "mangling-collision",
        }
    }
}
