//! Semantic analysis core of the Lily language toolchain.
//!
//! The pipeline is roughly:
//!
//!   parser units (JSON)
//!     -> collect      (scopes + declaration table)
//!     -> resolve      (declaration types, generics, overloads)
//!     -> check bodies (types, implicit casts, virtual scopes, case tables)
//!     -> signatures   (monomorphization, mangled names)
//!     -> CheckedPackage, handed to IR lowering
//!
//! Front-ends and tools (CLI, language server, ...) should depend on this
//! crate rather than reimplementing the analysis.

// ---------------------------------------------------------------------
// Error handling and diagnostics
// ---------------------------------------------------------------------

pub mod span;
pub mod diagnostic;
pub mod error;
pub mod config;

// ---------------------------------------------------------------------
// Parser input
// ---------------------------------------------------------------------

pub mod ast;

// ---------------------------------------------------------------------
// Types, generics and signatures
// ---------------------------------------------------------------------

pub mod data_type;
pub mod generic;
pub mod mangle;
pub mod signature;
pub mod resolver;
pub mod operator;

// ---------------------------------------------------------------------
// Scopes and declarations
// ---------------------------------------------------------------------

pub mod symbol;
pub mod scope;
pub mod virtual_scope;
pub mod naming;
pub mod decl;

// ---------------------------------------------------------------------
// Patterns and case tables
// ---------------------------------------------------------------------

pub mod pattern;
pub mod case_table;

// ---------------------------------------------------------------------
// Analysis driver and its output
// ---------------------------------------------------------------------

pub mod monomorph;
pub mod checked;
pub mod analysis;

#[cfg(feature = "dump")]
pub mod dump;

// ---------------------------------------------------------------------
// Public API re-exports
// ---------------------------------------------------------------------

pub use analysis::{CheckedPackage, analyze};
pub use config::AnalysisConfig;
pub use error::{CoreError, SemaError};
