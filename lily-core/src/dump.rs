//! Text renderings of analysis state for debugging.
//!
//! Enabled with the `dump` feature:
//!
//! ```text
//! package #0
//!   module #1 main
//!     record Pair (pub)
//!     fun main (pub)
//! ```

use core::fmt;

use crate::analysis::CheckedPackage;
use crate::decl::DeclTable;
use crate::scope::{ScopeArena, ScopeId, ScopeKind};

/// Indented scope tree with the symbols of each scope.
pub struct ScopeTree<'a> {
    scopes: &'a ScopeArena,
    root: ScopeId,
}

/// Every declaration with at least one signature, one mangled name per line.
pub struct SignatureTable<'a> {
    decls: &'a DeclTable,
}

pub fn scope_tree(package: &CheckedPackage) -> ScopeTree<'_> {
    ScopeTree {
        scopes: &package.scopes,
        root: package.package_scope,
    }
}

pub fn signature_table(package: &CheckedPackage) -> SignatureTable<'_> {
    SignatureTable {
        decls: &package.decls,
    }
}

fn kind_name(kind: ScopeKind) -> &'static str {
    match kind {
        ScopeKind::Package => "package",
        ScopeKind::Module => "module",
        ScopeKind::Function => "fun",
        ScopeKind::Method => "method",
        ScopeKind::Class => "class",
        ScopeKind::Record => "record",
        ScopeKind::Enum => "enum",
        ScopeKind::Trait => "trait",
        ScopeKind::Attribute => "attribute",
        ScopeKind::Block => "block",
        ScopeKind::If => "if",
        ScopeKind::While => "while",
        ScopeKind::For => "for",
        ScopeKind::MatchCase => "case",
    }
}

impl ScopeTree<'_> {
    fn write_scope(&self, f: &mut fmt::Formatter<'_>, id: ScopeId, depth: usize) -> fmt::Result {
        let scope = self.scopes.get(id);
        let indent = "  ".repeat(depth);
        writeln!(f, "{indent}{} #{}", kind_name(scope.kind), id.index())?;
        for (name, symbol) in scope.symbols.iter() {
            let vis = if symbol.visibility.is_public() { " (pub)" } else { "" };
            let overloads = symbol.targets().len();
            if overloads > 1 {
                writeln!(f, "{indent}  {} {name} x{overloads}{vis}", symbol.kind)?;
            } else {
                writeln!(f, "{indent}  {} {name}{vis}", symbol.kind)?;
            }
        }
        for child in &scope.children {
            self.write_scope(f, *child, depth + 1)?;
        }
        Ok(())
    }
}

impl fmt::Display for ScopeTree<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_scope(f, self.root, 0)
    }
}

impl fmt::Display for SignatureTable<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for decl in self.decls.iter().filter(|d| !d.signatures.is_empty()) {
            writeln!(f, "{}", decl.global_name)?;
            for sig in decl.signatures.iter() {
                if sig.generic_params.is_empty() {
                    writeln!(f, "  {}", sig.ser_global_name)?;
                    continue;
                }
                let args: Vec<String> = sig
                    .generic_params
                    .iter()
                    .map(|(name, dt)| format!("{name} = {dt}"))
                    .collect();
                writeln!(f, "  {} [{}]", sig.ser_global_name, args.join(", "))?;
            }
        }
        Ok(())
    }
}
