//! Symbols stored in scopes, and the locals they may point at.

use core::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::data_type::DataType;
use crate::error::SemaError;
use crate::scope::ScopeId;
use crate::span::Span;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeclId(pub u32);

impl DeclId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LocalId(pub u32);

impl LocalId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    #[default]
    Private,
}

impl Visibility {
    pub fn is_public(self) -> bool {
        matches!(self, Visibility::Public)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolKind {
    Module,
    Constant,
    Enum,
    Record,
    Alias,
    Class,
    Trait,
    Error,
    Fun,
    Method,
    Variable,
    Param,
}

impl SymbolKind {
    /// Kinds that may appear in a type position.
    pub fn is_type(self) -> bool {
        matches!(
            self,
            SymbolKind::Enum
                | SymbolKind::Record
                | SymbolKind::Alias
                | SymbolKind::Class
                | SymbolKind::Trait
                | SymbolKind::Error
        )
    }

    pub fn is_callable(self) -> bool {
        matches!(self, SymbolKind::Fun | SymbolKind::Method)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SymbolKind::Module => "module",
            SymbolKind::Constant => "constant",
            SymbolKind::Enum => "enum",
            SymbolKind::Record => "record",
            SymbolKind::Alias => "alias",
            SymbolKind::Class => "class",
            SymbolKind::Trait => "trait",
            SymbolKind::Error => "error",
            SymbolKind::Fun => "function",
            SymbolKind::Method => "method",
            SymbolKind::Variable => "variable",
            SymbolKind::Param => "parameter",
        }
    }
}

impl fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a symbol names: a declaration or a function-local binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolRef {
    Decl(DeclId),
    Local(LocalId),
}

/// One member of an overload set, keyed by its parameter types.
#[derive(Debug, Clone, PartialEq)]
pub struct Overload {
    pub target: SymbolRef,
    pub params: Vec<DataType>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SymbolTarget {
    Single(SymbolRef),
    Overloads(Vec<Overload>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Symbol {
    pub kind: SymbolKind,
    pub visibility: Visibility,
    pub target: SymbolTarget,
}

impl Symbol {
    /// The single target, or the first overload.
    pub fn first(&self) -> SymbolRef {
        match &self.target {
            SymbolTarget::Single(target) => *target,
            SymbolTarget::Overloads(overloads) => overloads[0].target,
        }
    }

    pub fn targets(&self) -> Vec<SymbolRef> {
        match &self.target {
            SymbolTarget::Single(target) => vec![*target],
            SymbolTarget::Overloads(overloads) => overloads.iter().map(|o| o.target).collect(),
        }
    }
}

/// Names declared directly in one scope.
///
/// Insertion order is kept; it is the scope's access list.
#[derive(Debug, Clone, Default)]
pub struct SymbolContainer {
    entries: IndexMap<String, Symbol>,
}

impl SymbolContainer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(
        &mut self,
        name: &str,
        kind: SymbolKind,
        visibility: Visibility,
        target: SymbolRef,
    ) -> Result<(), SemaError> {
        if self.entries.contains_key(name) {
            return Err(SemaError::DuplicateSymbol {
                name: name.to_string(),
            });
        }
        self.entries.insert(
            name.to_string(),
            Symbol {
                kind,
                visibility,
                target: SymbolTarget::Single(target),
            },
        );
        Ok(())
    }

    /// Adds a function to the overload set of `name`.
    ///
    /// Overloads must differ in their parameter types.
    pub fn insert_overload(
        &mut self,
        name: &str,
        kind: SymbolKind,
        visibility: Visibility,
        overload: Overload,
    ) -> Result<(), SemaError> {
        let duplicate = || SemaError::DuplicateSymbol {
            name: name.to_string(),
        };
        match self.entries.get_mut(name) {
            None => {
                self.entries.insert(
                    name.to_string(),
                    Symbol {
                        kind,
                        visibility,
                        target: SymbolTarget::Overloads(vec![overload]),
                    },
                );
                Ok(())
            }
            Some(symbol) if symbol.kind != kind => Err(duplicate()),
            Some(symbol) => match &mut symbol.target {
                SymbolTarget::Overloads(overloads) => {
                    if overloads.iter().any(|o| o.params == overload.params) {
                        return Err(duplicate());
                    }
                    if visibility.is_public() {
                        symbol.visibility = Visibility::Public;
                    }
                    overloads.push(overload);
                    Ok(())
                }
                SymbolTarget::Single(_) => Err(duplicate()),
            },
        }
    }

    pub fn get(&self, name: &str) -> Option<&Symbol> {
        self.entries.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Symbol)> {
        self.entries.iter().map(|(name, symbol)| (name.as_str(), symbol))
    }

    pub fn of_kind(&self, kind: SymbolKind) -> impl Iterator<Item = (&str, &Symbol)> {
        self.iter().filter(move |(_, symbol)| symbol.kind == kind)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Variable or parameter owned by a function body.
#[derive(Debug, Clone, PartialEq)]
pub struct Local {
    pub name: String,
    pub data_type: DataType,
    pub mutable: bool,
    pub is_param: bool,
    pub scope: ScopeId,
    pub span: Span,
}

#[derive(Debug, Clone, Default)]
pub struct Locals {
    items: Vec<Local>,
}

impl Locals {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, local: Local) -> LocalId {
        let id = LocalId(self.items.len() as u32);
        self.items.push(local);
        id
    }

    pub fn get(&self, id: LocalId) -> &Local {
        &self.items[id.index()]
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
