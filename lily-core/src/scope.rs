//! Hierarchical scopes and symbol lookup.
//!
//! Scopes live in an arena and refer to their parent by index. The parent
//! link is only followed for lookups; a scope is never reached through it
//! for mutation.

use rustc_hash::FxHashMap;

use crate::data_type::DataType;
use crate::error::SemaError;
use crate::symbol::{
    DeclId, Overload, Symbol, SymbolContainer, SymbolKind, SymbolRef, Visibility,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopeId(pub u32);

impl ScopeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScopeKind {
    Package,
    Module,
    Function,
    Method,
    Class,
    Record,
    Enum,
    Trait,
    Attribute,
    Block,
    If,
    While,
    For,
    MatchCase,
}

impl ScopeKind {
    /// Compound-statement bodies; these get a virtual scope for captures.
    pub fn is_compound(self) -> bool {
        matches!(
            self,
            ScopeKind::Block
                | ScopeKind::If
                | ScopeKind::While
                | ScopeKind::For
                | ScopeKind::MatchCase
        )
    }

    /// Leaving one of these on the way up hides non-public symbols.
    pub fn is_boundary(self) -> bool {
        matches!(self, ScopeKind::Module | ScopeKind::Package)
    }

    pub fn is_callable_body(self) -> bool {
        matches!(self, ScopeKind::Function | ScopeKind::Method)
    }
}

#[derive(Debug, Clone)]
pub struct Scope {
    pub id: ScopeId,
    pub kind: ScopeKind,
    pub parent: Option<ScopeId>,
    pub children: Vec<ScopeId>,
    pub visibility: Visibility,
    /// Declaration this scope belongs to, if any.
    pub owner: Option<DeclId>,
    pub symbols: SymbolContainer,
}

impl Scope {
    /// Names visible in this scope, in declaration order.
    pub fn access(&self) -> impl Iterator<Item = &str> {
        self.symbols.names()
    }
}

/// A lookup hit together with the scope that declared it.
#[derive(Debug, Clone, Copy)]
pub struct Resolved<'a> {
    pub symbol: &'a Symbol,
    pub scope: ScopeId,
}

#[derive(Debug, Default)]
pub struct ScopeArena {
    scopes: Vec<Scope>,
    owned: FxHashMap<DeclId, ScopeId>,
}

impl ScopeArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(
        &mut self,
        kind: ScopeKind,
        parent: Option<ScopeId>,
        visibility: Visibility,
        owner: Option<DeclId>,
    ) -> ScopeId {
        let id = ScopeId(self.scopes.len() as u32);
        self.scopes.push(Scope {
            id,
            kind,
            parent,
            children: Vec::new(),
            visibility,
            owner,
            symbols: SymbolContainer::new(),
        });
        if let Some(parent) = parent {
            self.scopes[parent.index()].children.push(id);
        }
        if let Some(owner) = owner {
            self.owned.entry(owner).or_insert(id);
        }
        tracing::trace!(?id, ?kind, ?parent, "scope created");
        id
    }

    pub fn get(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.index()]
    }

    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Scope> {
        self.scopes.iter()
    }

    /// Scope owned by a declaration (module body, function body, ...).
    pub fn scope_of(&self, decl: DeclId) -> Option<ScopeId> {
        self.owned.get(&decl).copied()
    }

    pub fn register(
        &mut self,
        scope: ScopeId,
        name: &str,
        kind: SymbolKind,
        target: SymbolRef,
        visibility: Visibility,
    ) -> Result<(), SemaError> {
        tracing::trace!(?scope, name, %kind, "register");
        self.scopes[scope.index()]
            .symbols
            .insert(name, kind, visibility, target)
    }

    /// Registers one overload of a function or method.
    pub fn register_fun(
        &mut self,
        scope: ScopeId,
        name: &str,
        kind: SymbolKind,
        decl: DeclId,
        params: Vec<DataType>,
        visibility: Visibility,
    ) -> Result<(), SemaError> {
        tracing::trace!(?scope, name, %kind, arity = params.len(), "register overload");
        self.scopes[scope.index()].symbols.insert_overload(
            name,
            kind,
            visibility,
            Overload {
                target: SymbolRef::Decl(decl),
                params,
            },
        )
    }

    /// Finds `name` in `scope` or one of its ancestors.
    ///
    /// Siblings and descendants are never searched. Once the walk has left
    /// a module or package scope, non-public symbols are skipped; one is
    /// reported as private only if nothing visible is found further up.
    pub fn lookup(&self, scope: ScopeId, name: &str) -> Result<Resolved<'_>, SemaError> {
        let mut current = Some(scope);
        let mut crossed_boundary = false;
        let mut hidden = false;
        while let Some(id) = current {
            let s = self.get(id);
            if let Some(symbol) = s.symbols.get(name) {
                if crossed_boundary && !symbol.visibility.is_public() {
                    tracing::trace!(?scope, name, found_in = ?id, "lookup skipped private symbol");
                    hidden = true;
                } else {
                    tracing::trace!(?scope, name, found_in = ?id, "lookup");
                    return Ok(Resolved { symbol, scope: id });
                }
            }
            if s.kind.is_boundary() {
                crossed_boundary = true;
            }
            current = s.parent;
        }
        tracing::trace!(?scope, name, "lookup failed");
        if hidden {
            return Err(SemaError::PrivateSymbol {
                name: name.to_string(),
            });
        }
        Err(SemaError::UnknownSymbol {
            name: name.to_string(),
        })
    }

    /// Resolves a qualified name such as `geometry.shapes.Point`.
    ///
    /// The first segment is looked up normally; every following segment is
    /// a member of the module or class scope named by its predecessor and
    /// must be public unless that scope encloses `scope`.
    pub fn lookup_path<S: AsRef<str>>(
        &self,
        scope: ScopeId,
        path: &[S],
    ) -> Result<Resolved<'_>, SemaError> {
        let Some((first, rest)) = path.split_first() else {
            return Err(SemaError::UnknownSymbol {
                name: String::new(),
            });
        };
        let mut resolved = self.lookup(scope, first.as_ref())?;
        for segment in rest {
            let segment = segment.as_ref();
            let container = match (resolved.symbol.kind, resolved.symbol.first()) {
                (
                    SymbolKind::Module | SymbolKind::Class | SymbolKind::Enum,
                    SymbolRef::Decl(decl),
                ) => self.scope_of(decl),
                _ => None,
            };
            let Some(container) = container else {
                return Err(SemaError::UnknownSymbol {
                    name: join_path(path),
                });
            };
            let Some(symbol) = self.get(container).symbols.get(segment) else {
                return Err(SemaError::UnknownSymbol {
                    name: join_path(path),
                });
            };
            if !symbol.visibility.is_public() && !self.is_ancestor_or_self(container, scope) {
                return Err(SemaError::PrivateSymbol {
                    name: join_path(path),
                });
            }
            resolved = Resolved {
                symbol,
                scope: container,
            };
        }
        Ok(resolved)
    }

    pub fn is_ancestor_or_self(&self, ancestor: ScopeId, scope: ScopeId) -> bool {
        let mut current = Some(scope);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.get(id).parent;
        }
        false
    }

    /// Nearest scope, starting at `scope` itself, whose kind matches.
    pub fn enclosing(&self, scope: ScopeId, pred: impl Fn(ScopeKind) -> bool) -> Option<ScopeId> {
        let mut current = Some(scope);
        while let Some(id) = current {
            let s = self.get(id);
            if pred(s.kind) {
                return Some(id);
            }
            current = s.parent;
        }
        None
    }
}

fn join_path<S: AsRef<str>>(path: &[S]) -> String {
    path.iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join(".")
}
