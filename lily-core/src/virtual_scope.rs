//! Virtual scopes: captured variables of compound-statement bodies.
//!
//! When an `if`/`while`/`for`/match-case body refers to a variable or
//! parameter of the enclosing function, the body records a virtual entry
//! instead of using the declaration directly. Later checks read the
//! virtual data type, which may add a level of indirection.

use indexmap::IndexMap;
use rustc_hash::FxHashMap;

use crate::data_type::DataType;
use crate::scope::ScopeId;
use crate::symbol::{Local, LocalId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VirtualScopeId(pub u32);

/// Captured local variable.
#[derive(Debug, Clone, PartialEq)]
pub struct VirtualVariable {
    pub source: LocalId,
    pub virtual_data_type: DataType,
}

/// Captured function parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct VirtualFunParam {
    pub source: LocalId,
    pub virtual_data_type: DataType,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Captured<'a> {
    Variable(&'a VirtualVariable),
    FunParam(&'a VirtualFunParam),
}

impl Captured<'_> {
    pub fn source(&self) -> LocalId {
        match self {
            Captured::Variable(v) => v.source,
            Captured::FunParam(p) => p.source,
        }
    }

    pub fn virtual_data_type(&self) -> &DataType {
        match self {
            Captured::Variable(v) => &v.virtual_data_type,
            Captured::FunParam(p) => &p.virtual_data_type,
        }
    }
}

#[derive(Debug, Clone)]
pub struct VirtualScope {
    pub id: VirtualScopeId,
    pub scope: ScopeId,
    pub parent: Option<VirtualScopeId>,
    pub variables: IndexMap<String, VirtualVariable>,
    pub fun_params: IndexMap<String, VirtualFunParam>,
}

#[derive(Debug, Default)]
pub struct VirtualScopeArena {
    scopes: Vec<VirtualScope>,
    by_scope: FxHashMap<ScopeId, VirtualScopeId>,
}

/// Type a capture is seen with: mutable captures are taken by reference,
/// immutable ones by value.
pub fn capture_type(local: &Local) -> DataType {
    let declared = local.data_type.strip_mut().clone();
    if local.mutable {
        DataType::ref_mut(declared)
    } else {
        declared
    }
}

impl VirtualScopeArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&mut self, scope: ScopeId, parent: Option<VirtualScopeId>) -> VirtualScopeId {
        let id = VirtualScopeId(self.scopes.len() as u32);
        self.scopes.push(VirtualScope {
            id,
            scope,
            parent,
            variables: IndexMap::new(),
            fun_params: IndexMap::new(),
        });
        self.by_scope.insert(scope, id);
        id
    }

    pub fn get(&self, id: VirtualScopeId) -> &VirtualScope {
        &self.scopes[id.0 as usize]
    }

    pub fn for_scope(&self, scope: ScopeId) -> Option<VirtualScopeId> {
        self.by_scope.get(&scope).copied()
    }

    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &VirtualScope> {
        self.scopes.iter()
    }

    /// Searches `id` and its parents for a capture of `name`.
    pub fn lookup(&self, id: VirtualScopeId, name: &str) -> Option<Captured<'_>> {
        let mut current = Some(id);
        while let Some(vid) = current {
            let scope = self.get(vid);
            if let Some(var) = scope.variables.get(name) {
                return Some(Captured::Variable(var));
            }
            if let Some(param) = scope.fun_params.get(name) {
                return Some(Captured::FunParam(param));
            }
            current = scope.parent;
        }
        None
    }

    /// Records a capture of `local` in `id`, reusing one made by an
    /// enclosing body.
    pub fn capture(&mut self, id: VirtualScopeId, source: LocalId, local: &Local) -> DataType {
        if let Some(existing) = self.lookup(id, &local.name) {
            if existing.source() == source {
                return existing.virtual_data_type().clone();
            }
        }
        let virtual_data_type = capture_type(local);
        tracing::trace!(name = %local.name, %virtual_data_type, "capture");
        let scope = &mut self.scopes[id.0 as usize];
        if local.is_param {
            scope.fun_params.insert(
                local.name.clone(),
                VirtualFunParam {
                    source,
                    virtual_data_type: virtual_data_type.clone(),
                },
            );
        } else {
            scope.variables.insert(
                local.name.clone(),
                VirtualVariable {
                    source,
                    virtual_data_type: virtual_data_type.clone(),
                },
            );
        }
        virtual_data_type
    }
}
