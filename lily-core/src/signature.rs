//! Signatures: concrete instantiations of a declaration.
//!
//! Each declaration owns a [`SignatureList`]. It holds one entry per
//! distinct resolved generic-argument tuple and is only ever appended to
//! through [`SignatureList::add_signature`].

use indexmap::IndexMap;
use rustc_hash::FxHashMap;

use crate::data_type::DataType;
use crate::error::SemaError;
use crate::mangle;

#[derive(Debug, Clone, PartialEq)]
pub struct Signature {
    pub global_name: String,
    /// Mangled name, unique per resolved `generic_params` tuple.
    pub ser_global_name: String,
    pub generic_params: IndexMap<String, DataType>,
    /// Functions: resolved parameter types followed by the return type.
    /// Empty for other declarations.
    pub types: Vec<DataType>,
}

impl Signature {
    pub fn has_only_known_types(&self) -> bool {
        self.generic_params
            .values()
            .chain(&self.types)
            .all(|dt| !dt.contains_generic())
    }

    /// Return type of a function signature.
    pub fn return_type(&self) -> Option<&DataType> {
        self.types.last()
    }

    pub fn param_types(&self) -> &[DataType] {
        match self.types.split_last() {
            Some((_, params)) => params,
            None => &[],
        }
    }
}

/// Outcome of [`SignatureList::add_signature`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddSignature {
    New(usize),
    Existing(usize),
    /// Some argument still contains a generic leaf; nothing was recorded.
    Deferred,
}

impl AddSignature {
    pub fn index(self) -> Option<usize> {
        match self {
            AddSignature::New(index) | AddSignature::Existing(index) => Some(index),
            AddSignature::Deferred => None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SignatureList {
    signatures: Vec<Signature>,
    by_ser_global_name: FxHashMap<String, usize>,
}

impl SignatureList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the instantiation of `global_name` with `generic_params`.
    ///
    /// Idempotent: the same resolved map always yields the same index.
    /// A mangled-name hit with a different tuple is reported as
    /// `ManglingCollision` instead of silently reusing the entry.
    pub fn add_signature(
        &mut self,
        global_name: &str,
        generic_params: IndexMap<String, DataType>,
        types: Vec<DataType>,
    ) -> Result<AddSignature, SemaError> {
        if generic_params.values().any(DataType::contains_generic) {
            tracing::debug!(global_name, "signature deferred");
            return Ok(AddSignature::Deferred);
        }

        let ser_global_name = mangle::ser_global_name(global_name, &generic_params);
        if let Some(&index) = self.by_ser_global_name.get(&ser_global_name) {
            let existing = &self.signatures[index];
            if !same_tuple(&existing.generic_params, &generic_params) {
                return Err(SemaError::ManglingCollision { ser_global_name });
            }
            tracing::debug!(%ser_global_name, index, "signature reused");
            return Ok(AddSignature::Existing(index));
        }

        let index = self.signatures.len();
        tracing::debug!(%ser_global_name, index, "signature created");
        self.by_ser_global_name.insert(ser_global_name.clone(), index);
        self.signatures.push(Signature {
            global_name: global_name.to_string(),
            ser_global_name,
            generic_params,
            types,
        });
        Ok(AddSignature::New(index))
    }

    /// Existing instantiation for `generic_params`, without inserting.
    pub fn find(&self, generic_params: &IndexMap<String, DataType>) -> Option<usize> {
        self.signatures
            .iter()
            .position(|sig| same_tuple(&sig.generic_params, generic_params))
    }

    /// First signature whose types are all concrete.
    pub fn user_defined(&self) -> Option<&Signature> {
        self.signatures.iter().find(|sig| sig.has_only_known_types())
    }

    pub fn get(&self, index: usize) -> Option<&Signature> {
        self.signatures.get(index)
    }

    pub fn by_ser_global_name(&self, name: &str) -> Option<&Signature> {
        self.by_ser_global_name
            .get(name)
            .map(|&index| &self.signatures[index])
    }

    pub fn iter(&self) -> impl Iterator<Item = &Signature> {
        self.signatures.iter()
    }

    pub fn len(&self) -> usize {
        self.signatures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signatures.is_empty()
    }
}

/// Positional comparison; parameter names are fixed per declaration.
fn same_tuple(a: &IndexMap<String, DataType>, b: &IndexMap<String, DataType>) -> bool {
    a.len() == b.len() && a.values().zip(b.values()).all(|(x, y)| x == y)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(dt: DataType) -> IndexMap<String, DataType> {
        let mut m = IndexMap::new();
        m.insert("T".to_string(), dt);
        m
    }

    #[test]
    fn same_arguments_return_same_index() {
        let mut list = SignatureList::new();
        let first = list
            .add_signature("main.Pair", map(DataType::Int32), vec![])
            .expect("first");
        let second = list
            .add_signature("main.Pair", map(DataType::Int32), vec![])
            .expect("second");
        assert_eq!(first, AddSignature::New(0));
        assert_eq!(second, AddSignature::Existing(0));
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn distinct_arguments_get_distinct_mangled_names() {
        let mut list = SignatureList::new();
        list.add_signature("main.Pair", map(DataType::Int32), vec![])
            .expect("int");
        list.add_signature("main.Pair", map(DataType::Float64), vec![])
            .expect("float");
        assert_eq!(list.len(), 2);
        let names: Vec<_> = list.iter().map(|s| s.ser_global_name.as_str()).collect();
        assert_ne!(names[0], names[1]);
        assert_eq!(list.find(&map(DataType::Float64)), Some(1));
    }

    #[test]
    fn generic_leaves_defer() {
        let mut list = SignatureList::new();
        let result = list
            .add_signature("main.Pair", map(DataType::list(DataType::generic("U"))), vec![])
            .expect("deferred");
        assert_eq!(result, AddSignature::Deferred);
        let placeholder = list
            .add_signature(
                "main.Pair",
                map(DataType::CompilerGeneric("a".to_string())),
                vec![],
            )
            .expect("deferred");
        assert_eq!(placeholder, AddSignature::Deferred);
        assert!(list.is_empty());
    }

    #[test]
    fn non_generic_signature_keeps_global_name() {
        let mut list = SignatureList::new();
        list.add_signature("main.run", IndexMap::new(), vec![DataType::Unit])
            .expect("run");
        let sig = list.user_defined().expect("concrete signature");
        assert_eq!(sig.ser_global_name, "main.run");
        assert_eq!(sig.return_type(), Some(&DataType::Unit));
        assert!(sig.param_types().is_empty());
    }
}
