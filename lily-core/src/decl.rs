//! Declaration table.
//!
//! Declarations are stored once and referred to by [`DeclId`]; data types
//! name them through their global name (`module.Name`). Every field and
//! parameter type held here is already resolved: custom names are global
//! and generic parameters are `DataType::Generic` leaves.

use rustc_hash::{FxHashMap, FxHashSet};

use crate::data_type::{ArrayKind, DataType};
use crate::generic::{GenericParams, Substitution};
use crate::scope::ScopeId;
use crate::signature::SignatureList;
use crate::span::Span;
use crate::symbol::{DeclId, SymbolKind, Visibility};

#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    pub data_type: DataType,
    pub mutable: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub data_type: DataType,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Variant {
    pub name: String,
    pub payload: Option<DataType>,
}

/// Method prototype required by a trait.
#[derive(Debug, Clone, PartialEq)]
pub struct Prototype {
    pub name: String,
    pub params: Vec<DataType>,
    pub return_type: DataType,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunDecl {
    pub params: Vec<Param>,
    pub return_type: DataType,
    /// Owning class for methods.
    pub class: Option<DeclId>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DeclKind {
    Fun(FunDecl),
    Record {
        fields: Vec<Field>,
    },
    Enum {
        variants: Vec<Variant>,
    },
    Class {
        fields: Vec<Field>,
        methods: Vec<DeclId>,
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
    },
    Error {
        payload: Option<DataType>,
    },
    Module,
}

impl DeclKind {
    pub fn symbol_kind(&self) -> SymbolKind {
        match self {
            DeclKind::Fun(fun) if fun.class.is_some() => SymbolKind::Method,
            DeclKind::Fun(_) => SymbolKind::Fun,
            DeclKind::Record { .. } => SymbolKind::Record,
            DeclKind::Enum { .. } => SymbolKind::Enum,
            DeclKind::Class { .. } => SymbolKind::Class,
            DeclKind::Trait { .. } => SymbolKind::Trait,
            DeclKind::Alias { .. } => SymbolKind::Alias,
            DeclKind::Constant { .. } => SymbolKind::Constant,
            DeclKind::Error { .. } => SymbolKind::Error,
            DeclKind::Module => SymbolKind::Module,
        }
    }

    /// Record and class fields.
    pub fn fields(&self) -> &[Field] {
        match self {
            DeclKind::Record { fields } | DeclKind::Class { fields, .. } => fields,
            _ => &[],
        }
    }

    pub fn as_fun(&self) -> Option<&FunDecl> {
        match self {
            DeclKind::Fun(fun) => Some(fun),
            _ => None,
        }
    }

    /// Types stored inline in a value of this declaration.
    pub fn member_types(&self) -> Vec<&DataType> {
        match self {
            DeclKind::Record { fields } | DeclKind::Class { fields, .. } => {
                fields.iter().map(|f| &f.data_type).collect()
            }
            DeclKind::Enum { variants } => {
                variants.iter().filter_map(|v| v.payload.as_ref()).collect()
            }
            DeclKind::Alias { data_type } => vec![data_type],
            DeclKind::Error { payload } => payload.iter().collect(),
            _ => Vec::new(),
        }
    }
}

/// Instantiation requested inside a generic body whose arguments mention
/// the body's own generic parameters. Replayed for every concrete
/// signature of the owner.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingInstantiation {
    pub target: DeclId,
    pub generic_args: Vec<DataType>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct Decl {
    pub id: DeclId,
    pub name: String,
    pub global_name: String,
    pub kind: DeclKind,
    pub generic_params: GenericParams,
    pub signatures: SignatureList,
    /// Reaches itself through its member types.
    pub is_recursive: bool,
    /// Reaches itself without any indirection; never expanded.
    pub recursion_error: bool,
    /// Scope the declaration is registered in.
    pub scope: ScopeId,
    pub visibility: Visibility,
    pub span: Span,
    pub pending: Vec<PendingInstantiation>,
}

impl Decl {
    pub fn is_generic(&self) -> bool {
        !self.generic_params.is_empty()
    }

    pub fn symbol_kind(&self) -> SymbolKind {
        self.kind.symbol_kind()
    }

    /// Generic parameters as `Generic` leaves, in declaration order.
    pub fn generic_leaves(&self) -> Vec<DataType> {
        self.generic_params
            .iter()
            .map(|p| DataType::Generic(p.name().to_string()))
            .collect()
    }

    /// The data type naming this declaration with its own parameters.
    pub fn self_type(&self) -> DataType {
        DataType::custom(self.global_name.clone(), self.generic_leaves())
    }

    /// Resolved signature types under `subst`: parameters then return type
    /// for functions, empty otherwise.
    pub fn signature_types(&self, subst: &Substitution) -> Vec<DataType> {
        match &self.kind {
            DeclKind::Fun(fun) => fun
                .params
                .iter()
                .map(|p| subst.apply(&p.data_type))
                .chain(core::iter::once(subst.apply(&fun.return_type)))
                .collect(),
            _ => Vec::new(),
        }
    }
}

#[derive(Debug, Default)]
pub struct DeclTable {
    decls: Vec<Decl>,
    by_global_name: FxHashMap<String, DeclId>,
}

impl DeclTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a declaration. Global names are unique; overloads are given
    /// distinct global names by the caller.
    #[allow(clippy::too_many_arguments)]
    pub fn push(
        &mut self,
        name: &str,
        global_name: String,
        kind: DeclKind,
        generic_params: GenericParams,
        scope: ScopeId,
        visibility: Visibility,
        span: Span,
    ) -> DeclId {
        let id = DeclId(self.decls.len() as u32);
        // A duplicate keeps resolving to the first declaration, as the scope does.
        self.by_global_name.entry(global_name.clone()).or_insert(id);
        self.decls.push(Decl {
            id,
            name: name.to_string(),
            global_name,
            kind,
            generic_params,
            signatures: SignatureList::new(),
            is_recursive: false,
            recursion_error: false,
            scope,
            visibility,
            span,
            pending: Vec::new(),
        });
        id
    }

    pub fn get(&self, id: DeclId) -> &Decl {
        &self.decls[id.index()]
    }

    pub fn get_mut(&mut self, id: DeclId) -> &mut Decl {
        &mut self.decls[id.index()]
    }

    pub fn by_global_name(&self, global_name: &str) -> Option<DeclId> {
        self.by_global_name.get(global_name).copied()
    }

    /// Declaration named by a `Custom` data type.
    pub fn of_custom(&self, dt: &DataType) -> Option<&Decl> {
        match dt {
            DataType::Custom(custom) => self.by_global_name(&custom.name).map(|id| self.get(id)),
            _ => None,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Decl> {
        self.decls.iter()
    }

    pub fn ids(&self) -> impl Iterator<Item = DeclId> + use<> {
        (0..self.decls.len() as u32).map(DeclId)
    }

    pub fn len(&self) -> usize {
        self.decls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decls.is_empty()
    }

    /// Marks `is_recursive` and `recursion_error` on every type declaration.
    ///
    /// Runs on the generic declarations before any substitution, so the
    /// dependency closure can refuse to expand an infinite type. Returns the
    /// declarations whose cycle has no indirection.
    pub fn detect_recursive_types(&mut self) -> Vec<DeclId> {
        let by_value = self.params_held_by_value();
        let edges: Vec<Vec<(DeclId, bool)>> = self
            .decls
            .iter()
            .map(|decl| {
                let mut out = Vec::new();
                for dt in decl.kind.member_types() {
                    self.collect_edges(dt, true, &by_value, &mut out);
                }
                out
            })
            .collect();

        let mut errors = Vec::new();
        for id in self.ids() {
            let is_recursive = reaches(&edges, id, false);
            let recursion_error = is_recursive && reaches(&edges, id, true);
            let decl = &mut self.decls[id.index()];
            decl.is_recursive = is_recursive;
            decl.recursion_error = recursion_error;
            if recursion_error {
                errors.push(id);
            }
        }
        errors
    }

    /// For every declaration, which of its generic parameters (by position)
    /// end up stored inline in a value of that type. Computed to a fixpoint
    /// since `Outer[T] { inner: Inner[T] }` holds `T` inline only if `Inner`
    /// does.
    fn params_held_by_value(&self) -> Vec<Vec<bool>> {
        let mut by_value: Vec<Vec<bool>> = self
            .decls
            .iter()
            .map(|decl| vec![false; decl.generic_params.len()])
            .collect();
        loop {
            let mut changed = false;
            for (index, decl) in self.decls.iter().enumerate() {
                let mut held = FxHashSet::default();
                for dt in decl.kind.member_types() {
                    self.collect_inline_params(dt, true, &by_value, &mut held);
                }
                for (position, param) in decl.generic_params.iter().enumerate() {
                    if !by_value[index][position] && held.contains(param.name()) {
                        by_value[index][position] = true;
                        changed = true;
                    }
                }
            }
            if !changed {
                return by_value;
            }
        }
    }

    fn collect_inline_params<'a>(
        &self,
        dt: &'a DataType,
        direct: bool,
        by_value: &[Vec<bool>],
        held: &mut FxHashSet<&'a str>,
    ) {
        if !direct {
            return;
        }
        match dt {
            DataType::Generic(name) => {
                held.insert(name.as_str());
            }
            DataType::Mut(inner) | DataType::Optional(inner) => {
                self.collect_inline_params(inner, direct, by_value, held)
            }
            DataType::Array(array) if matches!(array.kind, ArrayKind::Sized(_)) => {
                self.collect_inline_params(&array.element, direct, by_value, held)
            }
            DataType::Tuple(items) => items
                .iter()
                .for_each(|item| self.collect_inline_params(item, direct, by_value, held)),
            DataType::Result(result) => {
                self.collect_inline_params(&result.ok, direct, by_value, held);
                result
                    .errs
                    .iter()
                    .for_each(|err| self.collect_inline_params(err, direct, by_value, held));
            }
            DataType::Custom(custom) => {
                for (position, arg) in custom.generic_args.iter().enumerate() {
                    let inline = self.arg_held_by_value(&custom.name, position, by_value);
                    self.collect_inline_params(arg, inline, by_value, held);
                }
            }
            _ => {}
        }
    }

    /// Whether the `position`-th argument of `global_name` is stored inline.
    /// Unknown declarations are assumed to store it inline.
    fn arg_held_by_value(&self, global_name: &str, position: usize, by_value: &[Vec<bool>]) -> bool {
        match self.by_global_name(global_name) {
            Some(id) => match self.get(id).kind {
                DeclKind::Class { .. } | DeclKind::Trait { .. } => false,
                _ => by_value[id.index()].get(position).copied().unwrap_or(true),
            },
            None => true,
        }
    }

    fn collect_edges(
        &self,
        dt: &DataType,
        direct: bool,
        by_value: &[Vec<bool>],
        out: &mut Vec<(DeclId, bool)>,
    ) {
        match dt {
            DataType::Ptr(inner)
            | DataType::PtrMut(inner)
            | DataType::Ref(inner)
            | DataType::RefMut(inner)
            | DataType::List(inner) => self.collect_edges(inner, false, by_value, out),
            DataType::Mut(inner) | DataType::Optional(inner) => {
                self.collect_edges(inner, direct, by_value, out)
            }
            DataType::Array(array) => {
                let inline = matches!(array.kind, ArrayKind::Sized(_));
                self.collect_edges(&array.element, direct && inline, by_value, out);
            }
            DataType::Tuple(items) => items
                .iter()
                .for_each(|item| self.collect_edges(item, direct, by_value, out)),
            DataType::Result(result) => {
                self.collect_edges(&result.ok, direct, by_value, out);
                result
                    .errs
                    .iter()
                    .for_each(|err| self.collect_edges(err, direct, by_value, out));
            }
            DataType::Lambda(lambda) => {
                lambda
                    .params
                    .iter()
                    .for_each(|p| self.collect_edges(p, false, by_value, out));
                self.collect_edges(&lambda.return_type, false, by_value, out);
            }
            DataType::Custom(custom) => {
                if let Some(id) = self.by_global_name(&custom.name) {
                    match self.get(id).kind {
                        // Class values are references.
                        DeclKind::Class { .. } => out.push((id, false)),
                        DeclKind::Trait { .. } => {}
                        _ => out.push((id, direct)),
                    }
                }
                for (position, arg) in custom.generic_args.iter().enumerate() {
                    let inline = direct && self.arg_held_by_value(&custom.name, position, by_value);
                    self.collect_edges(arg, inline, by_value, out);
                }
            }
            _ => {}
        }
    }
}

/// Whether `start` reaches itself; with `direct_only`, through by-value
/// edges exclusively.
fn reaches(edges: &[Vec<(DeclId, bool)>], start: DeclId, direct_only: bool) -> bool {
    let mut seen = FxHashSet::default();
    let mut stack: Vec<DeclId> = edges[start.index()]
        .iter()
        .filter(|(_, direct)| !direct_only || *direct)
        .map(|(id, _)| *id)
        .collect();
    while let Some(id) = stack.pop() {
        if id == start {
            return true;
        }
        if !seen.insert(id) {
            continue;
        }
        stack.extend(
            edges[id.index()]
                .iter()
                .filter(|(_, direct)| !direct_only || *direct)
                .map(|(id, _)| *id),
        );
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generic::GenericParam;

    fn record(table: &mut DeclTable, name: &str, fields: Vec<(&str, DataType)>) -> DeclId {
        table.push(
            name,
            format!("main.{name}"),
            DeclKind::Record {
                fields: fields
                    .into_iter()
                    .map(|(n, dt)| Field {
                        name: n.to_string(),
                        data_type: dt,
                    })
                    .collect(),
            },
            GenericParams::new(),
            ScopeId(0),
            Visibility::Public,
            Span::dummy(),
        )
    }

    #[test]
    fn pointer_cycle_is_recursive_but_valid() {
        let mut table = DeclTable::new();
        let node = record(
            &mut table,
            "Node",
            vec![
                ("value", DataType::Int32),
                ("next", DataType::ptr(DataType::custom("main.Node", vec![]))),
            ],
        );
        let errors = table.detect_recursive_types();
        assert!(errors.is_empty());
        assert!(table.get(node).is_recursive);
        assert!(!table.get(node).recursion_error);
    }

    fn generic_record(
        table: &mut DeclTable,
        name: &str,
        param: &str,
        fields: Vec<(&str, DataType)>,
    ) -> DeclId {
        let id = record(table, name, fields);
        table.get_mut(id).generic_params = smallvec::smallvec![GenericParam::normal(param)];
        id
    }

    #[test]
    fn pointer_backed_container_breaks_the_cycle() {
        let mut table = DeclTable::new();
        generic_record(
            &mut table,
            "Vec",
            "T",
            vec![
                ("data", DataType::ptr(DataType::generic("T"))),
                ("len", DataType::Usize),
            ],
        );
        let tree = record(
            &mut table,
            "Tree",
            vec![(
                "children",
                DataType::custom("main.Vec", vec![DataType::custom("main.Tree", vec![])]),
            )],
        );
        let errors = table.detect_recursive_types();
        assert!(errors.is_empty(), "unexpected errors: {errors:?}");
        assert!(table.get(tree).is_recursive);
        assert!(!table.get(tree).recursion_error);
    }

    #[test]
    fn inline_container_keeps_the_cycle_by_value() {
        let mut table = DeclTable::new();
        generic_record(&mut table, "Cell", "T", vec![("value", DataType::generic("T"))]);
        generic_record(
            &mut table,
            "Wrap",
            "U",
            vec![(
                "cell",
                DataType::custom("main.Cell", vec![DataType::generic("U")]),
            )],
        );
        let bad = record(
            &mut table,
            "Bad",
            vec![(
                "inner",
                DataType::custom("main.Wrap", vec![DataType::custom("main.Bad", vec![])]),
            )],
        );
        assert_eq!(table.detect_recursive_types(), vec![bad]);
    }

    #[test]
    fn duplicate_global_name_resolves_to_first() {
        let mut table = DeclTable::new();
        let first = record(&mut table, "Point", vec![("x", DataType::Int32)]);
        let second = record(&mut table, "Point", vec![("y", DataType::Int32)]);
        assert_ne!(first, second);
        assert_eq!(table.by_global_name("main.Point"), Some(first));
    }

    #[test]
    fn mutual_by_value_cycle_is_an_error() {
        let mut table = DeclTable::new();
        let a = record(&mut table, "A", vec![("b", DataType::custom("main.B", vec![]))]);
        let b = record(&mut table, "B", vec![("a", DataType::custom("main.A", vec![]))]);
        let c = record(&mut table, "C", vec![("a", DataType::custom("main.A", vec![]))]);
        let errors = table.detect_recursive_types();
        assert_eq!(errors, vec![a, b]);
        assert!(!table.get(c).is_recursive, "C uses the cycle but is not part of it");
    }

    #[test]
    fn function_signature_types_end_with_return_type() {
        let mut table = DeclTable::new();
        let id = table.push(
            "first",
            "main.first".to_string(),
            DeclKind::Fun(FunDecl {
                params: vec![Param {
                    name: "xs".to_string(),
                    data_type: DataType::list(DataType::generic("T")),
                    mutable: false,
                }],
                return_type: DataType::generic("T"),
                class: None,
            }),
            smallvec::smallvec![GenericParam::normal("T")],
            ScopeId(0),
            Visibility::Public,
            Span::dummy(),
        );
        let mut subst = Substitution::new();
        subst.insert("T", DataType::Char);
        assert_eq!(
            table.get(id).signature_types(&subst),
            vec![DataType::list(DataType::Char), DataType::Char]
        );
    }
}
