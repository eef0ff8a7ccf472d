//! Generic parameters, call-site bindings and substitution.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::data_type::DataType;
use crate::error::SemaError;

/// Generic parameter declared by a function, method, record, enum,
/// class, trait or alias.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GenericParam {
    Normal {
        name: String,
    },
    /// `T: C1, C2`; the argument must be compatible with every constraint.
    Constraint {
        name: String,
        constraints: Vec<DataType>,
    },
}

impl GenericParam {
    pub fn normal(name: impl Into<String>) -> Self {
        GenericParam::Normal { name: name.into() }
    }

    pub fn constrained(name: impl Into<String>, constraints: Vec<DataType>) -> Self {
        GenericParam::Constraint {
            name: name.into(),
            constraints,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            GenericParam::Normal { name } | GenericParam::Constraint { name, .. } => name,
        }
    }

    pub fn constraints(&self) -> &[DataType] {
        match self {
            GenericParam::Normal { .. } => &[],
            GenericParam::Constraint { constraints, .. } => constraints,
        }
    }
}

/// Declared generic parameters in source order. Order is significant:
/// positional arguments bind by index.
pub type GenericParams = SmallVec<[GenericParam; 2]>;

/// Merge parent (class) parameters in front of a member's own.
pub fn merge_generic_params(outer: &[GenericParam], inner: &[GenericParam]) -> GenericParams {
    outer.iter().chain(inner).cloned().collect()
}

/// Generic arguments supplied at a use site.
#[derive(Debug, Clone, PartialEq)]
pub enum CalledGenericParams {
    Positional(Vec<DataType>),
    Named(IndexMap<String, DataType>),
}

impl CalledGenericParams {
    pub fn none() -> Self {
        CalledGenericParams::Positional(Vec::new())
    }
}

/// Answers whether a concrete data type satisfies a constraint.
///
/// Implemented by the data type resolver, which knows declarations and
/// their `implements` lists.
pub trait ConstraintOracle {
    fn satisfies(&self, data_type: &DataType, constraint: &DataType) -> bool;
}

/// Resolved binding of generic parameter names to data types.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Substitution {
    bindings: IndexMap<String, DataType>,
    /// Declared parameters with no binding at all.
    missing: Vec<String>,
}

impl Substitution {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `params` against `called`, checking arity and constraints.
    ///
    /// Constraints are only checked for arguments that are already
    /// concrete; arguments that still mention generic leaves are checked
    /// again once an outer substitution resolves them.
    pub fn bind(
        owner: &str,
        params: &[GenericParam],
        called: &CalledGenericParams,
        oracle: &dyn ConstraintOracle,
    ) -> Result<Self, SemaError> {
        let mut subst = Substitution::new();
        match called {
            CalledGenericParams::Positional(args) => {
                if args.len() != params.len() {
                    return Err(SemaError::GenericArity {
                        name: owner.to_string(),
                        expected: params.len(),
                        found: args.len(),
                    });
                }
                for (param, arg) in params.iter().zip(args) {
                    subst.insert(param.name(), arg.clone());
                }
            }
            CalledGenericParams::Named(args) => {
                for name in args.keys() {
                    if !params.iter().any(|p| p.name() == name) {
                        return Err(SemaError::UnknownSymbol { name: name.clone() });
                    }
                }
                for param in params {
                    match args.get(param.name()) {
                        Some(arg) => subst.insert(param.name(), arg.clone()),
                        None => subst.missing.push(param.name().to_string()),
                    }
                }
            }
        }
        subst.check_constraints(params, oracle)?;
        Ok(subst)
    }

    pub fn from_map(bindings: IndexMap<String, DataType>) -> Self {
        Substitution {
            bindings,
            missing: Vec::new(),
        }
    }

    pub fn insert(&mut self, name: &str, dt: DataType) {
        self.missing.retain(|m| m != name);
        self.bindings.insert(name.to_string(), dt);
    }

    pub fn get(&self, name: &str) -> Option<&DataType> {
        self.bindings.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty() && self.missing.is_empty()
    }

    pub fn as_map(&self) -> &IndexMap<String, DataType> {
        &self.bindings
    }

    pub fn into_map(self) -> IndexMap<String, DataType> {
        self.bindings
    }

    /// Parameters that are not concrete yet: unbound, or bound to a type
    /// that still contains a generic leaf.
    pub fn unresolved(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.missing.iter().map(String::as_str).collect();
        names.extend(
            self.bindings
                .iter()
                .filter(|(_, dt)| dt.contains_generic())
                .map(|(name, _)| name.as_str()),
        );
        names
    }

    pub fn is_resolved(&self) -> bool {
        self.missing.is_empty() && self.bindings.values().all(|dt| !dt.contains_generic())
    }

    /// Rewrites every `Generic` leaf bound here; other leaves are kept.
    pub fn apply(&self, dt: &DataType) -> DataType {
        if self.bindings.is_empty() {
            return dt.clone();
        }
        dt.fold(&mut |node| match node {
            DataType::Generic(name) => self.bindings.get(name).cloned(),
            _ => None,
        })
    }

    /// Second pass: resolves the bindings of `self` through an enclosing
    /// substitution that became known later.
    pub fn then(&self, outer: &Substitution) -> Substitution {
        Substitution {
            bindings: self
                .bindings
                .iter()
                .map(|(name, dt)| (name.clone(), outer.apply(dt)))
                .collect(),
            missing: self.missing.clone(),
        }
    }

    pub fn check_constraints(
        &self,
        params: &[GenericParam],
        oracle: &dyn ConstraintOracle,
    ) -> Result<(), SemaError> {
        for param in params {
            let Some(bound) = self.bindings.get(param.name()) else {
                continue;
            };
            if bound.contains_generic() {
                continue;
            }
            for constraint in param.constraints() {
                let constraint = self.apply(constraint);
                if constraint.contains_generic() {
                    continue;
                }
                if !oracle.satisfies(bound, &constraint) {
                    return Err(SemaError::ConstraintViolation {
                        param: param.name().to_string(),
                        data_type: bound.clone(),
                        constraint,
                    });
                }
            }
        }
        Ok(())
    }
}

/// Substitutes the generic parameters of a declaration inside `data_type`
/// with the arguments supplied at a use site.
pub fn substitute(
    data_type: &DataType,
    generic_params: &[GenericParam],
    called_generic_params: &CalledGenericParams,
    oracle: &dyn ConstraintOracle,
) -> Result<DataType, SemaError> {
    let subst = Substitution::bind("<substitute>", generic_params, called_generic_params, oracle)?;
    Ok(subst.apply(data_type))
}

/// Infers generic arguments by matching a declared parameter type against
/// the type of the supplied argument.
///
/// The first binding found for a name wins; a later conflicting argument
/// is left for the ordinary argument check to report.
pub fn infer_generic_args(
    declared: &DataType,
    actual: &DataType,
    params: &[GenericParam],
    out: &mut IndexMap<String, DataType>,
) {
    match (declared, actual) {
        (_, DataType::Unknown) => {}
        (DataType::Mut(d), a) => infer_generic_args(d, a.strip_mut(), params, out),
        (d, DataType::Mut(a)) => infer_generic_args(d, a, params, out),
        // Captured variables arrive behind a reference; bind the pointee.
        (d, DataType::Ref(a) | DataType::RefMut(a)) if !d.is_reference() => {
            infer_generic_args(d, a, params, out)
        }
        (DataType::Generic(name), _) if params.iter().any(|p| p.name() == name) => {
            if !out.contains_key(name) {
                out.insert(name.clone(), actual.clone());
            }
        }
        (DataType::Ptr(d), DataType::Ptr(a) | DataType::PtrMut(a))
        | (DataType::PtrMut(d), DataType::PtrMut(a))
        | (DataType::Ref(d), DataType::Ref(a) | DataType::RefMut(a))
        | (DataType::RefMut(d), DataType::RefMut(a))
        | (DataType::List(d), DataType::List(a))
        | (DataType::Optional(d), DataType::Optional(a)) => infer_generic_args(d, a, params, out),
        (DataType::Ptr(d) | DataType::PtrMut(d), DataType::Array(a)) => {
            infer_generic_args(d, &a.element, params, out)
        }
        (DataType::Array(d), DataType::Array(a)) => {
            infer_generic_args(&d.element, &a.element, params, out)
        }
        (DataType::Tuple(ds), DataType::Tuple(as_)) if ds.len() == as_.len() => {
            for (d, a) in ds.iter().zip(as_) {
                infer_generic_args(d, a, params, out);
            }
        }
        (DataType::Lambda(d), DataType::Lambda(a)) if d.params.len() == a.params.len() => {
            for (dp, ap) in d.params.iter().zip(&a.params) {
                infer_generic_args(dp, ap, params, out);
            }
            infer_generic_args(&d.return_type, &a.return_type, params, out);
        }
        (DataType::Result(d), DataType::Result(a)) => {
            infer_generic_args(&d.ok, &a.ok, params, out);
            for (de, ae) in d.errs.iter().zip(&a.errs) {
                infer_generic_args(de, ae, params, out);
            }
        }
        (DataType::Custom(d), DataType::Custom(a))
            if d.name == a.name && d.generic_args.len() == a.generic_args.len() =>
        {
            for (dg, ag) in d.generic_args.iter().zip(&a.generic_args) {
                infer_generic_args(dg, ag, params, out);
            }
        }
        _ => {}
    }
}

/// Names placeholders for generic arguments that were neither written nor
/// inferable: `a`..`z`, then `za`..`zz`, `zza`, ...
#[derive(Debug, Default)]
pub struct CompilerGenericNamer {
    next: usize,
}

impl CompilerGenericNamer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_name(&mut self) -> String {
        let n = self.next;
        self.next += 1;
        let mut name = "z".repeat(n / 26);
        name.push((b'a' + (n % 26) as u8) as char);
        name
    }

    pub fn fresh(&mut self) -> DataType {
        DataType::CompilerGeneric(self.next_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Exact;

    impl ConstraintOracle for Exact {
        fn satisfies(&self, data_type: &DataType, constraint: &DataType) -> bool {
            data_type == constraint
        }
    }

    fn params() -> GenericParams {
        smallvec::smallvec![
            GenericParam::normal("T"),
            GenericParam::constrained("U", vec![DataType::Int64]),
        ]
    }

    #[test]
    fn substitutes_matching_leaves_only() {
        let dt = DataType::Tuple(vec![
            DataType::generic("T"),
            DataType::ptr(DataType::generic("U")),
            DataType::generic("V"),
        ]);
        let called = CalledGenericParams::Positional(vec![DataType::Bool, DataType::Int64]);
        let out = substitute(&dt, &params(), &called, &Exact).expect("substitute");
        assert_eq!(
            out,
            DataType::Tuple(vec![
                DataType::Bool,
                DataType::ptr(DataType::Int64),
                DataType::generic("V"),
            ])
        );
    }

    #[test]
    fn constraint_violation_is_reported() {
        let called = CalledGenericParams::Positional(vec![DataType::Bool, DataType::Str]);
        let err = Substitution::bind("f", &params(), &called, &Exact).unwrap_err();
        assert!(matches!(err, SemaError::ConstraintViolation { ref param, .. } if param == "U"));
    }

    #[test]
    fn arity_is_checked() {
        let called = CalledGenericParams::Positional(vec![DataType::Bool]);
        let err = Substitution::bind("f", &params(), &called, &Exact).unwrap_err();
        assert_eq!(
            err,
            SemaError::GenericArity {
                name: "f".to_string(),
                expected: 2,
                found: 1
            }
        );
    }

    #[test]
    fn unresolved_bindings_are_revisited() {
        let mut named = IndexMap::new();
        named.insert("T".to_string(), DataType::list(DataType::generic("X")));
        let inner = Substitution::bind("g", &params(), &CalledGenericParams::Named(named), &Exact)
            .expect("bind");
        assert_eq!(inner.unresolved(), vec!["U", "T"]);

        let mut outer = Substitution::new();
        outer.insert("X", DataType::Char);
        let resolved = inner.then(&outer);
        assert_eq!(resolved.get("T"), Some(&DataType::list(DataType::Char)));
        assert_eq!(resolved.unresolved(), vec!["U"]);
    }

    #[test]
    fn infers_from_nested_arguments() {
        let mut out = IndexMap::new();
        infer_generic_args(
            &DataType::custom("Pair", vec![DataType::generic("T")]),
            &DataType::custom("Pair", vec![DataType::Float64]),
            &params(),
            &mut out,
        );
        infer_generic_args(
            &DataType::ptr(DataType::generic("U")),
            &DataType::sized_array(DataType::Int64, 4),
            &params(),
            &mut out,
        );
        assert_eq!(out.get("T"), Some(&DataType::Float64));
        assert_eq!(out.get("U"), Some(&DataType::Int64));
    }

    #[test]
    fn compiler_generic_names_follow_z_prefix_scheme() {
        let mut namer = CompilerGenericNamer::new();
        let names: Vec<String> = (0..28).map(|_| namer.next_name()).collect();
        assert_eq!(names[0], "a");
        assert_eq!(names[25], "z");
        assert_eq!(names[26], "za");
        assert_eq!(names[27], "zb");
    }
}
