//! Data type resolution, classification and compatibility.
//!
//! [`DataTypeResolver::resolve`] is the entry point every other component
//! goes through before comparing or storing a type. The cast decision is
//! total: each pair of types yields a [`CastDecision`] or `TypeMismatch`.

use crate::data_type::{DataType, least_common_supertype};
use crate::decl::{Decl, DeclKind, DeclTable};
use crate::error::SemaError;
use crate::generic::{CalledGenericParams, ConstraintOracle, GenericParam, Substitution};

/// Alias chains longer than this are left unexpanded.
const MAX_ALIAS_DEPTH: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CastDecision {
    NoCast,
    NumericCast,
    PointerCast,
}

#[derive(Debug, Clone, Copy)]
pub struct DataTypeResolver<'a> {
    decls: &'a DeclTable,
    allow_implicit_cast: bool,
}

/// Types that compare equal to anything: the error sentinel and
/// placeholders for generic arguments that are not known yet.
fn is_placeholder(dt: &DataType) -> bool {
    matches!(dt, DataType::Unknown | DataType::CompilerGeneric(_))
}

impl<'a> DataTypeResolver<'a> {
    pub fn new(decls: &'a DeclTable, allow_implicit_cast: bool) -> Self {
        DataTypeResolver {
            decls,
            allow_implicit_cast,
        }
    }

    pub fn decls(&self) -> &'a DeclTable {
        self.decls
    }

    /// Substitutes the declaration's generic parameters with the called
    /// ones, then normalizes.
    pub fn resolve(
        &self,
        data_type: &DataType,
        called_generic_params: &CalledGenericParams,
        decl_generic_params: &[GenericParam],
    ) -> Result<DataType, SemaError> {
        let subst = match called_generic_params {
            CalledGenericParams::Positional(args) if args.is_empty() => Substitution::new(),
            called => Substitution::bind("<resolve>", decl_generic_params, called, self)?,
        };
        Ok(self.resolve_with(data_type, &subst))
    }

    pub fn resolve_with(&self, data_type: &DataType, subst: &Substitution) -> DataType {
        self.normalize(&subst.apply(data_type))
    }

    /// Expands aliases and collapses nested `mut` wrappers.
    pub fn normalize(&self, data_type: &DataType) -> DataType {
        self.normalize_at(data_type, 0)
    }

    fn normalize_at(&self, data_type: &DataType, depth: usize) -> DataType {
        data_type.fold(&mut |node| match node {
            DataType::Mut(inner) if matches!(**inner, DataType::Mut(_)) => {
                Some(self.normalize_at(inner, depth))
            }
            DataType::Custom(custom) if depth < MAX_ALIAS_DEPTH => {
                let decl = self.decls.of_custom(node)?;
                let DeclKind::Alias { data_type } = &decl.kind else {
                    return None;
                };
                if decl.recursion_error {
                    return None;
                }
                let subst = instance_substitution(decl, &custom.generic_args);
                Some(self.normalize_at(&subst.apply(data_type), depth + 1))
            }
            _ => None,
        })
    }

    /// Bare value type: normalized, with `mut`, `ref` and `ref mut`
    /// wrappers removed.
    pub fn value_type(&self, data_type: &DataType) -> DataType {
        let mut dt = self.normalize(data_type);
        loop {
            dt = match dt {
                DataType::Mut(inner) | DataType::Ref(inner) | DataType::RefMut(inner) => *inner,
                other => return other,
            }
        }
    }

    pub fn is_integer(&self, dt: &DataType) -> bool {
        self.value_type(dt).is_integer()
    }

    pub fn is_float(&self, dt: &DataType) -> bool {
        self.value_type(dt).is_float()
    }

    pub fn is_numeric(&self, dt: &DataType) -> bool {
        self.value_type(dt).is_numeric()
    }

    pub fn is_pointer(&self, dt: &DataType) -> bool {
        self.value_type(dt).is_pointer()
    }

    /// Pointers and arrays, which decay to pointers.
    pub fn is_pointer_like(&self, dt: &DataType) -> bool {
        matches!(
            self.value_type(dt),
            DataType::Ptr(_) | DataType::PtrMut(_) | DataType::Array(_)
        )
    }

    /// Pointer whose innermost pointee, through every pointer level, is
    /// `CVoid`.
    pub fn is_void_pointer(&self, dt: &DataType) -> bool {
        let mut current = self.value_type(dt);
        if !current.is_pointer() {
            return false;
        }
        while let DataType::Ptr(inner) | DataType::PtrMut(inner) = current {
            current = self.normalize(&inner);
        }
        matches!(current, DataType::CVoid)
    }

    /// Records and classes, and enums carrying payloads.
    pub fn is_struct_or_union(&self, dt: &DataType) -> bool {
        let value = self.value_type(dt);
        match self.decls.of_custom(&value).map(|decl| &decl.kind) {
            Some(DeclKind::Record { .. } | DeclKind::Class { .. }) => true,
            Some(DeclKind::Enum { variants }) => variants.iter().any(|v| v.payload.is_some()),
            _ => false,
        }
    }

    /// Number of consecutive indirection levels, from the outside in, at
    /// which `from` may stand in for `to`.
    ///
    /// The outermost level allows array decay and `*mut` to `*` narrowing;
    /// inner levels must use the same pointer kind.
    pub fn count_compatible_pointer_depth(&self, from: &DataType, to: &DataType) -> usize {
        let mut depth = 0;
        let mut from = self.value_type(from);
        let mut to = self.value_type(to);
        loop {
            let compatible = match (&from, &to) {
                (DataType::Ptr(_), DataType::Ptr(_))
                | (DataType::PtrMut(_), DataType::PtrMut(_)) => true,
                (DataType::Array(a), DataType::Array(b)) => a.kind == b.kind,
                (DataType::PtrMut(_) | DataType::Array(_), DataType::Ptr(_))
                | (DataType::Array(_), DataType::PtrMut(_)) => depth == 0,
                _ => false,
            };
            if !compatible {
                return depth;
            }
            depth += 1;
            from = self.normalize(pointee_of(&from));
            to = self.normalize(pointee_of(&to));
        }
    }

    /// Structural equality where placeholders match anything.
    pub fn same(&self, a: &DataType, b: &DataType) -> bool {
        let a = self.normalize(a);
        let b = self.normalize(b);
        same_structure(&a, &b)
    }

    /// Decides how a value of type `from` is used where `to` is expected.
    pub fn implicit_cast(&self, from: &DataType, to: &DataType) -> Result<CastDecision, SemaError> {
        let to = self.normalize(to).strip_mut().clone();
        let mut from = self.normalize(from).strip_mut().clone();
        if !to.is_reference() {
            from = self.value_type(&from);
        }
        let mismatch = || {
            Err(SemaError::TypeMismatch {
                expected: to.clone(),
                found: from.clone(),
            })
        };

        if is_placeholder(&from) || is_placeholder(&to) || from.is_never() {
            return Ok(CastDecision::NoCast);
        }
        if same_structure(&from, &to) {
            return Ok(CastDecision::NoCast);
        }
        if let (DataType::RefMut(a), DataType::Ref(b)) = (&from, &to) {
            if self.same(a, b) {
                return Ok(CastDecision::NoCast);
            }
        }
        if !self.allow_implicit_cast {
            return mismatch();
        }
        if from.is_numeric() && to.is_numeric() {
            return if numeric_widening(&from, &to) {
                Ok(CastDecision::NumericCast)
            } else {
                mismatch()
            };
        }
        if to.is_pointer() && self.pointer_coercion(&from, &to) {
            return Ok(CastDecision::PointerCast);
        }
        mismatch()
    }

    fn pointer_coercion(&self, from: &DataType, to: &DataType) -> bool {
        let depth = self.count_compatible_pointer_depth(from, to);
        if depth == 0 {
            return false;
        }
        let mut from = from.clone();
        let mut to = to.clone();
        for _ in 0..depth {
            from = self.normalize(pointee_of(&from));
            to = self.normalize(pointee_of(&to));
        }
        matches!(from, DataType::CVoid) || matches!(to, DataType::CVoid) || same_structure(&from, &to)
    }

    /// Casts written with `as`: everything implicit, plus numeric
    /// narrowing and conversions between pointers and integers.
    pub fn explicit_cast(&self, from: &DataType, to: &DataType) -> Result<CastDecision, SemaError> {
        let implicit = DataTypeResolver::new(self.decls, true).implicit_cast(from, to);
        if implicit.is_ok() {
            return implicit;
        }
        let from_v = self.value_type(from);
        let to_v = self.value_type(to);
        let scalar = |dt: &DataType| {
            dt.is_numeric() || matches!(dt, DataType::Bool | DataType::Char | DataType::Byte)
        };
        if (scalar(&from_v) && to_v.is_numeric()) || (from_v.is_numeric() && scalar(&to_v)) {
            return Ok(CastDecision::NumericCast);
        }
        let pointer = |dt: &DataType| {
            matches!(dt, DataType::Ptr(_) | DataType::PtrMut(_) | DataType::Array(_))
        };
        let address = |dt: &DataType| matches!(dt, DataType::Usize | DataType::Isize);
        if (pointer(&from_v) && (to_v.is_pointer() || address(&to_v)))
            || (address(&from_v) && to_v.is_pointer())
        {
            return Ok(CastDecision::PointerCast);
        }
        implicit
    }

    /// Structural compatibility used by constraints: `from` can be used
    /// where `to` is expected, implicit casts allowed.
    pub fn is_compatible(&self, from: &DataType, to: &DataType) -> bool {
        DataTypeResolver::new(self.decls, true)
            .implicit_cast(from, to)
            .is_ok()
    }

    /// Common type of two branches or list elements.
    pub fn unify(&self, a: &DataType, b: &DataType) -> Option<DataType> {
        let a = self.value_type(a);
        let b = self.value_type(b);
        if is_placeholder(&a) {
            return Some(b);
        }
        if is_placeholder(&b) || same_structure(&a, &b) {
            return Some(a);
        }
        least_common_supertype(&a, &b)
    }

    /// Type of `field` in a record or class value, under the generic
    /// arguments carried by `base`.
    pub fn field_type(&self, base: &DataType, field: &str) -> Result<DataType, SemaError> {
        let base = self.value_type(base);
        if is_placeholder(&base) {
            return Ok(DataType::Unknown);
        }
        let Some((decl, args)) = self.custom_decl(&base) else {
            return Err(SemaError::UnknownSymbol {
                name: format!("{base}.{field}"),
            });
        };
        let Some(declared) = decl.kind.fields().iter().find(|f| f.name == field) else {
            return Err(SemaError::UnknownSymbol {
                name: format!("{}.{field}", decl.name),
            });
        };
        let subst = instance_substitution(decl, args);
        Ok(self.resolve_with(&declared.data_type, &subst))
    }

    /// Payload type of `variant` in an enum value; `None` for variants
    /// without payload.
    pub fn variant_payload(
        &self,
        enum_type: &DataType,
        variant: &str,
    ) -> Result<Option<DataType>, SemaError> {
        let enum_type = self.value_type(enum_type);
        if is_placeholder(&enum_type) {
            return Ok(Some(DataType::Unknown));
        }
        let found = self.custom_decl(&enum_type).and_then(|(decl, args)| match &decl.kind {
            DeclKind::Enum { variants } => variants
                .iter()
                .find(|v| v.name == variant)
                .map(|v| (decl, args, v)),
            _ => None,
        });
        let Some((decl, args, declared)) = found else {
            return Err(SemaError::UnknownSymbol {
                name: format!("{enum_type}.{variant}"),
            });
        };
        let subst = instance_substitution(decl, args);
        Ok(declared
            .payload
            .as_ref()
            .map(|payload| self.resolve_with(payload, &subst)))
    }

    fn custom_decl<'b>(&self, dt: &'b DataType) -> Option<(&'a Decl, &'b [DataType])> {
        match dt {
            DataType::Custom(custom) => self
                .decls
                .by_global_name(&custom.name)
                .map(|id| (self.decls.get(id), custom.generic_args.as_slice())),
            _ => None,
        }
    }
}

impl ConstraintOracle for DataTypeResolver<'_> {
    fn satisfies(&self, data_type: &DataType, constraint: &DataType) -> bool {
        if is_placeholder(data_type) || is_placeholder(constraint) {
            return true;
        }
        let constraint = self.normalize(constraint);
        if let Some(trait_decl) = self.decls.of_custom(&constraint) {
            if matches!(trait_decl.kind, DeclKind::Trait { .. }) {
                let value = self.value_type(data_type);
                return match self.decls.of_custom(&value).map(|decl| &decl.kind) {
                    Some(DeclKind::Class { implements, .. }) => {
                        implements.iter().any(|imp| self.same(imp, &constraint))
                    }
                    _ => false,
                };
            }
        }
        self.is_compatible(data_type, &constraint)
    }
}

/// Positional substitution for an instance `Decl[args]`.
pub fn instance_substitution(decl: &Decl, args: &[DataType]) -> Substitution {
    let mut subst = Substitution::new();
    for (param, arg) in decl.generic_params.iter().zip(args) {
        subst.insert(param.name(), arg.clone());
    }
    subst
}

fn pointee_of(dt: &DataType) -> &DataType {
    match dt {
        DataType::Ptr(inner) | DataType::PtrMut(inner) => inner,
        DataType::Array(array) => &array.element,
        other => other,
    }
}

fn numeric_widening(from: &DataType, to: &DataType) -> bool {
    match (from.integer_rank(), to.integer_rank()) {
        (Some(from_rank), Some(to_rank)) => {
            if from.is_signed_integer() == to.is_signed_integer() {
                from_rank <= to_rank
            } else {
                // Unsigned fits into a strictly wider signed integer.
                from.is_unsigned_integer() && from_rank < to_rank
            }
        }
        (Some(_), None) => to.is_float(),
        (None, None) => from.float_bits() <= to.float_bits(),
        (None, Some(_)) => false,
    }
}

fn same_structure(a: &DataType, b: &DataType) -> bool {
    use DataType as D;
    match (a, b) {
        (x, _) | (_, x) if is_placeholder(x) => true,
        (D::Ptr(x), D::Ptr(y))
        | (D::PtrMut(x), D::PtrMut(y))
        | (D::Ref(x), D::Ref(y))
        | (D::RefMut(x), D::RefMut(y))
        | (D::Mut(x), D::Mut(y))
        | (D::List(x), D::List(y))
        | (D::Optional(x), D::Optional(y)) => same_structure(x, y),
        (D::Array(x), D::Array(y)) => x.kind == y.kind && same_structure(&x.element, &y.element),
        (D::Tuple(xs), D::Tuple(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| same_structure(x, y))
        }
        (D::Lambda(x), D::Lambda(y)) => {
            x.params.len() == y.params.len()
                && x.params.iter().zip(&y.params).all(|(p, q)| same_structure(p, q))
                && same_structure(&x.return_type, &y.return_type)
        }
        (D::Result(x), D::Result(y)) => {
            same_structure(&x.ok, &y.ok)
                && x.errs.len() == y.errs.len()
                && x.errs.iter().zip(&y.errs).all(|(p, q)| same_structure(p, q))
        }
        (D::Custom(x), D::Custom(y)) => {
            x.name == y.name
                && x.generic_args.len() == y.generic_args.len()
                && x
                    .generic_args
                    .iter()
                    .zip(&y.generic_args)
                    .all(|(p, q)| same_structure(p, q))
        }
        _ => a == b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decl::{Field, Variant};
    use crate::generic::GenericParams;
    use crate::scope::ScopeId;
    use crate::span::Span;
    use crate::symbol::Visibility;

    fn table() -> DeclTable {
        let mut table = DeclTable::new();
        let t = || DataType::generic("T");
        table.push(
            "Pair",
            "main.Pair".to_string(),
            DeclKind::Record {
                fields: vec![
                    Field {
                        name: "a".to_string(),
                        data_type: t(),
                    },
                    Field {
                        name: "b".to_string(),
                        data_type: t(),
                    },
                ],
            },
            smallvec::smallvec![GenericParam::normal("T")],
            ScopeId(0),
            Visibility::Public,
            Span::dummy(),
        );
        table.push(
            "Maybe",
            "main.Maybe".to_string(),
            DeclKind::Enum {
                variants: vec![
                    Variant {
                        name: "Some".to_string(),
                        payload: Some(t()),
                    },
                    Variant {
                        name: "None".to_string(),
                        payload: None,
                    },
                ],
            },
            smallvec::smallvec![GenericParam::normal("T")],
            ScopeId(0),
            Visibility::Public,
            Span::dummy(),
        );
        table.push(
            "IntPair",
            "main.IntPair".to_string(),
            DeclKind::Alias {
                data_type: DataType::custom("main.Pair", vec![DataType::Int32]),
            },
            GenericParams::new(),
            ScopeId(0),
            Visibility::Public,
            Span::dummy(),
        );
        table
    }

    #[test]
    fn integer_widening_follows_rank_and_signedness() {
        let decls = DeclTable::new();
        let r = DataTypeResolver::new(&decls, true);
        assert_eq!(
            r.implicit_cast(&DataType::Int8, &DataType::Int64),
            Ok(CastDecision::NumericCast)
        );
        assert_eq!(
            r.implicit_cast(&DataType::Uint16, &DataType::Int32),
            Ok(CastDecision::NumericCast)
        );
        assert!(r.implicit_cast(&DataType::Int64, &DataType::Int8).is_err());
        assert!(r.implicit_cast(&DataType::Int8, &DataType::Uint64).is_err());
        assert!(r.implicit_cast(&DataType::Uint32, &DataType::Int32).is_err());
        assert_eq!(
            r.implicit_cast(&DataType::Int32, &DataType::Float64),
            Ok(CastDecision::NumericCast)
        );
        assert!(r.implicit_cast(&DataType::Float64, &DataType::Float32).is_err());
    }

    #[test]
    fn disabled_implicit_casts_only_allow_identity() {
        let decls = DeclTable::new();
        let r = DataTypeResolver::new(&decls, false);
        assert_eq!(
            r.implicit_cast(&DataType::Int32, &DataType::Int32),
            Ok(CastDecision::NoCast)
        );
        assert_eq!(
            r.implicit_cast(&DataType::Int8, &DataType::Int32),
            Err(SemaError::TypeMismatch {
                expected: DataType::Int32,
                found: DataType::Int8
            })
        );
    }

    #[test]
    fn unknown_unifies_with_anything() {
        let decls = DeclTable::new();
        let r = DataTypeResolver::new(&decls, false);
        assert_eq!(
            r.implicit_cast(&DataType::Unknown, &DataType::Str),
            Ok(CastDecision::NoCast)
        );
        assert_eq!(
            r.implicit_cast(&DataType::Bool, &DataType::list(DataType::Unknown)),
            Err(SemaError::TypeMismatch {
                expected: DataType::list(DataType::Unknown),
                found: DataType::Bool
            })
        );
        assert!(r.same(&DataType::list(DataType::Unknown), &DataType::list(DataType::Char)));
    }

    #[test]
    fn pointer_depth_and_decay() {
        let decls = DeclTable::new();
        let r = DataTypeResolver::new(&decls, true);
        let array = DataType::sized_array(DataType::Int8, 4);
        let ptr = DataType::ptr(DataType::Int8);
        assert_eq!(r.count_compatible_pointer_depth(&array, &ptr), 1);
        assert_eq!(r.implicit_cast(&array, &ptr), Ok(CastDecision::PointerCast));

        let mut_ptr_ptr = DataType::ptr_mut(DataType::ptr_mut(DataType::Int8));
        let ptr_ptr = DataType::ptr(DataType::ptr(DataType::Int8));
        assert_eq!(r.count_compatible_pointer_depth(&mut_ptr_ptr, &ptr_ptr), 1);
        assert!(r.implicit_cast(&mut_ptr_ptr, &ptr_ptr).is_err());

        assert_eq!(
            r.implicit_cast(&DataType::ptr_mut(DataType::Int8), &ptr),
            Ok(CastDecision::PointerCast)
        );
        assert!(r.implicit_cast(&ptr, &DataType::ptr_mut(DataType::Int8)).is_err());
        assert_eq!(
            r.implicit_cast(&DataType::ptr(DataType::CVoid), &DataType::ptr(DataType::Str)),
            Ok(CastDecision::PointerCast)
        );
    }

    #[test]
    fn classifies_void_pointers_and_structs() {
        let decls = table();
        let r = DataTypeResolver::new(&decls, true);
        assert!(r.is_void_pointer(&DataType::ptr(DataType::ptr(DataType::CVoid))));
        assert!(!r.is_void_pointer(&DataType::CVoid));
        assert!(r.is_struct_or_union(&DataType::custom("main.Pair", vec![DataType::Int8])));
        assert!(r.is_struct_or_union(&DataType::custom("main.Maybe", vec![DataType::Int8])));
        assert!(r.is_struct_or_union(&DataType::custom("main.IntPair", vec![])));
        assert!(!r.is_struct_or_union(&DataType::Int8));
    }

    #[test]
    fn field_types_follow_the_instance() {
        let decls = table();
        let r = DataTypeResolver::new(&decls, true);
        let ints = DataType::custom("main.Pair", vec![DataType::Int32]);
        let floats = DataType::custom("main.Pair", vec![DataType::Float64]);
        assert_eq!(r.field_type(&ints, "a"), Ok(DataType::Int32));
        assert_eq!(r.field_type(&floats, "a"), Ok(DataType::Float64));
        assert_eq!(
            r.field_type(&DataType::custom("main.IntPair", vec![]), "b"),
            Ok(DataType::Int32)
        );
        assert!(r.field_type(&ints, "c").is_err());
        assert_eq!(
            r.variant_payload(&DataType::custom("main.Maybe", vec![DataType::Bool]), "Some"),
            Ok(Some(DataType::Bool))
        );
    }

    #[test]
    fn resolve_substitutes_and_expands_aliases() {
        let decls = table();
        let r = DataTypeResolver::new(&decls, true);
        let params: GenericParams = smallvec::smallvec![GenericParam::normal("U")];
        let resolved = r
            .resolve(
                &DataType::Tuple(vec![
                    DataType::generic("U"),
                    DataType::custom("main.IntPair", vec![]),
                ]),
                &CalledGenericParams::Positional(vec![DataType::Char]),
                &params,
            )
            .expect("resolve");
        assert_eq!(
            resolved,
            DataType::Tuple(vec![
                DataType::Char,
                DataType::custom("main.Pair", vec![DataType::Int32]),
            ])
        );
    }
}
