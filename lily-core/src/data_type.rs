//! Data types of the Lily semantic model.
//!
//! A `DataType` is a plain recursive value. Named types refer to their
//! declaration by (global) name rather than by pointer, which keeps
//! mutually referential records representable without ownership cycles.
//! Anything that needs the declaration behind a name goes through
//! [`crate::resolver::DataTypeResolver`].

use core::fmt;

use serde::{Deserialize, Serialize};

/// Shape of an array type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArrayKind {
    /// `[N]T`
    Sized(u64),
    /// `[_]T`, length only known at run time.
    Dynamic,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArrayType {
    pub kind: ArrayKind,
    pub element: Box<DataType>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LambdaType {
    pub params: Vec<DataType>,
    pub return_type: Box<DataType>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResultType {
    pub ok: Box<DataType>,
    #[serde(default)]
    pub errs: Vec<DataType>,
}

/// Reference to another declaration by name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CustomType {
    pub name: String,
    #[serde(default)]
    pub generic_args: Vec<DataType>,
}

/// One alternative of a conditional compiler choice: when the operands
/// have the `conds` types, the expression has type `ret`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Choice {
    pub conds: Vec<DataType>,
    pub ret: DataType,
}

/// Represents the types of values and expressions in Lily.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    // Built-in primitive types
    Int8,
    Int16,
    Int32,
    Int64,
    Isize,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Usize,
    Float32,
    Float64,
    Bool,
    Char,
    Byte,
    Str,
    Unit,
    /// Bottom type for expressions that never produce a value.
    Never,
    /// `void` of the C interoperability layer, only meaningful behind a pointer.
    CVoid,

    // Compound types
    Ptr(Box<DataType>),
    PtrMut(Box<DataType>),
    Ref(Box<DataType>),
    RefMut(Box<DataType>),
    Mut(Box<DataType>),
    Array(ArrayType),
    Tuple(Vec<DataType>),
    List(Box<DataType>),
    Lambda(LambdaType),
    Optional(Box<DataType>),
    Result(ResultType),

    /// User-defined named type (record, enum, class, trait, alias, error).
    Custom(CustomType),
    /// Generic parameter declared by an enclosing declaration.
    Generic(String),
    /// Generic introduced by the compiler for an argument nobody supplied.
    CompilerGeneric(String),
    /// Result type that depends on operand types known only at the use site.
    ConditionalCompilerChoice(Vec<Choice>),

    /// Sentinel after a reported error; unifies with everything.
    Unknown,
}

impl DataType {
    pub fn ptr(inner: DataType) -> DataType {
        DataType::Ptr(Box::new(inner))
    }

    pub fn ptr_mut(inner: DataType) -> DataType {
        DataType::PtrMut(Box::new(inner))
    }

    pub fn reference(inner: DataType) -> DataType {
        DataType::Ref(Box::new(inner))
    }

    pub fn ref_mut(inner: DataType) -> DataType {
        DataType::RefMut(Box::new(inner))
    }

    pub fn mutable(inner: DataType) -> DataType {
        DataType::Mut(Box::new(inner))
    }

    pub fn list(inner: DataType) -> DataType {
        DataType::List(Box::new(inner))
    }

    pub fn optional(inner: DataType) -> DataType {
        DataType::Optional(Box::new(inner))
    }

    pub fn sized_array(element: DataType, len: u64) -> DataType {
        DataType::Array(ArrayType {
            kind: ArrayKind::Sized(len),
            element: Box::new(element),
        })
    }

    pub fn lambda(params: Vec<DataType>, return_type: DataType) -> DataType {
        DataType::Lambda(LambdaType {
            params,
            return_type: Box::new(return_type),
        })
    }

    pub fn custom(name: impl Into<String>, generic_args: Vec<DataType>) -> DataType {
        DataType::Custom(CustomType {
            name: name.into(),
            generic_args,
        })
    }

    pub fn generic(name: impl Into<String>) -> DataType {
        DataType::Generic(name.into())
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, DataType::Unknown)
    }

    pub fn is_never(&self) -> bool {
        matches!(self, DataType::Never)
    }

    pub fn is_unit(&self) -> bool {
        matches!(self, DataType::Unit)
    }

    pub fn is_bool(&self) -> bool {
        matches!(self, DataType::Bool)
    }

    pub fn is_signed_integer(&self) -> bool {
        matches!(
            self,
            DataType::Int8 | DataType::Int16 | DataType::Int32 | DataType::Int64 | DataType::Isize
        )
    }

    pub fn is_unsigned_integer(&self) -> bool {
        matches!(
            self,
            DataType::Uint8
                | DataType::Uint16
                | DataType::Uint32
                | DataType::Uint64
                | DataType::Usize
        )
    }

    pub fn is_integer(&self) -> bool {
        self.is_signed_integer() || self.is_unsigned_integer()
    }

    pub fn is_float(&self) -> bool {
        matches!(self, DataType::Float32 | DataType::Float64)
    }

    pub fn is_numeric(&self) -> bool {
        self.is_integer() || self.is_float()
    }

    /// Raw pointer kinds only; arrays decay to pointers in the resolver.
    pub fn is_pointer(&self) -> bool {
        matches!(self, DataType::Ptr(_) | DataType::PtrMut(_))
    }

    pub fn is_reference(&self) -> bool {
        matches!(self, DataType::Ref(_) | DataType::RefMut(_))
    }

    /// Width in bits of a fixed-width integer kind.
    pub fn integer_bits(&self) -> Option<u16> {
        match self {
            DataType::Int8 | DataType::Uint8 => Some(8),
            DataType::Int16 | DataType::Uint16 => Some(16),
            DataType::Int32 | DataType::Uint32 => Some(32),
            DataType::Int64 | DataType::Uint64 => Some(64),
            DataType::Isize | DataType::Usize => Some(usize::BITS as u16),
            _ => None,
        }
    }

    /// Conversion rank of an integer kind; monotonic in bit width within a
    /// signedness class.
    pub fn integer_rank(&self) -> Option<u8> {
        self.integer_bits().map(|bits| match bits {
            8 => 1,
            16 => 2,
            32 => 3,
            _ => 4,
        })
    }

    pub fn float_bits(&self) -> Option<u16> {
        match self {
            DataType::Float32 => Some(32),
            DataType::Float64 => Some(64),
            _ => None,
        }
    }

    /// Peels `mut` wrappers.
    pub fn strip_mut(&self) -> &DataType {
        match self {
            DataType::Mut(inner) => inner.strip_mut(),
            other => other,
        }
    }

    /// Pointee of a pointer or reference, looking through `mut`.
    pub fn pointee(&self) -> Option<&DataType> {
        match self.strip_mut() {
            DataType::Ptr(inner)
            | DataType::PtrMut(inner)
            | DataType::Ref(inner)
            | DataType::RefMut(inner) => Some(inner),
            _ => None,
        }
    }

    /// True when a generic leaf (declared or compiler-introduced) remains.
    pub fn contains_generic(&self) -> bool {
        let mut found = false;
        self.visit(&mut |dt| {
            if matches!(dt, DataType::Generic(_) | DataType::CompilerGeneric(_)) {
                found = true;
            }
        });
        found
    }

    pub fn contains_unknown(&self) -> bool {
        let mut found = false;
        self.visit(&mut |dt| {
            if dt.is_unknown() {
                found = true;
            }
        });
        found
    }

    /// Pre-order traversal of this type and every nested type.
    pub fn visit(&self, f: &mut impl FnMut(&DataType)) {
        f(self);
        match self {
            DataType::Ptr(inner)
            | DataType::PtrMut(inner)
            | DataType::Ref(inner)
            | DataType::RefMut(inner)
            | DataType::Mut(inner)
            | DataType::List(inner)
            | DataType::Optional(inner) => inner.visit(f),
            DataType::Array(array) => array.element.visit(f),
            DataType::Tuple(items) => items.iter().for_each(|item| item.visit(f)),
            DataType::Lambda(lambda) => {
                lambda.params.iter().for_each(|param| param.visit(f));
                lambda.return_type.visit(f);
            }
            DataType::Result(result) => {
                result.ok.visit(f);
                result.errs.iter().for_each(|err| err.visit(f));
            }
            DataType::Custom(custom) => custom.generic_args.iter().for_each(|arg| arg.visit(f)),
            DataType::ConditionalCompilerChoice(choices) => {
                for choice in choices {
                    choice.conds.iter().for_each(|cond| cond.visit(f));
                    choice.ret.visit(f);
                }
            }
            _ => {}
        }
    }

    /// Rebuilds the type bottom-up. `f` is asked first for every node; a
    /// `Some` replaces the node (and its subtree) as-is, `None` recurses.
    pub fn fold(&self, f: &mut impl FnMut(&DataType) -> Option<DataType>) -> DataType {
        if let Some(replacement) = f(self) {
            return replacement;
        }
        match self {
            DataType::Ptr(inner) => DataType::Ptr(Box::new(inner.fold(f))),
            DataType::PtrMut(inner) => DataType::PtrMut(Box::new(inner.fold(f))),
            DataType::Ref(inner) => DataType::Ref(Box::new(inner.fold(f))),
            DataType::RefMut(inner) => DataType::RefMut(Box::new(inner.fold(f))),
            DataType::Mut(inner) => DataType::Mut(Box::new(inner.fold(f))),
            DataType::List(inner) => DataType::List(Box::new(inner.fold(f))),
            DataType::Optional(inner) => DataType::Optional(Box::new(inner.fold(f))),
            DataType::Array(array) => DataType::Array(ArrayType {
                kind: array.kind.clone(),
                element: Box::new(array.element.fold(f)),
            }),
            DataType::Tuple(items) => DataType::Tuple(items.iter().map(|i| i.fold(f)).collect()),
            DataType::Lambda(lambda) => DataType::Lambda(LambdaType {
                params: lambda.params.iter().map(|p| p.fold(f)).collect(),
                return_type: Box::new(lambda.return_type.fold(f)),
            }),
            DataType::Result(result) => DataType::Result(ResultType {
                ok: Box::new(result.ok.fold(f)),
                errs: result.errs.iter().map(|e| e.fold(f)).collect(),
            }),
            DataType::Custom(custom) => DataType::Custom(CustomType {
                name: custom.name.clone(),
                generic_args: custom.generic_args.iter().map(|a| a.fold(f)).collect(),
            }),
            DataType::ConditionalCompilerChoice(choices) => DataType::ConditionalCompilerChoice(
                choices
                    .iter()
                    .map(|choice| Choice {
                        conds: choice.conds.iter().map(|c| c.fold(f)).collect(),
                        ret: choice.ret.fold(f),
                    })
                    .collect(),
            ),
            leaf => leaf.clone(),
        }
    }
}

/// Compute the least common supertype (LCS) of two types, if it exists.
///
/// Used for typing list/array literals and merging branch results, where
/// Never is treated as bottom and Unknown absorbs anything.
///
/// * lcs(Never, T) = T
/// * lcs(T, T)     = T
/// * integers of the same signedness widen to the higher rank
/// * Float32 and Float64 widen to Float64
pub fn least_common_supertype(a: &DataType, b: &DataType) -> Option<DataType> {
    if a.is_unknown() || b.is_unknown() {
        return Some(DataType::Unknown);
    }
    if a.is_never() {
        return Some(b.clone());
    }
    if b.is_never() {
        return Some(a.clone());
    }
    if a == b {
        return Some(a.clone());
    }

    let same_signedness = (a.is_signed_integer() && b.is_signed_integer())
        || (a.is_unsigned_integer() && b.is_unsigned_integer());
    if same_signedness {
        return match (a.integer_rank(), b.integer_rank()) {
            (Some(ra), Some(rb)) if ra >= rb => Some(a.clone()),
            (Some(_), Some(_)) => Some(b.clone()),
            _ => None,
        };
    }
    if a.is_float() && b.is_float() {
        return Some(DataType::Float64);
    }
    None
}

struct Joined<'a>(&'a [DataType]);

impl fmt::Display for Joined<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, dt) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{dt}")?;
        }
        Ok(())
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::Int8 => f.write_str("Int8"),
            DataType::Int16 => f.write_str("Int16"),
            DataType::Int32 => f.write_str("Int32"),
            DataType::Int64 => f.write_str("Int64"),
            DataType::Isize => f.write_str("Isize"),
            DataType::Uint8 => f.write_str("Uint8"),
            DataType::Uint16 => f.write_str("Uint16"),
            DataType::Uint32 => f.write_str("Uint32"),
            DataType::Uint64 => f.write_str("Uint64"),
            DataType::Usize => f.write_str("Usize"),
            DataType::Float32 => f.write_str("Float32"),
            DataType::Float64 => f.write_str("Float64"),
            DataType::Bool => f.write_str("Bool"),
            DataType::Char => f.write_str("Char"),
            DataType::Byte => f.write_str("Byte"),
            DataType::Str => f.write_str("Str"),
            DataType::Unit => f.write_str("Unit"),
            DataType::Never => f.write_str("Never"),
            DataType::CVoid => f.write_str("CVoid"),
            DataType::Ptr(inner) => write!(f, "*{inner}"),
            DataType::PtrMut(inner) => write!(f, "*mut {inner}"),
            DataType::Ref(inner) => write!(f, "ref {inner}"),
            DataType::RefMut(inner) => write!(f, "ref mut {inner}"),
            DataType::Mut(inner) => write!(f, "mut {inner}"),
            DataType::Array(array) => match array.kind {
                ArrayKind::Sized(len) => write!(f, "[{len}]{}", array.element),
                ArrayKind::Dynamic => write!(f, "[_]{}", array.element),
            },
            DataType::Tuple(items) => write!(f, "({})", Joined(items)),
            DataType::List(inner) => write!(f, "{{{inner}}}"),
            DataType::Lambda(lambda) => {
                write!(f, "fun({}) -> {}", Joined(&lambda.params), lambda.return_type)
            }
            DataType::Optional(inner) => write!(f, "?{inner}"),
            DataType::Result(result) if result.errs.is_empty() => write!(f, "!{}", result.ok),
            DataType::Result(result) => write!(f, "{}!{}", Joined(&result.errs), result.ok),
            DataType::Custom(custom) if custom.generic_args.is_empty() => {
                f.write_str(&custom.name)
            }
            DataType::Custom(custom) => {
                write!(f, "{}[{}]", custom.name, Joined(&custom.generic_args))
            }
            DataType::Generic(name) | DataType::CompilerGeneric(name) => f.write_str(name),
            DataType::ConditionalCompilerChoice(choices) => {
                f.write_str("choice<")?;
                for (i, choice) in choices.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" | ")?;
                    }
                    write!(f, "({}) -> {}", Joined(&choice.conds), choice.ret)?;
                }
                f.write_str(">")
            }
            DataType::Unknown => f.write_str("{unknown}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_SCALARS: &[DataType] = &[
        DataType::Int8,
        DataType::Int16,
        DataType::Int32,
        DataType::Int64,
        DataType::Isize,
        DataType::Uint8,
        DataType::Uint16,
        DataType::Uint32,
        DataType::Uint64,
        DataType::Usize,
        DataType::Float32,
        DataType::Float64,
        DataType::Bool,
        DataType::Char,
        DataType::Byte,
        DataType::Str,
        DataType::Unit,
        DataType::Never,
        DataType::CVoid,
        DataType::Unknown,
    ];

    #[test]
    fn integer_and_float_are_disjoint() {
        for dt in ALL_SCALARS {
            assert!(!(dt.is_integer() && dt.is_float()), "{dt} is both");
        }
        let compound = DataType::ptr(DataType::Int32);
        assert!(!compound.is_integer() && !compound.is_float());
    }

    #[test]
    fn rank_grows_with_width() {
        let signed = [DataType::Int8, DataType::Int16, DataType::Int32, DataType::Int64];
        let unsigned = [
            DataType::Uint8,
            DataType::Uint16,
            DataType::Uint32,
            DataType::Uint64,
        ];
        for family in [signed, unsigned] {
            for pair in family.windows(2) {
                assert!(pair[0].integer_rank() < pair[1].integer_rank());
            }
        }
        assert_eq!(DataType::Float32.integer_rank(), None);
    }

    #[test]
    fn lcs_treats_never_as_bottom() {
        assert_eq!(
            least_common_supertype(&DataType::Never, &DataType::Int32),
            Some(DataType::Int32)
        );
        assert_eq!(
            least_common_supertype(&DataType::Int8, &DataType::Int64),
            Some(DataType::Int64)
        );
        assert_eq!(least_common_supertype(&DataType::Int8, &DataType::Uint8), None);
        assert_eq!(least_common_supertype(&DataType::Bool, &DataType::Str), None);
    }

    #[test]
    fn fold_replaces_generic_leaves() {
        let dt = DataType::custom(
            "Pair",
            vec![DataType::generic("T"), DataType::list(DataType::generic("T"))],
        );
        let folded = dt.fold(&mut |node| match node {
            DataType::Generic(name) if name == "T" => Some(DataType::Int32),
            _ => None,
        });
        assert_eq!(
            folded,
            DataType::custom("Pair", vec![DataType::Int32, DataType::list(DataType::Int32)])
        );
        assert!(dt.contains_generic());
        assert!(!folded.contains_generic());
    }

    #[test]
    fn displays_compound_types() {
        let dt = DataType::lambda(
            vec![DataType::ptr_mut(DataType::Int8), DataType::optional(DataType::Str)],
            DataType::custom("Pair", vec![DataType::Float64]),
        );
        assert_eq!(dt.to_string(), "fun(*mut Int8, ?Str) -> Pair[Float64]");
    }
}
