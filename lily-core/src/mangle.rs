//! Deterministic structural mangling of resolved data types.
//!
//! The encoding is prefix-free: every node starts with a distinct tag and
//! every name is length-prefixed, so two encodings are equal exactly when
//! the types are structurally equal.

use core::fmt::Write;

use indexmap::IndexMap;

use crate::data_type::{ArrayKind, DataType};

/// Separator between the declaration's global name and its encoded
/// generic arguments.
pub const GENERIC_SEPARATOR: &str = "$G";

/// Appends the structural encoding of `dt` to `out`.
pub fn encode(dt: &DataType, out: &mut String) {
    match dt {
        DataType::Int8 => out.push('a'),
        DataType::Int16 => out.push('s'),
        DataType::Int32 => out.push('i'),
        DataType::Int64 => out.push('l'),
        DataType::Isize => out.push('q'),
        DataType::Uint8 => out.push('h'),
        DataType::Uint16 => out.push('t'),
        DataType::Uint32 => out.push('j'),
        DataType::Uint64 => out.push('m'),
        DataType::Usize => out.push('y'),
        DataType::Float32 => out.push('f'),
        DataType::Float64 => out.push('d'),
        DataType::Bool => out.push('b'),
        DataType::Char => out.push('c'),
        DataType::Byte => out.push('B'),
        DataType::Str => out.push('S'),
        DataType::Unit => out.push('v'),
        DataType::Never => out.push('z'),
        DataType::CVoid => out.push('V'),
        DataType::Unknown => out.push('U'),
        DataType::Ptr(inner) => {
            out.push('P');
            encode(inner, out);
        }
        DataType::PtrMut(inner) => {
            out.push('Q');
            encode(inner, out);
        }
        DataType::Ref(inner) => {
            out.push('R');
            encode(inner, out);
        }
        DataType::RefMut(inner) => {
            out.push('W');
            encode(inner, out);
        }
        DataType::Mut(inner) => {
            out.push('M');
            encode(inner, out);
        }
        DataType::List(inner) => {
            out.push('L');
            encode(inner, out);
        }
        DataType::Optional(inner) => {
            out.push('O');
            encode(inner, out);
        }
        DataType::Array(array) => {
            out.push('A');
            if let ArrayKind::Sized(len) = array.kind {
                let _ = write!(out, "{len}");
            }
            out.push('_');
            encode(&array.element, out);
        }
        DataType::Tuple(items) => {
            out.push('T');
            items.iter().for_each(|item| encode(item, out));
            out.push('E');
        }
        DataType::Lambda(lambda) => {
            out.push('F');
            lambda.params.iter().for_each(|param| encode(param, out));
            out.push('E');
            encode(&lambda.return_type, out);
        }
        DataType::Result(result) => {
            out.push('X');
            encode(&result.ok, out);
            result.errs.iter().for_each(|err| encode(err, out));
            out.push('E');
        }
        DataType::Custom(custom) => {
            out.push('N');
            encode_name(&custom.name, out);
            if !custom.generic_args.is_empty() {
                out.push('I');
                custom.generic_args.iter().for_each(|arg| encode(arg, out));
                out.push('E');
            }
        }
        DataType::Generic(name) => {
            out.push('G');
            encode_name(name, out);
        }
        DataType::CompilerGeneric(name) => {
            out.push('C');
            encode_name(name, out);
        }
        DataType::ConditionalCompilerChoice(choices) => {
            out.push('K');
            for choice in choices {
                out.push('H');
                choice.conds.iter().for_each(|cond| encode(cond, out));
                out.push('E');
                encode(&choice.ret, out);
            }
            out.push('E');
        }
    }
}

fn encode_name(name: &str, out: &mut String) {
    let _ = write!(out, "{}{}", name.len(), name);
}

pub fn mangle_data_type(dt: &DataType) -> String {
    let mut out = String::new();
    encode(dt, &mut out);
    out
}

/// Mangled name of one instantiation of `global_name`.
///
/// An empty parameter map yields `global_name` unchanged.
pub fn ser_global_name(global_name: &str, generic_params: &IndexMap<String, DataType>) -> String {
    if generic_params.is_empty() {
        return global_name.to_string();
    }
    let mut out = String::with_capacity(global_name.len() + 8 * generic_params.len());
    out.push_str(global_name);
    out.push_str(GENERIC_SEPARATOR);
    for dt in generic_params.values() {
        encode(dt, &mut out);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(items: &[(&str, DataType)]) -> IndexMap<String, DataType> {
        items
            .iter()
            .map(|(name, dt)| (name.to_string(), dt.clone()))
            .collect()
    }

    #[test]
    fn empty_map_keeps_global_name() {
        assert_eq!(ser_global_name("main.Pair", &IndexMap::new()), "main.Pair");
    }

    #[test]
    fn distinct_tuples_get_distinct_names() {
        let int = ser_global_name("main.Pair", &params(&[("T", DataType::Int32)]));
        let float = ser_global_name("main.Pair", &params(&[("T", DataType::Float64)]));
        assert_ne!(int, float);
        assert_eq!(int, "main.Pair$Gi");
    }

    #[test]
    fn names_are_length_prefixed() {
        // `Ab` + `C` and `A` + `bC` would collide without the length prefix.
        let left = mangle_data_type(&DataType::Tuple(vec![
            DataType::custom("Ab", vec![]),
            DataType::custom("C", vec![]),
        ]));
        let right = mangle_data_type(&DataType::Tuple(vec![
            DataType::custom("A", vec![]),
            DataType::custom("bC", vec![]),
        ]));
        assert_ne!(left, right);
    }

    #[test]
    fn nesting_is_unambiguous() {
        let a = mangle_data_type(&DataType::Tuple(vec![
            DataType::Tuple(vec![DataType::Int8]),
            DataType::Int8,
        ]));
        let b = mangle_data_type(&DataType::Tuple(vec![DataType::Tuple(vec![
            DataType::Int8,
            DataType::Int8,
        ])]));
        assert_ne!(a, b);
    }
}
