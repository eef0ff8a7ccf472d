//! Patterns of `match` arms and case values of `switch` arms.
//!
//! Both compare structurally; spans are kept on the arms, never on the
//! patterns themselves.

use core::fmt;

use serde::{Deserialize, Serialize};

use crate::case_table::CaseKey;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PatternLiteral {
    Int(i64),
    Uint(u64),
    Float(f64),
    Bool(bool),
    Char(char),
    Str(String),
}

impl PartialEq for PatternLiteral {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (PatternLiteral::Int(a), PatternLiteral::Int(b)) => a == b,
            (PatternLiteral::Uint(a), PatternLiteral::Uint(b)) => a == b,
            // Bitwise, so that a NaN case equals itself.
            (PatternLiteral::Float(a), PatternLiteral::Float(b)) => a.to_bits() == b.to_bits(),
            (PatternLiteral::Bool(a), PatternLiteral::Bool(b)) => a == b,
            (PatternLiteral::Char(a), PatternLiteral::Char(b)) => a == b,
            (PatternLiteral::Str(a), PatternLiteral::Str(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for PatternLiteral {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatternLiteral::Int(v) => write!(f, "{v}"),
            PatternLiteral::Uint(v) => write!(f, "{v}"),
            PatternLiteral::Float(v) => write!(f, "{v:?}"),
            PatternLiteral::Bool(v) => write!(f, "{v}"),
            PatternLiteral::Char(v) => write!(f, "'{v}'"),
            PatternLiteral::Str(v) => write!(f, "\"{v}\""),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldPattern {
    pub name: String,
    pub pattern: Pattern,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Pattern {
    /// `_`
    Wildcard,
    /// Binds the scrutinee to a name.
    Name(String),
    Literal(PatternLiteral),
    Tuple(Vec<Pattern>),
    Range {
        start: PatternLiteral,
        end: PatternLiteral,
        #[serde(default)]
        inclusive: bool,
    },
    Record {
        name: String,
        fields: Vec<FieldPattern>,
    },
    Variant {
        enum_name: String,
        variant: String,
        #[serde(default)]
        payload: Option<Box<Pattern>>,
    },
    List(Vec<Pattern>),
    /// `pattern as name`
    As {
        pattern: Box<Pattern>,
        name: String,
    },
}

impl Pattern {
    /// Matches every value of its type.
    pub fn is_irrefutable(&self) -> bool {
        match self {
            Pattern::Wildcard | Pattern::Name(_) => true,
            Pattern::As { pattern, .. } => pattern.is_irrefutable(),
            Pattern::Tuple(items) => items.iter().all(Pattern::is_irrefutable),
            Pattern::Record { fields, .. } => fields.iter().all(|f| f.pattern.is_irrefutable()),
            _ => false,
        }
    }

    /// Variant this pattern covers completely, if any.
    pub fn covered_variant(&self) -> Option<&str> {
        match self {
            Pattern::Variant {
                variant, payload, ..
            } if payload.as_ref().is_none_or(|p| p.is_irrefutable()) => Some(variant),
            Pattern::As { pattern, .. } => pattern.covered_variant(),
            _ => None,
        }
    }

    /// Names bound by this pattern, in source order.
    pub fn bindings(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_bindings(&mut out);
        out
    }

    fn collect_bindings<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Pattern::Name(name) => out.push(name),
            Pattern::As { pattern, name } => {
                pattern.collect_bindings(out);
                out.push(name);
            }
            Pattern::Tuple(items) | Pattern::List(items) => {
                items.iter().for_each(|p| p.collect_bindings(out))
            }
            Pattern::Record { fields, .. } => {
                fields.iter().for_each(|f| f.pattern.collect_bindings(out))
            }
            Pattern::Variant {
                payload: Some(payload),
                ..
            } => payload.collect_bindings(out),
            _ => {}
        }
    }
}

impl CaseKey for Pattern {
    /// Binding names do not matter for case identity: `x` and `y` are
    /// both catch-all arms.
    fn same_case(&self, other: &Self) -> bool {
        match (self, other) {
            (a, b) if a.is_else() && b.is_else() => true,
            (Pattern::As { pattern: a, .. }, b) => a.same_case(b),
            (a, Pattern::As { pattern: b, .. }) => a.same_case(b),
            (Pattern::Tuple(a), Pattern::Tuple(b)) | (Pattern::List(a), Pattern::List(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.same_case(y))
            }
            (
                Pattern::Record {
                    name: an,
                    fields: af,
                },
                Pattern::Record {
                    name: bn,
                    fields: bf,
                },
            ) => {
                an == bn
                    && af.len() == bf.len()
                    && af
                        .iter()
                        .zip(bf)
                        .all(|(x, y)| x.name == y.name && x.pattern.same_case(&y.pattern))
            }
            (
                Pattern::Variant {
                    enum_name: ae,
                    variant: av,
                    payload: ap,
                },
                Pattern::Variant {
                    enum_name: be,
                    variant: bv,
                    payload: bp,
                },
            ) => {
                ae == be
                    && av == bv
                    && match (ap, bp) {
                        (None, None) => true,
                        (Some(a), Some(b)) => a.same_case(b),
                        _ => false,
                    }
            }
            (a, b) => a == b,
        }
    }

    fn is_else(&self) -> bool {
        matches!(self, Pattern::Wildcard | Pattern::Name(_))
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pattern::Wildcard => f.write_str("_"),
            Pattern::Name(name) => f.write_str(name),
            Pattern::Literal(lit) => write!(f, "{lit}"),
            Pattern::Tuple(items) => {
                f.write_str("(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str(")")
            }
            Pattern::Range {
                start,
                end,
                inclusive,
            } => {
                let op = if *inclusive { "..=" } else { ".." };
                write!(f, "{start}{op}{end}")
            }
            Pattern::Record { name, fields } => {
                write!(f, "{name} {{ ")?;
                for (i, field) in fields.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}: {}", field.name, field.pattern)?;
                }
                f.write_str(" }")
            }
            Pattern::Variant {
                enum_name,
                variant,
                payload,
            } => match payload {
                Some(payload) => write!(f, "{enum_name}:{variant}({payload})"),
                None => write!(f, "{enum_name}:{variant}"),
            },
            Pattern::List(items) => {
                f.write_str("{")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("}")
            }
            Pattern::As { pattern, name } => write!(f, "{pattern} as {name}"),
        }
    }
}

/// Value of a `switch` arm.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SwitchCaseValue {
    Int(i64),
    Uint(u64),
    Float(f64),
    Else,
}

impl PartialEq for SwitchCaseValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (SwitchCaseValue::Int(a), SwitchCaseValue::Int(b)) => a == b,
            (SwitchCaseValue::Uint(a), SwitchCaseValue::Uint(b)) => a == b,
            (SwitchCaseValue::Float(a), SwitchCaseValue::Float(b)) => a.to_bits() == b.to_bits(),
            (SwitchCaseValue::Else, SwitchCaseValue::Else) => true,
            _ => false,
        }
    }
}

impl CaseKey for SwitchCaseValue {
    fn same_case(&self, other: &Self) -> bool {
        self == other
    }

    fn is_else(&self) -> bool {
        matches!(self, SwitchCaseValue::Else)
    }
}

impl fmt::Display for SwitchCaseValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SwitchCaseValue::Int(v) => write!(f, "{v}"),
            SwitchCaseValue::Uint(v) => write!(f, "{v}"),
            SwitchCaseValue::Float(v) => write!(f, "{v:?}"),
            SwitchCaseValue::Else => f.write_str("else"),
        }
    }
}
