//! Built-in operators.
//!
//! Each operator is described as a `ConditionalCompilerChoice` data type:
//! one choice per accepted operand kind. The choice is collapsed against
//! the operand types at the use site, after promoting mixed-width
//! operands toward the higher integer rank.

use core::fmt;

use serde::{Deserialize, Serialize};

use crate::data_type::{Choice, DataType};
use crate::error::SemaError;
use crate::resolver::DataTypeResolver;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnaryOp {
    Neg,
    Not,
    BitNot,
    /// `&x`
    Ref,
    /// `*p`
    Deref,
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "not=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::And => "and",
            BinaryOp::Or => "or",
            BinaryOp::BitAnd => "&",
            BinaryOp::BitOr => "|",
            BinaryOp::BitXor => "xor",
            BinaryOp::Shl => "<<",
            BinaryOp::Shr => ">>",
        };
        f.write_str(s)
    }
}

const SIGNED: [DataType; 5] = [
    DataType::Int8,
    DataType::Int16,
    DataType::Int32,
    DataType::Int64,
    DataType::Isize,
];
const UNSIGNED: [DataType; 5] = [
    DataType::Uint8,
    DataType::Uint16,
    DataType::Uint32,
    DataType::Uint64,
    DataType::Usize,
];
const FLOATS: [DataType; 2] = [DataType::Float32, DataType::Float64];

fn integers() -> impl Iterator<Item = DataType> {
    SIGNED.into_iter().chain(UNSIGNED)
}

fn numerics() -> impl Iterator<Item = DataType> {
    integers().chain(FLOATS)
}

fn same_operands(kinds: impl Iterator<Item = DataType>, ret: Option<DataType>) -> Vec<Choice> {
    kinds
        .map(|kind| Choice {
            conds: vec![kind.clone(), kind.clone()],
            ret: ret.clone().unwrap_or(kind),
        })
        .collect()
}

/// Choice tables of the built-in operators.
#[derive(Debug, Default)]
pub struct OperatorRegister;

impl OperatorRegister {
    pub fn new() -> Self {
        OperatorRegister
    }

    pub fn binary(&self, op: BinaryOp) -> DataType {
        let choices = match op {
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div => {
                same_operands(numerics(), None)
            }
            BinaryOp::Mod => same_operands(integers(), None),
            BinaryOp::Eq | BinaryOp::Ne => same_operands(
                numerics().chain([DataType::Bool, DataType::Char, DataType::Byte, DataType::Str]),
                Some(DataType::Bool),
            ),
            BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => same_operands(
                numerics().chain([DataType::Char, DataType::Byte]),
                Some(DataType::Bool),
            ),
            BinaryOp::And | BinaryOp::Or => same_operands([DataType::Bool].into_iter(), None),
            BinaryOp::BitAnd | BinaryOp::BitOr | BinaryOp::BitXor => {
                same_operands(integers(), None)
            }
            BinaryOp::Shl | BinaryOp::Shr => integers()
                .map(|kind| Choice {
                    conds: vec![kind.clone(), DataType::Usize],
                    ret: kind,
                })
                .collect(),
        };
        DataType::ConditionalCompilerChoice(choices)
    }

    pub fn unary(&self, op: UnaryOp) -> DataType {
        let single = |kinds: Vec<DataType>| {
            kinds
                .into_iter()
                .map(|kind| Choice {
                    conds: vec![kind.clone()],
                    ret: kind,
                })
                .collect::<Vec<_>>()
        };
        let choices = match op {
            UnaryOp::Neg => single(SIGNED.into_iter().chain(FLOATS).collect()),
            UnaryOp::Not => single(vec![DataType::Bool]),
            UnaryOp::BitNot => single(integers().collect()),
            // Reference and dereference are structural, not table driven.
            UnaryOp::Ref | UnaryOp::Deref => Vec::new(),
        };
        DataType::ConditionalCompilerChoice(choices)
    }

    /// Result type of `lhs op rhs`.
    pub fn check_binary(
        &self,
        resolver: &DataTypeResolver<'_>,
        op: BinaryOp,
        lhs: &DataType,
        rhs: &DataType,
    ) -> Result<DataType, SemaError> {
        let lhs = resolver.value_type(lhs);
        let rhs = resolver.value_type(rhs);
        if lhs.is_unknown() || rhs.is_unknown() {
            return Ok(match op {
                BinaryOp::Eq
                | BinaryOp::Ne
                | BinaryOp::Lt
                | BinaryOp::Le
                | BinaryOp::Gt
                | BinaryOp::Ge
                | BinaryOp::And
                | BinaryOp::Or => DataType::Bool,
                _ => DataType::Unknown,
            });
        }
        let operands = match op {
            BinaryOp::Shl | BinaryOp::Shr => {
                let shift = if rhs.is_unsigned_integer() { DataType::Usize } else { rhs };
                vec![lhs, shift]
            }
            _ => promote(&lhs, &rhs),
        };
        match collapse(&self.binary(op), &operands) {
            Some(ret) => Ok(ret),
            // Equality is defined for every pair of identical types.
            None if matches!(op, BinaryOp::Eq | BinaryOp::Ne)
                && resolver.same(&operands[0], &operands[1]) =>
            {
                Ok(DataType::Bool)
            }
            None => Err(SemaError::TypeMismatch {
                expected: operands[0].clone(),
                found: operands[1].clone(),
            }),
        }
    }

    /// Result type of `op operand`.
    pub fn check_unary(
        &self,
        resolver: &DataTypeResolver<'_>,
        op: UnaryOp,
        operand: &DataType,
    ) -> Result<DataType, SemaError> {
        match op {
            UnaryOp::Ref => {
                return Ok(match resolver.normalize(operand) {
                    DataType::Mut(inner) => DataType::RefMut(inner),
                    other => DataType::reference(other),
                });
            }
            UnaryOp::Deref => {
                let value = resolver.value_type(operand);
                return match value {
                    DataType::Unknown => Ok(DataType::Unknown),
                    DataType::Ptr(inner) | DataType::PtrMut(inner) => Ok(*inner),
                    other => Err(SemaError::TypeMismatch {
                        expected: DataType::ptr(other.clone()),
                        found: other,
                    }),
                };
            }
            _ => {}
        }
        let value = resolver.value_type(operand);
        if value.is_unknown() {
            return Ok(DataType::Unknown);
        }
        let table = self.unary(op);
        collapse(&table, core::slice::from_ref(&value)).ok_or_else(|| {
            let expected = match &table {
                DataType::ConditionalCompilerChoice(choices) => choices
                    .first()
                    .map(|c| c.ret.clone())
                    .unwrap_or(DataType::Unknown),
                _ => DataType::Unknown,
            };
            SemaError::TypeMismatch {
                expected,
                found: value,
            }
        })
    }
}

/// Picks the choice whose conditions equal `operands`.
pub fn collapse(choice: &DataType, operands: &[DataType]) -> Option<DataType> {
    match choice {
        DataType::ConditionalCompilerChoice(choices) => choices
            .iter()
            .find(|c| c.conds.as_slice() == operands)
            .map(|c| c.ret.clone()),
        other => Some(other.clone()),
    }
}

/// Binary-operator promotion: integers of one signedness widen to the
/// higher rank, an integer meeting a float becomes that float, and two
/// floats widen to the larger one. Other pairs are left as they are.
pub fn promote(lhs: &DataType, rhs: &DataType) -> Vec<DataType> {
    let widened = match (lhs.integer_rank(), rhs.integer_rank()) {
        (Some(l), Some(r)) if lhs.is_signed_integer() == rhs.is_signed_integer() => {
            Some(if l >= r { lhs.clone() } else { rhs.clone() })
        }
        (Some(_), None) if rhs.is_float() => Some(rhs.clone()),
        (None, Some(_)) if lhs.is_float() => Some(lhs.clone()),
        (None, None) if lhs.is_float() && rhs.is_float() => Some(
            if lhs.float_bits() >= rhs.float_bits() {
                lhs.clone()
            } else {
                rhs.clone()
            },
        ),
        _ => None,
    };
    match widened {
        Some(dt) => vec![dt.clone(), dt],
        None => vec![lhs.clone(), rhs.clone()],
    }
}
