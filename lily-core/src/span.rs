//! Source locations attached to declarations, expressions and diagnostics.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of a source file inside a compilation unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct FileId(pub u32);

/// Half-open byte range `[start, end)` in a source file.
///
/// The analysis never reads source text; spans are carried from the
/// parser output into diagnostics and the checked tree untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Span {
    #[serde(default)]
    pub file: FileId,
    pub start: u32,
    pub end: u32,
}

impl Span {
    pub const fn new(file: FileId, start: u32, end: u32) -> Self {
        Span { file, start, end }
    }

    /// Span used for compiler-synthesized nodes.
    pub const fn dummy() -> Self {
        Span {
            file: FileId(0),
            start: 0,
            end: 0,
        }
    }

    /// Smallest span covering both `self` and `other`.
    ///
    /// Spans from different files are not merged; `self` wins.
    pub fn to(self, other: Span) -> Span {
        if self.file != other.file {
            return self;
        }
        Span {
            file: self.file,
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    pub fn is_dummy(&self) -> bool {
        self.start == 0 && self.end == 0
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}..{}", self.file.0, self.start, self.end)
    }
}
