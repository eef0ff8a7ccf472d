//! Naming conventions checked when a declaration is registered.

use core::fmt;

use crate::symbol::SymbolKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamingConvention {
    PascalCase,
    SnakeCase,
    UpperSnakeCase,
}

impl fmt::Display for NamingConvention {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NamingConvention::PascalCase => f.write_str("PascalCase"),
            NamingConvention::SnakeCase => f.write_str("snake_case"),
            NamingConvention::UpperSnakeCase => f.write_str("UPPER_SNAKE_CASE"),
        }
    }
}

impl NamingConvention {
    pub fn for_kind(kind: SymbolKind) -> NamingConvention {
        match kind {
            SymbolKind::Record
            | SymbolKind::Enum
            | SymbolKind::Class
            | SymbolKind::Trait
            | SymbolKind::Alias
            | SymbolKind::Error => NamingConvention::PascalCase,
            SymbolKind::Constant => NamingConvention::UpperSnakeCase,
            SymbolKind::Module
            | SymbolKind::Fun
            | SymbolKind::Method
            | SymbolKind::Variable
            | SymbolKind::Param => NamingConvention::SnakeCase,
        }
    }

    pub fn matches(self, name: &str) -> bool {
        match self {
            NamingConvention::PascalCase => is_pascal_case(name),
            NamingConvention::SnakeCase => is_snake_case(name),
            NamingConvention::UpperSnakeCase => is_upper_snake_case(name),
        }
    }
}

pub fn is_pascal_case(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_uppercase())
        && chars.all(|c| c.is_ascii_alphanumeric())
}

pub fn is_snake_case(name: &str) -> bool {
    let trimmed = name.trim_start_matches('_');
    if trimmed.is_empty() {
        return !name.is_empty();
    }
    !trimmed.starts_with(|c: char| c.is_ascii_digit())
        && trimmed
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

pub fn is_upper_snake_case(name: &str) -> bool {
    matches!(name.chars().next(), Some(c) if c.is_ascii_uppercase())
        && name
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
}

/// Warning text when `name` does not follow the convention for `kind`.
pub fn check_name(name: &str, kind: SymbolKind) -> Option<String> {
    let convention = NamingConvention::for_kind(kind);
    if convention.matches(name) {
        None
    } else {
        Some(format!("{kind} `{name}` should be written in {convention}"))
    }
}
