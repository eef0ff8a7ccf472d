//! Analysis configuration.

use serde::Deserialize;

/// Knobs read by the analyzer.
///
/// Missing fields fall back to [`AnalysisConfig::default`], so a partial
/// JSON object is a valid configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnalysisConfig {
    /// Allow numeric widening and pointer decay without an explicit cast.
    pub allow_implicit_cast: bool,
    /// Emit naming-convention warnings when registering declarations.
    pub naming_conventions: bool,
    /// Bound on nested instantiations in one dependency closure.
    pub max_instantiation_depth: usize,
    /// Report uncovered variants of `Bool` and enum matches without `else`.
    pub exhaustiveness: bool,
}

impl AnalysisConfig {
    pub const DEFAULT_MAX_INSTANTIATION_DEPTH: usize = 64;
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        AnalysisConfig {
            allow_implicit_cast: true,
            naming_conventions: true,
            max_instantiation_depth: Self::DEFAULT_MAX_INSTANTIATION_DEPTH,
            exhaustiveness: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let config: AnalysisConfig =
            serde_json::from_str(r#"{ "allow_implicit_cast": false }"#).expect("config");
        assert!(!config.allow_implicit_cast);
        assert!(config.naming_conventions);
        assert_eq!(config.max_instantiation_depth, 64);
    }

    #[test]
    fn rejects_unknown_keys() {
        let result = serde_json::from_str::<AnalysisConfig>(r#"{ "colour": true }"#);
        assert!(result.is_err());
    }
}
