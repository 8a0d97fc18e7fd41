use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlowConfig {
    pub partial_chi: PartialChiPolicy,
    /// Treat value conversions and up-casts as flow steps.
    pub track_conversions: bool,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            partial_chi: PartialChiPolicy::UnlessUnknown,
            track_conversions: true,
        }
    }
}

impl FlowConfig {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// When a chi's partial operand flows into the chi.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartialChiPolicy {
    /// Only when the chi's result type is known. A write that may reach
    /// escaped storage would otherwise flow into every escaped variable.
    UnlessUnknown,
    Always,
    Never,
}

impl PartialChiPolicy {
    pub fn allows(&self, result_is_unknown: bool) -> bool {
        match self {
            PartialChiPolicy::UnlessUnknown => !result_is_unknown,
            PartialChiPolicy::Always => true,
            PartialChiPolicy::Never => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = FlowConfig::default();
        assert_eq!(config.partial_chi, PartialChiPolicy::UnlessUnknown);
        assert!(config.track_conversions);
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config = FlowConfig::from_json(r#"{"partial_chi": "never"}"#).unwrap();
        assert_eq!(config.partial_chi, PartialChiPolicy::Never);
        assert!(config.track_conversions);

        assert!(FlowConfig::from_json(r#"{"partial_chi": "sometimes"}"#).is_err());
    }

    #[test]
    fn test_policy_gating() {
        assert!(PartialChiPolicy::UnlessUnknown.allows(false));
        assert!(!PartialChiPolicy::UnlessUnknown.allows(true));
        assert!(PartialChiPolicy::Always.allows(true));
        assert!(!PartialChiPolicy::Never.allows(false));
    }
}
