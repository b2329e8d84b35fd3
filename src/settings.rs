use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Bounds for generated selectors.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct SelectorPolicy {
    /// Maximum ancestor segments in a generated path, starting element
    /// included.
    pub max_depth: usize,
    /// Maximum own CSS classes appended to one segment.
    pub max_classes: usize,
    /// Class prefix reserved for the tool's own chrome; such classes are
    /// never used in selectors so the tool cannot select itself.
    pub ui_class_prefix: String,
}

impl Default for SelectorPolicy {
    fn default() -> Self {
        Self {
            max_depth: 5,
            max_classes: 2,
            ui_class_prefix: "pagemark-".into(),
        }
    }
}

/// Per-page-load tool configuration, injected by the host page as JSON.
/// Everything has a usable default; hosts typically override only the
/// guest URL parameter name.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ToolSettings {
    pub selector: SelectorPolicy,
    /// Character cap on captured element text snippets.
    pub snippet_max_chars: usize,
    /// How long the locate flash highlight stays before auto-clearing.
    #[serde(with = "duration_ms")]
    pub locate_flash: Duration,
    /// How long the host keeps a transient notice on screen.
    #[serde(with = "duration_ms")]
    pub notice_timeout: Duration,
    /// Query-string parameter carrying the guest token.
    pub guest_param: String,
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            selector: SelectorPolicy::default(),
            snippet_max_chars: 100,
            locate_flash: Duration::from_secs(3),
            notice_timeout: Duration::from_secs(3),
            guest_param: "pagemark_guest".into(),
        }
    }
}

impl ToolSettings {
    pub fn from_json(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).context("failed to parse tool settings JSON")
    }
}

mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let ms = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_shipping_behavior() {
        let settings = ToolSettings::default();
        assert_eq!(settings.selector.max_depth, 5);
        assert_eq!(settings.selector.max_classes, 2);
        assert_eq!(settings.snippet_max_chars, 100);
        assert_eq!(settings.locate_flash, Duration::from_secs(3));
    }

    #[test]
    fn parses_partial_host_json() {
        let settings =
            ToolSettings::from_json(r#"{"guestParam":"fb_token","locateFlash":1500}"#).unwrap();
        assert_eq!(settings.guest_param, "fb_token");
        assert_eq!(settings.locate_flash, Duration::from_millis(1500));
        // Unspecified fields keep their defaults.
        assert_eq!(settings.selector.max_depth, 5);
    }

    #[test]
    fn rejects_malformed_json() {
        assert!(ToolSettings::from_json("{not json").is_err());
    }
}
