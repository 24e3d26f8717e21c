//! Editor configuration.

use serde::{Deserialize, Serialize};
use weaver_content_model::SegmentFormat;

use crate::error::EditorError;

/// Default undo history budget, in serialized snapshot bytes.
pub const DEFAULT_MAX_SNAPSHOT_SIZE: usize = 10_000_000;

/// Options fixed at editor construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EditorOptions {
    /// Upper bound on the summed size of undo snapshots; oldest are evicted.
    pub max_snapshot_size: usize,
    /// Document default segment format.
    pub default_segment_format: SegmentFormat,
    /// Extra class names the paste sanitizer keeps on pasted elements.
    pub allowed_entity_classes: Vec<String>,
    pub experimental_features: Vec<String>,
}

impl Default for EditorOptions {
    fn default() -> Self {
        Self {
            max_snapshot_size: DEFAULT_MAX_SNAPSHOT_SIZE,
            default_segment_format: SegmentFormat::default(),
            allowed_entity_classes: Vec::new(),
            experimental_features: Vec::new(),
        }
    }
}

impl EditorOptions {
    pub fn from_json(json: &str) -> Result<Self, EditorError> {
        serde_json::from_str(json).map_err(EditorError::InvalidOptions)
    }

    pub fn is_feature_enabled(&self, feature: &str) -> bool {
        self.experimental_features.iter().any(|f| f == feature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_keeps_defaults() {
        let options = EditorOptions::from_json(
            r#"{"defaultSegmentFormat": {"fontFamily": "Calibri"}, "experimentalFeatures": ["x"]}"#,
        )
        .unwrap();
        assert_eq!(options.max_snapshot_size, DEFAULT_MAX_SNAPSHOT_SIZE);
        assert_eq!(options.default_segment_format.font_family.as_deref(), Some("Calibri"));
        assert!(options.is_feature_enabled("x"));
    }

    #[test]
    fn test_bad_json_is_an_error() {
        assert!(matches!(
            EditorOptions::from_json(r#"{"maxSnapshotSize": "big"}"#),
            Err(EditorError::InvalidOptions(_))
        ));
    }
}
