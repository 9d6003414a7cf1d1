use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::layout::{NodeSizing, SpacingKey};
use crate::port::EdgeStyle;

/// Editor settings. Every field has a default, so `{}` is a valid config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    pub spacing: SpacingKey,
    pub edge_style: EdgeStyle,
    pub node_size: NodeSizing,
    pub chain_block_gap: f64,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            spacing: SpacingKey::Normal,
            edge_style: EdgeStyle::Smoothstep,
            node_size: NodeSizing::default(),
            chain_block_gap: 2.0,
        }
    }
}

impl EditorConfig {
    pub fn from_json_str(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text).map_err(|e| Error::InvalidConfig {
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| Error::InvalidConfig {
            message: format!("{}: {e}", path.display()),
        })?;
        Self::from_json_str(&text)
    }

    fn validate(&self) -> Result<()> {
        let sizes = [
            self.node_size.fallback_width,
            self.node_size.fallback_height,
            self.node_size.extra_width,
            self.node_size.extra_height,
            self.chain_block_gap,
        ];
        if sizes.iter().any(|v| !v.is_finite() || *v < 0.0) {
            return Err(Error::InvalidConfig {
                message: "sizes and gaps must be finite and non-negative".into(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_is_default() {
        assert_eq!(EditorConfig::from_json_str("{}").expect("config"), EditorConfig::default());
    }

    #[test]
    fn partial_override() {
        let config = EditorConfig::from_json_str(
            r#"{"spacing": "loose", "edge_style": "bezier", "node_size": {"fallback_width": 200}}"#,
        )
        .expect("config");
        assert_eq!(config.spacing, SpacingKey::Loose);
        assert_eq!(config.edge_style, EdgeStyle::Bezier);
        assert_eq!(config.node_size.fallback_width, 200.0);
        assert_eq!(config.node_size.fallback_height, 150.0);
    }

    #[test]
    fn rejects_bad_values() {
        assert!(EditorConfig::from_json_str(r#"{"spacing": "roomy"}"#).is_err());
        assert!(EditorConfig::from_json_str(r#"{"chain_block_gap": -1}"#).is_err());
    }
}
