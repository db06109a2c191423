//! Run configuration read from an optional TOML file

use meshlod_core::{Error, Result};
use meshlod_simplification::SimplifyOptions;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Fraction of faces kept when nothing else is specified
pub const DEFAULT_RATIO: f32 = 0.6;

/// ```toml
/// ratio = 0.4
///
/// [simplify]
/// preserve_texture = false
/// length_weight = 1.0
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunConfig {
    pub ratio: f32,
    pub simplify: SimplifyOptions,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            ratio: DEFAULT_RATIO,
            simplify: SimplifyOptions::default(),
        }
    }
}

impl RunConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: RunConfig = toml::from_str(text).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Apply command-line overrides on top of file values
    pub fn with_overrides(mut self, ratio: Option<f32>, no_preserve_texture: bool) -> Result<Self> {
        if let Some(r) = ratio {
            self.ratio = r;
        }
        if no_preserve_texture {
            self.simplify.preserve_texture = false;
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.ratio) {
            return Err(Error::Config(format!(
                "ratio must be within [0, 1], got {}",
                self.ratio
            )));
        }
        self.simplify.validate()
    }
}
