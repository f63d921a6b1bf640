//! Engine tuning loaded from RON.
//!
//! Every field has a default, so an empty file (or no file at all) yields
//! the stock behaviour:
//!
//! ```ron
//! (
//!     order_step: 1000.0,
//!     key_direction: ascending,
//!     hover_before: 0.35,
//!     hover_after: 0.35,
//!     default_sort: custom,
//! )
//! ```
//!
//! Hyphenated sort names are raw identifiers in RON:
//! `default_sort: r#name-ascending`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::order::KeyDirection;
use crate::projection::SortMode;

/// Default spacing between sibling order keys (one second, in millis).
pub const DEFAULT_ORDER_STEP: f64 = 1000.0;

/// Default share of an item's extent that means "insert before" / "after".
pub const DEFAULT_HOVER_BAND: f64 = 0.35;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// δ: distance used when a list moves to the head or tail, and the
    /// spacing of renormalised keys.
    pub order_step: f64,
    /// Whether lower keys display first.
    pub key_direction: KeyDirection,
    /// Top fraction of a hovered item that targets the gap before it.
    pub hover_before: f64,
    /// Bottom fraction of a hovered item that targets the gap after it.
    pub hover_after: f64,
    /// Sort mode a list view opens in.
    pub default_sort: SortMode,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            order_step: DEFAULT_ORDER_STEP,
            key_direction: KeyDirection::default(),
            hover_before: DEFAULT_HOVER_BAND,
            hover_after: DEFAULT_HOVER_BAND,
            default_sort: SortMode::default(),
        }
    }
}

impl EngineConfig {
    pub fn with_order_step(mut self, step: f64) -> Self {
        self.order_step = step;
        self
    }

    pub fn with_key_direction(mut self, direction: KeyDirection) -> Self {
        self.key_direction = direction;
        self
    }

    pub fn with_hover_bands(mut self, before: f64, after: f64) -> Self {
        self.hover_before = before;
        self.hover_after = after;
        self
    }

    pub fn with_default_sort(mut self, sort: SortMode) -> Self {
        self.default_sort = sort;
        self
    }

    /// Parse and validate a RON document.
    pub fn from_ron(text: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = ron::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a file. A missing file is an error.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_ron(&text)
    }

    /// Load from a file, falling back to defaults when it does not exist.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no engine config, using defaults");
            return Ok(Self::default());
        }
        Self::load(path)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.order_step.is_finite() || self.order_step <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "order_step must be finite and positive, got {}",
                self.order_step
            )));
        }
        for (name, value) in [("hover_before", self.hover_before), ("hover_after", self.hover_after)] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::Invalid(format!("{name} must be within [0, 1], got {value}")));
            }
        }
        if self.hover_before + self.hover_after > 1.0 {
            return Err(ConfigError::Invalid(
                "hover_before + hover_after must not exceed 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Errors from loading an [`EngineConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("RON parse error: {0}")]
    Ron(#[from] ron::error::SpannedError),
    #[error("invalid config: {0}")]
    Invalid(String),
}
