//! Engine tunables.

use serde::{Deserialize, Serialize};

use crate::block::MINUTES_PER_DAY;
use crate::error::{ReflowError, Result};

/// Default floor for automatic shrinking, in minutes.
pub const DEFAULT_MIN_DURATION_MINUTES: i64 = 5;

/// Configuration shared by every reflow and edit call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReflowConfig {
    /// Reflow never shrinks a block below this many minutes.
    pub min_duration_minutes: i64,
}

impl Default for ReflowConfig {
    fn default() -> Self {
        Self {
            min_duration_minutes: DEFAULT_MIN_DURATION_MINUTES,
        }
    }
}

impl ReflowConfig {
    pub fn with_min_duration(mut self, minutes: i64) -> Self {
        self.min_duration_minutes = minutes;
        self
    }

    /// # Errors
    ///
    /// Returns [`ReflowError::InvalidConfig`] unless the floor lies in `(0, 1440]`.
    pub fn validate(&self) -> Result<()> {
        if self.min_duration_minutes <= 0 || self.min_duration_minutes > MINUTES_PER_DAY {
            return Err(ReflowError::InvalidConfig(format!(
                "min_duration_minutes must be in (0, {MINUTES_PER_DAY}], got {}",
                self.min_duration_minutes
            )));
        }
        Ok(())
    }

    /// Parse a JSON document, filling omitted fields with defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ReflowError::InvalidConfig`] if the document is malformed or
    /// the resulting values are out of range.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ReflowError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_floor_is_five_minutes() {
        assert_eq!(ReflowConfig::default().min_duration_minutes, 5);
        assert!(ReflowConfig::default().validate().is_ok());
    }

    #[test]
    fn test_from_json_partial_document_uses_defaults() {
        let config = ReflowConfig::from_json("{}").unwrap();
        assert_eq!(config, ReflowConfig::default());
    }

    #[test]
    fn test_from_json_overrides_floor() {
        let config = ReflowConfig::from_json(r#"{"min_duration_minutes": 15}"#).unwrap();
        assert_eq!(config.min_duration_minutes, 15);
    }

    #[test]
    fn test_from_json_rejects_zero_floor() {
        let err = ReflowConfig::from_json(r#"{"min_duration_minutes": 0}"#).unwrap_err();
        assert!(matches!(err, ReflowError::InvalidConfig(_)));
    }

    #[test]
    fn test_from_json_rejects_garbage() {
        assert!(ReflowConfig::from_json("not json").is_err());
    }
}
