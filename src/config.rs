use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::analyzers::punctuality::PunctualityOptions;
use crate::error::Result;

/// Tunables of the analysis passes.
///
/// Stored as a JSON object on disk; missing keys keep their defaults:
/// ```json
/// {
///   "proximity_m": 25,
///   "late_threshold_minutes": 2,
///   "speed_limit_kmh": 50
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub proximity_m: u32,
    pub late_threshold_minutes: u32,
    pub speed_limit_kmh: u32,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            proximity_m: 10,
            late_threshold_minutes: 1,
            speed_limit_kmh: 50,
        }
    }
}

impl AnalysisConfig {
    /// Loads the config from a JSON file at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// The defaults, or the file at `path` when one is given.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        path.map_or_else(|| Ok(Self::default()), Self::load)
    }

    pub fn punctuality(&self, verbose: bool) -> PunctualityOptions {
        PunctualityOptions {
            proximity_m: self.proximity_m,
            threshold_minutes: self.late_threshold_minutes,
            verbose,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::InsightError;

    #[test]
    fn test_missing_keys_keep_defaults() {
        let path = std::env::temp_dir().join("transit_insights_test_config.json");
        std::fs::write(&path, r#"{"proximity_m": 25}"#).unwrap();

        let config = AnalysisConfig::load(&path).unwrap();
        assert_eq!(config.proximity_m, 25);
        assert_eq!(config.late_threshold_minutes, 1);
        assert_eq!(config.speed_limit_kmh, 50);

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_rejects_negative_values() {
        let path = std::env::temp_dir().join("transit_insights_test_config_negative.json");
        std::fs::write(&path, r#"{"speed_limit_kmh": -5}"#).unwrap();

        assert!(matches!(AnalysisConfig::load(&path), Err(InsightError::Json(_))));

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_punctuality_options() {
        let options = AnalysisConfig::default().punctuality(true);
        assert_eq!(options.proximity_m, 10);
        assert_eq!(options.threshold_minutes, 1);
        assert!(options.verbose);
        assert!(AnalysisConfig::load_or_default(None).is_ok());
    }
}
