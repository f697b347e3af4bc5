use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Cannot read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid config file: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub coverage: CoverageConfig,
}

impl EngineConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        let config = serde_json::from_str(&raw)?;
        Ok(config)
    }

    /// Loads the file when one is given, defaults otherwise.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }
}

/// Typical bureau count for elections whose title or description mentions
/// one of `keywords`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TitleRule {
    pub keywords: Vec<String>,
    #[serde(rename = "typicalBureaux")]
    pub typical_bureaux: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoverageConfig {
    /// Election attributes holding an explicit bureau count, tried in order.
    #[serde(rename = "electionFields")]
    pub election_fields: Vec<String>,
    #[serde(rename = "titleRules")]
    pub title_rules: Vec<TitleRule>,
    #[serde(rename = "bureauNumberMultiplier")]
    pub bureau_number_multiplier: f64,
    #[serde(rename = "minimumBureaux")]
    pub minimum_bureaux: u64,
    #[serde(rename = "retryDelaysMs")]
    pub retry_delays_ms: Vec<u64>,
}

impl CoverageConfig {
    pub fn retry_delays(&self) -> impl Iterator<Item = Duration> + '_ {
        self.retry_delays_ms
            .iter()
            .map(|ms| Duration::from_millis(*ms))
    }
}

impl Default for CoverageConfig {
    fn default() -> Self {
        Self {
            election_fields: vec![
                "expected_bureaux".to_string(),
                "total_bureaux".to_string(),
                "nb_bureaux".to_string(),
                "bureau_count".to_string(),
                "nombre_bureaux".to_string(),
            ],
            title_rules: vec![
                TitleRule {
                    keywords: vec![
                        "municipal".to_string(),
                        "local".to_string(),
                        "communal".to_string(),
                    ],
                    typical_bureaux: 54,
                },
                TitleRule {
                    keywords: vec!["legislative".to_string(), "législative".to_string()],
                    typical_bureaux: 29,
                },
                TitleRule {
                    keywords: vec![
                        "presidential".to_string(),
                        "présidentielle".to_string(),
                    ],
                    typical_bureaux: 120,
                },
            ],
            bureau_number_multiplier: 1.1,
            minimum_bureaux: 5,
            retry_delays_ms: vec![500, 1000, 2000, 3000, 3500],
        }
    }
}
