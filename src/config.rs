//! Application configuration loaded from an optional TOML file

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub data: DataConfig,
    pub scoring: ScoringParams,
    /// Segment labels keyed by cluster id
    pub segments: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct DataConfig {
    pub clustering_csv: String,
    pub campaign_csv: String,
    pub campaign_separator: char,
}

/// Constants of the probability adjustment and strategy rules
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct ScoringParams {
    pub income_weight: f64,
    pub recency_weight: f64,
    pub min_probability: f64,
    pub max_probability: f64,
    pub high_value_threshold: f64,
    pub medium_threshold: f64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data: DataConfig::default(),
            scoring: ScoringParams::default(),
            segments: default_segments(),
        }
    }
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            clustering_csv: "clustering_results.csv".into(),
            campaign_csv: "marketing_campaign.csv".into(),
            campaign_separator: ';',
        }
    }
}

impl Default for ScoringParams {
    fn default() -> Self {
        Self {
            income_weight: 0.2,
            recency_weight: 0.1,
            min_probability: 0.05,
            max_probability: 0.95,
            high_value_threshold: 0.50,
            medium_threshold: 0.30,
        }
    }
}

fn default_segments() -> BTreeMap<String, String> {
    [
        ("0", "Low-Income Family"),
        ("1", "High-Spending Elite"),
        ("2", "Middle-Class Stable"),
        ("3", "Premium VIP"),
    ]
    .into_iter()
    .map(|(id, label)| (id.to_string(), label.to_string()))
    .collect()
}

impl AppConfig {
    /// Load config from a TOML file. A missing file yields the defaults; an
    /// unreadable or malformed one is an error.
    pub fn load(path: impl AsRef<Path>) -> crate::Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::info!("Config file {} not found, using defaults", path.display());
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", path.display(), e))?;
        let config = Self::from_toml(&contents)
            .map_err(|e| anyhow::anyhow!("Failed to parse {}: {}", path.display(), e))?;
        tracing::info!("Config loaded from {}", path.display());
        Ok(config)
    }

    pub fn from_toml(contents: &str) -> crate::Result<Self> {
        let config: Self = toml::from_str(contents)?;
        config.scoring.validate()?;
        Ok(config)
    }

    /// Human-readable label of a cluster
    pub fn segment_label(&self, cluster_id: i64) -> String {
        self.segments
            .get(&cluster_id.to_string())
            .cloned()
            .unwrap_or_else(|| format!("Cluster {}", cluster_id))
    }
}

impl ScoringParams {
    pub fn validate(&self) -> crate::Result<()> {
        if !(0.0..=1.0).contains(&self.min_probability)
            || !(0.0..=1.0).contains(&self.max_probability)
            || self.min_probability > self.max_probability
        {
            anyhow::bail!(
                "Probability bounds must satisfy 0 <= min ({}) <= max ({}) <= 1",
                self.min_probability,
                self.max_probability
            );
        }
        if self.medium_threshold > self.high_value_threshold {
            anyhow::bail!(
                "Medium threshold ({}) must not exceed high-value threshold ({})",
                self.medium_threshold,
                self.high_value_threshold
            );
        }
        Ok(())
    }
}
