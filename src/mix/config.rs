use serde::{Deserialize, Serialize};
use thiserror::Error;

/// How a source's quota share is measured
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeightType {
    /// Share measured in song counts
    Frequency,
    /// Share measured in cumulative duration
    Time,
}

/// Per-source mixing quota: how much a pool contributes and in what run sizes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceQuota {
    pub source: String,
    /// Smallest run of consecutive picks from this source
    #[serde(default = "default_min_group")]
    pub min_group: usize,
    /// Largest run of consecutive picks from this source
    #[serde(default = "default_max_group")]
    pub max_group: usize,
    /// Relative contribution weight, compared across all active sources
    #[serde(default = "default_weight")]
    pub weight: f64,
    #[serde(default = "default_weight_type")]
    pub weight_type: WeightType,
}

fn default_min_group() -> usize {
    1
}

fn default_max_group() -> usize {
    3
}

fn default_weight() -> f64 {
    1.0
}

fn default_weight_type() -> WeightType {
    WeightType::Frequency
}

/// Requested output length
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", content = "value", rename_all = "snake_case")]
pub enum TargetSpec {
    /// Target number of tracks
    Count(usize),
    /// Target cumulative duration in milliseconds
    Duration(u64),
}

/// Popularity shape of the mixed output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PopularityStrategy {
    /// No popularity ordering, pool order wins
    Mixed,
    /// Hits first, deep cuts last
    FrontLoaded,
    /// Build up, peak in the middle, come down
    MidPeak,
    /// Deep cuts first, hits last
    Crescendo,
}

/// Ordering knobs for one mix
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct StrategySpec {
    #[serde(default = "default_strategy")]
    pub popularity_strategy: PopularityStrategy,
    /// Nudge recently released tracks up the popularity ranking
    #[serde(default)]
    pub recency_boost: bool,
    /// Shuffle tracks within a quartile, never across quartile boundaries
    #[serde(default)]
    pub shuffle_within_groups: bool,
}

fn default_strategy() -> PopularityStrategy {
    PopularityStrategy::Mixed
}

impl Default for StrategySpec {
    fn default() -> Self {
        Self {
            popularity_strategy: PopularityStrategy::Mixed,
            recency_boost: false,
            shuffle_within_groups: false,
        }
    }
}

/// A misconfigured quota or target. Raised at planning time rather than
/// silently clamped, since silent correction would hide a caller bug.
#[derive(Debug, Error, PartialEq)]
pub enum QuotaError {
    #[error("source '{source}': min_group {min} exceeds max_group {max}")]
    GroupBoundsInverted {
        r#source: String,
        min: usize,
        max: usize,
    },
    #[error("source '{source}': min_group must be at least 1")]
    ZeroGroup { r#source: String },
    #[error("source '{source}': weight must be positive and finite, got {weight}")]
    InvalidWeight { r#source: String, weight: f64 },
    #[error("source '{source}' appears more than once in the quota list")]
    DuplicateSource { r#source: String },
    #[error("target value must be positive")]
    ZeroTarget,
}

impl SourceQuota {
    /// Validate the quota's own fields
    pub fn validate(&self) -> Result<(), QuotaError> {
        if self.min_group == 0 {
            return Err(QuotaError::ZeroGroup {
                source: self.source.clone(),
            });
        }
        if self.min_group > self.max_group {
            return Err(QuotaError::GroupBoundsInverted {
                source: self.source.clone(),
                min: self.min_group,
                max: self.max_group,
            });
        }
        if !(self.weight.is_finite() && self.weight > 0.0) {
            return Err(QuotaError::InvalidWeight {
                source: self.source.clone(),
                weight: self.weight,
            });
        }
        Ok(())
    }
}

/// One source playlist of a mix as configured in the JSON file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MixSourceConfig {
    /// Id of the catalog playlist backing this source
    pub playlist_id: String,
    /// Optional display label; falls back to the playlist id
    pub name: Option<String>,
    #[serde(flatten)]
    pub quota: QuotaFields,
}

/// Quota fields shared between the JSON config and the engine's SourceQuota
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuotaFields {
    #[serde(default = "default_min_group")]
    pub min_group: usize,
    #[serde(default = "default_max_group")]
    pub max_group: usize,
    #[serde(default = "default_weight")]
    pub weight: f64,
    #[serde(default = "default_weight_type")]
    pub weight_type: WeightType,
}

impl MixSourceConfig {
    /// Label used as the source id in pools and statistics
    pub fn source_label(&self) -> String {
        self.name.clone().unwrap_or_else(|| self.playlist_id.clone())
    }

    pub fn to_quota(&self) -> SourceQuota {
        SourceQuota {
            source: self.source_label(),
            min_group: self.quota.min_group,
            max_group: self.quota.max_group,
            weight: self.quota.weight,
            weight_type: self.quota.weight_type,
        }
    }
}

/// Configuration for one mixed playlist
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MixConfig {
    pub name: String,
    pub sources: Vec<MixSourceConfig>,
    pub target: TargetSpec,
    #[serde(default)]
    pub strategy: StrategySpec,
}

impl MixConfig {
    /// Load mix configurations directly from a JSON array file
    pub fn load_all_from_file(path: &str) -> Result<Vec<MixConfig>, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path)?;
        let configs: Vec<MixConfig> = serde_json::from_str(&content)?;
        Ok(configs)
    }

    pub fn quotas(&self) -> Vec<SourceQuota> {
        self.sources.iter().map(|s| s.to_quota()).collect()
    }
}
