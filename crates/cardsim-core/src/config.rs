use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

use crate::error::{ConfigError, ErrorCode};
use crate::kind::SignalKind;
use crate::weights::{TaskProfile, WeightSet};

/// Score-fusion strategy, selected once per engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum AggregatorKind {
    /// `Σ w[k]·s[k]` over present signals, never renormalized.
    Weighted,
    /// Reciprocal Rank Fusion, `Σ w[k] / (κ + rank_k)`.
    Rrf,
    /// Weighted sum over enabled kinds.
    CombSum,
    /// Best present signal over enabled kinds.
    CombMax,
    /// Worst present signal over enabled kinds.
    CombMin,
}

impl AggregatorKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Weighted => "weighted",
            Self::Rrf => "rrf",
            Self::CombSum => "combsum",
            Self::CombMax => "combmax",
            Self::CombMin => "combmin",
        }
    }
}

impl fmt::Display for AggregatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AggregatorKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "weighted" | "linear" => Ok(Self::Weighted),
            "rrf" => Ok(Self::Rrf),
            "combsum" => Ok(Self::CombSum),
            "combmax" => Ok(Self::CombMax),
            "combmin" => Ok(Self::CombMin),
            other => Err(ConfigError::UnknownAggregator(other.to_string())),
        }
    }
}

impl TryFrom<String> for AggregatorKind {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<AggregatorKind> for String {
    fn from(kind: AggregatorKind) -> Self {
        kind.as_str().to_string()
    }
}

/// Engine configuration, loaded from `fusion.toml`.
///
/// Immutable once an engine is built from it; changing weights means
/// building a new engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FusionConfig {
    #[serde(default = "default_aggregator")]
    pub aggregator: AggregatorKind,
    /// Shortlist size requested from each provider during candidate generation.
    #[serde(default = "default_candidate_topn")]
    pub candidate_topn: usize,
    /// RRF damping constant κ.
    #[serde(default = "default_rrf_k")]
    pub rrf_k: usize,
    /// MMR diversification strength; `0.0` disables re-ranking.
    ///
    /// Re-ranking considers the top `4 * top_k` fused candidates, not the
    /// whole candidate set.
    #[serde(default)]
    pub mmr_lambda: f64,
    /// Signal used as the MMR redundancy measure.
    #[serde(default = "default_mmr_signal")]
    pub mmr_signal: SignalKind,
    /// Per-call deadline applied to every provider unless overridden.
    #[serde(default = "default_provider_timeout_ms")]
    pub provider_timeout_ms: u64,
    /// Per-kind deadline overrides in milliseconds.
    #[serde(default)]
    pub timeouts: BTreeMap<SignalKind, u64>,
    /// Upper bound on concurrently outstanding pairwise calls per query.
    #[serde(default = "default_max_in_flight")]
    pub max_in_flight: usize,
    #[serde(default)]
    pub task: Option<TaskProfile>,
    #[serde(default)]
    pub weights: WeightSet,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            aggregator: default_aggregator(),
            candidate_topn: default_candidate_topn(),
            rrf_k: default_rrf_k(),
            mmr_lambda: 0.0,
            mmr_signal: default_mmr_signal(),
            provider_timeout_ms: default_provider_timeout_ms(),
            timeouts: BTreeMap::new(),
            max_in_flight: default_max_in_flight(),
            task: None,
            weights: WeightSet::default(),
        }
    }
}

impl FusionConfig {
    /// Deadline for a single call to a provider of `kind`.
    #[must_use]
    pub fn timeout_for(&self, kind: SignalKind) -> Duration {
        let ms = self
            .timeouts
            .get(&kind)
            .copied()
            .unwrap_or(self.provider_timeout_ms);
        Duration::from_millis(ms)
    }

    /// Base weights with the task profile (if any) applied.
    #[must_use]
    pub fn effective_weights(&self) -> WeightSet {
        match self.task {
            Some(task) => self.weights.adapted(task),
            None => self.weights.clone(),
        }
    }
}

/// Read and parse a `fusion.toml`.
///
/// # Errors
///
/// Fails if the file cannot be read or is not a valid config. Parse
/// failures carry [`ErrorCode::ConfigParseError`] in their context.
pub fn load_fusion_config(path: &Path) -> Result<FusionConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let config = toml::from_str::<FusionConfig>(&content).with_context(|| {
        let code = ErrorCode::ConfigParseError;
        format!("{code}: {}: failed to parse {}", code.message(), path.display())
    })?;
    info!(path = %path.display(), aggregator = %config.aggregator, "loaded fusion config");
    Ok(config)
}

/// Load `<config dir>/cardsim/fusion.toml`, or defaults when it is absent.
pub fn load_default_config() -> Result<FusionConfig> {
    let Some(config_dir) = dirs::config_dir() else {
        debug!("no platform config dir; using default fusion config");
        return Ok(FusionConfig::default());
    };

    load_config_in(&config_dir)
}

/// Load `<config_dir>/cardsim/fusion.toml`, or defaults when it is absent.
///
/// # Errors
///
/// Fails only when the file exists but cannot be read or parsed.
pub fn load_config_in(config_dir: &Path) -> Result<FusionConfig> {
    let path = config_dir.join("cardsim").join("fusion.toml");
    if !path.exists() {
        debug!(path = %path.display(), "no fusion config file; using defaults");
        return Ok(FusionConfig::default());
    }

    load_fusion_config(&path)
}

const fn default_aggregator() -> AggregatorKind {
    AggregatorKind::Weighted
}

const fn default_candidate_topn() -> usize {
    100
}

const fn default_rrf_k() -> usize {
    60
}

const fn default_mmr_signal() -> SignalKind {
    SignalKind::Graph
}

const fn default_provider_timeout_ms() -> u64 {
    2_000
}

const fn default_max_in_flight() -> usize {
    64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_config(dir: &tempfile::TempDir, body: &str) -> std::path::PathBuf {
        let path = dir.path().join("fusion.toml");
        std::fs::write(&path, body).expect("write config");
        path
    }

    #[test]
    fn empty_file_uses_defaults() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = write_config(&dir, "");
        let cfg = load_fusion_config(&path).expect("load should succeed");
        assert_eq!(cfg, FusionConfig::default());
        assert_eq!(cfg.candidate_topn, 100);
        assert_eq!(cfg.rrf_k, 60);
        assert_eq!(cfg.aggregator, AggregatorKind::Weighted);
    }

    #[test]
    fn weights_and_overrides_parse() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = write_config(
            &dir,
            r#"
aggregator = "rrf"
candidate_topn = 50
provider_timeout_ms = 250
task = "synergy"

[timeouts]
visual = 5000

[weights]
graph = 0.5
embed = 0.5
"#,
        );
        let cfg = load_fusion_config(&path).expect("load should succeed");
        assert_eq!(cfg.aggregator, AggregatorKind::Rrf);
        assert_eq!(cfg.candidate_topn, 50);
        assert_eq!(cfg.task, Some(TaskProfile::Synergy));
        assert!((cfg.weights.get(SignalKind::Structural) - 0.5).abs() < 1e-12);
        assert_eq!(cfg.timeout_for(SignalKind::Visual), Duration::from_secs(5));
        assert_eq!(cfg.timeout_for(SignalKind::Graph), Duration::from_millis(250));
    }

    #[test]
    fn unknown_aggregator_fails_to_parse() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = write_config(&dir, "aggregator = \"borda\"\n");
        let err = load_fusion_config(&path).unwrap_err();
        assert!(format!("{err:#}").contains("unknown aggregator `borda`"));
    }

    #[test]
    fn unknown_signal_kind_fails_to_parse() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = write_config(&dir, "[weights]\nsideboard = 0.3\n");
        let err = load_fusion_config(&path).unwrap_err();
        assert!(format!("{err:#}").contains("unknown signal kind `sideboard`"));
    }

    #[test]
    fn parse_failure_carries_error_code() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = write_config(&dir, "candidate_topn = \"lots\"\n");
        let err = load_fusion_config(&path).unwrap_err();
        let rendered = format!("{err:#}");
        assert!(rendered.contains("E1001"), "{rendered}");
        assert!(rendered.contains("fusion.toml"), "{rendered}");
    }

    #[test]
    fn config_dir_without_file_uses_defaults() {
        let dir = tempfile::tempdir().expect("temp dir");
        let cfg = load_config_in(dir.path()).expect("absent file is not an error");
        assert_eq!(cfg, FusionConfig::default());
    }

    #[test]
    fn config_dir_with_file_is_loaded() {
        let dir = tempfile::tempdir().expect("temp dir");
        std::fs::create_dir_all(dir.path().join("cardsim")).expect("create app dir");
        std::fs::write(
            dir.path().join("cardsim").join("fusion.toml"),
            "aggregator = \"combmax\"\n",
        )
        .expect("write config");
        let cfg = load_config_in(dir.path()).expect("load should succeed");
        assert_eq!(cfg.aggregator, AggregatorKind::CombMax);
        assert_eq!(cfg.candidate_topn, 100);
    }

    #[test]
    fn missing_file_reports_path() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("absent.toml");
        let err = load_fusion_config(&path).unwrap_err();
        assert!(err.to_string().contains("absent.toml"));
    }

    #[test]
    fn effective_weights_apply_task() {
        let cfg = FusionConfig {
            task: Some(TaskProfile::Discovery),
            ..FusionConfig::default()
        };
        let w = cfg.effective_weights();
        assert!((w.get(SignalKind::Gnn) - 0.36).abs() < 1e-12);
    }

    #[test]
    fn aggregator_names_round_trip() {
        for kind in [
            AggregatorKind::Weighted,
            AggregatorKind::Rrf,
            AggregatorKind::CombSum,
            AggregatorKind::CombMax,
            AggregatorKind::CombMin,
        ] {
            assert_eq!(kind.as_str().parse::<AggregatorKind>().ok(), Some(kind));
        }
    }
}
