//! Per-signal weights and their normalization.
//!
//! A [`WeightSet`] maps each [`SignalKind`] to a non-negative weight. Before
//! the engine uses it, the set is normalized once so the weights sum to `1.0`:
//!
//! ```text
//! normalize(w)[k] = w[k] / Σ w
//! ```
//!
//! The sum runs over every configured kind, live or not. A non-zero weight
//! for a kind with no live provider is legal; it simply caps the reachable
//! score below `1.0`.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::kind::SignalKind;

/// Raw, un-normalized weights keyed by signal kind.
///
/// Kinds missing from the map weigh `0.0`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WeightSet {
    weights: BTreeMap<SignalKind, f64>,
}

impl Default for WeightSet {
    /// The tuned production mix, visual signal included.
    fn default() -> Self {
        Self::from_pairs([
            (SignalKind::Structural, 0.15),
            (SignalKind::Graph, 0.10),
            (SignalKind::Functional, 0.05),
            (SignalKind::Text, 0.20),
            (SignalKind::Visual, 0.20),
            (SignalKind::Gnn, 0.30),
        ])
    }
}

impl WeightSet {
    /// An empty set (every kind weighs zero). Not normalizable on its own.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            weights: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn from_pairs(pairs: impl IntoIterator<Item = (SignalKind, f64)>) -> Self {
        Self {
            weights: pairs.into_iter().collect(),
        }
    }

    /// Builder-style setter.
    #[must_use]
    pub fn with(mut self, kind: SignalKind, weight: f64) -> Self {
        self.weights.insert(kind, weight);
        self
    }

    #[must_use]
    pub fn get(&self, kind: SignalKind) -> f64 {
        self.weights.get(&kind).copied().unwrap_or(0.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (SignalKind, f64)> + '_ {
        self.weights.iter().map(|(k, w)| (*k, *w))
    }

    /// Kinds carrying a strictly positive weight.
    pub fn enabled_kinds(&self) -> impl Iterator<Item = SignalKind> + '_ {
        self.iter().filter(|(_, w)| *w > 0.0).map(|(k, _)| k)
    }

    /// Apply a task profile's per-kind multipliers.
    #[must_use]
    pub fn adapted(&self, task: TaskProfile) -> Self {
        Self {
            weights: self
                .weights
                .iter()
                .map(|(k, w)| (*k, w * task.multiplier(*k)))
                .collect(),
        }
    }

    /// Normalize so the weights sum to `1.0`.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::InvalidWeight`] if any weight is negative or not finite.
    /// - [`ConfigError::AllZeroWeights`] if every weight is zero.
    pub fn normalized(&self) -> Result<NormalizedWeights, ConfigError> {
        for (kind, value) in self.iter() {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidWeight { kind, value });
            }
        }

        let total: f64 = self.weights.values().sum();
        if total <= 0.0 || !total.is_finite() {
            return Err(ConfigError::AllZeroWeights);
        }

        Ok(NormalizedWeights {
            weights: self.iter().map(|(k, w)| (k, w / total)).collect(),
        })
    }
}

/// Weights that sum to `1.0 ± ε`. Only obtainable through
/// [`WeightSet::normalized`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct NormalizedWeights {
    weights: BTreeMap<SignalKind, f64>,
}

impl NormalizedWeights {
    #[must_use]
    pub fn get(&self, kind: SignalKind) -> f64 {
        self.weights.get(&kind).copied().unwrap_or(0.0)
    }

    /// Whether `kind` contributes anything to a fused score.
    #[must_use]
    pub fn is_enabled(&self, kind: SignalKind) -> bool {
        self.get(kind) > 0.0
    }

    pub fn iter(&self) -> impl Iterator<Item = (SignalKind, f64)> + '_ {
        self.weights.iter().map(|(k, w)| (*k, *w))
    }

    #[must_use]
    pub fn total(&self) -> f64 {
        self.weights.values().sum()
    }
}

// ---------------------------------------------------------------------------
// Task profiles
// ---------------------------------------------------------------------------

/// Recommendation task the engine is tuned for.
///
/// Each profile scales the base weights before normalization: substitution
/// leans on functional tags and oracle text, synergy on co-occurrence and the
/// GNN, and so on. The visual signal is never rescaled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum TaskProfile {
    Substitution,
    Completion,
    Synergy,
    Similarity,
    Discovery,
    Refinement,
    Upgrade,
    Downgrade,
    Quality,
}

impl TaskProfile {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Substitution => "substitution",
            Self::Completion => "completion",
            Self::Synergy => "synergy",
            Self::Similarity => "similarity",
            Self::Discovery => "discovery",
            Self::Refinement => "refinement",
            Self::Upgrade => "upgrade",
            Self::Downgrade => "downgrade",
            Self::Quality => "quality",
        }
    }

    /// Weight multiplier this profile applies to `kind`.
    #[must_use]
    pub const fn multiplier(self, kind: SignalKind) -> f64 {
        // (structural, graph, functional, text, gnn)
        let (structural, graph, functional, text, gnn) = match self {
            Self::Substitution => (0.8, 0.8, 1.5, 1.2, 0.9),
            Self::Completion => (1.0, 1.1, 1.2, 1.3, 1.0),
            Self::Synergy => (0.9, 1.3, 0.9, 1.1, 1.2),
            Self::Similarity => (1.2, 1.1, 0.8, 0.9, 1.1),
            Self::Discovery => (1.0, 1.0, 1.0, 1.0, 1.2),
            Self::Refinement => (0.9, 1.0, 1.3, 1.2, 1.0),
            Self::Upgrade | Self::Downgrade => (0.9, 0.9, 1.4, 1.3, 0.9),
            Self::Quality => (1.0, 1.0, 1.2, 1.1, 1.0),
        };
        match kind {
            SignalKind::Structural => structural,
            SignalKind::Graph => graph,
            SignalKind::Functional => functional,
            SignalKind::Text => text,
            SignalKind::Gnn => gnn,
            SignalKind::Visual => 1.0,
        }
    }
}

impl fmt::Display for TaskProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskProfile {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "substitution" => Ok(Self::Substitution),
            "completion" => Ok(Self::Completion),
            "synergy" => Ok(Self::Synergy),
            "similar" | "similarity" => Ok(Self::Similarity),
            "discovery" => Ok(Self::Discovery),
            "refinement" => Ok(Self::Refinement),
            "upgrade" => Ok(Self::Upgrade),
            "downgrade" => Ok(Self::Downgrade),
            "quality" => Ok(Self::Quality),
            other => Err(ConfigError::UnknownTask(other.to_string())),
        }
    }
}

impl TryFrom<String> for TaskProfile {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TaskProfile> for String {
    fn from(task: TaskProfile) -> Self {
        task.as_str().to_string()
    }
}
