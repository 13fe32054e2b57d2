//! Score fusion over a [`SignalMatrix`].
//!
//! Each aggregator turns the sparse matrix into one fused score per
//! candidate. Absent entries are skipped, never read as `0.0`.
//!
//! # Strategies
//!
//! **Weighted** sums normalized weight times score over the signals that are
//! present:
//!
//! ```text
//! score(c) = Σ_{k present for c} w[k] · s[k](c)
//! ```
//!
//! The sum is not renormalized over present signals, so a candidate that
//! only one provider can score is capped by that provider's weight.
//!
//! **Reciprocal Rank Fusion (RRF)** ranks candidates per signal (descending
//! score, ties broken by candidate id) and sums weighted reciprocal ranks:
//!
//! ```text
//! score(c) = Σ_{k present for c} w[k] / (κ + rank_k(c))
//! ```
//!
//! Ranks are 1-indexed and computed from the provider's raw (unclamped)
//! scores. RRF depends only on per-signal order, so rescaling one
//! provider's scores by a positive factor never changes the fused ranking.
//!
//! **CombSUM** is the weighted sum `Σ w[k] · s[k]` over the enabled kinds
//! (weight > 0). **CombMAX / CombMIN** take the maximum or minimum present
//! signal over the enabled kinds. A candidate with no enabled signal scores
//! `0.0`.
//!
//! # Example
//!
//! ```
//! use cardsim_core::{SignalKind, WeightSet};
//! use cardsim_fusion::{Aggregator, SignalMatrix};
//!
//! let mut matrix = SignalMatrix::with_candidates(["B", "C"]);
//! matrix.insert("B", SignalKind::Graph, 0.5);
//! matrix.insert("B", SignalKind::Structural, 0.9);
//! matrix.insert("C", SignalKind::Graph, 0.1);
//!
//! let weights = WeightSet::from_pairs([(SignalKind::Graph, 1.0), (SignalKind::Structural, 1.0)])
//!     .normalized()
//!     .unwrap();
//! let fused = Aggregator::Weighted.aggregate(&matrix, &weights);
//! assert!((fused["B"] - 0.7).abs() < 1e-12);
//! assert!((fused["C"] - 0.05).abs() < 1e-12);
//! ```

use std::collections::BTreeMap;

use cardsim_core::{AggregatorKind, Entity, NormalizedWeights, SignalKind};

use crate::matrix::SignalMatrix;

/// A configured fusion strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregator {
    Weighted,
    Rrf { k: usize },
    CombSum,
    CombMax,
    CombMin,
}

impl Aggregator {
    /// `rrf_k` is only used by [`AggregatorKind::Rrf`].
    #[must_use]
    pub const fn from_kind(kind: AggregatorKind, rrf_k: usize) -> Self {
        match kind {
            AggregatorKind::Weighted => Self::Weighted,
            AggregatorKind::Rrf => Self::Rrf { k: rrf_k },
            AggregatorKind::CombSum => Self::CombSum,
            AggregatorKind::CombMax => Self::CombMax,
            AggregatorKind::CombMin => Self::CombMin,
        }
    }

    #[must_use]
    pub const fn kind(self) -> AggregatorKind {
        match self {
            Self::Weighted => AggregatorKind::Weighted,
            Self::Rrf { .. } => AggregatorKind::Rrf,
            Self::CombSum => AggregatorKind::CombSum,
            Self::CombMax => AggregatorKind::CombMax,
            Self::CombMin => AggregatorKind::CombMin,
        }
    }

    /// Fused score for every candidate row in `matrix`.
    #[must_use]
    pub fn aggregate(
        self,
        matrix: &SignalMatrix,
        weights: &NormalizedWeights,
    ) -> BTreeMap<Entity, f64> {
        match self {
            Self::Weighted => matrix
                .rows()
                .map(|(c, row)| (c.to_string(), weighted_score(row, weights)))
                .collect(),
            Self::Rrf { k } => rrf_scores(matrix, weights, k),
            Self::CombSum => comb(matrix, weights, |present| {
                present.map(|(weight, score)| weight * score).sum()
            }),
            Self::CombMax => comb(matrix, weights, |present| {
                present.map(|(_, score)| score).fold(0.0, f64::max)
            }),
            Self::CombMin => comb(matrix, weights, |present| {
                present
                    .map(|(_, score)| score)
                    .fold(None, |acc: Option<f64>, s| Some(acc.map_or(s, |a| a.min(s))))
                    .unwrap_or(0.0)
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Weighted
// ---------------------------------------------------------------------------

/// `Σ w[k] · s[k]` over the signals present in `row`.
#[must_use]
pub fn weighted_score(row: &BTreeMap<SignalKind, f64>, weights: &NormalizedWeights) -> f64 {
    row.iter()
        .map(|(kind, score)| weights.get(*kind) * score)
        .sum()
}

// ---------------------------------------------------------------------------
// RRF
// ---------------------------------------------------------------------------

/// 1-indexed per-signal ranks.
///
/// For each kind, candidates with a present entry are sorted by descending
/// raw score, ties broken by ascending candidate id. Candidates without an
/// entry have no rank for that kind.
#[must_use]
pub fn signal_ranks(matrix: &SignalMatrix) -> BTreeMap<SignalKind, BTreeMap<Entity, usize>> {
    let mut ranks = BTreeMap::new();
    for kind in SignalKind::ALL {
        let mut column = matrix.raw_column(kind);
        if column.is_empty() {
            continue;
        }
        column.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        let by_candidate: BTreeMap<Entity, usize> = column
            .into_iter()
            .enumerate()
            .map(|(idx, (candidate, _))| (candidate.to_string(), idx + 1))
            .collect();
        ranks.insert(kind, by_candidate);
    }
    ranks
}

/// `Σ w[k] / (κ + rank_k(c))` over the signals present for each candidate.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn rrf_scores(
    matrix: &SignalMatrix,
    weights: &NormalizedWeights,
    k: usize,
) -> BTreeMap<Entity, f64> {
    let mut scores: BTreeMap<Entity, f64> = matrix
        .candidates()
        .map(|c| (c.to_string(), 0.0))
        .collect();

    for (kind, ranked) in signal_ranks(matrix) {
        let weight = weights.get(kind);
        if weight <= 0.0 {
            continue;
        }
        for (candidate, rank) in ranked {
            let contribution = weight / (k as f64 + rank as f64);
            *scores.entry(candidate).or_default() += contribution;
        }
    }
    scores
}

// ---------------------------------------------------------------------------
// CombSUM / CombMAX / CombMIN
// ---------------------------------------------------------------------------

/// Reduce each row's `(weight, score)` pairs over the enabled kinds.
fn comb<F>(matrix: &SignalMatrix, weights: &NormalizedWeights, reduce: F) -> BTreeMap<Entity, f64>
where
    F: Fn(&mut dyn Iterator<Item = (f64, f64)>) -> f64,
{
    matrix
        .rows()
        .map(|(c, row)| {
            let mut present = row
                .iter()
                .map(|(kind, score)| (weights.get(*kind), *score))
                .filter(|(weight, _)| *weight > 0.0);
            (c.to_string(), reduce(&mut present))
        })
        .collect()
}
