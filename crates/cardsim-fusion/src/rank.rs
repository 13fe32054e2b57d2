//! Final ordering of fused scores.

use std::collections::BTreeMap;

use cardsim_core::{Entity, SignalKind};
use serde::Serialize;

/// A ranked result with its per-signal breakdown.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredCandidate {
    pub entity: Entity,
    /// Fused score (the MMR score when diversification is on).
    pub score: f64,
    /// Present signal values for this candidate against the query.
    pub signals: BTreeMap<SignalKind, f64>,
    /// 1-indexed rank of the candidate within each present signal.
    pub ranks: BTreeMap<SignalKind, usize>,
}

/// Sort by fused score descending, ties by entity id ascending, and keep
/// the first `top_k`.
///
/// Non-finite scores sort as `0.0`.
#[must_use]
pub fn rank<I>(scores: I, top_k: usize) -> Vec<(Entity, f64)>
where
    I: IntoIterator<Item = (Entity, f64)>,
{
    let mut ranked: Vec<(Entity, f64)> = scores
        .into_iter()
        .map(|(c, s)| (c, if s.is_finite() { s } else { 0.0 }))
        .collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked.truncate(top_k);
    ranked
}
