//! Maximal Marginal Relevance re-ranking.
//!
//! Greedy selection over a relevance-ordered pool. Each step picks the
//! candidate maximizing
//!
//! ```text
//! mmr(c) = rel(c) - λ · max_{s ∈ selected} sim(c, s)
//! ```
//!
//! where the max over an empty selection is `0.0`. Ties go to the candidate
//! that came first in the pool. Because `λ ≥ 0` and each candidate's
//! redundancy only grows as the selection grows, the reported MMR scores are
//! non-increasing in selection order.
//!
//! The selector is driven step by step: the caller picks, then reports the
//! similarity of each remaining candidate to the pick. That keeps similarity
//! lookups (which are async provider calls in the engine) outside this type.

use cardsim_core::Entity;

#[derive(Debug, Clone)]
struct Pending {
    entity: Entity,
    relevance: f64,
    redundancy: f64,
}

/// Incremental MMR state.
#[derive(Debug, Clone)]
pub struct MmrSelector {
    lambda: f64,
    pending: Vec<Pending>,
    selected: Vec<(Entity, f64)>,
}

impl MmrSelector {
    /// `pool` must already be in relevance order (best first).
    #[must_use]
    pub fn new(pool: Vec<(Entity, f64)>, lambda: f64) -> Self {
        Self {
            lambda,
            pending: pool
                .into_iter()
                .map(|(entity, relevance)| Pending {
                    entity,
                    relevance,
                    redundancy: 0.0,
                })
                .collect(),
            selected: Vec::new(),
        }
    }

    /// Move the best remaining candidate into the selection and return it.
    pub fn select_next(&mut self) -> Option<&str> {
        let mut best: Option<(usize, f64)> = None;
        for (idx, p) in self.pending.iter().enumerate() {
            let score = self.lambda.mul_add(-p.redundancy, p.relevance);
            if best.is_none_or(|(_, b)| score > b) {
                best = Some((idx, score));
            }
        }
        let (idx, score) = best?;
        let picked = self.pending.remove(idx);
        self.selected.push((picked.entity, score));
        self.selected.last().map(|(e, _)| e.as_str())
    }

    /// Candidates not yet selected, in pool order.
    pub fn remaining(&self) -> impl Iterator<Item = &str> {
        self.pending.iter().map(|p| p.entity.as_str())
    }

    /// Record `candidate`'s similarity to the most recent pick.
    pub fn observe(&mut self, candidate: &str, similarity: f64) {
        if let Some(p) = self.pending.iter_mut().find(|p| p.entity == candidate) {
            p.redundancy = p.redundancy.max(similarity);
        }
    }

    #[must_use]
    pub fn selected_len(&self) -> usize {
        self.selected.len()
    }

    #[must_use]
    pub fn into_selected(self) -> Vec<(Entity, f64)> {
        self.selected
    }
}
