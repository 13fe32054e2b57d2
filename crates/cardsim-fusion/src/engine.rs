//! The fusion engine: candidate generation, matrix fill, aggregation,
//! ranking, and optional diversification.
//!
//! # Query flow
//!
//! ```text
//! similar(q, k)
//!   ├─ candidates = ∪ provider.top_n(q, candidate_topn) \ {q}      (concurrent)
//!   ├─ matrix[c][kind] = provider.pairwise(q, c)                     (bounded fan-out)
//!   ├─ fused[c] = aggregator(matrix[c], weights)
//!   ├─ ranked = sort desc, ties by id, first k (or an MMR pool)
//!   └─ MMR re-rank when mmr_lambda > 0
//! ```
//!
//! The engine is immutable after construction and safe to share across
//! tasks. Provider faults and timeouts never fail a query; they only remove
//! entries from the matrix.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Instant;

use cardsim_core::{
    ConfigError, Entity, FusionConfig, NormalizedWeights, SignalKind, SignalProvider,
};
use futures::future::join_all;
use futures::stream::{self, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::aggregate::{Aggregator, signal_ranks};
use crate::call::LiveProvider;
use crate::candidates::generate_candidates;
use crate::diversify::MmrSelector;
use crate::matrix::{SignalMatrix, build_matrix};
use crate::rank::{ScoredCandidate, rank};

/// MMR pool size as a multiple of `top_k`.
const MMR_POOL_FACTOR: usize = 4;

#[derive(Debug, Clone)]
struct MmrSettings {
    lambda: f64,
    provider: LiveProvider,
}

/// Late-fusion similarity engine over a fixed set of live providers.
#[derive(Debug)]
pub struct FusionEngine {
    providers: Vec<LiveProvider>,
    weights: NormalizedWeights,
    aggregator: Aggregator,
    candidate_topn: usize,
    max_in_flight: usize,
    mmr: Option<MmrSettings>,
    fingerprint: String,
}

impl FusionEngine {
    /// Validate `config`, check provider availability, and freeze the result.
    ///
    /// Unavailable providers are dropped with a warning. The task profile (if
    /// any) is applied before weights are normalized.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::InvalidCandidateTopN`] if `candidate_topn == 0`.
    /// - [`ConfigError::InvalidMmrLambda`] for a negative or non-finite λ.
    /// - [`ConfigError::InvalidWeight`] / [`ConfigError::AllZeroWeights`] from
    ///   normalization.
    /// - [`ConfigError::DuplicateProvider`] if two providers share a kind.
    /// - [`ConfigError::NoLiveProviders`] if none are available.
    pub fn new(
        config: &FusionConfig,
        providers: Vec<Arc<dyn SignalProvider>>,
    ) -> Result<Self, ConfigError> {
        if config.candidate_topn == 0 {
            return Err(ConfigError::InvalidCandidateTopN);
        }
        if !config.mmr_lambda.is_finite() || config.mmr_lambda < 0.0 {
            return Err(ConfigError::InvalidMmrLambda(config.mmr_lambda));
        }
        let weights = config.effective_weights().normalized()?;

        let mut seen = BTreeSet::new();
        for provider in &providers {
            if !seen.insert(provider.kind()) {
                return Err(ConfigError::DuplicateProvider(provider.kind()));
            }
        }

        let mut live = Vec::with_capacity(providers.len());
        for provider in providers {
            let kind = provider.kind();
            if provider.is_available() {
                live.push(LiveProvider::new(provider, config.timeout_for(kind)));
            } else {
                warn!(%kind, "signal provider unavailable; excluded from fusion");
            }
        }
        if live.is_empty() {
            return Err(ConfigError::NoLiveProviders);
        }
        live.sort_by_key(LiveProvider::kind);

        for (kind, weight) in weights.iter() {
            if weight > 0.0 && !live.iter().any(|p| p.kind() == kind) {
                warn!(
                    %kind,
                    weight,
                    "weighted signal has no live provider; top score is capped below 1.0"
                );
            }
        }

        let mmr = if config.mmr_lambda > 0.0 {
            let provider = live.iter().find(|p| p.kind() == config.mmr_signal).cloned();
            if provider.is_none() {
                warn!(
                    signal = %config.mmr_signal,
                    "MMR signal has no live provider; diversification disabled"
                );
            }
            provider.map(|provider| MmrSettings {
                lambda: config.mmr_lambda,
                provider,
            })
        } else {
            None
        };

        let aggregator = Aggregator::from_kind(config.aggregator, config.rrf_k);
        let fingerprint = fingerprint_of(
            &weights,
            aggregator,
            config.candidate_topn,
            mmr.as_ref(),
            &live,
        );

        info!(
            aggregator = %aggregator.kind(),
            live = ?live.iter().map(LiveProvider::kind).collect::<Vec<_>>(),
            candidate_topn = config.candidate_topn,
            mmr = mmr.is_some(),
            %fingerprint,
            "fusion engine ready"
        );

        Ok(Self {
            providers: live,
            weights,
            aggregator,
            candidate_topn: config.candidate_topn,
            max_in_flight: config.max_in_flight.max(1),
            mmr,
            fingerprint,
        })
    }

    #[must_use]
    pub const fn weights(&self) -> &NormalizedWeights {
        &self.weights
    }

    #[must_use]
    pub const fn aggregator(&self) -> Aggregator {
        self.aggregator
    }

    /// Kinds of the providers that passed the availability check.
    #[must_use]
    pub fn live_kinds(&self) -> Vec<SignalKind> {
        self.providers.iter().map(LiveProvider::kind).collect()
    }

    #[must_use]
    pub const fn is_diversifying(&self) -> bool {
        self.mmr.is_some()
    }

    /// Stable hash of everything that determines ranking: weights,
    /// aggregator, shortlist size, MMR settings, and the live kinds with
    /// their call deadlines.
    /// Callers that cache results key on it.
    #[must_use]
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// The `top_k` entities most similar to `query`, best first.
    ///
    /// Never fails: an unknown query, or one no live provider can shortlist,
    /// yields an empty list.
    #[instrument(skip(self), fields(aggregator = %self.aggregator.kind()))]
    pub async fn similar(&self, query: &str, top_k: usize) -> Vec<(Entity, f64)> {
        self.fuse(query, top_k)
            .await
            .into_iter()
            .map(|c| (c.entity, c.score))
            .collect()
    }

    /// Like [`similar`](Self::similar), with each result's present signals
    /// and per-signal ranks.
    #[instrument(skip(self), fields(aggregator = %self.aggregator.kind()))]
    pub async fn explain(&self, query: &str, top_k: usize) -> Vec<ScoredCandidate> {
        self.fuse(query, top_k).await
    }

    async fn fuse(&self, query: &str, top_k: usize) -> Vec<ScoredCandidate> {
        if top_k == 0 {
            return Vec::new();
        }

        let started = Instant::now();
        let candidates = generate_candidates(query, &self.providers, self.candidate_topn).await;
        if candidates.is_empty() {
            debug!("no candidates");
            return Vec::new();
        }

        let matrix = build_matrix(query, &candidates, &self.providers, self.max_in_flight).await;
        let fused = self.aggregator.aggregate(&matrix, &self.weights);

        let ranked = match &self.mmr {
            Some(mmr) => {
                let pool = rank(fused, top_k.saturating_mul(MMR_POOL_FACTOR));
                self.diversify(mmr, pool, top_k).await
            }
            None => rank(fused, top_k),
        };

        debug!(
            candidates = candidates.len(),
            returned = ranked.len(),
            elapsed_ms = started.elapsed().as_millis(),
            "query fused"
        );
        annotate(ranked, &matrix)
    }

    /// [`similar`](Self::similar), abandoned as soon as `cancel` fires.
    ///
    /// Returns `None` when cancelled. Outstanding provider calls are dropped.
    pub async fn similar_cancellable(
        &self,
        query: &str,
        top_k: usize,
        cancel: &CancellationToken,
    ) -> Option<Vec<(Entity, f64)>> {
        tokio::select! {
            biased;
            () = cancel.cancelled() => {
                debug!(query, "similarity query cancelled");
                None
            }
            ranked = self.similar(query, top_k) => Some(ranked),
        }
    }

    /// Entities most similar to a set of queries, by mean fused score.
    ///
    /// Candidates are the union of every query's shortlist, minus the
    /// queries. Each query that yields candidates scores the whole union;
    /// a candidate's final score is its mean over those queries. Duplicate
    /// queries count once.
    #[instrument(skip(self, queries), fields(queries = queries.len()))]
    pub async fn similar_multi(&self, queries: &[&str], top_k: usize) -> Vec<(Entity, f64)> {
        if top_k == 0 {
            return Vec::new();
        }
        let queries: BTreeSet<&str> = queries.iter().copied().collect();

        let shortlists = join_all(queries.iter().map(|q| async move {
            (*q, generate_candidates(q, &self.providers, self.candidate_topn).await)
        }))
        .await;

        let contributing: Vec<&str> = shortlists
            .iter()
            .filter(|(_, c)| !c.is_empty())
            .map(|(q, _)| *q)
            .collect();
        let union: BTreeSet<Entity> = shortlists
            .into_iter()
            .flat_map(|(_, c)| c)
            .filter(|c| !queries.contains(c.as_str()))
            .collect();
        if union.is_empty() {
            debug!("no candidates for any query");
            return Vec::new();
        }

        let per_query = join_all(contributing.iter().map(|q| {
            let union = &union;
            async move {
                let matrix = build_matrix(q, union, &self.providers, self.max_in_flight).await;
                self.aggregator.aggregate(&matrix, &self.weights)
            }
        }))
        .await;

        let mut totals: BTreeMap<Entity, f64> = BTreeMap::new();
        for fused in per_query {
            for (candidate, score) in fused {
                *totals.entry(candidate).or_default() += score;
            }
        }
        #[allow(clippy::cast_precision_loss)]
        let n = contributing.len() as f64;
        rank(totals.into_iter().map(|(c, s)| (c, s / n)), top_k)
    }

    async fn diversify(
        &self,
        mmr: &MmrSettings,
        pool: Vec<(Entity, f64)>,
        top_k: usize,
    ) -> Vec<(Entity, f64)> {
        let mut selector = MmrSelector::new(pool, mmr.lambda);
        while selector.selected_len() < top_k {
            let Some(last) = selector.select_next().map(str::to_string) else {
                break;
            };
            if selector.selected_len() == top_k {
                break;
            }
            let remaining: Vec<Entity> = selector.remaining().map(str::to_string).collect();
            let sims: Vec<(Entity, Option<f64>)> = stream::iter(remaining)
                .map(|candidate| {
                    let last = last.as_str();
                    async move {
                        let sim = mmr.provider.pairwise(&candidate, last).await;
                        (candidate, sim)
                    }
                })
                .buffer_unordered(self.max_in_flight)
                .map(|(candidate, sim)| {
                    let sim = match sim {
                        Ok(s) => s.and_then(crate::matrix::sanitize_score),
                        Err(err) => {
                            debug!(code = %err.code(), error = %err, "MMR similarity missing");
                            None
                        }
                    };
                    (candidate, sim)
                })
                .collect()
                .await;
            for (candidate, sim) in sims {
                // Unscorable pairs count as not redundant.
                selector.observe(&candidate, sim.unwrap_or(0.0));
            }
        }
        selector.into_selected()
    }
}

fn annotate(ranked: Vec<(Entity, f64)>, matrix: &SignalMatrix) -> Vec<ScoredCandidate> {
    let ranks = signal_ranks(matrix);
    ranked
        .into_iter()
        .map(|(entity, score)| {
            let signals = matrix.signals(&entity).cloned().unwrap_or_default();
            let per_kind = ranks
                .iter()
                .filter_map(|(kind, by_candidate)| {
                    by_candidate.get(&entity).map(|rank| (*kind, *rank))
                })
                .collect();
            ScoredCandidate {
                entity,
                score,
                signals,
                ranks: per_kind,
            }
        })
        .collect()
}

fn fingerprint_of(
    weights: &NormalizedWeights,
    aggregator: Aggregator,
    candidate_topn: usize,
    mmr: Option<&MmrSettings>,
    live: &[LiveProvider],
) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(b"cardsim-fusion/v1\0");
    for (kind, weight) in weights.iter() {
        hasher.update(kind.as_str().as_bytes());
        hasher.update(&weight.to_le_bytes());
    }
    hasher.update(b"\0");
    hasher.update(aggregator.kind().as_str().as_bytes());
    if let Aggregator::Rrf { k } = aggregator {
        hasher.update(&(k as u64).to_le_bytes());
    }
    hasher.update(&(candidate_topn as u64).to_le_bytes());
    if let Some(mmr) = mmr {
        hasher.update(b"mmr");
        hasher.update(&mmr.lambda.to_le_bytes());
        hasher.update(mmr.provider.kind().as_str().as_bytes());
    }
    hasher.update(b"\0");
    // Deadlines decide which signals arrive, so they are part of the key.
    for provider in live {
        hasher.update(provider.kind().as_str().as_bytes());
        let timeout_ms = u64::try_from(provider.timeout().as_millis()).unwrap_or(u64::MAX);
        hasher.update(&timeout_ms.to_le_bytes());
        hasher.update(b",");
    }
    hasher.finalize().to_hex().to_string()
}
