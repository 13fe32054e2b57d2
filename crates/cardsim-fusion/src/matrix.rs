//! The sparse per-candidate, per-signal score matrix.
//!
//! An absent entry means the provider could not score the pair (unknown
//! card, missing side data, fault, timeout). It is never stored as `0.0`:
//! aggregators skip absent entries, while a present `0.0` takes part in
//! rank computation.
//!
//! Rows hold scores clamped to `[0, 1]` for magnitude-based fusion. The
//! provider's raw finite score is kept per kind as well, so rank-based
//! fusion sees the provider's own order even when its scale overshoots.

use std::collections::{BTreeMap, BTreeSet};

use cardsim_core::{Entity, SignalKind};
use futures::stream::{self, StreamExt};
use tracing::{debug, warn};

use crate::call::{CallError, LiveProvider};

/// Scores keyed by candidate, then by signal kind.
///
/// Every candidate has a row, possibly empty.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SignalMatrix {
    rows: BTreeMap<Entity, BTreeMap<SignalKind, f64>>,
    raw: BTreeMap<SignalKind, BTreeMap<Entity, f64>>,
}

impl SignalMatrix {
    /// A matrix with an empty row per candidate.
    pub fn with_candidates<I>(candidates: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Entity>,
    {
        Self {
            rows: candidates
                .into_iter()
                .map(|c| (c.into(), BTreeMap::new()))
                .collect(),
            raw: BTreeMap::new(),
        }
    }

    /// Record `kind`'s score for `candidate`.
    ///
    /// Non-finite scores are dropped. Finite ones are stored clamped to
    /// `[0, 1]`, and unclamped for ranking. Returns whether an entry was
    /// stored.
    pub fn insert(&mut self, candidate: &str, kind: SignalKind, score: f64) -> bool {
        let Some(clamped) = sanitize_score(score) else {
            return false;
        };
        self.rows
            .entry(candidate.to_string())
            .or_default()
            .insert(kind, clamped);
        self.raw
            .entry(kind)
            .or_default()
            .insert(candidate.to_string(), score);
        true
    }

    #[must_use]
    pub fn get(&self, candidate: &str, kind: SignalKind) -> Option<f64> {
        self.rows.get(candidate)?.get(&kind).copied()
    }

    /// All present signals for `candidate`.
    #[must_use]
    pub fn signals(&self, candidate: &str) -> Option<&BTreeMap<SignalKind, f64>> {
        self.rows.get(candidate)
    }

    pub fn rows(&self) -> impl Iterator<Item = (&str, &BTreeMap<SignalKind, f64>)> {
        self.rows.iter().map(|(c, row)| (c.as_str(), row))
    }

    pub fn candidates(&self) -> impl Iterator<Item = &str> {
        self.rows.keys().map(String::as_str)
    }

    /// Present `(candidate, score)` entries for one kind, in candidate order.
    #[must_use]
    pub fn column(&self, kind: SignalKind) -> Vec<(&str, f64)> {
        self.rows
            .iter()
            .filter_map(|(c, row)| row.get(&kind).map(|s| (c.as_str(), *s)))
            .collect()
    }

    /// Present `(candidate, raw score)` entries for one kind, unclamped, in
    /// candidate order. This is what per-kind ranks are computed from.
    #[must_use]
    pub fn raw_column(&self, kind: SignalKind) -> Vec<(&str, f64)> {
        self.raw
            .get(&kind)
            .map(|col| col.iter().map(|(c, s)| (c.as_str(), *s)).collect())
            .unwrap_or_default()
    }

    /// Number of candidates with a present entry for `kind`.
    #[must_use]
    pub fn coverage(&self, kind: SignalKind) -> usize {
        self.rows.values().filter(|row| row.contains_key(&kind)).count()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Drop NaN and infinities, clamp the rest into `[0, 1]`.
#[must_use]
pub fn sanitize_score(raw: f64) -> Option<f64> {
    raw.is_finite().then(|| raw.clamp(0.0, 1.0))
}

async fn pairwise_call<'a>(
    provider: &LiveProvider,
    query: &str,
    candidate: &'a Entity,
) -> (SignalKind, &'a str, Result<Option<f64>, CallError>) {
    let score = provider.pairwise(query, candidate).await;
    (provider.kind(), candidate.as_str(), score)
}

/// Fill the matrix for `query` against every candidate, one pairwise call
/// per `(provider, candidate)`, at most `max_in_flight` outstanding at once.
///
/// Faults and timeouts leave the entry absent and are summarized per
/// provider at `warn` level.
pub async fn build_matrix(
    query: &str,
    candidates: &BTreeSet<Entity>,
    providers: &[LiveProvider],
    max_in_flight: usize,
) -> SignalMatrix {
    let calls: Vec<(&LiveProvider, &Entity)> = providers
        .iter()
        .flat_map(|provider| candidates.iter().map(move |candidate| (provider, candidate)))
        .collect();

    let calls: Vec<_> = calls
        .into_iter()
        .map(|(provider, candidate)| pairwise_call(provider, query, candidate))
        .collect();

    let results: Vec<_> = stream::iter(calls)
        .buffer_unordered(max_in_flight.max(1))
        .collect()
        .await;

    let mut matrix = SignalMatrix::with_candidates(candidates.iter().cloned());
    let mut failures: BTreeMap<SignalKind, (usize, Option<String>)> = BTreeMap::new();
    for (kind, candidate, score) in results {
        match score {
            Ok(Some(score)) => {
                if !matrix.insert(candidate, kind, score) {
                    debug!(%kind, candidate, score, "dropped non-finite score");
                }
            }
            Ok(None) => {}
            Err(err) => {
                debug!(%kind, candidate, code = %err.code(), error = %err, "pairwise call failed");
                let entry = failures.entry(kind).or_default();
                entry.0 += 1;
                entry.1.get_or_insert_with(|| format!("{err} ({})", err.code()));
            }
        }
    }

    for (kind, (count, first)) in failures {
        warn!(
            %kind,
            failed = count,
            candidates = candidates.len(),
            first_error = first.as_deref().unwrap_or_default(),
            "pairwise scores missing; treated as absent"
        );
    }
    matrix
}
