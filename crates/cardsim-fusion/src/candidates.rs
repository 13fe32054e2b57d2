//! Candidate generation: the union of every live provider's shortlist.

use std::collections::BTreeSet;

use cardsim_core::Entity;
use futures::future::join_all;
use tracing::{debug, warn};

use crate::call::LiveProvider;

/// Ask every provider for its top `candidate_topn` neighbours of `query`
/// concurrently and return the union, minus `query` itself.
///
/// A provider that faults or misses its deadline contributes nothing; the
/// others still do. The result holds at most
/// `providers.len() * candidate_topn` entities.
pub async fn generate_candidates(
    query: &str,
    providers: &[LiveProvider],
    candidate_topn: usize,
) -> BTreeSet<Entity> {
    let shortlists = join_all(providers.iter().map(|provider| async move {
        (provider.kind(), provider.top_n(query, candidate_topn).await)
    }))
    .await;

    let mut candidates = BTreeSet::new();
    for (kind, shortlist) in shortlists {
        match shortlist {
            Ok(entries) => {
                debug!(%kind, count = entries.len(), "provider shortlist");
                candidates.extend(
                    entries
                        .into_iter()
                        .map(|(entity, _)| entity)
                        .filter(|entity| entity != query),
                );
            }
            Err(err) => {
                warn!(
                    %kind,
                    code = %err.code(),
                    error = %err,
                    "candidate generation skipped provider"
                );
            }
        }
    }
    candidates
}
