//! The contract every similarity modality implements.

use anyhow::Result;
use async_trait::async_trait;

use crate::kind::SignalKind;

/// Opaque entity identifier (a card name). Only identity and ordering matter.
pub type Entity = String;

/// One modality's similarity source.
///
/// Providers normalize their native score (cosine, Jaccard ratio, ...) into
/// `[0, 1]`. "Cannot score" is `Ok(None)`, never an error: a card without an
/// image URL or without extractable tags is simply absent for that signal.
/// `Err` is reserved for faults (I/O, remote failures), which the engine logs
/// and then treats exactly like absence.
#[async_trait]
pub trait SignalProvider: Send + Sync {
    /// Which modality this provider serves.
    fn kind(&self) -> SignalKind;

    /// Whether the backing data could be loaded.
    ///
    /// Consulted once when the engine is constructed; an unavailable provider
    /// is excluded for the engine's whole lifetime.
    fn is_available(&self) -> bool {
        true
    }

    /// The provider's own shortlist for `entity`, best first.
    ///
    /// Unknown entities yield an empty list. The list may include `entity`
    /// itself; callers exclude it.
    async fn top_n(&self, entity: &str, n: usize) -> Result<Vec<(Entity, f64)>>;

    /// Pairwise similarity in `[0, 1]`, or `None` when the pair is not measurable.
    async fn pairwise(&self, a: &str, b: &str) -> Result<Option<f64>>;
}
