use std::sync::Arc;

use anyhow::{Result, bail};
use async_trait::async_trait;
use cardsim_core::{Entity, SignalKind, SignalProvider};
use tracing::trace;

use super::space::EmbeddingSpace;
use crate::similarity::{cosine_similarity, cosine_to_unit};

/// Turns a card's side data (oracle text, image URL) into a vector.
///
/// `Ok(None)` means the side data is missing for that card (no image URL, no
/// oracle text) and the card is unscorable for this signal. `Err` is a fault
/// such as a failed image fetch.
#[async_trait]
pub trait SideDataEmbedder: Send + Sync {
    async fn embed(&self, card: &str) -> Result<Option<Vec<f32>>>;
}

/// A precomputed space doubles as an embedder: lookup only.
#[async_trait]
impl SideDataEmbedder for EmbeddingSpace {
    async fn embed(&self, card: &str) -> Result<Option<Vec<f32>>> {
        Ok(self.get(card).map(<[f32]>::to_vec))
    }
}

/// Text or visual signal over a [`SideDataEmbedder`].
///
/// Shortlists come from an optional precomputed index. Without one the
/// provider only scores pairs and contributes no candidates, which keeps slow
/// embedders (remote image models) out of candidate generation.
pub struct SideDataProvider {
    kind: SignalKind,
    embedder: Arc<dyn SideDataEmbedder>,
    index: Option<Arc<EmbeddingSpace>>,
    available: bool,
}

impl SideDataProvider {
    /// # Errors
    ///
    /// Fails unless `kind` is [`SignalKind::Text`] or [`SignalKind::Visual`].
    pub fn new(kind: SignalKind, embedder: Arc<dyn SideDataEmbedder>) -> Result<Self> {
        if !matches!(kind, SignalKind::Text | SignalKind::Visual) {
            bail!("side-data provider must be text or visual, got `{kind}`");
        }
        Ok(Self {
            kind,
            embedder,
            index: None,
            available: true,
        })
    }

    #[must_use]
    pub fn text(embedder: Arc<dyn SideDataEmbedder>) -> Self {
        Self {
            kind: SignalKind::Text,
            embedder,
            index: None,
            available: true,
        }
    }

    #[must_use]
    pub fn visual(embedder: Arc<dyn SideDataEmbedder>) -> Self {
        Self {
            kind: SignalKind::Visual,
            embedder,
            index: None,
            available: true,
        }
    }

    /// Attach a precomputed index used for shortlists.
    #[must_use]
    pub fn with_index(mut self, index: Arc<EmbeddingSpace>) -> Self {
        self.index = Some(index);
        self
    }

    /// Mark the provider unavailable (e.g. the embedding model failed to load).
    #[must_use]
    pub const fn unavailable(mut self) -> Self {
        self.available = false;
        self
    }
}

#[async_trait]
impl SignalProvider for SideDataProvider {
    fn kind(&self) -> SignalKind {
        self.kind
    }

    fn is_available(&self) -> bool {
        self.available
    }

    async fn top_n(&self, entity: &str, n: usize) -> Result<Vec<(Entity, f64)>> {
        Ok(self
            .index
            .as_ref()
            .map(|index| index.most_similar(entity, n))
            .unwrap_or_default())
    }

    async fn pairwise(&self, a: &str, b: &str) -> Result<Option<f64>> {
        let (va, vb) = futures::try_join!(self.embedder.embed(a), self.embedder.embed(b))?;
        let (Some(va), Some(vb)) = (va, vb) else {
            trace!(kind = %self.kind, a, b, "side data missing");
            return Ok(None);
        };
        Ok(cosine_similarity(&va, &vb).map(cosine_to_unit))
    }
}
