use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use cardsim_core::{Entity, SignalKind, SignalProvider};

use super::space::{EmbeddingError, EmbeddingSpace};

/// Provider over a precomputed [`EmbeddingSpace`].
///
/// Used for the structural (random-walk) and GNN spaces, and for text or
/// visual spaces that were embedded ahead of time.
#[derive(Debug, Clone)]
pub struct EmbeddingProvider {
    kind: SignalKind,
    space: Arc<EmbeddingSpace>,
}

impl EmbeddingProvider {
    /// # Errors
    ///
    /// [`EmbeddingError::NotAnEmbeddingKind`] for graph or tag kinds.
    pub fn new(kind: SignalKind, space: Arc<EmbeddingSpace>) -> Result<Self, EmbeddingError> {
        if !kind.is_embedding() {
            return Err(EmbeddingError::NotAnEmbeddingKind(kind));
        }
        Ok(Self { kind, space })
    }

    #[must_use]
    pub const fn structural(space: Arc<EmbeddingSpace>) -> Self {
        Self {
            kind: SignalKind::Structural,
            space,
        }
    }

    #[must_use]
    pub const fn gnn(space: Arc<EmbeddingSpace>) -> Self {
        Self {
            kind: SignalKind::Gnn,
            space,
        }
    }

    #[must_use]
    pub fn space(&self) -> &EmbeddingSpace {
        &self.space
    }
}

#[async_trait]
impl SignalProvider for EmbeddingProvider {
    fn kind(&self) -> SignalKind {
        self.kind
    }

    fn is_available(&self) -> bool {
        !self.space.is_empty()
    }

    async fn top_n(&self, entity: &str, n: usize) -> Result<Vec<(Entity, f64)>> {
        Ok(self.space.most_similar(entity, n))
    }

    async fn pairwise(&self, a: &str, b: &str) -> Result<Option<f64>> {
        Ok(self.space.similarity(a, b))
    }
}
