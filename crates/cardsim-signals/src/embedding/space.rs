use std::collections::HashMap;

use cardsim_core::{Entity, SignalKind};

use crate::similarity::{cosine_similarity, cosine_to_unit};

/// Errors raised while assembling an embedding space.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EmbeddingError {
    #[error("embedding dimension mismatch for `{card}`: expected {expected}, got {actual}")]
    DimensionMismatch {
        card: Entity,
        expected: usize,
        actual: usize,
    },

    #[error("embedding dimension must be positive")]
    ZeroDimension,

    #[error("signal kind `{0}` is not served by an embedding space")]
    NotAnEmbeddingKind(SignalKind),
}

/// Fixed-dimension vectors keyed by card id.
///
/// The vectors come from an external training job; this type only validates
/// shape and answers cosine queries.
#[derive(Debug, Clone)]
pub struct EmbeddingSpace {
    dim: usize,
    vectors: HashMap<Entity, Vec<f32>>,
}

impl EmbeddingSpace {
    /// # Errors
    ///
    /// [`EmbeddingError::ZeroDimension`] if `dim == 0`.
    pub fn new(dim: usize) -> Result<Self, EmbeddingError> {
        if dim == 0 {
            return Err(EmbeddingError::ZeroDimension);
        }
        Ok(Self {
            dim,
            vectors: HashMap::new(),
        })
    }

    /// Build a space from `(card, vector)` pairs.
    ///
    /// # Errors
    ///
    /// Fails on the first vector whose length differs from `dim`.
    pub fn from_vectors<I, K>(dim: usize, vectors: I) -> Result<Self, EmbeddingError>
    where
        I: IntoIterator<Item = (K, Vec<f32>)>,
        K: Into<Entity>,
    {
        let mut space = Self::new(dim)?;
        for (card, vector) in vectors {
            space.insert(card.into(), vector)?;
        }
        Ok(space)
    }

    /// Insert or replace a card's vector.
    ///
    /// # Errors
    ///
    /// [`EmbeddingError::DimensionMismatch`] if the vector has the wrong length.
    pub fn insert(&mut self, card: Entity, vector: Vec<f32>) -> Result<(), EmbeddingError> {
        if vector.len() != self.dim {
            return Err(EmbeddingError::DimensionMismatch {
                card,
                expected: self.dim,
                actual: vector.len(),
            });
        }
        self.vectors.insert(card, vector);
        Ok(())
    }

    #[must_use]
    pub const fn dim(&self) -> usize {
        self.dim
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    #[must_use]
    pub fn contains(&self, card: &str) -> bool {
        self.vectors.contains_key(card)
    }

    #[must_use]
    pub fn get(&self, card: &str) -> Option<&[f32]> {
        self.vectors.get(card).map(Vec::as_slice)
    }

    /// Cosine mapped to `[0, 1]`; `None` if either card is missing or has a
    /// zero vector.
    #[must_use]
    pub fn similarity(&self, a: &str, b: &str) -> Option<f64> {
        let va = self.vectors.get(a)?;
        let vb = self.vectors.get(b)?;
        cosine_similarity(va, vb).map(cosine_to_unit)
    }

    /// Brute-force nearest neighbours of `card`, best first, ties by id,
    /// excluding `card` itself.
    #[must_use]
    pub fn most_similar(&self, card: &str, n: usize) -> Vec<(Entity, f64)> {
        let Some(query) = self.vectors.get(card) else {
            return Vec::new();
        };
        if n == 0 {
            return Vec::new();
        }

        let mut scored: Vec<(Entity, f64)> = self
            .vectors
            .iter()
            .filter(|(other, _)| other.as_str() != card)
            .filter_map(|(other, v)| {
                cosine_similarity(query, v).map(|c| (other.clone(), cosine_to_unit(c)))
            })
            .collect();

        scored.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        scored.truncate(n);
        scored
    }
}
