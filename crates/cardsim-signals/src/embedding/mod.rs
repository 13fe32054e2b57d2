//! Vector-space signals.
//!
//! - [`EmbeddingProvider`]: trained spaces keyed by card id (random-walk
//!   structural embeddings, GNN embeddings).
//! - [`SideDataProvider`]: vectors derived from per-card side data (oracle
//!   text, card art) that may be missing for any given card.

mod provider;
mod side_data;
mod space;

pub use provider::EmbeddingProvider;
pub use side_data::{SideDataEmbedder, SideDataProvider};
pub use space::{EmbeddingError, EmbeddingSpace};
