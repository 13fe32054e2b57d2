#![forbid(unsafe_code)]
//! cardsim-signals library.
//!
//! Concrete [`SignalProvider`](cardsim_core::SignalProvider)s for the six
//! signal kinds. Every provider here is backed by data handed to it at
//! construction (a co-occurrence graph, a trained vector space, a tag index,
//! a side-data embedder); none of them trains or loads anything itself.
//!
//! # Conventions
//!
//! - **Errors**: Use `anyhow::Result` for provider calls, typed errors for
//!   data validation.
//! - **Logging**: Use `tracing` macros (`info!`, `warn!`, `error!`, `debug!`, `trace!`).

pub mod embedding;
pub mod graph;
pub mod similarity;
pub mod tags;

pub use embedding::{
    EmbeddingError, EmbeddingProvider, EmbeddingSpace, SideDataEmbedder, SideDataProvider,
};
pub use graph::{CooccurrenceGraph, GraphJaccardProvider};
pub use similarity::{cosine_similarity, cosine_to_unit, jaccard};
pub use tags::{FunctionalTagProvider, TagIndex};
