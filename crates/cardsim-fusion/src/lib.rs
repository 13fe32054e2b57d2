#![forbid(unsafe_code)]
//! cardsim-fusion library.
//!
//! Late fusion of card similarity signals. Each [`SignalProvider`] scores
//! cards on its own modality; [`FusionEngine`] shortlists candidates from
//! every live provider, collects a sparse [`SignalMatrix`] of pairwise
//! scores, fuses it with the configured [`Aggregator`], and returns the top
//! entities.
//!
//! Provider faults and timeouts degrade a query (the affected entries are
//! treated as absent) but never fail it.
//!
//! [`SignalProvider`]: cardsim_core::SignalProvider

pub mod aggregate;
pub mod call;
pub mod candidates;
pub mod diversify;
pub mod engine;
pub mod matrix;
pub mod rank;

pub use aggregate::{Aggregator, rrf_scores, signal_ranks, weighted_score};
pub use call::{CallError, LiveProvider};
pub use candidates::generate_candidates;
pub use diversify::MmrSelector;
pub use engine::FusionEngine;
pub use matrix::{SignalMatrix, build_matrix, sanitize_score};
pub use rank::{ScoredCandidate, rank};
