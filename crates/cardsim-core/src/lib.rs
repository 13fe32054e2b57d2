#![forbid(unsafe_code)]
//! cardsim-core library.
//!
//! Shared vocabulary for the fusion engine: the six [`SignalKind`]s, the
//! async [`SignalProvider`] contract every modality implements, weight sets
//! and task profiles, and the TOML-backed [`FusionConfig`].
//!
//! # Conventions
//!
//! - **Errors**: typed [`ConfigError`] for construction-time failures,
//!   `anyhow::Result` at I/O boundaries and for provider faults.
//! - **Logging**: Use `tracing` macros (`info!`, `warn!`, `error!`, `debug!`, `trace!`).

pub mod config;
pub mod error;
pub mod kind;
pub mod provider;
pub mod weights;

pub use config::{
    AggregatorKind, FusionConfig, load_config_in, load_default_config, load_fusion_config,
};
pub use error::{ConfigError, ErrorCode};
pub use kind::SignalKind;
pub use provider::{Entity, SignalProvider};
pub use weights::{NormalizedWeights, TaskProfile, WeightSet};
