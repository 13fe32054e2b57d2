//! Deadline-bounded provider calls.
//!
//! Every provider call the engine makes goes through [`LiveProvider`], which
//! wraps it in a per-kind deadline. A fault or a missed deadline surfaces as
//! [`CallError`]; callers log it and treat the value as absent.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use cardsim_core::{Entity, ErrorCode, SignalKind, SignalProvider};

/// Why a provider call produced no value.
#[derive(Debug, thiserror::Error)]
pub enum CallError {
    #[error("provider fault: {0:#}")]
    Fault(anyhow::Error),

    #[error("no answer within {0:?}")]
    Timeout(Duration),
}

impl CallError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Fault(_) => ErrorCode::ProviderFault,
            Self::Timeout(_) => ErrorCode::ProviderTimeout,
        }
    }
}

/// A provider that passed the availability check, with its call deadline.
#[derive(Clone)]
pub struct LiveProvider {
    kind: SignalKind,
    timeout: Duration,
    inner: Arc<dyn SignalProvider>,
}

impl std::fmt::Debug for LiveProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveProvider")
            .field("kind", &self.kind)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl LiveProvider {
    #[must_use]
    pub fn new(inner: Arc<dyn SignalProvider>, timeout: Duration) -> Self {
        Self {
            kind: inner.kind(),
            timeout,
            inner,
        }
    }

    #[must_use]
    pub const fn kind(&self) -> SignalKind {
        self.kind
    }

    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Shortlist for `entity`, at most `n` entries.
    ///
    /// # Errors
    ///
    /// [`CallError`] if the provider faults or misses its deadline.
    pub async fn top_n(&self, entity: &str, n: usize) -> Result<Vec<(Entity, f64)>, CallError> {
        let mut shortlist = self.bounded(self.inner.top_n(entity, n)).await?;
        shortlist.truncate(n);
        Ok(shortlist)
    }

    /// Pairwise score, `Ok(None)` when the provider cannot score the pair.
    ///
    /// # Errors
    ///
    /// [`CallError`] if the provider faults or misses its deadline.
    pub async fn pairwise(&self, a: &str, b: &str) -> Result<Option<f64>, CallError> {
        self.bounded(self.inner.pairwise(a, b)).await
    }

    async fn bounded<T>(
        &self,
        call: impl Future<Output = anyhow::Result<T>> + Send,
    ) -> Result<T, CallError> {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(err)) => Err(CallError::Fault(err)),
            Err(_) => Err(CallError::Timeout(self.timeout)),
        }
    }
}
