//! Scripted providers for engine integration tests.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use anyhow::{Result, bail};
use async_trait::async_trait;
use cardsim_core::{Entity, SignalKind, SignalProvider};

/// Route engine logs to the test harness. `RUST_LOG=debug cargo test` to see them.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// A provider whose answers are fixed up front.
///
/// `score(a, b, s)` makes the pair score `s` in both directions and puts
/// each card on the other's shortlist.
pub struct ScriptedProvider {
    kind: SignalKind,
    available: bool,
    fail: bool,
    delay: Option<Duration>,
    pairs: HashMap<(String, String), f64>,
    shortlists: HashMap<String, Vec<(Entity, f64)>>,
    calls: AtomicUsize,
}

impl ScriptedProvider {
    pub fn new(kind: SignalKind) -> Self {
        Self {
            kind,
            available: true,
            fail: false,
            delay: None,
            pairs: HashMap::new(),
            shortlists: HashMap::new(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn score(mut self, a: &str, b: &str, s: f64) -> Self {
        self.pairs.insert((a.to_string(), b.to_string()), s);
        self.pairs.insert((b.to_string(), a.to_string()), s);
        self.shortlists
            .entry(a.to_string())
            .or_default()
            .push((b.to_string(), s));
        self.shortlists
            .entry(b.to_string())
            .or_default()
            .push((a.to_string(), s));
        self
    }

    /// Score a pair without adding either card to the other's shortlist.
    pub fn pair_only(mut self, a: &str, b: &str, s: f64) -> Self {
        self.pairs.insert((a.to_string(), b.to_string()), s);
        self.pairs.insert((b.to_string(), a.to_string()), s);
        self
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    pub fn unavailable(mut self) -> Self {
        self.available = false;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    async fn respond(&self) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail {
            bail!("{} provider is down", self.kind);
        }
        Ok(())
    }
}

#[async_trait]
impl SignalProvider for ScriptedProvider {
    fn kind(&self) -> SignalKind {
        self.kind
    }

    fn is_available(&self) -> bool {
        self.available
    }

    async fn top_n(&self, entity: &str, n: usize) -> Result<Vec<(Entity, f64)>> {
        self.respond().await?;
        let mut shortlist = self.shortlists.get(entity).cloned().unwrap_or_default();
        shortlist.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        shortlist.truncate(n);
        Ok(shortlist)
    }

    async fn pairwise(&self, a: &str, b: &str) -> Result<Option<f64>> {
        self.respond().await?;
        Ok(self.pairs.get(&(a.to_string(), b.to_string())).copied())
    }
}

pub fn shared(provider: ScriptedProvider) -> Arc<dyn SignalProvider> {
    Arc::new(provider)
}

pub fn names(ranked: &[(Entity, f64)]) -> Vec<&str> {
    ranked.iter().map(|(c, _)| c.as_str()).collect()
}

pub fn assert_approx_eq(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() <= 1e-9,
        "actual ({actual}) != expected ({expected})"
    );
}
