//! Graceful degradation of the fusion engine.
//!
//! Verifies that queries keep answering when providers misbehave.
//!
//! # Scenarios covered
//!
//! 1. **Timeout**: a provider slower than its deadline is treated as absent;
//!    the query finishes near the deadline, not the provider's latency.
//! 2. **Fault**: a provider that errors on every call is treated as absent.
//! 3. **Unavailable at construction**: excluded up front, never called.
//! 4. **Non-finite scores**: NaN is dropped, out-of-range values clamped.
//! 5. **Per-kind deadline overrides**.
//! 6. **Cancellation**: a fired token abandons the query.
//! 7. **Everything down**: an empty result, not an error.
//! 8. **Score-only provider**: contributes pairwise scores without shortlists.

mod support;

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use cardsim_core::{FusionConfig, SignalKind, SignalProvider, WeightSet};
use cardsim_fusion::FusionEngine;
use support::{ScriptedProvider, assert_approx_eq, init_tracing, names, shared};
use tokio_util::sync::CancellationToken;

fn config(weights: &[(SignalKind, f64)], timeout_ms: u64) -> FusionConfig {
    FusionConfig {
        weights: WeightSet::from_pairs(weights.iter().copied()),
        provider_timeout_ms: timeout_ms,
        ..FusionConfig::default()
    }
}

fn graph_and_text() -> (ScriptedProvider, ScriptedProvider) {
    let graph = ScriptedProvider::new(SignalKind::Graph)
        .score("Q", "A", 0.6)
        .score("Q", "B", 0.3);
    let text = ScriptedProvider::new(SignalKind::Text)
        .score("Q", "A", 0.2)
        .score("Q", "B", 0.8);
    (graph, text)
}

#[tokio::test(start_paused = true)]
async fn slow_provider_is_treated_as_absent() {
    init_tracing();
    let (graph, text) = graph_and_text();
    let text = text.delayed(Duration::from_secs(30));
    let engine = FusionEngine::new(
        &config(&[(SignalKind::Graph, 0.5), (SignalKind::Text, 0.5)], 100),
        vec![shared(graph), shared(text)],
    )
    .expect("valid engine");

    let started = tokio::time::Instant::now();
    let ranked = engine.similar("Q", 10).await;
    let elapsed = started.elapsed();

    assert_eq!(names(&ranked), vec!["A", "B"]);
    assert_approx_eq(ranked[0].1, 0.3);
    assert_approx_eq(ranked[1].1, 0.15);
    // One deadline for shortlists, one for the (concurrent) pairwise fan-out.
    assert!(elapsed < Duration::from_secs(1), "took {elapsed:?}");
}

#[tokio::test]
async fn faulty_provider_is_treated_as_absent() {
    init_tracing();
    let (graph, text) = graph_and_text();
    let engine = FusionEngine::new(
        &config(&[(SignalKind::Graph, 0.5), (SignalKind::Text, 0.5)], 1_000),
        vec![shared(graph), shared(text.failing())],
    )
    .expect("valid engine");

    let explained = engine.explain("Q", 10).await;
    assert_eq!(explained.len(), 2);
    for candidate in &explained {
        assert!(!candidate.signals.contains_key(&SignalKind::Text));
    }
    assert_approx_eq(explained[0].score, 0.3);
}

#[tokio::test]
async fn unavailable_provider_is_never_called() {
    let (graph, text) = graph_and_text();
    let text = Arc::new(text.unavailable());
    let text_dyn: Arc<dyn SignalProvider> = text.clone();
    let engine = FusionEngine::new(
        &config(&[(SignalKind::Graph, 0.5), (SignalKind::Text, 0.5)], 1_000),
        vec![shared(graph), text_dyn],
    )
    .expect("graph alone is enough");

    assert_eq!(engine.live_kinds(), vec![SignalKind::Graph]);
    let ranked = engine.similar("Q", 10).await;
    assert_eq!(names(&ranked), vec!["A", "B"]);
    assert_eq!(text.calls(), 0);
}

#[tokio::test]
async fn non_finite_scores_are_dropped_and_others_clamped() {
    let graph = ScriptedProvider::new(SignalKind::Graph)
        .score("Q", "A", f64::NAN)
        .score("Q", "B", 1.5)
        .score("Q", "C", -0.25);
    let engine =
        FusionEngine::new(&config(&[(SignalKind::Graph, 1.0)], 1_000), vec![shared(graph)])
            .expect("valid engine");

    let explained = engine.explain("Q", 10).await;
    let by_entity: BTreeMap<&str, _> = explained
        .iter()
        .map(|c| (c.entity.as_str(), c))
        .collect();

    assert!(by_entity["A"].signals.is_empty());
    assert_approx_eq(by_entity["A"].score, 0.0);
    assert_approx_eq(by_entity["B"].score, 1.0);
    assert_eq!(by_entity["C"].signals.get(&SignalKind::Graph), Some(&0.0));
    assert_eq!(explained[0].entity, "B");
}

#[tokio::test(start_paused = true)]
async fn per_kind_deadline_override() {
    let (graph, text) = graph_and_text();
    let text = text.delayed(Duration::from_millis(500));
    let mut cfg = config(&[(SignalKind::Graph, 0.5), (SignalKind::Text, 0.5)], 100);
    cfg.timeouts.insert(SignalKind::Text, 2_000);
    let engine =
        FusionEngine::new(&cfg, vec![shared(graph), shared(text)]).expect("valid engine");

    // Text answers within its own deadline, so it still contributes.
    let explained = engine.explain("Q", 10).await;
    assert_eq!(explained[0].entity, "B");
    assert_approx_eq(explained[0].score, 0.55);
    assert!(explained[0].signals.contains_key(&SignalKind::Text));
}

#[tokio::test(start_paused = true)]
async fn cancellation_abandons_the_query() {
    let (graph, _) = graph_and_text();
    let graph = graph.delayed(Duration::from_secs(5));
    let engine = FusionEngine::new(
        &config(&[(SignalKind::Graph, 1.0)], 60_000),
        vec![shared(graph)],
    )
    .expect("valid engine");

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(10)).await;
        trigger.cancel();
    });

    let started = tokio::time::Instant::now();
    let outcome = engine.similar_cancellable("Q", 10, &cancel).await;
    assert_eq!(outcome, None);
    assert!(started.elapsed() < Duration::from_secs(5));

    // An untouched token lets the query run to completion.
    let fresh = CancellationToken::new();
    let completed = engine
        .similar_cancellable("Q", 10, &fresh)
        .await
        .expect("not cancelled");
    assert_eq!(names(&completed), vec!["A", "B"]);
}

#[tokio::test]
async fn everything_down_yields_empty() {
    let (graph, text) = graph_and_text();
    let engine = FusionEngine::new(
        &config(&[(SignalKind::Graph, 0.5), (SignalKind::Text, 0.5)], 1_000),
        vec![shared(graph.failing()), shared(text.failing())],
    )
    .expect("providers are live, just faulty");

    assert!(engine.similar("Q", 10).await.is_empty());
}

#[tokio::test]
async fn score_only_provider_still_contributes() {
    // Text never shortlists anything but still scores pairs.
    let graph = ScriptedProvider::new(SignalKind::Graph).score("Q", "A", 0.4);
    let text = ScriptedProvider::new(SignalKind::Text).pair_only("Q", "A", 1.0);
    let engine = FusionEngine::new(
        &config(&[(SignalKind::Graph, 0.5), (SignalKind::Text, 0.5)], 1_000),
        vec![shared(graph), shared(text)],
    )
    .expect("valid engine");

    let ranked = engine.similar("Q", 10).await;
    assert_eq!(names(&ranked), vec!["A"]);
    assert_approx_eq(ranked[0].1, 0.7);
}
