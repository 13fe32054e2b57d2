//! Co-occurrence graph and the neighbour-set Jaccard signal.
//!
//! # Overview
//!
//! Two cards co-occur when they appear in the same deck. The graph is
//! undirected; edge weights count co-occurrences. The signal between two
//! cards is the Jaccard similarity of their neighbour sets:
//!
//! ```text
//! sim(a, b) = |N(a) ∩ N(b)| / |N(a) ∪ N(b)|
//! ```
//!
//! Two cards that are played *alongside the same things* score high even if
//! they are rarely played together (they are often substitutes).

use std::collections::{BTreeMap, HashMap, HashSet};

use anyhow::Result;
use async_trait::async_trait;
use cardsim_core::{Entity, SignalKind, SignalProvider};
use petgraph::graph::{NodeIndex, UnGraph};
use tracing::debug;

use crate::similarity::jaccard;

// ---------------------------------------------------------------------------
// CooccurrenceGraph
// ---------------------------------------------------------------------------

/// Undirected card co-occurrence graph.
///
/// Built once from an externally maintained edge list and then read-only.
#[derive(Debug, Clone, Default)]
pub struct CooccurrenceGraph {
    graph: UnGraph<Entity, u32>,
    index: HashMap<Entity, NodeIndex>,
}

impl CooccurrenceGraph {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from `(a, b)` pairs. Repeated pairs increment the edge count;
    /// self-pairs are ignored.
    pub fn from_edges<I, A, B>(edges: I) -> Self
    where
        I: IntoIterator<Item = (A, B)>,
        A: Into<Entity>,
        B: Into<Entity>,
    {
        let mut graph = Self::new();
        for (a, b) in edges {
            graph.add_cooccurrence(a.into(), b.into());
        }
        graph
    }

    /// Record one co-occurrence of `a` and `b`.
    pub fn add_cooccurrence(&mut self, a: Entity, b: Entity) {
        if a == b {
            return;
        }
        let ia = self.node(a);
        let ib = self.node(b);
        match self.graph.find_edge(ia, ib) {
            Some(edge) => {
                if let Some(count) = self.graph.edge_weight_mut(edge) {
                    *count = count.saturating_add(1);
                }
            }
            None => {
                self.graph.add_edge(ia, ib, 1);
            }
        }
    }

    /// Add an isolated card (known, but with no co-occurrences yet).
    pub fn add_card(&mut self, card: Entity) {
        self.node(card);
    }

    fn node(&mut self, card: Entity) -> NodeIndex {
        if let Some(idx) = self.index.get(&card) {
            return *idx;
        }
        let idx = self.graph.add_node(card.clone());
        self.index.insert(card, idx);
        idx
    }

    #[must_use]
    pub fn contains(&self, card: &str) -> bool {
        self.index.contains_key(card)
    }

    #[must_use]
    pub fn card_count(&self) -> usize {
        self.graph.node_count()
    }

    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// How often `a` and `b` were seen together (0 if never).
    #[must_use]
    pub fn cooccurrences(&self, a: &str, b: &str) -> u32 {
        let (Some(ia), Some(ib)) = (self.index.get(a), self.index.get(b)) else {
            return 0;
        };
        self.graph
            .find_edge(*ia, *ib)
            .and_then(|e| self.graph.edge_weight(e))
            .copied()
            .unwrap_or(0)
    }

    /// Direct neighbours of `card`, or `None` if the card is unknown.
    #[must_use]
    pub fn neighbours(&self, card: &str) -> Option<HashSet<&str>> {
        let idx = self.index.get(card)?;
        Some(
            self.graph
                .neighbors(*idx)
                .filter_map(|n| self.graph.node_weight(n).map(String::as_str))
                .collect(),
        )
    }

    /// Neighbour-set Jaccard; `None` if either card is unknown.
    #[must_use]
    pub fn jaccard(&self, a: &str, b: &str) -> Option<f64> {
        let na = self.neighbours(a)?;
        let nb = self.neighbours(b)?;
        Some(jaccard(&na, &nb))
    }

    /// Every card sharing at least one neighbour with `card`, scored by
    /// Jaccard, best first (ties by name), excluding `card` itself.
    ///
    /// Cards outside the 2-hop neighbourhood have Jaccard `0.0` and are not
    /// returned.
    #[must_use]
    pub fn most_similar(&self, card: &str, n: usize) -> Vec<(Entity, f64)> {
        let Some(query_neighbours) = self.neighbours(card) else {
            return Vec::new();
        };
        if n == 0 {
            return Vec::new();
        }

        let mut reachable: HashSet<&str> = HashSet::new();
        for neighbour in &query_neighbours {
            if let Some(second) = self.neighbours(neighbour) {
                reachable.extend(second);
            }
        }
        reachable.remove(card);

        // BTreeMap keeps the scan order stable before the final sort.
        let scored: BTreeMap<&str, f64> = reachable
            .into_iter()
            .filter_map(|other| {
                let others = self.neighbours(other)?;
                let sim = jaccard(&query_neighbours, &others);
                (sim > 0.0).then_some((other, sim))
            })
            .collect();

        let mut ranked: Vec<(Entity, f64)> = scored
            .into_iter()
            .map(|(c, s)| (c.to_string(), s))
            .collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        ranked.truncate(n);
        ranked
    }
}

// ---------------------------------------------------------------------------
// Provider
// ---------------------------------------------------------------------------

/// [`SignalKind::Graph`] provider over a [`CooccurrenceGraph`].
#[derive(Debug, Clone)]
pub struct GraphJaccardProvider {
    graph: std::sync::Arc<CooccurrenceGraph>,
}

impl GraphJaccardProvider {
    #[must_use]
    pub const fn new(graph: std::sync::Arc<CooccurrenceGraph>) -> Self {
        Self { graph }
    }

    #[must_use]
    pub fn graph(&self) -> &CooccurrenceGraph {
        &self.graph
    }
}

#[async_trait]
impl SignalProvider for GraphJaccardProvider {
    fn kind(&self) -> SignalKind {
        SignalKind::Graph
    }

    fn is_available(&self) -> bool {
        self.graph.edge_count() > 0
    }

    async fn top_n(&self, entity: &str, n: usize) -> Result<Vec<(Entity, f64)>> {
        let ranked = self.graph.most_similar(entity, n);
        debug!(card = entity, found = ranked.len(), "graph shortlist");
        Ok(ranked)
    }

    async fn pairwise(&self, a: &str, b: &str) -> Result<Option<f64>> {
        Ok(self.graph.jaccard(a, b))
    }
}
