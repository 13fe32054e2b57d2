//! Functional-tag similarity.
//!
//! Rule-based taggers (external) mark each card with boolean roles such as
//! `removal`, `card_draw`, `mana_ramp`. Two cards are functionally similar
//! when their sets of true tags overlap. A card with no extracted tags is
//! unscorable, not dissimilar.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use cardsim_core::{Entity, SignalKind, SignalProvider};

use crate::similarity::jaccard;

/// Card → tag set, with an inverted tag → cards index for shortlists.
#[derive(Debug, Clone, Default)]
pub struct TagIndex {
    tags: HashMap<Entity, HashSet<String>>,
    cards_by_tag: HashMap<String, BTreeSet<Entity>>,
}

impl TagIndex {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from `(card, tags)` pairs. Cards with an empty tag list are
    /// recorded as untagged.
    pub fn from_cards<I, C, T, S>(cards: I) -> Self
    where
        I: IntoIterator<Item = (C, T)>,
        C: Into<Entity>,
        T: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut index = Self::new();
        for (card, tags) in cards {
            index.insert(card.into(), tags.into_iter().map(Into::into));
        }
        index
    }

    /// Replace a card's tag set.
    pub fn insert(&mut self, card: Entity, tags: impl IntoIterator<Item = String>) {
        if let Some(old) = self.tags.remove(&card) {
            for tag in old {
                if let Some(cards) = self.cards_by_tag.get_mut(&tag) {
                    cards.remove(&card);
                }
            }
        }
        let tags: HashSet<String> = tags.into_iter().collect();
        for tag in &tags {
            self.cards_by_tag
                .entry(tag.clone())
                .or_default()
                .insert(card.clone());
        }
        self.tags.insert(card, tags);
    }

    /// The card's tags, or `None` if it has none (or is unknown).
    #[must_use]
    pub fn tags(&self, card: &str) -> Option<&HashSet<String>> {
        self.tags.get(card).filter(|t| !t.is_empty())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tags.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    /// Tag-set Jaccard; `None` if either card is untagged.
    #[must_use]
    pub fn similarity(&self, a: &str, b: &str) -> Option<f64> {
        Some(jaccard(self.tags(a)?, self.tags(b)?))
    }

    /// Cards sharing at least one tag with `card`, best first, ties by id.
    #[must_use]
    pub fn most_similar(&self, card: &str, n: usize) -> Vec<(Entity, f64)> {
        let Some(query_tags) = self.tags(card) else {
            return Vec::new();
        };

        let mut scored: BTreeMap<&str, f64> = BTreeMap::new();
        for tag in query_tags {
            let Some(cards) = self.cards_by_tag.get(tag) else {
                continue;
            };
            for other in cards {
                if other == card || scored.contains_key(other.as_str()) {
                    continue;
                }
                if let Some(sim) = self.similarity(card, other) {
                    scored.insert(other.as_str(), sim);
                }
            }
        }

        let mut ranked: Vec<(Entity, f64)> = scored
            .into_iter()
            .map(|(c, s)| (c.to_string(), s))
            .collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        ranked.truncate(n);
        ranked
    }
}

/// [`SignalKind::Functional`] provider over a [`TagIndex`].
#[derive(Debug, Clone)]
pub struct FunctionalTagProvider {
    index: Arc<TagIndex>,
}

impl FunctionalTagProvider {
    #[must_use]
    pub const fn new(index: Arc<TagIndex>) -> Self {
        Self { index }
    }
}

#[async_trait]
impl SignalProvider for FunctionalTagProvider {
    fn kind(&self) -> SignalKind {
        SignalKind::Functional
    }

    fn is_available(&self) -> bool {
        !self.index.is_empty()
    }

    async fn top_n(&self, entity: &str, n: usize) -> Result<Vec<(Entity, f64)>> {
        Ok(self.index.most_similar(entity, n))
    }

    async fn pairwise(&self, a: &str, b: &str) -> Result<Option<f64>> {
        Ok(self.index.similarity(a, b))
    }
}
