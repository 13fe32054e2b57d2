//! The closed set of similarity modalities.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// One modality's similarity signal.
///
/// The set is closed: the engine, aggregators and configuration are written
/// against these six variants and nothing else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum SignalKind {
    /// Neighbour-set Jaccard over the deck co-occurrence graph.
    Graph,
    /// Random-walk graph embedding (node2vec style) cosine.
    Structural,
    /// Oracle-text embedding cosine.
    Text,
    /// Card-image embedding cosine.
    Visual,
    /// Jaccard over rule-derived functional tags.
    Functional,
    /// Learned graph-neural embedding cosine.
    Gnn,
}

impl SignalKind {
    /// Every kind, in canonical (declaration) order.
    pub const ALL: [Self; 6] = [
        Self::Graph,
        Self::Structural,
        Self::Text,
        Self::Visual,
        Self::Functional,
        Self::Gnn,
    ];

    /// Stable lowercase identifier used in config files and log fields.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Graph => "graph",
            Self::Structural => "structural",
            Self::Text => "text",
            Self::Visual => "visual",
            Self::Functional => "functional",
            Self::Gnn => "gnn",
        }
    }

    /// Whether this kind is served by a vector space.
    #[must_use]
    pub const fn is_embedding(self) -> bool {
        matches!(self, Self::Structural | Self::Text | Self::Visual | Self::Gnn)
    }
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SignalKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "graph" | "jaccard" | "cooccurrence" => Ok(Self::Graph),
            "structural" | "embed" | "node2vec" => Ok(Self::Structural),
            "text" | "text_embed" => Ok(Self::Text),
            "visual" | "visual_embed" | "image" => Ok(Self::Visual),
            "functional" | "tags" => Ok(Self::Functional),
            "gnn" => Ok(Self::Gnn),
            other => Err(ConfigError::UnknownSignalKind(other.to_string())),
        }
    }
}

impl TryFrom<String> for SignalKind {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SignalKind> for String {
    fn from(kind: SignalKind) -> Self {
        kind.as_str().to_string()
    }
}
