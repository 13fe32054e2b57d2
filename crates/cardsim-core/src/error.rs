use std::fmt;

use crate::kind::SignalKind;

/// Machine-readable error codes for logs and operator tooling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    ConfigParseError,
    NoLiveProviders,
    DuplicateProvider,
    AllZeroWeights,
    InvalidWeight,
    UnknownAggregator,
    UnknownSignalKind,
    UnknownTask,
    InvalidCandidateTopN,
    InvalidMmrLambda,
    ProviderFault,
    ProviderTimeout,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::ConfigParseError => "E1001",
            Self::NoLiveProviders => "E1002",
            Self::DuplicateProvider => "E1003",
            Self::AllZeroWeights => "E1004",
            Self::InvalidWeight => "E1005",
            Self::UnknownAggregator => "E1006",
            Self::UnknownSignalKind => "E1007",
            Self::UnknownTask => "E1008",
            Self::InvalidCandidateTopN => "E1009",
            Self::InvalidMmrLambda => "E1010",
            Self::ProviderFault => "E4001",
            Self::ProviderTimeout => "E4002",
        }
    }

    /// Short human-facing summary for logs.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::ConfigParseError => "Fusion config parse error",
            Self::NoLiveProviders => "No live signal providers",
            Self::DuplicateProvider => "Duplicate provider for signal kind",
            Self::AllZeroWeights => "Weight set is all zero",
            Self::InvalidWeight => "Weight is negative or not finite",
            Self::UnknownAggregator => "Unknown aggregator",
            Self::UnknownSignalKind => "Unknown signal kind",
            Self::UnknownTask => "Unknown task profile",
            Self::InvalidCandidateTopN => "candidate_topn must be positive",
            Self::InvalidMmrLambda => "mmr_lambda must be finite and non-negative",
            Self::ProviderFault => "Signal provider call failed",
            Self::ProviderTimeout => "Signal provider call timed out",
        }
    }

    /// Optional remediation hint for operators.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::ConfigParseError => Some("Fix syntax in fusion.toml and retry."),
            Self::NoLiveProviders => {
                Some("Check that at least one model artifact or graph is loadable.")
            }
            Self::DuplicateProvider => Some("Register one provider per signal kind."),
            Self::AllZeroWeights => Some("Give at least one signal kind a positive weight."),
            Self::InvalidWeight => Some("Weights must be finite and non-negative."),
            Self::UnknownAggregator => {
                Some("Use one of: weighted, rrf, combsum, combmax, combmin.")
            }
            Self::UnknownSignalKind => {
                Some("Use one of: graph, structural, text, visual, functional, gnn.")
            }
            Self::UnknownTask => Some(
                "Use one of: substitution, completion, synergy, similarity, discovery, \
                 refinement, upgrade, downgrade, quality.",
            ),
            Self::InvalidCandidateTopN => Some("Set candidate_topn to 1 or more (default 100)."),
            Self::InvalidMmrLambda => Some("Use 0.0 to disable MMR, or a value such as 0.3."),
            Self::ProviderFault | Self::ProviderTimeout => None,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Construction-time configuration failures.
///
/// Engine construction fails with one of these; nothing here is ever raised
/// while answering a query.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("no live signal providers")]
    NoLiveProviders,

    #[error("more than one provider registered for signal kind `{0}`")]
    DuplicateProvider(SignalKind),

    #[error("weight set is all zero; normalization is undefined")]
    AllZeroWeights,

    #[error("weight for `{kind}` must be finite and non-negative, got {value}")]
    InvalidWeight { kind: SignalKind, value: f64 },

    #[error("unknown aggregator `{0}`")]
    UnknownAggregator(String),

    #[error("unknown signal kind `{0}`")]
    UnknownSignalKind(String),

    #[error("unknown task profile `{0}`")]
    UnknownTask(String),

    #[error("candidate_topn must be at least 1")]
    InvalidCandidateTopN,

    #[error("mmr_lambda must be finite and non-negative, got {0}")]
    InvalidMmrLambda(f64),
}

impl ConfigError {
    /// The stable error code for this failure.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::NoLiveProviders => ErrorCode::NoLiveProviders,
            Self::DuplicateProvider(_) => ErrorCode::DuplicateProvider,
            Self::AllZeroWeights => ErrorCode::AllZeroWeights,
            Self::InvalidWeight { .. } => ErrorCode::InvalidWeight,
            Self::UnknownAggregator(_) => ErrorCode::UnknownAggregator,
            Self::UnknownSignalKind(_) => ErrorCode::UnknownSignalKind,
            Self::UnknownTask(_) => ErrorCode::UnknownTask,
            Self::InvalidCandidateTopN => ErrorCode::InvalidCandidateTopN,
            Self::InvalidMmrLambda(_) => ErrorCode::InvalidMmrLambda,
        }
    }
}
