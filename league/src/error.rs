//! Error types for the league.

use thiserror::Error;

use crate::agent::AgentId;
use crate::generation::Phase;

/// Errors raised by the scheduler and roster.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LeagueError {
    #[error("invalid league settings: {0}")]
    InvalidSettings(String),

    #[error("roster invariant violated: {0}")]
    Roster(String),

    #[error("unknown agent {0}")]
    UnknownAgent(AgentId),

    #[error("agent {0} is not a training agent")]
    NotTrainingAgent(AgentId),

    #[error("generation {generation}: cannot enter {to} from {from}")]
    PhaseOrder {
        generation: u64,
        from: Phase,
        to: Phase,
    },

    #[error("generation {0} is sealed")]
    Sealed(u64),

    #[error("challenger check incomplete in generation {generation}: {reason}")]
    ChallengerCheckIncomplete { generation: u64, reason: String },

    #[error("wildcard check incomplete in generation {generation}: {reason}")]
    WildcardCheckIncomplete { generation: u64, reason: String },

    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

/// Errors reported by a persistence collaborator.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PersistenceError {
    #[error("checkpoint io error: {0}")]
    Io(String),

    #[error("checkpoint encoding error: {0}")]
    Encoding(String),

    #[error("no checkpoint for generation {0}")]
    NotFound(u64),

    #[error("persistence unavailable: {0}")]
    Unavailable(String),
}

impl From<std::io::Error> for PersistenceError {
    fn from(e: std::io::Error) -> Self {
        PersistenceError::Io(e.to_string())
    }
}

impl From<serde_json::Error> for PersistenceError {
    fn from(e: serde_json::Error) -> Self {
        PersistenceError::Encoding(e.to_string())
    }
}

/// Error reported by the training collaborator.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("training failed: {0}")]
pub struct TrainingError(pub String);
