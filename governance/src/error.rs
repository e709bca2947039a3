//! Governance error types

use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GovernanceError {
    #[error("Proposal not found: {0}")]
    NotFound(String),

    #[error("Invalid reputation snapshot for proposal {proposal_id}: total supply is zero")]
    InvalidReputationSnapshot { proposal_id: String },

    #[error("Invalid snapshot: {0}")]
    InvalidSnapshot(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Settings error: {0}")]
    Settings(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Failure reported by a [`crate::calls::CallDecoder`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Unknown function selector: {0}")]
    UnknownSelector(String),

    #[error("Malformed call data: {0}")]
    Malformed(String),
}

/// Failure reported by an [`crate::intents::ActionDispatcher`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    #[error("Transaction rejected by wallet")]
    Rejected,

    #[error("No wallet connected")]
    NotConnected,

    #[error("Dispatcher failure: {0}")]
    Other(String),
}

/// Which event stream a [`Diagnostic`] refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EventKind {
    Vote,
    Stake,
}

/// Non-fatal problem found while deriving a view.
///
/// The affected item is left out of tallies or described generically;
/// the rest of the view is still produced.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Diagnostic {
    #[error("{kind:?} event #{index} has vote code {code}, expected 1 or 2")]
    MalformedEvent { kind: EventKind, index: usize, code: u8 },

    #[error("Call #{call_index} could not be decoded: {reason}")]
    DecodeFailure { call_index: usize, reason: String },
}

pub type Result<T> = std::result::Result<T, GovernanceError>;
