// error.rs - Error Handling Design (§7)
//
//! Four error kinds with distinct propagation policy. `MalformedContent`
//! and `StateViolation` are recoverable: they produce a reply and leave the
//! agent alive. `ContractViolation` is not: the agent that observes it
//! terminates. `TransportError` surfaces as silence and is only actionable
//! if a deadline is configured (§5); this crate has no transport of its
//! own, so it exists for callers that plug one in.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum YardError {
    #[error("transport error delivering to {0}")]
    Transport(String),

    #[error("malformed content: {0}")]
    MalformedContent(#[from] crate::content::ContentError),

    #[error("state violation: {0}")]
    StateViolation(String),

    #[error("contract violation: counterparty {agent} sent unexpected performative in {context}")]
    ContractViolation { agent: String, context: String },

    #[error("timed out waiting for {0}")]
    Timeout(String),
}

impl YardError {
    /// Non-recoverable failures terminate the affected agent; everything
    /// else produces a reply and the agent stays alive (§7).
    pub fn is_fatal(&self) -> bool {
        matches!(self, YardError::ContractViolation { .. } | YardError::Transport(_))
    }
}
