//! Error taxonomy for the routing core
//!
//! Only handler failures are errors. A missing handler is skipped by the
//! router, and an empty bundle becomes the synthesizer's fallback message.

use thiserror::Error;

use crate::bundle::ResponseBundle;

#[derive(Debug, Error)]
pub enum ConciergeError {
    /// A dispatched handler returned an error or panicked. `partial` holds
    /// the entries that were collected before or alongside the failure.
    #[error("Handler '{handler}' failed: {source}")]
    HandlerFailure {
        handler: String,
        #[source]
        source: anyhow::Error,
        partial: ResponseBundle,
    },
}

impl ConciergeError {
    /// Name of the handler that failed
    pub fn handler(&self) -> &str {
        match self {
            Self::HandlerFailure { handler, .. } => handler,
        }
    }

    /// Entries gathered before the failure
    pub fn into_partial(self) -> ResponseBundle {
        match self {
            Self::HandlerFailure { partial, .. } => partial,
        }
    }
}
