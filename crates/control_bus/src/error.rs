//! Control bus error types

use contracts::Destination;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BusError {
    /// Inbox requested for an address that cannot own one
    #[error("'{destination}' cannot own an inbox")]
    InvalidRecipient { destination: Destination },

    /// Second inbox requested for the same component
    #[error("inbox for '{destination}' already registered")]
    DuplicateRecipient { destination: Destination },

    /// Every sender for this inbox is gone
    #[error("inbox for '{destination}' is closed")]
    Closed { destination: Destination },
}
