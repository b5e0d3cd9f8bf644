//! Result of handling an inbound webhook call.

use crate::msg::IncomingMessage;

/// Successful outcome of a receive. Errors are reported through `ReceiveError`.
#[derive(Debug, Clone, PartialEq)]
pub enum ReceiveOutcome {
    /// Nothing to do; acknowledged to the vendor as benign.
    Ignored { reason: String },
    /// Every message of the batch was persisted, in payload order.
    Accepted(Vec<IncomingMessage>),
}

impl ReceiveOutcome {
    pub fn ignored(reason: impl Into<String>) -> Self {
        Self::Ignored {
            reason: reason.into(),
        }
    }

    /// Messages accepted by this call (empty when ignored).
    pub fn messages(&self) -> &[IncomingMessage] {
        match self {
            Self::Ignored { .. } => &[],
            Self::Accepted(msgs) => msgs,
        }
    }
}
