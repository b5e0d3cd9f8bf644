//! Gateway: HTTP host for provider adapters.
//!
//! Single port. Vendors POST webhooks to `/c/{type}/{uuid}/{action}`; the call is
//! dispatched to the handler registered for the channel type and acknowledged as JSON.

mod protocol;
mod server;

pub use protocol::{AckData, AckResponse};
pub use server::{build_state, router, run_gateway, GatewayState};
