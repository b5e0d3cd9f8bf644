//! Provider adapters (channel handlers).
//!
//! Handler trait and registry so the gateway can dispatch webhook calls by channel type,
//! plus the adapters themselves. Each handler gets its backend and transport at construction.

mod error;
pub mod globe;
mod inbound;
mod registry;

pub use error::{ReceiveError, SendError};
pub use globe::{GlobeHandler, GlobeSettings};
pub use inbound::ReceiveOutcome;
pub use registry::{ChannelHandler, HandlerRegistry, HandlerRoute};
