//! smsgate core library: canonical message model, provider adapters (Globe Labs),
//! persistence/network capabilities and the gateway host used by the CLI.

pub mod backend;
pub mod channels;
pub mod config;
pub mod gateway;
pub mod init;
pub mod msg;
pub mod split;
pub mod transport;
pub mod urn;
