//! OLX Relay
//!
//! Polls marketplace messages for registered users and forwards each one to
//! the user's Telegram chat. Exposes an HTTP gateway for registration and
//! on-demand relays, and runs a background poll loop.

pub mod cli;
pub mod config;
pub mod error;
pub mod gateway;
pub mod logging;
pub mod remote;
pub mod services;
pub mod session;
pub mod utils;

#[cfg(test)]
mod tests;

pub use error::{RelayError, Result};

/// Crate version, reported by `/health` and the HTTP user agent.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
