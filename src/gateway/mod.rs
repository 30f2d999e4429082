//! HTTP Gateway
//!
//! Thin axum front-end over the relay core:
//! - registration (`POST /login`)
//! - on-demand listing and relay (`GET /notifications`, `POST /send_notification`)
//! - debug listing and health (`GET /users`, `GET /health`)

pub mod error;
pub mod server;
pub mod types;

pub use server::{GatewayParams, GatewayState, build_router, start_server};
