//! Session Module
//!
//! Registered users, their credentials and chat bindings, and the store that
//! owns them.

mod store;
mod types;

pub use store::{InMemorySessionStore, SessionStore};
pub use types::{PushTarget, Secret, Session};
