//! Service Layer
//!
//! The relay core: session registration, the per-session relay engine and
//! the background poll scheduler, plus the context that wires them together.

mod context;
pub mod relay;
pub mod scheduler;
pub mod session;
pub mod template;

pub use context::ServiceContext;
pub use relay::{RelayEngine, RelayReport};
pub use scheduler::{CycleReport, PollScheduler, SchedulerHandle};
pub use session::SessionService;
pub use template::PushTemplate;
