//! Application wiring.
//!
//! Services are built explicitly from an [`AppConfig`](crate::config::AppConfig)
//! and handed to the host; nothing here is a process-wide singleton.

mod context;

pub use context::{AppContext, AppError};
