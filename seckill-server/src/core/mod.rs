//! Core - configuration, shared state and background task lifecycle
//!
//! - [`Config`] - server configuration
//! - [`AppState`] - services shared by handlers and workers
//! - [`BackgroundTasks`] - registration and shutdown of background work

pub mod config;
pub mod state;
pub mod tasks;

pub use config::{Config, StoreBackend};
pub use state::AppState;
pub use tasks::{BackgroundTasks, TaskKind};
