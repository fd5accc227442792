//! Status monitor library
//!
//! Compiles a list of configured services into a shared registry and keeps it
//! fresh with two independent cadences: liveness probes of service URLs, and
//! repository/build metadata from GitHub and Drone.

pub mod compiler;
pub mod config;
pub mod controllers;
pub mod errors;
pub mod fetch;
pub mod models;
pub mod registry;
pub mod scheduler;
pub mod state;
pub mod transport;

pub use compiler::compile;
pub use config::{CiConfig, Config, RepoConfig, ServiceConfig};
pub use errors::{MonitorError, Result};
pub use fetch::{FetchKind, FetchTask, Fetchers};
pub use models::{Build, Commit, Service};
pub use registry::{Registry, ServiceEntry};
pub use scheduler::{PassSummary, Scheduler, SchedulerHandle};
pub use state::AppState;
