pub mod activity;
pub mod config;
pub mod discovery;
pub mod error;
pub mod journal;

pub use activity::{ActivityKind, ActivityRegistry, ActivitySpec, ArgumentSpec, Control};
pub use config::{ConfigValue, Configuration, Secrets};
pub use discovery::{initialize_discovery_result, Discovery, ExtensionInfo};
pub use error::{ChaosError, Result};
pub use journal::{experiment_hash, Experiment, Journal, RunStatus};

/// Version reported in discovery documents and metric labels.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// Re-export commonly used types
pub use async_trait::async_trait;
