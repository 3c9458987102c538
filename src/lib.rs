//! VocalSwap - Voice Swap Job Pipeline
//!
//! Separates a song into vocals and instrumental, re-sings the vocals in a
//! target voice and mixes them back, one job per worker thread.

pub mod audio;
pub mod config;
pub mod error;
pub mod job;
pub mod model;
pub mod pipeline;
pub mod service;

pub use config::{Config, Args};
pub use error::{VocalSwapError, StageFailure, Result};
pub use job::{JobId, JobRecord, JobStatus, JobStatusView};
pub use service::{CapabilityReport, JobService};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

/// Initialize `env_logger`. `RUST_LOG` wins over the verbose flag when set.
pub fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .try_init()
        .ok();
}

pub fn get_library_info() -> LibraryInfo {
    LibraryInfo {
        name: NAME.to_string(),
        version: VERSION.to_string(),
        description: DESCRIPTION.to_string(),
    }
}

#[derive(Debug, Clone)]
pub struct LibraryInfo {
    pub name: String,
    pub version: String,
    pub description: String,
}

impl std::fmt::Display for LibraryInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} v{} - {}", self.name, self.version, self.description)
    }
}
