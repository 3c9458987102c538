//! Job Records and Lifecycle

pub mod record;
pub mod state;
pub mod store;

pub use record::{ArtifactRef, JobId, JobRecord, JobStatus, JobStatusView};
pub use state::JobStateMachine;
pub use store::{InMemoryJobStore, JobStore};
