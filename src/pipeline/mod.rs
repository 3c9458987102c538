//! Job pipeline: separation, conversion, mixing and encoding of one song
//! inside a scratch workspace, driven by a pool of worker threads.

pub mod adapters;
pub mod artifacts;
pub mod command;
pub mod encoder;
pub mod orchestrator;
pub mod pool;
pub mod workspace;

use std::any::Any;

pub use adapters::{
    Capability, ConversionParams, ConversionRequest, ConversionService, Encoder, SeparatedTracks,
    SeparationService, StageAdapters,
};
pub use artifacts::ArtifactStore;
pub use command::{CommandConverter, CommandSeparator};
pub use encoder::CommandEncoder;
pub use orchestrator::{PipelineOrchestrator, Stage};
pub use pool::{JobRunner, WorkerPool};
pub use workspace::{Workspace, WorkspaceManager};

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
