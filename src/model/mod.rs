//! Voice Model Module

pub mod repository;
pub mod voice;

pub use repository::{FileModelRepository, ModelHandle, ModelRepository};
pub use voice::VoiceModel;
