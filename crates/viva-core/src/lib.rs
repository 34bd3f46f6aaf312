pub mod config;
pub mod engine;
pub mod errors;
pub mod lifecycle;
pub mod model;
pub mod providers;
pub mod report;
pub mod scoring;
pub mod storage;

pub use engine::{EvaluationPipeline, PipelinePolicy};
pub use errors::{InterviewError, Result};
pub use lifecycle::LifecycleManager;
pub use storage::{EntityStore, Store};
