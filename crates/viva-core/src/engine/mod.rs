pub mod pipeline;

pub use pipeline::{EvaluationPipeline, PipelinePolicy};
