//! Score submission: payload validation and the gatekeeping pipeline

pub mod pipeline;
pub mod validation;

pub use pipeline::{ScorePipeline, SubmissionError};
pub use validation::{ScoreSubmission, ValidationError};
