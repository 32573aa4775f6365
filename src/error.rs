use thiserror::Error;

/// Failures raised while turning submitted form fields into model features.
///
/// A missing key and a present-but-unparseable value are distinct cases so
/// the rendered message can tell the user exactly what to correct.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("required field {0} is missing")]
    MissingField(&'static str),

    #[error("field {0} is not numeric (got {1:?})")]
    NotNumeric(&'static str, String),
}

/// Failure reported by a classifier implementation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct InferenceError(pub String);

/// Everything that can go wrong on the scoring path. Carried as a value up
/// to the route boundary and rendered there; never unwound.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScoreError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("inference failed: {0}")]
    Inference(#[from] InferenceError),
}
