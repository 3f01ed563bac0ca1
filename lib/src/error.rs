use thiserror::Error;

/// Failures raised by the core pipeline. All of them abort the current
/// run; recovery policy, if any, belongs to the caller.
#[derive(Error, Debug, PartialEq)]
pub enum PipelineError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("shape mismatch: model expects trailing dims {expected:?}, got {actual:?}")]
    ShapeMismatch {
        expected : (usize, usize),
        actual : (usize, usize)
    },

    #[error("upstream data source unavailable: {0}")]
    UpstreamUnavailable(String),
}
