//! Error types for the tunerd HTTP surface.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors produced while parsing a tuner selector.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SelectorError {
    /// Selector is neither `auto` nor a non-negative integer.
    #[error("invalid tuner selector: {0:?}")]
    Invalid(String),
}

/// JSON body returned with a failed playback request.
///
/// ```json
/// {"error": "tuner not available"}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

impl ErrorBody {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}
