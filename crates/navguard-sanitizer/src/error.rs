//! Error types for the sanitizer.

use thiserror::Error;

/// Reasons the sanitizer could not produce a rewritten program.
///
/// These never escape [`Sanitizer::sanitize`](crate::Sanitizer::sanitize);
/// they are carried in [`Outcome::Rejected`](crate::Outcome::Rejected) so the
/// caller can log them while the fail-safe policy decides the output text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum SanitizeError {
    /// Neither the module nor the script grammar accepted the input.
    #[error("parse error: {message}")]
    Parse {
        /// First diagnostic reported by the parser.
        message: String,
    },

    /// Input is nested deeper than the parser is allowed to recurse.
    #[error("nesting depth {actual} exceeds maximum {max}")]
    NestingTooDeep {
        /// Maximum allowed nesting depth.
        max: usize,
        /// Actual detected nesting depth.
        actual: usize,
    },

    /// The parser or code generator panicked.
    #[error("internal sanitizer failure: {message}")]
    Internal {
        /// Panic payload, when it was a string.
        message: String,
    },
}

impl SanitizeError {
    /// Returns a static error code string for programmatic matching.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Parse { .. } => "PARSE_ERROR",
            Self::NestingTooDeep { .. } => "NESTING_TOO_DEEP",
            Self::Internal { .. } => "INTERNAL",
        }
    }
}
