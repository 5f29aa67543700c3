//! Caller-visible input errors.
//!
//! Pairs that merely fail to form a contact are not errors; they come back as
//! descriptors with `valid == false`.

use thiserror::Error;

/// Rejected input.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InputError {
    /// A ball has a NaN or infinite coordinate or radius.
    #[error("ball {index} has a non-finite {field}: {value}")]
    NonFinite {
        index: usize,
        field: &'static str,
        value: f64,
    },

    /// A ball (after probe expansion) has a negative radius.
    #[error("ball {index} has negative radius {radius}")]
    NegativeRadius { index: usize, radius: f64 },

    /// Probe radius must be finite and non-negative.
    #[error("invalid probe radius: {0} (must be non-negative and finite)")]
    InvalidProbe(f64),

    /// Group labels must cover every ball.
    #[error("expected {expected} group labels, got {actual}")]
    GroupCount { expected: usize, actual: usize },

    /// A settings value is out of range.
    #[error("invalid setting `{name}`: {reason}")]
    InvalidSetting {
        name: &'static str,
        reason: String,
    },
}
