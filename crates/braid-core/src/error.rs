//! Error types shared across the braid workspace.
//!
//! Organized by who raises them: step functions ([`StepError`]),
//! lookups with a malformed target ([`LookupError`]), and positional
//! access past the end of a path or history ([`PathOutOfRange`]).

use thiserror::Error;

/// Errors a step function may return.
///
/// [`StepError::WorldEnded`] is not a failure: it is the clean signal
/// that a lineage cannot advance any further. Crunchers convert it into
/// an end marker instead of reporting it.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum StepError {
    /// The simulated world has ended; no further states exist.
    #[error("world ended")]
    WorldEnded,
    /// User step code failed. Terminates the run that hit it.
    #[error("step failed: {reason}")]
    Failed {
        /// Human-readable description of the failure.
        reason: String,
    },
}

impl StepError {
    /// Convenience constructor for [`StepError::Failed`].
    pub fn failed(reason: impl Into<String>) -> Self {
        Self::Failed {
            reason: reason.into(),
        }
    }

    /// Whether this is the clean end-of-world signal.
    pub fn is_world_end(&self) -> bool {
        matches!(self, Self::WorldEnded)
    }
}

/// A lookup was asked for something that can never be answered.
///
/// Always a programmer error at the call site.
#[derive(Clone, Copy, Debug, PartialEq, Error)]
pub enum LookupError {
    /// The lookup target was NaN, which orders against nothing.
    #[error("lookup target must be comparable, got {value}")]
    InvalidTarget {
        /// The rejected target.
        value: f64,
    },
}

/// A positional lookup asked for an index that does not exist (yet).
///
/// Recoverable: callers treat it as "nothing more is available".
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
#[error("index {index} out of range for a sequence of length {len}")]
pub struct PathOutOfRange {
    /// The requested index, possibly negative.
    pub index: isize,
    /// Length of the sequence at the time of the lookup.
    pub len: usize,
}
