//! Project and crunching configuration.
//!
//! Both structs are plain data with [`Default`]s. [`ProjectConfig::validate`]
//! runs once in [`Project::with_config`](crate::Project::with_config);
//! nothing re-validates later.

use std::time::Duration;

use crate::error::ConfigError;

// ── CrunchingConfig ───────────────────────────────────────────────

/// How crunchers are spawned and throttled.
#[derive(Clone, Debug, PartialEq)]
pub struct CrunchingConfig {
    /// Prefix for cruncher thread names; the job id is appended.
    /// Default: `"braid-cruncher"`.
    pub thread_name_prefix: String,
    /// Most unmerged states a cruncher may queue before it pauses.
    /// `None` = unbounded. Default: 4096.
    pub work_queue_capacity: Option<usize>,
    /// How long a paused cruncher waits for orders before re-checking
    /// its queue, in milliseconds. Default: 5.
    pub backpressure_poll_ms: u64,
}

impl Default for CrunchingConfig {
    fn default() -> Self {
        Self {
            thread_name_prefix: "braid-cruncher".to_owned(),
            work_queue_capacity: Some(4096),
            backpressure_poll_ms: 5,
        }
    }
}

impl CrunchingConfig {
    /// Check structural invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.thread_name_prefix.is_empty() {
            return Err(ConfigError::EmptyThreadName);
        }
        if self.work_queue_capacity == Some(0) {
            return Err(ConfigError::WorkQueueZero);
        }
        if self.backpressure_poll_ms == 0 {
            return Err(ConfigError::PollIntervalZero);
        }
        Ok(())
    }

    pub(crate) fn backpressure_poll(&self) -> Duration {
        Duration::from_millis(self.backpressure_poll_ms)
    }
}

// ── ProjectConfig ─────────────────────────────────────────────────

/// Top-level configuration for a [`Project`](crate::Project).
#[derive(Clone, Debug, PartialEq)]
pub struct ProjectConfig {
    /// Cruncher settings.
    pub crunching: CrunchingConfig,
    /// Clock distance [`Project::crunch_from`](crate::Project::crunch_from)
    /// keeps crunched ahead of a node. Default: 100.
    pub default_clock_buffer: f64,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            crunching: CrunchingConfig::default(),
            default_clock_buffer: 100.0,
        }
    }
}

impl ProjectConfig {
    /// Check structural invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.crunching.validate()?;
        if !self.default_clock_buffer.is_finite() || self.default_clock_buffer < 0.0 {
            return Err(ConfigError::InvalidClockBuffer {
                value: self.default_clock_buffer,
            });
        }
        Ok(())
    }
}
