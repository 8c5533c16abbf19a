//! Reader configuration.
//!
//! The configuration names the two data lines, the idle sampling interval
//! and, for hosts that allocate timers explicitly, which timer to use. It
//! is read once when the decoder is built; the sampling interval cannot
//! change while a frame is in flight.
//!
//! # Examples
//!
//! ```
//! use wiegand_reader::config::ReaderConfig;
//! use std::time::Duration;
//!
//! let config = ReaderConfig::new(13, 14)
//!     .with_sample_interval(Duration::from_millis(100))
//!     .with_timer_id(1);
//!
//! config.validate().unwrap();
//! assert_eq!(config.sample_interval(), Duration::from_millis(100));
//! ```

use serde::{Deserialize, Serialize};
use std::time::Duration;
use wiegand_core::constants::DEFAULT_SAMPLE_INTERVAL_MS;

use crate::types::Line;
use crate::{ReaderError, Result};

fn default_sample_interval_ms() -> u64 {
    DEFAULT_SAMPLE_INTERVAL_MS
}

/// Configuration for a Wiegand reader.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReaderConfig {
    /// Line identifier that pulses for a `0` bit.
    pub data0_line: u32,

    /// Line identifier that pulses for a `1` bit.
    pub data1_line: u32,

    /// Idle sampling interval in milliseconds.
    #[serde(default = "default_sample_interval_ms")]
    pub sample_interval_ms: u64,

    /// Timer resource to use, on hosts that require one.
    #[serde(default)]
    pub timer_id: Option<i32>,
}

impl ReaderConfig {
    /// Create a configuration with the default sampling interval.
    pub fn new(data0_line: u32, data1_line: u32) -> Self {
        Self {
            data0_line,
            data1_line,
            sample_interval_ms: DEFAULT_SAMPLE_INTERVAL_MS,
            timer_id: None,
        }
    }

    /// Set the idle sampling interval.
    ///
    /// Sub-millisecond precision is dropped.
    pub fn with_sample_interval(mut self, interval: Duration) -> Self {
        self.sample_interval_ms = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Set the timer resource identifier.
    pub fn with_timer_id(mut self, timer_id: i32) -> Self {
        self.timer_id = Some(timer_id);
        self
    }

    /// Idle sampling interval.
    pub fn sample_interval(&self) -> Duration {
        Duration::from_millis(self.sample_interval_ms)
    }

    /// Map a line identifier reported by an edge source to its data line.
    ///
    /// # Errors
    ///
    /// Returns `ReaderError::InvalidLine` if `line` is neither configured line.
    pub fn line_for(&self, line: u32) -> Result<Line> {
        if line == self.data0_line {
            Ok(Line::Data0)
        } else if line == self.data1_line {
            Ok(Line::Data1)
        } else {
            Err(ReaderError::invalid_line(line))
        }
    }

    /// Line identifier configured for a data line.
    pub fn id_of(&self, line: Line) -> u32 {
        match line {
            Line::Data0 => self.data0_line,
            Line::Data1 => self.data1_line,
        }
    }

    /// Check the configuration for values the decoder cannot run with.
    ///
    /// # Errors
    ///
    /// Returns `ReaderError::Configuration` if:
    /// - both data lines use the same identifier
    /// - the sampling interval is zero
    pub fn validate(&self) -> Result<()> {
        if self.data0_line == self.data1_line {
            return Err(ReaderError::configuration(format!(
                "DATA0 and DATA1 must be different lines, both are {}",
                self.data0_line
            )));
        }
        if self.sample_interval_ms == 0 {
            return Err(ReaderError::configuration(
                "Sample interval must be at least 1ms",
            ));
        }
        Ok(())
    }
}
