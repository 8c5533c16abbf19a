//! Collaborator trait definitions.
//!
//! The decoder consumes two services it does not implement itself: a source
//! of falling-edge events on the two data lines, and a periodic timer that
//! drives idle detection. These traits are the seams where GPIO drivers,
//! host timers, and the mocks in [`crate::mock`] plug in.
//!
//! [`EdgeSource`] uses native `async fn` (Rust 1.90 + Edition 2024 RPITIT).
//! [`TimerService`] is synchronous: the decoder starts and stops it from
//! inside its critical section, so both calls must return immediately.

#![allow(async_fn_in_trait)]

use std::time::Duration;

use crate::error::Result;

/// Source of falling-edge events on the Wiegand data lines.
///
/// Each call returns the identifier of the line that fired. The reader maps
/// it to DATA0 or DATA1 through its [`ReaderConfig`](crate::config::ReaderConfig).
/// No ordering is guaranteed between the two lines beyond the order the
/// source observed them in.
///
/// # Object Safety and Dynamic Dispatch
///
/// **NOTE**: This trait is NOT object-safe because `async fn` methods return
/// `impl Future`. Use generic type parameters, or the enum wrapper in
/// [`devices`](crate::devices) where a concrete type is required:
///
/// ```no_run
/// use wiegand_reader::devices::AnyEdgeSource;
/// use wiegand_reader::mock::MockEdgeSource;
/// use wiegand_reader::config::ReaderConfig;
/// use wiegand_reader::traits::EdgeSource;
///
/// # async fn example() -> wiegand_reader::Result<()> {
/// let (source, _handle) = MockEdgeSource::new(&ReaderConfig::new(13, 14));
/// let mut any_source = AnyEdgeSource::Mock(source);
///
/// let line = any_source.next_edge().await?;
/// # Ok(())
/// # }
/// ```
pub trait EdgeSource: Send + Sync {
    /// Wait for the next falling edge and return the line it occurred on.
    ///
    /// # Errors
    ///
    /// Returns an error if the source is disconnected or fails.
    async fn next_edge(&mut self) -> Result<u32>;

    /// Human-readable name used in logs.
    fn name(&self) -> &str;
}

/// Periodic timer driving the idle-timeout check.
///
/// Once started, the timer must call back into the decoder's tick entry
/// point every `period` until stopped. Calling `start` while running
/// restarts the cycle with the new period.
///
/// Both methods are called while the decoder holds its state lock and must
/// not block.
pub trait TimerService: Send + Sync {
    /// Start (or restart) periodic ticks.
    fn start(&self, period: Duration);

    /// Stop periodic ticks.
    fn stop(&self);
}
