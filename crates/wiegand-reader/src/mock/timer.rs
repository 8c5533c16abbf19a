//! Manually driven timer for deterministic decoder tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use crate::traits::TimerService;

#[derive(Debug, Default)]
struct TimerState {
    running: AtomicBool,
    period_ms: AtomicU64,
    starts: AtomicUsize,
    stops: AtomicUsize,
}

/// Timer that never fires on its own.
///
/// It only records `start`/`stop` calls; tests drive ticks by calling
/// [`FrameDecoder::on_tick`](crate::decoder::FrameDecoder::on_tick)
/// directly. Clones share state, so a test can keep one clone while the
/// decoder owns another.
///
/// # Examples
///
/// ```
/// use wiegand_reader::mock::ManualTimer;
/// use wiegand_reader::traits::TimerService;
/// use std::time::Duration;
///
/// let timer = ManualTimer::new();
/// let observer = timer.clone();
///
/// timer.start(Duration::from_millis(250));
/// assert!(observer.is_running());
/// assert_eq!(observer.period(), Duration::from_millis(250));
/// ```
#[derive(Debug, Clone, Default)]
pub struct ManualTimer {
    state: Arc<TimerState>,
}

impl ManualTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the timer is currently started.
    pub fn is_running(&self) -> bool {
        self.state.running.load(Ordering::SeqCst)
    }

    /// Period passed to the last `start` call.
    pub fn period(&self) -> Duration {
        Duration::from_millis(self.state.period_ms.load(Ordering::SeqCst))
    }

    /// Number of `start` calls so far.
    pub fn start_count(&self) -> usize {
        self.state.starts.load(Ordering::SeqCst)
    }

    /// Number of `stop` calls so far.
    pub fn stop_count(&self) -> usize {
        self.state.stops.load(Ordering::SeqCst)
    }
}

impl TimerService for ManualTimer {
    fn start(&self, period: Duration) {
        let period_ms = u64::try_from(period.as_millis()).unwrap_or(u64::MAX);
        self.state.period_ms.store(period_ms, Ordering::SeqCst);
        self.state.running.store(true, Ordering::SeqCst);
        self.state.starts.fetch_add(1, Ordering::SeqCst);
    }

    fn stop(&self) {
        self.state.running.store(false, Ordering::SeqCst);
        self.state.stops.fetch_add(1, Ordering::SeqCst);
    }
}
