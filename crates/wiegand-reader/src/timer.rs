//! Tokio-backed timer service.
//!
//! [`TokioTimer`] is the half the decoder owns: `start`/`stop` only publish
//! the desired state on a `watch` channel and never block. [`TimerTicks`]
//! is the half a task runs: it waits until the timer is armed, then calls
//! the tick callback every period until the timer is stopped or restarted.
//!
//! ```text
//!  FrameDecoder ── start/stop ──► watch ──► TimerTicks::run ── on_tick ──► FrameDecoder
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::trace;

use crate::traits::TimerService;

/// Armed period and the generation of the `start` call that armed it.
type Armed = Option<(Duration, u64)>;

/// Timer service driven by a Tokio task.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use wiegand_reader::config::ReaderConfig;
/// use wiegand_reader::decoder::FrameDecoder;
/// use wiegand_reader::timer::TokioTimer;
///
/// # async fn example() -> wiegand_reader::Result<()> {
/// let (timer, ticks) = TokioTimer::new(None);
/// let decoder = Arc::new(FrameDecoder::new(timer, &ReaderConfig::new(13, 14))?);
///
/// let tick_decoder = Arc::clone(&decoder);
/// tokio::spawn(ticks.run(move || {
///     tick_decoder.on_tick();
/// }));
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct TokioTimer {
    id: Option<i32>,
    armed: watch::Sender<Armed>,
    generation: AtomicU64,
}

impl TokioTimer {
    /// Create a stopped timer and the tick driver that pairs with it.
    ///
    /// `id` names the host timer resource in logs; Tokio needs none.
    pub fn new(id: Option<i32>) -> (Self, TimerTicks) {
        let (armed, armed_rx) = watch::channel(None);
        let timer = Self {
            id,
            armed,
            generation: AtomicU64::new(0),
        };
        (timer, TimerTicks { armed: armed_rx })
    }

    pub fn id(&self) -> Option<i32> {
        self.id
    }

    pub fn is_running(&self) -> bool {
        self.armed.borrow().is_some()
    }
}

impl TimerService for TokioTimer {
    fn start(&self, period: Duration) {
        let generation = self.generation.fetch_add(1, Ordering::Relaxed) + 1;
        self.armed.send_replace(Some((period, generation)));
    }

    fn stop(&self) {
        self.armed.send_replace(None);
    }
}

/// Tick driver for a [`TokioTimer`].
#[derive(Debug)]
pub struct TimerTicks {
    armed: watch::Receiver<Armed>,
}

impl TimerTicks {
    /// Run the tick loop until the paired [`TokioTimer`] is dropped.
    ///
    /// The first tick of each cycle fires one full period after `start`.
    pub async fn run(mut self, mut on_tick: impl FnMut()) {
        loop {
            let current = *self.armed.borrow_and_update();
            let Some((period, generation)) = current else {
                if self.armed.changed().await.is_err() {
                    return;
                }
                continue;
            };

            trace!(?period, generation, "Timer cycle armed");
            let mut interval = time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = interval.tick() => on_tick(),
                    changed = self.armed.changed() => {
                        if changed.is_err() {
                            return;
                        }
                        if *self.armed.borrow() != current {
                            break;
                        }
                    }
                }
            }
        }
    }
}
