//! Wiegand frame decoder.
//!
//! The decoder turns edge events into card records. It has two halves that
//! share one piece of state:
//!
//! - the **accumulator**, fed by [`FrameDecoder::on_bit`] from either data
//!   line, shifts each bit into a working value and counts it;
//! - the **idle detector**, fed by [`FrameDecoder::on_tick`] from a periodic
//!   timer, declares the frame complete once a full interval passes without
//!   new bits.
//!
//! # States
//!
//! ```text
//!            first bit (start timer)
//!   ┌──────┐ ─────────────────────────► ┌──────────┐
//!   │ Idle │                            │ Watching │ ◄─┐ tick, new bits
//!   └──────┘ ◄───────────────────────── └──────────┘ ──┘ (update snapshot)
//!            tick, no new bits
//!            (stop timer, emit frame)
//! ```
//!
//! The timer only runs between the first bit of a frame and its completion,
//! so an empty frame can never be emitted. Completion is detected on the
//! first tick after the last bit, between one and two intervals after it.
//!
//! # Concurrency
//!
//! Both line handlers and the tick handler lock the same short critical
//! section. No allocation or I/O happens while it is held, and the timer
//! is started and stopped inside it so a frame completing on one thread
//! cannot stop the timer a new frame just started on another.
//!
//! # Examples
//!
//! ```
//! use wiegand_reader::config::ReaderConfig;
//! use wiegand_reader::decoder::{FrameDecoder, TickOutcome};
//! use wiegand_reader::mock::ManualTimer;
//!
//! let decoder = FrameDecoder::new(ManualTimer::new(), &ReaderConfig::new(13, 14)).unwrap();
//!
//! for bit in [true, false, true, true] {
//!     decoder.on_bit(bit);
//! }
//!
//! // First tick sees bits arrived since the snapshot, second sees silence.
//! assert_eq!(decoder.on_tick(), TickOutcome::Watching { bits: 4 });
//! assert_eq!(decoder.on_tick(), TickOutcome::Completed { sequence: 1 });
//!
//! let (card, sequence) = decoder.poll();
//! assert_eq!(card.unwrap().raw_value(), 0b1011);
//! assert_eq!(sequence, 1);
//! ```

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tracing::{debug, trace};
use wiegand_core::CardRecord;

use crate::Result;
use crate::config::ReaderConfig;
use crate::sink::{CardHandler, EventSink};
use crate::traits::TimerService;
use crate::types::Line;

/// Idle detector state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectorState {
    /// No frame in progress, timer stopped.
    Idle,

    /// Frame in progress, timer sampling the bit count.
    Watching,
}

/// Result of one idle-detector tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// No frame was in progress. Only seen for a tick racing a stop.
    Idle,

    /// Bits arrived since the last sample; the frame is still open.
    Watching {
        /// Bits accumulated so far.
        bits: u32,
    },

    /// The frame completed and was published.
    Completed {
        /// Sequence number assigned to the frame.
        sequence: u64,
    },
}

/// Working state shared by the line handlers and the tick handler.
#[derive(Debug, Default)]
struct FrameState {
    value: u64,
    bit_count: u32,
    last_sampled: u32,
    timer_active: bool,
}

/// Accumulator and idle-timeout detector for one Wiegand interface.
///
/// `on_bit`/`on_edge` and `on_tick` take `&self` and may be called
/// concurrently from different contexts; wrap the decoder in an `Arc` to
/// share it between them.
pub struct FrameDecoder<T: TimerService> {
    state: Mutex<FrameState>,
    sink: EventSink,
    timer: T,
    sample_interval: Duration,
}

impl<T: TimerService> FrameDecoder<T> {
    /// Create a decoder with no completion handler.
    ///
    /// # Errors
    ///
    /// Returns `ReaderError::Configuration` if the configuration is invalid.
    pub fn new(timer: T, config: &ReaderConfig) -> Result<Self> {
        Self::build(timer, config, None)
    }

    /// Create a decoder that calls `handler` with every completed frame.
    ///
    /// The handler runs in the tick context after the working state has
    /// been reset, so whatever it does cannot affect later frames.
    ///
    /// # Errors
    ///
    /// Returns `ReaderError::Configuration` if the configuration is invalid.
    pub fn with_handler<F>(timer: T, config: &ReaderConfig, handler: F) -> Result<Self>
    where
        F: Fn(CardRecord) + Send + Sync + 'static,
    {
        Self::build(timer, config, Some(Box::new(handler)))
    }

    fn build(timer: T, config: &ReaderConfig, handler: Option<CardHandler>) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            state: Mutex::new(FrameState::default()),
            sink: EventSink::new(handler),
            timer,
            sample_interval: config.sample_interval(),
        })
    }

    fn lock_state(&self) -> MutexGuard<'_, FrameState> {
        // The state is plain integers, always consistent between statements.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Falling edge on a data line.
    pub fn on_edge(&self, line: Line) {
        self.on_bit(line.bit());
    }

    /// Append one bit to the frame in progress.
    ///
    /// The first bit of a frame starts the idle timer.
    pub fn on_bit(&self, bit: bool) {
        let mut state = self.lock_state();
        state.value = (state.value << 1) | u64::from(bit);
        state.bit_count = state.bit_count.wrapping_add(1);

        if !state.timer_active {
            state.timer_active = true;
            state.last_sampled = state.bit_count;
            self.timer.start(self.sample_interval);
        }
    }

    /// Periodic idle check, called by the timer every sample interval.
    ///
    /// If no bit arrived since the previous check, the frame is complete:
    /// the timer is stopped, the working state is reset, and the record is
    /// published to the sink.
    pub fn on_tick(&self) -> TickOutcome {
        let completed = {
            let mut state = self.lock_state();
            if !state.timer_active {
                return TickOutcome::Idle;
            }

            if state.bit_count != state.last_sampled {
                state.last_sampled = state.bit_count;
                trace!(bits = state.bit_count, "Frame still receiving");
                return TickOutcome::Watching {
                    bits: state.bit_count,
                };
            }

            self.timer.stop();
            std::mem::take(&mut *state)
        };

        // Timestamp taken outside the critical section.
        let card = CardRecord::new(completed.value, completed.bit_count);
        let bits = card.bit_count();
        let sequence = self.sink.publish(card);
        debug!(bits, sequence, "Wiegand frame complete");
        TickOutcome::Completed { sequence }
    }

    /// Latest completed record and the number of frames completed so far.
    pub fn poll(&self) -> (Option<CardRecord>, u64) {
        self.sink.poll()
    }

    /// Current idle detector state.
    pub fn state(&self) -> DetectorState {
        if self.lock_state().timer_active {
            DetectorState::Watching
        } else {
            DetectorState::Idle
        }
    }

    /// Working value and bit count of the frame in progress.
    pub fn pending(&self) -> (u64, u32) {
        let state = self.lock_state();
        (state.value, state.bit_count)
    }

    pub fn sample_interval(&self) -> Duration {
        self.sample_interval
    }

    pub fn sink(&self) -> &EventSink {
        &self.sink
    }

    pub fn timer(&self) -> &T {
        &self.timer
    }
}

impl<T: TimerService> std::fmt::Debug for FrameDecoder<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameDecoder")
            .field("state", &*self.lock_state())
            .field("sink", &self.sink)
            .field("sample_interval", &self.sample_interval)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::ManualTimer;
    use rstest::rstest;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use wiegand_core::{FormatId, ParityLayout};

    fn decoder() -> (FrameDecoder<ManualTimer>, ManualTimer) {
        let timer = ManualTimer::new();
        let decoder = FrameDecoder::new(timer.clone(), &ReaderConfig::new(0, 1)).unwrap();
        (decoder, timer)
    }

    fn feed(decoder: &FrameDecoder<ManualTimer>, raw: u64, bits: u32) {
        for i in (0..bits).rev() {
            decoder.on_bit((raw >> i) & 1 == 1);
        }
    }

    #[test]
    fn test_rejects_invalid_config() {
        let result = FrameDecoder::new(ManualTimer::new(), &ReaderConfig::new(4, 4));
        assert!(result.is_err());
    }

    #[test]
    fn test_starts_idle() {
        let (decoder, timer) = decoder();
        assert_eq!(decoder.state(), DetectorState::Idle);
        assert_eq!(decoder.pending(), (0, 0));
        assert_eq!(decoder.poll(), (None, 0));
        assert!(!timer.is_running());
    }

    #[test]
    fn test_bits_accumulate_msb_first() {
        let (decoder, _) = decoder();
        for bit in [true, true, false, true, false] {
            decoder.on_bit(bit);
        }
        assert_eq!(decoder.pending(), (0b11010, 5));
    }

    #[test]
    fn test_on_edge_maps_lines() {
        let (decoder, _) = decoder();
        decoder.on_edge(Line::Data1);
        decoder.on_edge(Line::Data0);
        decoder.on_edge(Line::Data1);
        assert_eq!(decoder.pending(), (0b101, 3));
    }

    #[test]
    fn test_first_bit_starts_timer_once() {
        let (decoder, timer) = decoder();
        decoder.on_bit(false);
        assert!(timer.is_running());
        assert_eq!(timer.period(), Duration::from_millis(250));
        assert_eq!(decoder.state(), DetectorState::Watching);

        decoder.on_bit(true);
        decoder.on_bit(true);
        assert_eq!(timer.start_count(), 1);
    }

    #[test]
    fn test_tick_without_frame_is_noop() {
        let (decoder, timer) = decoder();
        assert_eq!(decoder.on_tick(), TickOutcome::Idle);
        assert_eq!(decoder.poll(), (None, 0));
        assert_eq!(timer.stop_count(), 0);
    }

    #[test]
    fn test_completes_on_first_quiet_tick() {
        let (decoder, timer) = decoder();
        decoder.on_bit(true);

        // Bits during the first interval keep the frame open.
        decoder.on_bit(false);
        assert_eq!(decoder.on_tick(), TickOutcome::Watching { bits: 2 });

        decoder.on_bit(true);
        assert_eq!(decoder.on_tick(), TickOutcome::Watching { bits: 3 });
        assert_eq!(decoder.poll().1, 0);

        assert_eq!(decoder.on_tick(), TickOutcome::Completed { sequence: 1 });
        assert!(!timer.is_running());
        assert_eq!(timer.stop_count(), 1);
        assert_eq!(decoder.state(), DetectorState::Idle);
        assert_eq!(decoder.pending(), (0, 0));

        let (card, sequence) = decoder.poll();
        let card = card.unwrap();
        assert_eq!((card.raw_value(), card.bit_count()), (0b101, 3));
        assert!(!card.is_valid());
        assert_eq!(sequence, 1);
    }

    #[test]
    fn test_record_stamped_at_completion() {
        let (decoder, _) = decoder();
        feed(&decoder, 0b1011, 4);
        assert_eq!(decoder.on_tick(), TickOutcome::Watching { bits: 4 });

        let before = chrono::Utc::now();
        assert_eq!(decoder.on_tick(), TickOutcome::Completed { sequence: 1 });
        let after = chrono::Utc::now();

        let card = decoder.poll().0.unwrap();
        assert!(card.received_at() >= before);
        assert!(card.received_at() <= after);
    }

    #[test]
    fn test_single_burst_completes_on_first_tick() {
        // The snapshot is taken at the first bit, so a one-bit frame is
        // already quiet at the first tick.
        let (decoder, _) = decoder();
        feed(&decoder, 0b1, 1);
        assert_eq!(decoder.on_tick(), TickOutcome::Completed { sequence: 1 });
    }

    #[test]
    fn test_extra_ticks_after_completion_do_nothing() {
        let (decoder, _) = decoder();
        decoder.on_bit(true);
        decoder.on_tick();
        assert_eq!(decoder.on_tick(), TickOutcome::Idle);
        assert_eq!(decoder.poll().1, 1);
    }

    #[test]
    fn test_consecutive_frames_do_not_alias() {
        let (decoder, timer) = decoder();

        let first = ParityLayout::H10301.encode(5, 1234).unwrap();
        feed(&decoder, first, 26);
        decoder.on_tick();
        decoder.on_tick();

        let second = ParityLayout::PROX36.encode(77, 4321).unwrap();
        feed(&decoder, second, 36);
        assert_eq!(timer.start_count(), 2);
        decoder.on_tick();
        assert_eq!(decoder.on_tick(), TickOutcome::Completed { sequence: 2 });

        let (card, sequence) = decoder.poll();
        let mut card = card.unwrap();
        assert_eq!(sequence, 2);
        assert!(card.parse(None));
        assert_eq!(card.format_id(), Some(FormatId::PROX36));
        assert_eq!((card.facility(), card.number()), (Some(77), Some(4321)));
    }

    #[rstest]
    #[case(ParityLayout::H10301, 5, 1234)]
    #[case(ParityLayout::H10301, 255, 65535)]
    #[case(ParityLayout::PROX36, 16383, 1)]
    fn test_decoded_frame_parses(
        #[case] layout: ParityLayout,
        #[case] facility: u64,
        #[case] number: u64,
    ) {
        let (decoder, _) = decoder();
        feed(&decoder, layout.encode(facility, number).unwrap(), layout.bit_count());
        decoder.on_tick();
        decoder.on_tick();

        let mut card = decoder.poll().0.unwrap();
        assert!(card.parse(None));
        assert_eq!(card.facility(), Some(facility));
        assert_eq!(card.number(), Some(number));
    }

    #[test]
    fn test_long_frame_keeps_last_64_bits() {
        let (decoder, _) = decoder();
        decoder.on_bit(true);
        for _ in 0..64 {
            decoder.on_bit(false);
        }
        assert_eq!(decoder.pending(), (0, 65));
    }

    #[test]
    fn test_handler_runs_after_reset() {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = Arc::clone(&calls);
        let timer = ManualTimer::new();
        let decoder = Arc::new(
            FrameDecoder::with_handler(timer, &ReaderConfig::new(0, 1), move |card| {
                assert_eq!(card.bit_count(), 2);
                calls_clone.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap(),
        );

        decoder.on_bit(true);
        decoder.on_bit(true);
        decoder.on_tick();
        decoder.on_tick();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(decoder.pending(), (0, 0));
        assert!(decoder.sink().has_handler());
    }

    #[test]
    fn test_concurrent_lines_lose_no_bits() {
        let (decoder, _) = decoder();
        let decoder = Arc::new(decoder);

        let handles: Vec<_> = [true, false]
            .into_iter()
            .map(|bit| {
                let decoder = Arc::clone(&decoder);
                std::thread::spawn(move || {
                    for _ in 0..1000 {
                        decoder.on_bit(bit);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let (_, bits) = decoder.pending();
        assert_eq!(bits, 2000);
    }

    #[test]
    fn test_debug_output() {
        let (decoder, _) = decoder();
        decoder.on_bit(true);
        let debug = format!("{decoder:?}");
        assert!(debug.contains("bit_count: 1"));
    }
}
