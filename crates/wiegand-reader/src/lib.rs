//! Wiegand two-wire decoder and Tokio reader driver.
//!
//! A Wiegand reader signals each bit as a falling edge on one of two lines:
//! DATA0 for a 0 and DATA1 for a 1. There is no length prefix or terminator;
//! a frame ends when the lines go quiet. This crate accumulates those edges
//! into frames and hands completed frames to the application as
//! [`CardRecord`](wiegand_core::CardRecord)s.
//!
//! # Components
//!
//! - [`FrameDecoder`]: the bit accumulator and idle detector. It is driven by
//!   two callbacks, `on_edge` and `on_tick`, and is safe to call from
//!   different threads.
//! - [`TimerService`] and [`EdgeSource`]: the host services the decoder
//!   relies on. [`TokioTimer`] provides the periodic sampling tick.
//! - [`WiegandReader`]: spawns the edge and timer tasks and returns a
//!   [`ReaderHandle`] for receiving or polling cards.
//! - [`mock`]: a programmable edge source and a manual timer for tests.
//!
//! # Example
//!
//! ```
//! use wiegand_reader::mock::ManualTimer;
//! use wiegand_reader::{FrameDecoder, ReaderConfig, TickOutcome};
//!
//! # fn main() -> wiegand_reader::Result<()> {
//! let decoder = FrameDecoder::new(ManualTimer::new(), &ReaderConfig::new(13, 14))?;
//!
//! for bit in [true, false, true] {
//!     decoder.on_bit(bit);
//! }
//!
//! assert_eq!(decoder.on_tick(), TickOutcome::Watching { bits: 3 });
//! assert_eq!(decoder.on_tick(), TickOutcome::Completed { sequence: 1 });
//!
//! let (card, sequence) = decoder.poll();
//! let card = card.expect("frame completed");
//! assert_eq!(card.raw_value(), 0b101);
//! assert_eq!(card.bit_count(), 3);
//! assert_eq!(sequence, 1);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod decoder;
pub mod devices;
pub mod error;
pub mod mock;
pub mod reader;
pub mod sink;
pub mod timer;
pub mod traits;
pub mod types;

pub use config::ReaderConfig;
pub use decoder::{DetectorState, FrameDecoder, TickOutcome};
pub use devices::AnyEdgeSource;
pub use error::{ReaderError, Result};
pub use reader::{ReaderHandle, WiegandReader};
pub use sink::{CardHandler, EventSink};
pub use timer::{TimerTicks, TokioTimer};
pub use traits::{EdgeSource, TimerService};
pub use types::Line;
