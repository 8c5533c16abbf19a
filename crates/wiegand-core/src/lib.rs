//! Card records and card formats for Wiegand readers.
//!
//! This crate holds the synchronous side of the decoder: the [`CardRecord`]
//! built from each completed frame, and the [`FormatRegistry`] that
//! validates parity and extracts facility/number fields. Bit accumulation
//! and idle detection live in `wiegand-reader`.

pub mod card;
pub mod constants;
pub mod error;
pub mod format;
pub mod types;

pub use card::CardRecord;
pub use error::{Error, Result};
pub use format::{CardFormat, FnFormat, FormatRegistry, ParityLayout};
pub use types::*;

/// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
