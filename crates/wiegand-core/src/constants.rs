//! Core constants for the Wiegand decoder.
//!
//! The Wiegand interface carries one bit per falling edge: a pulse on DATA0
//! sends a `0`, a pulse on DATA1 sends a `1`. The wire defines no frame
//! delimiter, so a frame ends when the lines have been quiet for one full
//! sampling interval.
//!
//! ```text
//! DATA0 ‾‾‾‾|_|‾‾‾‾‾‾‾‾‾‾|_|‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾
//! DATA1 ‾‾‾‾‾‾‾‾‾|_|‾‾‾‾‾‾‾‾‾‾‾|_|‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾
//!           0    1     0     1   <---- idle ---->  frame done
//! ```
//!
//! # Usage
//!
//! ```
//! use wiegand_core::constants::*;
//! use std::time::Duration;
//!
//! let interval = Duration::from_millis(DEFAULT_SAMPLE_INTERVAL_MS);
//! assert_eq!(interval.as_millis(), 250);
//! assert_eq!(H10301_BIT_COUNT, 26);
//! ```

// ============================================================================
// Timing
// ============================================================================

/// Default interval between idle-timeout samples, in milliseconds.
///
/// A frame is declared complete on the first sample that sees no new bits,
/// so detection latency falls between one and two intervals after the last
/// bit. Readers pulse bits roughly every 2ms, well below this value.
pub const DEFAULT_SAMPLE_INTERVAL_MS: u64 = 250;

// ============================================================================
// Frame Limits
// ============================================================================

/// Width of the working accumulator in bits.
///
/// Frames longer than this keep only the most recently received bits.
pub const MAX_FRAME_BITS: u32 = u64::BITS;

// ============================================================================
// Built-in Formats
// ============================================================================

/// Bit count of the HID H10301 proximity format.
pub const H10301_BIT_COUNT: u32 = 26;

/// Facility code width of the H10301 format.
pub const H10301_FACILITY_BITS: u32 = 8;

/// Card number width of the H10301 format.
pub const H10301_NUMBER_BITS: u32 = 16;

/// Bit count of the 36-bit proximity format.
pub const PROX36_BIT_COUNT: u32 = 36;

/// Facility code width of the 36-bit format.
pub const PROX36_FACILITY_BITS: u32 = 14;

/// Card number width of the 36-bit format.
pub const PROX36_NUMBER_BITS: u32 = 20;
