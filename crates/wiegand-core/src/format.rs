//! Card format registry.
//!
//! A card format turns the raw value of a completed frame into structured
//! fields, validating parity on the way. Formats are keyed by [`FormatId`]
//! in a [`FormatRegistry`]; the frame decoder never looks at them.
//!
//! # Parity Layouts
//!
//! Most proximity formats share one shape: a leading even-parity bit over
//! the upper half of the frame, a trailing odd-parity bit over the lower
//! half, and facility/number fields in between.
//!
//! ```text
//! H10301 (26 bit):  [high] E FFFFFFFF NNNNNNNNNNNNNNNN O [low]
//!                          |<--- even (13) --->|<--- odd (13) --->|
//! ```
//!
//! [`ParityLayout`] describes that family, and the two built-in formats are
//! instances of it. Anything else can be registered by implementing
//! [`CardFormat`] or passing a plain function to
//! [`FormatRegistry::register_fn`].
//!
//! # Examples
//!
//! ```
//! use wiegand_core::format::{FormatRegistry, ParityLayout};
//! use wiegand_core::FormatId;
//!
//! let registry = FormatRegistry::default();
//! let raw = ParityLayout::H10301.encode(5, 1234).unwrap();
//!
//! let fields = registry.decode(FormatId::H10301, raw, 26).unwrap();
//! assert_eq!((fields.facility, fields.number), (5, 1234));
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

use crate::constants::{
    H10301_BIT_COUNT, H10301_FACILITY_BITS, H10301_NUMBER_BITS, MAX_FRAME_BITS, PROX36_BIT_COUNT,
    PROX36_FACILITY_BITS, PROX36_NUMBER_BITS,
};
use crate::types::{CardFields, FormatId, low_mask, parity};
use crate::{Error, Result};

/// A card encoding: validates a raw frame and extracts its fields.
///
/// Implementations must be pure. The same `(raw, bit_count)` always yields
/// the same result.
pub trait CardFormat: Send + Sync {
    /// Human-readable format name.
    fn name(&self) -> &str;

    /// Decode a raw frame of `bit_count` bits.
    ///
    /// # Errors
    ///
    /// Returns an error if the bit count does not match the format or a
    /// parity check fails.
    fn decode(&self, raw: u64, bit_count: u32) -> Result<CardFields>;
}

/// Leading-even / trailing-odd parity layout.
///
/// The frame is `1 + facility_bits + number_bits + 1` bits wide. The first
/// bit makes the upper half even, the last bit makes the lower half odd.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParityLayout {
    name: &'static str,
    bit_count: u32,
    facility_bits: u32,
    number_bits: u32,
}

impl ParityLayout {
    /// HID H10301: 8 facility bits, 16 number bits.
    pub const H10301: ParityLayout = ParityLayout::new_unchecked(
        "H10301",
        H10301_BIT_COUNT,
        H10301_FACILITY_BITS,
        H10301_NUMBER_BITS,
    );

    /// 36-bit proximity: 14 facility bits, 20 number bits.
    pub const PROX36: ParityLayout = ParityLayout::new_unchecked(
        "Proximity 36",
        PROX36_BIT_COUNT,
        PROX36_FACILITY_BITS,
        PROX36_NUMBER_BITS,
    );

    /// Create a layout with validation.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidLayout` if:
    /// - the field widths plus two parity bits do not add up to `bit_count`
    /// - `bit_count` is odd, so the parity halves would be uneven
    /// - `bit_count` exceeds the accumulator width
    /// - `number_bits` is zero
    ///
    /// # Examples
    ///
    /// ```
    /// use wiegand_core::format::ParityLayout;
    ///
    /// let layout = ParityLayout::new("Custom 34", 34, 16, 16).unwrap();
    /// assert_eq!(layout.bit_count(), 34);
    ///
    /// assert!(ParityLayout::new("Broken", 26, 8, 8).is_err());
    /// ```
    pub fn new(
        name: &'static str,
        bit_count: u32,
        facility_bits: u32,
        number_bits: u32,
    ) -> Result<Self> {
        if number_bits == 0 {
            return Err(Error::InvalidLayout(format!(
                "{name}: number field must be at least one bit"
            )));
        }
        let total = facility_bits
            .checked_add(number_bits)
            .and_then(|n| n.checked_add(2));
        if total != Some(bit_count) {
            return Err(Error::InvalidLayout(format!(
                "{name}: 2 parity + {facility_bits} facility + {number_bits} number bits != {bit_count}"
            )));
        }
        if bit_count % 2 != 0 {
            return Err(Error::InvalidLayout(format!(
                "{name}: bit count {bit_count} cannot be split into equal parity halves"
            )));
        }
        if bit_count > MAX_FRAME_BITS {
            return Err(Error::InvalidLayout(format!(
                "{name}: bit count {bit_count} exceeds {MAX_FRAME_BITS}"
            )));
        }
        Ok(Self::new_unchecked(name, bit_count, facility_bits, number_bits))
    }

    const fn new_unchecked(
        name: &'static str,
        bit_count: u32,
        facility_bits: u32,
        number_bits: u32,
    ) -> Self {
        Self {
            name,
            bit_count,
            facility_bits,
            number_bits,
        }
    }

    #[must_use]
    pub fn bit_count(&self) -> u32 {
        self.bit_count
    }

    #[must_use]
    pub fn facility_bits(&self) -> u32 {
        self.facility_bits
    }

    #[must_use]
    pub fn number_bits(&self) -> u32 {
        self.number_bits
    }

    /// Number of bits covered by each parity check.
    fn half(&self) -> u32 {
        self.bit_count / 2
    }

    /// Build a parity-correct raw value for the given fields.
    ///
    /// # Errors
    ///
    /// Returns `Error::FieldOverflow` if either field is wider than the
    /// layout allows.
    ///
    /// # Examples
    ///
    /// ```
    /// use wiegand_core::format::{CardFormat, ParityLayout};
    ///
    /// let raw = ParityLayout::PROX36.encode(1000, 654321).unwrap();
    /// let fields = ParityLayout::PROX36.decode(raw, 36).unwrap();
    /// assert_eq!(fields.number, 654321);
    /// ```
    pub fn encode(&self, facility: u64, number: u64) -> Result<u64> {
        if facility > low_mask(self.facility_bits) {
            return Err(Error::FieldOverflow {
                field: "facility",
                value: facility,
                bits: self.facility_bits,
            });
        }
        if number > low_mask(self.number_bits) {
            return Err(Error::FieldOverflow {
                field: "number",
                value: number,
                bits: self.number_bits,
            });
        }

        let half = self.half();
        let mut raw = ((facility << self.number_bits) | number) << 1;
        if parity(raw >> half) == 1 {
            raw |= 1 << (self.bit_count - 1);
        }
        if parity(raw & low_mask(half)) == 0 {
            raw |= 1;
        }
        Ok(raw)
    }
}

impl CardFormat for ParityLayout {
    fn name(&self) -> &str {
        self.name
    }

    fn decode(&self, raw: u64, bit_count: u32) -> Result<CardFields> {
        if bit_count != self.bit_count {
            return Err(Error::BitCountMismatch {
                expected: self.bit_count,
                actual: bit_count,
            });
        }

        let half = self.half();
        if parity(raw >> half) != 0 {
            return Err(Error::EvenParity { bits: half });
        }
        if parity(raw & low_mask(half)) != 1 {
            return Err(Error::OddParity { bits: half });
        }

        Ok(CardFields {
            facility: (raw >> (self.number_bits + 1)) & low_mask(self.facility_bits),
            number: (raw >> 1) & low_mask(self.number_bits),
        })
    }
}

/// Adapter registering a plain decode function as a [`CardFormat`].
pub struct FnFormat<F> {
    name: String,
    decode: F,
}

impl<F> FnFormat<F>
where
    F: Fn(u64, u32) -> Result<CardFields> + Send + Sync,
{
    pub fn new(name: impl Into<String>, decode: F) -> Self {
        Self {
            name: name.into(),
            decode,
        }
    }
}

impl<F> CardFormat for FnFormat<F>
where
    F: Fn(u64, u32) -> Result<CardFields> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn decode(&self, raw: u64, bit_count: u32) -> Result<CardFields> {
        (self.decode)(raw, bit_count)
    }
}

/// Registry of card formats keyed by [`FormatId`].
///
/// [`FormatRegistry::default`] holds the built-in formats 26 and 36.
/// [`FormatRegistry::new`] starts empty.
#[derive(Clone)]
pub struct FormatRegistry {
    formats: BTreeMap<FormatId, Arc<dyn CardFormat>>,
}

impl FormatRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            formats: BTreeMap::new(),
        }
    }

    /// Shared registry holding only the built-in formats.
    pub fn builtin() -> &'static FormatRegistry {
        static BUILTIN: OnceLock<FormatRegistry> = OnceLock::new();
        BUILTIN.get_or_init(FormatRegistry::default)
    }

    /// Register a format under `id`.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if a format is already registered under `id`.
    /// Existing rules are never replaced.
    ///
    /// # Examples
    ///
    /// ```
    /// use wiegand_core::format::{FormatRegistry, ParityLayout};
    /// use wiegand_core::FormatId;
    ///
    /// let mut registry = FormatRegistry::default();
    /// let layout = ParityLayout::new("Custom 34", 34, 16, 16).unwrap();
    /// registry.register(FormatId::new(34), layout).unwrap();
    ///
    /// assert!(registry.register(FormatId::H10301, layout).is_err());
    /// ```
    pub fn register(&mut self, id: FormatId, format: impl CardFormat + 'static) -> Result<()> {
        if self.formats.contains_key(&id) {
            return Err(Error::Config(format!(
                "Card format {id} is already registered"
            )));
        }
        self.formats.insert(id, Arc::new(format));
        Ok(())
    }

    /// Register a plain decode function under `id`.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if a format is already registered under `id`.
    pub fn register_fn<F>(&mut self, id: FormatId, name: impl Into<String>, decode: F) -> Result<()>
    where
        F: Fn(u64, u32) -> Result<CardFields> + Send + Sync + 'static,
    {
        self.register(id, FnFormat::new(name, decode))
    }

    /// Builder-style [`register`](Self::register).
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if a format is already registered under `id`.
    pub fn with_format(mut self, id: FormatId, format: impl CardFormat + 'static) -> Result<Self> {
        self.register(id, format)?;
        Ok(self)
    }

    pub fn get(&self, id: FormatId) -> Option<&dyn CardFormat> {
        self.formats.get(&id).map(|format| format.as_ref())
    }

    pub fn contains(&self, id: FormatId) -> bool {
        self.formats.contains_key(&id)
    }

    /// Registered identifiers in ascending order.
    pub fn ids(&self) -> impl Iterator<Item = FormatId> + '_ {
        self.formats.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.formats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.formats.is_empty()
    }

    /// Decode a raw frame with the format registered under `id`.
    ///
    /// # Errors
    ///
    /// Returns `Error::UnknownFormat` if nothing is registered under `id`,
    /// otherwise whatever the format's decode returns.
    pub fn decode(&self, id: FormatId, raw: u64, bit_count: u32) -> Result<CardFields> {
        self.get(id)
            .ok_or(Error::UnknownFormat(id))?
            .decode(raw, bit_count)
    }
}

impl Default for FormatRegistry {
    fn default() -> Self {
        let mut formats: BTreeMap<FormatId, Arc<dyn CardFormat>> = BTreeMap::new();
        formats.insert(FormatId::H10301, Arc::new(ParityLayout::H10301));
        formats.insert(FormatId::PROX36, Arc::new(ParityLayout::PROX36));
        Self { formats }
    }
}

impl fmt::Debug for FormatRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.formats.iter().map(|(id, format)| (id, format.name())))
            .finish()
    }
}
