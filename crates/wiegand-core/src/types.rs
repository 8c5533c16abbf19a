use crate::{Result, error::Error};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Card format identifier.
///
/// By convention the built-in formats use their bit width as identifier
/// (26, 36), and a format is inferred from the bit count when none is
/// requested. Custom formats may be registered under any identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FormatId(u32);

impl FormatId {
    /// HID H10301 26-bit proximity format.
    pub const H10301: FormatId = FormatId(26);

    /// 36-bit proximity format.
    pub const PROX36: FormatId = FormatId(36);

    #[must_use]
    pub const fn new(id: u32) -> Self {
        FormatId(id)
    }

    /// The identifier inferred for a frame of `bit_count` bits.
    #[must_use]
    pub const fn for_bit_count(bit_count: u32) -> Self {
        FormatId(bit_count)
    }

    #[must_use]
    pub fn as_u32(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for FormatId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for FormatId {
    fn from(id: u32) -> Self {
        FormatId(id)
    }
}

impl std::str::FromStr for FormatId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        s.trim()
            .parse::<u32>()
            .map(FormatId)
            .map_err(|_| Error::Config(format!("Invalid format id: {s}")))
    }
}

/// Fields extracted from a raw value by a successful format decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CardFields {
    /// Facility (site) code.
    pub facility: u64,

    /// Card number within the facility.
    pub number: u64,
}

impl CardFields {
    #[must_use]
    pub fn new(facility: u64, number: u64) -> Self {
        Self { facility, number }
    }
}

impl fmt::Display for CardFields {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}-{}", self.facility, self.number)
    }
}

/// Parity of `value`: `0` for an even number of set bits, `1` for odd.
#[inline]
#[must_use]
pub fn parity(value: u64) -> u32 {
    value.count_ones() % 2
}

/// Mask with the low `bits` bits set. Saturates at 64 bits.
#[inline]
#[must_use]
pub fn low_mask(bits: u32) -> u64 {
    if bits >= u64::BITS {
        u64::MAX
    } else {
        (1u64 << bits) - 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("26", 26)]
    #[case(" 36 ", 36)]
    #[case("8", 8)]
    fn test_format_id_valid(#[case] input: &str, #[case] expected: u32) {
        let id: FormatId = input.parse().unwrap();
        assert_eq!(id.as_u32(), expected);
    }

    #[rstest]
    #[case("")]
    #[case("-1")]
    #[case("abc")]
    fn test_format_id_invalid(#[case] input: &str) {
        let result: Result<FormatId> = input.parse();
        assert!(result.is_err());
    }

    #[test]
    fn test_format_id_inferred_from_bit_count() {
        assert_eq!(FormatId::for_bit_count(26), FormatId::H10301);
        assert_eq!(FormatId::for_bit_count(36), FormatId::PROX36);
        assert_eq!(FormatId::H10301.to_string(), "26");
    }

    #[rstest]
    #[case(0, 0)]
    #[case(0b1, 1)]
    #[case(0b11, 0)]
    #[case(0b1011, 1)]
    #[case(u64::MAX, 0)]
    fn test_parity(#[case] value: u64, #[case] expected: u32) {
        assert_eq!(parity(value), expected);
    }

    #[rstest]
    #[case(0, 0)]
    #[case(13, 0x1FFF)]
    #[case(18, 0x3FFFF)]
    #[case(64, u64::MAX)]
    #[case(80, u64::MAX)]
    fn test_low_mask(#[case] bits: u32, #[case] expected: u64) {
        assert_eq!(low_mask(bits), expected);
    }

    #[test]
    fn test_card_fields_display() {
        assert_eq!(CardFields::new(5, 1234).to_string(), "5-1234");
    }

    #[test]
    fn test_format_id_serializes_as_number() {
        let json = serde_json::to_string(&FormatId::H10301).unwrap();
        assert_eq!(json, "26");
    }
}
