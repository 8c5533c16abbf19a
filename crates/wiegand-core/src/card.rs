//! Card record produced by one completed Wiegand frame.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

use crate::format::FormatRegistry;
use crate::types::{CardFields, FormatId};
use crate::{Error, Result};

/// Fields set by the last successful parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
struct Parsed {
    format_id: FormatId,
    fields: CardFields,
}

/// One card read, as received from the reader.
///
/// The raw value and bit count are fixed at construction. Parsing fills in
/// the facility code, card number and format id together. After a failed
/// parse none of them are set, so a record never mixes fields from two
/// formats.
///
/// # Examples
///
/// ```
/// use wiegand_core::{CardRecord, FormatId};
///
/// // Facility 5, card 1234 in H10301
/// let mut card = CardRecord::new(0x00A09A4, 26);
/// assert!(card.parse(None));
/// assert_eq!(card.facility(), Some(5));
/// assert_eq!(card.number(), Some(1234));
/// assert_eq!(card.format_id(), Some(FormatId::H10301));
/// assert_eq!(card.to_string(), "5-1234");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardRecord {
    raw_value: u64,
    bit_count: u32,
    received_at: DateTime<Utc>,
    parsed: Option<Parsed>,
}

impl CardRecord {
    /// Create an unparsed record stamped with the current time.
    pub fn new(raw_value: u64, bit_count: u32) -> Self {
        Self {
            raw_value,
            bit_count,
            received_at: Utc::now(),
            parsed: None,
        }
    }

    /// Replace the completion timestamp, for replaying recorded reads.
    #[must_use]
    pub fn with_received_at(mut self, received_at: DateTime<Utc>) -> Self {
        self.received_at = received_at;
        self
    }

    /// Bits received, first bit in the highest position.
    #[must_use]
    pub fn raw_value(&self) -> u64 {
        self.raw_value
    }

    #[must_use]
    pub fn bit_count(&self) -> u32 {
        self.bit_count
    }

    #[must_use]
    pub fn received_at(&self) -> DateTime<Utc> {
        self.received_at
    }

    #[must_use]
    pub fn facility(&self) -> Option<u64> {
        self.parsed.map(|p| p.fields.facility)
    }

    #[must_use]
    pub fn number(&self) -> Option<u64> {
        self.parsed.map(|p| p.fields.number)
    }

    #[must_use]
    pub fn format_id(&self) -> Option<FormatId> {
        self.parsed.map(|p| p.format_id)
    }

    #[must_use]
    pub fn fields(&self) -> Option<CardFields> {
        self.parsed.map(|p| p.fields)
    }

    /// Whether the last parse attempt succeeded.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.parsed.is_some()
    }

    /// The received bits as a `0`/`1` string, first bit on the left.
    ///
    /// ```
    /// use wiegand_core::CardRecord;
    ///
    /// assert_eq!(CardRecord::new(0b0101, 6).bits_string(), "000101");
    /// ```
    #[must_use]
    pub fn bits_string(&self) -> String {
        // Frames longer than 64 bits only kept their last 64; the rest pad as zeros.
        format!("{:0width$b}", self.raw_value, width = self.bit_count as usize)
    }

    /// Parse against the built-in formats.
    ///
    /// See [`parse_with`](Self::parse_with).
    pub fn parse(&mut self, format: Option<FormatId>) -> bool {
        self.parse_with(FormatRegistry::builtin(), format)
    }

    /// Apply a card format and report whether it succeeded.
    ///
    /// - With no `format` and a record that is already valid, nothing is
    ///   recomputed and `true` is returned.
    /// - With the `format` that is already applied, the current validity is
    ///   returned without recomputing.
    /// - Otherwise the derived fields are cleared and the format (inferred
    ///   from the bit count when `None`) is applied. Unknown formats and
    ///   parity failures return `false` and leave the record unparsed.
    pub fn parse_with(&mut self, registry: &FormatRegistry, format: Option<FormatId>) -> bool {
        self.try_parse_with(registry, format).is_ok()
    }

    /// Like [`parse`](Self::parse), but returns the reason for a failure.
    ///
    /// # Errors
    ///
    /// Returns `Error::UnknownFormat` when no format is registered for the
    /// resolved id, or the format's own error on a bit count or parity
    /// mismatch.
    pub fn try_parse(&mut self, format: Option<FormatId>) -> Result<CardFields> {
        self.try_parse_with(FormatRegistry::builtin(), format)
    }

    /// Like [`parse_with`](Self::parse_with), but returns the reason for a failure.
    ///
    /// # Errors
    ///
    /// See [`try_parse`](Self::try_parse).
    pub fn try_parse_with(
        &mut self,
        registry: &FormatRegistry,
        format: Option<FormatId>,
    ) -> Result<CardFields> {
        if let Some(parsed) = self.parsed
            && format.is_none_or(|id| id == parsed.format_id)
        {
            return Ok(parsed.fields);
        }

        let id = format.unwrap_or_else(|| FormatId::for_bit_count(self.bit_count));
        self.parsed = None;

        match registry.decode(id, self.raw_value, self.bit_count) {
            Ok(fields) => {
                self.parsed = Some(Parsed {
                    format_id: id,
                    fields,
                });
                Ok(fields)
            }
            Err(e) => {
                debug!(
                    format = %id,
                    raw = self.raw_value,
                    bits = self.bit_count,
                    error = %e,
                    "Card parse failed"
                );
                Err(e)
            }
        }
    }

    /// Clear the derived fields, as if the record had never been parsed.
    pub fn reset(&mut self) {
        self.parsed = None;
    }
}

impl fmt::Display for CardRecord {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.parsed {
            Some(parsed) => write!(f, "{}", parsed.fields),
            None => write!(f, "{}", self.raw_value),
        }
    }
}

impl TryFrom<&CardRecord> for CardFields {
    type Error = Error;

    /// Fields of an already-parsed record.
    fn try_from(card: &CardRecord) -> Result<Self> {
        card.fields()
            .ok_or_else(|| Error::UnknownFormat(FormatId::for_bit_count(card.bit_count)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::ParityLayout;
    use chrono::TimeZone;

    fn h10301(facility: u64, number: u64) -> CardRecord {
        CardRecord::new(ParityLayout::H10301.encode(facility, number).unwrap(), 26)
    }

    fn prox36(facility: u64, number: u64) -> CardRecord {
        CardRecord::new(ParityLayout::PROX36.encode(facility, number).unwrap(), 36)
    }

    fn assert_unset(card: &CardRecord) {
        assert!(!card.is_valid());
        assert_eq!(card.facility(), None);
        assert_eq!(card.number(), None);
        assert_eq!(card.format_id(), None);
    }

    #[test]
    fn test_new_record_is_unparsed() {
        let card = CardRecord::new(12345, 26);
        assert_eq!(card.raw_value(), 12345);
        assert_eq!(card.bit_count(), 26);
        assert_unset(&card);
        assert_eq!(card.to_string(), "12345");
    }

    #[test]
    fn test_parse_h10301_inferred() {
        let mut card = h10301(5, 1234);
        assert!(card.parse(None));
        assert_eq!(card.facility(), Some(5));
        assert_eq!(card.number(), Some(1234));
        assert_eq!(card.format_id(), Some(FormatId::H10301));
        assert_eq!(card.to_string(), "5-1234");
    }

    #[test]
    fn test_parse_prox36_inferred() {
        let mut card = prox36(12000, 987654);
        assert!(card.parse(None));
        assert_eq!(card.facility(), Some(12000));
        assert_eq!(card.number(), Some(987654));
        assert_eq!(card.format_id(), Some(FormatId::PROX36));
    }

    #[test]
    fn test_parse_flipped_parity_bit_leaves_unset() {
        let raw = ParityLayout::H10301.encode(5, 1234).unwrap() ^ (1 << 25);
        let mut card = CardRecord::new(raw, 26);
        assert!(!card.parse(None));
        assert_unset(&card);
        assert_eq!(card.to_string(), raw.to_string());
    }

    #[test]
    fn test_parse_unregistered_bit_count() {
        let mut card = CardRecord::new(0xA5, 8);
        assert!(!card.parse(None));
        assert_unset(&card);
        assert_eq!(card.try_parse(None), Err(Error::UnknownFormat(FormatId::new(8))));
    }

    #[test]
    fn test_parse_valid_record_without_format_is_noop() {
        let mut card = h10301(7, 42);
        assert!(card.parse(None));
        assert!(card.parse(None));
        assert_eq!(card.fields(), Some(CardFields::new(7, 42)));
    }

    #[test]
    fn test_parse_same_explicit_format_is_idempotent() {
        let mut card = h10301(200, 60000);
        let first = card.parse(Some(FormatId::H10301));
        let fields = card.fields();
        let second = card.parse(Some(FormatId::H10301));
        assert!(first && second);
        assert_eq!(card.fields(), fields);

        let mut bad = CardRecord::new(1, 26);
        assert!(!bad.parse(Some(FormatId::H10301)));
        assert!(!bad.parse(Some(FormatId::H10301)));
        assert_unset(&bad);
    }

    #[test]
    fn test_reparse_with_other_format_resets_fields() {
        let mut card = h10301(5, 1234);
        assert!(card.parse(None));

        assert!(!card.parse(Some(FormatId::PROX36)));
        assert_unset(&card);

        assert!(card.parse(Some(FormatId::H10301)));
        assert_eq!(card.fields(), Some(CardFields::new(5, 1234)));
    }

    #[test]
    fn test_parse_with_custom_registry() {
        let alt = ParityLayout::new("Alt 26", 26, 10, 14).unwrap();
        let registry = FormatRegistry::new()
            .with_format(FormatId::new(2600), alt)
            .unwrap();

        let mut card = CardRecord::new(alt.encode(1000, 9999).unwrap(), 26);
        assert!(!card.parse_with(&registry, None));
        assert!(card.parse_with(&registry, Some(FormatId::new(2600))));
        assert_eq!(card.facility(), Some(1000));
        assert_eq!(card.format_id(), Some(FormatId::new(2600)));
    }

    #[test]
    fn test_try_parse_reports_reason() {
        let raw = ParityLayout::H10301.encode(5, 1234).unwrap() ^ 1;
        let mut card = CardRecord::new(raw, 26);
        let err = card.try_parse(None).unwrap_err();
        assert!(err.is_parity());
    }

    #[test]
    fn test_reset_clears_fields() {
        let mut card = h10301(1, 2);
        assert!(card.parse(None));
        card.reset();
        assert_unset(&card);
    }

    #[test]
    fn test_bits_string() {
        let card = CardRecord::new(0b1011, 4);
        assert_eq!(card.bits_string(), "1011");

        let card = CardRecord::new(0b1, 3);
        assert_eq!(card.bits_string(), "001");

        let card = CardRecord::new(u64::MAX, 66);
        assert_eq!(card.bits_string(), format!("00{}", "1".repeat(64)));
    }

    #[test]
    fn test_fields_try_from() {
        let mut card = h10301(3, 4);
        assert!(CardFields::try_from(&card).is_err());
        card.parse(None);
        assert_eq!(CardFields::try_from(&card), Ok(CardFields::new(3, 4)));
    }

    #[test]
    fn test_serialization_roundtrip() {
        let ts = Utc.with_ymd_and_hms(2025, 10, 5, 12, 46, 6).unwrap();
        let mut card = h10301(5, 1234).with_received_at(ts);
        card.parse(None);

        let json = serde_json::to_string(&card).unwrap();
        let restored: CardRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, card);
        assert_eq!(restored.received_at(), ts);
    }
}
