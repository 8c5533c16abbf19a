//! Common types shared across the reader.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the two Wiegand data lines.
///
/// A falling edge on DATA0 carries a `0` bit, a falling edge on DATA1
/// carries a `1` bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Line {
    /// Line A, bit value 0 (usually the green wire).
    Data0,

    /// Line B, bit value 1 (usually the white wire).
    Data1,
}

impl Line {
    /// Bit value carried by an edge on this line.
    #[must_use]
    pub fn bit(&self) -> bool {
        matches!(self, Self::Data1)
    }

    /// Line that carries the given bit value.
    #[must_use]
    pub fn for_bit(bit: bool) -> Self {
        if bit { Self::Data1 } else { Self::Data0 }
    }
}

impl fmt::Display for Line {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Data0 => write!(f, "DATA0"),
            Self::Data1 => write!(f, "DATA1"),
        }
    }
}
