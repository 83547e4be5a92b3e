//! Slot reference parsing and formatting.
//!
//! Provides bidirectional conversion between formula-text references
//! (e.g. "C0", "V12") and typed slot identifiers. Columns and variables
//! use disjoint prefixes, so a reference names exactly one namespace.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

/// A reference to a slot: a column (`C<id>`) or a variable (`V<id>`).
///
/// Ordering is Column-before-Variable, then ascending id; the scheduler
/// relies on this for deterministic tie-breaking.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
pub enum SlotRef {
    Column(u32),
    Variable(u32),
}

impl SlotRef {
    /// Parse a reference from formula notation (e.g. "C0", "V12").
    /// Returns None for anything else, including bare prefixes ("C"),
    /// mixed identifiers ("Cx", "Cell1"), and lowercase prefixes ("c1").
    pub fn parse(name: &str) -> Option<SlotRef> {
        let caps = slot_ref_re().captures(name)?;
        let id = caps[2].parse::<u32>().ok()?;
        match &caps[1] {
            "C" => Some(SlotRef::Column(id)),
            "V" => Some(SlotRef::Variable(id)),
            _ => None,
        }
    }

    pub fn id(&self) -> u32 {
        match self {
            SlotRef::Column(id) | SlotRef::Variable(id) => *id,
        }
    }

    pub fn is_column(&self) -> bool {
        matches!(self, SlotRef::Column(_))
    }

    pub fn is_variable(&self) -> bool {
        matches!(self, SlotRef::Variable(_))
    }
}

fn slot_ref_re() -> &'static Regex {
    static SLOT_RE: OnceLock<Regex> = OnceLock::new();
    SLOT_RE.get_or_init(|| Regex::new(r"^([CV])([0-9]+)$").expect("slot reference regex must compile"))
}

impl std::str::FromStr for SlotRef {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("Invalid slot reference: {}", s))
    }
}

impl fmt::Display for SlotRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlotRef::Column(id) => write!(f, "C{}", id),
            SlotRef::Variable(id) => write!(f, "V{}", id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::SlotRef;

    #[test]
    fn test_parse_column_and_variable() {
        assert_eq!(SlotRef::parse("C0"), Some(SlotRef::Column(0)));
        assert_eq!(SlotRef::parse("V12"), Some(SlotRef::Variable(12)));
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert_eq!(SlotRef::parse("C"), None);
        assert_eq!(SlotRef::parse("Cx"), None);
        assert_eq!(SlotRef::parse("c1"), None);
        assert_eq!(SlotRef::parse("X1"), None);
        assert_eq!(SlotRef::parse("C1x"), None);
        assert_eq!(SlotRef::parse(""), None);
    }

    #[test]
    fn test_parse_overflow_returns_none() {
        let huge = format!("C{}", "9".repeat(20));
        assert_eq!(SlotRef::parse(&huge), None);
    }

    #[test]
    fn test_display_roundtrip() {
        for slot in [SlotRef::Column(7), SlotRef::Variable(0)] {
            assert_eq!(SlotRef::parse(&slot.to_string()), Some(slot));
        }
    }

    #[test]
    fn test_ordering_is_column_first_then_id() {
        let mut slots = vec![SlotRef::Variable(0), SlotRef::Column(2), SlotRef::Column(1)];
        slots.sort();
        assert_eq!(
            slots,
            vec![SlotRef::Column(1), SlotRef::Column(2), SlotRef::Variable(0)]
        );
    }
}
