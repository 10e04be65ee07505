//! Token and project identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of token ids reserved per project.
pub const TOKENS_PER_PROJECT: u64 = 1_000_000;

/// Identifier of one renderable artifact.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenId(u64);

impl TokenId {
    /// Create a token id from its numeric value.
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Parse from a decimal string.
    ///
    /// Only ASCII digits are accepted: no sign, no whitespace, no hex prefix.
    pub fn parse(s: &str) -> crate::Result<Self> {
        if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(crate::Error::InvalidTokenId(format!(
                "expected a non-negative integer, got {s:?}"
            )));
        }
        s.parse::<u64>()
            .map(Self)
            .map_err(|e| crate::Error::InvalidTokenId(format!("{s}: {e}")))
    }

    /// Get the numeric value.
    pub const fn value(&self) -> u64 {
        self.0
    }

    /// The project this token belongs to.
    pub const fn project_id(&self) -> ProjectId {
        ProjectId(self.0 / TOKENS_PER_PROJECT)
    }
}

impl From<u64> for TokenId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl fmt::Debug for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TokenId({})", self.0)
    }
}

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a project: a group of tokens sharing one program.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectId(u64);

impl ProjectId {
    /// Create a project id from its numeric value.
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Get the numeric value.
    pub const fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Debug for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ProjectId({})", self.0)
    }
}

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn project_id_is_integer_division() {
        assert_eq!(TokenId::new(12_000_001).project_id(), ProjectId::new(12));
        assert_eq!(TokenId::new(999_999).project_id(), ProjectId::new(0));
        assert_eq!(TokenId::new(1_000_000).project_id(), ProjectId::new(1));
        assert_eq!(TokenId::new(0).project_id(), ProjectId::new(0));
    }

    #[test]
    fn parse_accepts_decimal_digits() {
        assert_eq!(TokenId::parse("12000001").unwrap(), TokenId::new(12_000_001));
        assert_eq!(TokenId::parse("0").unwrap(), TokenId::new(0));
    }

    #[test]
    fn parse_rejects_non_numeric() {
        for input in ["", "-1", "+5", "12a", " 1", "0x10", "1.5"] {
            assert!(TokenId::parse(input).is_err(), "{input:?} should be rejected");
        }
    }

    #[test]
    fn parse_rejects_overflow() {
        let too_big = format!("{}0", u64::MAX);
        assert!(TokenId::parse(&too_big).is_err());
    }

    #[test]
    fn serializes_as_plain_number() {
        let json = serde_json::to_string(&TokenId::new(42)).unwrap();
        assert_eq!(json, "42");
    }
}
