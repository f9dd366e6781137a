//! Room codes: five alphanumeric characters, stored upper-case

use std::fmt;
use std::str::FromStr;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Number of characters in a room code
pub const ROOM_CODE_LEN: usize = 5;

const BASE36: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// A normalized room code
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RoomCode(String);

impl RoomCode {
    /// Generate a fresh code by sampling base-36 digits, then upper-casing
    pub fn generate<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let code: String = (0..ROOM_CODE_LEN)
            .map(|_| BASE36[rng.gen_range(0..BASE36.len())] as char)
            .collect();
        Self(code.to_ascii_uppercase())
    }

    /// Trim, upper-case and validate user or wire input
    pub fn parse(input: &str) -> Result<Self, CodeError> {
        let normalized = input.trim().to_ascii_uppercase();

        if normalized.chars().count() != ROOM_CODE_LEN {
            return Err(CodeError::Length(normalized.chars().count()));
        }
        if let Some(c) = normalized.chars().find(|c| !c.is_ascii_alphanumeric()) {
            return Err(CodeError::InvalidChar(c));
        }

        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for RoomCode {
    type Err = CodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for RoomCode {
    type Error = CodeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<RoomCode> for String {
    fn from(code: RoomCode) -> Self {
        code.0
    }
}

/// Room code validation errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodeError {
    #[error("Room code must be 5 characters, got {0}")]
    Length(usize),

    #[error("Room code contains invalid character {0:?}")]
    InvalidChar(char),
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn generated_codes_are_five_alphanumeric_chars() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..1000 {
            let code = RoomCode::generate(&mut rng);
            assert_eq!(code.as_str().len(), ROOM_CODE_LEN);
            assert!(code.as_str().chars().all(|c| c.is_ascii_alphanumeric()));
            assert!(!code.as_str().chars().any(|c| c.is_ascii_lowercase()));
        }
    }

    #[test]
    fn parse_normalizes_case_and_whitespace() {
        let code = RoomCode::parse("  ab3xz\n").unwrap();
        assert_eq!(code.as_str(), "AB3XZ");
        assert_eq!(code, "AB3XZ".parse().unwrap());
    }

    #[test]
    fn parse_rejects_wrong_length() {
        assert_eq!(RoomCode::parse("ABCD"), Err(CodeError::Length(4)));
        assert_eq!(RoomCode::parse("ABCDEF"), Err(CodeError::Length(6)));
        assert_eq!(RoomCode::parse(""), Err(CodeError::Length(0)));
    }

    #[test]
    fn parse_rejects_symbols() {
        assert_eq!(RoomCode::parse("AB-CD"), Err(CodeError::InvalidChar('-')));
    }

    #[test]
    fn deserializes_through_validation() {
        let code: RoomCode = serde_json::from_str("\"k9k9k\"").unwrap();
        assert_eq!(code.to_string(), "K9K9K");
        assert!(serde_json::from_str::<RoomCode>("\"nope\"").is_err());
    }
}
