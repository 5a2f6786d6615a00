//! Participant identifiers.

use crate::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Recipient name that triggers a synthesized loop-back acknowledgment.
pub const RESERVED_LOOPBACK_ID: &str = "protocol_service";

/// A validated, lowercase participant identifier.
///
/// The identifier also names the participant's store file, so only
/// `[a-z0-9_.-]` is accepted and dot-only names are rejected.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ParticipantId(String);

impl ParticipantId {
    const MAX_LENGTH: usize = 64;

    /// Trim, lowercase, and validate a raw identifier.
    pub fn parse(raw: impl AsRef<str>) -> CoreResult<Self> {
        let id = raw.as_ref().trim().to_lowercase();
        Self::validate(&id)?;
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this is the reserved loop-back identifier.
    pub fn is_reserved_loopback(&self) -> bool {
        self.0 == RESERVED_LOOPBACK_ID
    }

    fn validate(id: &str) -> CoreResult<()> {
        if id.is_empty() {
            return Err(CoreError::InvalidParticipant(
                "participant id cannot be empty".into(),
            ));
        }
        if id.len() > Self::MAX_LENGTH {
            return Err(CoreError::InvalidParticipant(format!(
                "participant id exceeds {} characters",
                Self::MAX_LENGTH
            )));
        }
        if !id
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '_' | '-' | '.'))
        {
            return Err(CoreError::InvalidParticipant(format!(
                "participant id {:?} contains invalid characters (allowed: a-z, 0-9, _, -, .)",
                id
            )));
        }
        if id.chars().all(|c| c == '.') {
            return Err(CoreError::InvalidParticipant(format!(
                "participant id {:?} is not a valid name",
                id
            )));
        }
        Ok(())
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ParticipantId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ParticipantId {
    type Error = CoreError;

    fn try_from(value: String) -> CoreResult<Self> {
        Self::parse(value)
    }
}

impl From<ParticipantId> for String {
    fn from(value: ParticipantId) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_normalizes_case_and_whitespace() {
        let id = ParticipantId::parse("  Alice ").unwrap();
        assert_eq!(id.as_str(), "alice");
    }

    #[test]
    fn parse_rejects_empty() {
        assert!(ParticipantId::parse("   ").is_err());
    }

    #[test]
    fn parse_rejects_path_separators() {
        assert!(ParticipantId::parse("../bob").is_err());
        assert!(ParticipantId::parse("a/b").is_err());
        assert!(ParticipantId::parse("..").is_err());
    }

    #[test]
    fn parse_rejects_overlong() {
        let raw = "a".repeat(65);
        assert!(matches!(
            ParticipantId::parse(raw),
            Err(CoreError::InvalidParticipant(_))
        ));
    }

    #[test]
    fn reserved_loopback_is_case_insensitive() {
        assert!(ParticipantId::parse("Protocol_Service")
            .unwrap()
            .is_reserved_loopback());
        assert!(!ParticipantId::parse("bob").unwrap().is_reserved_loopback());
    }

    #[test]
    fn deserialize_validates() {
        let ok: ParticipantId = serde_json::from_str("\"Bob\"").unwrap();
        assert_eq!(ok.as_str(), "bob");
        assert!(serde_json::from_str::<ParticipantId>("\"bad id\"").is_err());
    }
}
