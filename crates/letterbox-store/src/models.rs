//! Record types for the outbound queue, the inbox, and the merged message view.

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};

/// Outbound record status.
///
/// `Pending` and `Sent` are the fire-and-forget lifecycle. `Attempted`,
/// `Delivered` and `Failed` are only written under confirmed delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutboundStatus {
    Pending,
    Sent,
    Attempted,
    Delivered,
    Failed,
}

impl Default for OutboundStatus {
    fn default() -> Self {
        Self::Pending
    }
}

impl OutboundStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Sent => "sent",
            Self::Attempted => "attempted",
            Self::Delivered => "delivered",
            Self::Failed => "failed",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "sent" => Self::Sent,
            "attempted" => Self::Attempted,
            "delivered" => Self::Delivered,
            "failed" => Self::Failed,
            _ => Self::Pending,
        }
    }

    /// Whether the processor will never touch this record again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Sent | Self::Delivered | Self::Failed)
    }
}

/// A message queued by the store owner for a recipient.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundRecord {
    pub id: i64,
    pub recipient: String,
    pub payload: Vec<u8>,
    pub status: OutboundStatus,
    pub attempts: u32,
    pub last_attempt: DateTime<Utc>,
    pub last_error: Option<String>,
}

/// A message delivered into this store by some participant.
#[derive(Debug, Clone, PartialEq)]
pub struct InboxRecord {
    pub id: i64,
    pub sender: String,
    pub payload: Vec<u8>,
    pub received_at: DateTime<Utc>,
}

/// Which collection a [`Message`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Received,
    Sent,
}

/// Read model over both collections.
///
/// Serializes as `{id, type, user, content, status?, timestamp}` where
/// `content` is the payload decoded as UTF-8 (lossy) and `timestamp` is
/// fractional seconds since the Unix epoch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Message {
    pub id: i64,
    #[serde(rename = "type")]
    pub direction: Direction,
    /// Sender for received messages, recipient for sent ones.
    #[serde(rename = "user")]
    pub peer: String,
    #[serde(rename = "content", serialize_with = "serialize_lossy_utf8")]
    pub payload: Vec<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<OutboundStatus>,
    #[serde(serialize_with = "serialize_epoch_seconds")]
    pub timestamp: DateTime<Utc>,
}

impl Message {
    /// Payload decoded as UTF-8, replacing invalid sequences.
    pub fn content(&self) -> String {
        String::from_utf8_lossy(&self.payload).into_owned()
    }
}

impl From<InboxRecord> for Message {
    fn from(record: InboxRecord) -> Self {
        Self {
            id: record.id,
            direction: Direction::Received,
            peer: record.sender,
            payload: record.payload,
            status: None,
            timestamp: record.received_at,
        }
    }
}

impl From<OutboundRecord> for Message {
    fn from(record: OutboundRecord) -> Self {
        Self {
            id: record.id,
            direction: Direction::Sent,
            peer: record.recipient,
            payload: record.payload,
            status: Some(record.status),
            timestamp: record.last_attempt,
        }
    }
}

fn serialize_lossy_utf8<S: Serializer>(payload: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&String::from_utf8_lossy(payload))
}

fn serialize_epoch_seconds<S: Serializer>(
    timestamp: &DateTime<Utc>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(timestamp.timestamp_micros() as f64 / 1_000_000.0)
}

/// Timestamps are stored as integer microseconds since the Unix epoch.
pub(crate) fn to_micros(timestamp: DateTime<Utc>) -> i64 {
    timestamp.timestamp_micros()
}

pub(crate) fn from_micros(micros: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_micros(micros).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outbound_status_from_str() {
        assert_eq!(OutboundStatus::from_str("pending"), OutboundStatus::Pending);
        assert_eq!(OutboundStatus::from_str("SENT"), OutboundStatus::Sent);
        assert_eq!(
            OutboundStatus::from_str("attempted"),
            OutboundStatus::Attempted
        );
        assert_eq!(
            OutboundStatus::from_str("Delivered"),
            OutboundStatus::Delivered
        );
        assert_eq!(OutboundStatus::from_str("failed"), OutboundStatus::Failed);
        // Unknown values default to Pending
        assert_eq!(OutboundStatus::from_str("bogus"), OutboundStatus::Pending);
    }

    #[test]
    fn test_outbound_status_as_str_roundtrip() {
        for status in [
            OutboundStatus::Pending,
            OutboundStatus::Sent,
            OutboundStatus::Attempted,
            OutboundStatus::Delivered,
            OutboundStatus::Failed,
        ] {
            assert_eq!(OutboundStatus::from_str(status.as_str()), status);
        }
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(!OutboundStatus::Pending.is_terminal());
        assert!(!OutboundStatus::Attempted.is_terminal());
        assert!(OutboundStatus::Sent.is_terminal());
        assert!(OutboundStatus::Failed.is_terminal());
    }

    #[test]
    fn test_micros_roundtrip() {
        let micros = 1_700_000_000_123_456;
        assert_eq!(to_micros(from_micros(micros)), micros);
    }

    #[test]
    fn test_received_message_serializes_without_status() {
        let message = Message::from(InboxRecord {
            id: 3,
            sender: "alice".into(),
            payload: b"hi".to_vec(),
            received_at: from_micros(1_500_000),
        });
        let value = serde_json::to_value(&message).unwrap();
        assert_eq!(value["type"], "received");
        assert_eq!(value["user"], "alice");
        assert_eq!(value["content"], "hi");
        assert_eq!(value["timestamp"], 1.5);
        assert!(value.get("status").is_none());
    }

    #[test]
    fn test_sent_message_serializes_status() {
        let message = Message::from(OutboundRecord {
            id: 1,
            recipient: "bob".into(),
            payload: vec![0xff, b'a'],
            status: OutboundStatus::Sent,
            attempts: 1,
            last_attempt: from_micros(2_000_000),
            last_error: None,
        });
        let value = serde_json::to_value(&message).unwrap();
        assert_eq!(value["type"], "sent");
        assert_eq!(value["status"], "sent");
        assert_eq!(value["content"], "\u{fffd}a");
    }
}
