use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Lifecycle status of a customer. Customers are never hard-deleted;
/// archival is a status change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CustomerStatus {
    Active,
    Blocked,
    Archived,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Customer {
    pub id: Uuid,
    /// Unique key: exactly one customer per phone number.
    #[serde(rename = "phoneNumber")]
    pub phone_number: String,
    pub name: String,
    /// Flips true→false exactly once, on the first successful auto-reply.
    #[serde(rename = "isNew")]
    pub is_new: bool,
    pub status: CustomerStatus,
    #[serde(rename = "firstMessageAt")]
    pub first_message_at: DateTime<Utc>,
    #[serde(rename = "lastMessageAt")]
    pub last_message_at: DateTime<Utc>,
    #[serde(rename = "messageCount")]
    pub message_count: u64,
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
}

impl Customer {
    pub fn new(phone_number: String, name: String, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            phone_number,
            name,
            is_new: true,
            status: CustomerStatus::Active,
            first_message_at: now,
            last_message_at: now,
            message_count: 0,
            metadata: HashMap::new(),
        }
    }
}

/// Message direction relative to the business account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Incoming,
    Outgoing,
}

/// Delivery status. Transitions are monotonic:
/// pending → sent → delivered → read, or → failed; never backward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    Pending,
    Sent,
    Delivered,
    Read,
    Failed,
}

impl MessageStatus {
    fn rank(self) -> u8 {
        match self {
            Self::Pending => 0,
            Self::Sent => 1,
            Self::Delivered => 2,
            Self::Read => 3,
            Self::Failed => 4,
        }
    }

    /// Whether moving to `next` preserves the monotonic ordering.
    /// `Failed` is terminal; equal-status updates are not advances.
    pub fn can_advance_to(self, next: Self) -> bool {
        if self == Self::Failed {
            return false;
        }
        if next == Self::Failed {
            return true;
        }
        next.rank() > self.rank()
    }

    /// Parse a platform status string ("sent", "delivered", "read", "failed").
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "sent" => Some(Self::Sent),
            "delivered" => Some(Self::Delivered),
            "read" => Some(Self::Read),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Text,
    Image,
    Audio,
    Video,
    Document,
    Other,
}

/// A persisted message. Content is immutable after creation; only the
/// status field is updated in place by later status events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    #[serde(rename = "customerId")]
    pub customer_id: Uuid,
    /// The messaging platform's own id, distinct from our internal id.
    /// Unique per direction; used for idempotent status updates.
    #[serde(rename = "channelMessageId")]
    pub channel_message_id: String,
    pub direction: Direction,
    #[serde(rename = "contentType")]
    pub content_type: ContentType,
    pub content: String,
    pub status: MessageStatus,
    #[serde(rename = "isAutoReply")]
    pub is_auto_reply: bool,
    pub timestamp: DateTime<Utc>,
    /// Channel message id this message replies to, if any.
    #[serde(rename = "replyTo")]
    pub reply_to: Option<String>,
}

/// Insert-shaped record handed to the ledger; id and creation timestamp
/// are assigned on append.
#[derive(Debug, Clone)]
pub struct NewMessage {
    pub customer_id: Uuid,
    pub channel_message_id: String,
    pub direction: Direction,
    pub content_type: ContentType,
    pub content: String,
    pub status: MessageStatus,
    pub is_auto_reply: bool,
    pub reply_to: Option<String>,
}
