use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::room::RoomKey;

/// Author sentinel for server-generated membership messages. The
/// human-readable body still names the acting user.
pub const SYSTEM_AUTHOR: &str = "system";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Text,
    Image,
    System,
}

impl MessageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::Text => "text",
            MessageKind::Image => "image",
            MessageKind::System => "system",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "text" => Some(MessageKind::Text),
            "image" => Some(MessageKind::Image),
            "system" => Some(MessageKind::System),
            _ => None,
        }
    }
}

/// A persisted chat message. Immutable once stored; room order is
/// `created_at` ascending with insertion order as tiebreak.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: Uuid,
    pub group_id: String,
    pub channel: String,
    pub kind: MessageKind,
    pub author: String,
    pub body: String,
    pub author_avatar: Option<String>,
    /// Unix milliseconds, assigned by the store at append time.
    pub created_at: i64,
}

/// Everything the caller supplies; the store assigns `id` and `created_at`.
#[derive(Debug, Clone)]
pub struct MessageDraft {
    pub group_id: String,
    pub channel: String,
    pub kind: MessageKind,
    pub author: String,
    pub body: String,
    pub author_avatar: Option<String>,
}

impl MessageDraft {
    pub fn system(room: &RoomKey, body: String) -> Self {
        Self {
            group_id: room.group_id.clone(),
            channel: room.channel.clone(),
            kind: MessageKind::System,
            author: SYSTEM_AUTHOR.to_owned(),
            body,
            author_avatar: None,
        }
    }
}

pub(crate) fn now_unix_ms() -> i64 {
    (time::OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64
}
