//! Wire types for the persistent client connection. Field names follow the
//! original camelCase client contract.

use serde::{Deserialize, Serialize};

use crate::error::{ChatError, ErrorCode};
use crate::message::{Message, MessageKind};

/// Inbound client requests, tagged by `op`. Disconnect is implicit
/// (transport-driven), not a command.
#[derive(Debug, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum ClientCommand {
    #[serde(rename_all = "camelCase")]
    Join {
        group_id: String,
        channel: String,
        username: String,
    },
    #[serde(rename_all = "camelCase")]
    Send {
        group_id: String,
        channel: String,
        username: String,
        kind: MessageKind,
        #[serde(default)]
        body: String,
        #[serde(default)]
        avatar: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    Leave {
        group_id: String,
        channel: String,
        username: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PresenceKind {
    Joined,
    Left,
}

/// Outbound events, tagged by `event`. `History` is unicast to the joining
/// session as one batch; the rest are room broadcasts or per-session errors.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum ServerEvent {
    History {
        messages: Vec<Message>,
    },
    Message {
        message: Message,
    },
    Presence {
        #[serde(rename = "type")]
        kind: PresenceKind,
        username: String,
        channel: String,
        text: String,
        timestamp: i64,
    },
    Error {
        code: ErrorCode,
        message: String,
    },
}

impl ServerEvent {
    pub fn error(err: &ChatError) -> Self {
        ServerEvent::Error {
            code: err.code(),
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_camel_case_commands() {
        let cmd: ClientCommand = serde_json::from_str(
            r#"{"op":"send","groupId":"g1","channel":"general","username":"alice",
                "kind":"image","body":"img://42","avatar":"http://x/a.png"}"#,
        )
        .unwrap();
        match cmd {
            ClientCommand::Send { group_id, kind, body, avatar, .. } => {
                assert_eq!(group_id, "g1");
                assert_eq!(kind, MessageKind::Image);
                assert_eq!(body, "img://42");
                assert_eq!(avatar.as_deref(), Some("http://x/a.png"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn serializes_presence_event_shape() {
        let event = ServerEvent::Presence {
            kind: PresenceKind::Joined,
            username: "alice".into(),
            channel: "general".into(),
            text: "alice joined general".into(),
            timestamp: 1700000000000,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "presence");
        assert_eq!(json["type"], "joined");
        assert_eq!(json["text"], "alice joined general");
    }
}
