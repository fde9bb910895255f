//! Per-connection protocol handling: validates join/send/leave requests,
//! drives the presence tracker, router, and store, and emits events back to
//! clients through their outbound sinks.
//!
//! Each connection owns one [`Session`] and processes its commands in the
//! order received; different connections run in parallel against the shared
//! gateway.

pub mod protocol;
pub mod ws;

use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

use crate::error::ChatError;
use crate::history;
use crate::message::{now_unix_ms, Message, MessageDraft, MessageKind};
use crate::presence::{PresenceTracker, SessionId};
use crate::room::RoomKey;
use crate::router::{EventSink, RoomRouter};
use crate::store::{MessageStore, DEFAULT_HISTORY_LIMIT};

use protocol::{ClientCommand, PresenceKind, ServerEvent};

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub history_limit: u32,
    pub storage_timeout: Duration,
    /// Whether join/leave system messages are written to the store. On by
    /// default so history replay includes membership events.
    pub persist_system_messages: bool,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            history_limit: DEFAULT_HISTORY_LIMIT,
            storage_timeout: Duration::from_secs(5),
            persist_system_messages: true,
        }
    }
}

/// State of one client connection. Created on connect, destroyed on
/// disconnect; the username binds on the first join.
pub struct Session {
    pub id: SessionId,
    pub username: Option<String>,
    sink: EventSink,
}

impl Session {
    pub fn new(sink: EventSink) -> Self {
        Self {
            id: Uuid::now_v7(),
            username: None,
            sink,
        }
    }

    /// Unicast to this session. The receiver half being gone just means the
    /// connection is already on its way out.
    pub fn emit(&self, event: ServerEvent) {
        if self.sink.send(event).is_err() {
            tracing::debug!(session = %self.id, "event sink closed");
        }
    }
}

pub struct Gateway<S> {
    store: Arc<S>,
    presence: PresenceTracker,
    router: RoomRouter,
    cfg: GatewayConfig,
}

impl<S: MessageStore> Gateway<S> {
    pub fn new(store: Arc<S>, cfg: GatewayConfig) -> Self {
        Self {
            store,
            presence: PresenceTracker::new(),
            router: RoomRouter::new(),
            cfg,
        }
    }

    pub fn presence(&self) -> &PresenceTracker {
        &self.presence
    }

    pub fn router(&self) -> &RoomRouter {
        &self.router
    }

    pub async fn handle(&self, session: &mut Session, cmd: ClientCommand) -> Result<(), ChatError> {
        match cmd {
            ClientCommand::Join {
                group_id,
                channel,
                username,
            } => self.join(session, &group_id, &channel, &username).await,
            ClientCommand::Send {
                group_id,
                channel,
                username,
                kind,
                body,
                avatar,
            } => {
                self.send(session, &group_id, &channel, &username, kind, body, avatar)
                    .await
            }
            ClientCommand::Leave {
                group_id,
                channel,
                username,
            } => self.leave(session, &group_id, &channel, &username).await,
        }
    }

    /// Join order matters: subscribe before the history read so nothing
    /// appended after subscription is missed, and replay before the join
    /// announcement so the joiner never sees its own join inside the
    /// history window.
    async fn join(
        &self,
        session: &mut Session,
        group_id: &str,
        channel: &str,
        username: &str,
    ) -> Result<(), ChatError> {
        let room = RoomKey::new(group_id, channel)?;
        let username = require_username(username)?;
        if session.username.is_none() {
            session.username = Some(username.to_owned());
        }

        if !self.presence.join(session.id, room.clone()) {
            // Already a member: refresh the sink, but no second replay and
            // no duplicate join announcement.
            self.router.subscribe(session.id, &room, session.sink.clone());
            return Ok(());
        }
        self.router.subscribe(session.id, &room, session.sink.clone());

        history::replay(
            &*self.store,
            &session.sink,
            &room,
            self.cfg.history_limit,
            self.cfg.storage_timeout,
        )
        .await?;

        tracing::info!(session = %session.id, %room, username, "joined room");
        self.announce(&room, PresenceKind::Joined, username).await
    }

    async fn send(
        &self,
        session: &Session,
        group_id: &str,
        channel: &str,
        username: &str,
        kind: MessageKind,
        body: String,
        avatar: Option<String>,
    ) -> Result<(), ChatError> {
        let room = RoomKey::new(group_id, channel)?;
        let username = require_username(username)?;
        if !self.presence.is_member(session.id, &room) {
            return Err(ChatError::NotAMember(room));
        }
        match kind {
            MessageKind::Text if body.trim().is_empty() => {
                return Err(ChatError::Validation("message body must not be empty".into()));
            }
            MessageKind::Image if body.trim().is_empty() => {
                return Err(ChatError::Validation("image reference missing".into()));
            }
            MessageKind::System => {
                return Err(ChatError::Validation(
                    "system messages are server-generated".into(),
                ));
            }
            _ => {}
        }

        let stored = self
            .append_timed(MessageDraft {
                group_id: room.group_id.clone(),
                channel: room.channel.clone(),
                kind,
                author: username.to_owned(),
                body,
                author_avatar: avatar,
            })
            .await?;

        tracing::debug!(session = %session.id, %room, id = %stored.id, "message persisted");
        self.router.broadcast(&room, ServerEvent::Message { message: stored });
        Ok(())
    }

    async fn leave(
        &self,
        session: &Session,
        group_id: &str,
        channel: &str,
        username: &str,
    ) -> Result<(), ChatError> {
        let room = RoomKey::new(group_id, channel)?;
        let username = require_username(username)?;

        let was_member = self.presence.leave(session.id, &room);
        self.router.unsubscribe(session.id, &room);
        if !was_member {
            return Ok(());
        }

        tracing::info!(session = %session.id, %room, username, "left room");
        self.announce(&room, PresenceKind::Left, username).await
    }

    /// Transport-driven teardown. Membership cleanup always completes; the
    /// leave announcements are best-effort, so a failing store cannot wedge
    /// the disconnect path.
    pub async fn disconnect(&self, session: &Session) {
        let username = session.username.clone().unwrap_or_default();
        for room in self.presence.drop_session(session.id) {
            self.router.unsubscribe(session.id, &room);
            if username.is_empty() {
                continue;
            }
            if let Err(err) = self.announce(&room, PresenceKind::Left, &username).await {
                tracing::warn!(
                    session = %session.id, %room, error = %err,
                    "leave announcement failed during disconnect"
                );
            }
        }
    }

    /// Persists a system membership message (unless configured off) and
    /// broadcasts the matching presence event to the room.
    async fn announce(
        &self,
        room: &RoomKey,
        kind: PresenceKind,
        username: &str,
    ) -> Result<(), ChatError> {
        let verb = match kind {
            PresenceKind::Joined => "joined",
            PresenceKind::Left => "left",
        };
        let text = format!("{username} {verb} {}", room.channel);

        let timestamp = if self.cfg.persist_system_messages {
            self.append_timed(MessageDraft::system(room, text.clone()))
                .await?
                .created_at
        } else {
            now_unix_ms()
        };

        self.router.broadcast(
            room,
            ServerEvent::Presence {
                kind,
                username: username.to_owned(),
                channel: room.channel.clone(),
                text,
                timestamp,
            },
        );
        Ok(())
    }

    async fn append_timed(&self, draft: MessageDraft) -> Result<Message, ChatError> {
        tokio::time::timeout(self.cfg.storage_timeout, self.store.append(draft))
            .await
            .map_err(|_| ChatError::StorageTimeout(self.cfg.storage_timeout))?
            .map_err(ChatError::from)
    }
}

fn require_username(username: &str) -> Result<&str, ChatError> {
    let username = username.trim();
    if username.is_empty() {
        return Err(ChatError::Validation("username must not be empty".into()));
    }
    Ok(username)
}
