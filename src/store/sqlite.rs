use std::future::Future;

use sqlx::SqlitePool;
use uuid::Uuid;

use crate::error::StoreError;
use crate::message::{now_unix_ms, Message, MessageDraft, MessageKind};
use crate::room::RoomKey;
use crate::store::MessageStore;

pub struct SqliteMessageStore {
    pool: SqlitePool,
}

impl SqliteMessageStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS messages (
                id TEXT PRIMARY KEY,
                group_id TEXT NOT NULL,
                channel TEXT NOT NULL,
                kind TEXT NOT NULL,
                author TEXT NOT NULL,
                body TEXT NOT NULL,
                author_avatar TEXT,
                created_at INTEGER NOT NULL
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(StoreError::Unavailable)?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_messages_room_time
             ON messages (group_id, channel, created_at)",
        )
        .execute(&self.pool)
        .await
        .map_err(StoreError::Unavailable)?;

        Ok(())
    }
}

impl MessageStore for SqliteMessageStore {
    fn append(
        &self,
        draft: MessageDraft,
    ) -> impl Future<Output = Result<Message, StoreError>> + Send {
        async move {
            let id = Uuid::now_v7();
            let created_at = now_unix_ms();

            sqlx::query(
                "INSERT INTO messages (id,group_id,channel,kind,author,body,author_avatar,created_at)
                 VALUES (?,?,?,?,?,?,?,?)",
            )
            .bind(id.to_string())
            .bind(&draft.group_id)
            .bind(&draft.channel)
            .bind(draft.kind.as_str())
            .bind(&draft.author)
            .bind(&draft.body)
            .bind(&draft.author_avatar)
            .bind(created_at)
            .execute(&self.pool)
            .await
            .map_err(StoreError::Unavailable)?;

            Ok(Message {
                id,
                group_id: draft.group_id,
                channel: draft.channel,
                kind: draft.kind,
                author: draft.author,
                body: draft.body,
                author_avatar: draft.author_avatar,
                created_at,
            })
        }
    }

    fn recent(
        &self,
        room: &RoomKey,
        limit: u32,
    ) -> impl Future<Output = Result<Vec<Message>, StoreError>> + Send {
        async move {
            // Newest first off the room/time index, then flipped so the
            // caller can replay oldest first. rowid breaks same-millisecond
            // ties in insertion order.
            let rows: Vec<(String, String, String, String, Option<String>, i64)> = sqlx::query_as(
                "SELECT id,kind,author,body,author_avatar,created_at FROM messages
                 WHERE group_id=? AND channel=?
                 ORDER BY created_at DESC, rowid DESC LIMIT ?",
            )
            .bind(&room.group_id)
            .bind(&room.channel)
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(StoreError::Unavailable)?;

            let mut messages = rows
                .into_iter()
                .map(|(id, kind, author, body, author_avatar, created_at)| {
                    Ok(Message {
                        id: Uuid::parse_str(&id)
                            .map_err(|e| StoreError::Corrupt(format!("message id {id}: {e}")))?,
                        group_id: room.group_id.clone(),
                        channel: room.channel.clone(),
                        kind: MessageKind::parse(&kind)
                            .ok_or_else(|| StoreError::Corrupt(format!("unknown kind {kind}")))?,
                        author,
                        body,
                        author_avatar,
                        created_at,
                    })
                })
                .collect::<Result<Vec<_>, StoreError>>()?;
            messages.reverse();
            Ok(messages)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn test_store() -> SqliteMessageStore {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        let store = SqliteMessageStore::new(pool);
        store.migrate().await.unwrap();
        store
    }

    fn draft(room: &RoomKey, body: &str) -> MessageDraft {
        MessageDraft {
            group_id: room.group_id.clone(),
            channel: room.channel.clone(),
            kind: MessageKind::Text,
            author: "alice".into(),
            body: body.into(),
            author_avatar: None,
        }
    }

    #[tokio::test]
    async fn append_returns_stored_record() {
        let store = test_store().await;
        let room = RoomKey::new("g1", "general").unwrap();

        let stored = store.append(draft(&room, "hi")).await.unwrap();
        assert_eq!(stored.body, "hi");
        assert!(stored.created_at > 0);

        let recent = store.recent(&room, 50).await.unwrap();
        assert_eq!(recent, vec![stored]);
    }

    #[tokio::test]
    async fn recent_is_ascending_and_limit_takes_the_tail() {
        let store = test_store().await;
        let room = RoomKey::new("g1", "general").unwrap();
        for i in 0..5 {
            store.append(draft(&room, &format!("m{i}"))).await.unwrap();
        }

        let all = store.recent(&room, 50).await.unwrap();
        let bodies: Vec<_> = all.iter().map(|m| m.body.as_str()).collect();
        assert_eq!(bodies, ["m0", "m1", "m2", "m3", "m4"]);
        assert!(all.windows(2).all(|w| w[0].created_at <= w[1].created_at));

        // A smaller limit returns the most recent tail of the larger result.
        let tail = store.recent(&room, 2).await.unwrap();
        assert_eq!(tail.as_slice(), &all[3..]);
    }

    #[tokio::test]
    async fn rooms_are_isolated() {
        let store = test_store().await;
        let general = RoomKey::new("g1", "general").unwrap();
        let random = RoomKey::new("g1", "random").unwrap();
        let other_group = RoomKey::new("g2", "general").unwrap();

        store.append(draft(&general, "a")).await.unwrap();
        store.append(draft(&random, "b")).await.unwrap();

        let msgs = store.recent(&general, 50).await.unwrap();
        assert_eq!(msgs.len(), 1);
        assert_eq!(msgs[0].body, "a");
        assert!(store.recent(&other_group, 50).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn avatar_round_trips() {
        let store = test_store().await;
        let room = RoomKey::new("g1", "general").unwrap();
        let mut d = draft(&room, "pic");
        d.kind = MessageKind::Image;
        d.body = "img://42".into();
        d.author_avatar = Some("http://localhost/avatars/alice.png".into());

        store.append(d).await.unwrap();
        let msgs = store.recent(&room, 50).await.unwrap();
        assert_eq!(msgs[0].kind, MessageKind::Image);
        assert_eq!(
            msgs[0].author_avatar.as_deref(),
            Some("http://localhost/avatars/alice.png")
        );
    }
}
