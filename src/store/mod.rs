//! Durable, ordered message log keyed by (group, channel).

mod sqlite;

use std::future::Future;

pub use sqlite::SqliteMessageStore;

use crate::error::StoreError;
use crate::message::{Message, MessageDraft};
use crate::room::RoomKey;

pub const DEFAULT_HISTORY_LIMIT: u32 = 50;

/// Append-only message log. The gateway is generic over this so tests can
/// script storage faults; no update or delete is exposed here.
pub trait MessageStore: Send + Sync + 'static {
    /// Assigns id and timestamp, writes durably, returns the stored record.
    fn append(
        &self,
        draft: MessageDraft,
    ) -> impl Future<Output = Result<Message, StoreError>> + Send;

    /// Up to `limit` most recent messages for the room, oldest first, ready
    /// for direct replay to a client.
    fn recent(
        &self,
        room: &RoomKey,
        limit: u32,
    ) -> impl Future<Output = Result<Vec<Message>, StoreError>> + Send;
}
