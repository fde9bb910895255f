//! One-time delivery of recent persisted messages to a newly joined session.

use std::time::Duration;

use crate::error::ChatError;
use crate::gateway::protocol::ServerEvent;
use crate::room::RoomKey;
use crate::router::EventSink;
use crate::store::MessageStore;

/// Reads the recent window and hands it to the joining session as a single
/// `history` batch, so the client renders it atomically before any live
/// broadcasts interleave. The caller subscribes the session first, so a
/// message appended after this read is delivered live rather than lost.
pub async fn replay<S: MessageStore>(
    store: &S,
    sink: &EventSink,
    room: &RoomKey,
    limit: u32,
    deadline: Duration,
) -> Result<(), ChatError> {
    let messages = tokio::time::timeout(deadline, store.recent(room, limit))
        .await
        .map_err(|_| ChatError::StorageTimeout(deadline))??;
    let _ = sink.send(ServerEvent::History { messages });
    Ok(())
}
