//! Read-only HTTP feed over the same message log the replay uses.

use std::sync::Arc;

use axum::debug_handler;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;

use crate::room::RoomKey;
use crate::store::{MessageStore, SqliteMessageStore, DEFAULT_HISTORY_LIMIT};
use crate::AppResult;

const MAX_FEED_LIMIT: u32 = 500;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentQuery {
    #[serde(default)]
    group_id: String,
    #[serde(default)]
    channel: String,
    limit: Option<u32>,
}

/// `GET /api/messages?groupId=..&channel=..&limit=..`: ascending recent
/// window for a room, same shape as the `history` event payload.
#[debug_handler(state = crate::AppState)]
pub async fn recent_messages(
    State(store): State<Arc<SqliteMessageStore>>,
    Query(query): Query<RecentQuery>,
) -> AppResult<Response> {
    let Ok(room) = RoomKey::new(&query.group_id, &query.channel) else {
        return Ok((
            StatusCode::BAD_REQUEST,
            "groupId and channel are required",
        )
            .into_response());
    };
    let limit = query
        .limit
        .unwrap_or(DEFAULT_HISTORY_LIMIT)
        .min(MAX_FEED_LIMIT);

    let messages = store.recent(&room, limit).await?;
    Ok(Json(messages).into_response())
}
