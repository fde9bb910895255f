//! Error taxonomy for the messaging core.
//!
//! Validation and storage failures are local to the request and reported to
//! the originating client; per-recipient delivery failures are swallowed at
//! the fan-out layer. Nothing here is fatal to the process.

use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

use crate::room::RoomKey;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage backend unavailable: {0}")]
    Unavailable(#[source] sqlx::Error),
    #[error("stored record malformed: {0}")]
    Corrupt(String),
}

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("{0}")]
    Validation(String),
    #[error(transparent)]
    Storage(#[from] StoreError),
    #[error("storage operation timed out after {0:?}")]
    StorageTimeout(Duration),
    #[error("not a member of {0}")]
    NotAMember(RoomKey),
}

/// Stable wire code sent alongside the error message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    Validation,
    StorageUnavailable,
    StorageTimeout,
    NotAMember,
}

impl ChatError {
    pub fn code(&self) -> ErrorCode {
        match self {
            ChatError::Validation(_) => ErrorCode::Validation,
            ChatError::Storage(_) => ErrorCode::StorageUnavailable,
            ChatError::StorageTimeout(_) => ErrorCode::StorageTimeout,
            ChatError::NotAMember(_) => ErrorCode::NotAMember,
        }
    }
}
