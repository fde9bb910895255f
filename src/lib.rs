pub mod config;
pub mod error;
pub mod feed;
pub mod gateway;
pub mod history;
pub mod message;
pub mod presence;
pub mod room;
pub mod router;
pub mod store;

use std::sync::Arc;

use axum::extract::FromRef;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use gateway::Gateway;
use store::SqliteMessageStore;

#[derive(Clone, FromRef)]
pub struct AppState {
    pub gateway: Arc<Gateway<SqliteMessageStore>>,
    pub store: Arc<SqliteMessageStore>,
}

pub type AppResult<T> = Result<T, AppError>;
#[derive(Debug)]
pub struct AppError(pub anyhow::Error);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("{}\n\n{}", self.0, self.0.backtrace()),
        )
            .into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}
