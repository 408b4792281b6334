pub mod auth;
pub mod complaints;
pub mod error;
pub mod geo;
pub mod ownership;
pub mod photo;
pub mod proximity;
pub mod routes;
pub mod state;

use tracing::error;

use crate::error::ApiError;

/// Run blocking store work (SQLite, Argon2) off the async runtime.
pub(crate) async fn run_blocking<F, T>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, ApiError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f).await.map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        ApiError::Internal(e.into())
    })?
}
