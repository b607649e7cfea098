//! Bridge to the blocking pool.

use crate::error::LcpResult;

/// Runs `f` on tokio's blocking pool.
pub(crate) async fn blocking<T, F>(f: F) -> LcpResult<T>
where
    F: FnOnce() -> LcpResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f).await?
}
