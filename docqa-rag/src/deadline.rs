//! Deadlines for calls into external services.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::error::{RagError, Result};

/// Await `fut`, failing with [`RagError::Timeout`] if `deadline` elapses first.
///
/// `None` waits indefinitely.
pub(crate) async fn within<T, F>(operation: &str, deadline: Option<Duration>, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    let Some(after) = deadline else {
        return fut.await;
    };

    match tokio::time::timeout(after, fut).await {
        Ok(result) => result,
        Err(_) => {
            warn!(operation, ?after, "deadline exceeded");
            Err(RagError::Timeout { operation: operation.to_string(), after })
        }
    }
}
