//! Deadline and cancellation for transport calls.

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::error::FlowError;

/// Drive `call` until it finishes, `limit` elapses or `cancel` fires.
///
/// Cancellation is checked first on every poll. Either way out drops `call`,
/// which closes any connection it owns.
pub async fn bounded<T>(
    limit: Duration,
    cancel: Option<&CancellationToken>,
    call: impl Future<Output = Result<T, FlowError>>,
) -> Result<T, FlowError> {
    let deadline = async {
        tokio::time::timeout(limit, call)
            .await
            .unwrap_or_else(|_| Err(FlowError::Timeout(limit_ms(limit))))
    };

    match cancel {
        Some(token) => {
            tokio::select! {
                biased;
                _ = token.cancelled() => Err(FlowError::Cancelled),
                result = deadline => result,
            }
        }
        None => deadline.await,
    }
}

fn limit_ms(limit: Duration) -> u64 {
    u64::try_from(limit.as_millis()).unwrap_or(u64::MAX)
}
