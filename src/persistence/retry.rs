use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use super::{GestureRecord, GestureStore};
use crate::config::RelayConfig;
use crate::error::PersistError;

/// Bounded retry for gesture saves: a fixed pause between attempts, and
/// only transient failures are retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: crate::config::DEFAULT_SAVE_MAX_ATTEMPTS,
            backoff: Duration::from_millis(crate::config::DEFAULT_SAVE_BACKOFF_MS),
        }
    }
}

impl From<&RelayConfig> for RetryPolicy {
    fn from(config: &RelayConfig) -> Self {
        Self {
            max_attempts: config.save_max_attempts.max(1),
            backoff: config.save_backoff,
        }
    }
}

/// Insert `record`, retrying transient failures. Returns the attempt number
/// that succeeded.
pub async fn persist_with_retry(
    store: &dyn GestureStore,
    record: &GestureRecord,
    policy: &RetryPolicy,
) -> Result<u32, PersistError> {
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match store.insert(record).await {
            Ok(()) => {
                tracing::debug!(gesture_id = %record.id, attempt, "gesture saved");
                return Ok(attempt);
            }
            Err(e) if !e.is_transient() => {
                tracing::error!(gesture_id = %record.id, attempt, "gesture save failed: {e}");
                return Err(PersistError::Permanent(e.message));
            }
            Err(e) if attempt >= max_attempts => {
                tracing::error!(
                    gesture_id = %record.id,
                    attempts = attempt,
                    "gesture save gave up: {e}"
                );
                return Err(PersistError::Exhausted { attempts: attempt });
            }
            Err(e) => {
                tracing::warn!(
                    gesture_id = %record.id,
                    attempt,
                    "transient gesture save failure, retrying: {e}"
                );
                tokio::time::sleep(policy.backoff).await;
                attempt += 1;
            }
        }
    }
}

/// Run [`persist_with_retry`] on a detached task. `on_failure` is called
/// once with the terminal error; success is silent. The task does not
/// depend on the originating connection staying open.
pub fn spawn_persist<F>(
    store: Arc<dyn GestureStore>,
    policy: RetryPolicy,
    record: GestureRecord,
    on_failure: F,
) -> JoinHandle<()>
where
    F: FnOnce(PersistError) + Send + 'static,
{
    tokio::spawn(async move {
        if let Err(e) = persist_with_retry(store.as_ref(), &record, &policy).await {
            on_failure(e);
        }
    })
}
