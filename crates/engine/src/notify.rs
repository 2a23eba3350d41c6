//! Unread-count derivation for dashboard badges.
//!
//! A message is unread for a user when someone else sent it and `read_at`
//! is unset; broadcasts (no recipient) and direct messages are counted
//! separately. Purely cosmetic -- this never touches the lifecycle engine --
//! and recomputed on demand plus on a fixed poll while a dashboard is open.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use weir_storage::{PermitStore, StorageError};

/// Poll period used by dashboards.
pub const DEFAULT_POLL_PERIOD: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UnreadCounts {
    pub broadcast: usize,
    pub direct: usize,
}

impl UnreadCounts {
    pub fn total(self) -> usize {
        self.broadcast + self.direct
    }
}

/// Compute unread counts for one user from the live message collection.
pub async fn unread_counts<S: PermitStore>(
    store: &S,
    user_id: &str,
) -> Result<UnreadCounts, StorageError> {
    let messages = store.get_messages().await?;
    let mut counts = UnreadCounts::default();
    for message in &messages {
        if message.sender_id == user_id || message.read_at.is_some() {
            continue;
        }
        match message.recipient_id.as_deref() {
            None => counts.broadcast += 1,
            Some(recipient) if recipient == user_id => counts.direct += 1,
            Some(_) => {}
        }
    }
    Ok(counts)
}

/// Spawn a poller that recomputes the counts every `period` and publishes
/// them on a watch channel. The task exits when the last receiver is
/// dropped. A failed poll keeps the previous value; the next tick tries
/// again.
pub fn watch_unread<S: PermitStore>(
    store: Arc<S>,
    user_id: String,
    period: Duration,
) -> watch::Receiver<UnreadCounts> {
    let (tx, rx) = watch::channel(UnreadCounts::default());
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        loop {
            ticker.tick().await;
            let counts = match unread_counts(store.as_ref(), &user_id).await {
                Ok(counts) => counts,
                Err(_) => continue,
            };
            if tx.send(counts).is_err() {
                break;
            }
        }
    });
    rx
}
