//! Audit recorder for events that carry no state change of their own
//! (review-progress toggles, batch summaries).
//!
//! Transition logs ride inside the engine's unit of work and share its
//! all-or-nothing fate. This recorder is for everything else: an append
//! failure here must never fail the business action that triggered it, but
//! it is reported loudly rather than swallowed.

use std::sync::Arc;

use weir_storage::{ActivityLogEntry, LogDraft, PermitStore, StorageError};

use crate::lifecycle::Actor;

/// What happened to an audit append.
#[derive(Debug)]
pub enum AuditOutcome {
    Recorded(ActivityLogEntry),
    /// The entry was lost. The state change (if any) stands; the loss has
    /// already been reported on stderr.
    Degraded(StorageError),
}

impl AuditOutcome {
    pub fn is_recorded(&self) -> bool {
        matches!(self, AuditOutcome::Recorded(_))
    }
}

pub struct AuditRecorder<S> {
    store: Arc<S>,
}

impl<S> Clone for AuditRecorder<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: PermitStore> AuditRecorder<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Append one audit entry. Never fails the caller.
    pub async fn record(
        &self,
        actor: &Actor,
        action: &str,
        details: &str,
        application_id: Option<&str>,
    ) -> AuditOutcome {
        let draft = LogDraft {
            actor_id: actor.user_id.clone(),
            actor_role: actor.role,
            action: action.to_string(),
            details: details.to_string(),
            application_id: application_id.map(str::to_string),
        };
        match self.append(draft).await {
            Ok(entry) => AuditOutcome::Recorded(entry),
            Err(e) => {
                eprintln!("warning: audit entry '{}' was not recorded: {}", action, e);
                AuditOutcome::Degraded(e)
            }
        }
    }

    async fn append(&self, draft: LogDraft) -> Result<ActivityLogEntry, StorageError> {
        let mut unit = self.store.begin_unit().await?;
        let entry = match self.store.add_log(&mut unit, draft).await {
            Ok(entry) => entry,
            Err(e) => {
                let _ = self.store.abort_unit(unit).await;
                return Err(e);
            }
        };
        self.store.commit_unit(unit).await?;
        Ok(entry)
    }
}
