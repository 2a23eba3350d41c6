//! In-memory reference backend.
//!
//! `MemoryStore` keeps the whole store behind one mutex and implements the
//! unit-of-work as a staging buffer: mutations accumulate in the unit and
//! land in a single locked apply on commit, so an aborted or dropped unit
//! leaves nothing visible. Compare-and-set preconditions are checked when
//! staged and re-checked under the commit lock.
//!
//! The state is serde-serializable, so a store can be persisted to and
//! reloaded from a JSON file between runs.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::StorageError;
use crate::traits::PermitStore;
use crate::types::{
    now_iso8601, ActivityLogEntry, ApplicationChanges, CommentDraft, LogDraft, Message,
    MessageDraft, PermitApplication, Position, User, WorkflowComment,
};

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreState {
    applications: Vec<PermitApplication>,
    comments: Vec<WorkflowComment>,
    logs: Vec<ActivityLogEntry>,
    messages: Vec<Message>,
    users: Vec<User>,
    comment_seq: u64,
    log_seq: u64,
    message_seq: u64,
}

/// One staged mutation inside a [`MemoryUnit`].
#[derive(Debug)]
enum StagedOp {
    UpdateApplication {
        application_id: String,
        expected: Position,
        changes: ApplicationChanges,
        updated_at: String,
    },
    AddComment(WorkflowComment),
    AddLog(ActivityLogEntry),
}

/// Unit of work for [`MemoryStore`]: a buffer of staged mutations. Dropping
/// it without committing discards the buffer.
#[derive(Debug, Default)]
pub struct MemoryUnit {
    ops: Vec<StagedOp>,
}

/// In-memory [`PermitStore`] backend.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<StoreState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a store previously written by [`MemoryStore::save`].
    pub fn load(path: &Path) -> Result<Self, StorageError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| StorageError::Backend(format!("read {}: {}", path.display(), e)))?;
        let state: StoreState = serde_json::from_str(&raw)
            .map_err(|e| StorageError::Backend(format!("parse {}: {}", path.display(), e)))?;
        Ok(Self {
            inner: Arc::new(Mutex::new(state)),
        })
    }

    /// Persist the current committed state as pretty-printed JSON.
    pub fn save(&self, path: &Path) -> Result<(), StorageError> {
        let state = self.lock();
        let raw = serde_json::to_string_pretty(&*state)
            .map_err(|e| StorageError::Backend(format!("serialize store: {}", e)))?;
        drop(state);
        std::fs::write(path, raw)
            .map_err(|e| StorageError::Backend(format!("write {}: {}", path.display(), e)))
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, StoreState> {
        // A poisoned mutex means a panic mid-mutation in this process;
        // continuing with the inner state is the best available option.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Apply `changes` to `app` in place, refreshing `updated_at`.
fn apply_changes(app: &mut PermitApplication, changes: &ApplicationChanges, updated_at: &str) {
    if let Some(stage) = changes.stage {
        app.current_stage = stage;
    }
    if let Some(status) = changes.status {
        app.status = status;
    }
    if let Some(ts) = &changes.submitted_at {
        app.submitted_at = Some(ts.clone());
    }
    if let Some(ts) = &changes.approved_at {
        app.approved_at = Some(ts.clone());
    }
    if let Some(ts) = &changes.rejected_at {
        app.rejected_at = Some(ts.clone());
    }
    app.updated_at = updated_at.to_string();
}

fn find_app<'a>(
    state: &'a StoreState,
    application_id: &str,
) -> Result<&'a PermitApplication, StorageError> {
    state
        .applications
        .iter()
        .find(|a| a.id == application_id)
        .ok_or_else(|| StorageError::ApplicationNotFound {
            application_id: application_id.to_string(),
        })
}

#[async_trait]
impl PermitStore for MemoryStore {
    type Unit = MemoryUnit;

    async fn begin_unit(&self) -> Result<MemoryUnit, StorageError> {
        Ok(MemoryUnit::default())
    }

    async fn commit_unit(&self, unit: MemoryUnit) -> Result<(), StorageError> {
        let mut state = self.lock();

        // Validate every compare-and-set against the live state before
        // applying anything, so a conflicting unit commits nothing.
        for op in &unit.ops {
            if let StagedOp::UpdateApplication {
                application_id,
                expected,
                ..
            } = op
            {
                let live = find_app(&state, application_id)?;
                if live.position() != *expected {
                    return Err(StorageError::ConcurrentConflict {
                        application_id: application_id.clone(),
                        expected: *expected,
                    });
                }
            }
        }

        for op in unit.ops {
            match op {
                StagedOp::UpdateApplication {
                    application_id,
                    changes,
                    updated_at,
                    ..
                } => {
                    let app = state
                        .applications
                        .iter_mut()
                        .find(|a| a.id == application_id)
                        .ok_or(StorageError::ApplicationNotFound { application_id })?;
                    apply_changes(app, &changes, &updated_at);
                }
                StagedOp::AddComment(comment) => state.comments.push(comment),
                StagedOp::AddLog(entry) => state.logs.push(entry),
            }
        }
        Ok(())
    }

    async fn abort_unit(&self, _unit: MemoryUnit) -> Result<(), StorageError> {
        // Nothing was applied; dropping the buffer is the rollback.
        Ok(())
    }

    async fn get_application_for_update(
        &self,
        _unit: &mut MemoryUnit,
        application_id: &str,
    ) -> Result<PermitApplication, StorageError> {
        let state = self.lock();
        find_app(&state, application_id).cloned()
    }

    async fn update_application(
        &self,
        unit: &mut MemoryUnit,
        application_id: &str,
        expected: Position,
        changes: ApplicationChanges,
    ) -> Result<PermitApplication, StorageError> {
        let state = self.lock();
        let live = find_app(&state, application_id)?;
        if live.position() != expected {
            return Err(StorageError::ConcurrentConflict {
                application_id: application_id.to_string(),
                expected,
            });
        }
        let updated_at = now_iso8601();
        let mut projected = live.clone();
        drop(state);
        apply_changes(&mut projected, &changes, &updated_at);
        unit.ops.push(StagedOp::UpdateApplication {
            application_id: application_id.to_string(),
            expected,
            changes,
            updated_at,
        });
        Ok(projected)
    }

    async fn add_comment(
        &self,
        unit: &mut MemoryUnit,
        draft: CommentDraft,
    ) -> Result<WorkflowComment, StorageError> {
        let mut state = self.lock();
        state.comment_seq += 1;
        // Sequence numbers reserved by aborted units are skipped, which is
        // harmless: ids only need to be unique.
        let comment = WorkflowComment {
            id: format!("comment-{:04}", state.comment_seq),
            application_id: draft.application_id,
            author_id: draft.author_id,
            author_role: draft.author_role,
            stage: draft.stage,
            body: draft.body,
            action: draft.action,
            is_rejection_reason: draft.is_rejection_reason,
            created_at: now_iso8601(),
        };
        drop(state);
        unit.ops.push(StagedOp::AddComment(comment.clone()));
        Ok(comment)
    }

    async fn add_log(
        &self,
        unit: &mut MemoryUnit,
        draft: LogDraft,
    ) -> Result<ActivityLogEntry, StorageError> {
        let mut state = self.lock();
        state.log_seq += 1;
        let entry = ActivityLogEntry {
            id: format!("log-{:04}", state.log_seq),
            actor_id: draft.actor_id,
            actor_role: draft.actor_role,
            action: draft.action,
            details: draft.details,
            application_id: draft.application_id,
            recorded_at: now_iso8601(),
        };
        drop(state);
        unit.ops.push(StagedOp::AddLog(entry.clone()));
        Ok(entry)
    }

    async fn get_application(
        &self,
        application_id: &str,
    ) -> Result<PermitApplication, StorageError> {
        let state = self.lock();
        find_app(&state, application_id).cloned()
    }

    async fn get_applications(&self) -> Result<Vec<PermitApplication>, StorageError> {
        Ok(self.lock().applications.clone())
    }

    async fn get_comments_by_application(
        &self,
        application_id: &str,
    ) -> Result<Vec<WorkflowComment>, StorageError> {
        let state = self.lock();
        Ok(state
            .comments
            .iter()
            .filter(|c| c.application_id == application_id)
            .cloned()
            .collect())
    }

    async fn get_logs(&self, limit: usize) -> Result<Vec<ActivityLogEntry>, StorageError> {
        let state = self.lock();
        Ok(state.logs.iter().rev().take(limit).cloned().collect())
    }

    async fn insert_application(
        &self,
        application: PermitApplication,
    ) -> Result<(), StorageError> {
        let mut state = self.lock();
        if state.applications.iter().any(|a| a.id == application.id) {
            return Err(StorageError::DuplicateApplication {
                application_id: application.id,
            });
        }
        state.applications.push(application);
        Ok(())
    }

    async fn add_message(&self, draft: MessageDraft) -> Result<Message, StorageError> {
        let mut state = self.lock();
        state.message_seq += 1;
        let message = Message {
            id: format!("msg-{:04}", state.message_seq),
            sender_id: draft.sender_id,
            recipient_id: draft.recipient_id,
            subject: draft.subject,
            body: draft.body,
            created_at: now_iso8601(),
            read_at: None,
        };
        state.messages.push(message.clone());
        Ok(message)
    }

    async fn get_messages(&self) -> Result<Vec<Message>, StorageError> {
        Ok(self.lock().messages.clone())
    }

    async fn mark_message_read(&self, message_id: &str) -> Result<(), StorageError> {
        let mut state = self.lock();
        let message = state
            .messages
            .iter_mut()
            .find(|m| m.id == message_id)
            .ok_or_else(|| StorageError::MessageNotFound {
                message_id: message_id.to_string(),
            })?;
        if message.read_at.is_none() {
            message.read_at = Some(now_iso8601());
        }
        Ok(())
    }

    async fn insert_user(&self, user: User) -> Result<(), StorageError> {
        let mut state = self.lock();
        state.users.retain(|u| u.id != user.id);
        state.users.push(user);
        Ok(())
    }

    async fn get_user(&self, user_id: &str) -> Result<User, StorageError> {
        let state = self.lock();
        state
            .users
            .iter()
            .find(|u| u.id == user_id)
            .cloned()
            .ok_or_else(|| StorageError::UserNotFound {
                user_id: user_id.to_string(),
            })
    }

    async fn get_users(&self) -> Result<Vec<User>, StorageError> {
        Ok(self.lock().users.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conformance::run_conformance_suite;
    use crate::types::{PermitClass, Role, Status, WaterSource};

    fn sample_app(id: &str) -> PermitApplication {
        PermitApplication {
            id: id.to_string(),
            code: format!("WP2024-{}", &id[4..]),
            applicant_name: "EcoFarms Ltd".to_string(),
            permit_class: PermitClass::Irrigation,
            water_source: WaterSource::GroundWater,
            water_allocation_ml: 50.0,
            land_size_ha: 15.0,
            current_stage: 1,
            status: Status::Unsubmitted,
            created_at: now_iso8601(),
            updated_at: now_iso8601(),
            submitted_at: None,
            approved_at: None,
            rejected_at: None,
        }
    }

    #[tokio::test]
    async fn memory_store_passes_conformance() {
        let report = run_conformance_suite(|| async { MemoryStore::new() }).await;
        assert_eq!(report.failed, 0, "{}", report);
    }

    #[tokio::test]
    async fn save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");

        let store = MemoryStore::new();
        store.insert_application(sample_app("app-0001")).await.unwrap();
        store
            .insert_user(User {
                id: "user-po-001".to_string(),
                username: "jane".to_string(),
                display_name: "Jane Permitting".to_string(),
                role: Role::PermittingOfficer,
            })
            .await
            .unwrap();
        let mut unit = store.begin_unit().await.unwrap();
        store
            .add_comment(
                &mut unit,
                CommentDraft {
                    application_id: "app-0001".to_string(),
                    author_id: "user-po-001".to_string(),
                    author_role: Role::PermittingOfficer,
                    stage: 1,
                    body: "Initial documentation check complete.".to_string(),
                    action: crate::types::CommentAction::Review,
                    is_rejection_reason: false,
                },
            )
            .await
            .unwrap();
        store.commit_unit(unit).await.unwrap();
        store.save(&path).unwrap();

        let reloaded = MemoryStore::load(&path).unwrap();
        assert_eq!(reloaded.get_applications().await.unwrap().len(), 1);
        assert_eq!(
            reloaded
                .get_comments_by_application("app-0001")
                .await
                .unwrap()
                .len(),
            1
        );
        assert_eq!(reloaded.get_user("user-po-001").await.unwrap().username, "jane");

        // Sequences continue from where the saved store left off.
        let mut unit = reloaded.begin_unit().await.unwrap();
        let comment = reloaded
            .add_comment(
                &mut unit,
                CommentDraft {
                    application_id: "app-0001".to_string(),
                    author_id: "user-po-001".to_string(),
                    author_role: Role::PermittingOfficer,
                    stage: 1,
                    body: "Follow-up note.".to_string(),
                    action: crate::types::CommentAction::Review,
                    is_rejection_reason: false,
                },
            )
            .await
            .unwrap();
        assert_eq!(comment.id, "comment-0002");
    }

    #[tokio::test]
    async fn logs_are_returned_newest_first_with_limit() {
        let store = MemoryStore::new();
        for i in 0..5 {
            let mut unit = store.begin_unit().await.unwrap();
            store
                .add_log(
                    &mut unit,
                    LogDraft {
                        actor_id: "user-ict-001".to_string(),
                        actor_role: Role::Ict,
                        action: format!("Action {}", i),
                        details: String::new(),
                        application_id: None,
                    },
                )
                .await
                .unwrap();
            store.commit_unit(unit).await.unwrap();
        }
        let logs = store.get_logs(3).await.unwrap();
        assert_eq!(logs.len(), 3);
        assert_eq!(logs[0].action, "Action 4");
        assert_eq!(logs[2].action, "Action 2");
    }

    #[tokio::test]
    async fn mark_read_is_idempotent() {
        let store = MemoryStore::new();
        let msg = store
            .add_message(MessageDraft {
                sender_id: "user-chair-001".to_string(),
                recipient_id: Some("user-po-001".to_string()),
                subject: "Reminder".to_string(),
                body: "Please submit outstanding applications.".to_string(),
            })
            .await
            .unwrap();

        store.mark_message_read(&msg.id).await.unwrap();
        let first = store.get_messages().await.unwrap()[0].read_at.clone();
        assert!(first.is_some());
        store.mark_message_read(&msg.id).await.unwrap();
        let second = store.get_messages().await.unwrap()[0].read_at.clone();
        assert_eq!(first, second);
    }
}
