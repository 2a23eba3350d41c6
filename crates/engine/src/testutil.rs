//! Shared test fixtures: store seeding helpers and a shim backend that can
//! misbehave on cue (stale reads, stale listings, failing log appends).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use weir_storage::{
    now_iso8601, ActivityLogEntry, ApplicationChanges, CommentDraft, LogDraft, MemoryStore,
    MemoryUnit, Message, MessageDraft, PermitApplication, PermitClass, PermitStore, Position,
    Role, Status, StorageError, User, WaterSource, WorkflowComment,
};

use crate::lifecycle::Actor;

/// Insert a minimal application at the given position.
pub async fn seed_application<S: PermitStore>(
    store: &Arc<S>,
    id: &str,
    stage: u8,
    status: Status,
) -> PermitApplication {
    let app = PermitApplication {
        id: id.to_string(),
        code: format!("WP2024-{}", id.rsplit('-').next().unwrap_or("0000")),
        applicant_name: "EcoFarms Ltd".to_string(),
        permit_class: PermitClass::Irrigation,
        water_source: WaterSource::GroundWater,
        water_allocation_ml: 50.0,
        land_size_ha: 15.0,
        current_stage: stage,
        status,
        created_at: now_iso8601(),
        updated_at: now_iso8601(),
        submitted_at: if stage > 1 { Some(now_iso8601()) } else { None },
        approved_at: None,
        rejected_at: None,
    };
    store.insert_application(app.clone()).await.unwrap();
    app
}

/// An actor with a stable per-role user id.
pub fn actor_for(role: Role) -> Actor {
    let user_id = match role {
        Role::PermittingOfficer => "user-po-001",
        Role::Chairperson => "user-chair-001",
        Role::CatchmentManager => "user-cm-001",
        Role::CatchmentChairperson => "user-cchair-001",
        Role::PermitSupervisor => "user-ps-001",
        Role::Ict => "user-ict-001",
    };
    Actor::new(user_id, role)
}

/// A [`MemoryStore`] wrapper that misbehaves exactly once per trigger:
///
/// - [`ShimStore::stage_stale_read`] makes the next
///   `get_application_for_update` return a caller-supplied snapshot instead
///   of the live row, simulating a reader that raced another writer;
/// - [`ShimStore::stage_stale_listing`] does the same for
///   `get_applications`;
/// - [`ShimStore::fail_next_log`] makes the next `add_log` fail with a
///   backend error.
#[derive(Default)]
pub struct ShimStore {
    inner: MemoryStore,
    stale_read: Mutex<Option<PermitApplication>>,
    stale_listing: Mutex<Option<Vec<PermitApplication>>>,
    fail_log: AtomicBool,
}

impl ShimStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stage_stale_read(&self, snapshot: PermitApplication) {
        *self.stale_read.lock().unwrap() = Some(snapshot);
    }

    pub fn stage_stale_listing(&self, listing: Vec<PermitApplication>) {
        *self.stale_listing.lock().unwrap() = Some(listing);
    }

    pub fn fail_next_log(&self) {
        self.fail_log.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl PermitStore for ShimStore {
    type Unit = MemoryUnit;

    async fn begin_unit(&self) -> Result<MemoryUnit, StorageError> {
        self.inner.begin_unit().await
    }

    async fn commit_unit(&self, unit: MemoryUnit) -> Result<(), StorageError> {
        self.inner.commit_unit(unit).await
    }

    async fn abort_unit(&self, unit: MemoryUnit) -> Result<(), StorageError> {
        self.inner.abort_unit(unit).await
    }

    async fn get_application_for_update(
        &self,
        unit: &mut MemoryUnit,
        application_id: &str,
    ) -> Result<PermitApplication, StorageError> {
        if let Some(stale) = self.stale_read.lock().unwrap().take() {
            return Ok(stale);
        }
        self.inner.get_application_for_update(unit, application_id).await
    }

    async fn update_application(
        &self,
        unit: &mut MemoryUnit,
        application_id: &str,
        expected: Position,
        changes: ApplicationChanges,
    ) -> Result<PermitApplication, StorageError> {
        self.inner
            .update_application(unit, application_id, expected, changes)
            .await
    }

    async fn add_comment(
        &self,
        unit: &mut MemoryUnit,
        draft: CommentDraft,
    ) -> Result<WorkflowComment, StorageError> {
        self.inner.add_comment(unit, draft).await
    }

    async fn add_log(
        &self,
        unit: &mut MemoryUnit,
        draft: LogDraft,
    ) -> Result<ActivityLogEntry, StorageError> {
        if self.fail_log.swap(false, Ordering::SeqCst) {
            return Err(StorageError::Backend("log append failed".to_string()));
        }
        self.inner.add_log(unit, draft).await
    }

    async fn get_application(
        &self,
        application_id: &str,
    ) -> Result<PermitApplication, StorageError> {
        self.inner.get_application(application_id).await
    }

    async fn get_applications(&self) -> Result<Vec<PermitApplication>, StorageError> {
        if let Some(stale) = self.stale_listing.lock().unwrap().take() {
            return Ok(stale);
        }
        self.inner.get_applications().await
    }

    async fn get_comments_by_application(
        &self,
        application_id: &str,
    ) -> Result<Vec<WorkflowComment>, StorageError> {
        self.inner.get_comments_by_application(application_id).await
    }

    async fn get_logs(&self, limit: usize) -> Result<Vec<ActivityLogEntry>, StorageError> {
        self.inner.get_logs(limit).await
    }

    async fn insert_application(
        &self,
        application: PermitApplication,
    ) -> Result<(), StorageError> {
        self.inner.insert_application(application).await
    }

    async fn add_message(&self, draft: MessageDraft) -> Result<Message, StorageError> {
        self.inner.add_message(draft).await
    }

    async fn get_messages(&self) -> Result<Vec<Message>, StorageError> {
        self.inner.get_messages().await
    }

    async fn mark_message_read(&self, message_id: &str) -> Result<(), StorageError> {
        self.inner.mark_message_read(message_id).await
    }

    async fn insert_user(&self, user: User) -> Result<(), StorageError> {
        self.inner.insert_user(user).await
    }

    async fn get_user(&self, user_id: &str) -> Result<User, StorageError> {
        self.inner.get_user(user_id).await
    }

    async fn get_users(&self) -> Result<Vec<User>, StorageError> {
        self.inner.get_users().await
    }
}
