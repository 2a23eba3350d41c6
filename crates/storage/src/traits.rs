use async_trait::async_trait;

use crate::error::StorageError;
use crate::types::{
    ActivityLogEntry, ApplicationChanges, CommentDraft, LogDraft, Message, MessageDraft,
    PermitApplication, Position, User, WorkflowComment,
};

/// The narrow data-access interface the workflow engine consumes.
///
/// ## Unit-of-work semantics
///
/// Mutations that must land together take `&mut Self::Unit`, a type
/// representing an in-progress unit of work. The lifecycle is:
///
/// 1. `begin_unit()` -- start a unit
/// 2. call mutating methods with `&mut unit`
/// 3. `commit_unit(unit)` -- make everything durable, all-or-nothing
///    OR `abort_unit(unit)` -- discard everything
///
/// A `Unit` dropped without committing MUST leave nothing visible.
///
/// ## Optimistic concurrency
///
/// `update_application` is a compare-and-set on the application's live
/// (stage, status) pair. If the live pair differs from `expected` -- whether
/// detected at the call or when the unit commits -- the store returns
/// `Err(StorageError::ConcurrentConflict { .. })` and the unit commits
/// nothing. There are no long-lived locks; re-check-before-write is the only
/// discipline.
///
/// ## Id assignment
///
/// Comment, log, and message appends take `*Draft` values; the store assigns
/// the id and creation timestamp and returns the completed record.
///
/// ## Thread safety
///
/// Implementations must be `Send + Sync + 'static` so they can be shared
/// across async task boundaries.
#[async_trait]
pub trait PermitStore: Send + Sync + 'static {
    /// The unit-of-work type used by this backend. Must be `Send`.
    type Unit: Send;

    // ── Unit lifecycle ────────────────────────────────────────────────

    async fn begin_unit(&self) -> Result<Self::Unit, StorageError>;

    /// Commit a unit, making all staged mutations durable atomically.
    async fn commit_unit(&self, unit: Self::Unit) -> Result<(), StorageError>;

    /// Abort a unit, discarding all staged mutations.
    async fn abort_unit(&self, unit: Self::Unit) -> Result<(), StorageError>;

    // ── Mutations (within a unit) ─────────────────────────────────────

    /// Read an application's live state at the head of a unit of work.
    ///
    /// Returns `Err(StorageError::ApplicationNotFound)` if absent.
    async fn get_application_for_update(
        &self,
        unit: &mut Self::Unit,
        application_id: &str,
    ) -> Result<PermitApplication, StorageError>;

    /// Stage a compare-and-set update conditional on the live (stage,
    /// status) matching `expected`. `updated_at` is always refreshed.
    ///
    /// Returns the application as it will look once the unit commits.
    async fn update_application(
        &self,
        unit: &mut Self::Unit,
        application_id: &str,
        expected: Position,
        changes: ApplicationChanges,
    ) -> Result<PermitApplication, StorageError>;

    /// Stage a workflow comment append.
    async fn add_comment(
        &self,
        unit: &mut Self::Unit,
        draft: CommentDraft,
    ) -> Result<WorkflowComment, StorageError>;

    /// Stage an activity-log append.
    async fn add_log(
        &self,
        unit: &mut Self::Unit,
        draft: LogDraft,
    ) -> Result<ActivityLogEntry, StorageError>;

    // ── Reads (outside any unit) ──────────────────────────────────────

    async fn get_application(
        &self,
        application_id: &str,
    ) -> Result<PermitApplication, StorageError>;

    /// Every application, in insertion order. Used to compute eligible and
    /// batch sets.
    async fn get_applications(&self) -> Result<Vec<PermitApplication>, StorageError>;

    /// Comment history for one application, oldest first.
    async fn get_comments_by_application(
        &self,
        application_id: &str,
    ) -> Result<Vec<WorkflowComment>, StorageError>;

    /// Most recent activity-log entries, newest first, at most `limit`.
    async fn get_logs(&self, limit: usize) -> Result<Vec<ActivityLogEntry>, StorageError>;

    // ── Application creation ──────────────────────────────────────────

    /// Insert a freshly created application.
    ///
    /// Returns `Err(StorageError::DuplicateApplication)` if the id is taken.
    async fn insert_application(
        &self,
        application: PermitApplication,
    ) -> Result<(), StorageError>;

    // ── Messages ──────────────────────────────────────────────────────

    async fn add_message(&self, draft: MessageDraft) -> Result<Message, StorageError>;

    async fn get_messages(&self) -> Result<Vec<Message>, StorageError>;

    /// Set `read_at` on a message. Idempotent: marking an already-read
    /// message keeps the original timestamp.
    async fn mark_message_read(&self, message_id: &str) -> Result<(), StorageError>;

    // ── Users ─────────────────────────────────────────────────────────

    async fn insert_user(&self, user: User) -> Result<(), StorageError>;

    async fn get_user(&self, user_id: &str) -> Result<User, StorageError>;

    async fn get_users(&self) -> Result<Vec<User>, StorageError>;
}
