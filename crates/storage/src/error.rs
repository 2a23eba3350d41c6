use crate::types::Position;

/// All errors a [`crate::PermitStore`] implementation can return.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Compare-and-set conflict -- the application's live (stage, status) no
    /// longer matched what the caller expected at commit time.
    #[error("concurrent conflict on application {application_id}: expected {expected}")]
    ConcurrentConflict {
        application_id: String,
        expected: Position,
    },

    /// No application with the given id.
    #[error("application not found: {application_id}")]
    ApplicationNotFound { application_id: String },

    /// An application with this id already exists.
    #[error("application already exists: {application_id}")]
    DuplicateApplication { application_id: String },

    /// No message with the given id.
    #[error("message not found: {message_id}")]
    MessageNotFound { message_id: String },

    /// No user with the given id.
    #[error("user not found: {user_id}")]
    UserNotFound { user_id: String },

    /// A backend-specific storage error (I/O, serialization, etc.).
    #[error("storage backend error: {0}")]
    Backend(String),
}
