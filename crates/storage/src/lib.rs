//! weir-storage: record types, the `PermitStore` data-access trait, the
//! in-memory reference backend, and a backend-agnostic conformance suite.
//!
//! Everything the workflow engine knows about persistence goes through
//! [`PermitStore`]. Backends provide unit-of-work (transaction) semantics
//! and compare-and-set application updates; the engine never sees anything
//! wider than that.

pub mod conformance;
mod error;
mod memory;
mod traits;
mod types;

pub use error::StorageError;
pub use memory::{MemoryStore, MemoryUnit};
pub use traits::PermitStore;
pub use types::{
    next_application_code, now_iso8601, ActivityLogEntry, ApplicationChanges, CommentAction,
    CommentDraft, LogDraft, Message, MessageDraft, PermitApplication, PermitClass, Position, Role,
    Status, User, WaterSource, WorkflowComment,
};
