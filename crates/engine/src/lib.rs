//! weir-engine: the permit application lifecycle engine and the components
//! wrapped around it.
//!
//! One state machine serves every role dashboard:
//!
//! - [`LifecycleEngine`] -- validates and applies (stage, status)
//!   transitions against live application state, atomically with the
//!   comment and audit-log appends they produce
//! - [`ReviewGate`] -- per-role input requirements and eligibility listings
//! - [`BulkCoordinator`] -- validate-all / commit-each batch submissions
//! - [`AuditRecorder`] -- degradation-tolerant out-of-band audit appends
//! - [`notify`] -- unread-count badges with a periodic poll

pub mod audit;
pub mod batch;
pub mod gate;
pub mod lifecycle;
pub mod notify;
pub mod rules;

#[cfg(test)]
mod testutil;

pub use audit::{AuditOutcome, AuditRecorder};
pub use batch::{BatchHalt, BatchReport, BulkCoordinator};
pub use gate::{
    EligibleApplication, GateError, ReviewGate, ReviewInput, ValidationError,
    MANAGER_ASSESSMENT_MIN_CHARS, TECHNICAL_ASSESSMENT_PREFIX,
};
pub use lifecycle::{Actor, LifecycleEngine, TransitionError, TransitionPayload};
pub use notify::{unread_counts, watch_unread, UnreadCounts, DEFAULT_POLL_PERIOD};
pub use rules::{
    actionable_position, rule_for, stage_owner, Action, TransitionRule, TRANSITION_TABLE,
};
