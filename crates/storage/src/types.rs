//! Record types for the permit workflow.
//!
//! These are the shapes a [`crate::PermitStore`] persists. Ids are plain
//! strings; timestamps are ISO 8601 / RFC 3339 strings produced by
//! [`now_iso8601`]. Comment, log, and message records are append-only:
//! callers hand the store a `*Draft` and the store assigns the id and
//! creation timestamp.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// ──────────────────────────────────────────────
// Roles and workflow position
// ──────────────────────────────────────────────

/// A user's role. The first four each own exactly one pipeline stage;
/// supervisor and ICT have administrative visibility but own no stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    PermittingOfficer,
    Chairperson,
    CatchmentManager,
    CatchmentChairperson,
    PermitSupervisor,
    Ict,
}

impl Role {
    /// The pipeline stage this role acts at, if any.
    pub fn owned_stage(self) -> Option<u8> {
        match self {
            Role::PermittingOfficer => Some(1),
            Role::Chairperson => Some(2),
            Role::CatchmentManager => Some(3),
            Role::CatchmentChairperson => Some(4),
            Role::PermitSupervisor | Role::Ict => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::PermittingOfficer => "permitting_officer",
            Role::Chairperson => "chairperson",
            Role::CatchmentManager => "catchment_manager",
            Role::CatchmentChairperson => "catchment_chairperson",
            Role::PermitSupervisor => "permit_supervisor",
            Role::Ict => "ict",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "permitting_officer" => Ok(Role::PermittingOfficer),
            "chairperson" => Ok(Role::Chairperson),
            "catchment_manager" => Ok(Role::CatchmentManager),
            "catchment_chairperson" => Ok(Role::CatchmentChairperson),
            "permit_supervisor" => Ok(Role::PermitSupervisor),
            "ict" => Ok(Role::Ict),
            other => Err(format!("unknown role: {}", other)),
        }
    }
}

/// Application lifecycle label, orthogonal to the stage number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Unsubmitted,
    Submitted,
    UnderReview,
    Approved,
    Rejected,
}

impl Status {
    /// Approved and rejected applications accept no further transitions.
    pub fn is_terminal(self) -> bool {
        matches!(self, Status::Approved | Status::Rejected)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Status::Unsubmitted => "unsubmitted",
            Status::Submitted => "submitted",
            Status::UnderReview => "under_review",
            Status::Approved => "approved",
            Status::Rejected => "rejected",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The (stage, status) pair an application sits at. This is the unit the
/// engine validates against and the key every compare-and-set update uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub stage: u8,
    pub status: Status,
}

impl Position {
    pub const fn new(stage: u8, status: Status) -> Self {
        Self { stage, status }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(stage {}, {})", self.stage, self.status)
    }
}

// ──────────────────────────────────────────────
// Applications
// ──────────────────────────────────────────────

/// Permit classification. Opaque to the lifecycle engine; kept for display
/// and reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermitClass {
    Urban,
    Irrigation,
    Industrial,
}

impl fmt::Display for PermitClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PermitClass::Urban => "urban",
            PermitClass::Irrigation => "irrigation",
            PermitClass::Industrial => "industrial",
        })
    }
}

impl FromStr for PermitClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "urban" => Ok(PermitClass::Urban),
            "irrigation" => Ok(PermitClass::Irrigation),
            "industrial" => Ok(PermitClass::Industrial),
            other => Err(format!("unknown permit class: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaterSource {
    GroundWater,
    SurfaceWater,
}

impl fmt::Display for WaterSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            WaterSource::GroundWater => "ground_water",
            WaterSource::SurfaceWater => "surface_water",
        })
    }
}

impl FromStr for WaterSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ground_water" => Ok(WaterSource::GroundWater),
            "surface_water" => Ok(WaterSource::SurfaceWater),
            other => Err(format!("unknown water source: {}", other)),
        }
    }
}

/// A water-use permit application.
///
/// Mutated only through engine-validated transitions; never deleted.
/// Invariants: a terminal status implies stage 5, and `unsubmitted` implies
/// stage 1.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PermitApplication {
    pub id: String,
    /// Human-readable application code, e.g. `WP2024-0007`.
    pub code: String,
    pub applicant_name: String,
    pub permit_class: PermitClass,
    pub water_source: WaterSource,
    /// Requested allocation in megalitres per annum. Display only.
    pub water_allocation_ml: f64,
    /// Property size in hectares. Display only.
    pub land_size_ha: f64,
    pub current_stage: u8,
    pub status: Status,
    /// ISO 8601 / RFC 3339 timestamp string.
    pub created_at: String,
    /// ISO 8601 / RFC 3339 timestamp string.
    pub updated_at: String,
    pub submitted_at: Option<String>,
    pub approved_at: Option<String>,
    pub rejected_at: Option<String>,
}

impl PermitApplication {
    pub fn position(&self) -> Position {
        Position::new(self.current_stage, self.status)
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// The permit document can be printed once the final decision approved
    /// the application.
    pub fn permit_ready(&self) -> bool {
        self.status == Status::Approved
    }

    /// The rejection notice can be printed once the final decision rejected
    /// the application.
    pub fn rejection_notice_ready(&self) -> bool {
        self.status == Status::Rejected
    }
}

/// Field changes applied by [`crate::PermitStore::update_application`].
/// `None` leaves a field untouched; `updated_at` is always refreshed by the
/// store.
#[derive(Debug, Clone, Default)]
pub struct ApplicationChanges {
    pub stage: Option<u8>,
    pub status: Option<Status>,
    pub submitted_at: Option<String>,
    pub approved_at: Option<String>,
    pub rejected_at: Option<String>,
}

// ──────────────────────────────────────────────
// Comments
// ──────────────────────────────────────────────

/// What a workflow comment records: a stage review, the final approval, or
/// the final rejection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommentAction {
    Review,
    Approve,
    Reject,
}

impl fmt::Display for CommentAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CommentAction::Review => "review",
            CommentAction::Approve => "approve",
            CommentAction::Reject => "reject",
        })
    }
}

/// A workflow comment, written once per (application, stage, role) review
/// event and never mutated. A `reject` comment always carries
/// `is_rejection_reason`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowComment {
    pub id: String,
    pub application_id: String,
    pub author_id: String,
    pub author_role: Role,
    /// Stage number at the time of authorship.
    pub stage: u8,
    pub body: String,
    pub action: CommentAction,
    pub is_rejection_reason: bool,
    /// ISO 8601 / RFC 3339 timestamp string.
    pub created_at: String,
}

/// Comment awaiting append; the store assigns `id` and `created_at`.
#[derive(Debug, Clone)]
pub struct CommentDraft {
    pub application_id: String,
    pub author_id: String,
    pub author_role: Role,
    pub stage: u8,
    pub body: String,
    pub action: CommentAction,
    pub is_rejection_reason: bool,
}

// ──────────────────────────────────────────────
// Activity log
// ──────────────────────────────────────────────

/// An immutable audit record, appended as a side effect of every
/// state-changing action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityLogEntry {
    pub id: String,
    pub actor_id: String,
    pub actor_role: Role,
    /// Short action label, e.g. `Approved Application`.
    pub action: String,
    pub details: String,
    pub application_id: Option<String>,
    /// ISO 8601 / RFC 3339 timestamp string.
    pub recorded_at: String,
}

/// Log entry awaiting append; the store assigns `id` and `recorded_at`.
#[derive(Debug, Clone)]
pub struct LogDraft {
    pub actor_id: String,
    pub actor_role: Role,
    pub action: String,
    pub details: String,
    pub application_id: Option<String>,
}

// ──────────────────────────────────────────────
// Messages and users
// ──────────────────────────────────────────────

/// A dashboard message. `recipient_id == None` means a broadcast visible to
/// everyone. Only consumed here for unread-count derivation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub sender_id: String,
    pub recipient_id: Option<String>,
    pub subject: String,
    pub body: String,
    /// ISO 8601 / RFC 3339 timestamp string.
    pub created_at: String,
    pub read_at: Option<String>,
}

/// Message awaiting append; the store assigns `id` and `created_at`.
#[derive(Debug, Clone)]
pub struct MessageDraft {
    pub sender_id: String,
    pub recipient_id: Option<String>,
    pub subject: String,
    pub body: String,
}

/// A system user. The workflow engine receives actors explicitly; this
/// record exists so callers can resolve a user id to a role.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub username: String,
    pub display_name: String,
    pub role: Role,
}

// ──────────────────────────────────────────────
// Helpers
// ──────────────────────────────────────────────

/// Current UTC time as an ISO 8601 string, second precision.
pub fn now_iso8601() -> String {
    let now = time::OffsetDateTime::now_utc();
    format!(
        "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}Z",
        now.year(),
        now.month() as u8,
        now.day(),
        now.hour(),
        now.minute(),
        now.second()
    )
}

/// Next free application code of the form `WP<year>-<seq>`, scanning the
/// existing set for the highest sequence number used in that year.
pub fn next_application_code(applications: &[PermitApplication], year: i32) -> String {
    let prefix = format!("WP{}-", year);
    let max_seq = applications
        .iter()
        .filter_map(|a| a.code.strip_prefix(&prefix))
        .filter_map(|seq| seq.parse::<u32>().ok())
        .max()
        .unwrap_or(0);
    format!("{}{:04}", prefix, max_seq + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn app_with_code(code: &str) -> PermitApplication {
        PermitApplication {
            id: format!("app-{}", code),
            code: code.to_string(),
            applicant_name: "Test Applicant".to_string(),
            permit_class: PermitClass::Urban,
            water_source: WaterSource::GroundWater,
            water_allocation_ml: 25.0,
            land_size_ha: 2.0,
            current_stage: 1,
            status: Status::Unsubmitted,
            created_at: "2024-01-01T00:00:00Z".to_string(),
            updated_at: "2024-01-01T00:00:00Z".to_string(),
            submitted_at: None,
            approved_at: None,
            rejected_at: None,
        }
    }

    #[test]
    fn role_stage_ownership() {
        assert_eq!(Role::PermittingOfficer.owned_stage(), Some(1));
        assert_eq!(Role::Chairperson.owned_stage(), Some(2));
        assert_eq!(Role::CatchmentManager.owned_stage(), Some(3));
        assert_eq!(Role::CatchmentChairperson.owned_stage(), Some(4));
        assert_eq!(Role::PermitSupervisor.owned_stage(), None);
        assert_eq!(Role::Ict.owned_stage(), None);
    }

    #[test]
    fn role_round_trips_through_str() {
        for role in [
            Role::PermittingOfficer,
            Role::Chairperson,
            Role::CatchmentManager,
            Role::CatchmentChairperson,
            Role::PermitSupervisor,
            Role::Ict,
        ] {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
        assert!("river_god".parse::<Role>().is_err());
    }

    #[test]
    fn terminal_statuses() {
        assert!(Status::Approved.is_terminal());
        assert!(Status::Rejected.is_terminal());
        assert!(!Status::Unsubmitted.is_terminal());
        assert!(!Status::Submitted.is_terminal());
        assert!(!Status::UnderReview.is_terminal());
    }

    #[test]
    fn print_readiness_follows_status() {
        let mut app = app_with_code("WP2024-0001");
        assert!(!app.permit_ready());
        app.status = Status::Approved;
        assert!(app.permit_ready());
        assert!(!app.rejection_notice_ready());
        app.status = Status::Rejected;
        assert!(app.rejection_notice_ready());
    }

    #[test]
    fn application_code_sequences_within_year() {
        let apps = vec![
            app_with_code("WP2024-0001"),
            app_with_code("WP2024-0007"),
            app_with_code("WP2023-0042"),
        ];
        assert_eq!(next_application_code(&apps, 2024), "WP2024-0008");
        assert_eq!(next_application_code(&apps, 2023), "WP2023-0043");
        assert_eq!(next_application_code(&apps, 2025), "WP2025-0001");
        assert_eq!(next_application_code(&[], 2024), "WP2024-0001");
    }

    #[test]
    fn codes_with_foreign_prefixes_are_ignored() {
        let apps = vec![app_with_code("MC2024-0009"), app_with_code("WP2024-0002")];
        assert_eq!(next_application_code(&apps, 2024), "WP2024-0003");
    }

    #[test]
    fn position_display_is_readable() {
        let pos = Position::new(3, Status::UnderReview);
        assert_eq!(pos.to_string(), "(stage 3, under_review)");
    }
}
