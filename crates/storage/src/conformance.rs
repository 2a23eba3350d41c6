//! Conformance test suite for [`PermitStore`] implementations.
//!
//! A backend-agnostic set of checks any `PermitStore` backend can run to
//! verify its unit-of-work and compare-and-set behavior:
//!
//! - **init**: insert/get round trip, duplicate and missing-id errors
//! - **unit**: uncommitted mutations invisible, abort and drop discard
//! - **commit**: multi-record units land all-or-nothing
//! - **cas**: stale (stage, status) expectations are rejected, at staging
//!   time and again under the commit lock
//! - **append**: comment/log ordering, store-assigned ids and timestamps
//! - **messages**: unread lifecycle
//!
//! Backend crates call [`run_conformance_suite`] with a factory that
//! produces a fresh, empty store per check:
//!
//! ```ignore
//! let report = run_conformance_suite(|| async { MyStore::connect().await }).await;
//! assert_eq!(report.failed, 0, "{report}");
//! ```

use std::fmt;
use std::future::Future;

use crate::error::StorageError;
use crate::traits::PermitStore;
use crate::types::{
    ApplicationChanges, CommentAction, CommentDraft, LogDraft, MessageDraft, PermitApplication,
    PermitClass, Position, Role, Status, WaterSource,
};

/// Result of a single conformance check.
#[derive(Debug, Clone)]
pub struct CheckResult {
    /// Check category (e.g. "init", "cas").
    pub category: String,
    /// Check name.
    pub name: String,
    pub passed: bool,
    /// Failure message when `passed` is false.
    pub message: Option<String>,
}

impl CheckResult {
    fn from_result(category: &str, name: &str, result: Result<(), String>) -> Self {
        let (passed, message) = match result {
            Ok(()) => (true, None),
            Err(msg) => (false, Some(msg)),
        };
        Self {
            category: category.to_string(),
            name: name.to_string(),
            passed,
            message,
        }
    }
}

/// Aggregated outcome of a conformance run.
#[derive(Debug, Clone)]
pub struct ConformanceReport {
    pub results: Vec<CheckResult>,
    pub passed: usize,
    pub failed: usize,
}

impl fmt::Display for ConformanceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "conformance: {} passed, {} failed", self.passed, self.failed)?;
        for r in self.results.iter().filter(|r| !r.passed) {
            writeln!(
                f,
                "  FAIL {}/{}: {}",
                r.category,
                r.name,
                r.message.as_deref().unwrap_or("(no message)")
            )?;
        }
        Ok(())
    }
}

fn test_application(id: &str) -> PermitApplication {
    PermitApplication {
        id: id.to_string(),
        code: format!("WP2024-{}", id),
        applicant_name: "Conformance Applicant".to_string(),
        permit_class: PermitClass::Urban,
        water_source: WaterSource::SurfaceWater,
        water_allocation_ml: 25.0,
        land_size_ha: 4.0,
        current_stage: 2,
        status: Status::Submitted,
        created_at: "2024-01-01T00:00:00Z".to_string(),
        updated_at: "2024-01-01T00:00:00Z".to_string(),
        submitted_at: Some("2024-01-01T00:00:00Z".to_string()),
        approved_at: None,
        rejected_at: None,
    }
}

fn review_draft(application_id: &str) -> CommentDraft {
    CommentDraft {
        application_id: application_id.to_string(),
        author_id: "user-chair-001".to_string(),
        author_role: Role::Chairperson,
        stage: 2,
        body: "Endorsed for technical assessment.".to_string(),
        action: CommentAction::Review,
        is_rejection_reason: false,
    }
}

fn log_draft(application_id: &str) -> LogDraft {
    LogDraft {
        actor_id: "user-chair-001".to_string(),
        actor_role: Role::Chairperson,
        action: "Application Reviewed".to_string(),
        details: format!("Reviewed application {}", application_id),
        application_id: Some(application_id.to_string()),
    }
}

// ── Individual checks ─────────────────────────────────────────────────

async fn check_insert_get_round_trip<S: PermitStore>(store: S) -> Result<(), String> {
    let app = test_application("a1");
    store.insert_application(app.clone()).await.map_err(|e| e.to_string())?;
    let got = store.get_application("a1").await.map_err(|e| e.to_string())?;
    if got.code != app.code || got.position() != app.position() {
        return Err(format!("round trip mismatch: got {} at {}", got.code, got.position()));
    }
    match store.insert_application(app).await {
        Err(StorageError::DuplicateApplication { .. }) => {}
        other => return Err(format!("expected DuplicateApplication, got {:?}", other.err())),
    }
    match store.get_application("missing").await {
        Err(StorageError::ApplicationNotFound { .. }) => Ok(()),
        other => Err(format!("expected ApplicationNotFound, got {:?}", other.err())),
    }
}

async fn check_uncommitted_invisible<S: PermitStore>(store: S) -> Result<(), String> {
    store
        .insert_application(test_application("a1"))
        .await
        .map_err(|e| e.to_string())?;
    let mut unit = store.begin_unit().await.map_err(|e| e.to_string())?;
    store
        .add_comment(&mut unit, review_draft("a1"))
        .await
        .map_err(|e| e.to_string())?;
    store
        .update_application(
            &mut unit,
            "a1",
            Position::new(2, Status::Submitted),
            ApplicationChanges {
                stage: Some(3),
                status: Some(Status::UnderReview),
                ..Default::default()
            },
        )
        .await
        .map_err(|e| e.to_string())?;

    let comments = store
        .get_comments_by_application("a1")
        .await
        .map_err(|e| e.to_string())?;
    if !comments.is_empty() {
        return Err("staged comment visible before commit".to_string());
    }
    let app = store.get_application("a1").await.map_err(|e| e.to_string())?;
    if app.position() != Position::new(2, Status::Submitted) {
        return Err("staged update visible before commit".to_string());
    }
    // Dropping the unit must discard everything too.
    drop(unit);
    let comments = store
        .get_comments_by_application("a1")
        .await
        .map_err(|e| e.to_string())?;
    if !comments.is_empty() {
        return Err("dropped unit left a comment behind".to_string());
    }
    Ok(())
}

async fn check_abort_discards<S: PermitStore>(store: S) -> Result<(), String> {
    store
        .insert_application(test_application("a1"))
        .await
        .map_err(|e| e.to_string())?;
    let mut unit = store.begin_unit().await.map_err(|e| e.to_string())?;
    store
        .add_comment(&mut unit, review_draft("a1"))
        .await
        .map_err(|e| e.to_string())?;
    store
        .add_log(&mut unit, log_draft("a1"))
        .await
        .map_err(|e| e.to_string())?;
    store.abort_unit(unit).await.map_err(|e| e.to_string())?;

    let comments = store
        .get_comments_by_application("a1")
        .await
        .map_err(|e| e.to_string())?;
    let logs = store.get_logs(10).await.map_err(|e| e.to_string())?;
    if !comments.is_empty() || !logs.is_empty() {
        return Err("aborted unit left records behind".to_string());
    }
    Ok(())
}

async fn check_commit_is_atomic<S: PermitStore>(store: S) -> Result<(), String> {
    store
        .insert_application(test_application("a1"))
        .await
        .map_err(|e| e.to_string())?;
    let mut unit = store.begin_unit().await.map_err(|e| e.to_string())?;
    store
        .update_application(
            &mut unit,
            "a1",
            Position::new(2, Status::Submitted),
            ApplicationChanges {
                stage: Some(3),
                status: Some(Status::UnderReview),
                ..Default::default()
            },
        )
        .await
        .map_err(|e| e.to_string())?;
    store
        .add_comment(&mut unit, review_draft("a1"))
        .await
        .map_err(|e| e.to_string())?;
    store
        .add_log(&mut unit, log_draft("a1"))
        .await
        .map_err(|e| e.to_string())?;
    store.commit_unit(unit).await.map_err(|e| e.to_string())?;

    let app = store.get_application("a1").await.map_err(|e| e.to_string())?;
    if app.position() != Position::new(3, Status::UnderReview) {
        return Err(format!("update not applied: {}", app.position()));
    }
    let comments = store
        .get_comments_by_application("a1")
        .await
        .map_err(|e| e.to_string())?;
    let logs = store.get_logs(10).await.map_err(|e| e.to_string())?;
    if comments.len() != 1 || logs.len() != 1 {
        return Err(format!(
            "expected 1 comment and 1 log, got {} and {}",
            comments.len(),
            logs.len()
        ));
    }
    Ok(())
}

async fn check_cas_rejects_stale_expectation<S: PermitStore>(store: S) -> Result<(), String> {
    store
        .insert_application(test_application("a1"))
        .await
        .map_err(|e| e.to_string())?;
    let mut unit = store.begin_unit().await.map_err(|e| e.to_string())?;
    let result = store
        .update_application(
            &mut unit,
            "a1",
            Position::new(4, Status::UnderReview), // live state is (2, submitted)
            ApplicationChanges {
                status: Some(Status::Approved),
                stage: Some(5),
                ..Default::default()
            },
        )
        .await;
    match result {
        Err(StorageError::ConcurrentConflict { .. }) => Ok(()),
        Ok(_) => Err("stale expectation accepted".to_string()),
        Err(e) => Err(format!("expected ConcurrentConflict, got {}", e)),
    }
}

async fn check_cas_conflict_at_commit<S: PermitStore>(store: S) -> Result<(), String> {
    store
        .insert_application(test_application("a1"))
        .await
        .map_err(|e| e.to_string())?;

    // Both units observe (2, submitted) and stage a valid update.
    let expected = Position::new(2, Status::Submitted);
    let advance = ApplicationChanges {
        stage: Some(3),
        status: Some(Status::UnderReview),
        ..Default::default()
    };
    let mut first = store.begin_unit().await.map_err(|e| e.to_string())?;
    store
        .update_application(&mut first, "a1", expected, advance.clone())
        .await
        .map_err(|e| e.to_string())?;
    store
        .add_comment(&mut first, review_draft("a1"))
        .await
        .map_err(|e| e.to_string())?;

    let mut second = store.begin_unit().await.map_err(|e| e.to_string())?;
    store
        .update_application(&mut second, "a1", expected, advance)
        .await
        .map_err(|e| e.to_string())?;
    store.commit_unit(second).await.map_err(|e| e.to_string())?;

    // The second unit won; the first must now fail wholesale.
    match store.commit_unit(first).await {
        Err(StorageError::ConcurrentConflict { .. }) => {}
        Ok(()) => return Err("conflicting unit committed".to_string()),
        Err(e) => return Err(format!("expected ConcurrentConflict, got {}", e)),
    }
    let comments = store
        .get_comments_by_application("a1")
        .await
        .map_err(|e| e.to_string())?;
    if !comments.is_empty() {
        return Err("conflicting unit leaked its comment".to_string());
    }
    Ok(())
}

async fn check_append_assigns_ids_and_order<S: PermitStore>(store: S) -> Result<(), String> {
    store
        .insert_application(test_application("a1"))
        .await
        .map_err(|e| e.to_string())?;
    let mut unit = store.begin_unit().await.map_err(|e| e.to_string())?;
    let mut first = review_draft("a1");
    first.body = "First pass.".to_string();
    let mut second = review_draft("a1");
    second.body = "Second pass.".to_string();
    let c1 = store
        .add_comment(&mut unit, first)
        .await
        .map_err(|e| e.to_string())?;
    let c2 = store
        .add_comment(&mut unit, second)
        .await
        .map_err(|e| e.to_string())?;
    store.commit_unit(unit).await.map_err(|e| e.to_string())?;

    if c1.id.is_empty() || c2.id.is_empty() || c1.id == c2.id {
        return Err(format!("bad id assignment: {:?} / {:?}", c1.id, c2.id));
    }
    if c1.created_at.is_empty() {
        return Err("missing created_at on appended comment".to_string());
    }
    let comments = store
        .get_comments_by_application("a1")
        .await
        .map_err(|e| e.to_string())?;
    let bodies: Vec<&str> = comments.iter().map(|c| c.body.as_str()).collect();
    if bodies != ["First pass.", "Second pass."] {
        return Err(format!("comments out of order: {:?}", bodies));
    }
    Ok(())
}

async fn check_message_unread_lifecycle<S: PermitStore>(store: S) -> Result<(), String> {
    let msg = store
        .add_message(MessageDraft {
            sender_id: "user-chair-001".to_string(),
            recipient_id: Some("user-po-001".to_string()),
            subject: "Conformance".to_string(),
            body: "Check unread handling.".to_string(),
        })
        .await
        .map_err(|e| e.to_string())?;
    if msg.read_at.is_some() {
        return Err("new message already marked read".to_string());
    }
    store
        .mark_message_read(&msg.id)
        .await
        .map_err(|e| e.to_string())?;
    let messages = store.get_messages().await.map_err(|e| e.to_string())?;
    let read = messages
        .iter()
        .find(|m| m.id == msg.id)
        .ok_or("message vanished")?;
    if read.read_at.is_none() {
        return Err("mark_message_read did not stick".to_string());
    }
    match store.mark_message_read("missing").await {
        Err(StorageError::MessageNotFound { .. }) => Ok(()),
        other => Err(format!("expected MessageNotFound, got {:?}", other.err())),
    }
}

/// Run every conformance check against fresh stores produced by `factory`.
pub async fn run_conformance_suite<S, F, Fut>(factory: F) -> ConformanceReport
where
    S: PermitStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let mut results = Vec::new();

    results.push(CheckResult::from_result(
        "init",
        "insert_get_round_trip",
        check_insert_get_round_trip(factory().await).await,
    ));
    results.push(CheckResult::from_result(
        "unit",
        "uncommitted_invisible",
        check_uncommitted_invisible(factory().await).await,
    ));
    results.push(CheckResult::from_result(
        "unit",
        "abort_discards",
        check_abort_discards(factory().await).await,
    ));
    results.push(CheckResult::from_result(
        "commit",
        "commit_is_atomic",
        check_commit_is_atomic(factory().await).await,
    ));
    results.push(CheckResult::from_result(
        "cas",
        "rejects_stale_expectation",
        check_cas_rejects_stale_expectation(factory().await).await,
    ));
    results.push(CheckResult::from_result(
        "cas",
        "conflict_at_commit",
        check_cas_conflict_at_commit(factory().await).await,
    ));
    results.push(CheckResult::from_result(
        "append",
        "assigns_ids_and_order",
        check_append_assigns_ids_and_order(factory().await).await,
    ));
    results.push(CheckResult::from_result(
        "messages",
        "unread_lifecycle",
        check_message_unread_lifecycle(factory().await).await,
    ));

    let passed = results.iter().filter(|r| r.passed).count();
    let failed = results.len() - passed;
    ConformanceReport {
        results,
        passed,
        failed,
    }
}
