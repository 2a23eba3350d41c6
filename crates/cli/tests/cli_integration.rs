//! CLI integration tests.
//!
//! Uses `assert_cmd` to spawn the `weir` binary against a store file in a
//! temporary directory and verify exit codes, stdout, and stderr.

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use predicates::prelude::*;
use std::path::Path;
use tempfile::TempDir;

/// Helper: a `weir` command pointed at the given store file.
fn weir(store: &Path) -> Command {
    let mut cmd = cargo_bin_cmd!("weir");
    cmd.arg("--store").arg(store);
    cmd
}

/// Helper: a seeded temporary store.
fn seeded() -> (TempDir, std::path::PathBuf) {
    let dir = TempDir::new().unwrap();
    let store = dir.path().join("store.json");
    weir(&store).arg("seed").assert().success();
    (dir, store)
}

fn applications(store: &Path) -> serde_json::Value {
    let output = weir(store)
        .args(["list", "--output", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());
    serde_json::from_slice(&output.stdout).unwrap()
}

fn application<'a>(listing: &'a serde_json::Value, id: &str) -> &'a serde_json::Value {
    listing
        .as_array()
        .unwrap()
        .iter()
        .find(|a| a["id"] == id)
        .unwrap_or_else(|| panic!("application {} missing from listing", id))
}

// ──────────────────────────────────────────────
// Basics
// ──────────────────────────────────────────────

#[test]
fn help_exits_0_with_description() {
    let mut cmd = cargo_bin_cmd!("weir");
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Water-use permit workflow toolchain"));
}

#[test]
fn commands_require_an_existing_store() {
    let dir = TempDir::new().unwrap();
    let store = dir.path().join("missing.json");
    weir(&store)
        .arg("list")
        .assert()
        .failure()
        .stderr(predicate::str::contains("run `weir seed` first"));
}

#[test]
fn seed_refuses_to_overwrite_without_force() {
    let (_dir, store) = seeded();
    weir(&store)
        .arg("seed")
        .assert()
        .failure()
        .stderr(predicate::str::contains("--force"));
    weir(&store).args(["seed", "--force"]).assert().success();
}

#[test]
fn seeded_store_lists_the_demonstration_set() {
    let (_dir, store) = seeded();
    let listing = applications(&store);
    assert_eq!(listing.as_array().unwrap().len(), 4);
    assert_eq!(application(&listing, "app-0003")["status"], "approved");
    assert_eq!(application(&listing, "app-0003")["current_stage"], 5);
}

// ──────────────────────────────────────────────
// Full pipeline walk
// ──────────────────────────────────────────────

#[test]
fn draft_travels_the_whole_pipeline_to_approval() {
    let (_dir, store) = seeded();

    // Officer submits the outstanding draft.
    weir(&store)
        .args(["submit-all", "--user", "user-po-001"])
        .assert()
        .success()
        .stdout(predicate::str::contains("app-0004"));

    // Chairperson reviews and advances.
    weir(&store)
        .args(["review", "app-0004", "--user", "user-chair-001"])
        .assert()
        .success();
    weir(&store)
        .args(["advance-all", "--user", "user-chair-001"])
        .assert()
        .success();

    // Catchment manager must leave a real assessment on every application
    // at the stage before the batch can move, including the seeded one.
    for id in ["app-0001", "app-0004"] {
        weir(&store)
            .args([
                "review",
                id,
                "--user",
                "user-cm-001",
                "--comment",
                "Surface abstraction is modest and within allocation limits.",
            ])
            .assert()
            .success();
    }
    weir(&store)
        .args(["advance-all", "--user", "user-cm-001"])
        .assert()
        .success();

    // Final decision.
    weir(&store)
        .args(["approve", "app-0004", "--user", "user-cchair-001"])
        .assert()
        .success()
        .stdout(predicate::str::contains("ready for printing"));

    let listing = applications(&store);
    let app = application(&listing, "app-0004");
    assert_eq!(app["status"], "approved");
    assert_eq!(app["current_stage"], 5);
    assert!(app["approved_at"].is_string());

    // The walk left an audit trail.
    weir(&store)
        .args(["log", "--limit", "50"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Submitted Application"))
        .stdout(predicate::str::contains("Advanced Application"))
        .stdout(predicate::str::contains("Approved Application"));
}

// ──────────────────────────────────────────────
// Gate refusals surface as errors
// ──────────────────────────────────────────────

#[test]
fn short_manager_assessment_is_refused() {
    let (_dir, store) = seeded();
    weir(&store)
        .args([
            "review", "app-0001", "--user", "user-cm-001", "--comment", "looks ok",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("at least 20 characters"));
}

#[test]
fn advance_with_pending_reviews_lists_the_blockers() {
    let (_dir, store) = seeded();
    // app-0001 sits at stage 3 with no manager review yet.
    weir(&store)
        .args(["advance-all", "--user", "user-cm-001"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("awaiting review"))
        .stderr(predicate::str::contains("app-0001"));
}

#[test]
fn rejection_requires_a_reason() {
    let (_dir, store) = seeded();
    weir(&store)
        .args([
            "reject", "app-0001", "--user", "user-cchair-001", "--reason", "   ",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("rejection reason is required"));
}

#[test]
fn terminal_applications_refuse_further_decisions() {
    let (_dir, store) = seeded();
    weir(&store)
        .args([
            "reject",
            "app-0003",
            "--user",
            "user-cchair-001",
            "--reason",
            "Changed our minds",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already approved"));
}

// ──────────────────────────────────────────────
// Drafting and badges
// ──────────────────────────────────────────────

#[test]
fn new_drafts_start_unsubmitted_at_stage_one() {
    let (_dir, store) = seeded();
    weir(&store)
        .args([
            "new",
            "--user",
            "user-po-001",
            "--applicant",
            "Kintyre Estates",
            "--class",
            "industrial",
            "--source",
            "ground_water",
            "--allocation",
            "120",
            "--land",
            "30",
        ])
        .assert()
        .success();

    let listing = applications(&store);
    assert_eq!(listing.as_array().unwrap().len(), 5);
    let app = application(&listing, "app-0005");
    assert_eq!(app["status"], "unsubmitted");
    assert_eq!(app["current_stage"], 1);
}

#[test]
fn unread_counts_reflect_the_seeded_messages() {
    let (_dir, store) = seeded();
    // The officer has one broadcast and one direct message waiting.
    weir(&store)
        .args(["unread", "--user", "user-po-001", "--output", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"broadcast\": 1"))
        .stdout(predicate::str::contains("\"direct\": 1"));

    // The sender sees neither of their own messages.
    weir(&store)
        .args(["unread", "--user", "user-chair-001"])
        .assert()
        .success()
        .stdout(predicate::str::contains("0 broadcast, 0 direct"));
}

#[test]
fn comment_history_shows_the_rejection_reason() {
    let (_dir, store) = seeded();
    weir(&store)
        .args(["comments", "app-0002"])
        .assert()
        .success()
        .stdout(predicate::str::contains("TECHNICAL ASSESSMENT"))
        .stdout(predicate::str::contains("catchment_chairperson (reject)"));
}
