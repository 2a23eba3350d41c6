//! Demonstration data: the standard role users plus applications at
//! representative points of the pipeline, with the comment histories that
//! put them there.

use weir_storage::{
    now_iso8601, CommentAction, CommentDraft, MemoryStore, MessageDraft, PermitApplication,
    PermitClass, PermitStore, Role, Status, StorageError, User, WaterSource,
};

struct SeedApp {
    id: &'static str,
    code: &'static str,
    applicant: &'static str,
    class: PermitClass,
    source: WaterSource,
    allocation: f64,
    land: f64,
    stage: u8,
    status: Status,
}

const USERS: &[(&str, &str, &str, Role)] = &[
    ("user-po-001", "jane", "Jane Permitting", Role::PermittingOfficer),
    ("user-chair-001", "bob", "Bob Chairperson", Role::Chairperson),
    ("user-cm-001", "alice", "Alice Catchment", Role::CatchmentManager),
    (
        "user-cchair-001",
        "charlie",
        "Charlie CatchmentChair",
        Role::CatchmentChairperson,
    ),
    ("user-ps-001", "sam", "Sam Supervisor", Role::PermitSupervisor),
    ("user-ict-001", "ida", "Ida Systems", Role::Ict),
];

const APPS: &[SeedApp] = &[
    // Mid-pipeline: waiting on the catchment manager's assessment.
    SeedApp {
        id: "app-0001",
        code: "WP2024-0009",
        applicant: "EcoFarms Ltd",
        class: PermitClass::Irrigation,
        source: WaterSource::GroundWater,
        allocation: 75.0,
        land: 15.0,
        stage: 3,
        status: Status::UnderReview,
    },
    // Rejected at the final decision.
    SeedApp {
        id: "app-0002",
        code: "WP2023-0013",
        applicant: "AgriGrow Corp",
        class: PermitClass::Irrigation,
        source: WaterSource::GroundWater,
        allocation: 50.0,
        land: 12.0,
        stage: 5,
        status: Status::Rejected,
    },
    // Approved end to end.
    SeedApp {
        id: "app-0003",
        code: "WP2024-0014",
        applicant: "AquaSolutions Inc",
        class: PermitClass::Urban,
        source: WaterSource::GroundWater,
        allocation: 25.0,
        land: 2.5,
        stage: 5,
        status: Status::Approved,
    },
    // Still a draft on the officer's desk.
    SeedApp {
        id: "app-0004",
        code: "WP2024-0015",
        applicant: "Mvura Gardens",
        class: PermitClass::Urban,
        source: WaterSource::SurfaceWater,
        allocation: 10.0,
        land: 1.0,
        stage: 1,
        status: Status::Unsubmitted,
    },
];

fn chair_review(application_id: &str, body: &str) -> CommentDraft {
    CommentDraft {
        application_id: application_id.to_string(),
        author_id: "user-chair-001".to_string(),
        author_role: Role::Chairperson,
        stage: 2,
        body: body.to_string(),
        action: CommentAction::Review,
        is_rejection_reason: false,
    }
}

fn manager_review(application_id: &str, body: &str) -> CommentDraft {
    CommentDraft {
        application_id: application_id.to_string(),
        author_id: "user-cm-001".to_string(),
        author_role: Role::CatchmentManager,
        stage: 3,
        body: format!("TECHNICAL ASSESSMENT: {}", body),
        action: CommentAction::Review,
        is_rejection_reason: false,
    }
}

/// Populate an empty store with the demonstration data set.
pub async fn seed(store: &MemoryStore) -> Result<(), StorageError> {
    for (id, username, display_name, role) in USERS {
        store
            .insert_user(User {
                id: id.to_string(),
                username: username.to_string(),
                display_name: display_name.to_string(),
                role: *role,
            })
            .await?;
    }

    for app in APPS {
        let now = now_iso8601();
        store
            .insert_application(PermitApplication {
                id: app.id.to_string(),
                code: app.code.to_string(),
                applicant_name: app.applicant.to_string(),
                permit_class: app.class,
                water_source: app.source,
                water_allocation_ml: app.allocation,
                land_size_ha: app.land,
                current_stage: app.stage,
                status: app.status,
                created_at: now.clone(),
                updated_at: now.clone(),
                submitted_at: (app.stage > 1).then(|| now.clone()),
                approved_at: (app.status == Status::Approved).then(|| now.clone()),
                rejected_at: (app.status == Status::Rejected).then(|| now.clone()),
            })
            .await?;
    }

    let mut unit = store.begin_unit().await?;

    // app-0001: endorsed by the chairperson, assessment still outstanding.
    store
        .add_comment(
            &mut unit,
            chair_review(
                "app-0001",
                "Proposed borehole locations are acceptable and the intended use aligns \
                 with catchment objectives. Forwarded for technical assessment.",
            ),
        )
        .await?;

    // app-0002: full history up to a final rejection.
    store
        .add_comment(
            &mut unit,
            chair_review("app-0002", "Documentation complete; endorsed for assessment."),
        )
        .await?;
    store
        .add_comment(
            &mut unit,
            manager_review(
                "app-0002",
                "Extraction site lies within 500 m of a protected wetland and the \
                 sub-catchment is at 85% of sustainable yield.",
            ),
        )
        .await?;
    store
        .add_comment(
            &mut unit,
            CommentDraft {
                application_id: "app-0002".to_string(),
                author_id: "user-cchair-001".to_string(),
                author_role: Role::CatchmentChairperson,
                stage: 4,
                body: "Rejected on the catchment manager's assessment: unsustainable \
                       extraction near a protected wetland."
                    .to_string(),
                action: CommentAction::Reject,
                is_rejection_reason: true,
            },
        )
        .await?;

    // app-0003: full history up to a final approval.
    store
        .add_comment(
            &mut unit,
            chair_review("app-0003", "No conflicts with existing water rights; endorsed."),
        )
        .await?;
    store
        .add_comment(
            &mut unit,
            manager_review(
                "app-0003",
                "Allocation is within sustainable yield at 45% sub-catchment capacity; \
                 water quality suitable for domestic use.",
            ),
        )
        .await?;
    store
        .add_comment(
            &mut unit,
            CommentDraft {
                application_id: "app-0003".to_string(),
                author_id: "user-cchair-001".to_string(),
                author_role: Role::CatchmentChairperson,
                stage: 4,
                body: "All technical and regulatory requirements satisfied. Permit \
                       authorized for issuance."
                    .to_string(),
                action: CommentAction::Approve,
                is_rejection_reason: false,
            },
        )
        .await?;

    store
        .add_log(
            &mut unit,
            weir_storage::LogDraft {
                actor_id: "user-ict-001".to_string(),
                actor_role: Role::Ict,
                action: "Seeded Demonstration Data".to_string(),
                details: format!("{} users, {} applications", USERS.len(), APPS.len()),
                application_id: None,
            },
        )
        .await?;

    store.commit_unit(unit).await?;

    store
        .add_message(MessageDraft {
            sender_id: "user-chair-001".to_string(),
            recipient_id: None,
            subject: "Quarterly review meeting".to_string(),
            body: "The council meets Thursday to review the pipeline backlog.".to_string(),
        })
        .await?;
    store
        .add_message(MessageDraft {
            sender_id: "user-chair-001".to_string(),
            recipient_id: Some("user-po-001".to_string()),
            subject: "Outstanding drafts".to_string(),
            body: "Please submit any completed drafts before Thursday.".to_string(),
        })
        .await?;

    Ok(())
}
