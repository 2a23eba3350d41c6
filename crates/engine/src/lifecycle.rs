//! The lifecycle engine.
//!
//! [`LifecycleEngine::attempt_transition`] validates and applies one
//! transition against the application's **live** state, never the state the
//! caller observed when it built its screen. The whole transition --
//! application update (compare-and-set on the live (stage, status)), comment
//! append when one is produced, activity-log append -- runs inside a single
//! storage unit of work, so either all of it lands or none of it does.

use std::sync::Arc;

use weir_storage::{
    now_iso8601, ApplicationChanges, CommentAction, CommentDraft, LogDraft, PermitApplication,
    PermitStore, Role, Status, StorageError,
};

use crate::rules::{rule_for, stage_owner, Action, TransitionRule};

/// Endorsement recorded when a chairperson acknowledges a review without
/// writing their own comment.
pub const CHAIRPERSON_ENDORSEMENT: &str = "Application reviewed and endorsed by the sub-catchment \
     council chairperson. Forwarded to the catchment manager for technical assessment.";

/// Comment recorded for an approval when the chairperson adds no text.
pub const APPROVAL_NOTE: &str = "Application approved by the catchment chairperson.";

/// Fallback review note. Only reachable when a caller bypasses the review
/// gate, which enforces role-specific comment requirements first.
const GENERIC_REVIEW_NOTE: &str = "Application reviewed.";

const GENERIC_REJECTION_NOTE: &str = "Application rejected.";

/// Who is performing a transition. Always passed explicitly; the engine
/// holds no ambient session state.
#[derive(Debug, Clone)]
pub struct Actor {
    pub user_id: String,
    pub role: Role,
}

impl Actor {
    pub fn new(user_id: impl Into<String>, role: Role) -> Self {
        Self {
            user_id: user_id.into(),
            role,
        }
    }
}

/// Caller-supplied input for a transition. Comment requirements are enforced
/// by the review gate; the engine takes whatever it is given and falls back
/// to fixed note texts where the workflow requires a comment to exist.
#[derive(Debug, Clone, Default)]
pub struct TransitionPayload {
    pub comment: Option<String>,
}

impl TransitionPayload {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn with_comment(text: impl Into<String>) -> Self {
        Self {
            comment: Some(text.into()),
        }
    }
}

/// Why a transition was refused. Every variant maps to exactly one
/// user-facing message; nothing is ever collapsed into a generic failure.
#[derive(Debug, thiserror::Error)]
pub enum TransitionError {
    /// The live (stage, status, role, action) combination matches no row of
    /// the transition table. Not retryable without different inputs.
    #[error("{role} cannot {action} an application at stage {stage} with status {status}")]
    IllegalState {
        stage: u8,
        status: Status,
        role: Role,
        action: Action,
    },

    /// The application already carries a final decision.
    #[error("application {application_id} is already {status}; no further action is possible")]
    TerminalState {
        application_id: String,
        status: Status,
    },

    /// An advance was attempted while applications remain unreviewed.
    /// Retryable once every listed application has been reviewed.
    #[error("{} application(s) still awaiting review", .pending.len())]
    IncompleteReview { pending: Vec<String> },

    /// Another actor committed a transition first. The caller must reload
    /// before retrying.
    #[error("application {application_id} was changed by another user; reload and try again")]
    ConcurrentModification { application_id: String },

    /// The storage backend failed.
    #[error("storage failure: {0}")]
    Storage(StorageError),
}

/// Map a storage error, surfacing compare-and-set conflicts as
/// [`TransitionError::ConcurrentModification`].
fn storage_err(e: StorageError) -> TransitionError {
    match e {
        StorageError::ConcurrentConflict { application_id, .. } => {
            TransitionError::ConcurrentModification { application_id }
        }
        other => TransitionError::Storage(other),
    }
}

/// The state machine shared by every role dashboard.
pub struct LifecycleEngine<S> {
    store: Arc<S>,
}

impl<S> Clone for LifecycleEngine<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: PermitStore> LifecycleEngine<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// The derived "reviewed" predicate: a role has reviewed an application
    /// at a stage exactly when a review comment by that role at that stage
    /// exists. No separate flag is stored, so the predicate can never
    /// diverge from the comment history.
    pub async fn has_review_comment(
        &self,
        application_id: &str,
        stage: u8,
        role: Role,
    ) -> Result<bool, StorageError> {
        let comments = self.store.get_comments_by_application(application_id).await?;
        Ok(comments
            .iter()
            .any(|c| c.stage == stage && c.author_role == role && c.action == CommentAction::Review))
    }

    /// Validate and apply a single transition.
    ///
    /// Re-reads the application inside the unit of work and validates the
    /// requested action against that live state; the update is a
    /// compare-and-set on the live (stage, status), so a racing actor's
    /// commit surfaces as [`TransitionError::ConcurrentModification`].
    pub async fn attempt_transition(
        &self,
        application_id: &str,
        actor: &Actor,
        action: Action,
        payload: TransitionPayload,
    ) -> Result<PermitApplication, TransitionError> {
        let mut unit = self.store.begin_unit().await.map_err(storage_err)?;

        let live = match self
            .store
            .get_application_for_update(&mut unit, application_id)
            .await
        {
            Ok(app) => app,
            Err(e) => {
                let _ = self.store.abort_unit(unit).await;
                return Err(storage_err(e));
            }
        };

        if live.status.is_terminal() {
            let _ = self.store.abort_unit(unit).await;
            return Err(TransitionError::TerminalState {
                application_id: live.id,
                status: live.status,
            });
        }

        let rule = match rule_for(live.position(), actor.role, action) {
            Some(rule) => rule,
            None => {
                let _ = self.store.abort_unit(unit).await;
                return Err(TransitionError::IllegalState {
                    stage: live.current_stage,
                    status: live.status,
                    role: actor.role,
                    action,
                });
            }
        };

        if rule.requires_review {
            let reviewed = match self
                .has_review_comment(application_id, live.current_stage, actor.role)
                .await
            {
                Ok(reviewed) => reviewed,
                Err(e) => {
                    let _ = self.store.abort_unit(unit).await;
                    return Err(storage_err(e));
                }
            };
            if !reviewed {
                let _ = self.store.abort_unit(unit).await;
                return Err(TransitionError::IncompleteReview {
                    pending: vec![live.id],
                });
            }
        }

        let changes = changes_for(rule, action);
        let updated = match self
            .store
            .update_application(&mut unit, application_id, live.position(), changes)
            .await
        {
            Ok(app) => app,
            Err(e) => {
                let _ = self.store.abort_unit(unit).await;
                return Err(storage_err(e));
            }
        };

        if let Some(draft) = comment_for(&live, actor, action, &payload) {
            if let Err(e) = self.store.add_comment(&mut unit, draft).await {
                let _ = self.store.abort_unit(unit).await;
                return Err(storage_err(e));
            }
        }

        let log = log_for(&live, rule, actor, action, &payload);
        if let Err(e) = self.store.add_log(&mut unit, log).await {
            let _ = self.store.abort_unit(unit).await;
            return Err(storage_err(e));
        }

        self.store.commit_unit(unit).await.map_err(storage_err)?;
        Ok(updated)
    }
}

/// Field changes for a transition: the target (stage, status) when it
/// differs from the source, plus the lifecycle timestamp the action sets.
fn changes_for(rule: &TransitionRule, action: Action) -> ApplicationChanges {
    let mut changes = ApplicationChanges::default();
    if rule.to != rule.from {
        changes.stage = Some(rule.to.stage);
        changes.status = Some(rule.to.status);
    }
    match action {
        Action::Submit => changes.submitted_at = Some(now_iso8601()),
        Action::Approve => changes.approved_at = Some(now_iso8601()),
        Action::Reject => changes.rejected_at = Some(now_iso8601()),
        Action::Review | Action::Advance => {}
    }
    changes
}

/// The comment a transition records, if any. Submit and Advance append
/// none; Review always records one (presence of the comment is what marks
/// the application reviewed); decisions record the supplied text or a fixed
/// note.
fn comment_for(
    live: &PermitApplication,
    actor: &Actor,
    action: Action,
    payload: &TransitionPayload,
) -> Option<CommentDraft> {
    let (body, comment_action, is_rejection_reason) = match action {
        Action::Submit | Action::Advance => return None,
        Action::Review => {
            let body = payload.comment.clone().unwrap_or_else(|| {
                match actor.role {
                    Role::Chairperson => CHAIRPERSON_ENDORSEMENT,
                    _ => GENERIC_REVIEW_NOTE,
                }
                .to_string()
            });
            (body, CommentAction::Review, false)
        }
        Action::Approve => {
            let body = payload
                .comment
                .clone()
                .unwrap_or_else(|| APPROVAL_NOTE.to_string());
            (body, CommentAction::Approve, false)
        }
        Action::Reject => {
            let body = payload
                .comment
                .clone()
                .unwrap_or_else(|| GENERIC_REJECTION_NOTE.to_string());
            (body, CommentAction::Reject, true)
        }
    };
    Some(CommentDraft {
        application_id: live.id.clone(),
        author_id: actor.user_id.clone(),
        author_role: actor.role,
        stage: live.current_stage,
        body,
        action: comment_action,
        is_rejection_reason,
    })
}

/// The audit entry every successful transition appends.
fn log_for(
    live: &PermitApplication,
    rule: &TransitionRule,
    actor: &Actor,
    action: Action,
    payload: &TransitionPayload,
) -> LogDraft {
    let (label, details) = match action {
        Action::Submit => (
            "Submitted Application",
            format!("Submitted application {} for review", live.code),
        ),
        Action::Review => match actor.role {
            Role::CatchmentManager => (
                "Technical Review Completed",
                format!("Completed technical assessment for application {}", live.code),
            ),
            _ => (
                "Application Reviewed",
                format!("Reviewed application {}", live.code),
            ),
        },
        Action::Advance => {
            let next = stage_owner(rule.to.stage)
                .map(|r| r.as_str())
                .unwrap_or("next stage");
            (
                "Advanced Application",
                format!("Advanced application {} to {}", live.code, next),
            )
        }
        Action::Approve => (
            "Approved Application",
            format!("Approved application {}", live.code),
        ),
        Action::Reject => {
            let reason = payload.comment.as_deref().unwrap_or(GENERIC_REJECTION_NOTE);
            (
                "Rejected Application",
                format!("Rejected application {}: {}", live.code, reason),
            )
        }
    };
    LogDraft {
        actor_id: actor.user_id.clone(),
        actor_role: actor.role,
        action: label.to_string(),
        details,
        application_id: Some(live.id.clone()),
    }
}
