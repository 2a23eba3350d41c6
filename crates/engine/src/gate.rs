//! The review gate: role-specific input requirements in front of the
//! engine.
//!
//! The gate validates what each role must supply -- an acknowledgement, an
//! assessment of minimum length, a rejection reason -- and refuses bad input
//! before the engine is ever invoked. State-machine rules stay in the
//! engine; the gate owns only input validation and eligibility listings.

use weir_storage::{PermitApplication, PermitStore, Role};

use crate::lifecycle::{Actor, LifecycleEngine, TransitionError, TransitionPayload};
use crate::rules::{actionable_position, Action};

/// Minimum length of a catchment manager's technical assessment.
pub const MANAGER_ASSESSMENT_MIN_CHARS: usize = 20;

/// Prefix stored in front of every catchment manager assessment.
pub const TECHNICAL_ASSESSMENT_PREFIX: &str = "TECHNICAL ASSESSMENT: ";

/// Input rejected before the engine ran. Immediately retryable after the
/// input is corrected.
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("assessment comment must be at least {minimum} characters, got {actual}")]
    CommentTooShort { minimum: usize, actual: usize },

    #[error("a rejection reason is required")]
    ReasonRequired,

    #[error("the review must be acknowledged before it can be saved")]
    NotAcknowledged,
}

#[derive(Debug, thiserror::Error)]
pub enum GateError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Transition(#[from] TransitionError),
}

impl GateError {
    fn storage(e: weir_storage::StorageError) -> Self {
        GateError::Transition(TransitionError::Storage(e))
    }
}

/// What a reviewer supplies: the acknowledgement checkbox and an optional
/// comment. Whether the comment is in fact optional depends on the role.
#[derive(Debug, Clone, Default)]
pub struct ReviewInput {
    pub acknowledged: bool,
    pub comment: Option<String>,
}

impl ReviewInput {
    /// Acknowledgement only, no comment text.
    pub fn acknowledged() -> Self {
        Self {
            acknowledged: true,
            comment: None,
        }
    }

    /// Acknowledgement plus comment text.
    pub fn with_comment(text: impl Into<String>) -> Self {
        Self {
            acknowledged: true,
            comment: Some(text.into()),
        }
    }
}

/// An application a role can currently act on, with the derived
/// reviewed-by-this-role flag.
#[derive(Debug, Clone)]
pub struct EligibleApplication {
    pub application: PermitApplication,
    pub already_reviewed: bool,
}

/// Per-role wrapper around the [`LifecycleEngine`].
pub struct ReviewGate<S> {
    engine: LifecycleEngine<S>,
}

impl<S: PermitStore> ReviewGate<S> {
    pub fn new(engine: LifecycleEngine<S>) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &LifecycleEngine<S> {
        &self.engine
    }

    /// Applications whose live (stage, status) match the actor role's
    /// actionable row. Roles without an actionable row (supervisor, ICT)
    /// get the full set for cross-cutting visibility; any transition they
    /// attempt is refused by the engine.
    pub async fn eligible_applications(
        &self,
        actor: &Actor,
    ) -> Result<Vec<EligibleApplication>, GateError> {
        let applications = self
            .engine
            .store()
            .get_applications()
            .await
            .map_err(GateError::storage)?;

        let Some(position) = actionable_position(actor.role) else {
            return Ok(applications
                .into_iter()
                .map(|application| EligibleApplication {
                    application,
                    already_reviewed: false,
                })
                .collect());
        };

        let mut eligible = Vec::new();
        for application in applications {
            if application.position() != position {
                continue;
            }
            let already_reviewed = self
                .engine
                .has_review_comment(&application.id, position.stage, actor.role)
                .await
                .map_err(GateError::storage)?;
            eligible.push(EligibleApplication {
                application,
                already_reviewed,
            });
        }
        Ok(eligible)
    }

    /// Officer submission of a drafted application into the pipeline.
    pub async fn submit(
        &self,
        actor: &Actor,
        application_id: &str,
    ) -> Result<PermitApplication, GateError> {
        Ok(self
            .engine
            .attempt_transition(application_id, actor, Action::Submit, TransitionPayload::none())
            .await?)
    }

    /// Record a stage review.
    ///
    /// - every role must tick the acknowledgement;
    /// - a catchment manager must supply an assessment of at least
    ///   [`MANAGER_ASSESSMENT_MIN_CHARS`] characters (trimmed), stored with
    ///   the [`TECHNICAL_ASSESSMENT_PREFIX`];
    /// - other reviewing roles may omit the comment, in which case the
    ///   engine records its fixed endorsement text.
    pub async fn review(
        &self,
        actor: &Actor,
        application_id: &str,
        input: ReviewInput,
    ) -> Result<PermitApplication, GateError> {
        if !input.acknowledged {
            return Err(ValidationError::NotAcknowledged.into());
        }

        let trimmed = input
            .comment
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty());

        let payload = if actor.role == Role::CatchmentManager {
            let assessment = trimmed.unwrap_or("");
            let actual = assessment.chars().count();
            if actual < MANAGER_ASSESSMENT_MIN_CHARS {
                return Err(ValidationError::CommentTooShort {
                    minimum: MANAGER_ASSESSMENT_MIN_CHARS,
                    actual,
                }
                .into());
            }
            TransitionPayload::with_comment(format!(
                "{}{}",
                TECHNICAL_ASSESSMENT_PREFIX, assessment
            ))
        } else {
            match trimmed {
                Some(text) => TransitionPayload::with_comment(text),
                None => TransitionPayload::none(),
            }
        };

        Ok(self
            .engine
            .attempt_transition(application_id, actor, Action::Review, payload)
            .await?)
    }

    /// Final approval. The comment is optional; without one the engine
    /// records its fixed approval note.
    pub async fn approve(
        &self,
        actor: &Actor,
        application_id: &str,
        comment: Option<&str>,
    ) -> Result<PermitApplication, GateError> {
        let payload = match comment.map(str::trim).filter(|c| !c.is_empty()) {
            Some(text) => TransitionPayload::with_comment(text),
            None => TransitionPayload::none(),
        };
        Ok(self
            .engine
            .attempt_transition(application_id, actor, Action::Approve, payload)
            .await?)
    }

    /// Final rejection. A non-empty reason is mandatory; it becomes the
    /// rejection-reason comment.
    pub async fn reject(
        &self,
        actor: &Actor,
        application_id: &str,
        reason: &str,
    ) -> Result<PermitApplication, GateError> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(ValidationError::ReasonRequired.into());
        }
        Ok(self
            .engine
            .attempt_transition(
                application_id,
                actor,
                Action::Reject,
                TransitionPayload::with_comment(reason),
            )
            .await?)
    }
}
