//! Bulk submission coordinator.
//!
//! Batch advance is a two-phase operation: validate the whole set first
//! (every application must already be reviewed), then commit each
//! application's transition one at a time. There is no cross-application
//! transaction in the store, so a mid-batch failure stops the loop and is
//! reported explicitly -- committed work stays committed, nothing is rolled
//! back or silently skipped, and nothing is retried.

use weir_storage::{PermitApplication, PermitStore};

use crate::audit::AuditRecorder;
use crate::lifecycle::{Actor, LifecycleEngine, TransitionError, TransitionPayload};
use crate::rules::{actionable_position, rule_for, stage_owner, Action};

/// Where a batch stopped: the application that failed, why, and the ones
/// never attempted.
#[derive(Debug)]
pub struct BatchHalt {
    pub application_id: String,
    pub error: TransitionError,
    pub not_attempted: Vec<String>,
}

/// Outcome of a batch run. `halted` is `None` when every application went
/// through.
#[derive(Debug)]
pub struct BatchReport {
    pub applied: Vec<String>,
    pub halted: Option<BatchHalt>,
}

impl BatchReport {
    pub fn fully_applied(&self) -> bool {
        self.halted.is_none()
    }
}

pub struct BulkCoordinator<S> {
    engine: LifecycleEngine<S>,
    audit: AuditRecorder<S>,
}

impl<S: PermitStore> BulkCoordinator<S> {
    pub fn new(engine: LifecycleEngine<S>) -> Self {
        let audit = AuditRecorder::new(engine.store().clone());
        Self { engine, audit }
    }

    /// Advance every reviewed application the actor's role is responsible
    /// for at its stage.
    ///
    /// Refused wholesale with [`TransitionError::IncompleteReview`] -- listing
    /// every blocking application -- if any application at the stage has not
    /// been reviewed yet. Roles with no advance row find nothing to do and
    /// get an empty report.
    pub async fn advance_all(&self, actor: &Actor) -> Result<BatchReport, TransitionError> {
        let batch = self.batch_for(actor, Action::Advance).await?;

        let mut pending = Vec::new();
        let mut reviewed = Vec::new();
        for application in batch {
            let has_review = self
                .engine
                .has_review_comment(&application.id, application.current_stage, actor.role)
                .await
                .map_err(TransitionError::Storage)?;
            if has_review {
                reviewed.push(application);
            } else {
                pending.push(application.id);
            }
        }
        if !pending.is_empty() {
            return Err(TransitionError::IncompleteReview { pending });
        }

        let report = self.apply_each(actor, Action::Advance, reviewed).await;

        if !report.applied.is_empty() {
            let next = actionable_position(actor.role)
                .and_then(|pos| rule_for(pos, actor.role, Action::Advance))
                .and_then(|rule| stage_owner(rule.to.stage))
                .map(|role| role.as_str())
                .unwrap_or("next stage");
            let _ = self
                .audit
                .record(
                    actor,
                    "Batch Advance Completed",
                    &format!(
                        "Advanced {} application(s) to {}",
                        report.applied.len(),
                        next
                    ),
                    None,
                )
                .await;
        }
        Ok(report)
    }

    /// Submit every unsubmitted application. Officer convenience; no review
    /// precondition, same stop-on-failure reporting as a batch advance.
    pub async fn submit_all(&self, actor: &Actor) -> Result<BatchReport, TransitionError> {
        let batch = self.batch_for(actor, Action::Submit).await?;
        let report = self.apply_each(actor, Action::Submit, batch).await;

        if !report.applied.is_empty() {
            let _ = self
                .audit
                .record(
                    actor,
                    "Batch Submit Completed",
                    &format!("Submitted {} application(s) for review", report.applied.len()),
                    None,
                )
                .await;
        }
        Ok(report)
    }

    /// The applications sitting at the actor's actionable row, provided the
    /// role actually has a rule for `action` there.
    async fn batch_for(
        &self,
        actor: &Actor,
        action: Action,
    ) -> Result<Vec<PermitApplication>, TransitionError> {
        let Some(position) =
            actionable_position(actor.role).filter(|pos| rule_for(*pos, actor.role, action).is_some())
        else {
            return Ok(Vec::new());
        };
        let applications = self
            .engine
            .store()
            .get_applications()
            .await
            .map_err(TransitionError::Storage)?;
        Ok(applications
            .into_iter()
            .filter(|a| a.position() == position)
            .collect())
    }

    /// Commit-each phase: apply the action sequentially, stopping at the
    /// first failure.
    async fn apply_each(
        &self,
        actor: &Actor,
        action: Action,
        batch: Vec<PermitApplication>,
    ) -> BatchReport {
        let mut applied = Vec::new();
        let mut halted = None;
        let mut remaining = batch.into_iter();

        while let Some(application) = remaining.next() {
            match self
                .engine
                .attempt_transition(&application.id, actor, action, TransitionPayload::none())
                .await
            {
                Ok(_) => applied.push(application.id),
                Err(error) => {
                    halted = Some(BatchHalt {
                        application_id: application.id,
                        error,
                        not_attempted: remaining.map(|a| a.id).collect(),
                    });
                    break;
                }
            }
        }
        BatchReport { applied, halted }
    }
}
