use std::sync::Arc;

use chrono::Utc;
use serde::Deserialize;
use tracing::{debug, info, warn};

use super::super::completeness::CompletenessCheck;
use super::super::domain::{is_blank, OfficeId, Report, ReportId};
use super::super::errors::{ErrorKind, Field, ValidationErrors};
use super::super::repository::{RepositoryError, ReportRepository};
use super::machine::{ReportStateMachine, Transition, TransitionError};

/// Attributes merged into the report before assignment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct AssignParams {
    #[serde(default)]
    pub office_id: Option<OfficeId>,
}

/// Tax office answer merged before deny/approve/reject.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ReviewParams {
    #[serde(default)]
    pub reponse: Option<String>,
}

pub type StateResult = Result<Report, StateServiceError>;

/// Validate-then-transition-then-persist wrappers around [`ReportStateMachine`].
///
/// Failed operations leave the merged attributes on the in-memory report but
/// restore its state and milestones.
pub struct ReportStateService<R> {
    repository: Arc<R>,
}

impl<R> ReportStateService<R>
where
    R: ReportRepository + 'static,
{
    pub fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }

    pub fn repository(&self) -> &Arc<R> {
        &self.repository
    }

    pub fn fetch(&self, id: &ReportId) -> Result<Report, StateServiceError> {
        let report = self
            .repository
            .fetch(id)?
            .ok_or(RepositoryError::NotFound)?;
        Ok(report)
    }

    pub fn complete(&self, report: &mut Report) -> StateResult {
        let errors = CompletenessCheck::new(report).errors();
        self.apply(report, Transition::Complete, errors)
    }

    pub fn uncomplete(&self, report: &mut Report) -> StateResult {
        self.apply(report, Transition::Uncomplete, ValidationErrors::new())
    }

    pub fn acknowledge(&self, report: &mut Report) -> StateResult {
        self.apply(report, Transition::Acknowledge, ValidationErrors::new())
    }

    pub fn accept(&self, report: &mut Report) -> StateResult {
        self.apply(report, Transition::Accept, ValidationErrors::new())
    }

    pub fn assign(&self, report: &mut Report, params: AssignParams) -> StateResult {
        if let Some(office_id) = params.office_id {
            report.office_id = if office_id.0.trim().is_empty() {
                None
            } else {
                Some(office_id)
            };
        }

        let mut errors = ValidationErrors::new();
        if report.office_id.is_none() {
            errors.add(Field::OfficeId, ErrorKind::Blank);
        }
        self.apply(report, Transition::Assign, errors)
    }

    pub fn unassign(&self, report: &mut Report) -> StateResult {
        self.apply(report, Transition::Unassign, ValidationErrors::new())
    }

    /// Office staff started working on an assigned report.
    pub fn process(&self, report: &mut Report) -> StateResult {
        self.apply(report, Transition::Process, ValidationErrors::new())
    }

    pub fn deny(&self, report: &mut Report, params: ReviewParams) -> StateResult {
        merge_review(report, params);
        let errors = require_reponse(report);
        self.apply(report, Transition::Deny, errors)
    }

    pub fn undeny(&self, report: &mut Report) -> StateResult {
        self.apply(report, Transition::Undeny, ValidationErrors::new())
    }

    pub fn approve(&self, report: &mut Report, params: ReviewParams) -> StateResult {
        merge_review(report, params);
        self.apply(report, Transition::Approve, ValidationErrors::new())
    }

    pub fn unapprove(&self, report: &mut Report) -> StateResult {
        self.apply(report, Transition::Unapprove, ValidationErrors::new())
    }

    pub fn reject(&self, report: &mut Report, params: ReviewParams) -> StateResult {
        merge_review(report, params);
        let errors = require_reponse(report);
        self.apply(report, Transition::Reject, errors)
    }

    pub fn unreject(&self, report: &mut Report) -> StateResult {
        self.apply(report, Transition::Unreject, ValidationErrors::new())
    }

    /// DDFIP administrators confirm the office decision.
    pub fn confirm(&self, report: &mut Report) -> StateResult {
        self.apply(report, Transition::Confirm, ValidationErrors::new())
    }

    pub fn cancel(&self, report: &mut Report) -> StateResult {
        self.apply(report, Transition::Cancel, ValidationErrors::new())
    }

    fn apply(
        &self,
        report: &mut Report,
        transition: Transition,
        errors: ValidationErrors,
    ) -> StateResult {
        if !errors.is_empty() {
            debug!(report_id = %report.id, %transition, %errors, "report transition blocked by validation");
            return Err(StateServiceError::Invalid(errors));
        }

        let snapshot = report.clone();
        let from = report.state;
        let to = ReportStateMachine::fire(report, transition, Utc::now()).map_err(|error| {
            debug!(report_id = %report.id, %error, "report transition refused");
            error
        })?;

        if let Err(error) = self.repository.update_if_state(from, report.clone()) {
            warn!(report_id = %report.id, %transition, %error, "failed to persist report transition");
            *report = snapshot;
            return Err(error.into());
        }

        info!(report_id = %report.id, %from, %to, %transition, "report transition applied");
        Ok(report.clone())
    }
}

fn merge_review(report: &mut Report, params: ReviewParams) {
    if let Some(reponse) = params.reponse {
        report.reponse = Some(reponse);
    }
}

fn require_reponse(report: &Report) -> ValidationErrors {
    let mut errors = ValidationErrors::new();
    if is_blank(&report.reponse) {
        errors.add(Field::Reponse, ErrorKind::Blank);
    }
    errors
}

/// Failure of a state-service operation.
#[derive(Debug, thiserror::Error)]
pub enum StateServiceError {
    #[error("report is invalid: {0}")]
    Invalid(ValidationErrors),
    #[error(transparent)]
    Transition(#[from] TransitionError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl StateServiceError {
    /// Validation errors carried by the failure, if any.
    pub fn errors(&self) -> Option<&ValidationErrors> {
        match self {
            StateServiceError::Invalid(errors) => Some(errors),
            StateServiceError::Transition(_) | StateServiceError::Repository(_) => None,
        }
    }
}
