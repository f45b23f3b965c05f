use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::super::completeness::CompletenessCheck;
use super::super::domain::{Milestone, Report, ReportState};

/// Named workflow events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transition {
    Complete,
    Uncomplete,
    Transmit,
    Acknowledge,
    Accept,
    Assign,
    Unassign,
    Process,
    Deny,
    Undeny,
    Approve,
    Unapprove,
    Reject,
    Unreject,
    Confirm,
    Cancel,
}

impl Transition {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Complete => "complete",
            Self::Uncomplete => "uncomplete",
            Self::Transmit => "transmit",
            Self::Acknowledge => "acknowledge",
            Self::Accept => "accept",
            Self::Assign => "assign",
            Self::Unassign => "unassign",
            Self::Process => "process",
            Self::Deny => "deny",
            Self::Undeny => "undeny",
            Self::Approve => "approve",
            Self::Unapprove => "unapprove",
            Self::Reject => "reject",
            Self::Unreject => "unreject",
            Self::Confirm => "confirm",
            Self::Cancel => "cancel",
        }
    }
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Preconditions checked on the report before a transition fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Guard {
    Complete,
    OfficePresent,
    PackagePresent,
}

impl Guard {
    fn holds(self, report: &Report) -> bool {
        match self {
            Self::Complete => CompletenessCheck::new(report).valid(),
            Self::OfficePresent => report.office_id.is_some(),
            Self::PackagePresent => report.package_id.is_some(),
        }
    }
}

impl fmt::Display for Guard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let description = match self {
            Self::Complete => "report is incomplete",
            Self::OfficePresent => "no office assigned",
            Self::PackagePresent => "report is not packaged",
        };
        f.write_str(description)
    }
}

/// Mutations applied once a transition is accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SideEffect {
    Stamp(Milestone),
    Clear(Milestone),
    ClearOffice,
}

/// One row of the transition table.
#[derive(Debug, Clone, Copy)]
pub struct TransitionRule {
    pub from: ReportState,
    pub transition: Transition,
    pub to: ReportState,
    pub guard: Option<Guard>,
    pub effects: &'static [SideEffect],
}

const fn rule(
    from: ReportState,
    transition: Transition,
    to: ReportState,
    effects: &'static [SideEffect],
) -> TransitionRule {
    TransitionRule {
        from,
        transition,
        to,
        guard: None,
        effects,
    }
}

const fn guarded(
    from: ReportState,
    transition: Transition,
    to: ReportState,
    guard: Guard,
    effects: &'static [SideEffect],
) -> TransitionRule {
    TransitionRule {
        from,
        transition,
        to,
        guard: Some(guard),
        effects,
    }
}

const STAMP_COMPLETED: &[SideEffect] = &[SideEffect::Stamp(Milestone::CompletedAt)];
const CLEAR_COMPLETED: &[SideEffect] = &[SideEffect::Clear(Milestone::CompletedAt)];
const STAMP_TRANSMITTED: &[SideEffect] = &[SideEffect::Stamp(Milestone::TransmittedAt)];
const STAMP_ACKNOWLEDGED: &[SideEffect] = &[SideEffect::Stamp(Milestone::AcknowledgedAt)];
const STAMP_ACCEPTED: &[SideEffect] = &[SideEffect::Stamp(Milestone::AcceptedAt)];
const STAMP_ASSIGNED: &[SideEffect] = &[SideEffect::Stamp(Milestone::AssignedAt)];
const UNASSIGN: &[SideEffect] = &[
    SideEffect::ClearOffice,
    SideEffect::Clear(Milestone::AssignedAt),
];
const STAMP_DENIED: &[SideEffect] = &[SideEffect::Stamp(Milestone::DeniedAt)];
const CLEAR_DENIED: &[SideEffect] = &[SideEffect::Clear(Milestone::DeniedAt)];
const STAMP_APPROVED: &[SideEffect] = &[SideEffect::Stamp(Milestone::ApprovedAt)];
const CLEAR_APPROVED: &[SideEffect] = &[SideEffect::Clear(Milestone::ApprovedAt)];
const STAMP_REJECTED: &[SideEffect] = &[SideEffect::Stamp(Milestone::RejectedAt)];
const CLEAR_REJECTED: &[SideEffect] = &[SideEffect::Clear(Milestone::RejectedAt)];
const STAMP_CONFIRMED: &[SideEffect] = &[SideEffect::Stamp(Milestone::ConfirmedAt)];
const STAMP_CANCELED: &[SideEffect] = &[SideEffect::Stamp(Milestone::CanceledAt)];
const NO_EFFECT: &[SideEffect] = &[];

const RULES: [TransitionRule; 26] = {
    use ReportState::*;
    use Transition as T;

    [
        guarded(Draft, T::Complete, Ready, Guard::Complete, STAMP_COMPLETED),
        rule(Ready, T::Uncomplete, Draft, CLEAR_COMPLETED),
        guarded(Ready, T::Transmit, Transmitted, Guard::PackagePresent, STAMP_TRANSMITTED),
        rule(Transmitted, T::Acknowledge, Acknowledged, STAMP_ACKNOWLEDGED),
        rule(Transmitted, T::Accept, Accepted, STAMP_ACCEPTED),
        rule(Acknowledged, T::Accept, Accepted, STAMP_ACCEPTED),
        guarded(Accepted, T::Assign, Assigned, Guard::OfficePresent, STAMP_ASSIGNED),
        guarded(Assigned, T::Assign, Assigned, Guard::OfficePresent, STAMP_ASSIGNED),
        guarded(Processing, T::Assign, Assigned, Guard::OfficePresent, STAMP_ASSIGNED),
        rule(Assigned, T::Unassign, Accepted, UNASSIGN),
        rule(Processing, T::Unassign, Accepted, UNASSIGN),
        rule(Assigned, T::Process, Processing, NO_EFFECT),
        rule(Transmitted, T::Deny, Denied, STAMP_DENIED),
        rule(Acknowledged, T::Deny, Denied, STAMP_DENIED),
        rule(Accepted, T::Deny, Denied, STAMP_DENIED),
        rule(Denied, T::Undeny, Acknowledged, CLEAR_DENIED),
        rule(Assigned, T::Approve, Applicable, STAMP_APPROVED),
        rule(Processing, T::Approve, Applicable, STAMP_APPROVED),
        rule(Applicable, T::Unapprove, Processing, CLEAR_APPROVED),
        rule(Assigned, T::Reject, Inapplicable, STAMP_REJECTED),
        rule(Processing, T::Reject, Inapplicable, STAMP_REJECTED),
        rule(Inapplicable, T::Unreject, Processing, CLEAR_REJECTED),
        rule(Applicable, T::Confirm, Approved, STAMP_CONFIRMED),
        rule(Inapplicable, T::Confirm, Rejected, STAMP_CONFIRMED),
        rule(Draft, T::Cancel, Canceled, STAMP_CANCELED),
        rule(Ready, T::Cancel, Canceled, STAMP_CANCELED),
    ]
};

/// `(from, transition) -> (to, guard, side effects)`.
pub const TRANSITIONS: &[TransitionRule] = &RULES;

/// Typed failure of a transition attempt.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
    #[error("cannot {transition} a report in state {from}")]
    Illegal {
        from: ReportState,
        transition: Transition,
    },
    #[error("cannot {transition}: {guard}")]
    GuardFailed { transition: Transition, guard: Guard },
}

/// Applies [`TRANSITIONS`] to reports.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReportStateMachine;

impl ReportStateMachine {
    pub fn rule_for(from: ReportState, transition: Transition) -> Option<&'static TransitionRule> {
        TRANSITIONS
            .iter()
            .find(|rule| rule.from == from && rule.transition == transition)
    }

    pub fn can_fire(report: &Report, transition: Transition) -> bool {
        Self::check(report, transition).is_ok()
    }

    /// Transitions that may be attempted from a state, ignoring guards.
    pub fn permitted(from: ReportState) -> Vec<Transition> {
        TRANSITIONS
            .iter()
            .filter(|rule| rule.from == from)
            .map(|rule| rule.transition)
            .collect()
    }

    pub fn check(
        report: &Report,
        transition: Transition,
    ) -> Result<&'static TransitionRule, TransitionError> {
        let rule = Self::rule_for(report.state, transition).ok_or(TransitionError::Illegal {
            from: report.state,
            transition,
        })?;

        if let Some(guard) = rule.guard {
            if !guard.holds(report) {
                return Err(TransitionError::GuardFailed { transition, guard });
            }
        }

        Ok(rule)
    }

    /// Move the report to its next state. The report is untouched on error.
    pub fn fire(
        report: &mut Report,
        transition: Transition,
        at: DateTime<Utc>,
    ) -> Result<ReportState, TransitionError> {
        let rule = Self::check(report, transition)?;

        for effect in rule.effects {
            match *effect {
                SideEffect::Stamp(milestone) => {
                    report.milestones.insert(milestone, at);
                }
                SideEffect::Clear(milestone) => {
                    report.milestones.remove(&milestone);
                }
                SideEffect::ClearOffice => report.office_id = None,
            }
        }
        report.state = rule.to;

        Ok(rule.to)
    }
}
