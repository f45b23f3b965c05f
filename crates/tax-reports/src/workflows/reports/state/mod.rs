//! Report lifecycle: an explicit transition table and the service that drives it.

pub mod machine;
pub mod service;

pub use machine::{
    Guard, ReportStateMachine, SideEffect, Transition, TransitionError, TransitionRule,
    TRANSITIONS,
};
pub use service::{AssignParams, ReportStateService, ReviewParams, StateResult, StateServiceError};
