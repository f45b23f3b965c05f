//! Tax report submission and review workflow.
//!
//! Reports flow from collectivities to DDFIP offices through an explicit state machine
//! guarded by completeness rules that depend on the form type and the declared anomalies.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;
