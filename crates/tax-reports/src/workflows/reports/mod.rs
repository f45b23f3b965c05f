//! Report submission and review workflow.
//!
//! Collectivities draft reports on locals whose tax situation looks wrong, complete
//! them once every required field is filled, and transmit them in packages. DDFIP
//! offices then acknowledge, assign, process and decide on each report.

pub mod completeness;
pub mod decorator;
pub mod domain;
pub mod errors;
pub mod import;
pub mod package;
pub mod repository;
pub mod requirements;
pub mod router;
pub mod search;
pub mod state;
pub mod transmissibility;
pub mod transmission;

#[cfg(test)]
mod tests;

pub use completeness::CompletenessCheck;
pub use decorator::{BadgeScheme, ReportDecorator, ReportView};
pub use domain::{
    Adresse, Affectation, Anomaly, CollectivityId, Coefficients, FormType, Milestone, OfficeId,
    OrganizationType, PackageId, Porte, Priority, Proposition, Report, ReportAction, ReportId,
    ReportState, Situation, UnknownValue,
};
pub use errors::{ErrorKind, Field, ValidationErrors};
pub use import::{ReportCsvImporter, ReportImportError};
pub use package::Package;
pub use repository::{PackageRepository, RepositoryError, ReportRepository};
pub use requirements::Requirements;
pub use router::{report_router, ReportRouterState};
pub use search::{SearchColumn, SearchCriterion, SearchService};
pub use state::{
    AssignParams, ReportStateMachine, ReportStateService, ReviewParams, StateServiceError,
    Transition, TransitionError,
};
pub use transmissibility::{IntransmissibleReason, TransmissibilityCheck, TransmissibilitySummary};
pub use transmission::{Transmission, TransmissionAddition, TransmissionError, TransmissionService};
