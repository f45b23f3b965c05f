use super::domain::{PackageId, Report, ReportId, ReportState};
use super::package::Package;

/// Storage abstraction so the workflow services can be exercised in isolation.
pub trait ReportRepository: Send + Sync {
    fn insert(&self, report: Report) -> Result<Report, RepositoryError>;
    fn update(&self, report: Report) -> Result<(), RepositoryError>;
    /// Save `report` only while the stored copy is still in state `expected`.
    fn update_if_state(&self, expected: ReportState, report: Report) -> Result<(), RepositoryError>;
    fn fetch(&self, id: &ReportId) -> Result<Option<Report>, RepositoryError>;
    fn all(&self) -> Result<Vec<Report>, RepositoryError>;
}

/// Storage for transmitted packages.
pub trait PackageRepository: Send + Sync {
    fn insert(&self, package: Package) -> Result<Package, RepositoryError>;
    fn fetch(&self, id: &PackageId) -> Result<Option<Package>, RepositoryError>;
    /// Greatest reference starting with `prefix`, used to continue the monthly sequence.
    fn last_reference_with_prefix(&self, prefix: &str) -> Result<Option<String>, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("report changed concurrently: expected state {expected}, found {actual}")]
    Stale {
        expected: ReportState,
        actual: ReportState,
    },
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}
