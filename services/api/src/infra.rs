use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use tax_reports::workflows::reports::{
    OrganizationType, Package, PackageId, PackageRepository, Report, ReportId, ReportRepository,
    ReportState, RepositoryError,
};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryReportRepository {
    reports: Arc<Mutex<HashMap<ReportId, Report>>>,
}

impl ReportRepository for InMemoryReportRepository {
    fn insert(&self, report: Report) -> Result<Report, RepositoryError> {
        let mut guard = self.reports.lock().map_err(poisoned)?;
        if guard.contains_key(&report.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(report.id.clone(), report.clone());
        Ok(report)
    }

    fn update(&self, report: Report) -> Result<(), RepositoryError> {
        let mut guard = self.reports.lock().map_err(poisoned)?;
        if guard.contains_key(&report.id) {
            guard.insert(report.id.clone(), report);
            Ok(())
        } else {
            Err(RepositoryError::NotFound)
        }
    }

    fn update_if_state(&self, expected: ReportState, report: Report) -> Result<(), RepositoryError> {
        let mut guard = self.reports.lock().map_err(poisoned)?;
        let actual = guard
            .get(&report.id)
            .map(|stored| stored.state)
            .ok_or(RepositoryError::NotFound)?;
        if actual != expected {
            return Err(RepositoryError::Stale { expected, actual });
        }
        guard.insert(report.id.clone(), report);
        Ok(())
    }

    fn fetch(&self, id: &ReportId) -> Result<Option<Report>, RepositoryError> {
        let guard = self.reports.lock().map_err(poisoned)?;
        Ok(guard.get(id).cloned())
    }

    fn all(&self) -> Result<Vec<Report>, RepositoryError> {
        let guard = self.reports.lock().map_err(poisoned)?;
        let mut reports: Vec<Report> = guard.values().cloned().collect();
        reports.sort_by(|left, right| left.id.cmp(&right.id));
        Ok(reports)
    }
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryPackageRepository {
    packages: Arc<Mutex<Vec<Package>>>,
}

impl PackageRepository for InMemoryPackageRepository {
    fn insert(&self, package: Package) -> Result<Package, RepositoryError> {
        let mut guard = self.packages.lock().map_err(poisoned)?;
        if guard.iter().any(|existing| existing.id == package.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.push(package.clone());
        Ok(package)
    }

    fn fetch(&self, id: &PackageId) -> Result<Option<Package>, RepositoryError> {
        let guard = self.packages.lock().map_err(poisoned)?;
        Ok(guard.iter().find(|package| &package.id == id).cloned())
    }

    fn last_reference_with_prefix(&self, prefix: &str) -> Result<Option<String>, RepositoryError> {
        let guard = self.packages.lock().map_err(poisoned)?;
        Ok(guard
            .iter()
            .filter(|package| package.reference.starts_with(prefix))
            .map(|package| package.reference.clone())
            .max())
    }
}

fn poisoned<T>(_: std::sync::PoisonError<T>) -> RepositoryError {
    RepositoryError::Unavailable("repository mutex poisoned".to_string())
}

pub(crate) fn parse_organization(raw: &str) -> Result<OrganizationType, String> {
    raw.parse::<OrganizationType>()
        .map_err(|err| format!("{err} (expected collectivity, publisher, ddfip or dgfip)"))
}
