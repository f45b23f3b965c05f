use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex};

use axum::response::Response;
use chrono::{NaiveDate, Utc};
use serde_json::Value;

use crate::workflows::reports::domain::{
    Adresse, Affectation, Anomaly, CollectivityId, Coefficients, FormType, Milestone, PackageId,
    Porte, Proposition, Report, ReportId, ReportState, Situation,
};
use crate::workflows::reports::package::Package;
use crate::workflows::reports::repository::{PackageRepository, RepositoryError, ReportRepository};
use crate::workflows::reports::router::{report_router, ReportRouterState};
use crate::workflows::reports::state::ReportStateService;

pub(super) fn day(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
}

pub(super) fn complete_adresse() -> Adresse {
    Adresse {
        numero_voie: Some("12".to_string()),
        indice_repetition: None,
        libelle_voie: Some("rue des Lilas".to_string()),
        code_rivoli: Some("0120".to_string()),
    }
}

/// Habitation evaluation reporting a consistance anomaly, ready to be completed.
pub(super) fn complete_report(id: &str) -> Report {
    let mut report = Report::new(
        ReportId(id.to_string()),
        CollectivityId("64102".to_string()),
        FormType::EvaluationLocalHabitation,
    );
    report.anomalies = BTreeSet::from([Anomaly::Consistance]);
    report.code_insee = Some("64102".to_string());
    report.date_constat = Some(day(2024, 3, 12));
    report.observations = Some("Véranda non déclarée".to_string());
    report.situation = Situation {
        annee_majic: Some(2023),
        invariant: Some("0123456789".to_string()),
        parcelle: Some("AB 0123".to_string()),
        proprietaire: Some("Dupont Marie".to_string()),
        numero_ordre_proprietaire: Some("+01234".to_string()),
        adresse: complete_adresse(),
        porte: Porte {
            numero_batiment: Some("A".to_string()),
            numero_escalier: Some("01".to_string()),
            numero_niveau: Some("02".to_string()),
            numero_porte: Some("01005".to_string()),
        },
        affectation: Some(Affectation::Habitation),
        nature: Some("AP".to_string()),
        categorie: Some("5".to_string()),
        surface_reelle: Some(85.5),
        coefficients: Coefficients {
            entretien: Some(1.0),
            situation_generale: Some(0.0),
            situation_particuliere: Some(0.05),
        },
    };
    report.proposition = Proposition {
        nature: Some("AP".to_string()),
        categorie: Some("4".to_string()),
        surface_reelle: Some(104.0),
        ..Proposition::default()
    };
    report
}

/// Completed report that passed the completeness check.
pub(super) fn ready_report(id: &str) -> Report {
    report_in(id, ReportState::Ready)
}

pub(super) fn report_in(id: &str, state: ReportState) -> Report {
    let mut report = complete_report(id);
    report.state = state;
    if state.is_completed() {
        report
            .milestones
            .insert(Milestone::CompletedAt, Utc::now());
    }
    report
}

pub(super) fn transmitted_report(id: &str, state: ReportState) -> Report {
    let mut report = report_in(id, state);
    report.package_id = Some(PackageId("2024-03-0001".to_string()));
    report.reference = Some("2024-03-0001-00001".to_string());
    report
}

pub(super) fn ids(reports: &[&Report]) -> Vec<String> {
    reports.iter().map(|report| report.id.0.clone()).collect()
}

#[derive(Default, Clone)]
pub(super) struct MemoryRepository {
    pub(super) reports: Arc<Mutex<HashMap<ReportId, Report>>>,
}

impl MemoryRepository {
    pub(super) fn with_reports(reports: Vec<Report>) -> Self {
        let repository = Self::default();
        {
            let mut guard = repository.reports.lock().expect("repository mutex poisoned");
            for report in reports {
                guard.insert(report.id.clone(), report);
            }
        }
        repository
    }

    pub(super) fn get(&self, id: &str) -> Report {
        self.reports
            .lock()
            .expect("repository mutex poisoned")
            .get(&ReportId(id.to_string()))
            .cloned()
            .expect("report stored")
    }
}

impl ReportRepository for MemoryRepository {
    fn insert(&self, report: Report) -> Result<Report, RepositoryError> {
        let mut guard = self.reports.lock().expect("repository mutex poisoned");
        if guard.contains_key(&report.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(report.id.clone(), report.clone());
        Ok(report)
    }

    fn update(&self, report: Report) -> Result<(), RepositoryError> {
        let mut guard = self.reports.lock().expect("repository mutex poisoned");
        guard.insert(report.id.clone(), report);
        Ok(())
    }

    fn update_if_state(&self, expected: ReportState, report: Report) -> Result<(), RepositoryError> {
        let mut guard = self.reports.lock().expect("repository mutex poisoned");
        if let Some(stored) = guard.get(&report.id) {
            if stored.state != expected {
                return Err(RepositoryError::Stale {
                    expected,
                    actual: stored.state,
                });
            }
        }
        guard.insert(report.id.clone(), report);
        Ok(())
    }

    fn fetch(&self, id: &ReportId) -> Result<Option<Report>, RepositoryError> {
        let guard = self.reports.lock().expect("repository mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn all(&self) -> Result<Vec<Report>, RepositoryError> {
        let guard = self.reports.lock().expect("repository mutex poisoned");
        let mut reports: Vec<Report> = guard.values().cloned().collect();
        reports.sort_by(|left, right| left.id.cmp(&right.id));
        Ok(reports)
    }
}

/// Serves reads but refuses every write.
pub(super) struct ReadOnlyRepository {
    pub(super) inner: MemoryRepository,
}

impl ReportRepository for ReadOnlyRepository {
    fn insert(&self, _report: Report) -> Result<Report, RepositoryError> {
        Err(RepositoryError::Unavailable("read only".to_string()))
    }

    fn update(&self, _report: Report) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("read only".to_string()))
    }

    fn update_if_state(&self, _expected: ReportState, _report: Report) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("read only".to_string()))
    }

    fn fetch(&self, id: &ReportId) -> Result<Option<Report>, RepositoryError> {
        self.inner.fetch(id)
    }

    fn all(&self) -> Result<Vec<Report>, RepositoryError> {
        self.inner.all()
    }
}

pub(super) struct UnavailableRepository;

impl ReportRepository for UnavailableRepository {
    fn insert(&self, _report: Report) -> Result<Report, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn update(&self, _report: Report) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn update_if_state(&self, _expected: ReportState, _report: Report) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn fetch(&self, _id: &ReportId) -> Result<Option<Report>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn all(&self) -> Result<Vec<Report>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

/// Refuses every write to one report and serves the rest from `inner`.
pub(super) struct FailingRepository {
    pub(super) inner: MemoryRepository,
    pub(super) failing: ReportId,
}

impl FailingRepository {
    fn refuse(&self, report: &Report) -> Result<(), RepositoryError> {
        if report.id == self.failing {
            Err(RepositoryError::Unavailable("disk full".to_string()))
        } else {
            Ok(())
        }
    }
}

impl ReportRepository for FailingRepository {
    fn insert(&self, report: Report) -> Result<Report, RepositoryError> {
        self.refuse(&report)?;
        self.inner.insert(report)
    }

    fn update(&self, report: Report) -> Result<(), RepositoryError> {
        self.refuse(&report)?;
        self.inner.update(report)
    }

    fn update_if_state(&self, expected: ReportState, report: Report) -> Result<(), RepositoryError> {
        self.refuse(&report)?;
        self.inner.update_if_state(expected, report)
    }

    fn fetch(&self, id: &ReportId) -> Result<Option<Report>, RepositoryError> {
        self.inner.fetch(id)
    }

    fn all(&self) -> Result<Vec<Report>, RepositoryError> {
        self.inner.all()
    }
}

#[derive(Default, Clone)]
pub(super) struct MemoryPackages {
    pub(super) packages: Arc<Mutex<Vec<Package>>>,
}

impl MemoryPackages {
    pub(super) fn all(&self) -> Vec<Package> {
        self.packages.lock().expect("package mutex poisoned").clone()
    }
}

impl PackageRepository for MemoryPackages {
    fn insert(&self, package: Package) -> Result<Package, RepositoryError> {
        let mut guard = self.packages.lock().expect("package mutex poisoned");
        if guard.iter().any(|existing| existing.id == package.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.push(package.clone());
        Ok(package)
    }

    fn fetch(&self, id: &PackageId) -> Result<Option<Package>, RepositoryError> {
        let guard = self.packages.lock().expect("package mutex poisoned");
        Ok(guard.iter().find(|package| &package.id == id).cloned())
    }

    fn last_reference_with_prefix(&self, prefix: &str) -> Result<Option<String>, RepositoryError> {
        let guard = self.packages.lock().expect("package mutex poisoned");
        Ok(guard
            .iter()
            .map(|package| package.reference.clone())
            .filter(|reference| reference.starts_with(prefix))
            .max())
    }
}

pub(super) fn state_service(repository: MemoryRepository) -> ReportStateService<MemoryRepository> {
    ReportStateService::new(Arc::new(repository))
}

pub(super) fn router_with<R>(repository: R) -> axum::Router
where
    R: ReportRepository + 'static,
{
    report_router(Arc::new(ReportRouterState {
        service: ReportStateService::new(Arc::new(repository)),
        search_limit: 50,
    }))
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
