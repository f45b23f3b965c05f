use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info, warn};

use super::domain::{CollectivityId, FormType, PackageId, Report, ReportId, ReportState};
use super::package::{next_package_reference, reference_prefix, report_reference, Package};
use super::repository::{PackageRepository, RepositoryError, ReportRepository};
use super::state::{ReportStateMachine, Transition, TransitionError};
use super::transmissibility::{IntransmissibleReason, TransmissibilityCheck};

/// A collectivity's cart of reports waiting to be transmitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Transmission {
    pub collectivity_id: CollectivityId,
    pub report_ids: BTreeSet<ReportId>,
    pub sandbox: bool,
}

impl Transmission {
    pub fn is_empty(&self) -> bool {
        self.report_ids.is_empty()
    }

    pub fn len(&self) -> usize {
        self.report_ids.len()
    }

    pub fn contains(&self, id: &ReportId) -> bool {
        self.report_ids.contains(id)
    }
}

/// Result of adding reports to a transmission.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TransmissionAddition {
    pub added: Vec<ReportId>,
    pub intransmissible: BTreeMap<IntransmissibleReason, Vec<ReportId>>,
    /// Reports belonging to another collectivity.
    pub ignored: Vec<ReportId>,
}

/// Builds transmissions and turns them into packages.
pub struct TransmissionService<R, P> {
    reports: Arc<R>,
    packages: Arc<P>,
    sandbox: bool,
}

impl<R, P> TransmissionService<R, P>
where
    R: ReportRepository + 'static,
    P: PackageRepository + 'static,
{
    pub fn new(reports: Arc<R>, packages: Arc<P>, sandbox: bool) -> Self {
        Self {
            reports,
            packages,
            sandbox,
        }
    }

    pub fn start(&self, collectivity_id: CollectivityId) -> Transmission {
        Transmission {
            collectivity_id,
            report_ids: BTreeSet::new(),
            sandbox: self.sandbox,
        }
    }

    /// Add the transmissible reports and classify the others.
    ///
    /// Reports already in the cart are classified as `in_transmission`. A report
    /// listed several times is considered once.
    pub fn add(&self, transmission: &mut Transmission, reports: &[Report]) -> TransmissionAddition {
        let mut seen = HashSet::new();
        let (own, foreign): (Vec<Report>, Vec<Report>) = reports
            .iter()
            .filter(|report| seen.insert(&report.id))
            .cloned()
            .partition(|report| report.collectivity_id == transmission.collectivity_id);

        let summary = TransmissibilityCheck::new(&own, transmission.report_ids.iter()).summary();
        transmission
            .report_ids
            .extend(summary.transmissible.iter().cloned());

        let addition = TransmissionAddition {
            added: summary.transmissible,
            intransmissible: summary.intransmissible,
            ignored: foreign.into_iter().map(|report| report.id).collect(),
        };
        debug!(
            added = addition.added.len(),
            ignored = addition.ignored.len(),
            cart = transmission.len(),
            "reports added to transmission"
        );
        addition
    }

    /// Remove reports from the cart, returning how many were present.
    pub fn remove<'i, I>(&self, transmission: &mut Transmission, ids: I) -> usize
    where
        I: IntoIterator<Item = &'i ReportId>,
    {
        ids.into_iter()
            .filter(|id| transmission.report_ids.remove(*id))
            .count()
    }

    /// Package the cart, one package per form type, and transmit every report.
    ///
    /// Groups are committed one at a time and leave the cart once saved. When a
    /// group fails its reports are restored and stay in the cart, so completing
    /// the same transmission again only sends what is left.
    pub fn complete(
        &self,
        transmission: &mut Transmission,
    ) -> Result<Vec<Package>, TransmissionError> {
        if transmission.is_empty() {
            return Err(TransmissionError::Empty);
        }

        let mut reports = Vec::with_capacity(transmission.len());
        for id in &transmission.report_ids {
            let report = self.reports.fetch(id)?.ok_or(RepositoryError::NotFound)?;
            reports.push(report);
        }

        let check = TransmissibilityCheck::new(&reports, std::iter::empty());
        let blocked = check.summary().intransmissible;
        if !blocked.is_empty() {
            debug!(?blocked, "transmission holds reports that are no longer transmissible");
            return Err(TransmissionError::Intransmissible { reports: blocked });
        }

        let mut groups: BTreeMap<FormType, Vec<Report>> = BTreeMap::new();
        for report in reports {
            groups.entry(report.form_type).or_default().push(report);
        }

        let now = Utc::now();
        let today = now.date_naive();
        let mut packages = Vec::with_capacity(groups.len());

        for (form_type, originals) in groups {
            let last = self
                .packages
                .last_reference_with_prefix(&reference_prefix(today))?;
            let reference = next_package_reference(last.as_deref(), today);
            let package_id = PackageId(reference.clone());

            let mut transmitted = originals.clone();
            for (index, report) in transmitted.iter_mut().enumerate() {
                report.package_id = Some(package_id.clone());
                report.reference = Some(report_reference(&reference, index + 1));
                ReportStateMachine::fire(report, Transition::Transmit, now)?;
            }

            self.save_group(&originals, &transmitted, &package_id)?;

            let package = Package {
                id: package_id,
                reference,
                form_type,
                collectivity_id: transmission.collectivity_id.clone(),
                sandbox: transmission.sandbox,
                transmitted_at: now,
                report_ids: transmitted.iter().map(|report| report.id.clone()).collect(),
            };
            let package = match self.packages.insert(package) {
                Ok(package) => package,
                Err(error) => {
                    warn!(%error, form_type = %form_type, "failed to persist package");
                    self.restore(&originals);
                    return Err(error.into());
                }
            };

            for id in &package.report_ids {
                transmission.report_ids.remove(id);
            }

            info!(
                package = %package.id,
                form_type = %form_type,
                reports = package.report_ids.len(),
                sandbox = package.sandbox,
                "package transmitted"
            );
            packages.push(package);
        }

        Ok(packages)
    }

    /// Save a group of transmitted reports, restoring the saved ones if any write fails.
    fn save_group(
        &self,
        originals: &[Report],
        transmitted: &[Report],
        package_id: &PackageId,
    ) -> Result<(), RepositoryError> {
        for (saved, report) in transmitted.iter().enumerate() {
            if let Err(error) = self
                .reports
                .update_if_state(ReportState::Ready, report.clone())
            {
                warn!(report_id = %report.id, package = %package_id, %error, "failed to persist transmitted report");
                self.restore(&originals[..saved]);
                return Err(error);
            }
        }
        Ok(())
    }

    fn restore(&self, originals: &[Report]) {
        for original in originals {
            if let Err(error) = self
                .reports
                .update_if_state(ReportState::Transmitted, original.clone())
            {
                warn!(report_id = %original.id, %error, "failed to restore report after aborted transmission");
            }
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TransmissionError {
    #[error("transmission is empty")]
    Empty,
    #[error("transmission contains reports that cannot be transmitted")]
    Intransmissible {
        reports: BTreeMap<IntransmissibleReason, Vec<ReportId>>,
    },
    #[error(transparent)]
    Transition(#[from] TransitionError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
