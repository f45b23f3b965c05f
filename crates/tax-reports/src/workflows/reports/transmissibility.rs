use std::collections::{BTreeMap, HashSet};

use serde::Serialize;

use super::domain::{Report, ReportId};

/// Why a report cannot join a transmission. Variants are listed in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IntransmissibleReason {
    Incomplete,
    Transmitted,
    InTransmission,
}

impl IntransmissibleReason {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Incomplete => "incomplet",
            Self::Transmitted => "déjà transmis",
            Self::InTransmission => "déjà en cours de transmission",
        }
    }
}

/// Partitions a batch of reports into transmissible and blocked-with-reason.
#[derive(Debug, Clone)]
pub struct TransmissibilityCheck<'a> {
    reports: &'a [Report],
    transmitting: HashSet<&'a ReportId>,
}

impl<'a> TransmissibilityCheck<'a> {
    pub fn new<I>(reports: &'a [Report], transmitting: I) -> Self
    where
        I: IntoIterator<Item = &'a ReportId>,
    {
        Self {
            reports,
            transmitting: transmitting.into_iter().collect(),
        }
    }

    /// First matching reason wins: incomplete, then transmitted, then in transmission.
    pub fn reason_for(&self, report: &Report) -> Option<IntransmissibleReason> {
        if !report.is_completed() {
            Some(IntransmissibleReason::Incomplete)
        } else if report.has_package() {
            Some(IntransmissibleReason::Transmitted)
        } else if self.transmitting.contains(&report.id) {
            Some(IntransmissibleReason::InTransmission)
        } else {
            None
        }
    }

    pub fn is_transmissible(&self, report: &Report) -> bool {
        self.reason_for(report).is_none()
    }

    pub fn transmissible_reports(&self) -> Vec<&'a Report> {
        self.reports
            .iter()
            .filter(|report| self.is_transmissible(report))
            .collect()
    }

    pub fn intransmissible_reports(&self) -> Vec<&'a Report> {
        self.reports
            .iter()
            .filter(|report| !self.is_transmissible(report))
            .collect()
    }

    pub fn intransmissible_reports_by_reason(
        &self,
    ) -> BTreeMap<IntransmissibleReason, Vec<&'a Report>> {
        let mut grouped: BTreeMap<IntransmissibleReason, Vec<&'a Report>> = BTreeMap::new();
        for report in self.reports {
            if let Some(reason) = self.reason_for(report) {
                grouped.entry(reason).or_default().push(report);
            }
        }
        grouped
    }

    pub fn summary(&self) -> TransmissibilitySummary {
        let mut summary = TransmissibilitySummary::default();
        for report in self.reports {
            match self.reason_for(report) {
                None => summary.transmissible.push(report.id.clone()),
                Some(reason) => summary
                    .intransmissible
                    .entry(reason)
                    .or_default()
                    .push(report.id.clone()),
            }
        }
        summary
    }
}

/// Identifier-only view of a transmissibility check, for responses and CLI output.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TransmissibilitySummary {
    pub transmissible: Vec<ReportId>,
    pub intransmissible: BTreeMap<IntransmissibleReason, Vec<ReportId>>,
}
