use chrono::NaiveDate;
use serde::Serialize;

use super::domain::{
    Affectation, FormType, OfficeId, OrganizationType, PackageId, Report, ReportId, ReportState,
};

/// Visual scheme of a state badge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BadgeScheme {
    Neutral,
    Info,
    Primary,
    Warning,
    Success,
    Danger,
}

impl BadgeScheme {
    pub const fn for_state(state: ReportState) -> Self {
        match state {
            ReportState::Draft | ReportState::Canceled => Self::Neutral,
            ReportState::Ready => Self::Info,
            ReportState::Transmitted | ReportState::Acknowledged | ReportState::Accepted => {
                Self::Primary
            }
            ReportState::Assigned | ReportState::Processing => Self::Warning,
            ReportState::Applicable | ReportState::Approved => Self::Success,
            ReportState::Inapplicable | ReportState::Rejected | ReportState::Denied => {
                Self::Danger
            }
        }
    }

    pub const fn css_class(self) -> &'static str {
        match self {
            Self::Neutral => "badge badge--neutral",
            Self::Info => "badge badge--info",
            Self::Primary => "badge badge--primary",
            Self::Warning => "badge badge--warning",
            Self::Success => "badge badge--success",
            Self::Danger => "badge badge--danger",
        }
    }
}

/// Display helpers over a report, as seen by one organization type.
#[derive(Debug, Clone, Copy)]
pub struct ReportDecorator<'a> {
    report: &'a Report,
    organization_type: OrganizationType,
}

impl<'a> ReportDecorator<'a> {
    pub fn new(report: &'a Report, organization_type: OrganizationType) -> Self {
        Self {
            report,
            organization_type,
        }
    }

    pub fn report(&self) -> &'a Report {
        self.report
    }

    pub fn form_type_label(&self) -> &'static str {
        self.report.form_type.label()
    }

    pub fn anomaly_labels(&self) -> Vec<&'static str> {
        self.report
            .anomalies
            .iter()
            .map(|anomaly| anomaly.label())
            .collect()
    }

    /// State as the organization sees it: collectivities never see office-internal steps.
    pub fn state(&self) -> ReportState {
        self.organization_type.user_facing_state(self.report.state)
    }

    pub fn state_label(&self) -> &'static str {
        self.state().label()
    }

    pub fn state_badge(&self) -> BadgeScheme {
        BadgeScheme::for_state(self.state())
    }

    pub fn situation_adresse(&self) -> Option<String> {
        self.report.situation.adresse.line()
    }

    pub fn proposition_adresse(&self) -> Option<String> {
        self.report.proposition.adresse.line()
    }

    pub fn situation_affectation(&self) -> Option<&'static str> {
        self.report.situation.affectation.map(Affectation::label)
    }

    pub fn proposition_affectation(&self) -> Option<&'static str> {
        self.report.proposition.affectation.map(Affectation::label)
    }

    pub fn situation_surface(&self) -> Option<String> {
        self.report.situation.surface_reelle.map(format_surface)
    }

    pub fn proposition_surface(&self) -> Option<String> {
        self.report.proposition.surface_reelle.map(format_surface)
    }

    pub fn date_constat(&self) -> Option<String> {
        self.report.date_constat.map(format_date)
    }

    pub fn date_achevement(&self) -> Option<String> {
        self.report.proposition.date_achevement.map(format_date)
    }

    pub fn priority_label(&self) -> &'static str {
        self.report.priority.label()
    }

    pub fn view(&self) -> ReportView {
        let report = self.report;
        let state = self.state();
        ReportView {
            id: report.id.clone(),
            reference: report.reference.clone(),
            state,
            state_label: state.label(),
            badge: self.state_badge(),
            form_type: report.form_type,
            form_type_label: self.form_type_label(),
            anomalies: self.anomaly_labels(),
            priority: self.priority_label(),
            code_insee: report.code_insee.clone(),
            date_constat: self.date_constat(),
            invariant: report.situation.invariant.clone(),
            situation_adresse: self.situation_adresse(),
            situation_affectation: self.situation_affectation(),
            situation_surface: self.situation_surface(),
            proposition_adresse: self.proposition_adresse(),
            proposition_affectation: self.proposition_affectation(),
            proposition_surface: self.proposition_surface(),
            package_id: report.package_id.clone(),
            office_id: report.office_id.clone(),
            reponse: report.reponse.clone(),
        }
    }
}

/// Serializable, display-ready projection of a report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportView {
    pub id: ReportId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    pub state: ReportState,
    pub state_label: &'static str,
    pub badge: BadgeScheme,
    pub form_type: FormType,
    pub form_type_label: &'static str,
    pub anomalies: Vec<&'static str>,
    pub priority: &'static str,
    pub code_insee: Option<String>,
    pub date_constat: Option<String>,
    pub invariant: Option<String>,
    pub situation_adresse: Option<String>,
    pub situation_affectation: Option<&'static str>,
    pub situation_surface: Option<String>,
    pub proposition_adresse: Option<String>,
    pub proposition_affectation: Option<&'static str>,
    pub proposition_surface: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub package_id: Option<PackageId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub office_id: Option<OfficeId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reponse: Option<String>,
}

/// French notation with at most two decimals: `85,5 m²`.
pub fn format_surface(value: f64) -> String {
    let rounded = (value * 100.0).round() / 100.0;
    format!("{} m²", rounded.to_string().replace('.', ","))
}

pub fn format_date(date: NaiveDate) -> String {
    date.format("%d/%m/%Y").to_string()
}
