use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Identifier wrapper for reports.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ReportId(pub String);

/// Identifier of a DDFIP office able to process reports.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OfficeId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PackageId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CollectivityId(pub String);

impl fmt::Display for ReportId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for OfficeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for PackageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Raised when a coded value does not belong to its vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} '{value}'")]
pub struct UnknownValue {
    pub kind: &'static str,
    pub value: String,
}

impl UnknownValue {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

/// Workflow position of a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportState {
    Draft,
    Ready,
    Transmitted,
    Acknowledged,
    Accepted,
    Assigned,
    Processing,
    Applicable,
    Inapplicable,
    Approved,
    Rejected,
    Canceled,
    Denied,
}

impl ReportState {
    pub const ALL: [Self; 13] = [
        Self::Draft,
        Self::Ready,
        Self::Transmitted,
        Self::Acknowledged,
        Self::Accepted,
        Self::Assigned,
        Self::Processing,
        Self::Applicable,
        Self::Inapplicable,
        Self::Approved,
        Self::Rejected,
        Self::Canceled,
        Self::Denied,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Ready => "ready",
            Self::Transmitted => "transmitted",
            Self::Acknowledged => "acknowledged",
            Self::Accepted => "accepted",
            Self::Assigned => "assigned",
            Self::Processing => "processing",
            Self::Applicable => "applicable",
            Self::Inapplicable => "inapplicable",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Canceled => "canceled",
            Self::Denied => "denied",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Draft => "Brouillon",
            Self::Ready => "Prêt à être transmis",
            Self::Transmitted => "Transmis",
            Self::Acknowledged => "Accusé de réception",
            Self::Accepted => "Accepté",
            Self::Assigned => "Assigné",
            Self::Processing => "En cours de traitement",
            Self::Applicable => "Applicable",
            Self::Inapplicable => "Inapplicable",
            Self::Approved => "Approuvé",
            Self::Rejected => "Rejeté",
            Self::Canceled => "Annulé",
            Self::Denied => "Retourné",
        }
    }

    /// Completed reports passed the completeness check and were not withdrawn since.
    pub const fn is_completed(self) -> bool {
        !matches!(self, Self::Draft | Self::Canceled)
    }
}

impl fmt::Display for ReportState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportState {
    type Err = UnknownValue;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|state| state.as_str() == normalized)
            .ok_or_else(|| UnknownValue::new("state", value))
    }
}

/// Form filled by the collectivity. Each form maps to a single review action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormType {
    EvaluationLocalHabitation,
    EvaluationLocalProfessionnel,
    CreationLocalHabitation,
    CreationLocalProfessionnel,
}

impl FormType {
    pub const ALL: [Self; 4] = [
        Self::EvaluationLocalHabitation,
        Self::EvaluationLocalProfessionnel,
        Self::CreationLocalHabitation,
        Self::CreationLocalProfessionnel,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::EvaluationLocalHabitation => "evaluation_local_habitation",
            Self::EvaluationLocalProfessionnel => "evaluation_local_professionnel",
            Self::CreationLocalHabitation => "creation_local_habitation",
            Self::CreationLocalProfessionnel => "creation_local_professionnel",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::EvaluationLocalHabitation => "Évaluation d'un local d'habitation",
            Self::EvaluationLocalProfessionnel => "Évaluation d'un local professionnel",
            Self::CreationLocalHabitation => "Création d'un local d'habitation",
            Self::CreationLocalProfessionnel => "Création d'un local professionnel",
        }
    }

    pub const fn action(self) -> ReportAction {
        match self {
            Self::EvaluationLocalHabitation => ReportAction::EvaluationHab,
            Self::EvaluationLocalProfessionnel => ReportAction::EvaluationEco,
            Self::CreationLocalHabitation => ReportAction::CreationHab,
            Self::CreationLocalProfessionnel => ReportAction::CreationEco,
        }
    }

    pub const fn is_evaluation(self) -> bool {
        matches!(
            self,
            Self::EvaluationLocalHabitation | Self::EvaluationLocalProfessionnel
        )
    }

    pub const fn is_creation(self) -> bool {
        matches!(
            self,
            Self::CreationLocalHabitation | Self::CreationLocalProfessionnel
        )
    }
}

impl fmt::Display for FormType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FormType {
    type Err = UnknownValue;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|form_type| form_type.as_str() == normalized)
            .ok_or_else(|| UnknownValue::new("form type", value))
    }
}

/// Review action performed by the tax office, derived from the form type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportAction {
    EvaluationHab,
    EvaluationEco,
    CreationHab,
    CreationEco,
}

impl ReportAction {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::EvaluationHab => "evaluation_hab",
            Self::EvaluationEco => "evaluation_eco",
            Self::CreationHab => "creation_hab",
            Self::CreationEco => "creation_eco",
        }
    }

    /// Evaluations target a local already known in MAJIC.
    pub const fn requires_majic(self) -> bool {
        matches!(self, Self::EvaluationHab | Self::EvaluationEco)
    }
}

/// Category of discrepancy declared on a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Anomaly {
    Affectation,
    Consistance,
    Correctif,
    Exoneration,
    Adresse,
    Categorie,
    OmissionBatie,
    ConstructionNeuve,
}

impl Anomaly {
    pub const ALL: [Self; 8] = [
        Self::Affectation,
        Self::Consistance,
        Self::Correctif,
        Self::Exoneration,
        Self::Adresse,
        Self::Categorie,
        Self::OmissionBatie,
        Self::ConstructionNeuve,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Affectation => "affectation",
            Self::Consistance => "consistance",
            Self::Correctif => "correctif",
            Self::Exoneration => "exoneration",
            Self::Adresse => "adresse",
            Self::Categorie => "categorie",
            Self::OmissionBatie => "omission_batie",
            Self::ConstructionNeuve => "construction_neuve",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Affectation => "Affectation",
            Self::Consistance => "Consistance",
            Self::Correctif => "Correctif d'ensemble",
            Self::Exoneration => "Exonération",
            Self::Adresse => "Adresse",
            Self::Categorie => "Catégorie",
            Self::OmissionBatie => "Omission bâtie",
            Self::ConstructionNeuve => "Construction neuve",
        }
    }
}

impl fmt::Display for Anomaly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Anomaly {
    type Err = UnknownValue;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|anomaly| anomaly.as_str() == normalized)
            .ok_or_else(|| UnknownValue::new("anomaly", value))
    }
}

/// MAJIC affectation codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Affectation {
    #[serde(rename = "H")]
    Habitation,
    #[serde(rename = "D")]
    Dependance,
    #[serde(rename = "C")]
    Commerce,
    #[serde(rename = "B")]
    Bureau,
    #[serde(rename = "K")]
    EtablissementIndustriel,
    #[serde(rename = "S")]
    EtablissementService,
}

impl Affectation {
    pub const ALL: [Self; 6] = [
        Self::Habitation,
        Self::Dependance,
        Self::Commerce,
        Self::Bureau,
        Self::EtablissementIndustriel,
        Self::EtablissementService,
    ];

    pub const fn code(self) -> &'static str {
        match self {
            Self::Habitation => "H",
            Self::Dependance => "D",
            Self::Commerce => "C",
            Self::Bureau => "B",
            Self::EtablissementIndustriel => "K",
            Self::EtablissementService => "S",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Habitation => "Habitation",
            Self::Dependance => "Dépendance",
            Self::Commerce => "Commerce",
            Self::Bureau => "Bureau",
            Self::EtablissementIndustriel => "Établissement industriel",
            Self::EtablissementService => "Établissement de service",
        }
    }

    pub const fn is_habitation(self) -> bool {
        match self {
            Self::Habitation | Self::Dependance => true,
            Self::Commerce | Self::Bureau | Self::EtablissementIndustriel | Self::EtablissementService => {
                false
            }
        }
    }

    pub const fn is_professionnel(self) -> bool {
        !self.is_habitation()
    }
}

impl FromStr for Affectation {
    type Err = UnknownValue;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_uppercase();
        Self::ALL
            .into_iter()
            .find(|affectation| affectation.code() == normalized)
            .ok_or_else(|| UnknownValue::new("affectation", value))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    #[default]
    Low,
    Medium,
    High,
}

impl Priority {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Low => "Basse",
            Self::Medium => "Moyenne",
            Self::High => "Haute",
        }
    }
}

impl FromStr for Priority {
    type Err = UnknownValue;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            _ => Err(UnknownValue::new("priority", value)),
        }
    }
}

/// Organization types seeing reports through their own state vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrganizationType {
    Collectivity,
    Publisher,
    Ddfip,
    Dgfip,
}

const SENDER_IN_REVIEW: &[ReportState] = &[
    ReportState::Transmitted,
    ReportState::Acknowledged,
    ReportState::Accepted,
    ReportState::Assigned,
    ReportState::Processing,
    ReportState::Applicable,
    ReportState::Inapplicable,
];
const OFFICE_TRANSMITTED: &[ReportState] = &[ReportState::Transmitted, ReportState::Acknowledged];
const OFFICE_ASSIGNED: &[ReportState] = &[ReportState::Assigned, ReportState::Processing];

impl OrganizationType {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Collectivity => "collectivity",
            Self::Publisher => "publisher",
            Self::Ddfip => "ddfip",
            Self::Dgfip => "dgfip",
        }
    }

    const fn is_sender(self) -> bool {
        matches!(self, Self::Collectivity | Self::Publisher)
    }

    /// Underlying states matched by a user-facing state.
    ///
    /// Returns an empty slice when the organization never sees that state.
    pub fn states_for(self, user_facing: ReportState) -> &'static [ReportState] {
        use ReportState::*;

        if self.is_sender() {
            match user_facing {
                Draft => &[Draft],
                Ready => &[Ready],
                Transmitted => SENDER_IN_REVIEW,
                Approved => &[Approved],
                Rejected => &[Rejected],
                Denied => &[Denied],
                Canceled => &[Canceled],
                Acknowledged | Accepted | Assigned | Processing | Applicable | Inapplicable => &[],
            }
        } else {
            match user_facing {
                Transmitted => OFFICE_TRANSMITTED,
                Accepted => &[Accepted],
                Assigned => OFFICE_ASSIGNED,
                Applicable => &[Applicable],
                Inapplicable => &[Inapplicable],
                Approved => &[Approved],
                Rejected => &[Rejected],
                Denied => &[Denied],
                Draft | Ready | Acknowledged | Processing | Canceled => &[],
            }
        }
    }

    /// Inverse of [`OrganizationType::states_for`].
    pub fn user_facing_state(self, state: ReportState) -> ReportState {
        ReportState::ALL
            .into_iter()
            .find(|candidate| self.states_for(*candidate).contains(&state))
            .unwrap_or(state)
    }
}

impl FromStr for OrganizationType {
    type Err = UnknownValue;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "collectivity" | "collectivite" => Ok(Self::Collectivity),
            "publisher" | "editeur" => Ok(Self::Publisher),
            "ddfip" => Ok(Self::Ddfip),
            "dgfip" => Ok(Self::Dgfip),
            _ => Err(UnknownValue::new("organization type", value)),
        }
    }
}

/// Street address as recorded in MAJIC (FANTOIR code rivoli).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Adresse {
    pub numero_voie: Option<String>,
    pub indice_repetition: Option<String>,
    pub libelle_voie: Option<String>,
    pub code_rivoli: Option<String>,
}

impl Adresse {
    pub fn is_blank(&self) -> bool {
        is_blank(&self.numero_voie)
            && is_blank(&self.indice_repetition)
            && is_blank(&self.libelle_voie)
            && is_blank(&self.code_rivoli)
    }

    /// Single-line street address, e.g. `12 bis rue des Lilas`.
    pub fn line(&self) -> Option<String> {
        let parts: Vec<&str> = [
            &self.numero_voie,
            &self.indice_repetition,
            &self.libelle_voie,
        ]
        .into_iter()
        .filter_map(|part| part.as_deref().map(str::trim))
        .filter(|part| !part.is_empty())
        .collect();

        if parts.is_empty() {
            None
        } else {
            Some(parts.join(" "))
        }
    }
}

/// Door location within a building.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Porte {
    pub numero_batiment: Option<String>,
    pub numero_escalier: Option<String>,
    pub numero_niveau: Option<String>,
    pub numero_porte: Option<String>,
}

impl Porte {
    fn parts(&self) -> [&Option<String>; 4] {
        [
            &self.numero_batiment,
            &self.numero_escalier,
            &self.numero_niveau,
            &self.numero_porte,
        ]
    }

    pub fn is_blank(&self) -> bool {
        self.parts().into_iter().all(is_blank)
    }

    pub fn is_partially_blank(&self) -> bool {
        !self.is_blank() && self.parts().into_iter().any(is_blank)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Coefficients {
    pub entretien: Option<f64>,
    pub situation_generale: Option<f64>,
    pub situation_particuliere: Option<f64>,
}

/// Current MAJIC situation of the local.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Situation {
    pub annee_majic: Option<i32>,
    pub invariant: Option<String>,
    pub parcelle: Option<String>,
    pub proprietaire: Option<String>,
    pub numero_ordre_proprietaire: Option<String>,
    #[serde(default)]
    pub adresse: Adresse,
    #[serde(default)]
    pub porte: Porte,
    pub affectation: Option<Affectation>,
    pub nature: Option<String>,
    pub categorie: Option<String>,
    pub surface_reelle: Option<f64>,
    #[serde(default)]
    pub coefficients: Coefficients,
}

/// Situation proposed by the collectivity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Proposition {
    pub affectation: Option<Affectation>,
    pub nature: Option<String>,
    pub categorie: Option<String>,
    pub surface_reelle: Option<f64>,
    #[serde(default)]
    pub coefficients: Coefficients,
    pub exoneration: Option<String>,
    #[serde(default)]
    pub adresse: Adresse,
    pub date_achevement: Option<NaiveDate>,
}

/// Timestamps recorded by state transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Milestone {
    CompletedAt,
    TransmittedAt,
    AcknowledgedAt,
    AcceptedAt,
    AssignedAt,
    DeniedAt,
    ApprovedAt,
    RejectedAt,
    ConfirmedAt,
    CanceledAt,
}

/// Workflow entity describing a reported discrepancy on a local.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub id: ReportId,
    #[serde(default)]
    pub reference: Option<String>,
    pub state: ReportState,
    pub form_type: FormType,
    #[serde(default)]
    pub anomalies: BTreeSet<Anomaly>,
    #[serde(default)]
    pub priority: Priority,
    pub collectivity_id: CollectivityId,
    #[serde(default)]
    pub office_id: Option<OfficeId>,
    #[serde(default)]
    pub package_id: Option<PackageId>,
    #[serde(default)]
    pub code_insee: Option<String>,
    #[serde(default)]
    pub date_constat: Option<NaiveDate>,
    #[serde(default)]
    pub enjeu: Option<String>,
    #[serde(default)]
    pub observations: Option<String>,
    #[serde(default)]
    pub reponse: Option<String>,
    #[serde(default)]
    pub situation: Situation,
    #[serde(default)]
    pub proposition: Proposition,
    #[serde(default)]
    pub milestones: BTreeMap<Milestone, DateTime<Utc>>,
}

impl Report {
    /// Start a draft report.
    pub fn new(id: ReportId, collectivity_id: CollectivityId, form_type: FormType) -> Self {
        Self {
            id,
            reference: None,
            state: ReportState::Draft,
            form_type,
            anomalies: BTreeSet::new(),
            priority: Priority::default(),
            collectivity_id,
            office_id: None,
            package_id: None,
            code_insee: None,
            date_constat: None,
            enjeu: None,
            observations: None,
            reponse: None,
            situation: Situation::default(),
            proposition: Proposition::default(),
            milestones: BTreeMap::new(),
        }
    }

    pub fn action(&self) -> ReportAction {
        self.form_type.action()
    }

    pub fn is_completed(&self) -> bool {
        self.state.is_completed()
    }

    pub fn has_package(&self) -> bool {
        self.package_id.is_some()
    }

    pub fn milestone(&self, milestone: Milestone) -> Option<DateTime<Utc>> {
        self.milestones.get(&milestone).copied()
    }
}

/// Absent values and whitespace-only strings are blank.
pub fn is_blank(value: &Option<String>) -> bool {
    value
        .as_deref()
        .map(|raw| raw.trim().is_empty())
        .unwrap_or(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn form_types_map_to_actions() {
        assert_eq!(
            FormType::EvaluationLocalHabitation.action(),
            ReportAction::EvaluationHab
        );
        assert_eq!(
            FormType::EvaluationLocalProfessionnel.action(),
            ReportAction::EvaluationEco
        );
        assert!(!FormType::CreationLocalHabitation.action().requires_majic());
    }

    #[test]
    fn parses_coded_values() {
        assert_eq!("Transmitted".parse::<ReportState>(), Ok(ReportState::Transmitted));
        assert_eq!("h".parse::<Affectation>(), Ok(Affectation::Habitation));
        assert_eq!(
            "consistance".parse::<Anomaly>(),
            Ok(Anomaly::Consistance)
        );
        let error = "bogus".parse::<FormType>().unwrap_err();
        assert_eq!(error.to_string(), "unknown form type 'bogus'");
    }

    #[test]
    fn ddfip_vocabulary_groups_transmitted_and_acknowledged() {
        assert_eq!(
            OrganizationType::Ddfip.states_for(ReportState::Transmitted),
            &[ReportState::Transmitted, ReportState::Acknowledged]
        );
        assert_eq!(
            OrganizationType::Ddfip.user_facing_state(ReportState::Processing),
            ReportState::Assigned
        );
    }

    #[test]
    fn collectivities_see_review_states_as_transmitted() {
        for state in [
            ReportState::Accepted,
            ReportState::Processing,
            ReportState::Applicable,
        ] {
            assert_eq!(
                OrganizationType::Collectivity.user_facing_state(state),
                ReportState::Transmitted
            );
        }
        assert!(OrganizationType::Publisher
            .states_for(ReportState::Applicable)
            .is_empty());
    }

    #[test]
    fn door_groups_detect_partial_input() {
        let mut porte = Porte::default();
        assert!(porte.is_blank());
        porte.numero_batiment = Some("A".to_string());
        assert!(porte.is_partially_blank());
        porte.numero_escalier = Some("01".to_string());
        porte.numero_niveau = Some("02".to_string());
        porte.numero_porte = Some("03012".to_string());
        assert!(!porte.is_partially_blank());
    }

    #[test]
    fn blank_detection_ignores_whitespace() {
        assert!(is_blank(&None));
        assert!(is_blank(&Some("   ".to_string())));
        assert!(!is_blank(&Some("x".to_string())));
    }
}
