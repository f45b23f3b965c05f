use std::collections::BTreeMap;
use std::fmt;

use serde::{Serialize, Serializer};

/// Report attributes that can carry validation errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Field {
    Base,
    CodeInsee,
    DateConstat,
    Anomalies,
    OfficeId,
    Reponse,
    SituationAnneeMajic,
    SituationInvariant,
    SituationParcelle,
    SituationProprietaire,
    SituationAdresse,
    SituationCodeRivoli,
    SituationPorte,
    SituationNature,
    SituationCategorie,
    SituationSurfaceReelle,
    SituationCoefficientEntretien,
    SituationCoefficientSituationGenerale,
    SituationCoefficientSituationParticuliere,
    PropositionAffectation,
    PropositionNature,
    PropositionCategorie,
    PropositionSurfaceReelle,
    PropositionCoefficientEntretien,
    PropositionCoefficientSituationGenerale,
    PropositionCoefficientSituationParticuliere,
    PropositionExoneration,
    PropositionAdresse,
    PropositionCodeRivoli,
    PropositionDateAchevement,
}

impl Field {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Base => "base",
            Self::CodeInsee => "code_insee",
            Self::DateConstat => "date_constat",
            Self::Anomalies => "anomalies",
            Self::OfficeId => "office_id",
            Self::Reponse => "reponse",
            Self::SituationAnneeMajic => "situation_annee_majic",
            Self::SituationInvariant => "situation_invariant",
            Self::SituationParcelle => "situation_parcelle",
            Self::SituationProprietaire => "situation_proprietaire",
            Self::SituationAdresse => "situation_adresse",
            Self::SituationCodeRivoli => "situation_code_rivoli",
            Self::SituationPorte => "situation_porte",
            Self::SituationNature => "situation_nature",
            Self::SituationCategorie => "situation_categorie",
            Self::SituationSurfaceReelle => "situation_surface_reelle",
            Self::SituationCoefficientEntretien => "situation_coefficient_entretien",
            Self::SituationCoefficientSituationGenerale => {
                "situation_coefficient_situation_generale"
            }
            Self::SituationCoefficientSituationParticuliere => {
                "situation_coefficient_situation_particuliere"
            }
            Self::PropositionAffectation => "proposition_affectation",
            Self::PropositionNature => "proposition_nature",
            Self::PropositionCategorie => "proposition_categorie",
            Self::PropositionSurfaceReelle => "proposition_surface_reelle",
            Self::PropositionCoefficientEntretien => "proposition_coefficient_entretien",
            Self::PropositionCoefficientSituationGenerale => {
                "proposition_coefficient_situation_generale"
            }
            Self::PropositionCoefficientSituationParticuliere => {
                "proposition_coefficient_situation_particuliere"
            }
            Self::PropositionExoneration => "proposition_exoneration",
            Self::PropositionAdresse => "proposition_adresse",
            Self::PropositionCodeRivoli => "proposition_code_rivoli",
            Self::PropositionDateAchevement => "proposition_date_achevement",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Field {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Symbolic validation error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Blank,
    Invalid,
    Incomplete,
    IncompleteLibelleVoie,
    IncompleteCodeRivoli,
    Inclusion,
    InFuture,
    GreaterThan,
}

impl ErrorKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Blank => "blank",
            Self::Invalid => "invalid",
            Self::Incomplete => "incomplete",
            Self::IncompleteLibelleVoie => "incomplete_libelle_voie",
            Self::IncompleteCodeRivoli => "incomplete_code_rivoli",
            Self::Inclusion => "inclusion",
            Self::InFuture => "in_future",
            Self::GreaterThan => "greater_than",
        }
    }

    pub const fn message(self) -> &'static str {
        match self {
            Self::Blank => "doit être rempli(e)",
            Self::Invalid => "n'est pas valide",
            Self::Incomplete => "est incomplet",
            Self::IncompleteLibelleVoie => "le libellé de la voie est manquant",
            Self::IncompleteCodeRivoli => "le code FANTOIR est manquant",
            Self::Inclusion => "n'est pas inclus(e) dans la liste",
            Self::InFuture => "ne peut pas être dans le futur",
            Self::GreaterThan => "doit être supérieur(e) à 0",
        }
    }
}

/// Validation errors attached to named attributes, in insertion order per attribute.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    entries: BTreeMap<Field, Vec<ErrorKind>>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an error; duplicates on the same attribute are ignored.
    pub fn add(&mut self, field: Field, kind: ErrorKind) {
        let kinds = self.entries.entry(field).or_default();
        if !kinds.contains(&kind) {
            kinds.push(kind);
        }
    }

    pub fn merge(&mut self, other: ValidationErrors) {
        for (field, kinds) in other.entries {
            for kind in kinds {
                self.add(field, kind);
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    pub fn contains(&self, field: Field, kind: ErrorKind) -> bool {
        self.entries
            .get(&field)
            .map(|kinds| kinds.contains(&kind))
            .unwrap_or(false)
    }

    pub fn on(&self, field: Field) -> &[ErrorKind] {
        self.entries.get(&field).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn iter(&self) -> impl Iterator<Item = (Field, ErrorKind)> + '_ {
        self.entries
            .iter()
            .flat_map(|(field, kinds)| kinds.iter().map(move |kind| (*field, *kind)))
    }

    pub fn full_messages(&self) -> Vec<String> {
        self.iter()
            .map(|(field, kind)| match field {
                Field::Base => kind.message().to_string(),
                _ => format!("{} {}", field, kind.message()),
            })
            .collect()
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<String> = self
            .iter()
            .map(|(field, kind)| format!("{}: {}", field, kind.as_str()))
            .collect();
        f.write_str(&rendered.join(", "))
    }
}

impl Serialize for ValidationErrors {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.entries.iter())
    }
}
