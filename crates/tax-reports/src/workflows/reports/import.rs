use std::collections::BTreeSet;
use std::fmt;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer};

use super::domain::{
    Adresse, Affectation, Anomaly, CollectivityId, Coefficients, FormType, OfficeId, PackageId,
    Porte, Priority, Proposition, Report, ReportId, ReportState, Situation, UnknownValue,
};

#[derive(Debug)]
pub enum ReportImportError {
    Io(std::io::Error),
    Csv(csv::Error),
    /// Coded value outside its vocabulary on the given CSV line.
    InvalidValue { line: usize, source: UnknownValue },
    InvalidDate {
        line: usize,
        column: &'static str,
        value: String,
    },
    InvalidNumber {
        line: usize,
        column: &'static str,
        value: String,
    },
}

impl fmt::Display for ReportImportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportImportError::Io(err) => write!(f, "failed to read report export: {}", err),
            ReportImportError::Csv(err) => write!(f, "invalid report CSV data: {}", err),
            ReportImportError::InvalidValue { line, source } => {
                write!(f, "line {}: {}", line, source)
            }
            ReportImportError::InvalidDate {
                line,
                column,
                value,
            } => write!(f, "line {}: invalid date '{}' in {}", line, value, column),
            ReportImportError::InvalidNumber {
                line,
                column,
                value,
            } => write!(f, "line {}: invalid number '{}' in {}", line, value, column),
        }
    }
}

impl std::error::Error for ReportImportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ReportImportError::Io(err) => Some(err),
            ReportImportError::Csv(err) => Some(err),
            ReportImportError::InvalidValue { source, .. } => Some(source),
            ReportImportError::InvalidDate { .. } | ReportImportError::InvalidNumber { .. } => None,
        }
    }
}

impl From<std::io::Error> for ReportImportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<csv::Error> for ReportImportError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err)
    }
}

/// Loads reports from a CSV export, one report per row.
///
/// Column names are the report attribute names, flattened with `situation_`
/// and `proposition_` prefixes. Empty cells are absent values.
pub struct ReportCsvImporter;

impl ReportCsvImporter {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Vec<Report>, ReportImportError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Vec<Report>, ReportImportError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);
        let mut reports = Vec::new();

        for (index, record) in csv_reader.deserialize::<ReportRow>().enumerate() {
            let row = record?;
            // header is line 1
            reports.push(row.into_report(index + 2)?);
        }

        Ok(reports)
    }
}

#[derive(Debug, Deserialize)]
struct ReportRow {
    id: String,
    collectivity_id: String,
    form_type: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    state: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    reference: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    anomalies: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    priority: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    office_id: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    package_id: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    code_insee: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    date_constat: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    enjeu: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    observations: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    reponse: Option<String>,

    #[serde(default, deserialize_with = "empty_string_as_none")]
    situation_annee_majic: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    situation_invariant: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    situation_parcelle: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    situation_proprietaire: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    situation_numero_ordre_proprietaire: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    situation_numero_voie: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    situation_indice_repetition: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    situation_libelle_voie: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    situation_code_rivoli: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    situation_numero_batiment: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    situation_numero_escalier: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    situation_numero_niveau: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    situation_numero_porte: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    situation_affectation: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    situation_nature: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    situation_categorie: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    situation_surface_reelle: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    situation_coefficient_entretien: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    situation_coefficient_situation_generale: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    situation_coefficient_situation_particuliere: Option<String>,

    #[serde(default, deserialize_with = "empty_string_as_none")]
    proposition_affectation: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    proposition_nature: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    proposition_categorie: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    proposition_surface_reelle: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    proposition_coefficient_entretien: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    proposition_coefficient_situation_generale: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    proposition_coefficient_situation_particuliere: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    proposition_exoneration: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    proposition_numero_voie: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    proposition_indice_repetition: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    proposition_libelle_voie: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    proposition_code_rivoli: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    proposition_date_achevement: Option<String>,
}

impl ReportRow {
    fn into_report(self, line: usize) -> Result<Report, ReportImportError> {
        let form_type: FormType = coded(&self.form_type, line)?;
        let mut report = Report::new(
            ReportId(self.id),
            CollectivityId(self.collectivity_id),
            form_type,
        );

        report.state = optional_coded::<ReportState>(self.state.as_deref(), line)?
            .unwrap_or(ReportState::Draft);
        report.reference = self.reference;
        report.anomalies = anomalies(self.anomalies.as_deref(), line)?;
        report.priority = optional_coded::<Priority>(self.priority.as_deref(), line)?
            .unwrap_or_default();
        report.office_id = self.office_id.map(OfficeId);
        report.package_id = self.package_id.map(PackageId);
        report.code_insee = self.code_insee;
        report.date_constat = date(self.date_constat.as_deref(), "date_constat", line)?;
        report.enjeu = self.enjeu;
        report.observations = self.observations;
        report.reponse = self.reponse;

        report.situation = Situation {
            annee_majic: number(
                self.situation_annee_majic.as_deref(),
                "situation_annee_majic",
                line,
            )?,
            invariant: self.situation_invariant,
            parcelle: self.situation_parcelle,
            proprietaire: self.situation_proprietaire,
            numero_ordre_proprietaire: self.situation_numero_ordre_proprietaire,
            adresse: Adresse {
                numero_voie: self.situation_numero_voie,
                indice_repetition: self.situation_indice_repetition,
                libelle_voie: self.situation_libelle_voie,
                code_rivoli: self.situation_code_rivoli,
            },
            porte: Porte {
                numero_batiment: self.situation_numero_batiment,
                numero_escalier: self.situation_numero_escalier,
                numero_niveau: self.situation_numero_niveau,
                numero_porte: self.situation_numero_porte,
            },
            affectation: optional_coded::<Affectation>(
                self.situation_affectation.as_deref(),
                line,
            )?,
            nature: self.situation_nature,
            categorie: self.situation_categorie,
            surface_reelle: decimal(
                self.situation_surface_reelle.as_deref(),
                "situation_surface_reelle",
                line,
            )?,
            coefficients: Coefficients {
                entretien: decimal(
                    self.situation_coefficient_entretien.as_deref(),
                    "situation_coefficient_entretien",
                    line,
                )?,
                situation_generale: decimal(
                    self.situation_coefficient_situation_generale.as_deref(),
                    "situation_coefficient_situation_generale",
                    line,
                )?,
                situation_particuliere: decimal(
                    self.situation_coefficient_situation_particuliere.as_deref(),
                    "situation_coefficient_situation_particuliere",
                    line,
                )?,
            },
        };

        report.proposition = Proposition {
            affectation: optional_coded::<Affectation>(
                self.proposition_affectation.as_deref(),
                line,
            )?,
            nature: self.proposition_nature,
            categorie: self.proposition_categorie,
            surface_reelle: decimal(
                self.proposition_surface_reelle.as_deref(),
                "proposition_surface_reelle",
                line,
            )?,
            coefficients: Coefficients {
                entretien: decimal(
                    self.proposition_coefficient_entretien.as_deref(),
                    "proposition_coefficient_entretien",
                    line,
                )?,
                situation_generale: decimal(
                    self.proposition_coefficient_situation_generale.as_deref(),
                    "proposition_coefficient_situation_generale",
                    line,
                )?,
                situation_particuliere: decimal(
                    self.proposition_coefficient_situation_particuliere.as_deref(),
                    "proposition_coefficient_situation_particuliere",
                    line,
                )?,
            },
            exoneration: self.proposition_exoneration,
            adresse: Adresse {
                numero_voie: self.proposition_numero_voie,
                indice_repetition: self.proposition_indice_repetition,
                libelle_voie: self.proposition_libelle_voie,
                code_rivoli: self.proposition_code_rivoli,
            },
            date_achevement: date(
                self.proposition_date_achevement.as_deref(),
                "proposition_date_achevement",
                line,
            )?,
        };

        Ok(report)
    }
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}

fn coded<T>(value: &str, line: usize) -> Result<T, ReportImportError>
where
    T: FromStr<Err = UnknownValue>,
{
    value
        .parse()
        .map_err(|source| ReportImportError::InvalidValue { line, source })
}

fn optional_coded<T>(value: Option<&str>, line: usize) -> Result<Option<T>, ReportImportError>
where
    T: FromStr<Err = UnknownValue>,
{
    value.map(|value| coded(value, line)).transpose()
}

/// Anomalies are separated by spaces, commas or both.
fn anomalies(value: Option<&str>, line: usize) -> Result<BTreeSet<Anomaly>, ReportImportError> {
    value
        .unwrap_or_default()
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|part| !part.is_empty())
        .map(|part| coded::<Anomaly>(part, line))
        .collect()
}

fn date(
    value: Option<&str>,
    column: &'static str,
    line: usize,
) -> Result<Option<NaiveDate>, ReportImportError> {
    let Some(value) = value else {
        return Ok(None);
    };

    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(value, "%d/%m/%Y"))
        .map(Some)
        .map_err(|_| ReportImportError::InvalidDate {
            line,
            column,
            value: value.to_string(),
        })
}

/// Decimal cells accept both `85.5` and `85,5`.
fn decimal(
    value: Option<&str>,
    column: &'static str,
    line: usize,
) -> Result<Option<f64>, ReportImportError> {
    let Some(value) = value else {
        return Ok(None);
    };

    value
        .replace(',', ".")
        .parse::<f64>()
        .map(Some)
        .map_err(|_| ReportImportError::InvalidNumber {
            line,
            column,
            value: value.to_string(),
        })
}

fn number(
    value: Option<&str>,
    column: &'static str,
    line: usize,
) -> Result<Option<i32>, ReportImportError> {
    let Some(value) = value else {
        return Ok(None);
    };

    value
        .parse::<i32>()
        .map(Some)
        .map_err(|_| ReportImportError::InvalidNumber {
            line,
            column,
            value: value.to_string(),
        })
}
