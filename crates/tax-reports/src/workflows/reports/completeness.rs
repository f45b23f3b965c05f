use chrono::{Datelike, NaiveDate, Utc};

use super::domain::{is_blank, Adresse, Coefficients, Report};
use super::errors::{ErrorKind, Field, ValidationErrors};
use super::requirements::Requirements;

const FIRST_MAJIC_YEAR: i32 = 2018;

/// Presence and format checks a report must pass before it can be transmitted.
///
/// Rules depend on the action derived from the form type and on the
/// [`Requirements`] computed from the declared anomalies.
#[derive(Debug, Clone)]
pub struct CompletenessCheck<'a> {
    report: &'a Report,
    today: NaiveDate,
}

impl<'a> CompletenessCheck<'a> {
    pub fn new(report: &'a Report) -> Self {
        Self {
            report,
            today: Utc::now().date_naive(),
        }
    }

    /// Evaluate date-bound rules against a fixed day.
    pub fn as_of(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self
    }

    pub fn valid(&self) -> bool {
        self.errors().is_empty()
    }

    pub fn errors(&self) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        let report = self.report;
        let requirements = Requirements::for_report(report);

        self.validate_common(&mut errors);
        validate_anomalies(&requirements, report, &mut errors);

        if report.action().requires_majic() {
            self.validate_majic(&mut errors);
        }

        if requirements.require_situation_evaluation_habitation() {
            validate_situation_evaluation_habitation(report, &mut errors);
        }

        self.validate_proposition(&requirements, &mut errors);
        errors
    }

    fn validate_common(&self, errors: &mut ValidationErrors) {
        match self.report.code_insee.as_deref().map(str::trim) {
            None | Some("") => errors.add(Field::CodeInsee, ErrorKind::Blank),
            Some(code) if !valid_code_insee(code) => {
                errors.add(Field::CodeInsee, ErrorKind::Invalid)
            }
            Some(_) => {}
        }

        match self.report.date_constat {
            None => errors.add(Field::DateConstat, ErrorKind::Blank),
            Some(date) if date > self.today => errors.add(Field::DateConstat, ErrorKind::InFuture),
            Some(_) => {}
        }
    }

    fn validate_majic(&self, errors: &mut ValidationErrors) {
        let situation = &self.report.situation;

        match situation.annee_majic {
            None => errors.add(Field::SituationAnneeMajic, ErrorKind::Blank),
            Some(year) if !(FIRST_MAJIC_YEAR..=self.today.year()).contains(&year) => {
                errors.add(Field::SituationAnneeMajic, ErrorKind::Inclusion)
            }
            Some(_) => {}
        }

        match situation.invariant.as_deref().map(str::trim) {
            None | Some("") => errors.add(Field::SituationInvariant, ErrorKind::Blank),
            Some(invariant) if !valid_invariant(invariant) => {
                errors.add(Field::SituationInvariant, ErrorKind::Invalid)
            }
            Some(_) => {}
        }

        match situation.parcelle.as_deref().map(str::trim) {
            None | Some("") => errors.add(Field::SituationParcelle, ErrorKind::Blank),
            Some(parcelle) if !valid_parcelle(parcelle) => {
                errors.add(Field::SituationParcelle, ErrorKind::Invalid)
            }
            Some(_) => {}
        }

        match (
            is_blank(&situation.proprietaire),
            is_blank(&situation.numero_ordre_proprietaire),
        ) {
            (true, true) => errors.add(Field::SituationProprietaire, ErrorKind::Blank),
            (true, false) | (false, true) => {
                errors.add(Field::SituationProprietaire, ErrorKind::Incomplete)
            }
            (false, false) => {}
        }

        validate_adresse(
            &situation.adresse,
            Field::SituationAdresse,
            Field::SituationCodeRivoli,
            errors,
        );

        if situation.porte.is_blank() {
            errors.add(Field::SituationPorte, ErrorKind::Blank);
        } else if situation.porte.is_partially_blank() {
            errors.add(Field::SituationPorte, ErrorKind::Incomplete);
        }
    }

    fn validate_proposition(&self, requirements: &Requirements<'_>, errors: &mut ValidationErrors) {
        let proposition = &self.report.proposition;

        if requirements.require_proposition_affectation() && proposition.affectation.is_none() {
            errors.add(Field::PropositionAffectation, ErrorKind::Blank);
        }

        if requirements.require_proposition_evaluation_habitation() {
            require_text(&proposition.nature, Field::PropositionNature, errors);
            require_text(&proposition.categorie, Field::PropositionCategorie, errors);
            require_surface(proposition.surface_reelle, Field::PropositionSurfaceReelle, errors);
        }

        if requirements.require_proposition_evaluation_professionnel() {
            require_text(&proposition.categorie, Field::PropositionCategorie, errors);
            require_surface(proposition.surface_reelle, Field::PropositionSurfaceReelle, errors);
        }

        if requirements.require_proposition_correctif() {
            require_coefficients(
                &proposition.coefficients,
                [
                    Field::PropositionCoefficientEntretien,
                    Field::PropositionCoefficientSituationGenerale,
                    Field::PropositionCoefficientSituationParticuliere,
                ],
                errors,
            );
        }

        if requirements.require_proposition_exoneration() {
            require_text(&proposition.exoneration, Field::PropositionExoneration, errors);
        }

        if requirements.require_proposition_adresse() {
            validate_adresse(
                &proposition.adresse,
                Field::PropositionAdresse,
                Field::PropositionCodeRivoli,
                errors,
            );
        }

        if requirements.require_proposition_creation() {
            require_text(&proposition.nature, Field::PropositionNature, errors);
            match proposition.date_achevement {
                None => errors.add(Field::PropositionDateAchevement, ErrorKind::Blank),
                Some(date) if date > self.today => {
                    errors.add(Field::PropositionDateAchevement, ErrorKind::InFuture)
                }
                Some(_) => {}
            }
        }
    }
}

fn validate_anomalies(requirements: &Requirements<'_>, report: &Report, errors: &mut ValidationErrors) {
    if report.anomalies.is_empty() {
        errors.add(Field::Anomalies, ErrorKind::Blank);
    } else if !requirements.disallowed_anomalies().is_empty() {
        errors.add(Field::Anomalies, ErrorKind::Inclusion);
    }
}

fn validate_situation_evaluation_habitation(report: &Report, errors: &mut ValidationErrors) {
    let situation = &report.situation;
    require_text(&situation.nature, Field::SituationNature, errors);
    require_text(&situation.categorie, Field::SituationCategorie, errors);
    require_surface(situation.surface_reelle, Field::SituationSurfaceReelle, errors);
    require_coefficients(
        &situation.coefficients,
        [
            Field::SituationCoefficientEntretien,
            Field::SituationCoefficientSituationGenerale,
            Field::SituationCoefficientSituationParticuliere,
        ],
        errors,
    );
}

/// Address parts are validated together: a fully blank address is one error, a
/// partial one names what is missing.
fn validate_adresse(
    adresse: &Adresse,
    group: Field,
    code_rivoli_field: Field,
    errors: &mut ValidationErrors,
) {
    if adresse.is_blank() {
        errors.add(group, ErrorKind::Blank);
        return;
    }

    let missing_libelle = is_blank(&adresse.libelle_voie);
    let missing_rivoli = is_blank(&adresse.code_rivoli);
    match (missing_libelle, missing_rivoli) {
        (true, true) => errors.add(group, ErrorKind::Incomplete),
        (true, false) => errors.add(group, ErrorKind::IncompleteLibelleVoie),
        (false, true) => errors.add(group, ErrorKind::IncompleteCodeRivoli),
        (false, false) => {}
    }

    if let Some(code) = adresse.code_rivoli.as_deref().map(str::trim) {
        if !code.is_empty() && !valid_code_rivoli(code) {
            errors.add(code_rivoli_field, ErrorKind::Invalid);
        }
    }
}

fn require_text(value: &Option<String>, field: Field, errors: &mut ValidationErrors) {
    if is_blank(value) {
        errors.add(field, ErrorKind::Blank);
    }
}

fn require_surface(value: Option<f64>, field: Field, errors: &mut ValidationErrors) {
    match value {
        None => errors.add(field, ErrorKind::Blank),
        Some(surface) if !(surface.is_finite() && surface > 0.0) => {
            errors.add(field, ErrorKind::GreaterThan)
        }
        Some(_) => {}
    }
}

fn require_coefficients(
    coefficients: &Coefficients,
    fields: [Field; 3],
    errors: &mut ValidationErrors,
) {
    let values = [
        coefficients.entretien,
        coefficients.situation_generale,
        coefficients.situation_particuliere,
    ];
    for (value, field) in values.into_iter().zip(fields) {
        if value.is_none() {
            errors.add(field, ErrorKind::Blank);
        }
    }
}

/// Two department digits (or 2A/2B for Corsica) followed by three commune digits.
fn valid_code_insee(code: &str) -> bool {
    let code = code.to_ascii_uppercase();
    if code.len() != 5 || !code.is_ascii() {
        return false;
    }
    let (department, commune) = code.split_at(2);
    let department_ok =
        department.chars().all(|c| c.is_ascii_digit()) || department == "2A" || department == "2B";
    department_ok && commune.chars().all(|c| c.is_ascii_digit())
}

fn valid_invariant(invariant: &str) -> bool {
    invariant.len() == 10 && invariant.chars().all(|c| c.is_ascii_digit())
}

/// Optional three-digit prefix, a one or two character section, then up to four plan digits.
fn valid_parcelle(parcelle: &str) -> bool {
    let compact: String = parcelle
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_ascii_uppercase();
    if !compact.is_ascii() {
        return false;
    }

    let head_len = compact.trim_end_matches(|c: char| c.is_ascii_digit()).len();
    let (head, numero) = compact.split_at(head_len);
    if numero.is_empty() || numero.len() > 4 {
        return false;
    }

    let section = if head.len() > 2 && head[..3].chars().all(|c| c.is_ascii_digit()) {
        &head[3..]
    } else {
        head
    };

    (1..=2).contains(&section.len())
        && section.chars().all(|c| c.is_ascii_alphanumeric())
        && section.chars().any(|c| c.is_ascii_alphabetic())
}

fn valid_code_rivoli(code: &str) -> bool {
    code.len() == 4 && code.chars().all(|c| c.is_ascii_alphanumeric())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_insee_accepts_corsica() {
        assert!(valid_code_insee("64102"));
        assert!(valid_code_insee("2A004"));
        assert!(valid_code_insee("2b033"));
        assert!(!valid_code_insee("2C004"));
        assert!(!valid_code_insee("6410"));
    }

    #[test]
    fn parcelle_supports_prefixed_sections() {
        assert!(valid_parcelle("AB 0123"));
        assert!(valid_parcelle("0A0012"));
        assert!(valid_parcelle("123 AB 45"));
        assert!(!valid_parcelle("AB 01234"));
        assert!(!valid_parcelle("0123"));
        assert!(!valid_parcelle("ABC 12"));
    }

    #[test]
    fn rivoli_and_invariant_formats() {
        assert!(valid_code_rivoli("0120"));
        assert!(valid_code_rivoli("B063"));
        assert!(!valid_code_rivoli("01200"));
        assert!(valid_invariant("0123456789"));
        assert!(!valid_invariant("012345678A"));
    }
}
