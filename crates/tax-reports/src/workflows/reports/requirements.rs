use std::collections::BTreeSet;

use super::domain::{Affectation, Anomaly, FormType, Report};

const HABITATION_EVALUATION_TRIGGERS: [Anomaly; 2] = [Anomaly::Consistance, Anomaly::Correctif];
const PROFESSIONNEL_EVALUATION_TRIGGERS: [Anomaly; 2] = [Anomaly::Consistance, Anomaly::Categorie];

/// Which field groups a report must (or may) fill, given its form type and anomalies.
///
/// Every predicate is a pure function of the form type, the anomaly set and the
/// proposed affectation, so forms and the completeness check agree on the rules.
#[derive(Debug, Clone)]
pub struct Requirements<'a> {
    form_type: FormType,
    anomalies: &'a BTreeSet<Anomaly>,
    proposition_affectation: Option<Affectation>,
}

impl<'a> Requirements<'a> {
    pub fn new(
        form_type: FormType,
        anomalies: &'a BTreeSet<Anomaly>,
        proposition_affectation: Option<Affectation>,
    ) -> Self {
        Self {
            form_type,
            anomalies,
            proposition_affectation,
        }
    }

    pub fn for_report(report: &'a Report) -> Self {
        Self::new(
            report.form_type,
            &report.anomalies,
            report.proposition.affectation,
        )
    }

    pub fn allowed_anomalies(form_type: FormType) -> &'static [Anomaly] {
        match form_type {
            FormType::EvaluationLocalHabitation => &[
                Anomaly::Affectation,
                Anomaly::Consistance,
                Anomaly::Correctif,
                Anomaly::Exoneration,
                Anomaly::Adresse,
            ],
            FormType::EvaluationLocalProfessionnel => &[
                Anomaly::Affectation,
                Anomaly::Consistance,
                Anomaly::Categorie,
                Anomaly::Exoneration,
                Anomaly::Adresse,
            ],
            FormType::CreationLocalHabitation | FormType::CreationLocalProfessionnel => {
                &[Anomaly::OmissionBatie, Anomaly::ConstructionNeuve]
            }
        }
    }

    pub fn disallowed_anomalies(&self) -> Vec<Anomaly> {
        let allowed = Self::allowed_anomalies(self.form_type);
        self.anomalies
            .iter()
            .copied()
            .filter(|anomaly| !allowed.contains(anomaly))
            .collect()
    }

    fn includes(&self, anomaly: Anomaly) -> bool {
        self.anomalies.contains(&anomaly)
    }

    fn intersects(&self, anomalies: &[Anomaly]) -> bool {
        anomalies.iter().any(|anomaly| self.includes(*anomaly))
    }

    fn proposes_habitation(&self) -> bool {
        self.proposition_affectation
            .map(Affectation::is_habitation)
            .unwrap_or(false)
    }

    fn proposes_professionnel(&self) -> bool {
        self.proposition_affectation
            .map(Affectation::is_professionnel)
            .unwrap_or(false)
    }

    pub fn require_situation_majic(&self) -> bool {
        self.form_type.is_evaluation()
    }

    pub fn require_situation_evaluation_habitation(&self) -> bool {
        self.form_type == FormType::EvaluationLocalHabitation
    }

    /// Displayed to the tax office, never enforced.
    pub fn expect_situation_evaluation_professionnel(&self) -> bool {
        self.form_type == FormType::EvaluationLocalProfessionnel
    }

    pub fn require_proposition_affectation(&self) -> bool {
        self.form_type.is_evaluation() && self.includes(Anomaly::Affectation)
    }

    pub fn require_proposition_evaluation_habitation(&self) -> bool {
        match self.form_type {
            FormType::EvaluationLocalHabitation => {
                if self.includes(Anomaly::Affectation) {
                    self.proposes_habitation()
                } else {
                    self.intersects(&HABITATION_EVALUATION_TRIGGERS)
                }
            }
            FormType::EvaluationLocalProfessionnel => {
                self.includes(Anomaly::Affectation) && self.proposes_habitation()
            }
            FormType::CreationLocalHabitation | FormType::CreationLocalProfessionnel => false,
        }
    }

    pub fn require_proposition_evaluation_professionnel(&self) -> bool {
        match self.form_type {
            FormType::EvaluationLocalProfessionnel => {
                if self.includes(Anomaly::Affectation) {
                    self.proposes_professionnel()
                } else {
                    self.intersects(&PROFESSIONNEL_EVALUATION_TRIGGERS)
                }
            }
            FormType::EvaluationLocalHabitation => {
                self.includes(Anomaly::Affectation) && self.proposes_professionnel()
            }
            FormType::CreationLocalHabitation | FormType::CreationLocalProfessionnel => false,
        }
    }

    pub fn require_proposition_correctif(&self) -> bool {
        self.require_proposition_evaluation_habitation() && self.includes(Anomaly::Correctif)
    }

    pub fn require_proposition_exoneration(&self) -> bool {
        self.form_type.is_evaluation() && self.includes(Anomaly::Exoneration)
    }

    pub fn require_proposition_adresse(&self) -> bool {
        self.form_type.is_creation() || self.includes(Anomaly::Adresse)
    }

    pub fn require_proposition_creation(&self) -> bool {
        self.form_type.is_creation()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn anomalies(values: &[Anomaly]) -> BTreeSet<Anomaly> {
        values.iter().copied().collect()
    }

    #[test]
    fn habitation_evaluation_follows_proposed_affectation() {
        let set = anomalies(&[Anomaly::Affectation]);
        let to_habitation = Requirements::new(
            FormType::EvaluationLocalHabitation,
            &set,
            Some(Affectation::Habitation),
        );
        assert!(to_habitation.require_proposition_evaluation_habitation());
        assert!(!to_habitation.require_proposition_evaluation_professionnel());

        let to_commerce = Requirements::new(
            FormType::EvaluationLocalHabitation,
            &set,
            Some(Affectation::Commerce),
        );
        assert!(!to_commerce.require_proposition_evaluation_habitation());
        assert!(to_commerce.require_proposition_evaluation_professionnel());
    }

    #[test]
    fn habitation_evaluation_required_by_consistance_or_correctif() {
        for trigger in HABITATION_EVALUATION_TRIGGERS {
            let set = anomalies(&[trigger]);
            let requirements = Requirements::new(FormType::EvaluationLocalHabitation, &set, None);
            assert!(
                requirements.require_proposition_evaluation_habitation(),
                "{trigger} should require a habitation evaluation"
            );
        }

        let set = anomalies(&[Anomaly::Exoneration, Anomaly::Adresse]);
        let requirements = Requirements::new(FormType::EvaluationLocalHabitation, &set, None);
        assert!(!requirements.require_proposition_evaluation_habitation());
    }

    #[test]
    fn nothing_required_without_anomalies() {
        let set = BTreeSet::new();
        let requirements = Requirements::new(
            FormType::EvaluationLocalHabitation,
            &set,
            Some(Affectation::Habitation),
        );
        assert!(!requirements.require_proposition_evaluation_habitation());
        assert!(!requirements.require_proposition_affectation());
        assert!(!requirements.require_proposition_correctif());
        assert!(!requirements.require_proposition_adresse());
        assert!(requirements.require_situation_majic());
    }

    #[test]
    fn correctif_requires_coefficients_only_with_habitation_evaluation() {
        let set = anomalies(&[Anomaly::Affectation, Anomaly::Correctif]);
        let to_bureau = Requirements::new(
            FormType::EvaluationLocalHabitation,
            &set,
            Some(Affectation::Bureau),
        );
        assert!(!to_bureau.require_proposition_correctif());

        let to_dependance = Requirements::new(
            FormType::EvaluationLocalHabitation,
            &set,
            Some(Affectation::Dependance),
        );
        assert!(to_dependance.require_proposition_correctif());
    }

    #[test]
    fn creation_forms_require_creation_fields_and_address() {
        let set = anomalies(&[Anomaly::ConstructionNeuve]);
        let requirements = Requirements::new(FormType::CreationLocalProfessionnel, &set, None);
        assert!(requirements.require_proposition_creation());
        assert!(requirements.require_proposition_adresse());
        assert!(!requirements.require_situation_majic());
        assert!(!requirements.require_proposition_exoneration());
    }

    #[test]
    fn flags_anomalies_outside_the_form_vocabulary() {
        let set = anomalies(&[Anomaly::Categorie, Anomaly::Consistance]);
        let requirements = Requirements::new(FormType::EvaluationLocalHabitation, &set, None);
        assert_eq!(requirements.disallowed_anomalies(), vec![Anomaly::Categorie]);
    }
}
