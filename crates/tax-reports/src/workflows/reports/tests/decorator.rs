use std::collections::BTreeSet;

use super::common::*;
use crate::workflows::reports::decorator::{BadgeScheme, ReportDecorator};
use crate::workflows::reports::domain::{Affectation, Anomaly, OrganizationType, ReportState};

#[test]
fn office_steps_are_hidden_from_collectivities() {
    let report = transmitted_report("r-1", ReportState::Processing);

    let collectivity = ReportDecorator::new(&report, OrganizationType::Collectivity);
    assert_eq!(collectivity.state(), ReportState::Transmitted);
    assert_eq!(collectivity.state_label(), "Transmis");
    assert_eq!(collectivity.state_badge(), BadgeScheme::Primary);

    let office = ReportDecorator::new(&report, OrganizationType::Ddfip);
    assert_eq!(office.state(), ReportState::Assigned);
    assert_eq!(office.state_badge(), BadgeScheme::Warning);
    assert_eq!(office.state_badge().css_class(), "badge badge--warning");
}

#[test]
fn formats_values_for_display() {
    let mut report = complete_report("r-1");
    report.anomalies = BTreeSet::from([Anomaly::Affectation, Anomaly::Correctif]);
    report.proposition.affectation = Some(Affectation::Dependance);
    report.situation.adresse.indice_repetition = Some("bis".to_string());

    let decorator = ReportDecorator::new(&report, OrganizationType::Collectivity);
    assert_eq!(
        decorator.form_type_label(),
        "Évaluation d'un local d'habitation"
    );
    assert_eq!(
        decorator.anomaly_labels(),
        vec!["Affectation", "Correctif d'ensemble"]
    );
    assert_eq!(decorator.situation_adresse().as_deref(), Some("12 bis rue des Lilas"));
    assert_eq!(decorator.proposition_adresse(), None);
    assert_eq!(decorator.situation_affectation(), Some("Habitation"));
    assert_eq!(decorator.proposition_affectation(), Some("Dépendance"));
    assert_eq!(decorator.situation_surface().as_deref(), Some("85,5 m²"));
    assert_eq!(decorator.proposition_surface().as_deref(), Some("104 m²"));
    assert_eq!(decorator.date_constat().as_deref(), Some("12/03/2024"));
    assert_eq!(decorator.priority_label(), "Basse");
}

#[test]
fn view_serializes_display_fields() {
    let report = transmitted_report("r-1", ReportState::Acknowledged);
    let view = ReportDecorator::new(&report, OrganizationType::Ddfip).view();

    let json = serde_json::to_value(&view).expect("serializes");
    assert_eq!(json["id"], "r-1");
    assert_eq!(json["state"], "transmitted");
    assert_eq!(json["state_label"], "Transmis");
    assert_eq!(json["badge"], "primary");
    assert_eq!(json["form_type"], "evaluation_local_habitation");
    assert_eq!(json["anomalies"], serde_json::json!(["Consistance"]));
    assert_eq!(json["package_id"], "2024-03-0001");
    assert!(json.get("office_id").is_none());
}
