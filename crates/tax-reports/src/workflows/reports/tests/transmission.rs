use std::sync::Arc;

use chrono::Utc;

use super::common::*;
use crate::workflows::reports::domain::{
    CollectivityId, FormType, Milestone, PackageId, Report, ReportId, ReportState,
};
use crate::workflows::reports::package::{reference_prefix, Package};
use crate::workflows::reports::repository::{PackageRepository, RepositoryError};
use crate::workflows::reports::transmissibility::IntransmissibleReason;
use crate::workflows::reports::transmission::{TransmissionError, TransmissionService};

type Service = TransmissionService<MemoryRepository, MemoryPackages>;

fn build_service(reports: Vec<Report>, sandbox: bool) -> (Service, MemoryRepository, MemoryPackages) {
    let repository = MemoryRepository::with_reports(reports);
    let packages = MemoryPackages::default();
    let service = TransmissionService::new(
        Arc::new(repository.clone()),
        Arc::new(packages.clone()),
        sandbox,
    );
    (service, repository, packages)
}

fn collectivity() -> CollectivityId {
    CollectivityId("64102".to_string())
}

#[test]
fn add_classifies_reports_and_fills_the_cart() {
    let mut foreign = ready_report("foreign");
    foreign.collectivity_id = CollectivityId("64445".to_string());
    let reports = vec![
        ready_report("r-1"),
        report_in("r-2", ReportState::Draft),
        transmitted_report("r-3", ReportState::Transmitted),
        foreign,
    ];
    let (service, _, _) = build_service(reports.clone(), false);
    let mut transmission = service.start(collectivity());

    let addition = service.add(&mut transmission, &reports);
    assert_eq!(addition.added, vec![ReportId("r-1".to_string())]);
    assert_eq!(
        addition.intransmissible[&IntransmissibleReason::Incomplete],
        vec![ReportId("r-2".to_string())]
    );
    assert_eq!(
        addition.intransmissible[&IntransmissibleReason::Transmitted],
        vec![ReportId("r-3".to_string())]
    );
    assert_eq!(addition.ignored, vec![ReportId("foreign".to_string())]);
    assert!(transmission.contains(&ReportId("r-1".to_string())));
    assert_eq!(transmission.len(), 1);

    let again = service.add(&mut transmission, &reports[..1]);
    assert!(again.added.is_empty());
    assert_eq!(
        again.intransmissible[&IntransmissibleReason::InTransmission],
        vec![ReportId("r-1".to_string())]
    );
}

#[test]
fn remove_drops_reports_from_the_cart() {
    let reports = vec![ready_report("r-1"), ready_report("r-2")];
    let (service, _, _) = build_service(reports.clone(), false);
    let mut transmission = service.start(collectivity());
    service.add(&mut transmission, &reports);

    let removed = service.remove(
        &mut transmission,
        &[ReportId("r-1".to_string()), ReportId("unknown".to_string())],
    );
    assert_eq!(removed, 1);
    assert_eq!(transmission.len(), 1);
}

#[test]
fn complete_creates_one_package_per_form_type() {
    let mut creation = ready_report("r-3");
    creation.form_type = FormType::CreationLocalHabitation;
    let reports = vec![ready_report("r-1"), ready_report("r-2"), creation];
    let (service, repository, packages) = build_service(reports.clone(), true);
    let mut transmission = service.start(collectivity());
    service.add(&mut transmission, &reports);

    let created = service
        .complete(&mut transmission)
        .expect("transmission succeeds");

    let prefix = reference_prefix(Utc::now().date_naive());
    assert_eq!(created.len(), 2);
    assert_eq!(created[0].form_type, FormType::EvaluationLocalHabitation);
    assert_eq!(created[0].reference, format!("{prefix}0001"));
    assert_eq!(created[1].reference, format!("{prefix}0002"));
    assert!(created.iter().all(|package| package.sandbox));
    assert_eq!(packages.all().len(), 2);
    assert!(transmission.is_empty());

    let second = repository.get("r-2");
    assert_eq!(second.state, ReportState::Transmitted);
    assert_eq!(second.package_id, Some(created[0].id.clone()));
    assert_eq!(second.reference, Some(format!("{prefix}0001-00002")));
    assert!(second.milestone(Milestone::TransmittedAt).is_some());

    let third = repository.get("r-3");
    assert_eq!(third.reference, Some(format!("{prefix}0002-00001")));
}

#[test]
fn package_references_continue_the_monthly_sequence() {
    let reports = vec![ready_report("r-1")];
    let (service, _, packages) = build_service(reports.clone(), false);
    let prefix = reference_prefix(Utc::now().date_naive());
    packages
        .insert(Package {
            id: PackageId(format!("{prefix}0007")),
            reference: format!("{prefix}0007"),
            form_type: FormType::EvaluationLocalHabitation,
            collectivity_id: collectivity(),
            sandbox: false,
            transmitted_at: Utc::now(),
            report_ids: Vec::new(),
        })
        .expect("seed package");

    let mut transmission = service.start(collectivity());
    service.add(&mut transmission, &reports);
    let created = service
        .complete(&mut transmission)
        .expect("transmission succeeds");

    assert_eq!(created[0].reference, format!("{prefix}0008"));
}

#[test]
fn empty_transmission_fails() {
    let (service, _, _) = build_service(Vec::new(), false);
    let mut transmission = service.start(collectivity());
    assert!(matches!(
        service.complete(&mut transmission),
        Err(TransmissionError::Empty)
    ));
}

#[test]
fn reports_reopened_after_being_added_block_the_transmission() {
    let reports = vec![ready_report("r-1")];
    let (service, repository, packages) = build_service(reports.clone(), false);
    let mut transmission = service.start(collectivity());
    service.add(&mut transmission, &reports);

    let mut reopened = repository.get("r-1");
    reopened.state = ReportState::Draft;
    repository
        .reports
        .lock()
        .expect("repository mutex poisoned")
        .insert(reopened.id.clone(), reopened);

    match service.complete(&mut transmission) {
        Err(TransmissionError::Intransmissible { reports }) => {
            assert_eq!(
                reports[&IntransmissibleReason::Incomplete],
                vec![ReportId("r-1".to_string())]
            );
        }
        other => panic!("expected intransmissible reports, got {other:?}"),
    }
    assert!(packages.all().is_empty());
    assert_eq!(transmission.len(), 1);
}

#[test]
fn duplicated_reports_are_added_once() {
    let reports = vec![ready_report("r-1")];
    let (service, _, _) = build_service(reports.clone(), false);
    let mut transmission = service.start(collectivity());

    let addition = service.add(&mut transmission, &[reports[0].clone(), reports[0].clone()]);

    assert_eq!(addition.added, vec![ReportId("r-1".to_string())]);
    assert!(addition.intransmissible.is_empty());
    assert_eq!(transmission.len(), 1);
}

fn failing_service(
    reports: Vec<Report>,
    failing: &str,
) -> (
    TransmissionService<FailingRepository, MemoryPackages>,
    MemoryRepository,
    MemoryPackages,
) {
    let inner = MemoryRepository::with_reports(reports);
    let packages = MemoryPackages::default();
    let service = TransmissionService::new(
        Arc::new(FailingRepository {
            inner: inner.clone(),
            failing: ReportId(failing.to_string()),
        }),
        Arc::new(packages.clone()),
        false,
    );
    (service, inner, packages)
}

#[test]
fn failed_write_keeps_committed_groups_and_leaves_the_rest_in_the_cart() {
    let mut creation = ready_report("r-2");
    creation.form_type = FormType::CreationLocalHabitation;
    let reports = vec![ready_report("r-1"), creation.clone()];
    let (service, repository, packages) = failing_service(reports.clone(), "r-2");
    let mut transmission = service.start(collectivity());
    service.add(&mut transmission, &reports);

    match service.complete(&mut transmission) {
        Err(TransmissionError::Repository(RepositoryError::Unavailable(_))) => {}
        other => panic!("expected repository failure, got {other:?}"),
    }

    let stored = packages.all();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].report_ids, vec![ReportId("r-1".to_string())]);
    assert_eq!(repository.get("r-1").state, ReportState::Transmitted);
    assert_eq!(repository.get("r-2"), creation);
    assert_eq!(
        transmission.report_ids.iter().cloned().collect::<Vec<_>>(),
        vec![ReportId("r-2".to_string())]
    );

    let retry = TransmissionService::new(
        Arc::new(repository.clone()),
        Arc::new(packages.clone()),
        false,
    );
    let created = retry
        .complete(&mut transmission)
        .expect("remaining reports transmit");

    let prefix = reference_prefix(Utc::now().date_naive());
    assert_eq!(created.len(), 1);
    assert_eq!(created[0].reference, format!("{prefix}0002"));
    assert_eq!(repository.get("r-2").state, ReportState::Transmitted);
    assert!(transmission.is_empty());
}

#[test]
fn failed_write_restores_reports_of_the_same_group() {
    let first = ready_report("r-1");
    let reports = vec![first.clone(), ready_report("r-2")];
    let (service, repository, packages) = failing_service(reports.clone(), "r-2");
    let mut transmission = service.start(collectivity());
    service.add(&mut transmission, &reports);

    assert!(matches!(
        service.complete(&mut transmission),
        Err(TransmissionError::Repository(_))
    ));

    assert!(packages.all().is_empty());
    assert_eq!(repository.get("r-1"), first);
    assert_eq!(repository.get("r-2").state, ReportState::Ready);
    assert_eq!(transmission.len(), 2);
}
