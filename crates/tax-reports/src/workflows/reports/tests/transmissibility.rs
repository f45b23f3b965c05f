use super::common::*;
use crate::workflows::reports::domain::{PackageId, ReportId, ReportState};
use crate::workflows::reports::transmissibility::{
    IntransmissibleReason, TransmissibilityCheck,
};

#[test]
fn buckets_follow_reason_priority() {
    let mut draft_with_package = report_in("draft-packaged", ReportState::Draft);
    draft_with_package.package_id = Some(PackageId("2024-03-0001".to_string()));

    let reports = vec![
        report_in("draft", ReportState::Draft),
        draft_with_package,
        report_in("canceled", ReportState::Canceled),
        transmitted_report("packaged", ReportState::Ready),
        transmitted_report("packaged-in-cart", ReportState::Ready),
        ready_report("in-cart"),
        ready_report("free"),
    ];
    let transmitting = [
        ReportId("packaged-in-cart".to_string()),
        ReportId("in-cart".to_string()),
    ];

    let check = TransmissibilityCheck::new(&reports, transmitting.iter());
    let grouped = check.intransmissible_reports_by_reason();

    assert_eq!(
        ids(&grouped[&IntransmissibleReason::Incomplete]),
        vec!["draft", "draft-packaged", "canceled"]
    );
    assert_eq!(
        ids(&grouped[&IntransmissibleReason::Transmitted]),
        vec!["packaged", "packaged-in-cart"]
    );
    assert_eq!(
        ids(&grouped[&IntransmissibleReason::InTransmission]),
        vec!["in-cart"]
    );
    assert_eq!(ids(&check.transmissible_reports()), vec!["free"]);
}

#[test]
fn every_report_lands_in_exactly_one_bucket() {
    let reports: Vec<_> = ReportState::ALL
        .into_iter()
        .enumerate()
        .map(|(index, state)| {
            let id = format!("r-{index}");
            if index % 2 == 0 {
                transmitted_report(&id, state)
            } else {
                report_in(&id, state)
            }
        })
        .collect();
    let transmitting = [ReportId("r-3".to_string()), ReportId("r-4".to_string())];

    let check = TransmissibilityCheck::new(&reports, transmitting.iter());
    let grouped = check.intransmissible_reports_by_reason();
    let bucketed: usize = grouped.values().map(Vec::len).sum();

    assert_eq!(bucketed, check.intransmissible_reports().len());
    assert_eq!(
        bucketed + check.transmissible_reports().len(),
        reports.len()
    );
    for report in &reports {
        let buckets = grouped
            .values()
            .filter(|bucket| bucket.iter().any(|candidate| candidate.id == report.id))
            .count();
        let expected = usize::from(!check.is_transmissible(report));
        assert_eq!(buckets, expected, "report {} misplaced", report.id);
    }
}

#[test]
fn summary_lists_identifiers_by_reason() {
    let reports = vec![report_in("draft", ReportState::Draft), ready_report("ready")];
    let check = TransmissibilityCheck::new(&reports, std::iter::empty());
    let summary = check.summary();

    assert_eq!(summary.transmissible, vec![ReportId("ready".to_string())]);
    assert_eq!(
        summary.intransmissible[&IntransmissibleReason::Incomplete],
        vec![ReportId("draft".to_string())]
    );
    assert_eq!(
        serde_json::to_value(&summary).expect("serializes")["intransmissible"]["incomplete"],
        serde_json::json!(["draft"])
    );
}
