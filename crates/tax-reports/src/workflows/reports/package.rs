use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{CollectivityId, FormType, PackageId, ReportId};

/// Batch of reports transmitted together by a collectivity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Package {
    pub id: PackageId,
    pub reference: String,
    pub form_type: FormType,
    pub collectivity_id: CollectivityId,
    pub sandbox: bool,
    pub transmitted_at: DateTime<Utc>,
    pub report_ids: Vec<ReportId>,
}

/// Prefix shared by every package reference of a month: `YYYY-MM-`.
pub fn reference_prefix(on: NaiveDate) -> String {
    format!("{:04}-{:02}-", on.year(), on.month())
}

/// Next monthly reference following `last`, starting at `0001`.
pub fn next_package_reference(last: Option<&str>, on: NaiveDate) -> String {
    let prefix = reference_prefix(on);
    let next = last
        .and_then(|reference| reference.strip_prefix(prefix.as_str()))
        .and_then(|sequence| sequence.parse::<u32>().ok())
        .map(|sequence| sequence + 1)
        .unwrap_or(1);
    format!("{prefix}{next:04}")
}

/// Reference of the report at 1-based `position` within a package.
pub fn report_reference(package_reference: &str, position: usize) -> String {
    format!("{package_reference}-{position:05}")
}
