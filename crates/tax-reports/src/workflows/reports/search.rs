use tracing::debug;

use super::domain::{FormType, OrganizationType, Report, ReportState};

/// Report attributes reachable through a `key:value` search parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchColumn {
    Invariant,
    Reference,
    CodeInsee,
    Package,
    Adresse,
}

impl SearchColumn {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Invariant => "invariant",
            Self::Reference => "reference",
            Self::CodeInsee => "code_insee",
            Self::Package => "package",
            Self::Adresse => "adresse",
        }
    }

    fn values(self, report: &Report) -> Vec<String> {
        match self {
            Self::Invariant => report.situation.invariant.iter().cloned().collect(),
            Self::Reference => report.reference.iter().cloned().collect(),
            Self::CodeInsee => report.code_insee.iter().cloned().collect(),
            Self::Package => report
                .package_id
                .iter()
                .map(|package| package.0.clone())
                .collect(),
            Self::Adresse => [
                report.situation.adresse.line(),
                report.proposition.adresse.line(),
            ]
            .into_iter()
            .flatten()
            .collect(),
        }
    }
}

/// One translated search parameter. Criteria are combined with AND.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchCriterion {
    /// Underlying states matching the user-facing states that were asked for.
    State(Vec<ReportState>),
    FormType(Vec<FormType>),
    Column { column: SearchColumn, value: String },
    Text(String),
}

impl SearchCriterion {
    /// Attribute name the criterion filters on.
    pub fn key(&self) -> &'static str {
        match self {
            Self::State(_) => "state",
            Self::FormType(_) => "form_type",
            Self::Column { column, .. } => column.as_str(),
            Self::Text(_) => "text",
        }
    }

    pub fn matches(&self, report: &Report) -> bool {
        match self {
            Self::State(states) => states.contains(&report.state),
            Self::FormType(form_types) => form_types.contains(&report.form_type),
            Self::Column {
                column: SearchColumn::CodeInsee,
                value,
            } => report
                .code_insee
                .as_deref()
                .map(|code| code.trim().eq_ignore_ascii_case(value))
                .unwrap_or(false),
            Self::Column { column, value } => column
                .values(report)
                .iter()
                .any(|candidate| contains_ignore_case(candidate, value)),
            Self::Text(text) => text_haystack(report)
                .iter()
                .any(|candidate| contains_ignore_case(candidate, text)),
        }
    }
}

/// Translates user search input into criteria using the vocabulary of one organization type.
#[derive(Debug, Clone, Copy)]
pub struct SearchService {
    organization_type: OrganizationType,
    limit: usize,
}

impl SearchService {
    pub fn new(organization_type: OrganizationType, limit: usize) -> Self {
        Self {
            organization_type,
            limit,
        }
    }

    pub fn organization_type(&self) -> OrganizationType {
        self.organization_type
    }

    /// Translate a single `key:value` parameter.
    ///
    /// French aliases are accepted for keys. States are read as user-facing
    /// states of the organization and expanded to the underlying states, and
    /// several values may be separated by commas. Unknown keys are free text.
    pub fn analyze_param(&self, param: &str) -> SearchCriterion {
        let Some((key, value)) = param.split_once(':') else {
            return SearchCriterion::Text(param.trim().to_string());
        };
        let value = value.trim();

        match key.trim().to_lowercase().as_str() {
            "etat" | "state" => SearchCriterion::State(self.states(value)),
            "type" | "form_type" => SearchCriterion::FormType(form_types(value)),
            "commune" | "code_insee" => column(SearchColumn::CodeInsee, value),
            "paquet" | "package" => column(SearchColumn::Package, value),
            "adresse" | "address" => column(SearchColumn::Adresse, value),
            "invariant" => column(SearchColumn::Invariant, value),
            "reference" => column(SearchColumn::Reference, value),
            _ => SearchCriterion::Text(param.trim().to_string()),
        }
    }

    /// Split input into parameters (double quotes group words) and translate each one.
    pub fn parse(&self, input: &str) -> Vec<SearchCriterion> {
        tokenize(input)
            .iter()
            .map(|token| self.analyze_param(token))
            .collect()
    }

    /// Reports matching every criterion of `input`, capped at the configured limit.
    pub fn search<'r>(&self, reports: &'r [Report], input: &str) -> Vec<&'r Report> {
        let criteria = self.parse(input);
        let matched: Vec<&'r Report> = reports
            .iter()
            .filter(|report| criteria.iter().all(|criterion| criterion.matches(report)))
            .take(self.limit)
            .collect();

        debug!(
            organization = self.organization_type.as_str(),
            criteria = criteria.len(),
            matched = matched.len(),
            "report search evaluated"
        );
        matched
    }

    fn states(&self, value: &str) -> Vec<ReportState> {
        let mut states = Vec::new();
        for requested in split_values(value) {
            let Ok(user_facing) = requested.parse::<ReportState>() else {
                continue;
            };
            for state in self.organization_type.states_for(user_facing) {
                if !states.contains(state) {
                    states.push(*state);
                }
            }
        }
        states
    }
}

fn column(column: SearchColumn, value: &str) -> SearchCriterion {
    SearchCriterion::Column {
        column,
        value: value.to_string(),
    }
}

/// Form types named either by code or by review action (`evaluation_hab`, ...).
fn form_types(value: &str) -> Vec<FormType> {
    let mut matched = Vec::new();
    for requested in split_values(value) {
        let requested = requested.to_ascii_lowercase();
        if let Some(form_type) = FormType::ALL.into_iter().find(|form_type| {
            form_type.as_str() == requested || form_type.action().as_str() == requested
        }) {
            if !matched.contains(&form_type) {
                matched.push(form_type);
            }
        }
    }
    matched
}

fn split_values(value: &str) -> impl Iterator<Item = &str> {
    value
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
}

fn tokenize(input: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut quoted = false;

    for c in input.chars() {
        match c {
            '"' => quoted = !quoted,
            c if c.is_whitespace() && !quoted => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            c => current.push(c),
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

fn text_haystack(report: &Report) -> Vec<String> {
    let mut haystack: Vec<String> = [
        &report.reference,
        &report.situation.invariant,
        &report.code_insee,
        &report.observations,
    ]
    .into_iter()
    .flatten()
    .cloned()
    .collect();

    haystack.extend(SearchColumn::Adresse.values(report));
    haystack.extend(report.package_id.iter().map(|package| package.0.clone()));
    haystack
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}
