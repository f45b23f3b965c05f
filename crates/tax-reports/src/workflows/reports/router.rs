use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;

use super::completeness::CompletenessCheck;
use super::decorator::ReportDecorator;
use super::domain::{OrganizationType, Report, ReportId};
use super::repository::{RepositoryError, ReportRepository};
use super::search::SearchService;
use super::state::{
    AssignParams, ReportStateMachine, ReportStateService, ReviewParams, StateResult,
    StateServiceError,
};
use super::transmissibility::TransmissibilityCheck;

/// Shared state of the report routes.
pub struct ReportRouterState<R> {
    pub service: ReportStateService<R>,
    pub search_limit: usize,
}

/// Router builder exposing search, display and workflow transitions.
pub fn report_router<R>(state: Arc<ReportRouterState<R>>) -> Router
where
    R: ReportRepository + 'static,
{
    Router::new()
        .route("/api/v1/reports", get(list_handler::<R>))
        .route(
            "/api/v1/reports/transmissibility",
            post(transmissibility_handler::<R>),
        )
        .route("/api/v1/reports/:report_id", get(show_handler::<R>))
        .route(
            "/api/v1/reports/:report_id/:transition",
            post(transition_handler::<R>),
        )
        .with_state(state)
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ListQuery {
    #[serde(default)]
    pub(crate) q: Option<String>,
    #[serde(default)]
    pub(crate) organization: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ViewQuery {
    #[serde(default)]
    pub(crate) organization: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TransmissibilityRequest {
    pub(crate) report_ids: Vec<ReportId>,
    #[serde(default)]
    pub(crate) transmitting: Vec<ReportId>,
}

pub(crate) async fn list_handler<R>(
    State(state): State<Arc<ReportRouterState<R>>>,
    Query(query): Query<ListQuery>,
) -> Response
where
    R: ReportRepository + 'static,
{
    let organization_type = match organization(query.organization.as_deref()) {
        Ok(organization_type) => organization_type,
        Err(response) => return response,
    };

    let reports = match state.service.repository().all() {
        Ok(reports) => reports,
        Err(error) => return internal_error(error.to_string()),
    };

    let search = SearchService::new(organization_type, state.search_limit);
    let views: Vec<_> = search
        .search(&reports, query.q.as_deref().unwrap_or_default())
        .into_iter()
        .map(|report| ReportDecorator::new(report, organization_type).view())
        .collect();

    let payload = json!({
        "count": views.len(),
        "reports": views,
    });
    (StatusCode::OK, axum::Json(payload)).into_response()
}

pub(crate) async fn show_handler<R>(
    State(state): State<Arc<ReportRouterState<R>>>,
    Path(report_id): Path<String>,
    Query(query): Query<ViewQuery>,
) -> Response
where
    R: ReportRepository + 'static,
{
    let organization_type = match organization(query.organization.as_deref()) {
        Ok(organization_type) => organization_type,
        Err(response) => return response,
    };

    let id = ReportId(report_id);
    match state.service.fetch(&id) {
        Ok(report) => {
            let transitions: Vec<&'static str> = ReportStateMachine::permitted(report.state)
                .into_iter()
                .map(|transition| transition.as_str())
                .collect();
            let payload = json!({
                "report": ReportDecorator::new(&report, organization_type).view(),
                "errors": CompletenessCheck::new(&report).errors(),
                "transitions": transitions,
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(error) => error_response(&id, error),
    }
}

pub(crate) async fn transition_handler<R>(
    State(state): State<Arc<ReportRouterState<R>>>,
    Path((report_id, transition)): Path<(String, String)>,
    Query(query): Query<ViewQuery>,
    body: Bytes,
) -> Response
where
    R: ReportRepository + 'static,
{
    let organization_type = match organization(query.organization.as_deref()) {
        Ok(organization_type) => organization_type,
        Err(response) => return response,
    };

    let id = ReportId(report_id);
    let mut report = match state.service.fetch(&id) {
        Ok(report) => report,
        Err(error) => return error_response(&id, error),
    };

    let outcome = match apply_transition(&state.service, &mut report, &transition, &body) {
        Ok(outcome) => outcome,
        Err(response) => return response,
    };

    match outcome {
        Ok(report) => {
            let view = ReportDecorator::new(&report, organization_type).view();
            (StatusCode::OK, axum::Json(view)).into_response()
        }
        Err(error) => error_response(&id, error),
    }
}

pub(crate) async fn transmissibility_handler<R>(
    State(state): State<Arc<ReportRouterState<R>>>,
    axum::Json(request): axum::Json<TransmissibilityRequest>,
) -> Response
where
    R: ReportRepository + 'static,
{
    let mut reports: Vec<Report> = Vec::with_capacity(request.report_ids.len());
    let mut unknown = Vec::new();
    for id in &request.report_ids {
        match state.service.repository().fetch(id) {
            Ok(Some(report)) => reports.push(report),
            Ok(None) => unknown.push(id.clone()),
            Err(error) => return internal_error(error.to_string()),
        }
    }

    let summary = TransmissibilityCheck::new(&reports, request.transmitting.iter()).summary();
    let payload = json!({
        "transmissible": summary.transmissible,
        "intransmissible": summary.intransmissible,
        "unknown": unknown,
    });
    (StatusCode::OK, axum::Json(payload)).into_response()
}

fn apply_transition<R>(
    service: &ReportStateService<R>,
    report: &mut Report,
    transition: &str,
    body: &[u8],
) -> Result<StateResult, Response>
where
    R: ReportRepository + 'static,
{
    let outcome = match transition {
        "complete" => service.complete(report),
        "uncomplete" => service.uncomplete(report),
        "acknowledge" => service.acknowledge(report),
        "accept" => service.accept(report),
        "assign" => service.assign(report, params::<AssignParams>(body)?),
        "unassign" => service.unassign(report),
        "process" => service.process(report),
        "deny" => service.deny(report, params::<ReviewParams>(body)?),
        "undeny" => service.undeny(report),
        "approve" => service.approve(report, params::<ReviewParams>(body)?),
        "unapprove" => service.unapprove(report),
        "reject" => service.reject(report, params::<ReviewParams>(body)?),
        "unreject" => service.unreject(report),
        "confirm" => service.confirm(report),
        "cancel" => service.cancel(report),
        other => {
            let payload = json!({ "error": format!("unknown transition '{other}'") });
            return Err((StatusCode::NOT_FOUND, axum::Json(payload)).into_response());
        }
    };
    Ok(outcome)
}

/// An empty body stands for default parameters.
fn params<T>(body: &[u8]) -> Result<T, Response>
where
    T: DeserializeOwned + Default,
{
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }

    serde_json::from_slice(body).map_err(|error| {
        let payload = json!({ "error": format!("invalid parameters: {error}") });
        (StatusCode::BAD_REQUEST, axum::Json(payload)).into_response()
    })
}

/// Office staff are the default audience.
fn organization(value: Option<&str>) -> Result<OrganizationType, Response> {
    match value {
        None => Ok(OrganizationType::Ddfip),
        Some(value) => value.parse().map_err(|error: super::domain::UnknownValue| {
            let payload = json!({ "error": error.to_string() });
            (StatusCode::BAD_REQUEST, axum::Json(payload)).into_response()
        }),
    }
}

fn error_response(id: &ReportId, error: StateServiceError) -> Response {
    match error {
        StateServiceError::Invalid(errors) => {
            let payload = json!({ "errors": errors });
            (StatusCode::UNPROCESSABLE_ENTITY, axum::Json(payload)).into_response()
        }
        StateServiceError::Transition(error) => {
            let payload = json!({ "error": error.to_string() });
            (StatusCode::CONFLICT, axum::Json(payload)).into_response()
        }
        StateServiceError::Repository(RepositoryError::NotFound) => {
            let payload = json!({
                "report_id": id,
                "error": "report not found",
            });
            (StatusCode::NOT_FOUND, axum::Json(payload)).into_response()
        }
        StateServiceError::Repository(error @ RepositoryError::Stale { .. }) => {
            let payload = json!({
                "report_id": id,
                "error": error.to_string(),
            });
            (StatusCode::CONFLICT, axum::Json(payload)).into_response()
        }
        StateServiceError::Repository(other) => internal_error(other.to_string()),
    }
}

fn internal_error(message: String) -> Response {
    let payload = json!({ "error": message });
    (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
}
