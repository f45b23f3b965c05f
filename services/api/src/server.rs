use crate::cli::ServeArgs;
use crate::infra::{AppState, InMemoryReportRepository};
use crate::routes::with_report_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tax_reports::config::AppConfig;
use tax_reports::error::AppError;
use tax_reports::telemetry;
use tax_reports::workflows::reports::{
    ReportCsvImporter, ReportRepository, ReportRouterState, ReportStateService,
};
use tracing::{info, warn};

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let repository = Arc::new(InMemoryReportRepository::default());
    if let Some(path) = args.seed.take() {
        let reports = ReportCsvImporter::from_path(&path)?;
        let mut seeded = 0;
        for report in reports {
            let id = report.id.clone();
            match repository.insert(report) {
                Ok(_) => seeded += 1,
                Err(error) => warn!(report_id = %id, %error, "skipping seeded report"),
            }
        }
        info!(seeded, path = %path.display(), "reports loaded");
    }

    let router_state = Arc::new(ReportRouterState {
        service: ReportStateService::new(repository),
        search_limit: config.reports.search_limit,
    });

    let app = with_report_routes(router_state)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        sandbox = config.reports.sandbox,
        "tax report service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
