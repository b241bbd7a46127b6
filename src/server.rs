//! HTTP transport for the agent.
//!
//! Thin layer over [`AnalysisCoordinator`]: decode the multipart form, run the
//! analysis on the blocking pool, map the outcome to a status code.

use anyhow::{Context, Result};
use axum::{
    extract::{multipart::MultipartRejection, DefaultBodyLimit, Multipart, Path, State},
    http::StatusCode,
    response::Json,
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use tracing::{error, info};

use crate::coordinator::{AnalysisCoordinator, AnalysisResponse, HealthInfo, Upload};
use crate::error::AnalysisError;

type SharedCoordinator = Arc<AnalysisCoordinator>;

/// Fields of a `/analyze` form.
#[derive(Debug, Default)]
struct AnalyzeForm {
    file: Option<Upload>,
    analysis_id: Option<String>,
    password: Option<String>,
    is_zip: bool,
}

impl AnalyzeForm {
    async fn read(mut multipart: Multipart) -> Result<Self, AnalysisError> {
        let mut form = Self::default();
        while let Some(field) = multipart.next_field().await.map_err(bad_form)? {
            let name = field.name().unwrap_or_default().to_string();
            match name.as_str() {
                "file" => {
                    let filename = field.file_name().map(str::to_string);
                    let bytes = field.bytes().await.map_err(bad_form)?;
                    form.file = Some(Upload::new(filename, bytes.to_vec()));
                }
                "analysis_id" => form.analysis_id = Some(field.text().await.map_err(bad_form)?),
                "password" => {
                    let password = field.text().await.map_err(bad_form)?;
                    form.password = Some(password).filter(|p| !p.is_empty());
                }
                "is_zip" => {
                    let value = field.text().await.map_err(bad_form)?;
                    form.is_zip = value.trim().eq_ignore_ascii_case("true");
                }
                _ => {}
            }
        }
        Ok(form)
    }
}

fn bad_form(err: impl std::fmt::Display) -> AnalysisError {
    AnalysisError::Upload(format!("Invalid multipart form: {}", err))
}

/// Build the agent's router.
pub fn router(coordinator: SharedCoordinator) -> Router {
    let limit = body_limit(coordinator.config().server.max_upload_mb);
    Router::new()
        .route("/health", get(health))
        .route("/analyze", post(analyze))
        .route("/cleanup/:analysis_id", delete(cleanup))
        .layer(DefaultBodyLimit::max(limit))
        .with_state(coordinator)
}

fn body_limit(max_upload_mb: usize) -> usize {
    max_upload_mb.saturating_mul(1024 * 1024)
}

/// Bind to the configured address and serve until Ctrl+C.
pub async fn serve(coordinator: SharedCoordinator) -> Result<()> {
    let addr = format!(
        "{}:{}",
        coordinator.config().server.host,
        coordinator.config().server.port
    );
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Agent listening on http://{}", addr);

    axum::serve(listener, router(coordinator))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for ctrl+c: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutting down...");
}

fn status_for(err: &AnalysisError) -> StatusCode {
    if err.is_client_error() {
        StatusCode::BAD_REQUEST
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    }
}

fn failure(err: AnalysisError) -> (StatusCode, Json<AnalysisResponse>) {
    (status_for(&err), Json(AnalysisResponse::failed(&err)))
}

async fn health(State(coordinator): State<SharedCoordinator>) -> Json<HealthInfo> {
    Json(coordinator.health())
}

async fn analyze(
    State(coordinator): State<SharedCoordinator>,
    multipart: Result<Multipart, MultipartRejection>,
) -> (StatusCode, Json<AnalysisResponse>) {
    let multipart = match multipart {
        Ok(m) => m,
        Err(e) => return failure(bad_form(e)),
    };
    let form = match AnalyzeForm::read(multipart).await {
        Ok(form) => form,
        Err(e) => return failure(e),
    };
    let Some(upload) = form.file else {
        return failure(AnalysisError::Upload("No file uploaded".to_string()));
    };
    let Some(analysis_id) = form.analysis_id.filter(|id| !id.trim().is_empty()) else {
        return failure(AnalysisError::Upload("analysis_id required".to_string()));
    };
    info!(
        "Analysis request {} (zip: {}, password supplied: {})",
        analysis_id,
        form.is_zip,
        form.password.is_some()
    );

    let password = form.password;
    let is_zip = form.is_zip;
    let task = tokio::task::spawn_blocking(move || {
        coordinator.analyze(upload, &analysis_id, password.as_deref(), is_zip)
    });

    match task.await {
        Ok(Ok(report)) => (StatusCode::OK, Json(AnalysisResponse::ok(report))),
        Ok(Err(e)) => failure(e),
        Err(e) => {
            error!("Analysis task failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(AnalysisResponse {
                    success: false,
                    report: None,
                    error: Some(format!("Analysis task failed: {}", e)),
                }),
            )
        }
    }
}

async fn cleanup(
    State(coordinator): State<SharedCoordinator>,
    Path(analysis_id): Path<String>,
) -> (StatusCode, Json<AnalysisResponse>) {
    let task = tokio::task::spawn_blocking(move || coordinator.cleanup(&analysis_id));
    match task.await {
        Ok(Ok(())) => (StatusCode::OK, Json(AnalysisResponse::done())),
        Ok(Err(e)) => failure(e),
        Err(e) => {
            error!("Cleanup task failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(AnalysisResponse {
                    success: false,
                    report: None,
                    error: Some(format!("Cleanup task failed: {}", e)),
                }),
            )
        }
    }
}
