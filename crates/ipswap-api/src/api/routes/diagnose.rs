//! VM discovery diagnostics handler

use crate::{
    api::types::ChangeIpRequest,
    error::{ApiError, Result},
    server::AppState,
    services::DiagnosticReport,
};
use axum::{body::Bytes, extract::State, Json};
use tracing::info;

/// Report every NIC public IP and whether one of them holds `current_ip`
pub async fn diagnose_vm(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<DiagnosticReport>> {
    let request = ChangeIpRequest::from_body(&body)?;

    info!(current_ip = %request.current_ip, "VM diagnosis request received");

    let timeout = state.config.request_timeout();
    let report = tokio::time::timeout(timeout, state.diagnostics.diagnose(&request.current_ip))
        .await
        .map_err(|_| ApiError::Timeout {
            seconds: timeout.as_secs(),
        })?;

    Ok(Json(report))
}
