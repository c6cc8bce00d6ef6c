//! Public IP rotation handler

use crate::{
    api::types::{ChangeIpRequest, ChangeIpResponse},
    error::{ApiError, Result},
    server::AppState,
};
use axum::{body::Bytes, extract::State, Json};
use tracing::info;

/// Replace the public IP of the VM currently holding `current_ip`
///
/// The body is read raw so malformed JSON gets the API's own error body.
pub async fn change_vm_ip(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<ChangeIpResponse>> {
    let request = ChangeIpRequest::from_body(&body)?;

    info!(current_ip = %request.current_ip, "IP change request received");

    // Runs detached so a dropped connection cannot stop a rotation halfway
    let rotator = state.rotator.clone();
    let current_ip = request.current_ip;
    let result = tokio::spawn(async move { rotator.rotate(&current_ip).await })
        .await
        .map_err(|e| ApiError::Internal {
            message: format!("Rotation task failed: {e}"),
        })??;

    Ok(Json(result.into()))
}
