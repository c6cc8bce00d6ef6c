//! API module for the ipswap service

pub mod middleware;
pub mod routes;
pub mod types;

use crate::server::AppState;
use axum::{
    routing::{get, post},
    Router,
};

/// Create all API routes
pub fn routes(state: AppState) -> Router<AppState> {
    let router = Router::new()
        .route(
            "/health",
            get(routes::health::health_check).post(routes::health::health_check),
        )
        .route("/change-vm-ip", post(routes::change_ip::change_vm_ip))
        .route("/diagnose-vm", post(routes::diagnose::diagnose_vm));

    middleware::apply_middleware(router, state)
}
