//! API middleware stack

mod function_key;

pub use function_key::{function_key_middleware, presented_key, FUNCTION_KEY_HEADER};

use crate::server::AppState;
use axum::Router;

/// Apply middleware to a router
pub fn apply_middleware(router: Router<AppState>, state: AppState) -> Router<AppState> {
    router.layer(axum::middleware::from_fn_with_state(
        state,
        function_key_middleware,
    ))
}
