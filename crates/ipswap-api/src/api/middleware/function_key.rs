//! Function key check
//!
//! When a key is configured, every request must present it either in the
//! `x-functions-key` header or as the `code` query parameter.

use crate::{error::ApiError, server::AppState};
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use tracing::{debug, warn};

pub const FUNCTION_KEY_HEADER: &str = "x-functions-key";
const FUNCTION_KEY_QUERY: &str = "code";

/// Extract the presented key, preferring the header over the query string
pub fn presented_key(request: &Request) -> Option<String> {
    let from_header = request
        .headers()
        .get(FUNCTION_KEY_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);

    from_header.or_else(|| {
        request.uri().query().and_then(|query| {
            url::form_urlencoded::parse(query.as_bytes())
                .find(|(name, _)| name == FUNCTION_KEY_QUERY)
                .map(|(_, value)| value.into_owned())
        })
    })
}

pub async fn function_key_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(expected) = &state.config.server.function_key else {
        return Ok(next.run(request).await);
    };

    match presented_key(&request) {
        Some(key) if key == expected.expose() => {
            debug!("Function key accepted");
            Ok(next.run(request).await)
        }
        Some(_) => {
            warn!(path = %request.uri().path(), "Rejected request with wrong function key");
            Err(ApiError::Unauthorized)
        }
        None => {
            warn!(path = %request.uri().path(), "Rejected request without function key");
            Err(ApiError::Unauthorized)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    fn request(uri: &str, header: Option<&str>) -> Request {
        let mut builder = axum::http::Request::builder().uri(uri);
        if let Some(key) = header {
            builder = builder.header(FUNCTION_KEY_HEADER, key);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[test]
    fn test_key_from_header() {
        assert_eq!(
            presented_key(&request("/api/health", Some("k1"))),
            Some("k1".to_string())
        );
    }

    #[test]
    fn test_key_from_query_is_decoded() {
        assert_eq!(
            presented_key(&request("/api/health?x=1&code=a%2Bb%3D%3D", None)),
            Some("a+b==".to_string())
        );
    }

    #[test]
    fn test_header_wins_over_query() {
        assert_eq!(
            presented_key(&request("/api/health?code=query", Some("header"))),
            Some("header".to_string())
        );
    }

    #[test]
    fn test_no_key() {
        assert_eq!(presented_key(&request("/api/health?other=1", None)), None);
    }
}
