use axum::{
    extract::{Request, State},
    http::{HeaderMap, HeaderValue, Method, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;

/// Denial value sent when the `Origin` header is absent or not allow-listed.
pub const CORS_DENY_VALUE: &str = "null";

const ALLOWED_METHODS: &str = "POST,GET,OPTIONS";
const ALLOWED_HEADERS: &str = "content-type,x-request-id";
const MAX_AGE_SECS: &str = "86400";

/// Fixed origin allow-list. Origins must match exactly; there is no
/// wildcard and no pattern support.
#[derive(Debug, Clone, Default)]
pub struct CorsPolicy {
    allowed_origins: Vec<String>,
}

impl CorsPolicy {
    pub fn new(allowed_origins: Vec<String>) -> Self {
        Self { allowed_origins }
    }

    /// Resolve the `Access-Control-Allow-Origin` value for a request origin.
    pub fn allow_origin_value(&self, origin: Option<&str>) -> HeaderValue {
        match origin {
            Some(origin) if self.allowed_origins.iter().any(|allowed| allowed == origin) => {
                HeaderValue::from_str(origin)
                    .unwrap_or_else(|_| HeaderValue::from_static(CORS_DENY_VALUE))
            }
            _ => HeaderValue::from_static(CORS_DENY_VALUE),
        }
    }
}

pub async fn cors_middleware(
    State(policy): State<Arc<CorsPolicy>>,
    req: Request,
    next: Next,
) -> Response {
    let origin = req
        .headers()
        .get(header::ORIGIN)
        .and_then(|h| h.to_str().ok())
        .map(|s| s.to_string());
    let allow_origin = policy.allow_origin_value(origin.as_deref());

    // Pre-flight never reaches the router: empty body, permission headers.
    if req.method() == Method::OPTIONS {
        let mut response = StatusCode::NO_CONTENT.into_response();
        apply_cors_headers(response.headers_mut(), allow_origin);
        return response;
    }

    let mut response = next.run(req).await;
    apply_cors_headers(response.headers_mut(), allow_origin);
    response
}

fn apply_cors_headers(headers: &mut HeaderMap, allow_origin: HeaderValue) {
    headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, allow_origin);
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static(ALLOWED_METHODS),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static(ALLOWED_HEADERS),
    );
    headers.insert(
        header::ACCESS_CONTROL_MAX_AGE,
        HeaderValue::from_static(MAX_AGE_SECS),
    );
    headers.insert(header::VARY, HeaderValue::from_static("Origin"));
}
