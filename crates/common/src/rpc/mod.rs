//! Helpers shared by the HTTP servers of the workspace
use hyper::Method;
use tower_http::cors::{Any, CorsLayer};

/// Returns cors layer to be used as http middleware
pub fn get_cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_origin(Any)
        .allow_headers(Any)
}

/// Builds the full path of an endpoint, `<prefix>/<version>/<endpoint>`.
///
/// The operator supplied prefix may be empty and may carry leading or trailing slashes.
pub fn endpoint_path(prefix: &str, version: &str, endpoint: &str) -> String {
    let prefix = prefix.trim_matches('/');
    if prefix.is_empty() {
        format!("/{version}/{endpoint}")
    } else {
        format!("/{prefix}/{version}/{endpoint}")
    }
}
