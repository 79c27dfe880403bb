use crate::config::ConfigStore;
use axum::http::{HeaderName, HeaderValue, Method};
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, Any, CorsLayer};
use tracing::warn;

fn is_wildcard(values: &[String]) -> bool {
    values.iter().any(|v| v == "*")
}

/// CORS policy from `security.cors_*`.
///
/// Browsers reject `*` together with credentials, so with credentials on a
/// wildcard is answered by mirroring the request instead.
pub fn cors_layer(config: &ConfigStore) -> CorsLayer {
    let origins = config.cors_origins();
    let methods = config.cors_methods();
    let headers = config.cors_headers();
    let credentials = config.cors_credentials();

    let allow_origin: AllowOrigin = match (is_wildcard(&origins), credentials) {
        (true, true) => AllowOrigin::mirror_request(),
        (true, false) => Any.into(),
        (false, _) => origins
            .iter()
            .filter_map(|o| match HeaderValue::from_str(o) {
                Ok(v) => Some(v),
                Err(_) => {
                    warn!("⚠️  Ignoring invalid CORS origin '{}'", o);
                    None
                }
            })
            .collect::<Vec<_>>()
            .into(),
    };

    let allow_methods: AllowMethods = match (is_wildcard(&methods), credentials) {
        (true, true) => AllowMethods::mirror_request(),
        (true, false) => Any.into(),
        (false, _) => methods
            .iter()
            .filter_map(|m| Method::from_bytes(m.to_uppercase().as_bytes()).ok())
            .collect::<Vec<_>>()
            .into(),
    };

    let allow_headers: AllowHeaders = match (is_wildcard(&headers), credentials) {
        (true, true) => AllowHeaders::mirror_request(),
        (true, false) => Any.into(),
        (false, _) => headers
            .iter()
            .filter_map(|h| HeaderName::from_bytes(h.as_bytes()).ok())
            .collect::<Vec<_>>()
            .into(),
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(allow_methods)
        .allow_headers(allow_headers)
        .allow_credentials(credentials)
}
