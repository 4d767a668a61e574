use actix_cors::Cors;
use tracing::debug;

/// Build the CORS middleware for the browser dashboard
///
/// An empty list, or one containing `*`, allows any origin. Every method and
/// header is allowed; credentials are not.
pub fn build_cors(allowed_origins: &[String]) -> Cors {
    let mut cors = Cors::default()
        .allow_any_method()
        .allow_any_header()
        .max_age(3600);

    if allowed_origins.is_empty() || allowed_origins.iter().any(|origin| origin == "*") {
        cors = cors.allow_any_origin();
        debug!("CORS: Allowing any origin");
    } else {
        for origin in allowed_origins {
            cors = cors.allowed_origin(origin);
        }
        debug!("CORS: Allowed origins: {:?}", allowed_origins);
    }

    cors
}
