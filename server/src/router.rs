use axum::extract::DefaultBodyLimit;
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderValue, Method};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use csvmark::Settings;

use crate::routes;
use crate::state::AppState;

/// Multipart framing overhead allowed on top of the file size cap.
const MULTIPART_SLACK: usize = 64 * 1024;

/// Build the application [`Router`] with body limit, CORS and tracing layers.
pub fn build_router(state: AppState) -> Router {
    let body_limit = usize::try_from(state.settings.max_file_size)
        .unwrap_or(usize::MAX)
        .saturating_add(MULTIPART_SLACK);
    let cors = build_cors_layer(&state.settings);

    Router::new()
        .nest("/api", routes::api_routes())
        .merge(routes::health::router())
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// CORS layer from `allowed_origins`. `*` allows any origin; entries that are
/// not valid header values are skipped.
pub fn build_cors_layer(settings: &Settings) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE]);

    if settings.allows_any_origin() {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = settings
        .allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(origin = %origin, error = %e, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    layer.allow_origin(origins)
}
