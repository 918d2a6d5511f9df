use axum::extract::DefaultBodyLimit;
use axum::routing::post;
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::server::handlers::import_feed;
use crate::server::state::AppState;

pub fn app_router(state: AppState) -> Router {
    Router::new()
        .route("/importar-xml", post(import_feed))
        .layer(DefaultBodyLimit::max(state.max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
