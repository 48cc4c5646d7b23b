use crate::state::AppState;
use axum::{extract::State, http::header, response::IntoResponse};

/// Prometheus text exposition
pub async fn render_metrics(State(state): State<AppState>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}
