use super::{error_response, request_id};
use crate::{services::auth::issue_demo_token, state::AppState};
use axum::{
    extract::State,
    http::HeaderMap,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Issues a seven day demo JWT
pub async fn create_demo_token(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let request_id = request_id(&headers);
    match issue_demo_token(&state.config().jwt_secret, chrono::Utc::now()) {
        Ok(token) => {
            tracing::info!("Issued demo token for {}", token.user.id);
            Json(json!({
                "success": true,
                "token": token.token,
                "user": token.user,
                "expiresIn": token.expires_in,
                "requestId": request_id,
            }))
            .into_response()
        }
        Err(err) => error_response(err, &request_id),
    }
}
