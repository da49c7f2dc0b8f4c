//! HTTP request handlers

use super::types::{ErrorResponse, PromptRequest, PromptResponse};
use super::AppState;
use crate::state::NeuroState;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tokio_util::sync::CancellationToken;

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/state", get(get_state))
        .route("/prompt", post(send_prompt))
        .route("/version", get(get_version))
        .with_state(state)
}

/// Current in-memory neuron state
async fn get_state(State(state): State<AppState>) -> Json<NeuroState> {
    Json(state.manager.state())
}

/// Run one conversation turn
async fn send_prompt(
    State(state): State<AppState>,
    Json(req): Json<PromptRequest>,
) -> Result<Json<PromptResponse>, AppError> {
    if req.prompt.trim().is_empty() {
        return Err(AppError::BadRequest("prompt must not be empty".to_string()));
    }

    // The token follows the request lifetime: dropping this handler's
    // future (client gone) cancels the in-flight model call.
    let cancel = CancellationToken::new();
    let _guard = cancel.clone().drop_guard();

    let human_message = state
        .manager
        .ask(&req.prompt, &cancel)
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok(Json(PromptResponse { human_message }))
}

async fn get_version() -> &'static str {
    concat!("nema ", env!("CARGO_PKG_VERSION"))
}

// ============================================================
// Error Handling
// ============================================================

enum AppError {
    BadRequest(String),
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(ErrorResponse::new(message));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Store;
    use crate::llm::StubClient;
    use crate::manager::ConversationManager;
    use axum::body::Body;
    use axum::http::Request;
    use std::sync::Arc;
    use tower::ServiceExt;

    fn test_app() -> (Router, Arc<StubClient>) {
        let stub = Arc::new(StubClient::new("stub"));
        let manager = ConversationManager::new(
            Store::open_in_memory().unwrap(),
            stub.clone(),
            "state: {state}",
        )
        .unwrap();
        (create_router(AppState::new(manager)), stub)
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_get_state() {
        let (app, _) = test_app();

        let response = app
            .oneshot(Request::get("/state").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["state_count"], 0);
        assert_eq!(json["motor_neurons"]["AVA"], 0);
        assert_eq!(json["sensory_neurons"]["ASE"], 0);
        assert!(json["updated_at"].is_string());
    }

    #[tokio::test]
    async fn test_send_prompt() {
        let (app, stub) = test_app();
        stub.queue_response(
            r#"{"human_message":"Moving forward.","motor_neurons":[{"neuron":"AVA","value":5}],"sensory_neurons":[],"changed":true}"#,
        );

        let response = app
            .oneshot(
                Request::post("/prompt")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"prompt":"move forward"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["human_message"], "Moving forward.");
    }

    #[tokio::test]
    async fn test_failed_turn_is_an_internal_error() {
        let (app, stub) = test_app();
        stub.queue_response("not json at all");

        let response = app
            .oneshot(
                Request::post("/prompt")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"prompt":"hi"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = body_json(response).await;
        assert!(json["error"].is_string());
    }

    #[tokio::test]
    async fn test_empty_prompt_is_a_bad_request() {
        let (app, _) = test_app();

        let response = app
            .oneshot(
                Request::post("/prompt")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"prompt":"  "}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_malformed_body_is_a_client_error() {
        let (app, _) = test_app();

        let response = app
            .oneshot(
                Request::post("/prompt")
                    .header("content-type", "application/json")
                    .body(Body::from("{"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert!(response.status().is_client_error());
    }
}
