use crate::error::AppResult;
use crate::setup::SetupRequest;
use crate::web::auth::RequireAuth;
use crate::web::extract::AppJson;
use crate::web::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::{delete, get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub firstrun: bool,
}

/// Health check endpoint
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        firstrun: state.config.is_first_run().await,
    })
}

/// Success envelope for account routes
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct CodeResponse {
    pub code: String,
}

impl CodeResponse {
    fn new(code: &str) -> Self {
        Self {
            code: code.to_string(),
        }
    }
}

/// POST /setup
pub async fn setup(
    State(state): State<AppState>,
    AppJson(request): AppJson<SetupRequest>,
) -> AppResult<Json<serde_json::Value>> {
    state.config.run_setup(&request).await?;
    Ok(Json(serde_json::json!({})))
}

/// GET /apikey
///
/// Plain-text setup key, only while first-run is pending.
pub async fn apikey(State(state): State<AppState>) -> AppResult<String> {
    let key = state.config.setup_key().await?;
    Ok(key.as_str().to_string())
}

/// Body of POST /user
#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

/// POST /user
pub async fn create_user(
    State(state): State<AppState>,
    AppJson(request): AppJson<CreateUserRequest>,
) -> AppResult<(StatusCode, Json<CodeResponse>)> {
    state
        .credentials
        .create_user(&request.username, &request.password)
        .await?;
    Ok((StatusCode::CREATED, Json(CodeResponse::new("USER_CREATED"))))
}

/// DELETE /user/{username}/
pub async fn delete_user(
    RequireAuth(token): RequireAuth,
    Path(username): Path<String>,
    State(state): State<AppState>,
) -> AppResult<Json<CodeResponse>> {
    state.credentials.delete_user(&username, &token).await?;
    Ok(Json(CodeResponse::new("USER_DELETED")))
}

/// Create the router
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    info!("Registering setup and user routes");

    Router::new()
        .route("/health", get(health))
        .route("/setup", post(setup))
        .route("/apikey", get(apikey))
        .route("/user", post(create_user))
        .route("/user/{username}", delete(delete_user))
        .route("/user/{username}/", delete(delete_user))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
