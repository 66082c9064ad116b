use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use ide_exec::{CodeExecutionService, ExecConfig, ExecutionRequest, ExecutionResult};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::{net::SocketAddr, sync::Arc};
use thiserror::Error;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info};

mod files;
mod settings;

pub use ide_exec::storage::{MemStorage, Storage};
pub use settings::{Settings, DEFAULT_PORT};

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("{0}")]
    BadRequest(String),
    #[error(transparent)]
    Exec(#[from] ide_exec::Error),
    #[error("Invalid configuration: {0}")]
    Config(String),
    #[error("Server error: {0}")]
    ServerError(String),
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        use ide_exec::Error as E;

        let (status, message) = match self {
            ServerError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            ServerError::Exec(E::EmptyCode) => (StatusCode::BAD_REQUEST, E::EmptyCode.to_string()),
            ServerError::Exec(E::InvalidInput(message)) => (StatusCode::BAD_REQUEST, message),
            ServerError::Exec(E::NotFound(message)) => (StatusCode::NOT_FOUND, message),
            ServerError::Exec(E::Conflict(message)) => (StatusCode::CONFLICT, message),
            ServerError::Exec(e @ E::ScriptMissing(_)) => {
                error!("Error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Failed to create Python script".to_string(),
                )
            }
            ServerError::Exec(e) => {
                error!("API execution error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Server error occurred during execution".to_string(),
                )
            }
            ServerError::Config(_) | ServerError::ServerError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        };

        (status, Json(json!({ "success": false, "error": message }))).into_response()
    }
}

impl From<JsonRejection> for ServerError {
    fn from(rejection: JsonRejection) -> Self {
        ServerError::BadRequest(rejection.body_text())
    }
}

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteRequest {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_id: Option<u64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ExecuteResponse {
    pub success: bool,
    pub output: String,
    pub error: Option<String>,
}

impl From<ExecutionResult> for ExecuteResponse {
    fn from(result: ExecutionResult) -> Self {
        Self {
            success: result.is_success(),
            output: result.stdout,
            error: result.error,
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    service: Arc<CodeExecutionService>,
}

impl AppState {
    pub(crate) fn storage(&self) -> &Arc<dyn Storage> {
        self.service.storage()
    }
}

pub fn create_app(config: ExecConfig, storage: Arc<dyn Storage>) -> Result<Router, ServerError> {
    let service = CodeExecutionService::new(config, storage)?;

    let state = AppState {
        service: Arc::new(service),
    };

    let cors = CorsLayer::permissive();

    let app = Router::new()
        .route("/health", get(health_check))
        .route("/api/execute", post(execute))
        .merge(files::routes())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state);

    Ok(app)
}

pub async fn run_server(app: Router, addr: SocketAddr) -> Result<(), ServerError> {
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| ServerError::ServerError(e.to_string()))?;
    serve(listener, app).await
}

pub async fn serve(listener: TcpListener, app: Router) -> Result<(), ServerError> {
    let addr = listener
        .local_addr()
        .map_err(|e| ServerError::ServerError(e.to_string()))?;
    info!("Starting cloud IDE server on {}", addr);

    axum::serve(listener, app)
        .await
        .map_err(|e| ServerError::ServerError(e.to_string()))?;

    Ok(())
}

async fn health_check() -> &'static str {
    "OK"
}

async fn execute(
    State(state): State<AppState>,
    payload: Result<Json<ExecuteRequest>, JsonRejection>,
) -> Result<Json<ExecuteResponse>, ServerError> {
    let Json(payload) = payload?;

    let request = ExecutionRequest {
        code: payload.code.unwrap_or_default(),
        user_id: payload.user_id,
        file_id: payload.file_id,
    };

    let result = state.service.execute(request).await?;

    Ok(Json(result.into()))
}
