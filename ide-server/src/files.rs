//! Routes over the storage stub: users, files and sharing.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use ide_exec::{
    storage::{Collaborator, File, FileUpdate, NewFile, NewUser, ShareRequest, SharedFile, User},
    Error,
};
use tracing::info;

use crate::{AppState, ServerError};

pub(crate) fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/users", post(create_user))
        .route("/api/users/:id", get(get_user))
        .route("/api/users/:id/files", get(get_user_files))
        .route("/api/users/:id/shared-files", get(get_shared_files))
        .route("/api/files", post(create_file))
        .route(
            "/api/files/:id",
            get(get_file).patch(update_file).delete(delete_file),
        )
        .route(
            "/api/files/:id/collaborators",
            get(get_collaborators).post(share_file),
        )
}

fn not_found(what: &str, id: u64) -> ServerError {
    Error::NotFound(format!("{} {} not found", what, id)).into()
}

async fn create_user(
    State(state): State<AppState>,
    payload: Result<Json<NewUser>, JsonRejection>,
) -> Result<(StatusCode, Json<User>), ServerError> {
    let Json(user) = payload?;
    let user = state.storage().create_user(user).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<User>, ServerError> {
    state
        .storage()
        .get_user(id)
        .await?
        .map(Json)
        .ok_or_else(|| not_found("User", id))
}

async fn get_user_files(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<Vec<File>>, ServerError> {
    Ok(Json(state.storage().get_files_by_user_id(id).await?))
}

async fn get_shared_files(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<Vec<SharedFile>>, ServerError> {
    Ok(Json(state.storage().get_shared_files(id).await?))
}

async fn create_file(
    State(state): State<AppState>,
    payload: Result<Json<NewFile>, JsonRejection>,
) -> Result<(StatusCode, Json<File>), ServerError> {
    let Json(file) = payload?;
    let file = state.storage().create_file(file).await?;
    Ok((StatusCode::CREATED, Json(file)))
}

async fn get_file(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<File>, ServerError> {
    state
        .storage()
        .get_file(id)
        .await?
        .map(Json)
        .ok_or_else(|| not_found("File", id))
}

async fn update_file(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    payload: Result<Json<FileUpdate>, JsonRejection>,
) -> Result<Json<File>, ServerError> {
    let Json(update) = payload?;
    state
        .storage()
        .update_file(id, update)
        .await?
        .map(Json)
        .ok_or_else(|| not_found("File", id))
}

async fn delete_file(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<StatusCode, ServerError> {
    if state.storage().delete_file(id).await? {
        info!("Deleted file {}", id);
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(not_found("File", id))
    }
}

async fn share_file(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    payload: Result<Json<ShareRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Collaborator>), ServerError> {
    let Json(share) = payload?;
    let collaborator = state.storage().share_file(id, share).await?;
    info!(
        "Shared file {} with {} (added by {})",
        id, collaborator.email, collaborator.added_by
    );
    Ok((StatusCode::CREATED, Json(collaborator)))
}

async fn get_collaborators(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<Vec<Collaborator>>, ServerError> {
    Ok(Json(state.storage().get_collaborators(id).await?))
}
