use axum::{
    extract::State,
    http::StatusCode,
    routing::get,
    Form, Json, Router,
};
use tracing::{info, instrument};

use crate::{
    auth::session::AuthUser,
    error::ApiError,
    projects::{
        dto::{CreateProjectRequest, CreatedProjectResponse, ProjectResponse},
        repo::Project,
    },
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/projects", get(list_projects).post(create_project))
}

#[instrument(skip(state))]
async fn list_projects(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<Vec<ProjectResponse>>, ApiError> {
    let projects = Project::list_for_user(&state.db, user_id).await?;
    Ok(Json(projects.into_iter().map(ProjectResponse::from).collect()))
}

#[instrument(skip(state, payload))]
async fn create_project(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Form(payload): Form<CreateProjectRequest>,
) -> Result<(StatusCode, Json<CreatedProjectResponse>), ApiError> {
    let form = payload.validate().map_err(ApiError::Validation)?;
    let project = Project::create(&state.db, user_id, &form).await?;
    info!(project_id = %project.id, %user_id, "project created");
    Ok((
        StatusCode::CREATED,
        Json(CreatedProjectResponse {
            project_id: project.id,
        }),
    ))
}
