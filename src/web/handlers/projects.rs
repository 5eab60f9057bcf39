//! # Project Handlers

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use tracing::info;

use crate::models::{NewProject, Project};
use crate::web::response_types::{ApiError, ApiResult};
use crate::web::state::AppState;

/// GET /v1/projects
pub async fn list_projects(State(state): State<AppState>) -> ApiResult<Json<Vec<Project>>> {
    let projects = Project::list_all(&state.db_pool).await?;
    Ok(Json(projects))
}

/// POST /v1/projects
pub async fn create_project(
    State(state): State<AppState>,
    Json(new_project): Json<NewProject>,
) -> ApiResult<(StatusCode, Json<Project>)> {
    if new_project.name.trim().is_empty() {
        return Err(ApiError::validation("name", "Name cannot be empty"));
    }

    let project = Project::create(&state.db_pool, new_project).await?;
    info!(project_id = %project.id, name = %project.name, "Project created");

    Ok((StatusCode::CREATED, Json(project)))
}
