//! # Task Handlers
//!
//! CRUD endpoints for tasks. Every mutation hands off to the notification
//! dispatcher after committing; notification failures never fail the request.

use axum::extract::{Path, State};
use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::identity::IdentityError;
use crate::models::{
    validate_difficulty, NewTask, Project, Task, TaskChanges, TaskStatus, TaskWithProject,
};
use crate::notifications::{DeletedTask, Initiator, TaskSnapshot};
use crate::web::response_types::{ApiError, ApiResult};
use crate::web::state::AppState;

/// Task detail as exposed over the API, with the joined project fields
#[derive(Debug, Serialize)]
pub struct TaskResponse {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub difficulty: i32,
    pub status: TaskStatus,
    pub due_date: Option<NaiveDate>,
    pub assignee_id: Option<String>,
    pub project_id: Uuid,
    pub created_at: NaiveDateTime,
    pub project_name: Option<String>,
    pub project_description: Option<String>,
}

impl From<TaskWithProject> for TaskResponse {
    fn from(row: TaskWithProject) -> Self {
        Self {
            id: row.task.id,
            title: row.task.title,
            description: row.task.description,
            difficulty: row.task.difficulty,
            status: row.task.status,
            due_date: row.task.due_date,
            assignee_id: row.task.assignee_id,
            project_id: row.task.project_id,
            created_at: row.task.created_at,
            project_name: Some(row.project_name),
            project_description: row.project_description,
        }
    }
}

impl From<Task> for TaskResponse {
    fn from(task: Task) -> Self {
        Self {
            id: task.id,
            title: task.title,
            description: task.description,
            difficulty: task.difficulty,
            status: task.status,
            due_date: task.due_date,
            assignee_id: task.assignee_id,
            project_id: task.project_id,
            created_at: task.created_at,
            project_name: None,
            project_description: None,
        }
    }
}

fn auth_header(headers: &HeaderMap) -> Option<&str> {
    headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok())
}

fn map_identity_error(e: IdentityError) -> ApiError {
    match e {
        IdentityError::MissingAuth => ApiError::Unauthorized,
        IdentityError::Status { status: 401, .. } | IdentityError::Status { status: 403, .. } => {
            ApiError::Unauthorized
        }
        other => {
            warn!(error = %other, "Caller identity resolution failed");
            ApiError::Unauthorized
        }
    }
}

/// POST /v1/tasks
pub async fn create_task(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(new_task): Json<NewTask>,
) -> ApiResult<(StatusCode, Json<TaskResponse>)> {
    new_task
        .validate()
        .map_err(|f| ApiError::validation(f.field, f.message))?;

    // The assignee must resolve at creation time; an unreachable user
    // service rejects the request the same as an unknown id.
    if let Some(assignee_id) = &new_task.assignee_id {
        match state.identity.get_user(assignee_id, auth_header(&headers)).await {
            Ok(_) => {}
            Err(IdentityError::Status { status: 404, .. }) => {
                return Err(ApiError::validation("assignee_id", "Unknown assignee"));
            }
            Err(e) => {
                warn!(assignee_id = %assignee_id, error = %e, "Assignee resolution failed");
                return Err(ApiError::validation(
                    "assignee_id",
                    "Assignee could not be verified",
                ));
            }
        }
    }

    if !Project::exists(&state.db_pool, new_task.project_id).await? {
        return Err(ApiError::validation("project_id", "Unknown project"));
    }

    let task = Task::create(&state.db_pool, new_task).await?;
    info!(task_id = %task.id, title = %task.title, "Task created");

    let project_name = Project::find_by_id(&state.db_pool, task.project_id)
        .await?
        .map(|p| p.name);

    state
        .dispatcher
        .task_created(&task, project_name.as_deref(), auth_header(&headers))
        .await;

    Ok((StatusCode::CREATED, Json(task.into())))
}

/// GET /v1/tasks
pub async fn list_tasks(State(state): State<AppState>) -> ApiResult<Json<Vec<TaskResponse>>> {
    let tasks = Task::list_all(&state.db_pool).await?;
    Ok(Json(tasks.into_iter().map(TaskResponse::from).collect()))
}

/// GET /v1/tasks/:id
pub async fn get_task(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<TaskResponse>> {
    let task = Task::find_with_project(&state.db_pool, id)
        .await?
        .ok_or(ApiError::NotFound)?;
    Ok(Json(task.into()))
}

/// PATCH /v1/tasks/:id
///
/// Requires a resolvable caller. Regular-role callers may only change the
/// status; any other effective change rejects the whole request.
pub async fn update_task(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
    Json(changes): Json<TaskChanges>,
) -> ApiResult<Json<TaskResponse>> {
    let auth = auth_header(&headers);
    let current_user = state
        .identity
        .get_current_user(auth)
        .await
        .map_err(map_identity_error)?;

    let existing = Task::find_by_id(&state.db_pool, id)
        .await?
        .ok_or(ApiError::NotFound)?;

    if let Some(difficulty) = changes.difficulty {
        validate_difficulty(difficulty).map_err(|f| ApiError::validation(f.field, f.message))?;
    }
    if let Some(title) = &changes.title {
        if title.trim().is_empty() {
            return Err(ApiError::validation("title", "Title cannot be empty"));
        }
    }
    if let Some(project_id) = changes.project_id {
        if !Project::exists(&state.db_pool, project_id).await? {
            return Err(ApiError::validation("project_id", "Unknown project"));
        }
    }

    if current_user.is_regular() {
        if let Some(field) = changes.restricted_field_changed(&existing) {
            return Err(ApiError::authorization_error(format!(
                "Role USER may only change the status, not {field}"
            )));
        }
    }

    let before = TaskSnapshot::of(&existing);
    let updated = Task::apply_changes(&state.db_pool, id, &changes).await?;
    info!(task_id = %updated.id, "Task updated");

    let project_name = Project::find_by_id(&state.db_pool, updated.project_id)
        .await?
        .map(|p| p.name);

    let initiator = Initiator::from_user(&current_user);
    state
        .dispatcher
        .task_updated(&before, &updated, project_name.as_deref(), &initiator, auth)
        .await;

    Ok(Json(updated.into()))
}

/// DELETE /v1/tasks/:id
///
/// Requires an administrator caller. Task data and recipients are captured
/// before the row is removed so the deletion event can still name them.
pub async fn delete_task(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
) -> ApiResult<StatusCode> {
    let auth = auth_header(&headers);
    let current_user = state
        .identity
        .get_current_user(auth)
        .await
        .map_err(map_identity_error)?;

    if current_user.is_regular() {
        return Err(ApiError::authorization_error(
            "Role USER may not delete tasks",
        ));
    }

    let existing = Task::find_by_id(&state.db_pool, id)
        .await?
        .ok_or(ApiError::NotFound)?;

    let recipients = state
        .dispatcher
        .gather_recipients(existing.assignee_id.as_deref(), true, auth)
        .await;

    let deleted = DeletedTask {
        id: existing.id,
        title: existing.title.clone(),
        assignee_id: existing.assignee_id.clone(),
        project_id: Some(existing.project_id),
        deleted_by: Some(current_user.id.clone()),
        deleted_by_name: current_user.display_name.clone(),
    };

    if !Task::delete(&state.db_pool, id).await? {
        return Err(ApiError::NotFound);
    }
    info!(task_id = %id, deleted_by = %current_user.id, "Task deleted");

    state.dispatcher.task_deleted(&deleted, &recipients).await;

    Ok(StatusCode::NO_CONTENT)
}

/// GET /v1/tasks/current-user
pub async fn current_user_tasks(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<Vec<TaskResponse>>> {
    let current_user = state
        .identity
        .get_current_user(auth_header(&headers))
        .await
        .map_err(map_identity_error)?;

    let tasks = Task::list_by_assignee(&state.db_pool, &current_user.id).await?;
    Ok(Json(tasks.into_iter().map(TaskResponse::from).collect()))
}

/// GET /v1/users/:user_id/tasks
pub async fn tasks_by_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<Json<Vec<TaskResponse>>> {
    let tasks = Task::list_by_assignee(&state.db_pool, &user_id).await?;
    Ok(Json(tasks.into_iter().map(TaskResponse::from).collect()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TaskboardConfig;
    use crate::identity::{UserIdentityService, UserRecord};
    use crate::notifications::{EventPublisher, FallbackMailer, NotificationDispatcher, NotificationEvent};
    use async_trait::async_trait;
    use std::sync::Arc;

    struct SilentPublisher;

    #[async_trait]
    impl EventPublisher for SilentPublisher {
        async fn publish(&self, _routing_key: &str, _event: &NotificationEvent) -> bool {
            true
        }

        fn provider_name(&self) -> &str {
            "silent"
        }
    }

    struct SilentMailer;

    #[async_trait]
    impl FallbackMailer for SilentMailer {
        async fn send_fallback(&self, _event: &NotificationEvent) {}
    }

    /// Identity stub: `get_user` always fails, the caller resolves with a
    /// configurable role.
    struct RoleIdentity {
        role: &'static str,
    }

    #[async_trait]
    impl UserIdentityService for RoleIdentity {
        async fn get_user(
            &self,
            _user_id: &str,
            _auth: Option<&str>,
        ) -> Result<UserRecord, IdentityError> {
            Err(IdentityError::Transport("connection refused".to_string()))
        }

        async fn list_admins(&self, _auth: Option<&str>) -> Result<Vec<UserRecord>, IdentityError> {
            Ok(Vec::new())
        }

        async fn get_current_user(
            &self,
            _auth: Option<&str>,
        ) -> Result<UserRecord, IdentityError> {
            Ok(UserRecord {
                id: "9".to_string(),
                username: Some("carol".to_string()),
                display_name: Some("Carol".to_string()),
                email: Some("carol@example.com".to_string()),
                role: Some(self.role.to_string()),
            })
        }
    }

    /// State over a lazy pool that has no server behind it; any handler path
    /// that touches the database comes back as a database error, so these
    /// tests prove their rejections happen before any mutation.
    fn state_with_role(role: &'static str) -> AppState {
        let identity: Arc<dyn UserIdentityService> = Arc::new(RoleIdentity { role });
        let dispatcher = Arc::new(NotificationDispatcher::new(
            Arc::new(SilentPublisher),
            Arc::new(SilentMailer),
            identity.clone(),
        ));
        let db_pool = sqlx::PgPool::connect_lazy("postgresql://127.0.0.1:1/unreachable")
            .expect("lazy pool construction is offline");

        AppState {
            config: Arc::new(TaskboardConfig::default()),
            db_pool,
            identity,
            dispatcher,
        }
    }

    #[tokio::test]
    async fn test_regular_role_deletion_rejected_before_any_mutation() {
        let state = state_with_role("USER");
        let id = Uuid::new_v4();

        // Repeated attempts reject identically; a database error here would
        // mean the handler reached the pool.
        for _ in 0..2 {
            let result =
                delete_task(State(state.clone()), Path(id), HeaderMap::new()).await;
            assert!(matches!(
                result,
                Err(ApiError::AuthorizationError { .. })
            ));
        }
    }

    #[tokio::test]
    async fn test_unverifiable_assignee_rejects_creation() {
        let state = state_with_role("ADMIN");
        let new_task = NewTask {
            title: "Write report".to_string(),
            description: None,
            difficulty: 3,
            status: None,
            due_date: None,
            assignee_id: Some("42".to_string()),
            project_id: Uuid::new_v4(),
        };

        let result = create_task(State(state), HeaderMap::new(), Json(new_task)).await;
        assert!(matches!(
            result,
            Err(ApiError::Validation { ref field, .. }) if field == "assignee_id"
        ));
    }
}
