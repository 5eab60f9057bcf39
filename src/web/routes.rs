//! # Route Definitions

use axum::routing::{delete, get, patch, post};
use axum::Router;

use crate::web::handlers::{health, projects, tasks};
use crate::web::state::AppState;

/// Versioned API routes, nested under /v1 by the app builder
pub fn api_v1_routes() -> Router<AppState> {
    Router::new()
        .route("/projects", get(projects::list_projects))
        .route("/projects", post(projects::create_project))
        .route("/tasks", post(tasks::create_task))
        .route("/tasks", get(tasks::list_tasks))
        // Static segment wins over the :id capture below.
        .route("/tasks/current-user", get(tasks::current_user_tasks))
        .route("/tasks/:id", get(tasks::get_task))
        .route("/tasks/:id", patch(tasks::update_task))
        .route("/tasks/:id", delete(tasks::delete_task))
        .route("/users/:user_id/tasks", get(tasks::tasks_by_user))
}

/// Unversioned operational routes
pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health::health))
}
