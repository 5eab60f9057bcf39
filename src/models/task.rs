//! # Task Model
//!
//! Task entity plus the create/update payloads the web layer binds to.
//! Validation rules live here so handlers and tests share one source of truth.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

pub const MIN_DIFFICULTY: i32 = 1;
pub const MAX_DIFFICULTY: i32 = 5;

/// Task lifecycle status, stored as text in the `tasks` table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Todo,
    InProgress,
    Done,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Todo => "todo",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Done => "done",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("unknown task status: {0}")]
pub struct TaskStatusParseError(String);

impl TryFrom<String> for TaskStatus {
    type Error = TaskStatusParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "todo" => Ok(TaskStatus::Todo),
            "in_progress" => Ok(TaskStatus::InProgress),
            "done" => Ok(TaskStatus::Done),
            other => Err(TaskStatusParseError(other.to_string())),
        }
    }
}

/// Task represents a unit of work owned by a project.
/// Maps to the `tasks` table. The assignee is an opaque identifier from the
/// external user service; no referential integrity is enforced locally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Task {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub difficulty: i32,
    #[sqlx(try_from = "String")]
    pub status: TaskStatus,
    pub due_date: Option<NaiveDate>,
    pub assignee_id: Option<String>,
    pub project_id: Uuid,
    pub created_at: NaiveDateTime,
}

/// Task joined with its owning project's display fields
#[derive(Debug, Clone, FromRow)]
pub struct TaskWithProject {
    #[sqlx(flatten)]
    pub task: Task,
    pub project_name: String,
    pub project_description: Option<String>,
}

/// New Task for creation (without generated fields)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTask {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub difficulty: i32,
    #[serde(default)]
    pub status: Option<TaskStatus>,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub assignee_id: Option<String>,
    pub project_id: Uuid,
}

/// Field-level validation failure, surfaced to HTTP callers as a 400
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationFailure {
    pub field: &'static str,
    pub message: String,
}

pub fn validate_difficulty(value: i32) -> Result<(), ValidationFailure> {
    if (MIN_DIFFICULTY..=MAX_DIFFICULTY).contains(&value) {
        Ok(())
    } else {
        Err(ValidationFailure {
            field: "difficulty",
            message: format!(
                "Difficulty must be between {MIN_DIFFICULTY} and {MAX_DIFFICULTY}"
            ),
        })
    }
}

impl NewTask {
    pub fn validate(&self) -> Result<(), ValidationFailure> {
        if self.title.trim().is_empty() {
            return Err(ValidationFailure {
                field: "title",
                message: "Title cannot be empty".to_string(),
            });
        }
        validate_difficulty(self.difficulty)
    }
}

/// Partial update payload for PATCH requests.
/// Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskChanges {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub difficulty: Option<i32>,
    #[serde(default)]
    pub status: Option<TaskStatus>,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub assignee_id: Option<String>,
    #[serde(default)]
    pub project_id: Option<Uuid>,
}

impl TaskChanges {
    /// First non-status field this payload would actually change, if any.
    ///
    /// Regular-role callers may only change the status; the whole request is
    /// rejected when this returns `Some`.
    pub fn restricted_field_changed(&self, existing: &Task) -> Option<&'static str> {
        if self.title.as_ref().is_some_and(|t| *t != existing.title) {
            return Some("title");
        }
        if self
            .description
            .as_ref()
            .is_some_and(|d| Some(d) != existing.description.as_ref())
        {
            return Some("description");
        }
        if self.difficulty.is_some_and(|d| d != existing.difficulty) {
            return Some("difficulty");
        }
        if self.due_date.is_some_and(|d| Some(d) != existing.due_date) {
            return Some("due_date");
        }
        if self
            .assignee_id
            .as_ref()
            .is_some_and(|a| Some(a) != existing.assignee_id.as_ref())
        {
            return Some("assignee_id");
        }
        if self.project_id.is_some_and(|p| p != existing.project_id) {
            return Some("project_id");
        }
        None
    }
}

const TASK_COLUMNS: &str =
    "id, title, description, difficulty, status, due_date, assignee_id, project_id, created_at";

impl Task {
    /// Create a new task
    pub async fn create(pool: &PgPool, new_task: NewTask) -> Result<Task, sqlx::Error> {
        let status = new_task.status.unwrap_or(TaskStatus::Todo);
        sqlx::query_as::<_, Task>(&format!(
            r#"
            INSERT INTO tasks (id, title, description, difficulty, status, due_date, assignee_id, project_id, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, NOW())
            RETURNING {TASK_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(&new_task.title)
        .bind(&new_task.description)
        .bind(new_task.difficulty)
        .bind(status.as_str())
        .bind(new_task.due_date)
        .bind(&new_task.assignee_id)
        .bind(new_task.project_id)
        .fetch_one(pool)
        .await
    }

    /// Find a task by ID
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Task>, sqlx::Error> {
        sqlx::query_as::<_, Task>(&format!(
            r#"
            SELECT {TASK_COLUMNS}
            FROM tasks
            WHERE id = $1
            "#
        ))
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// Find a task with its owning project's display fields
    pub async fn find_with_project(
        pool: &PgPool,
        id: Uuid,
    ) -> Result<Option<TaskWithProject>, sqlx::Error> {
        sqlx::query_as::<_, TaskWithProject>(
            r#"
            SELECT t.id, t.title, t.description, t.difficulty, t.status, t.due_date,
                   t.assignee_id, t.project_id, t.created_at,
                   p.name AS project_name, p.description AS project_description
            FROM tasks t
            JOIN projects p ON p.id = t.project_id
            WHERE t.id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// List all tasks with project details, newest first
    pub async fn list_all(pool: &PgPool) -> Result<Vec<TaskWithProject>, sqlx::Error> {
        sqlx::query_as::<_, TaskWithProject>(
            r#"
            SELECT t.id, t.title, t.description, t.difficulty, t.status, t.due_date,
                   t.assignee_id, t.project_id, t.created_at,
                   p.name AS project_name, p.description AS project_description
            FROM tasks t
            JOIN projects p ON p.id = t.project_id
            ORDER BY t.created_at DESC
            "#,
        )
        .fetch_all(pool)
        .await
    }

    /// List tasks assigned to a given external user id, newest first
    pub async fn list_by_assignee(
        pool: &PgPool,
        assignee_id: &str,
    ) -> Result<Vec<TaskWithProject>, sqlx::Error> {
        sqlx::query_as::<_, TaskWithProject>(
            r#"
            SELECT t.id, t.title, t.description, t.difficulty, t.status, t.due_date,
                   t.assignee_id, t.project_id, t.created_at,
                   p.name AS project_name, p.description AS project_description
            FROM tasks t
            JOIN projects p ON p.id = t.project_id
            WHERE t.assignee_id = $1
            ORDER BY t.created_at DESC
            "#,
        )
        .bind(assignee_id)
        .fetch_all(pool)
        .await
    }

    /// Apply a partial update, leaving absent fields untouched
    pub async fn apply_changes(
        pool: &PgPool,
        id: Uuid,
        changes: &TaskChanges,
    ) -> Result<Task, sqlx::Error> {
        sqlx::query_as::<_, Task>(&format!(
            r#"
            UPDATE tasks
            SET
                title = COALESCE($2, title),
                description = COALESCE($3, description),
                difficulty = COALESCE($4, difficulty),
                status = COALESCE($5, status),
                due_date = COALESCE($6, due_date),
                assignee_id = COALESCE($7, assignee_id),
                project_id = COALESCE($8, project_id)
            WHERE id = $1
            RETURNING {TASK_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(&changes.title)
        .bind(&changes.description)
        .bind(changes.difficulty)
        .bind(changes.status.map(|s| s.as_str()))
        .bind(changes.due_date)
        .bind(&changes.assignee_id)
        .bind(changes.project_id)
        .fetch_one(pool)
        .await
    }

    /// Delete a task; returns whether a row was removed
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            DELETE FROM tasks
            WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
