//! # Event Payload Builder
//!
//! Pure construction of [`NotificationEvent`] payloads from task state and a
//! change context. No I/O happens here and nothing can fail: missing data
//! degrades to sentinel strings, never to an error.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Task, TaskStatus};

/// Display-name sentinel for an unresolvable or absent user
pub const UNKNOWN_USER: &str = "unknown";
/// Value sentinel for an absent due date or project name
pub const UNSPECIFIED: &str = "unspecified";

/// Task lifecycle event kinds, each with a stable routing key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    TaskCreated,
    TaskUpdated,
    StatusChanged,
    TaskDeleted,
}

impl EventKind {
    /// Routing key for topic-based subscriber filtering
    pub fn routing_key(&self) -> &'static str {
        match self {
            EventKind::TaskCreated => "task.created",
            EventKind::TaskUpdated => "task.updated",
            EventKind::StatusChanged => "task.status_changed",
            EventKind::TaskDeleted => "task.deleted",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    #[default]
    Normal,
    High,
}

/// Identity of the user who triggered the mutation, best-effort resolved
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Initiator {
    pub id: Option<String>,
    pub name: Option<String>,
}

impl Initiator {
    pub fn from_user(user: &crate::identity::UserRecord) -> Self {
        Self {
            id: Some(user.id.clone()),
            name: user.display_name.clone(),
        }
    }

    fn name_or_unknown(&self) -> &str {
        self.name.as_deref().unwrap_or(UNKNOWN_USER)
    }
}

/// Pre-fetched recipient identities, gathered by the dispatcher before the
/// builder runs so that building stays pure
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecipientInfo {
    pub assignee_display_name: Option<String>,
    pub assignee_email: Option<String>,
    pub admin_emails: Vec<String>,
}

impl RecipientInfo {
    fn assignee_name_or_unknown(&self) -> &str {
        self.assignee_display_name.as_deref().unwrap_or(UNKNOWN_USER)
    }
}

/// Task data captured before a delete commits, for the deletion event
#[derive(Debug, Clone, PartialEq)]
pub struct DeletedTask {
    pub id: Uuid,
    pub title: String,
    pub assignee_id: Option<String>,
    pub project_id: Option<Uuid>,
    pub deleted_by: Option<String>,
    pub deleted_by_name: Option<String>,
}

/// Transient notification payload, consumed by exactly one publish attempt
/// (and at most one fallback email) then discarded
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationEvent {
    pub event_type: EventKind,
    pub subject: String,
    pub content: String,
    /// De-duplicated, order-preserving recipient email list
    pub recipients: Vec<String>,
    pub send_email: bool,
    #[serde(default)]
    pub priority: Priority,
    pub task_id: Uuid,
    pub task_title: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub due_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub assigned_to: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub assigned_to_email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub project_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub old_status: Option<TaskStatus>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub new_status: Option<TaskStatus>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub initiator_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub initiator_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub deleted_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub deleted_by_name: Option<String>,
}

impl NotificationEvent {
    /// Build a task-created event addressed to the assignee
    pub fn task_created(
        task: &Task,
        project_name: Option<&str>,
        recipients: &RecipientInfo,
        initiator: &Initiator,
    ) -> Self {
        let content = format!(
            "New task created: {}\n\
             Description: {}\n\
             Due date: {}\n\
             Assigned to: {}\n\
             Project: {}",
            task.title,
            value_or_unspecified(task.description.as_deref()),
            date_or_unspecified(task.due_date),
            recipients.assignee_name_or_unknown(),
            value_or_unspecified(project_name),
        );

        let recipient_list = dedup_recipients(recipients.assignee_email.as_deref(), &[]);

        Self {
            event_type: EventKind::TaskCreated,
            subject: format!("New task: {}", task.title),
            content,
            send_email: !recipient_list.is_empty(),
            recipients: recipient_list,
            priority: Priority::Normal,
            task_id: task.id,
            task_title: task.title.clone(),
            description: task.description.clone(),
            due_date: task.due_date,
            assigned_to: task.assignee_id.clone(),
            assigned_to_email: recipients.assignee_email.clone(),
            project_id: Some(task.project_id),
            old_status: None,
            new_status: None,
            initiator_id: initiator.id.clone(),
            initiator_name: initiator.name.clone(),
            deleted_by: None,
            deleted_by_name: None,
        }
    }

    /// Build a task-updated event addressed to the assignee plus administrators
    pub fn task_updated(
        task: &Task,
        project_name: Option<&str>,
        recipients: &RecipientInfo,
        initiator: &Initiator,
    ) -> Self {
        let content = format!(
            "Task updated: {}\n\
             Description: {}\n\
             Due date: {}\n\
             Difficulty: {}\n\
             Assigned to: {}\n\
             Project: {}\n\
             Updated by: {}",
            task.title,
            value_or_unspecified(task.description.as_deref()),
            date_or_unspecified(task.due_date),
            task.difficulty,
            recipients.assignee_name_or_unknown(),
            value_or_unspecified(project_name),
            initiator.name_or_unknown(),
        );

        let recipient_list = dedup_recipients(
            recipients.assignee_email.as_deref(),
            &recipients.admin_emails,
        );

        Self {
            event_type: EventKind::TaskUpdated,
            subject: format!("Task updated: {}", task.title),
            content,
            send_email: !recipient_list.is_empty(),
            recipients: recipient_list,
            priority: Priority::Normal,
            task_id: task.id,
            task_title: task.title.clone(),
            description: task.description.clone(),
            due_date: task.due_date,
            assigned_to: task.assignee_id.clone(),
            assigned_to_email: recipients.assignee_email.clone(),
            project_id: Some(task.project_id),
            old_status: None,
            new_status: None,
            initiator_id: initiator.id.clone(),
            initiator_name: initiator.name.clone(),
            deleted_by: None,
            deleted_by_name: None,
        }
    }

    /// Build a high-priority status-change event with explicit old/new values
    pub fn status_changed(
        task: &Task,
        project_name: Option<&str>,
        old_status: TaskStatus,
        new_status: TaskStatus,
        recipients: &RecipientInfo,
        initiator: &Initiator,
    ) -> Self {
        let content = format!(
            "Status change for task: {}\n\
             From: {}\n\
             To: {}\n\
             Assigned to: {}\n\
             Project: {}\n\
             Initiated by: {}",
            task.title,
            old_status,
            new_status,
            recipients.assignee_name_or_unknown(),
            value_or_unspecified(project_name),
            initiator.name_or_unknown(),
        );

        let recipient_list = dedup_recipients(
            recipients.assignee_email.as_deref(),
            &recipients.admin_emails,
        );

        Self {
            event_type: EventKind::StatusChanged,
            subject: format!("Status change: {}", task.title),
            content,
            send_email: !recipient_list.is_empty(),
            recipients: recipient_list,
            priority: Priority::High,
            task_id: task.id,
            task_title: task.title.clone(),
            description: task.description.clone(),
            due_date: task.due_date,
            assigned_to: task.assignee_id.clone(),
            assigned_to_email: recipients.assignee_email.clone(),
            project_id: Some(task.project_id),
            old_status: Some(old_status),
            new_status: Some(new_status),
            initiator_id: initiator.id.clone(),
            initiator_name: initiator.name.clone(),
            deleted_by: None,
            deleted_by_name: None,
        }
    }

    /// Build a high-priority deletion event from data captured pre-delete
    pub fn task_deleted(deleted: &DeletedTask, recipients: &RecipientInfo) -> Self {
        let content = format!(
            "Task deleted: {}\n\
             Deleted by: {}",
            deleted.title,
            deleted.deleted_by_name.as_deref().unwrap_or(UNKNOWN_USER),
        );

        let recipient_list = dedup_recipients(
            recipients.assignee_email.as_deref(),
            &recipients.admin_emails,
        );

        Self {
            event_type: EventKind::TaskDeleted,
            subject: format!("Task deleted: {}", deleted.title),
            content,
            send_email: !recipient_list.is_empty(),
            recipients: recipient_list,
            priority: Priority::High,
            task_id: deleted.id,
            task_title: deleted.title.clone(),
            description: None,
            due_date: None,
            assigned_to: deleted.assignee_id.clone(),
            assigned_to_email: recipients.assignee_email.clone(),
            project_id: deleted.project_id,
            old_status: None,
            new_status: None,
            initiator_id: None,
            initiator_name: None,
            deleted_by: deleted.deleted_by.clone(),
            deleted_by_name: deleted.deleted_by_name.clone(),
        }
    }
}

fn value_or_unspecified(value: Option<&str>) -> &str {
    match value {
        Some(v) if !v.is_empty() => v,
        _ => UNSPECIFIED,
    }
}

fn date_or_unspecified(date: Option<NaiveDate>) -> String {
    date.map_or_else(|| UNSPECIFIED.to_string(), |d| d.to_string())
}

/// Flatten the primary recipient and admin list into a de-duplicated,
/// order-preserving recipient list; empty addresses are dropped.
fn dedup_recipients(primary: Option<&str>, admins: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(1 + admins.len());
    if let Some(primary) = primary {
        if !primary.is_empty() {
            out.push(primary.to_string());
        }
    }
    for admin in admins {
        if !admin.is_empty() && !out.iter().any(|r| r == admin) {
            out.push(admin.clone());
        }
    }
    out
}
