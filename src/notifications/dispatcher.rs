//! # Change-Detection Orchestrator
//!
//! Decides which notification events a mutation produces and drives each one
//! through the publish-then-fallback pipeline. An update is compared against
//! a pre-mutation snapshot: content changes and status changes are detected
//! independently, so a single PATCH can emit two events for the same task.

use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, warn};

use crate::identity::UserIdentityService;
use crate::models::{Task, TaskStatus};
use crate::notifications::event::{
    DeletedTask, Initiator, NotificationEvent, RecipientInfo,
};
use crate::notifications::mailer::FallbackMailer;
use crate::notifications::publisher::EventPublisher;

/// Pre-mutation capture of the fields that participate in change detection
#[derive(Debug, Clone, PartialEq)]
pub struct TaskSnapshot {
    pub title: String,
    pub description: Option<String>,
    pub difficulty: i32,
    pub status: TaskStatus,
    pub due_date: Option<NaiveDate>,
    pub assignee_id: Option<String>,
    pub project_id: uuid::Uuid,
}

impl TaskSnapshot {
    pub fn of(task: &Task) -> Self {
        Self {
            title: task.title.clone(),
            description: task.description.clone(),
            difficulty: task.difficulty,
            status: task.status,
            due_date: task.due_date,
            assignee_id: task.assignee_id.clone(),
            project_id: task.project_id,
        }
    }

    /// True when any watched non-status field differs from the updated task
    pub fn fields_changed(&self, updated: &Task) -> bool {
        self.title != updated.title
            || self.description != updated.description
            || self.difficulty != updated.difficulty
            || self.due_date != updated.due_date
            || self.assignee_id != updated.assignee_id
            || self.project_id != updated.project_id
    }

    pub fn status_changed(&self, updated: &Task) -> bool {
        self.status != updated.status
    }
}

/// Orchestrates notification delivery for task mutations
pub struct NotificationDispatcher {
    publisher: Arc<dyn EventPublisher>,
    mailer: Arc<dyn FallbackMailer>,
    identity: Arc<dyn UserIdentityService>,
}

impl NotificationDispatcher {
    pub fn new(
        publisher: Arc<dyn EventPublisher>,
        mailer: Arc<dyn FallbackMailer>,
        identity: Arc<dyn UserIdentityService>,
    ) -> Self {
        Self {
            publisher,
            mailer,
            identity,
        }
    }

    /// Resolve recipient identities for a mutation, degrading on lookup
    /// failure rather than aborting the notification.
    pub async fn gather_recipients(
        &self,
        assignee_id: Option<&str>,
        include_admins: bool,
        auth: Option<&str>,
    ) -> RecipientInfo {
        let mut info = RecipientInfo::default();

        if let Some(assignee_id) = assignee_id {
            match self.identity.get_user(assignee_id, auth).await {
                Ok(user) => {
                    info.assignee_display_name = user.display_name.clone();
                    info.assignee_email = user.email_nonempty().map(str::to_string);
                }
                Err(e) => {
                    warn!(assignee_id = assignee_id, error = %e, "Assignee lookup failed");
                }
            }
        }

        if include_admins {
            match self.identity.list_admins(auth).await {
                Ok(admins) => {
                    info.admin_emails = admins
                        .iter()
                        .filter_map(|a| a.email_nonempty())
                        .map(str::to_string)
                        .collect();
                }
                Err(e) => {
                    warn!(error = %e, "Administrator listing failed");
                }
            }
        }

        info
    }

    /// Best-effort resolution of the acting user for event attribution
    pub async fn resolve_initiator(&self, auth: Option<&str>) -> Initiator {
        match self.identity.get_current_user(auth).await {
            Ok(user) => Initiator::from_user(&user),
            Err(e) => {
                debug!(error = %e, "Initiator resolution failed, attributing as unknown");
                Initiator::default()
            }
        }
    }

    /// Notify about a newly created task. Unassigned tasks produce nothing.
    pub async fn task_created(
        &self,
        task: &Task,
        project_name: Option<&str>,
        auth: Option<&str>,
    ) {
        if task.assignee_id.is_none() {
            debug!(task_id = %task.id, "Task created without assignee, no notification");
            return;
        }

        let recipients = self
            .gather_recipients(task.assignee_id.as_deref(), false, auth)
            .await;
        let initiator = self.resolve_initiator(auth).await;

        let event = NotificationEvent::task_created(task, project_name, &recipients, &initiator);
        self.dispatch(event).await;
    }

    /// Notify about an update, comparing the updated task against its
    /// pre-mutation snapshot. Content and status changes are independent
    /// checks and both may fire from one call.
    pub async fn task_updated(
        &self,
        before: &TaskSnapshot,
        updated: &Task,
        project_name: Option<&str>,
        initiator: &Initiator,
        auth: Option<&str>,
    ) {
        let fields_changed = before.fields_changed(updated);
        let status_changed = before.status_changed(updated);

        if !fields_changed && !status_changed {
            debug!(task_id = %updated.id, "Update produced no watched changes");
            return;
        }

        let recipients = self
            .gather_recipients(updated.assignee_id.as_deref(), true, auth)
            .await;

        if fields_changed {
            let event =
                NotificationEvent::task_updated(updated, project_name, &recipients, initiator);
            self.dispatch(event).await;
        }

        if status_changed {
            let event = NotificationEvent::status_changed(
                updated,
                project_name,
                before.status,
                updated.status,
                &recipients,
                initiator,
            );
            self.dispatch(event).await;
        }
    }

    /// Notify about a deletion, using data and recipients captured before
    /// the row was removed.
    pub async fn task_deleted(&self, deleted: &DeletedTask, recipients: &RecipientInfo) {
        let event = NotificationEvent::task_deleted(deleted, recipients);
        self.dispatch(event).await;
    }

    async fn dispatch(&self, event: NotificationEvent) {
        let routing_key = event.event_type.routing_key();
        let delivered = self.publisher.publish(routing_key, &event).await;

        if !delivered {
            warn!(
                routing_key = routing_key,
                task_id = %event.task_id,
                provider = self.publisher.provider_name(),
                "Broker publish failed, falling back to email"
            );
            self.mailer.send_fallback(&event).await;
        }
    }
}

impl std::fmt::Debug for NotificationDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationDispatcher")
            .field("provider", &self.publisher.provider_name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::{IdentityError, UserRecord};
    use crate::notifications::event::EventKind;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use uuid::Uuid;

    struct StubPublisher {
        deliver: bool,
        published: Mutex<Vec<(String, NotificationEvent)>>,
    }

    impl StubPublisher {
        fn new(deliver: bool) -> Self {
            Self {
                deliver,
                published: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl EventPublisher for StubPublisher {
        async fn publish(&self, routing_key: &str, event: &NotificationEvent) -> bool {
            self.published
                .lock()
                .unwrap()
                .push((routing_key.to_string(), event.clone()));
            self.deliver
        }

        fn provider_name(&self) -> &str {
            "stub"
        }
    }

    #[derive(Default)]
    struct StubMailer {
        sent: Mutex<Vec<NotificationEvent>>,
    }

    #[async_trait]
    impl FallbackMailer for StubMailer {
        async fn send_fallback(&self, event: &NotificationEvent) {
            self.sent.lock().unwrap().push(event.clone());
        }
    }

    struct StubIdentity {
        fail: bool,
    }

    #[async_trait]
    impl UserIdentityService for StubIdentity {
        async fn get_user(
            &self,
            user_id: &str,
            _auth: Option<&str>,
        ) -> Result<UserRecord, IdentityError> {
            if self.fail {
                return Err(IdentityError::Transport("connection refused".to_string()));
            }
            Ok(UserRecord {
                id: user_id.to_string(),
                username: Some("amartin".to_string()),
                display_name: Some("Alice Martin".to_string()),
                email: Some("alice@example.com".to_string()),
                role: Some("USER".to_string()),
            })
        }

        async fn list_admins(&self, _auth: Option<&str>) -> Result<Vec<UserRecord>, IdentityError> {
            if self.fail {
                return Err(IdentityError::Transport("connection refused".to_string()));
            }
            Ok(vec![UserRecord {
                id: "1".to_string(),
                username: Some("admin".to_string()),
                display_name: Some("Admin".to_string()),
                email: Some("admin@example.com".to_string()),
                role: Some("ADMIN".to_string()),
            }])
        }

        async fn get_current_user(
            &self,
            _auth: Option<&str>,
        ) -> Result<UserRecord, IdentityError> {
            if self.fail {
                return Err(IdentityError::Transport("connection refused".to_string()));
            }
            Ok(UserRecord {
                id: "7".to_string(),
                username: Some("bob".to_string()),
                display_name: Some("Bob".to_string()),
                email: Some("bob@example.com".to_string()),
                role: Some("ADMIN".to_string()),
            })
        }
    }

    fn harness(deliver: bool, identity_fails: bool) -> (
        NotificationDispatcher,
        Arc<StubPublisher>,
        Arc<StubMailer>,
    ) {
        let publisher = Arc::new(StubPublisher::new(deliver));
        let mailer = Arc::new(StubMailer::default());
        let dispatcher = NotificationDispatcher::new(
            publisher.clone(),
            mailer.clone(),
            Arc::new(StubIdentity {
                fail: identity_fails,
            }),
        );
        (dispatcher, publisher, mailer)
    }

    fn sample_task() -> Task {
        Task {
            id: Uuid::new_v4(),
            title: "Write report".to_string(),
            description: Some("Quarterly numbers".to_string()),
            difficulty: 3,
            status: TaskStatus::Todo,
            due_date: None,
            assignee_id: Some("42".to_string()),
            project_id: Uuid::new_v4(),
            created_at: chrono::Utc::now().naive_utc(),
        }
    }

    #[tokio::test]
    async fn test_status_only_change_emits_single_status_event() {
        let (dispatcher, publisher, _) = harness(true, false);
        let before = TaskSnapshot::of(&sample_task());
        let mut updated = sample_task();
        updated.title = before.title.clone();
        updated.description = before.description.clone();
        updated.project_id = before.project_id;
        updated.status = TaskStatus::InProgress;

        dispatcher
            .task_updated(&before, &updated, Some("Apollo"), &Initiator::default(), None)
            .await;

        let published = publisher.published.lock().unwrap();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].0, "task.status_changed");
        assert_eq!(published[0].1.old_status, Some(TaskStatus::Todo));
        assert_eq!(published[0].1.new_status, Some(TaskStatus::InProgress));
    }

    #[tokio::test]
    async fn test_content_only_change_emits_single_update_event() {
        let (dispatcher, publisher, _) = harness(true, false);
        let task = sample_task();
        let before = TaskSnapshot::of(&task);
        let mut updated = task;
        updated.title = "Write final report".to_string();

        dispatcher
            .task_updated(&before, &updated, None, &Initiator::default(), None)
            .await;

        let published = publisher.published.lock().unwrap();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].1.event_type, EventKind::TaskUpdated);
    }

    #[tokio::test]
    async fn test_combined_change_emits_both_events_for_same_task() {
        let (dispatcher, publisher, _) = harness(true, false);
        let task = sample_task();
        let before = TaskSnapshot::of(&task);
        let mut updated = task;
        updated.title = "Write final report".to_string();
        updated.status = TaskStatus::Done;

        dispatcher
            .task_updated(&before, &updated, None, &Initiator::default(), None)
            .await;

        let published = publisher.published.lock().unwrap();
        assert_eq!(published.len(), 2);
        assert_eq!(published[0].1.event_type, EventKind::TaskUpdated);
        assert_eq!(published[1].1.event_type, EventKind::StatusChanged);
        assert_eq!(published[0].1.task_id, published[1].1.task_id);
    }

    #[tokio::test]
    async fn test_no_change_emits_nothing() {
        let (dispatcher, publisher, mailer) = harness(true, false);
        let task = sample_task();
        let before = TaskSnapshot::of(&task);

        dispatcher
            .task_updated(&before, &task, None, &Initiator::default(), None)
            .await;

        assert!(publisher.published.lock().unwrap().is_empty());
        assert!(mailer.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_fallback_fires_with_identical_event_when_publish_fails() {
        let (dispatcher, publisher, mailer) = harness(false, false);
        let task = sample_task();

        dispatcher.task_created(&task, Some("Apollo"), None).await;

        let published = publisher.published.lock().unwrap();
        let sent = mailer.sent.lock().unwrap();
        assert_eq!(published.len(), 1);
        assert_eq!(sent.len(), 1);
        assert_eq!(published[0].1, sent[0]);
        assert_eq!(sent[0].recipients, vec!["alice@example.com"]);
    }

    #[tokio::test]
    async fn test_no_fallback_when_publish_succeeds() {
        let (dispatcher, _, mailer) = harness(true, false);
        let task = sample_task();

        dispatcher.task_created(&task, None, None).await;

        assert!(mailer.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unassigned_creation_produces_no_event() {
        let (dispatcher, publisher, _) = harness(true, false);
        let mut task = sample_task();
        task.assignee_id = None;

        dispatcher.task_created(&task, None, None).await;

        assert!(publisher.published.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_identity_failure_degrades_instead_of_aborting() {
        let (dispatcher, publisher, _) = harness(true, true);
        let task = sample_task();
        let before = TaskSnapshot::of(&task);
        let mut updated = task;
        updated.status = TaskStatus::Done;

        dispatcher
            .task_updated(&before, &updated, None, &Initiator::default(), None)
            .await;

        let published = publisher.published.lock().unwrap();
        assert_eq!(published.len(), 1);
        assert!(published[0].1.recipients.is_empty());
        assert!(!published[0].1.send_email);
        assert!(published[0].1.content.contains("Assigned to: unknown"));
    }

    #[tokio::test]
    async fn test_update_recipients_include_admins_deduped() {
        let (dispatcher, publisher, _) = harness(true, false);
        let task = sample_task();
        let before = TaskSnapshot::of(&task);
        let mut updated = task;
        updated.difficulty = 5;

        dispatcher
            .task_updated(&before, &updated, None, &Initiator::default(), None)
            .await;

        let published = publisher.published.lock().unwrap();
        assert_eq!(
            published[0].1.recipients,
            vec!["alice@example.com", "admin@example.com"]
        );
    }

    #[tokio::test]
    async fn test_deletion_uses_pre_captured_recipients() {
        let (dispatcher, publisher, _) = harness(true, false);
        let recipients = RecipientInfo {
            assignee_display_name: Some("Alice Martin".to_string()),
            assignee_email: Some("alice@example.com".to_string()),
            admin_emails: vec!["admin@example.com".to_string()],
        };
        let deleted = DeletedTask {
            id: Uuid::new_v4(),
            title: "Write report".to_string(),
            assignee_id: Some("42".to_string()),
            project_id: None,
            deleted_by: Some("1".to_string()),
            deleted_by_name: Some("Admin".to_string()),
        };

        dispatcher.task_deleted(&deleted, &recipients).await;

        let published = publisher.published.lock().unwrap();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].0, "task.deleted");
        assert_eq!(published[0].1.recipients.len(), 2);
    }
}
