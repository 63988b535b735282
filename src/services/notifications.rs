use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use uuid::Uuid;

use crate::core::config::Settings;
use crate::core::metrics::NOTIFICATIONS_FAILED_TOTAL;
use crate::core::redis::RedisHandle;

/// Events published to professor-facing listeners after a successful write.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event")]
pub(crate) enum AssignmentEvent {
    #[serde(rename = "assignment.created")]
    AssignmentCreated { assignment_id: i64, course_id: String },
    #[serde(rename = "assignment.updated")]
    AssignmentUpdated { assignment_id: i64, course_id: String },
    #[serde(rename = "submission.received")]
    SubmissionReceived { assignment_id: i64, student_id: i64, score: f64, submitted_at: String },
}

impl AssignmentEvent {
    pub(crate) fn channel(&self, prefix: &str) -> String {
        match self {
            Self::AssignmentCreated { .. } | Self::AssignmentUpdated { .. } => {
                format!("{prefix}:assignments")
            }
            Self::SubmissionReceived { assignment_id, .. } => {
                format!("{prefix}:assignment-{assignment_id}")
            }
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Self::AssignmentCreated { .. } => "assignment.created",
            Self::AssignmentUpdated { .. } => "assignment.updated",
            Self::SubmissionReceived { .. } => "submission.received",
        }
    }
}

#[derive(Debug, Serialize)]
struct Envelope<'a> {
    event_id: Uuid,
    #[serde(flatten)]
    event: &'a AssignmentEvent,
}

#[async_trait]
pub(crate) trait EventPublisher: Send + Sync {
    async fn publish(&self, channel: &str, payload: &str) -> anyhow::Result<()>;
}

#[async_trait]
impl EventPublisher for RedisHandle {
    async fn publish(&self, channel: &str, payload: &str) -> anyhow::Result<()> {
        RedisHandle::publish(self, channel, payload).await?;
        Ok(())
    }
}

/// Fire-and-forget delivery. `emit` never blocks the caller and never fails it;
/// delivery errors are logged and counted.
#[derive(Clone)]
pub(crate) struct Notifier {
    publisher: Arc<dyn EventPublisher>,
    enabled: bool,
    prefix: String,
}

impl Notifier {
    pub(crate) fn new(publisher: Arc<dyn EventPublisher>, settings: &Settings) -> Self {
        let notifications = settings.notifications();
        Self {
            publisher,
            enabled: notifications.enabled,
            prefix: notifications.channel_prefix.clone(),
        }
    }

    pub(crate) fn emit(&self, event: AssignmentEvent) {
        if !self.enabled {
            return;
        }

        let channel = event.channel(&self.prefix);
        let payload = match serde_json::to_string(&Envelope { event_id: Uuid::new_v4(), event: &event })
        {
            Ok(payload) => payload,
            Err(err) => {
                tracing::warn!(error = %err, event = event.name(), "Failed to encode notification");
                metrics::counter!(NOTIFICATIONS_FAILED_TOTAL).increment(1);
                return;
            }
        };

        let publisher = Arc::clone(&self.publisher);
        let name = event.name();
        tokio::spawn(async move {
            if let Err(err) = publisher.publish(&channel, &payload).await {
                tracing::warn!(error = %err, event = name, channel = %channel, "Notification dropped");
                metrics::counter!(NOTIFICATIONS_FAILED_TOTAL).increment(1);
            }
        });
    }
}
