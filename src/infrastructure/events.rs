//! Domain event publishing.

use std::sync::Mutex;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::events::EventEnvelope;

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("failed to serialize event: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("failed to publish event: {0}")]
    Transport(String),
}

#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, envelope: &EventEnvelope) -> Result<(), PublishError>;
}

/// Publishes JSON envelopes to NATS, one subject per event kind.
pub struct NatsEventPublisher {
    client: async_nats::Client,
}

impl NatsEventPublisher {
    pub fn new(client: async_nats::Client) -> Self { Self { client } }
}

#[async_trait]
impl EventPublisher for NatsEventPublisher {
    async fn publish(&self, envelope: &EventEnvelope) -> Result<(), PublishError> {
        let payload = serde_json::to_vec(envelope)?;
        self.client
            .publish(envelope.event.subject(), payload.into())
            .await
            .map_err(|e| PublishError::Transport(e.to_string()))
    }
}

/// Used when no broker is configured.
pub struct LogEventPublisher;

#[async_trait]
impl EventPublisher for LogEventPublisher {
    async fn publish(&self, envelope: &EventEnvelope) -> Result<(), PublishError> {
        tracing::debug!(subject = %envelope.event.subject(), event_id = %envelope.event_id, "Domain event");
        Ok(())
    }
}

/// Keeps published envelopes in memory.
#[derive(Default)]
pub struct RecordingEventPublisher {
    events: Mutex<Vec<EventEnvelope>>,
}

impl RecordingEventPublisher {
    pub fn events(&self) -> Vec<EventEnvelope> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl EventPublisher for RecordingEventPublisher {
    async fn publish(&self, envelope: &EventEnvelope) -> Result<(), PublishError> {
        self.events
            .lock()
            .map_err(|_| PublishError::Transport("recorder lock poisoned".into()))?
            .push(envelope.clone());
        Ok(())
    }
}
