//! Domain event publication. Publishing is best effort: a failed publish is
//! logged and never fails the operation that raised the event.
use async_trait::async_trait;
use bytes::Bytes;

use crate::domain::events::DomainEvent;

#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, event: DomainEvent);
}

/// Publishes JSON-encoded events on NATS, one subject per event type.
#[derive(Clone, Debug)]
pub struct NatsPublisher {
    client: async_nats::Client,
}

impl NatsPublisher {
    pub async fn connect(url: &str) -> anyhow::Result<Self> {
        let client = async_nats::connect(url).await?;
        tracing::info!(%url, "connected to NATS");
        Ok(Self { client })
    }
}

#[async_trait]
impl EventPublisher for NatsPublisher {
    async fn publish(&self, event: DomainEvent) {
        let payload = match serde_json::to_vec(&event) {
            Ok(p) => Bytes::from(p),
            Err(e) => { tracing::error!(error = %e, "failed to encode event"); return; }
        };
        if let Err(e) = self.client.publish(event.subject().to_string(), payload).await {
            tracing::warn!(error = %e, subject = event.subject(), "failed to publish event");
        }
    }
}

/// Logs events instead of sending them; used when no broker is configured.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogPublisher;

#[async_trait]
impl EventPublisher for LogPublisher {
    async fn publish(&self, event: DomainEvent) {
        tracing::info!(subject = event.subject(), ?event, "domain event");
    }
}
