use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::debug;
use uuid::Uuid;

use crate::observability::metrics::Metrics;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Channel {
    Rider,
    Customer,
    Business,
}

impl Channel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Rider => "rider",
            Channel::Customer => "customer",
            Channel::Business => "business",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NotificationKind {
    DeliveryRequested,
    RiderAssigned,
    StatusChanged,
    Delivered,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
pub struct NotificationEvent {
    pub channel: Channel,
    /// Who the message is for; None for the anonymous tracking feed.
    pub recipient: Option<Uuid>,
    pub delivery_id: u64,
    pub kind: NotificationKind,
    pub message: String,
    pub at: DateTime<Utc>,
}

impl NotificationEvent {
    pub fn new(
        channel: Channel,
        recipient: Option<Uuid>,
        delivery_id: u64,
        kind: NotificationKind,
        message: impl Into<String>,
    ) -> Self {
        Self {
            channel,
            recipient,
            delivery_id,
            kind,
            message: message.into(),
            at: Utc::now(),
        }
    }
}

/// Fire-and-forget messaging boundary. Implementations must never propagate
/// failure: a committed state transition stays committed whether or not the
/// message got out.
pub trait NotificationPort: Send + Sync {
    fn send(&self, event: NotificationEvent);
}

/// Fans events out on a broadcast channel; the websocket tracking feed is
/// the subscriber. A send error only means nobody is listening right now.
pub struct BroadcastNotifier {
    tx: broadcast::Sender<NotificationEvent>,
    metrics: Metrics,
}

impl BroadcastNotifier {
    pub fn new(tx: broadcast::Sender<NotificationEvent>, metrics: Metrics) -> Self {
        Self { tx, metrics }
    }
}

impl NotificationPort for BroadcastNotifier {
    fn send(&self, event: NotificationEvent) {
        let channel = event.channel.as_str();

        let outcome = if self.tx.send(event).is_ok() {
            "sent"
        } else {
            debug!("no tracking subscribers; notification dropped");
            "dropped"
        };

        self.metrics
            .notifications_total
            .with_label_values(&[channel, outcome])
            .inc();
    }
}
