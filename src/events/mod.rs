//! Domain events for committed state changes.
//!
//! Emission is decoupled from the aggregate write: the orchestrator emits
//! only after the store reports success, and a publish failure is logged and
//! swallowed; the durable state is authoritative and delivery is
//! at-least-once. Consumers deduplicate on `event_id`.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::models::movement::{MovementStatus, MovementType};

/// The kinds of event the core emits; used as the routing key.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
)]
#[strum(serialize_all = "PascalCase")]
pub enum EventKind {
    MovementCreated,
    MovementStatusChanged,
    MovementCompleted,
    MovementCancelled,
    TaskAssigned,
    TaskCompleted,
}

/// Typed payloads, carrying the minimal identifying state of the change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MovementEvent {
    MovementCreated {
        movement_id: Uuid,
        warehouse_id: Uuid,
        reference_number: Option<String>,
        movement_type: MovementType,
        status: MovementStatus,
    },
    MovementStatusChanged {
        movement_id: Uuid,
        warehouse_id: Uuid,
        reference_number: Option<String>,
        old_status: MovementStatus,
        new_status: MovementStatus,
    },
    MovementCompleted {
        movement_id: Uuid,
        warehouse_id: Uuid,
        reference_number: Option<String>,
        completed_lines: u32,
        total_lines: u32,
    },
    MovementCancelled {
        movement_id: Uuid,
        warehouse_id: Uuid,
        reference_number: Option<String>,
        reason: Option<String>,
    },
    TaskAssigned {
        task_id: Uuid,
        movement_id: Uuid,
        assigned_user_id: Uuid,
    },
    TaskCompleted {
        task_id: Uuid,
        movement_id: Uuid,
        duration_seconds: Option<i64>,
    },
}

impl MovementEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            MovementEvent::MovementCreated { .. } => EventKind::MovementCreated,
            MovementEvent::MovementStatusChanged { .. } => EventKind::MovementStatusChanged,
            MovementEvent::MovementCompleted { .. } => EventKind::MovementCompleted,
            MovementEvent::MovementCancelled { .. } => EventKind::MovementCancelled,
            MovementEvent::TaskAssigned { .. } => EventKind::TaskAssigned,
            MovementEvent::TaskCompleted { .. } => EventKind::TaskCompleted,
        }
    }
}

/// Envelope handed to the sink. `event_id` is fresh per emission and is the
/// consumer-side deduplication key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainEvent {
    pub event_id: Uuid,
    pub occurred_at: DateTime<Utc>,
    pub actor_id: Uuid,
    pub destination: String,
    pub payload: MovementEvent,
}

#[derive(Debug, Error)]
pub enum EventRoutingError {
    #[error("unknown event kind in routing table: {0}")]
    UnknownKind(String),
    #[error("no destination configured for event kind {0}")]
    MissingKind(EventKind),
}

/// Explicit event-kind -> destination map, built once at startup and shared
/// by reference.
#[derive(Debug, Clone)]
pub struct EventRouting {
    routes: HashMap<EventKind, String>,
}

impl EventRouting {
    /// Builds the routing table from configuration entries keyed by kind
    /// name (e.g. `MovementCreated`). Every kind must be covered.
    pub fn from_map(routes: &HashMap<String, String>) -> Result<Self, EventRoutingError> {
        let mut parsed = HashMap::new();
        for (name, destination) in routes {
            let kind: EventKind = name
                .parse()
                .map_err(|_| EventRoutingError::UnknownKind(name.clone()))?;
            parsed.insert(kind, destination.clone());
        }
        for kind in EventKind::iter() {
            if !parsed.contains_key(&kind) {
                return Err(EventRoutingError::MissingKind(kind));
            }
        }
        Ok(Self { routes: parsed })
    }

    pub fn destination(&self, kind: EventKind) -> &str {
        // from_map/Default guarantee every kind is present.
        self.routes
            .get(&kind)
            .map(String::as_str)
            .unwrap_or("wms.movements")
    }
}

impl Default for EventRouting {
    fn default() -> Self {
        let mut routes = HashMap::new();
        for kind in EventKind::iter() {
            let destination = match kind {
                EventKind::TaskAssigned | EventKind::TaskCompleted => "wms.tasks",
                _ => "wms.movements",
            };
            routes.insert(kind, destination.to_string());
        }
        Self { routes }
    }
}

#[derive(Debug, Error)]
pub enum EventSinkError {
    #[error("event channel is full")]
    ChannelFull,
    #[error("event channel is closed")]
    ChannelClosed,
    #[error("sink rejected event: {0}")]
    Rejected(String),
}

/// Best-effort, non-blocking publication contract. Implementations must not
/// block the caller on downstream delivery.
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn publish(&self, event: DomainEvent) -> Result<(), EventSinkError>;
}

/// Sink backed by an in-process channel; a consumer loop (or bridge to a
/// broker) drains the receiver.
#[derive(Debug, Clone)]
pub struct MpscEventSink {
    sender: mpsc::Sender<DomainEvent>,
}

impl MpscEventSink {
    pub fn new(sender: mpsc::Sender<DomainEvent>) -> Self {
        Self { sender }
    }

    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<DomainEvent>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self::new(tx), rx)
    }
}

#[async_trait]
impl EventSink for MpscEventSink {
    async fn publish(&self, event: DomainEvent) -> Result<(), EventSinkError> {
        self.sender.try_send(event).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => EventSinkError::ChannelFull,
            mpsc::error::TrySendError::Closed(_) => EventSinkError::ChannelClosed,
        })
    }
}

/// Sink that records everything it is given; for tests and local embedding.
#[derive(Debug, Default)]
pub struct MemoryEventSink {
    events: Mutex<Vec<DomainEvent>>,
}

impl MemoryEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn recorded(&self) -> Vec<DomainEvent> {
        self.events.lock().map(|events| events.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl EventSink for MemoryEventSink {
    async fn publish(&self, event: DomainEvent) -> Result<(), EventSinkError> {
        self.events
            .lock()
            .map_err(|_| EventSinkError::Rejected("sink poisoned".to_string()))?
            .push(event);
        Ok(())
    }
}

/// Builds envelopes for committed changes and hands them to the sink.
/// Publish failures are logged and never propagated to the caller.
#[derive(Clone)]
pub struct EventEmitter {
    routing: Arc<EventRouting>,
    sink: Arc<dyn EventSink>,
}

impl EventEmitter {
    pub fn new(routing: Arc<EventRouting>, sink: Arc<dyn EventSink>) -> Self {
        Self { routing, sink }
    }

    pub async fn emit(&self, actor_id: Uuid, payload: MovementEvent) {
        let kind = payload.kind();
        let event = DomainEvent {
            event_id: Uuid::new_v4(),
            occurred_at: Utc::now(),
            actor_id,
            destination: self.routing.destination(kind).to_string(),
            payload,
        };
        if let Err(e) = self.sink.publish(event).await {
            warn!(%kind, error = %e, "event publish failed; state change already committed");
        }
    }
}

/// Drains an event channel, logging each event. Embedders that bridge to a
/// real broker replace this loop with their own consumer.
pub async fn log_events(mut rx: mpsc::Receiver<DomainEvent>) {
    while let Some(event) = rx.recv().await {
        info!(
            event_id = %event.event_id,
            destination = %event.destination,
            kind = %event.payload.kind(),
            "domain event"
        );
    }
    warn!("event channel closed; logging loop ended");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn emitter_stamps_envelope_and_routes() {
        let sink = Arc::new(MemoryEventSink::new());
        let emitter = EventEmitter::new(Arc::new(EventRouting::default()), sink.clone());
        let actor = Uuid::new_v4();

        emitter
            .emit(
                actor,
                MovementEvent::TaskAssigned {
                    task_id: Uuid::new_v4(),
                    movement_id: Uuid::new_v4(),
                    assigned_user_id: Uuid::new_v4(),
                },
            )
            .await;

        let events = sink.recorded();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].actor_id, actor);
        assert_eq!(events[0].destination, "wms.tasks");
        assert!(!events[0].event_id.is_nil());
    }

    #[tokio::test]
    async fn publish_failure_is_swallowed() {
        // Zero-capacity receiver dropped: channel closed.
        let (sink, rx) = MpscEventSink::channel(1);
        drop(rx);
        let emitter = EventEmitter::new(Arc::new(EventRouting::default()), Arc::new(sink));
        emitter
            .emit(
                Uuid::new_v4(),
                MovementEvent::MovementCancelled {
                    movement_id: Uuid::new_v4(),
                    warehouse_id: Uuid::new_v4(),
                    reference_number: None,
                    reason: Some("test".to_string()),
                },
            )
            .await;
        // No panic, no error: best-effort by contract.
    }

    #[test]
    fn routing_requires_every_kind() {
        let mut map = HashMap::new();
        map.insert("MovementCreated".to_string(), "topic-a".to_string());
        let err = EventRouting::from_map(&map).unwrap_err();
        assert!(matches!(err, EventRoutingError::MissingKind(_)));

        for kind in EventKind::iter() {
            map.insert(kind.to_string(), "topic-a".to_string());
        }
        let routing = EventRouting::from_map(&map).unwrap();
        assert_eq!(routing.destination(EventKind::TaskCompleted), "topic-a");
    }

    #[test]
    fn unknown_kind_is_rejected() {
        let mut map = HashMap::new();
        map.insert("OrderShipped".to_string(), "topic".to_string());
        let err = EventRouting::from_map(&map).unwrap_err();
        assert!(matches!(err, EventRoutingError::UnknownKind(name) if name == "OrderShipped"));
    }
}
