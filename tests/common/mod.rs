#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, Utc};
use movement_core::events::{DomainEvent, EventKind, EventRouting, MemoryEventSink};
use movement_core::models::movement::MovementType;
use movement_core::models::requests::{CreateMovementRequest, NewMovementLine, NewMovementTask};
use movement_core::models::movement_task::TaskType;
use movement_core::store::InMemoryMovementStore;
use movement_core::MovementCore;
use rust_decimal::Decimal;
use uuid::Uuid;

/// Harness wiring the core over the in-memory store and a recording sink.
pub struct TestApp {
    pub core: MovementCore,
    pub sink: Arc<MemoryEventSink>,
}

impl TestApp {
    pub fn new() -> Self {
        let store = Arc::new(InMemoryMovementStore::new());
        let sink = Arc::new(MemoryEventSink::new());
        let core = MovementCore::new(store, sink.clone(), Arc::new(EventRouting::default()));
        Self { core, sink }
    }

    pub fn events_of_kind(&self, kind: EventKind) -> Vec<DomainEvent> {
        self.sink
            .recorded()
            .into_iter()
            .filter(|e| e.payload.kind() == kind)
            .collect()
    }
}

pub fn actor() -> Uuid {
    Uuid::new_v4()
}

pub fn line(line_number: u32, quantity: Decimal) -> NewMovementLine {
    NewMovementLine {
        item_id: Uuid::new_v4(),
        requested_quantity: quantity,
        unit_of_measure: None,
        lot_number: None,
        serial_number: None,
        from_location_id: None,
        to_location_id: None,
        line_number,
        notes: None,
    }
}

pub fn transfer_request(warehouse_id: Uuid, lines: Vec<NewMovementLine>) -> CreateMovementRequest {
    CreateMovementRequest {
        reference_number: None,
        movement_type: MovementType::Transfer,
        status: None,
        priority: None,
        warehouse_id,
        source_location_id: None,
        destination_location_id: None,
        assigned_user_id: None,
        movement_date: None,
        expected_date: None,
        scheduled_date: None,
        notes: None,
        reason: None,
        lines,
    }
}

pub fn pick_task(
    scheduled_start: Option<DateTime<Utc>>,
    expected_completion: Option<DateTime<Utc>>,
) -> NewMovementTask {
    NewMovementTask {
        movement_line_id: None,
        task_type: TaskType::Pick,
        priority: None,
        scheduled_start_time: scheduled_start,
        expected_completion_time: expected_completion,
        location_id: None,
        instructions: None,
    }
}
