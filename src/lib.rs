//! Movement Core
//!
//! Movement lifecycle engine for warehouse operations: the Movement
//! aggregate (movement + lines + tasks), its status state machine, derived
//! completion/variance bookkeeping, and domain-event emission for committed
//! state changes. Persistence and event delivery are injected contracts
//! ([`store::MovementStore`], [`events::EventSink`]); the crate knows
//! nothing about SQL or broker topics.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod common;
pub mod config;
pub mod errors;
pub mod events;
pub mod models;
pub mod services;
pub mod store;
pub mod validation;

use std::sync::Arc;

use events::{EventEmitter, EventRouting, EventSink};
use services::{MovementLineService, MovementService, MovementTaskService};
use store::MovementStore;

/// Wires the services over one store, sink, and routing table. This is the
/// surface a thin API layer consumes.
#[derive(Clone)]
pub struct MovementCore {
    pub movements: MovementService,
    pub lines: MovementLineService,
    pub tasks: MovementTaskService,
}

impl MovementCore {
    pub fn new(
        store: Arc<dyn MovementStore>,
        sink: Arc<dyn EventSink>,
        routing: Arc<EventRouting>,
    ) -> Self {
        let emitter = EventEmitter::new(routing, sink);
        Self {
            movements: MovementService::new(store.clone(), emitter.clone()),
            lines: MovementLineService::new(store.clone()),
            tasks: MovementTaskService::new(store, emitter),
        }
    }
}
