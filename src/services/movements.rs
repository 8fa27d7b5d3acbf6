//! Movement orchestrator: create/read/update/delete plus the lifecycle
//! operations. Every mutation loads the aggregate, validates, mutates in
//! memory, saves the whole aggregate version-checked, and only then emits
//! the corresponding event.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::common::{Page, PageRequest};
use crate::errors::ServiceError;
use crate::events::{EventEmitter, MovementEvent};
use crate::models::movement::{Movement, MovementStatus};
use crate::models::movement_line::MovementLine;
use crate::models::requests::{CreateMovementRequest, MovementPatch};
use crate::services::{line_ledger, movement_status, task_lifecycle};
use crate::store::{MovementFilter, MovementStore};
use crate::validation::{require_actor, validate_request};

#[derive(Clone)]
pub struct MovementService {
    store: Arc<dyn MovementStore>,
    emitter: EventEmitter,
}

impl MovementService {
    pub fn new(store: Arc<dyn MovementStore>, emitter: EventEmitter) -> Self {
        Self { store, emitter }
    }

    async fn load(&self, id: Uuid) -> Result<Movement, ServiceError> {
        self.store
            .find_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::movement_not_found(id))
    }

    #[instrument(skip(self, request), err)]
    pub async fn create(
        &self,
        request: CreateMovementRequest,
        actor_id: Uuid,
    ) -> Result<Movement, ServiceError> {
        require_actor(actor_id)?;
        validate_request(&request)?;

        if let Some(reference) = &request.reference_number {
            if self.store.reference_exists(reference).await? {
                return Err(ServiceError::DuplicateReference(reference.clone()));
            }
        }

        let now = Utc::now();
        let id = Uuid::new_v4();
        let lines = request
            .lines
            .iter()
            .map(|line| MovementLine {
                id: Uuid::new_v4(),
                movement_id: id,
                item_id: line.item_id,
                requested_quantity: line.requested_quantity,
                actual_quantity: None,
                unit_of_measure: line.unit_of_measure.clone().unwrap_or_else(|| "EA".to_string()),
                lot_number: line.lot_number.clone(),
                serial_number: line.serial_number.clone(),
                from_location_id: line.from_location_id,
                to_location_id: line.to_location_id,
                status: crate::models::movement_line::LineStatus::Pending,
                line_number: line.line_number,
                notes: line.notes.clone(),
                reason: None,
                created_at: now,
                updated_at: now,
            })
            .collect();

        let movement = Movement {
            id,
            reference_number: request.reference_number.clone(),
            movement_type: request.movement_type,
            status: request.status.unwrap_or(MovementStatus::Draft),
            priority: request.priority.unwrap_or_default(),
            warehouse_id: request.warehouse_id,
            source_location_id: request.source_location_id,
            destination_location_id: request.destination_location_id,
            assigned_user_id: request.assigned_user_id,
            movement_date: request.movement_date,
            expected_date: request.expected_date,
            actual_date: None,
            scheduled_date: request.scheduled_date,
            notes: request.notes.clone(),
            reason: request.reason.clone(),
            created_by: actor_id,
            created_at: now,
            updated_at: now,
            completed_at: None,
            completed_by: None,
            version: 0,
            lines,
            tasks: Vec::new(),
        };

        let saved = self.store.insert(movement).await?;
        info!(movement_id = %saved.id, movement_type = %saved.movement_type, "movement created");

        self.emitter
            .emit(
                actor_id,
                MovementEvent::MovementCreated {
                    movement_id: saved.id,
                    warehouse_id: saved.warehouse_id,
                    reference_number: saved.reference_number.clone(),
                    movement_type: saved.movement_type,
                    status: saved.status,
                },
            )
            .await;
        Ok(saved)
    }

    #[instrument(skip(self), err)]
    pub async fn get_by_id(&self, id: Uuid) -> Result<Movement, ServiceError> {
        self.load(id).await
    }

    #[instrument(skip(self), err)]
    pub async fn get_by_reference(&self, reference: &str) -> Result<Movement, ServiceError> {
        self.store
            .find_by_reference(reference)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("movement with reference {reference} not found")))
    }

    #[instrument(skip(self, patch), err)]
    pub async fn update(
        &self,
        id: Uuid,
        patch: MovementPatch,
        actor_id: Uuid,
    ) -> Result<Movement, ServiceError> {
        require_actor(actor_id)?;
        let mut movement = self.load(id).await?;
        movement_status::ensure_modifiable(movement.status)?;

        if let Some(reference) = patch.reference_number {
            match &movement.reference_number {
                Some(existing) if *existing != reference => {
                    return Err(ServiceError::ValidationFailed(vec![
                        "reference_number is immutable once set".to_string(),
                    ]));
                }
                Some(_) => {}
                None => {
                    if self.store.reference_exists(&reference).await? {
                        return Err(ServiceError::DuplicateReference(reference));
                    }
                    movement.reference_number = Some(reference);
                }
            }
        }
        if let Some(priority) = patch.priority {
            movement.priority = priority;
        }
        if let Some(value) = patch.source_location_id {
            movement.source_location_id = Some(value);
        }
        if let Some(value) = patch.destination_location_id {
            movement.destination_location_id = Some(value);
        }
        if let Some(value) = patch.assigned_user_id {
            movement.assigned_user_id = Some(value);
        }
        if let Some(value) = patch.movement_date {
            movement.movement_date = Some(value);
        }
        if let Some(value) = patch.expected_date {
            movement.expected_date = Some(value);
        }
        if let Some(value) = patch.scheduled_date {
            movement.scheduled_date = Some(value);
        }
        if let Some(value) = patch.notes {
            movement.notes = Some(value);
        }
        if let Some(value) = patch.reason {
            movement.reason = Some(value);
        }
        movement.updated_at = Utc::now();

        let expected = movement.version;
        self.store.save(movement, expected).await
    }

    #[instrument(skip(self), err)]
    pub async fn delete(&self, id: Uuid, actor_id: Uuid) -> Result<(), ServiceError> {
        require_actor(actor_id)?;
        let movement = self.load(id).await?;
        if !movement_status::can_delete(movement.status) {
            return Err(ServiceError::InvalidTransition {
                current: movement.status,
                requested: movement.status,
            });
        }
        self.store.delete(id).await?;
        info!(movement_id = %id, "movement deleted");
        Ok(())
    }

    /// DRAFT or PENDING -> IN_PROGRESS. A draft is released and started in
    /// one step; a single status-changed event is emitted for the pair the
    /// caller observed.
    #[instrument(skip(self), err)]
    pub async fn start(&self, id: Uuid, actor_id: Uuid) -> Result<Movement, ServiceError> {
        require_actor(actor_id)?;
        let mut movement = self.load(id).await?;
        let old_status = movement.status;
        if !matches!(old_status, MovementStatus::Draft | MovementStatus::Pending) {
            return Err(ServiceError::InvalidTransition {
                current: old_status,
                requested: MovementStatus::InProgress,
            });
        }
        movement.status = MovementStatus::InProgress;
        movement.updated_at = Utc::now();

        let expected = movement.version;
        let saved = self.store.save(movement, expected).await?;
        self.emit_status_changed(actor_id, &saved, old_status).await;
        Ok(saved)
    }

    /// IN_PROGRESS or PARTIALLY_COMPLETED -> COMPLETED. Stamps completion
    /// fields and reports line completion counts as of this instant.
    #[instrument(skip(self), err)]
    pub async fn complete(&self, id: Uuid, actor_id: Uuid) -> Result<Movement, ServiceError> {
        require_actor(actor_id)?;
        let mut movement = self.load(id).await?;
        movement_status::ensure_transition(movement.status, MovementStatus::Completed)?;

        let now = Utc::now();
        movement.status = MovementStatus::Completed;
        movement.actual_date = Some(now);
        movement.completed_at = Some(now);
        movement.completed_by = Some(actor_id);
        movement.updated_at = now;

        let expected = movement.version;
        let saved = self.store.save(movement, expected).await?;
        info!(movement_id = %saved.id, "movement completed");

        self.emitter
            .emit(
                actor_id,
                MovementEvent::MovementCompleted {
                    movement_id: saved.id,
                    warehouse_id: saved.warehouse_id,
                    reference_number: saved.reference_number.clone(),
                    completed_lines: line_ledger::completed_lines(&saved.lines),
                    total_lines: line_ledger::total_lines(&saved.lines),
                },
            )
            .await;
        Ok(saved)
    }

    /// Any non-terminal status -> CANCELLED. Records the reason and cancels
    /// the movement's still-open tasks.
    #[instrument(skip(self), err)]
    pub async fn cancel(
        &self,
        id: Uuid,
        reason: &str,
        actor_id: Uuid,
    ) -> Result<Movement, ServiceError> {
        require_actor(actor_id)?;
        let mut movement = self.load(id).await?;
        movement_status::ensure_transition(movement.status, MovementStatus::Cancelled)?;

        let now = Utc::now();
        movement.status = MovementStatus::Cancelled;
        movement.reason = Some(reason.to_string());
        movement.updated_at = now;
        for task in &mut movement.tasks {
            if !task.status.is_terminal() {
                task_lifecycle::cancel(task, reason, now)?;
            }
        }

        let expected = movement.version;
        let saved = self.store.save(movement, expected).await?;
        info!(movement_id = %saved.id, reason = %reason, "movement cancelled");

        self.emitter
            .emit(
                actor_id,
                MovementEvent::MovementCancelled {
                    movement_id: saved.id,
                    warehouse_id: saved.warehouse_id,
                    reference_number: saved.reference_number.clone(),
                    reason: saved.reason.clone(),
                },
            )
            .await;
        Ok(saved)
    }

    /// PENDING or IN_PROGRESS -> ON_HOLD, recording the reason.
    #[instrument(skip(self), err)]
    pub async fn hold(
        &self,
        id: Uuid,
        reason: &str,
        actor_id: Uuid,
    ) -> Result<Movement, ServiceError> {
        require_actor(actor_id)?;
        let mut movement = self.load(id).await?;
        let old_status = movement.status;
        movement_status::ensure_transition(old_status, MovementStatus::OnHold)?;

        movement.status = MovementStatus::OnHold;
        movement.reason = Some(reason.to_string());
        movement.updated_at = Utc::now();

        let expected = movement.version;
        let saved = self.store.save(movement, expected).await?;
        self.emit_status_changed(actor_id, &saved, old_status).await;
        Ok(saved)
    }

    /// ON_HOLD -> PENDING.
    #[instrument(skip(self), err)]
    pub async fn release(&self, id: Uuid, actor_id: Uuid) -> Result<Movement, ServiceError> {
        require_actor(actor_id)?;
        let mut movement = self.load(id).await?;
        let old_status = movement.status;
        // Only a held movement can be released; the table alone would also
        // admit DRAFT -> PENDING here.
        if old_status != MovementStatus::OnHold {
            return Err(ServiceError::InvalidTransition {
                current: old_status,
                requested: MovementStatus::Pending,
            });
        }

        movement.status = MovementStatus::Pending;
        movement.updated_at = Utc::now();

        let expected = movement.version;
        let saved = self.store.save(movement, expected).await?;
        self.emit_status_changed(actor_id, &saved, old_status).await;
        Ok(saved)
    }

    /// Generic transition through the table. Completion and cancellation
    /// targets get the same stamping and events as their dedicated
    /// operations.
    #[instrument(skip(self), err)]
    pub async fn update_status(
        &self,
        id: Uuid,
        requested: MovementStatus,
        actor_id: Uuid,
    ) -> Result<Movement, ServiceError> {
        match requested {
            MovementStatus::Completed => self.complete(id, actor_id).await,
            MovementStatus::Cancelled => self.cancel(id, "status update", actor_id).await,
            _ => {
                require_actor(actor_id)?;
                let mut movement = self.load(id).await?;
                let old_status = movement.status;
                movement_status::ensure_transition(old_status, requested)?;

                movement.status = requested;
                movement.updated_at = Utc::now();

                let expected = movement.version;
                let saved = self.store.save(movement, expected).await?;
                self.emit_status_changed(actor_id, &saved, old_status).await;
                Ok(saved)
            }
        }
    }

    /// Appends a note to the movement header.
    #[instrument(skip(self, note), err)]
    pub async fn add_note(
        &self,
        id: Uuid,
        note: &str,
        actor_id: Uuid,
    ) -> Result<Movement, ServiceError> {
        require_actor(actor_id)?;
        let mut movement = self.load(id).await?;
        movement_status::ensure_modifiable(movement.status)?;

        movement.notes = match movement.notes.take() {
            Some(notes) => Some(format!("{notes}\n{note}")),
            None => Some(note.to_string()),
        };
        movement.updated_at = Utc::now();

        let expected = movement.version;
        self.store.save(movement, expected).await
    }

    #[instrument(skip(self, filter), err)]
    pub async fn list(
        &self,
        filter: MovementFilter,
        page: PageRequest,
    ) -> Result<Page<Movement>, ServiceError> {
        self.store.query(&filter, &page).await
    }

    #[instrument(skip(self), err)]
    pub async fn count_by_status(
        &self,
        warehouse_id: Option<Uuid>,
    ) -> Result<Vec<(MovementStatus, u64)>, ServiceError> {
        self.store.count_by_status(warehouse_id).await
    }

    async fn emit_status_changed(
        &self,
        actor_id: Uuid,
        saved: &Movement,
        old_status: MovementStatus,
    ) {
        info!(
            movement_id = %saved.id,
            from = %old_status,
            to = %saved.status,
            "movement status changed"
        );
        self.emitter
            .emit(
                actor_id,
                MovementEvent::MovementStatusChanged {
                    movement_id: saved.id,
                    warehouse_id: saved.warehouse_id,
                    reference_number: saved.reference_number.clone(),
                    old_status,
                    new_status: saved.status,
                },
            )
            .await;
    }
}
