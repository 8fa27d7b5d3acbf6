//! Line operations. Lines never outlive their movement: every mutation here
//! loads the owning aggregate, applies the change through the line ledger,
//! and saves the aggregate whole.

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::errors::ServiceError;
use crate::models::movement::Movement;
use crate::models::movement_line::{LineStatus, MovementLine};
use crate::models::requests::{LinePatch, NewMovementLine};
use crate::services::{line_ledger, movement_status};
use crate::store::MovementStore;
use crate::validation::{require_actor, validate_request};

#[derive(Clone)]
pub struct MovementLineService {
    store: Arc<dyn MovementStore>,
}

impl MovementLineService {
    pub fn new(store: Arc<dyn MovementStore>) -> Self {
        Self { store }
    }

    async fn load_owner(&self, line_id: Uuid) -> Result<Movement, ServiceError> {
        self.store
            .find_by_line(line_id)
            .await?
            .ok_or_else(|| ServiceError::line_not_found(line_id))
    }

    #[instrument(skip(self), err)]
    pub async fn get_by_id(&self, line_id: Uuid) -> Result<MovementLine, ServiceError> {
        let movement = self.load_owner(line_id).await?;
        movement
            .line(line_id)
            .cloned()
            .ok_or_else(|| ServiceError::line_not_found(line_id))
    }

    #[instrument(skip(self), err)]
    pub async fn list_by_movement(&self, movement_id: Uuid) -> Result<Vec<MovementLine>, ServiceError> {
        let movement = self
            .store
            .find_by_id(movement_id)
            .await?
            .ok_or_else(|| ServiceError::movement_not_found(movement_id))?;
        Ok(movement.lines)
    }

    #[instrument(skip(self), err)]
    pub async fn list_by_item(&self, item_id: Uuid) -> Result<Vec<MovementLine>, ServiceError> {
        self.store.lines_by_item(item_id).await
    }

    #[instrument(skip(self), err)]
    pub async fn list_by_status(&self, status: LineStatus) -> Result<Vec<MovementLine>, ServiceError> {
        self.store.lines_by_status(status).await
    }

    /// Lines whose recorded quantity differs from the requested one.
    #[instrument(skip(self), err)]
    pub async fn list_with_variance(&self) -> Result<Vec<MovementLine>, ServiceError> {
        let lines = self.store.lines_with_actuals().await?;
        Ok(line_ledger::with_variance(&lines).into_iter().cloned().collect())
    }

    /// Lines picked short of the requested quantity.
    #[instrument(skip(self), err)]
    pub async fn list_short_picked(&self) -> Result<Vec<MovementLine>, ServiceError> {
        let lines = self.store.lines_with_actuals().await?;
        Ok(line_ledger::short_picked(&lines).into_iter().cloned().collect())
    }

    #[instrument(skip(self, line), err)]
    pub async fn add_to_movement(
        &self,
        movement_id: Uuid,
        line: NewMovementLine,
        actor_id: Uuid,
    ) -> Result<MovementLine, ServiceError> {
        require_actor(actor_id)?;
        validate_request(&line)?;

        let mut movement = self
            .store
            .find_by_id(movement_id)
            .await?
            .ok_or_else(|| ServiceError::movement_not_found(movement_id))?;
        movement_status::ensure_modifiable(movement.status)?;

        if movement.has_line_number(line.line_number) {
            return Err(ServiceError::ValidationFailed(vec![format!(
                "line_number {} already exists on movement {movement_id}",
                line.line_number
            )]));
        }

        let now = Utc::now();
        let new_line = MovementLine {
            id: Uuid::new_v4(),
            movement_id,
            item_id: line.item_id,
            requested_quantity: line.requested_quantity,
            actual_quantity: None,
            unit_of_measure: line.unit_of_measure.unwrap_or_else(|| "EA".to_string()),
            lot_number: line.lot_number,
            serial_number: line.serial_number,
            from_location_id: line.from_location_id,
            to_location_id: line.to_location_id,
            status: LineStatus::Pending,
            line_number: line.line_number,
            notes: line.notes,
            reason: None,
            created_at: now,
            updated_at: now,
        };
        let line_id = new_line.id;
        movement.lines.push(new_line);
        movement.updated_at = now;

        let expected = movement.version;
        let saved = self.store.save(movement, expected).await?;
        info!(movement_id = %movement_id, line_id = %line_id, "line added");

        saved
            .line(line_id)
            .cloned()
            .ok_or_else(|| ServiceError::line_not_found(line_id))
    }

    #[instrument(skip(self, patch), err)]
    pub async fn update(
        &self,
        line_id: Uuid,
        patch: LinePatch,
        actor_id: Uuid,
    ) -> Result<MovementLine, ServiceError> {
        require_actor(actor_id)?;
        let mut movement = self.load_owner(line_id).await?;
        movement_status::ensure_modifiable(movement.status)?;

        let now = Utc::now();
        {
            let line = movement
                .line_mut(line_id)
                .ok_or_else(|| ServiceError::line_not_found(line_id))?;

            if let Some(quantity) = patch.requested_quantity {
                if line.status != LineStatus::Pending {
                    return Err(ServiceError::ValidationFailed(vec![format!(
                        "requested_quantity can only change while the line is PENDING (line {line_id} is {})",
                        line.status
                    )]));
                }
                if quantity <= Decimal::ZERO {
                    return Err(ServiceError::ValidationFailed(vec![
                        "requested_quantity must be greater than zero".to_string(),
                    ]));
                }
                line.requested_quantity = quantity;
            }
            if let Some(value) = patch.unit_of_measure {
                line.unit_of_measure = value;
            }
            if let Some(value) = patch.lot_number {
                line.lot_number = Some(value);
            }
            if let Some(value) = patch.serial_number {
                line.serial_number = Some(value);
            }
            if let Some(value) = patch.from_location_id {
                line.from_location_id = Some(value);
            }
            if let Some(value) = patch.to_location_id {
                line.to_location_id = Some(value);
            }
            if let Some(value) = patch.notes {
                line.notes = Some(value);
            }
            if let Some(value) = patch.reason {
                line.reason = Some(value);
            }
            line.updated_at = now;
        }
        movement.updated_at = now;

        let expected = movement.version;
        let saved = self.store.save(movement, expected).await?;
        saved
            .line(line_id)
            .cloned()
            .ok_or_else(|| ServiceError::line_not_found(line_id))
    }

    #[instrument(skip(self), err)]
    pub async fn delete(&self, line_id: Uuid, actor_id: Uuid) -> Result<(), ServiceError> {
        require_actor(actor_id)?;
        let mut movement = self.load_owner(line_id).await?;
        movement_status::ensure_modifiable(movement.status)?;

        let line = movement
            .line(line_id)
            .ok_or_else(|| ServiceError::line_not_found(line_id))?;
        if line.status == LineStatus::Completed {
            return Err(ServiceError::ValidationFailed(vec![format!(
                "line {line_id} is COMPLETED and cannot be deleted"
            )]));
        }

        movement.lines.retain(|l| l.id != line_id);
        movement.updated_at = Utc::now();

        let expected = movement.version;
        self.store.save(movement, expected).await?;
        info!(line_id = %line_id, "line deleted");
        Ok(())
    }

    /// Records the observed quantity on a line.
    #[instrument(skip(self), err)]
    pub async fn update_actual_quantity(
        &self,
        line_id: Uuid,
        quantity: Decimal,
        actor_id: Uuid,
    ) -> Result<MovementLine, ServiceError> {
        require_actor(actor_id)?;
        if quantity < Decimal::ZERO {
            return Err(ServiceError::ValidationFailed(vec![
                "actual_quantity cannot be negative".to_string(),
            ]));
        }

        let mut movement = self.load_owner(line_id).await?;
        movement_status::ensure_modifiable(movement.status)?;

        let now = Utc::now();
        let line = movement
            .line_mut(line_id)
            .ok_or_else(|| ServiceError::line_not_found(line_id))?;
        line_ledger::update_actual_quantity(line, quantity, now);
        movement.updated_at = now;

        let expected = movement.version;
        let saved = self.store.save(movement, expected).await?;
        saved
            .line(line_id)
            .cloned()
            .ok_or_else(|| ServiceError::line_not_found(line_id))
    }

    /// Marks a line completed. Completing an already completed line is a
    /// deterministic no-op: the aggregate is returned unchanged and nothing
    /// is written.
    #[instrument(skip(self), err)]
    pub async fn complete(
        &self,
        line_id: Uuid,
        actor_id: Uuid,
    ) -> Result<MovementLine, ServiceError> {
        require_actor(actor_id)?;
        let mut movement = self.load_owner(line_id).await?;
        movement_status::ensure_modifiable(movement.status)?;

        let now = Utc::now();
        let line = movement
            .line_mut(line_id)
            .ok_or_else(|| ServiceError::line_not_found(line_id))?;
        let changed = line_ledger::complete_line(line, now);
        let snapshot = line.clone();

        if !changed {
            return Ok(snapshot);
        }

        movement.updated_at = now;
        let expected = movement.version;
        let saved = self.store.save(movement, expected).await?;
        info!(line_id = %line_id, "line completed");
        saved
            .line(line_id)
            .cloned()
            .ok_or_else(|| ServiceError::line_not_found(line_id))
    }
}
