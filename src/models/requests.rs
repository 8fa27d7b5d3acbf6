use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use super::movement::{MovementStatus, MovementType, Priority};
use super::movement_task::TaskType;

/// Creation request for a movement together with its initial lines.
/// Violations are collected, not fail-fast; see [`crate::validation`].
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_create_movement", skip_on_field_errors = false))]
pub struct CreateMovementRequest {
    pub reference_number: Option<String>,
    pub movement_type: MovementType,
    /// Initial status; only DRAFT (the default) or PENDING are accepted.
    pub status: Option<MovementStatus>,
    pub priority: Option<Priority>,
    #[validate(custom = "non_nil_uuid")]
    pub warehouse_id: Uuid,
    pub source_location_id: Option<Uuid>,
    pub destination_location_id: Option<Uuid>,
    pub assigned_user_id: Option<Uuid>,
    pub movement_date: Option<DateTime<Utc>>,
    pub expected_date: Option<DateTime<Utc>>,
    pub scheduled_date: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub reason: Option<String>,
    #[validate]
    pub lines: Vec<NewMovementLine>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NewMovementLine {
    #[validate(custom = "non_nil_uuid")]
    pub item_id: Uuid,
    #[validate(custom = "positive_quantity")]
    pub requested_quantity: Decimal,
    pub unit_of_measure: Option<String>,
    pub lot_number: Option<String>,
    pub serial_number: Option<String>,
    pub from_location_id: Option<Uuid>,
    pub to_location_id: Option<Uuid>,
    #[validate(range(min = 1, message = "line_number must be present and positive"))]
    pub line_number: u32,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NewMovementTask {
    pub movement_line_id: Option<Uuid>,
    pub task_type: TaskType,
    pub priority: Option<Priority>,
    pub scheduled_start_time: Option<DateTime<Utc>>,
    pub expected_completion_time: Option<DateTime<Utc>>,
    pub location_id: Option<Uuid>,
    pub instructions: Option<String>,
}

/// Partial update of movement header fields. The status is never patched
/// here; status changes go through the lifecycle operations.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MovementPatch {
    /// Settable once; immutable afterwards.
    pub reference_number: Option<String>,
    pub priority: Option<Priority>,
    pub source_location_id: Option<Uuid>,
    pub destination_location_id: Option<Uuid>,
    pub assigned_user_id: Option<Uuid>,
    pub movement_date: Option<DateTime<Utc>>,
    pub expected_date: Option<DateTime<Utc>>,
    pub scheduled_date: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LinePatch {
    /// Only patchable while the line is still PENDING.
    pub requested_quantity: Option<Decimal>,
    pub unit_of_measure: Option<String>,
    pub lot_number: Option<String>,
    pub serial_number: Option<String>,
    pub from_location_id: Option<Uuid>,
    pub to_location_id: Option<Uuid>,
    pub notes: Option<String>,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskPatch {
    pub task_type: Option<TaskType>,
    pub priority: Option<Priority>,
    pub scheduled_start_time: Option<DateTime<Utc>>,
    pub expected_completion_time: Option<DateTime<Utc>>,
    pub location_id: Option<Uuid>,
    pub instructions: Option<String>,
    pub notes: Option<String>,
}

fn non_nil_uuid(id: &Uuid) -> Result<(), ValidationError> {
    if id.is_nil() {
        return Err(ValidationError::new("required"));
    }
    Ok(())
}

fn positive_quantity(quantity: &Decimal) -> Result<(), ValidationError> {
    if *quantity <= Decimal::ZERO {
        let mut err = ValidationError::new("positive_quantity");
        err.message = Some("requested_quantity must be greater than zero".into());
        return Err(err);
    }
    Ok(())
}

fn validate_create_movement(request: &CreateMovementRequest) -> Result<(), ValidationError> {
    if request.lines.is_empty() {
        let mut err = ValidationError::new("empty_lines");
        err.message = Some("at least one line is required".into());
        return Err(err);
    }

    if let Some(status) = request.status {
        if !matches!(status, MovementStatus::Draft | MovementStatus::Pending) {
            let mut err = ValidationError::new("initial_status");
            err.message = Some("initial status must be DRAFT or PENDING".into());
            return Err(err);
        }
    }

    let mut seen = std::collections::HashSet::new();
    for line in &request.lines {
        if !seen.insert(line.line_number) {
            let mut err = ValidationError::new("duplicate_line_number");
            err.message =
                Some(format!("line_number {} appears more than once", line.line_number).into());
            return Err(err);
        }
    }
    Ok(())
}
