//! Movement status transition validation. Pure functions: the orchestrator
//! consults these before mutating any aggregate.

use crate::errors::ServiceError;
use crate::models::movement::MovementStatus;

/// Whether the transition graph admits `current -> requested`.
pub fn is_valid_transition(current: MovementStatus, requested: MovementStatus) -> bool {
    use MovementStatus::*;
    matches!(
        (current, requested),
        (Draft, Pending)
            | (Draft, Cancelled)
            | (Pending, InProgress)
            | (Pending, OnHold)
            | (Pending, Cancelled)
            | (InProgress, Completed)
            | (InProgress, PartiallyCompleted)
            | (InProgress, OnHold)
            | (InProgress, Cancelled)
            | (PartiallyCompleted, Completed)
            | (PartiallyCompleted, InProgress)
            | (PartiallyCompleted, Cancelled)
            | (OnHold, Pending)
            | (OnHold, InProgress)
            | (OnHold, Cancelled)
    )
}

pub fn ensure_transition(
    current: MovementStatus,
    requested: MovementStatus,
) -> Result<(), ServiceError> {
    if is_valid_transition(current, requested) {
        Ok(())
    } else {
        Err(ServiceError::InvalidTransition { current, requested })
    }
}

/// Movements are deletable only before they have been released into
/// execution, or after cancellation.
pub fn can_delete(status: MovementStatus) -> bool {
    matches!(status, MovementStatus::Draft | MovementStatus::Cancelled)
}

/// Header and line mutations are forbidden once the movement is terminal.
pub fn ensure_modifiable(current: MovementStatus) -> Result<(), ServiceError> {
    if current.is_terminal() {
        return Err(ServiceError::InvalidTransition {
            current,
            requested: current,
        });
    }
    Ok(())
}
