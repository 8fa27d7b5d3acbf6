use thiserror::Error;
use uuid::Uuid;

use crate::models::movement::MovementStatus;
use crate::models::movement_task::{TaskAction, TaskStatus};

/// Failure taxonomy of the movement core. Every service operation returns
/// one of these synchronously; the core performs no retries. Event-publish
/// failures are the sole exception: they are logged and swallowed because
/// delivery is best-effort and must never undo a committed write.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("not found: {0}")]
    NotFound(String),

    /// All structural violations of a request, collected rather than
    /// fail-fast.
    #[error("validation failed: {}", .0.join("; "))]
    ValidationFailed(Vec<String>),

    /// The movement's current status does not permit the requested change.
    /// For guarded operations that change no status (delete, header/line
    /// edits on a terminal movement) `requested` equals `current`.
    #[error("movement status {current} does not permit the requested change (to {requested})")]
    InvalidTransition {
        current: MovementStatus,
        requested: MovementStatus,
    },

    #[error("task {task_id}: cannot {attempted} while {current}")]
    InvalidTaskTransition {
        task_id: Uuid,
        current: TaskStatus,
        attempted: TaskAction,
    },

    #[error("reference number already in use: {0}")]
    DuplicateReference(String),

    #[error("concurrent modification of movement {id}: expected version {expected}, found {actual}")]
    ConcurrencyConflict { id: Uuid, expected: u64, actual: u64 },

    /// Opaque store error; never interpreted by the core.
    #[error("persistence failure: {0}")]
    PersistenceFailure(String),
}

impl ServiceError {
    pub fn movement_not_found(id: Uuid) -> Self {
        ServiceError::NotFound(format!("movement {id} not found"))
    }

    pub fn line_not_found(id: Uuid) -> Self {
        ServiceError::NotFound(format!("movement line {id} not found"))
    }

    pub fn task_not_found(id: Uuid) -> Self {
        ServiceError::NotFound(format!("movement task {id} not found"))
    }
}
