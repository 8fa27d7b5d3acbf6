pub mod movement;
pub mod movement_line;
pub mod movement_task;
pub mod requests;

pub use movement::{Movement, MovementStatus, MovementType, Priority};
pub use movement_line::{LineStatus, MovementLine};
pub use movement_task::{MovementTask, TaskAction, TaskStatus, TaskType};
pub use requests::{
    CreateMovementRequest, LinePatch, MovementPatch, NewMovementLine, NewMovementTask, TaskPatch,
};
