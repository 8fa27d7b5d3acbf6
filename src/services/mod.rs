// Pure building blocks
pub mod line_ledger;
pub mod movement_status;
pub mod task_lifecycle;

// Orchestrating façades; the only components that mutate aggregate state
pub mod movement_lines;
pub mod movement_tasks;
pub mod movements;

pub use movement_lines::MovementLineService;
pub use movement_tasks::MovementTaskService;
pub use movements::MovementService;
