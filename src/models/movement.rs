use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};
use uuid::Uuid;

use super::movement_line::MovementLine;
use super::movement_task::MovementTask;

/// Lifecycle status of a movement.
///
/// The legal transition graph lives in [`crate::services::movement_status`];
/// this enum is only the vocabulary.
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
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum MovementStatus {
    Draft,
    Pending,
    InProgress,
    PartiallyCompleted,
    OnHold,
    Completed,
    Cancelled,
}

impl MovementStatus {
    /// Terminal statuses admit no further transition.
    pub fn is_terminal(self) -> bool {
        matches!(self, MovementStatus::Completed | MovementStatus::Cancelled)
    }
}

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
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum MovementType {
    Receipt,
    Shipment,
    Transfer,
    Adjustment,
    Return,
    Pick,
    PutAway,
    CycleCount,
    Damage,
    Scrap,
}

#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Priority {
    Low,
    #[default]
    Normal,
    High,
    Urgent,
}

/// A unit of stock relocation or adjustment: the aggregate root owning its
/// lines and tasks. Children carry their owning `movement_id` and are only
/// reachable through the aggregate; there are no back-pointers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Movement {
    pub id: Uuid,
    /// Caller-supplied business identifier; globally unique when present and
    /// immutable once set.
    pub reference_number: Option<String>,
    pub movement_type: MovementType,
    pub status: MovementStatus,
    pub priority: Priority,
    pub warehouse_id: Uuid,
    pub source_location_id: Option<Uuid>,
    pub destination_location_id: Option<Uuid>,
    pub assigned_user_id: Option<Uuid>,
    pub movement_date: Option<DateTime<Utc>>,
    pub expected_date: Option<DateTime<Utc>>,
    pub actual_date: Option<DateTime<Utc>>,
    pub scheduled_date: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub reason: Option<String>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Set together with `completed_by` iff status is `Completed`.
    pub completed_at: Option<DateTime<Utc>>,
    pub completed_by: Option<Uuid>,
    /// Optimistic-concurrency token, bumped by the store on every save.
    pub version: u64,
    pub lines: Vec<MovementLine>,
    pub tasks: Vec<MovementTask>,
}

impl Movement {
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Next free line number within this movement.
    pub fn next_line_number(&self) -> u32 {
        self.lines.iter().map(|l| l.line_number).max().unwrap_or(0) + 1
    }

    pub fn has_line_number(&self, line_number: u32) -> bool {
        self.lines.iter().any(|l| l.line_number == line_number)
    }

    pub fn line(&self, line_id: Uuid) -> Option<&MovementLine> {
        self.lines.iter().find(|l| l.id == line_id)
    }

    pub fn line_mut(&mut self, line_id: Uuid) -> Option<&mut MovementLine> {
        self.lines.iter_mut().find(|l| l.id == line_id)
    }

    pub fn task(&self, task_id: Uuid) -> Option<&MovementTask> {
        self.tasks.iter().find(|t| t.id == task_id)
    }

    pub fn task_mut(&mut self, task_id: Uuid) -> Option<&mut MovementTask> {
        self.tasks.iter_mut().find(|t| t.id == task_id)
    }
}
