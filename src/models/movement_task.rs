use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};
use uuid::Uuid;

use super::movement::Priority;

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
pub enum TaskStatus {
    Pending,
    Assigned,
    InProgress,
    Completed,
    Cancelled,
}

impl TaskStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Cancelled)
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
pub enum TaskType {
    Pick,
    PutAway,
    Pack,
    Count,
    Inspect,
    Load,
    Unload,
    Replenish,
}

/// Operations attempted against a task; used in transition errors so the
/// caller can tell which call was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[strum(serialize_all = "snake_case")]
pub enum TaskAction {
    Assign,
    Unassign,
    Start,
    Complete,
    Cancel,
    Update,
    Delete,
}

/// A unit of execution work within a movement, optionally tied to one line
/// and assignable to a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovementTask {
    pub id: Uuid,
    pub movement_id: Uuid,
    pub movement_line_id: Option<Uuid>,
    pub assigned_user_id: Option<Uuid>,
    pub task_type: TaskType,
    pub status: TaskStatus,
    pub priority: Priority,
    pub scheduled_start_time: Option<DateTime<Utc>>,
    pub actual_start_time: Option<DateTime<Utc>>,
    pub expected_completion_time: Option<DateTime<Utc>>,
    pub actual_completion_time: Option<DateTime<Utc>>,
    pub location_id: Option<Uuid>,
    pub instructions: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MovementTask {
    /// Elapsed work time; defined only once both actual timestamps are set.
    pub fn duration(&self) -> Option<Duration> {
        match (self.actual_start_time, self.actual_completion_time) {
            (Some(start), Some(end)) => Some(end - start),
            _ => None,
        }
    }

    /// A task is overdue when its expected completion has passed without an
    /// actual completion being recorded.
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        match (self.expected_completion_time, self.actual_completion_time) {
            (Some(expected), None) => now > expected,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task() -> MovementTask {
        MovementTask {
            id: Uuid::new_v4(),
            movement_id: Uuid::new_v4(),
            movement_line_id: None,
            assigned_user_id: None,
            task_type: TaskType::Pick,
            status: TaskStatus::Pending,
            priority: Priority::Normal,
            scheduled_start_time: None,
            actual_start_time: None,
            expected_completion_time: None,
            actual_completion_time: None,
            location_id: None,
            instructions: None,
            notes: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn duration_requires_both_timestamps() {
        let mut t = task();
        assert_eq!(t.duration(), None);

        let start = Utc::now();
        t.actual_start_time = Some(start);
        assert_eq!(t.duration(), None);

        t.actual_completion_time = Some(start + Duration::minutes(42));
        assert_eq!(t.duration(), Some(Duration::minutes(42)));
    }

    #[test]
    fn overdue_only_when_expected_passed_and_incomplete() {
        let now = Utc::now();
        let mut t = task();
        assert!(!t.is_overdue(now));

        t.expected_completion_time = Some(now - Duration::hours(1));
        assert!(t.is_overdue(now));

        t.actual_completion_time = Some(now);
        assert!(!t.is_overdue(now));

        t.actual_completion_time = None;
        t.expected_completion_time = Some(now + Duration::hours(1));
        assert!(!t.is_overdue(now));
    }
}
