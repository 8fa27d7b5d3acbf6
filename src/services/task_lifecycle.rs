//! Per-task state transitions. Each function checks the task's current
//! status, mutates it in place, and stamps the relevant timestamps; illegal
//! calls fail with `InvalidTaskTransition` naming the attempted action.

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::errors::ServiceError;
use crate::models::movement_task::{MovementTask, TaskAction, TaskStatus};

fn rejected(task: &MovementTask, attempted: TaskAction) -> ServiceError {
    ServiceError::InvalidTaskTransition {
        task_id: task.id,
        current: task.status,
        attempted,
    }
}

/// PENDING -> ASSIGNED, recording the assignee.
pub fn assign(task: &mut MovementTask, user_id: Uuid, now: DateTime<Utc>) -> Result<(), ServiceError> {
    if task.status != TaskStatus::Pending {
        return Err(rejected(task, TaskAction::Assign));
    }
    task.status = TaskStatus::Assigned;
    task.assigned_user_id = Some(user_id);
    task.updated_at = now;
    Ok(())
}

/// ASSIGNED -> PENDING, clearing the assignee.
pub fn unassign(task: &mut MovementTask, now: DateTime<Utc>) -> Result<(), ServiceError> {
    if task.status != TaskStatus::Assigned {
        return Err(rejected(task, TaskAction::Unassign));
    }
    task.status = TaskStatus::Pending;
    task.assigned_user_id = None;
    task.updated_at = now;
    Ok(())
}

/// PENDING or ASSIGNED -> IN_PROGRESS, stamping the actual start time.
pub fn start(task: &mut MovementTask, now: DateTime<Utc>) -> Result<(), ServiceError> {
    if !matches!(task.status, TaskStatus::Pending | TaskStatus::Assigned) {
        return Err(rejected(task, TaskAction::Start));
    }
    task.status = TaskStatus::InProgress;
    task.actual_start_time = Some(now);
    task.updated_at = now;
    Ok(())
}

/// IN_PROGRESS -> COMPLETED. Returns the worked duration when an actual
/// start time was recorded; `None` otherwise.
pub fn complete(task: &mut MovementTask, now: DateTime<Utc>) -> Result<Option<Duration>, ServiceError> {
    if task.status != TaskStatus::InProgress {
        return Err(rejected(task, TaskAction::Complete));
    }
    task.status = TaskStatus::Completed;
    task.actual_completion_time = Some(now);
    task.updated_at = now;
    Ok(task.duration())
}

/// Any non-COMPLETED status -> CANCELLED, appending the reason to the notes.
pub fn cancel(task: &mut MovementTask, reason: &str, now: DateTime<Utc>) -> Result<(), ServiceError> {
    if task.status == TaskStatus::Completed {
        return Err(rejected(task, TaskAction::Cancel));
    }
    task.status = TaskStatus::Cancelled;
    task.notes = match task.notes.take() {
        Some(notes) => Some(format!("{notes}\ncancelled: {reason}")),
        None => Some(format!("cancelled: {reason}")),
    };
    task.updated_at = now;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::movement::Priority;
    use crate::models::movement_task::TaskType;
    use assert_matches::assert_matches;
    use strum::IntoEnumIterator;

    fn task(status: TaskStatus) -> MovementTask {
        MovementTask {
            id: Uuid::new_v4(),
            movement_id: Uuid::new_v4(),
            movement_line_id: None,
            assigned_user_id: None,
            task_type: TaskType::Pick,
            status,
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
    fn assign_only_from_pending() {
        let user = Uuid::new_v4();
        for status in TaskStatus::iter() {
            let mut t = task(status);
            let result = assign(&mut t, user, Utc::now());
            if status == TaskStatus::Pending {
                result.unwrap();
                assert_eq!(t.status, TaskStatus::Assigned);
                assert_eq!(t.assigned_user_id, Some(user));
            } else {
                assert_matches!(
                    result,
                    Err(ServiceError::InvalidTaskTransition { attempted: TaskAction::Assign, .. })
                );
            }
        }
    }

    #[test]
    fn unassign_only_from_assigned() {
        let mut t = task(TaskStatus::Assigned);
        t.assigned_user_id = Some(Uuid::new_v4());
        unassign(&mut t, Utc::now()).unwrap();
        assert_eq!(t.status, TaskStatus::Pending);
        assert_eq!(t.assigned_user_id, None);

        let mut t = task(TaskStatus::InProgress);
        assert_matches!(
            unassign(&mut t, Utc::now()),
            Err(ServiceError::InvalidTaskTransition { attempted: TaskAction::Unassign, .. })
        );
    }

    #[test]
    fn start_from_pending_or_assigned_stamps_start_time() {
        for status in [TaskStatus::Pending, TaskStatus::Assigned] {
            let mut t = task(status);
            let now = Utc::now();
            start(&mut t, now).unwrap();
            assert_eq!(t.status, TaskStatus::InProgress);
            assert_eq!(t.actual_start_time, Some(now));
        }

        let mut t = task(TaskStatus::Completed);
        assert_matches!(
            start(&mut t, Utc::now()),
            Err(ServiceError::InvalidTaskTransition { attempted: TaskAction::Start, .. })
        );
    }

    #[test]
    fn complete_yields_duration_when_started() {
        let started = Utc::now();
        let mut t = task(TaskStatus::InProgress);
        t.actual_start_time = Some(started);

        let finished = started + Duration::minutes(30);
        let duration = complete(&mut t, finished).unwrap();
        assert_eq!(duration, Some(Duration::minutes(30)));
        assert_eq!(t.status, TaskStatus::Completed);
        assert_eq!(t.actual_completion_time, Some(finished));
    }

    #[test]
    fn complete_without_start_time_yields_no_duration() {
        let mut t = task(TaskStatus::InProgress);
        let duration = complete(&mut t, Utc::now()).unwrap();
        assert_eq!(duration, None);
    }

    #[test]
    fn complete_only_from_in_progress() {
        for status in TaskStatus::iter().filter(|s| *s != TaskStatus::InProgress) {
            let mut t = task(status);
            assert_matches!(
                complete(&mut t, Utc::now()),
                Err(ServiceError::InvalidTaskTransition { attempted: TaskAction::Complete, .. })
            );
        }
    }

    #[test]
    fn cancel_from_any_non_completed_appends_reason() {
        for status in TaskStatus::iter().filter(|s| *s != TaskStatus::Completed) {
            let mut t = task(status);
            t.notes = Some("picked aisle 3".to_string());
            cancel(&mut t, "shift ended", Utc::now()).unwrap();
            assert_eq!(t.status, TaskStatus::Cancelled);
            assert_eq!(t.notes.as_deref(), Some("picked aisle 3\ncancelled: shift ended"));
        }

        let mut t = task(TaskStatus::Completed);
        assert_matches!(
            cancel(&mut t, "too late", Utc::now()),
            Err(ServiceError::InvalidTaskTransition { attempted: TaskAction::Cancel, .. })
        );
    }
}
