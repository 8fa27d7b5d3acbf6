//! Task operations. Transition rules live in
//! [`crate::services::task_lifecycle`]; this façade wires them to the
//! aggregate store and the event emitter.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::common::day_bounds;
use crate::errors::ServiceError;
use crate::events::{EventEmitter, MovementEvent};
use crate::models::movement::Movement;
use crate::models::movement_task::{MovementTask, TaskAction, TaskStatus};
use crate::models::requests::{NewMovementTask, TaskPatch};
use crate::services::{movement_status, task_lifecycle};
use crate::store::MovementStore;
use crate::validation::require_actor;

#[derive(Clone)]
pub struct MovementTaskService {
    store: Arc<dyn MovementStore>,
    emitter: EventEmitter,
}

impl MovementTaskService {
    pub fn new(store: Arc<dyn MovementStore>, emitter: EventEmitter) -> Self {
        Self { store, emitter }
    }

    async fn load_owner(&self, task_id: Uuid) -> Result<Movement, ServiceError> {
        self.store
            .find_by_task(task_id)
            .await?
            .ok_or_else(|| ServiceError::task_not_found(task_id))
    }

    #[instrument(skip(self, task), err)]
    pub async fn create(
        &self,
        movement_id: Uuid,
        task: NewMovementTask,
        actor_id: Uuid,
    ) -> Result<MovementTask, ServiceError> {
        require_actor(actor_id)?;
        let mut movement = self
            .store
            .find_by_id(movement_id)
            .await?
            .ok_or_else(|| ServiceError::movement_not_found(movement_id))?;
        movement_status::ensure_modifiable(movement.status)?;

        if let Some(line_id) = task.movement_line_id {
            if movement.line(line_id).is_none() {
                return Err(ServiceError::ValidationFailed(vec![format!(
                    "line {line_id} does not belong to movement {movement_id}"
                )]));
            }
        }

        let now = Utc::now();
        let new_task = MovementTask {
            id: Uuid::new_v4(),
            movement_id,
            movement_line_id: task.movement_line_id,
            assigned_user_id: None,
            task_type: task.task_type,
            status: TaskStatus::Pending,
            priority: task.priority.unwrap_or_default(),
            scheduled_start_time: task.scheduled_start_time,
            actual_start_time: None,
            expected_completion_time: task.expected_completion_time,
            actual_completion_time: None,
            location_id: task.location_id,
            instructions: task.instructions,
            notes: None,
            created_at: now,
            updated_at: now,
        };
        let task_id = new_task.id;
        movement.tasks.push(new_task);
        movement.updated_at = now;

        let expected = movement.version;
        let saved = self.store.save(movement, expected).await?;
        info!(movement_id = %movement_id, task_id = %task_id, "task created");

        saved
            .task(task_id)
            .cloned()
            .ok_or_else(|| ServiceError::task_not_found(task_id))
    }

    #[instrument(skip(self), err)]
    pub async fn get_by_id(&self, task_id: Uuid) -> Result<MovementTask, ServiceError> {
        let movement = self.load_owner(task_id).await?;
        movement
            .task(task_id)
            .cloned()
            .ok_or_else(|| ServiceError::task_not_found(task_id))
    }

    #[instrument(skip(self), err)]
    pub async fn list_by_movement(&self, movement_id: Uuid) -> Result<Vec<MovementTask>, ServiceError> {
        let movement = self
            .store
            .find_by_id(movement_id)
            .await?
            .ok_or_else(|| ServiceError::movement_not_found(movement_id))?;
        Ok(movement.tasks)
    }

    #[instrument(skip(self), err)]
    pub async fn list_by_assignee(&self, user_id: Uuid) -> Result<Vec<MovementTask>, ServiceError> {
        self.store.tasks_by_assignee(user_id).await
    }

    #[instrument(skip(self), err)]
    pub async fn list_by_status(&self, status: TaskStatus) -> Result<Vec<MovementTask>, ServiceError> {
        self.store.tasks_by_status(status).await
    }

    #[instrument(skip(self), err)]
    pub async fn list_unassigned(&self) -> Result<Vec<MovementTask>, ServiceError> {
        self.store.unassigned_tasks().await
    }

    #[instrument(skip(self), err)]
    pub async fn assign(
        &self,
        task_id: Uuid,
        user_id: Uuid,
        actor_id: Uuid,
    ) -> Result<MovementTask, ServiceError> {
        require_actor(actor_id)?;
        let mut movement = self.load_owner(task_id).await?;
        movement_status::ensure_modifiable(movement.status)?;

        let now = Utc::now();
        let movement_id = movement.id;
        let task = movement
            .task_mut(task_id)
            .ok_or_else(|| ServiceError::task_not_found(task_id))?;
        task_lifecycle::assign(task, user_id, now)?;
        movement.updated_at = now;

        let expected = movement.version;
        let saved = self.store.save(movement, expected).await?;
        info!(task_id = %task_id, user_id = %user_id, "task assigned");

        self.emitter
            .emit(
                actor_id,
                MovementEvent::TaskAssigned {
                    task_id,
                    movement_id,
                    assigned_user_id: user_id,
                },
            )
            .await;
        saved
            .task(task_id)
            .cloned()
            .ok_or_else(|| ServiceError::task_not_found(task_id))
    }

    #[instrument(skip(self), err)]
    pub async fn unassign(&self, task_id: Uuid, actor_id: Uuid) -> Result<MovementTask, ServiceError> {
        require_actor(actor_id)?;
        let mut movement = self.load_owner(task_id).await?;
        movement_status::ensure_modifiable(movement.status)?;

        let now = Utc::now();
        let task = movement
            .task_mut(task_id)
            .ok_or_else(|| ServiceError::task_not_found(task_id))?;
        task_lifecycle::unassign(task, now)?;
        movement.updated_at = now;

        let expected = movement.version;
        let saved = self.store.save(movement, expected).await?;
        saved
            .task(task_id)
            .cloned()
            .ok_or_else(|| ServiceError::task_not_found(task_id))
    }

    #[instrument(skip(self), err)]
    pub async fn start(&self, task_id: Uuid, actor_id: Uuid) -> Result<MovementTask, ServiceError> {
        require_actor(actor_id)?;
        let mut movement = self.load_owner(task_id).await?;
        movement_status::ensure_modifiable(movement.status)?;

        let now = Utc::now();
        let task = movement
            .task_mut(task_id)
            .ok_or_else(|| ServiceError::task_not_found(task_id))?;
        task_lifecycle::start(task, now)?;
        movement.updated_at = now;

        let expected = movement.version;
        let saved = self.store.save(movement, expected).await?;
        info!(task_id = %task_id, "task started");
        saved
            .task(task_id)
            .cloned()
            .ok_or_else(|| ServiceError::task_not_found(task_id))
    }

    #[instrument(skip(self), err)]
    pub async fn complete(&self, task_id: Uuid, actor_id: Uuid) -> Result<MovementTask, ServiceError> {
        require_actor(actor_id)?;
        let mut movement = self.load_owner(task_id).await?;
        movement_status::ensure_modifiable(movement.status)?;

        let now = Utc::now();
        let movement_id = movement.id;
        let task = movement
            .task_mut(task_id)
            .ok_or_else(|| ServiceError::task_not_found(task_id))?;
        let duration = task_lifecycle::complete(task, now)?;
        movement.updated_at = now;

        let expected = movement.version;
        let saved = self.store.save(movement, expected).await?;
        info!(task_id = %task_id, "task completed");

        self.emitter
            .emit(
                actor_id,
                MovementEvent::TaskCompleted {
                    task_id,
                    movement_id,
                    duration_seconds: duration.map(|d| d.num_seconds()),
                },
            )
            .await;
        saved
            .task(task_id)
            .cloned()
            .ok_or_else(|| ServiceError::task_not_found(task_id))
    }

    #[instrument(skip(self), err)]
    pub async fn cancel(
        &self,
        task_id: Uuid,
        reason: &str,
        actor_id: Uuid,
    ) -> Result<MovementTask, ServiceError> {
        require_actor(actor_id)?;
        let mut movement = self.load_owner(task_id).await?;
        movement_status::ensure_modifiable(movement.status)?;

        let now = Utc::now();
        let task = movement
            .task_mut(task_id)
            .ok_or_else(|| ServiceError::task_not_found(task_id))?;
        task_lifecycle::cancel(task, reason, now)?;
        movement.updated_at = now;

        let expected = movement.version;
        let saved = self.store.save(movement, expected).await?;
        info!(task_id = %task_id, reason = %reason, "task cancelled");
        saved
            .task(task_id)
            .cloned()
            .ok_or_else(|| ServiceError::task_not_found(task_id))
    }

    #[instrument(skip(self, patch), err)]
    pub async fn update(
        &self,
        task_id: Uuid,
        patch: TaskPatch,
        actor_id: Uuid,
    ) -> Result<MovementTask, ServiceError> {
        require_actor(actor_id)?;
        let mut movement = self.load_owner(task_id).await?;
        movement_status::ensure_modifiable(movement.status)?;

        let now = Utc::now();
        {
            let task = movement
                .task_mut(task_id)
                .ok_or_else(|| ServiceError::task_not_found(task_id))?;
            if task.status.is_terminal() {
                return Err(ServiceError::InvalidTaskTransition {
                    task_id,
                    current: task.status,
                    attempted: TaskAction::Update,
                });
            }
            if let Some(value) = patch.task_type {
                task.task_type = value;
            }
            if let Some(value) = patch.priority {
                task.priority = value;
            }
            if let Some(value) = patch.scheduled_start_time {
                task.scheduled_start_time = Some(value);
            }
            if let Some(value) = patch.expected_completion_time {
                task.expected_completion_time = Some(value);
            }
            if let Some(value) = patch.location_id {
                task.location_id = Some(value);
            }
            if let Some(value) = patch.instructions {
                task.instructions = Some(value);
            }
            if let Some(value) = patch.notes {
                task.notes = Some(value);
            }
            task.updated_at = now;
        }
        movement.updated_at = now;

        let expected = movement.version;
        let saved = self.store.save(movement, expected).await?;
        saved
            .task(task_id)
            .cloned()
            .ok_or_else(|| ServiceError::task_not_found(task_id))
    }

    /// Tasks are deletable only before any work was recorded against them.
    #[instrument(skip(self), err)]
    pub async fn delete(&self, task_id: Uuid, actor_id: Uuid) -> Result<(), ServiceError> {
        require_actor(actor_id)?;
        let mut movement = self.load_owner(task_id).await?;
        movement_status::ensure_modifiable(movement.status)?;

        let task = movement
            .task(task_id)
            .ok_or_else(|| ServiceError::task_not_found(task_id))?;
        if !matches!(task.status, TaskStatus::Pending | TaskStatus::Cancelled) {
            return Err(ServiceError::InvalidTaskTransition {
                task_id,
                current: task.status,
                attempted: TaskAction::Delete,
            });
        }

        movement.tasks.retain(|t| t.id != task_id);
        movement.updated_at = Utc::now();

        let expected = movement.version;
        self.store.save(movement, expected).await?;
        info!(task_id = %task_id, "task deleted");
        Ok(())
    }

    /// Tasks whose expected completion has passed without completion.
    #[instrument(skip(self), err)]
    pub async fn list_overdue(
        &self,
        now: chrono::DateTime<Utc>,
    ) -> Result<Vec<MovementTask>, ServiceError> {
        let tasks = self.store.open_tasks().await?;
        Ok(tasks.into_iter().filter(|t| t.is_overdue(now)).collect())
    }

    /// Tasks scheduled to start on the given calendar day (UTC).
    #[instrument(skip(self), err)]
    pub async fn list_scheduled_for_day(
        &self,
        day: NaiveDate,
    ) -> Result<Vec<MovementTask>, ServiceError> {
        let (start, end) = day_bounds(day);
        self.store.tasks_scheduled_between(start, end).await
    }
}
