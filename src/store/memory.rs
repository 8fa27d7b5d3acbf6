//! DashMap-backed reference implementation of the store contract, used by
//! the test suite and by embedders that do not need durable persistence.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use strum::IntoEnumIterator;
use uuid::Uuid;

use crate::common::{Page, PageRequest};
use crate::errors::ServiceError;
use crate::models::movement::{Movement, MovementStatus};
use crate::models::movement_line::{LineStatus, MovementLine};
use crate::models::movement_task::{MovementTask, TaskStatus};

use super::{MovementFilter, MovementStore};

#[derive(Debug, Default)]
pub struct InMemoryMovementStore {
    movements: DashMap<Uuid, Movement>,
    // reference number -> movement id
    references: DashMap<String, Uuid>,
}

impl InMemoryMovementStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn claim_reference(&self, reference: &str, id: Uuid) -> Result<(), ServiceError> {
        let entry = self.references.entry(reference.to_string()).or_insert(id);
        if *entry != id {
            return Err(ServiceError::DuplicateReference(reference.to_string()));
        }
        Ok(())
    }

    fn snapshot(&self) -> Vec<Movement> {
        self.movements.iter().map(|entry| entry.value().clone()).collect()
    }
}

#[async_trait]
impl MovementStore for InMemoryMovementStore {
    async fn insert(&self, mut movement: Movement) -> Result<Movement, ServiceError> {
        if let Some(reference) = movement.reference_number.clone() {
            self.claim_reference(&reference, movement.id)?;
        }
        movement.version = 1;
        self.movements.insert(movement.id, movement.clone());
        Ok(movement)
    }

    async fn save(
        &self,
        mut movement: Movement,
        expected_version: u64,
    ) -> Result<Movement, ServiceError> {
        let mut entry = self
            .movements
            .get_mut(&movement.id)
            .ok_or_else(|| ServiceError::movement_not_found(movement.id))?;
        if entry.version != expected_version {
            return Err(ServiceError::ConcurrencyConflict {
                id: movement.id,
                expected: expected_version,
                actual: entry.version,
            });
        }
        // Claim only once the write is known to go through; a rejected save
        // must not leave the reference taken.
        if let Some(reference) = movement.reference_number.clone() {
            self.claim_reference(&reference, movement.id)?;
        }
        movement.version = expected_version + 1;
        *entry = movement.clone();
        Ok(movement)
    }

    async fn delete(&self, id: Uuid) -> Result<(), ServiceError> {
        let (_, movement) = self
            .movements
            .remove(&id)
            .ok_or_else(|| ServiceError::movement_not_found(id))?;
        if let Some(reference) = movement.reference_number {
            self.references.remove(&reference);
        }
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Movement>, ServiceError> {
        Ok(self.movements.get(&id).map(|entry| entry.value().clone()))
    }

    async fn find_by_reference(&self, reference: &str) -> Result<Option<Movement>, ServiceError> {
        match self.references.get(reference) {
            Some(id) => self.find_by_id(*id).await,
            None => Ok(None),
        }
    }

    async fn reference_exists(&self, reference: &str) -> Result<bool, ServiceError> {
        Ok(self.references.contains_key(reference))
    }

    async fn query(
        &self,
        filter: &MovementFilter,
        page: &PageRequest,
    ) -> Result<Page<Movement>, ServiceError> {
        let mut matched: Vec<Movement> = self
            .snapshot()
            .into_iter()
            .filter(|m| filter.matches(m))
            .collect();
        // Newest first, stable across pages.
        matched.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));

        let total = matched.len() as u64;
        let items = matched
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.per_page as usize)
            .collect();
        Ok(Page {
            items,
            total,
            page: page.page,
            per_page: page.per_page,
        })
    }

    async fn count_by_status(
        &self,
        warehouse_id: Option<Uuid>,
    ) -> Result<Vec<(MovementStatus, u64)>, ServiceError> {
        let movements = self.snapshot();
        let counts = MovementStatus::iter()
            .map(|status| {
                let count = movements
                    .iter()
                    .filter(|m| m.status == status)
                    .filter(|m| warehouse_id.map(|w| m.warehouse_id == w).unwrap_or(true))
                    .count() as u64;
                (status, count)
            })
            .collect();
        Ok(counts)
    }

    async fn find_by_line(&self, line_id: Uuid) -> Result<Option<Movement>, ServiceError> {
        Ok(self
            .snapshot()
            .into_iter()
            .find(|m| m.lines.iter().any(|l| l.id == line_id)))
    }

    async fn find_by_task(&self, task_id: Uuid) -> Result<Option<Movement>, ServiceError> {
        Ok(self
            .snapshot()
            .into_iter()
            .find(|m| m.tasks.iter().any(|t| t.id == task_id)))
    }

    async fn lines_by_item(&self, item_id: Uuid) -> Result<Vec<MovementLine>, ServiceError> {
        Ok(self
            .snapshot()
            .into_iter()
            .flat_map(|m| m.lines)
            .filter(|l| l.item_id == item_id)
            .collect())
    }

    async fn lines_by_status(&self, status: LineStatus) -> Result<Vec<MovementLine>, ServiceError> {
        Ok(self
            .snapshot()
            .into_iter()
            .flat_map(|m| m.lines)
            .filter(|l| l.status == status)
            .collect())
    }

    async fn lines_with_actuals(&self) -> Result<Vec<MovementLine>, ServiceError> {
        Ok(self
            .snapshot()
            .into_iter()
            .flat_map(|m| m.lines)
            .filter(|l| l.actual_quantity.is_some())
            .collect())
    }

    async fn tasks_by_assignee(&self, user_id: Uuid) -> Result<Vec<MovementTask>, ServiceError> {
        Ok(self
            .snapshot()
            .into_iter()
            .flat_map(|m| m.tasks)
            .filter(|t| t.assigned_user_id == Some(user_id))
            .collect())
    }

    async fn tasks_by_status(&self, status: TaskStatus) -> Result<Vec<MovementTask>, ServiceError> {
        Ok(self
            .snapshot()
            .into_iter()
            .flat_map(|m| m.tasks)
            .filter(|t| t.status == status)
            .collect())
    }

    async fn unassigned_tasks(&self) -> Result<Vec<MovementTask>, ServiceError> {
        Ok(self
            .snapshot()
            .into_iter()
            .flat_map(|m| m.tasks)
            .filter(|t| t.assigned_user_id.is_none() && !t.status.is_terminal())
            .collect())
    }

    async fn open_tasks(&self) -> Result<Vec<MovementTask>, ServiceError> {
        Ok(self
            .snapshot()
            .into_iter()
            .flat_map(|m| m.tasks)
            .filter(|t| t.actual_completion_time.is_none())
            .collect())
    }

    async fn tasks_scheduled_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<MovementTask>, ServiceError> {
        Ok(self
            .snapshot()
            .into_iter()
            .flat_map(|m| m.tasks)
            .filter(|t| {
                t.scheduled_start_time
                    .map(|s| s >= start && s < end)
                    .unwrap_or(false)
            })
            .collect())
    }
}
