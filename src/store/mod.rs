//! Aggregate store contract. The core has no knowledge of SQL or wire
//! formats; persistence is an injected implementation of [`MovementStore`].
//! A movement is always loaded and saved whole, lines and tasks included.

pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::common::{Page, PageRequest};
use crate::errors::ServiceError;
use crate::models::movement::{Movement, MovementStatus, MovementType};
use crate::models::movement_line::{LineStatus, MovementLine};
use crate::models::movement_task::{MovementTask, TaskStatus};

pub use memory::InMemoryMovementStore;

/// Filter for the paginated movement query. All criteria are conjunctive;
/// `search` matches reference number, notes, and reason case-insensitively.
/// The date range applies to the movement date, falling back to the creation
/// timestamp for movements without one.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MovementFilter {
    pub warehouse_id: Option<Uuid>,
    pub status: Option<MovementStatus>,
    pub movement_type: Option<MovementType>,
    pub date_from: Option<DateTime<Utc>>,
    pub date_to: Option<DateTime<Utc>>,
    pub search: Option<String>,
}

impl MovementFilter {
    pub fn matches(&self, movement: &Movement) -> bool {
        if let Some(warehouse_id) = self.warehouse_id {
            if movement.warehouse_id != warehouse_id {
                return false;
            }
        }
        if let Some(status) = self.status {
            if movement.status != status {
                return false;
            }
        }
        if let Some(movement_type) = self.movement_type {
            if movement.movement_type != movement_type {
                return false;
            }
        }
        let effective_date = movement.movement_date.unwrap_or(movement.created_at);
        if let Some(from) = self.date_from {
            if effective_date < from {
                return false;
            }
        }
        if let Some(to) = self.date_to {
            if effective_date > to {
                return false;
            }
        }
        if let Some(search) = &self.search {
            let needle = search.to_lowercase();
            let haystacks = [
                movement.reference_number.as_deref(),
                movement.notes.as_deref(),
                movement.reason.as_deref(),
            ];
            if !haystacks
                .iter()
                .flatten()
                .any(|text| text.to_lowercase().contains(&needle))
            {
                return false;
            }
        }
        true
    }
}

/// Persistence contract for the movement aggregate.
///
/// `save` is version-checked: the caller passes the version it read and the
/// store must reject a stale write with `ConcurrencyConflict`. `insert` and
/// `save` both enforce reference-number uniqueness.
#[async_trait]
pub trait MovementStore: Send + Sync {
    /// Persists a new aggregate; the stored version starts at 1.
    async fn insert(&self, movement: Movement) -> Result<Movement, ServiceError>;

    /// Replaces the whole aggregate iff the stored version still equals
    /// `expected_version`; returns the aggregate with its bumped version.
    async fn save(&self, movement: Movement, expected_version: u64)
        -> Result<Movement, ServiceError>;

    async fn delete(&self, id: Uuid) -> Result<(), ServiceError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Movement>, ServiceError>;
    async fn find_by_reference(&self, reference: &str) -> Result<Option<Movement>, ServiceError>;
    async fn reference_exists(&self, reference: &str) -> Result<bool, ServiceError>;

    async fn query(
        &self,
        filter: &MovementFilter,
        page: &PageRequest,
    ) -> Result<Page<Movement>, ServiceError>;

    async fn count_by_status(
        &self,
        warehouse_id: Option<Uuid>,
    ) -> Result<Vec<(MovementStatus, u64)>, ServiceError>;

    /// Resolves the aggregate owning the given line.
    async fn find_by_line(&self, line_id: Uuid) -> Result<Option<Movement>, ServiceError>;
    /// Resolves the aggregate owning the given task.
    async fn find_by_task(&self, task_id: Uuid) -> Result<Option<Movement>, ServiceError>;

    async fn lines_by_item(&self, item_id: Uuid) -> Result<Vec<MovementLine>, ServiceError>;
    async fn lines_by_status(&self, status: LineStatus) -> Result<Vec<MovementLine>, ServiceError>;
    /// Lines with a recorded actual quantity; the variance/short-pick
    /// classification on top is the line ledger's concern.
    async fn lines_with_actuals(&self) -> Result<Vec<MovementLine>, ServiceError>;

    async fn tasks_by_assignee(&self, user_id: Uuid) -> Result<Vec<MovementTask>, ServiceError>;
    async fn tasks_by_status(&self, status: TaskStatus) -> Result<Vec<MovementTask>, ServiceError>;
    async fn unassigned_tasks(&self) -> Result<Vec<MovementTask>, ServiceError>;
    /// Tasks with no recorded completion, regardless of status.
    async fn open_tasks(&self) -> Result<Vec<MovementTask>, ServiceError>;
    /// Tasks scheduled to start within [start, end).
    async fn tasks_scheduled_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<MovementTask>, ServiceError>;
}
