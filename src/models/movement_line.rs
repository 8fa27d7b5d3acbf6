use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};
use uuid::Uuid;

/// Status of a single movement line. Only `Pending` and `Completed` are
/// exercised by the core today; the rest exist for downstream allocation and
/// transit tracking.
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
pub enum LineStatus {
    Pending,
    Allocated,
    InTransit,
    Completed,
    Cancelled,
}

/// One item-quantity instruction within a movement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovementLine {
    pub id: Uuid,
    pub movement_id: Uuid,
    pub item_id: Uuid,
    pub requested_quantity: Decimal,
    /// Recorded quantity; `None` until picked/counted.
    pub actual_quantity: Option<Decimal>,
    pub unit_of_measure: String,
    pub lot_number: Option<String>,
    pub serial_number: Option<String>,
    pub from_location_id: Option<Uuid>,
    pub to_location_id: Option<Uuid>,
    pub status: LineStatus,
    /// Unique within the owning movement.
    pub line_number: u32,
    pub notes: Option<String>,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MovementLine {
    /// actual − requested; undefined until an actual quantity is recorded.
    pub fn variance(&self) -> Option<Decimal> {
        self.actual_quantity.map(|actual| actual - self.requested_quantity)
    }

    pub fn has_variance(&self) -> bool {
        self.actual_quantity
            .map(|actual| actual != self.requested_quantity)
            .unwrap_or(false)
    }

    pub fn is_short_picked(&self) -> bool {
        self.actual_quantity
            .map(|actual| actual < self.requested_quantity)
            .unwrap_or(false)
    }
}
