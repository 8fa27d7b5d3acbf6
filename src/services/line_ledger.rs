//! Derived completion and variance bookkeeping over a movement's lines.
//! Everything here is recomputed on demand from the lines themselves; the
//! aggregate stores no redundant counters.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::models::movement_line::{LineStatus, MovementLine};

pub fn total_lines(lines: &[MovementLine]) -> u32 {
    lines.len() as u32
}

pub fn completed_lines(lines: &[MovementLine]) -> u32 {
    lines.iter().filter(|l| l.status == LineStatus::Completed).count() as u32
}

pub fn with_variance(lines: &[MovementLine]) -> Vec<&MovementLine> {
    lines.iter().filter(|l| l.has_variance()).collect()
}

pub fn short_picked(lines: &[MovementLine]) -> Vec<&MovementLine> {
    lines.iter().filter(|l| l.is_short_picked()).collect()
}

/// Records the observed quantity on a line.
pub fn update_actual_quantity(line: &mut MovementLine, quantity: Decimal, now: DateTime<Utc>) {
    line.actual_quantity = Some(quantity);
    line.updated_at = now;
}

/// Marks a line completed. Completion is monotonic: completing an already
/// completed line is a no-op and the line is left untouched. Returns whether
/// the line changed.
pub fn complete_line(line: &mut MovementLine, now: DateTime<Utc>) -> bool {
    if line.status == LineStatus::Completed {
        return false;
    }
    line.status = LineStatus::Completed;
    line.updated_at = now;
    true
}
