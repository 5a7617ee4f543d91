use chrono::{DateTime, Duration, Utc};

use crate::model::snapshot::DueDate;

/// Whether a due date lies beyond the hide-future horizon.
///
/// A horizon of 0 disables gating. A due date exactly at `now + horizon`
/// is still eligible. A horizon reaching past the representable date range
/// gates nothing.
pub fn is_gated(due: Option<&DueDate>, now: DateTime<Utc>, horizon_days: u32) -> bool {
    if horizon_days == 0 {
        return false;
    }
    let Some(due) = due else {
        return false;
    };
    match Duration::try_days(i64::from(horizon_days)).and_then(|h| now.checked_add_signed(h)) {
        Some(limit) => due.instant() > limit,
        None => false,
    }
}
