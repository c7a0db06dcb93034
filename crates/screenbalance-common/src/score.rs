// Productivity Score
//
// A single signed percentage summarizing how the day's minutes were spent:
// category weights applied per minute, normalized by total minutes, scaled
// to [-100, 100].

use crate::types::AppUsageRecord;

/// Compute the productivity score for a set of usage records.
///
/// Returns 0 when no minutes have been recorded.
pub fn productivity_score(records: &[AppUsageRecord]) -> i32 {
    let total: f64 = records.iter().map(|r| r.minutes).sum();
    if total <= 0.0 {
        return 0;
    }

    let weighted: f64 =
        records.iter().map(|r| r.category.productivity_weight() * r.minutes).sum();

    ((weighted / total) * 100.0).round().clamp(-100.0, 100.0) as i32
}
