//! Leaderboard ordering and ranking.
//!
//! Items are ordered by ordinal score descending, then comparison count
//! descending, then id ascending. Ranks are 1-based and strictly increasing
//! per row, so tied items still get distinct, adjacent ranks.

use std::cmp::Ordering;
use std::ops::Range;

use crate::types::DbId;

/// The fields that decide an item's position on the leaderboard.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Standing {
    pub id: DbId,
    pub ordinal: f64,
    pub comparison_count: i32,
}

/// Total order used for the leaderboard.
pub fn compare_standings(a: &Standing, b: &Standing) -> Ordering {
    b.ordinal
        .total_cmp(&a.ordinal)
        .then(b.comparison_count.cmp(&a.comparison_count))
        .then(a.id.cmp(&b.id))
}

/// Sort `items` into leaderboard order and attach 1-based ranks.
pub fn rank_items<T, F>(mut items: Vec<T>, standing: F) -> Vec<(usize, T)>
where
    F: Fn(&T) -> Standing,
{
    items.sort_by(|a, b| compare_standings(&standing(a), &standing(b)));
    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| (index + 1, item))
        .collect()
}

/// Position of `rank` within `total` items as a 0-100 percentile.
///
/// Rank 1 is 100, the last rank is 0. A lone item is 100.
pub fn percentile(rank: usize, total: usize) -> f64 {
    if total <= 1 {
        return 100.0;
    }
    let above = (rank.saturating_sub(1)) as f64;
    let ratio = 1.0 - above / (total - 1) as f64;
    (ratio.clamp(0.0, 1.0) * 10_000.0).round() / 100.0
}

/// Index range for a 1-based `page` of `per_page` rows out of `total`.
///
/// Pages past the end yield an empty range.
pub fn page_range(page: i64, per_page: i64, total: usize) -> Range<usize> {
    let page = page.max(1) as usize;
    let per_page = per_page.max(1) as usize;
    let start = (page - 1).saturating_mul(per_page).min(total);
    let end = start.saturating_add(per_page).min(total);
    start..end
}
