//! # Trending merge
//! Pure, testable logic that merges repository lists from several sources
//! into one bounded ranking. No I/O, suitable for unit tests and reuse by
//! the search sources.
//!
//! Policy: first occurrence of a repo URL wins (even if a later source saw a
//! fresher star count), then a stable sort by stars descending, then the cap.

use std::collections::HashSet;

use crate::types::TrendingItem;

/// Default cap for the merged trending list.
pub const TRENDING_CAP: usize = 50;

pub fn merge_trending(lists: Vec<Vec<TrendingItem>>, cap: usize) -> Vec<TrendingItem> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut merged: Vec<TrendingItem> = Vec::new();

    for list in lists {
        for item in list {
            if seen.insert(item.repo_url.clone()) {
                merged.push(item);
            }
        }
    }

    // Stable: equal star counts keep their relative input order.
    merged.sort_by(|a, b| b.stars.cmp(&a.stars));
    merged.truncate(cap);
    merged
}
