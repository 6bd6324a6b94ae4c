//! A small workload that panics on purpose.

/// Per-item share of `total` across the positive entries of `items`
#[inline(never)]
pub fn share(total: i32, items: &[i32]) -> i32 {
    total / positive_count(items)
}

#[inline(never)]
fn positive_count(items: &[i32]) -> i32 {
    let count = items.iter().filter(|item| **item > 0).count();
    i32::try_from(count).unwrap_or(i32::MAX)
}
