//! Ordering of results by a significance column.

use std::cmp::Ordering;

/// Ascending order with NaN after every number.
pub fn nan_last(a: f64, b: f64) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => a.total_cmp(&b),
    }
}

/// Indices of `keys` in ranked order. Ties keep input order.
pub fn rank_indices(keys: &[f64]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..keys.len()).collect();
    // sort_by is stable
    order.sort_by(|&a, &b| nan_last(keys[a], keys[b]));
    order
}

/// Sort `items` in place by `key`, ascending, NaN last, stable.
pub fn rank_by<T, F>(items: &mut [T], key: F)
where
    F: Fn(&T) -> f64,
{
    items.sort_by(|a, b| nan_last(key(a), key(b)));
}
