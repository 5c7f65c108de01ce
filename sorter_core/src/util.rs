//! Small numeric helpers shared by the resolver and the self-check services.

/// Shortest distance between two positions on a ring of `len` slots.
///
/// Inputs outside `[0, len)` are reduced first. Returns 0 for `len <= 0`.
#[inline]
pub fn ring_distance(a: i64, b: i64, len: i64) -> i64 {
    if len <= 0 {
        return 0;
    }
    let d = (a.rem_euclid(len) - b.rem_euclid(len)).abs();
    d.min(len - d)
}

/// Median of a sample set; averages the two middle values for even counts.
/// Returns `None` for an empty set. NaNs must be filtered out by the caller.
pub fn median(samples: &mut [f64]) -> Option<f64> {
    if samples.is_empty() {
        return None;
    }
    samples.sort_by(f64::total_cmp);
    let mid = samples.len() / 2;
    if samples.len() % 2 == 0 {
        Some((samples[mid - 1] + samples[mid]) / 2.0)
    } else {
        Some(samples[mid])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ring_distance_takes_short_arc() {
        assert_eq!(ring_distance(1, 99, 100), 2);
        assert_eq!(ring_distance(99, 1, 100), 2);
        assert_eq!(ring_distance(10, 40, 100), 30);
        assert_eq!(ring_distance(0, 50, 100), 50);
    }

    #[test]
    fn ring_distance_reduces_out_of_range_inputs() {
        assert_eq!(ring_distance(105, 5, 100), 0);
        assert_eq!(ring_distance(-1, 0, 100), 1);
        assert_eq!(ring_distance(3, 7, 0), 0);
    }

    #[test]
    fn median_odd_even_and_empty() {
        assert_eq!(median(&mut []), None);
        assert_eq!(median(&mut [3.0, 1.0, 2.0]), Some(2.0));
        assert_eq!(median(&mut [4.0, 1.0, 3.0, 2.0]), Some(2.5));
        // A single outlier does not move the median.
        assert_eq!(median(&mut [500.0, 501.0, 499.0, 9000.0, 500.0]), Some(500.0));
    }
}
