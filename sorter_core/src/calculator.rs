//! Chute-cart number arithmetic.
//!
//! All quantities are 1-based cart numbers on a ring of `total` carts:
//!
//!   result = ((base - 1) + (head - 1)) mod total + 1
//!
//! Shifting to 0-based before the modulo and back afterwards makes the
//! wraparound (head = 12, base = 90, total = 100 -> 1) fall out without
//! branching. `rem_euclid` keeps the residue non-negative for any inputs.
//!
//! Ranges are not validated here; the resolver checks them before calling.
//! A non-positive `total` has no ring, so the base is returned unchanged.

/// Cart number currently at a chute, given the ring length, the current head
/// cart number, and the chute's calibrated cart number at head one.
#[inline]
pub fn resolve(
    total_cart_count: i32,
    head_cart_number: i32,
    base_cart_number_at_head_one: i32,
) -> i32 {
    let total = i64::from(total_cart_count);
    if total <= 0 {
        // No ring to wrap around; the resolver never gets here unlocked.
        return base_cart_number_at_head_one;
    }
    let zero_based =
        (i64::from(base_cart_number_at_head_one) - 1) + (i64::from(head_cart_number) - 1);
    let reduced = zero_based.rem_euclid(total);
    i32::try_from(reduced + 1).unwrap_or(total_cart_count)
}

#[cfg(test)]
mod tests {
    use super::resolve;

    #[test]
    fn non_positive_total_returns_base() {
        assert_eq!(resolve(0, 5, 90), 90);
        assert_eq!(resolve(-10, 5, 90), 90);
        assert_eq!(resolve(i32::MIN, i32::MAX, i32::MAX), i32::MAX);
    }

    #[test]
    fn identity_at_head_one() {
        assert_eq!(resolve(100, 1, 90), 90);
        assert_eq!(resolve(100, 1, 1), 1);
        assert_eq!(resolve(100, 1, 100), 100);
    }

    #[test]
    fn advances_with_head() {
        assert_eq!(resolve(100, 5, 90), 94);
        assert_eq!(resolve(100, 5, 80), 84);
    }

    #[test]
    fn wraps_through_total() {
        assert_eq!(resolve(100, 11, 90), 100);
        assert_eq!(resolve(100, 12, 90), 1);
        assert_eq!(resolve(100, 100, 100), 99);
    }

    #[test]
    fn negative_intermediates_normalize() {
        // base 0 and head 0 are out of range but must still produce a residue in [1, total].
        assert_eq!(resolve(10, 0, 0), 9);
        assert_eq!(resolve(10, -25, 1), 5);
    }

    #[test]
    fn single_cart_ring_is_always_one() {
        for head in 1..5 {
            assert_eq!(resolve(1, head, 1), 1);
        }
    }
}
