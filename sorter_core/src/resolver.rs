//! Cart-at-chute resolution.
//!
//! Answers "which cart number is at chute X right now" from the locked ring
//! length, the tracker's head position, and the chute's calibrated cart
//! number at head one. Every call reads a fresh ring snapshot and a fresh
//! chute lookup so hot-reloaded configuration is visible immediately.

use std::sync::Arc;

use sorter_traits::ChuteConfigSource;

use crate::calculator;
use crate::error::{InvalidReason, NotFoundReason, NotReadyReason, ResolveError};
use crate::ring::SharedRingConfig;
use crate::tracker::{CartPositionTracker, HeadPosition};

pub type SharedChuteSource = Arc<dyn ChuteConfigSource + Send + Sync>;

pub struct CartAtChuteResolver {
    ring: SharedRingConfig,
    tracker: Arc<CartPositionTracker>,
    chutes: SharedChuteSource,
}

impl core::fmt::Debug for CartAtChuteResolver {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CartAtChuteResolver")
            .field("ring", &self.ring.snapshot())
            .field("head", &self.tracker.head())
            .finish()
    }
}

impl CartAtChuteResolver {
    pub fn new(
        ring: SharedRingConfig,
        tracker: Arc<CartPositionTracker>,
        chutes: SharedChuteSource,
    ) -> Self {
        Self {
            ring,
            tracker,
            chutes,
        }
    }

    /// Cart number currently positioned at `chute_id`.
    ///
    /// Checks, in order: ring locked, head known, chute configured, chute
    /// base in `[1, total]`, head cart number in `[1, total]`.
    pub fn resolve_current_cart_number_for_chute(
        &self,
        chute_id: u32,
    ) -> Result<i32, ResolveError> {
        let total = self.ring.snapshot().total_cart_count;
        if total <= 0 {
            return Err(ResolveError::NotReady(NotReadyReason::CartCountNotLocked));
        }

        let head = self.current_head_cart_number()?;

        let chute = self.chutes.chute_config(chute_id).ok_or(ResolveError::NotFound(
            NotFoundReason::ChuteNotConfigured { chute_id },
        ))?;

        let base = chute.cart_number_at_head_one;
        if !(1..=total).contains(&base) {
            let reason = InvalidReason::ChuteBaseOutOfRange {
                chute_id,
                base,
                total,
            };
            tracing::warn!(chute_id, base, total, "chute base cart number out of range");
            return Err(ResolveError::Invalid(reason));
        }

        if !(1..=i64::from(total)).contains(&head) {
            tracing::warn!(head, total, "head cart number out of range");
            return Err(ResolveError::Invalid(InvalidReason::HeadCartOutOfRange {
                head,
                total,
            }));
        }
        // head <= total <= i32::MAX after the range check.
        let head = head as i32;

        let cart = calculator::resolve(total, head, base);
        tracing::debug!(chute_id, head, base, cart, "resolved cart at chute");
        Ok(cart)
    }

    /// 1-based number of the cart currently at the origin sensor.
    pub fn get_current_head_cart_number(&self) -> Result<i64, ResolveError> {
        self.current_head_cart_number()
    }

    fn current_head_cart_number(&self) -> Result<i64, ResolveError> {
        match self.tracker.head() {
            HeadPosition::NotInitialized => Err(ResolveError::NotReady(
                NotReadyReason::HeadPositionNotReady,
            )),
            HeadPosition::Initialized(idx) => Ok(idx.cart_number()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chutes::ChuteConfigTable;
    use crate::ring::RingConfigCell;
    use sorter_traits::{ChuteConfig, RingConfiguration};
    use std::time::Duration;

    fn chute(id: u32, base: i32) -> ChuteConfig {
        ChuteConfig {
            chute_id: id,
            is_enabled: true,
            cart_number_at_head_one: base,
            max_open_duration: Duration::from_millis(300),
        }
    }

    type Fixture = (
        Arc<RingConfigCell>,
        Arc<CartPositionTracker>,
        Arc<ChuteConfigTable>,
        CartAtChuteResolver,
    );

    fn setup(total: i32) -> Fixture {
        let ring = Arc::new(RingConfigCell::new(RingConfiguration::new(total)));
        let tracker = Arc::new(CartPositionTracker::new(Arc::clone(&ring)));
        let table = Arc::new(ChuteConfigTable::new([chute(1, 90), chute(3, 80)]));
        let resolver = CartAtChuteResolver::new(
            Arc::clone(&ring),
            Arc::clone(&tracker),
            Arc::clone(&table) as SharedChuteSource,
        );
        (ring, tracker, table, resolver)
    }

    #[test]
    fn lock_is_checked_before_head() {
        let (_, _, _, r) = setup(0);
        assert_eq!(
            r.resolve_current_cart_number_for_chute(1),
            Err(ResolveError::NotReady(NotReadyReason::CartCountNotLocked))
        );
    }

    #[test]
    fn head_is_checked_before_chute_lookup() {
        let (_, _, _, r) = setup(100);
        assert_eq!(
            r.resolve_current_cart_number_for_chute(42),
            Err(ResolveError::NotReady(NotReadyReason::HeadPositionNotReady))
        );
        assert_eq!(
            r.get_current_head_cart_number(),
            Err(ResolveError::NotReady(NotReadyReason::HeadPositionNotReady))
        );
    }

    #[test]
    fn unknown_chute_is_not_found() {
        let (_, t, _, r) = setup(100);
        t.on_cart_passed_origin(Duration::ZERO);
        assert_eq!(
            r.resolve_current_cart_number_for_chute(42),
            Err(ResolveError::NotFound(NotFoundReason::ChuteNotConfigured { chute_id: 42 }))
        );
    }

    #[test]
    fn base_out_of_range_is_invalid() {
        let (_, t, table, r) = setup(100);
        t.on_cart_passed_origin(Duration::ZERO);
        table.upsert(chute(5, 101));
        table.upsert(chute(6, 0));
        assert_eq!(
            r.resolve_current_cart_number_for_chute(5),
            Err(ResolveError::Invalid(InvalidReason::ChuteBaseOutOfRange {
                chute_id: 5,
                base: 101,
                total: 100
            }))
        );
        assert!(matches!(
            r.resolve_current_cart_number_for_chute(6),
            Err(ResolveError::Invalid(InvalidReason::ChuteBaseOutOfRange { base: 0, .. }))
        ));
    }

    #[test]
    fn head_beyond_ring_is_invalid() {
        // Head counted past the ring while learning, then a shorter ring got locked.
        let (ring, t, table, r) = setup(0);
        for i in 0..20 {
            t.on_cart_passed_origin(Duration::from_millis(i));
        }
        ring.replace(RingConfiguration::new(10));
        table.upsert(chute(7, 5));
        assert_eq!(
            r.resolve_current_cart_number_for_chute(7),
            Err(ResolveError::Invalid(InvalidReason::HeadCartOutOfRange {
                head: 20,
                total: 10
            }))
        );
        // The next origin pass brings the head back inside the ring.
        t.on_cart_passed_origin(Duration::from_millis(20));
        assert_eq!(r.get_current_head_cart_number(), Ok(1));
        assert_eq!(r.resolve_current_cart_number_for_chute(7), Ok(5));
    }

    #[test]
    fn hot_reload_is_visible_on_next_call() {
        let (_, t, table, r) = setup(100);
        t.on_cart_passed_origin(Duration::ZERO);
        assert_eq!(r.resolve_current_cart_number_for_chute(1), Ok(90));
        table.upsert(chute(1, 50));
        assert_eq!(r.resolve_current_cart_number_for_chute(1), Ok(50));
    }
}
