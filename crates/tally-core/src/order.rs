//! Order key allocation for the sibling list collection.
//!
//! Lists carry a sparse scalar [`OrderKey`]; moving one list only rewrites
//! that list's key. Given the unmoved neighbours at the destination:
//!
//! ```text
//!   prev   next     new key
//!   ────   ────     ───────────────────────────
//!   Some   Some     midpoint(prev, next)
//!   Some   None     tail: one step past prev
//!   None   Some     head: one step before next
//!   None   None     no-op (single list)
//! ```
//!
//! "Past" and "before" follow [`KeyDirection`]. A midpoint that cannot be
//! told apart from its neighbours is refused with
//! [`CoreError::ReorderExhausted`]; callers renormalise instead of writing a
//! key that would corrupt the order.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use tally_types::OrderKey;

use crate::error::CoreError;
use crate::Result;

/// Which end of the key space displays first.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyDirection {
    /// Lowest key first. The head moves toward negative infinity.
    #[default]
    Ascending,
    /// Highest key first (newest-first when keys are timestamps).
    Descending,
}

impl KeyDirection {
    /// Display ordering of two keys.
    pub fn compare(&self, a: OrderKey, b: OrderKey) -> Ordering {
        match self {
            KeyDirection::Ascending => a.cmp(&b),
            KeyDirection::Descending => b.cmp(&a),
        }
    }

    /// Key for an entity placed in front of `next`.
    fn head(&self, next: f64, step: f64) -> f64 {
        match self {
            KeyDirection::Ascending => next - step,
            KeyDirection::Descending => next + step,
        }
    }

    /// Key for an entity placed behind `prev`.
    fn tail(&self, prev: f64, step: f64) -> f64 {
        match self {
            KeyDirection::Ascending => prev + step,
            KeyDirection::Descending => prev - step,
        }
    }

    /// Evenly spaced key for display position `index` of `len`.
    fn spaced(&self, index: usize, len: usize, step: f64) -> f64 {
        match self {
            KeyDirection::Ascending => index as f64 * step,
            KeyDirection::Descending => (len - 1 - index) as f64 * step,
        }
    }
}

/// Compute a key for an entity dropped between `prev` and `next`.
///
/// `prev` and `next` are the keys of the unmoved entities that will sit
/// immediately before and after it in display order. Returns `Ok(None)` when
/// there is nothing to order against.
pub fn allocate_key(
    prev: Option<OrderKey>,
    next: Option<OrderKey>,
    step: f64,
    direction: KeyDirection,
) -> Result<Option<OrderKey>> {
    let exhausted = || CoreError::ReorderExhausted { prev, next };

    let key = match (prev, next) {
        (None, None) => return Ok(None),
        (Some(p), Some(n)) => {
            let (p, n) = (p.value(), n.value());
            // Halve first so two large keys cannot overflow.
            let mid = p / 2.0 + n / 2.0;
            let (lo, hi) = if p < n { (p, n) } else { (n, p) };
            if !(mid.is_finite() && lo < mid && mid < hi) {
                return Err(exhausted());
            }
            mid
        }
        (Some(p), None) => {
            let key = direction.tail(p.value(), step);
            if !key.is_finite() || key == p.value() {
                return Err(exhausted());
            }
            key
        }
        (None, Some(n)) => {
            let key = direction.head(n.value(), step);
            if !key.is_finite() || key == n.value() {
                return Err(exhausted());
            }
            key
        }
    };

    Ok(Some(OrderKey::new(key)))
}

/// Key for appending after the current last entity (or the first key of an
/// empty collection).
pub fn tail_key(last: Option<OrderKey>, step: f64, direction: KeyDirection) -> Result<OrderKey> {
    match last {
        None => Ok(OrderKey::new(0.0)),
        Some(last) => allocate_key(Some(last), None, step, direction)
            .map(|key| key.unwrap_or(last)),
    }
}

/// Evenly spaced keys for `len` entities in display order.
pub fn renormalized_keys(len: usize, step: f64, direction: KeyDirection) -> Result<Vec<OrderKey>> {
    let keys: Vec<OrderKey> = (0..len)
        .map(|i| OrderKey::new(direction.spaced(i, len, step)))
        .collect();
    if keys.iter().any(|k| !k.is_valid()) {
        return Err(CoreError::ReorderExhausted { prev: None, next: None });
    }
    Ok(keys)
}

#[cfg(test)]
mod tests {
    use super::*;

    const STEP: f64 = 1000.0;

    fn key(v: f64) -> Option<OrderKey> {
        Some(OrderKey::new(v))
    }

    #[test]
    fn test_midpoint() {
        let k = allocate_key(key(10.0), key(20.0), STEP, KeyDirection::Ascending).unwrap();
        assert_eq!(k, key(15.0));
    }

    #[test]
    fn test_midpoint_descending_neighbours() {
        let k = allocate_key(key(20.0), key(10.0), STEP, KeyDirection::Descending).unwrap();
        assert_eq!(k, key(15.0));
    }

    #[test]
    fn test_head_ascending() {
        // Dragging C in front of A (key 10) with nothing before it.
        let k = allocate_key(None, key(10.0), STEP, KeyDirection::Ascending).unwrap();
        assert_eq!(k, key(-990.0));
    }

    #[test]
    fn test_tail_ascending() {
        let k = allocate_key(key(30.0), None, STEP, KeyDirection::Ascending).unwrap();
        assert_eq!(k, key(1030.0));
    }

    #[test]
    fn test_descending_head_and_tail() {
        let head = allocate_key(None, key(10.0), STEP, KeyDirection::Descending).unwrap();
        assert_eq!(head, key(1010.0));
        let tail = allocate_key(key(10.0), None, STEP, KeyDirection::Descending).unwrap();
        assert_eq!(tail, key(-990.0));
    }

    #[test]
    fn test_no_neighbours_is_noop() {
        assert_eq!(allocate_key(None, None, STEP, KeyDirection::Ascending).unwrap(), None);
    }

    #[test]
    fn test_adjacent_floats_exhaust() {
        let a = 1.0_f64;
        let b = f64::from_bits(a.to_bits() + 1);
        let err = allocate_key(key(a), key(b), STEP, KeyDirection::Ascending).unwrap_err();
        assert!(matches!(err, CoreError::ReorderExhausted { .. }));
    }

    #[test]
    fn test_repeated_bisection_eventually_exhausts() {
        let lo = OrderKey::new(0.0);
        let mut hi = OrderKey::new(1.0);
        let mut rounds = 0;
        loop {
            match allocate_key(Some(lo), Some(hi), STEP, KeyDirection::Ascending) {
                Ok(Some(mid)) => {
                    assert!(mid > lo && mid < hi);
                    hi = mid;
                    rounds += 1;
                }
                Ok(None) => unreachable!(),
                Err(CoreError::ReorderExhausted { .. }) => break,
                Err(other) => panic!("unexpected error: {other}"),
            }
            assert!(rounds < 10_000, "bisection never exhausted");
        }
        assert!(rounds > 50);
    }

    #[test]
    fn test_equal_neighbours_exhaust() {
        let err = allocate_key(key(5.0), key(5.0), STEP, KeyDirection::Ascending).unwrap_err();
        assert!(matches!(err, CoreError::ReorderExhausted { .. }));
    }

    #[test]
    fn test_nan_neighbour_exhausts() {
        let err = allocate_key(key(f64::NAN), key(5.0), STEP, KeyDirection::Ascending).unwrap_err();
        assert!(matches!(err, CoreError::ReorderExhausted { .. }));
    }

    #[test]
    fn test_step_lost_in_precision_exhausts() {
        let err = allocate_key(key(1e300), None, STEP, KeyDirection::Ascending).unwrap_err();
        assert!(matches!(err, CoreError::ReorderExhausted { .. }));
    }

    #[test]
    fn test_tail_key() {
        assert_eq!(tail_key(None, STEP, KeyDirection::Ascending).unwrap(), OrderKey::new(0.0));
        assert_eq!(
            tail_key(key(2000.0), STEP, KeyDirection::Ascending).unwrap(),
            OrderKey::new(3000.0)
        );
    }

    #[test]
    fn test_renormalized_keys_follow_direction() {
        let asc = renormalized_keys(3, STEP, KeyDirection::Ascending).unwrap();
        assert_eq!(asc, vec![OrderKey::new(0.0), OrderKey::new(1000.0), OrderKey::new(2000.0)]);
        let desc = renormalized_keys(3, STEP, KeyDirection::Descending).unwrap();
        assert_eq!(desc, vec![OrderKey::new(2000.0), OrderKey::new(1000.0), OrderKey::new(0.0)]);
        assert!(renormalized_keys(0, STEP, KeyDirection::Descending).unwrap().is_empty());
    }
}
