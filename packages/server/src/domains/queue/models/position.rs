//! Fractional position allocation.
//!
//! Positions are plain `f64` ordinals. A new entry is placed by picking a value
//! between its neighbors, so nothing else in the queue is renumbered. Repeated
//! midpoints between the same two neighbors eventually run out of precision;
//! callers check [`needs_rebalance`] before allocating and renormalize first.

use thiserror::Error;

use crate::common::EntryId;

/// Position ordinal.
pub type Position = f64;

/// Position of the first entry in an empty queue.
pub const START_POSITION: Position = 1.0;

/// Smallest neighbor gap we are willing to split.
pub const MIN_GAP: Position = 1e-9;

/// Largest position a client may set. Above 2^53, `±1.0` no longer moves an f64.
pub const MAX_POSITION: Position = 9_007_199_254_740_992.0;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum OrderingError {
    #[error("previous position {0} cannot be negative")]
    NegativePrev(Position),

    #[error("next position {0} cannot be negative")]
    NegativeNext(Position),

    #[error("position {0} cannot be negative")]
    Negative(Position),

    #[error("previous position {prev} must be less than next position {next}")]
    Inverted { prev: Position, next: Position },

    #[error("position must be a finite number")]
    NotFinite,

    #[error("no representable position left between {prev} and {next}")]
    Exhausted { prev: Position, next: Position },

    #[error("no representable position left next to {0}")]
    OutOfRange(Position),

    #[error("position {0} exceeds the maximum of {max}", max = MAX_POSITION)]
    TooLarge(Position),

    #[error("position {position} is already taken by entry {occupant}")]
    Occupied { position: Position, occupant: EntryId },
}

/// Compute a position between two optional neighbors.
///
/// - neither neighbor: [`START_POSITION`]
/// - only `next`: `next - 1`
/// - only `prev`: `prev + 1`
/// - both: the midpoint
pub fn allocate(prev: Option<Position>, next: Option<Position>) -> Result<Position, OrderingError> {
    check_bounds(prev, next)?;

    let position = match (prev, next) {
        (None, None) => START_POSITION,
        (None, Some(next)) => {
            let before = next - 1.0;
            if !(before < next) {
                return Err(OrderingError::OutOfRange(next));
            }
            before
        }
        (Some(prev), None) => {
            let after = prev + 1.0;
            if !(prev < after) {
                return Err(OrderingError::OutOfRange(prev));
            }
            after
        }
        (Some(prev), Some(next)) => {
            let mid = (prev + next) / 2.0;
            if !(prev < mid && mid < next) {
                return Err(OrderingError::Exhausted { prev, next });
            }
            mid
        }
    };

    tracing::trace!(?prev, ?next, position, "Allocated position");
    Ok(position)
}

/// Whether allocating between these neighbors would produce an unusable value.
///
/// True when the gap is below [`MIN_GAP`] (or the midpoint collapses onto a
/// bound), when inserting before the first entry would go negative, or when a
/// bound is too large for `±1.0` to move it.
pub fn needs_rebalance(prev: Option<Position>, next: Option<Position>) -> bool {
    match (prev, next) {
        // Inverted bounds are a caller error, not a precision problem.
        (Some(prev), Some(next)) if prev < next => {
            let mid = (prev + next) / 2.0;
            next - prev < MIN_GAP || !(prev < mid && mid < next)
        }
        (None, Some(next)) => next - 1.0 < 0.0 || !(next - 1.0 < next),
        (Some(prev), None) => !(prev < prev + 1.0),
        _ => false,
    }
}

/// Validate a caller-supplied position (explicit insert or reposition).
pub fn validate(position: Position) -> Result<Position, OrderingError> {
    if !position.is_finite() {
        return Err(OrderingError::NotFinite);
    }
    if position < 0.0 {
        return Err(OrderingError::Negative(position));
    }
    if position > MAX_POSITION {
        return Err(OrderingError::TooLarge(position));
    }
    Ok(position)
}

fn check_bounds(prev: Option<Position>, next: Option<Position>) -> Result<(), OrderingError> {
    if prev.is_some_and(|p| !p.is_finite()) || next.is_some_and(|n| !n.is_finite()) {
        return Err(OrderingError::NotFinite);
    }
    if let Some(prev) = prev.filter(|p| *p < 0.0) {
        return Err(OrderingError::NegativePrev(prev));
    }
    if let Some(next) = next.filter(|n| *n < 0.0) {
        return Err(OrderingError::NegativeNext(next));
    }
    if let (Some(prev), Some(next)) = (prev, next) {
        if prev >= next {
            return Err(OrderingError::Inverted { prev, next });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn empty_queue_starts_at_one() {
        assert_eq!(allocate(None, None).unwrap(), 1.0);
    }

    #[test]
    fn before_first_subtracts_one() {
        assert_eq!(allocate(None, Some(3.0)).unwrap(), 2.0);
    }

    #[test]
    fn after_last_adds_one() {
        assert_eq!(allocate(Some(2.0), None).unwrap(), 3.0);
    }

    #[test]
    fn between_takes_midpoint() {
        assert_eq!(allocate(Some(1.0), Some(2.0)).unwrap(), 1.5);
    }

    #[test]
    fn negative_bounds_are_named() {
        assert_eq!(
            allocate(Some(-1.0), None),
            Err(OrderingError::NegativePrev(-1.0))
        );
        assert_eq!(
            allocate(None, Some(-0.5)),
            Err(OrderingError::NegativeNext(-0.5))
        );
    }

    #[test]
    fn inverted_or_equal_bounds_fail() {
        assert!(matches!(
            allocate(Some(2.0), Some(1.0)),
            Err(OrderingError::Inverted { .. })
        ));
        assert!(matches!(
            allocate(Some(2.0), Some(2.0)),
            Err(OrderingError::Inverted { .. })
        ));
    }

    #[test]
    fn non_finite_bounds_fail() {
        assert_eq!(allocate(Some(f64::NAN), None), Err(OrderingError::NotFinite));
        assert_eq!(
            allocate(None, Some(f64::INFINITY)),
            Err(OrderingError::NotFinite)
        );
    }

    #[test]
    fn adjacent_floats_are_exhausted() {
        let prev = 1.0_f64;
        let next = f64::from_bits(prev.to_bits() + 1);
        assert!(needs_rebalance(Some(prev), Some(next)));
        assert!(matches!(
            allocate(Some(prev), Some(next)),
            Err(OrderingError::Exhausted { .. })
        ));
    }

    #[test]
    fn repeated_midpoints_eventually_need_rebalance() {
        let prev = 1.0;
        let mut next = 2.0;
        let mut steps = 0;
        while !needs_rebalance(Some(prev), Some(next)) {
            next = allocate(Some(prev), Some(next)).unwrap();
            steps += 1;
            assert!(steps < 200, "gap never shrank below MIN_GAP");
        }
        assert!(next - prev < MIN_GAP);
    }

    #[test]
    fn insert_before_small_first_position_needs_rebalance() {
        assert!(needs_rebalance(None, Some(0.5)));
        assert!(!needs_rebalance(None, Some(1.0)));
        assert!(!needs_rebalance(Some(0.0), None));
        assert!(!needs_rebalance(None, None));
        assert!(!needs_rebalance(Some(2.0), Some(1.0)));
    }

    #[test]
    fn validate_rejects_negative_and_nan() {
        assert_eq!(validate(0.0), Ok(0.0));
        assert_eq!(validate(-2.0), Err(OrderingError::Negative(-2.0)));
        assert_eq!(validate(f64::NAN), Err(OrderingError::NotFinite));
    }

    #[test]
    fn validate_caps_explicit_positions() {
        assert_eq!(validate(MAX_POSITION), Ok(MAX_POSITION));
        assert_eq!(validate(1.0e17), Err(OrderingError::TooLarge(1.0e17)));
    }

    #[test]
    fn one_sided_allocation_past_f64_precision_is_refused() {
        let huge = 1.0e17;
        assert_eq!(huge + 1.0, huge);

        assert!(needs_rebalance(Some(huge), None));
        assert_eq!(allocate(Some(huge), None), Err(OrderingError::OutOfRange(huge)));

        assert!(needs_rebalance(None, Some(huge)));
        assert_eq!(allocate(None, Some(huge)), Err(OrderingError::OutOfRange(huge)));

        // 2^53 - 1 still has room above it.
        assert!(!needs_rebalance(Some(MAX_POSITION - 1.0), None));
        assert_eq!(allocate(Some(MAX_POSITION - 1.0), None), Ok(MAX_POSITION));
    }

    proptest! {
        #[test]
        fn midpoint_is_strictly_between(prev in 0.0f64..1.0e6, gap in 1.0e-3f64..1.0e6) {
            let next = prev + gap;
            let position = allocate(Some(prev), Some(next)).unwrap();
            prop_assert!(prev < position && position < next);
        }

        #[test]
        fn inverted_bounds_always_fail(next in 0.0f64..1.0e6, extra in 0.0f64..1.0e6) {
            let prev = next + extra;
            let is_inverted = matches!(
                allocate(Some(prev), Some(next)),
                Err(OrderingError::Inverted { .. })
            );
            prop_assert!(is_inverted);
        }
    }
}
