//! Grid arithmetic and weight discounting.
//!
//! Everything here is closed-form: the number of elapsed cycles is unbounded,
//! so no function iterates once per cycle.

use cadence_core::Timestamp;

/// Denominator for discount rates. A rate of `MAX_DISCOUNT_RATE` is 100%.
pub const MAX_DISCOUNT_RATE: u64 = 1_000_000_000;

/// 18-decimal fixed-point unit used while compounding.
const FIXED_ONE: u128 = 1_000_000_000_000_000_000;

fn saturate(t: u128) -> Timestamp {
    u64::try_from(t).unwrap_or(u64::MAX)
}

/// First point on `start + k·duration` with `k >= 1` that is at or after
/// `not_before`. Returns the point and `k`.
///
/// `duration` must be non-zero. Points past the end of the clock saturate.
pub fn next_grid_start(start: Timestamp, duration: u64, not_before: Timestamp) -> (Timestamp, u64) {
    debug_assert!(duration > 0);
    let duration = duration as u128;
    let first = start as u128 + duration;
    let not_before = not_before as u128;
    if first >= not_before {
        return (saturate(first), 1);
    }
    let steps = (not_before - first).div_ceil(duration);
    let point = first + steps * duration;
    (saturate(point), u64::try_from(steps + 1).unwrap_or(u64::MAX))
}

/// Whole durations elapsed between `start` and `now`. Zero before `start`.
pub fn elapsed_steps(start: Timestamp, duration: u64, now: Timestamp) -> u64 {
    if duration == 0 || now < start {
        return 0;
    }
    (now - start) / duration
}

/// `floor(a * b / FIXED_ONE)` without overflowing for any `a` when `b <= FIXED_ONE`.
fn mul_fixed(a: u128, b: u128) -> u128 {
    let (q, r) = (a / FIXED_ONE, a % FIXED_ONE);
    q * b + r * b / FIXED_ONE
}

/// `base^exp` in fixed point, by squaring.
fn pow_fixed(mut base: u128, mut exp: u64) -> u128 {
    let mut acc = FIXED_ONE;
    while exp > 0 {
        if exp & 1 == 1 {
            acc = mul_fixed(acc, base);
            if acc == 0 {
                break;
            }
        }
        exp >>= 1;
        if exp > 0 {
            base = mul_fixed(base, base);
        }
    }
    acc
}

/// Steps compounded one at a time before switching to the fixed-point power.
const EXACT_STEPS: u64 = 10_000;

/// `floor(weight * (MAX_DISCOUNT_RATE - discount_rate) / MAX_DISCOUNT_RATE)`.
fn discount_once(weight: u128, retained: u128) -> u128 {
    let max = MAX_DISCOUNT_RATE as u128;
    (weight / max) * retained + (weight % max) * retained / max
}

/// Apply `discount_rate` to `weight` once per step.
///
/// Each of the first `EXACT_STEPS` steps floors on its own, so the result is
/// the weight discounted by repeated integer multiplication. Steps beyond
/// that compound an 18-decimal factor by squaring. A zero weight is a normal
/// outcome, not an error.
pub fn discounted_weight(weight: u128, discount_rate: u64, steps: u64) -> u128 {
    if steps == 0 || discount_rate == 0 || weight == 0 {
        return weight;
    }
    if discount_rate >= MAX_DISCOUNT_RATE {
        return 0;
    }
    let retained = (MAX_DISCOUNT_RATE - discount_rate) as u128;

    let mut weight = weight;
    for _ in 0..steps.min(EXACT_STEPS) {
        weight = discount_once(weight, retained);
        if weight == 0 {
            return 0;
        }
    }
    if steps <= EXACT_STEPS {
        return weight;
    }
    let factor = retained * (FIXED_ONE / MAX_DISCOUNT_RATE as u128);
    mul_fixed(weight, pow_fixed(factor, steps - EXACT_STEPS))
}
