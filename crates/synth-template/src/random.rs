//! Random draws shared by the token handlers.
//!
//! All draws use the thread-local generator; ranges are half-open `[min, max)`.

use rand::{rng, Rng};

/// Separator between the bounds of a range parameter such as `1..10`.
pub const RANGE_SEPARATOR: &str = "..";

/// Random integer in `[min, max)`. Returns `min` when the range is empty.
pub fn next_int(min: i64, max: i64) -> i64 {
    if min >= max {
        return min;
    }
    rng().random_range(min..max)
}

/// Random double in `[min, max)`, scaled from a unit draw.
pub fn next_double(min: f64, max: f64) -> f64 {
    rng().random::<f64>() * (max - min) + min
}

/// Integer draw when both bounds are integral, otherwise a double draw.
pub fn next_number(min: f64, max: f64) -> f64 {
    if min.fract() == 0.0 && max.fract() == 0.0 {
        next_int(min as i64, max as i64) as f64
    } else {
        next_double(min, max)
    }
}

/// Random index into a collection of `len` items.
pub fn next_index(len: usize) -> usize {
    if len <= 1 {
        return 0;
    }
    rng().random_range(0..len)
}

/// Whether a tracked value should move this time. A weight of 1 always moves;
/// otherwise it moves when a draw in `[0, 100)` is at most `weight`.
pub fn should_deviate(weight: i64) -> bool {
    weight == 1 || next_int(0, 100) <= weight
}

/// Round half away from zero to `precision` decimal places.
pub fn round_to(value: f64, precision: u32) -> f64 {
    let factor = 10f64.powi(precision as i32);
    (value * factor).round() / factor
}

/// Parse `min..max`. Anything other than exactly two parseable bounds is rejected.
pub fn parse_range<T: std::str::FromStr>(value: &str) -> Option<(T, T)> {
    let mut bounds = value.split(RANGE_SEPARATOR);
    let min = bounds.next()?.trim().parse().ok()?;
    let max = bounds.next()?.trim().parse().ok()?;
    if bounds.next().is_some() {
        return None;
    }
    Some((min, max))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_int_is_half_open() {
        for _ in 0..200 {
            let value = next_int(3, 5);
            assert!((3..5).contains(&value));
        }
        assert_eq!(next_int(7, 7), 7);
    }

    #[test]
    fn test_next_double_within_bounds() {
        for _ in 0..200 {
            let value = next_double(-1.5, 2.5);
            assert!((-1.5..2.5).contains(&value));
        }
    }

    #[test]
    fn test_next_number_integral_bounds_yield_integers() {
        for _ in 0..100 {
            assert_eq!(next_number(1.0, 10.0).fract(), 0.0);
        }
    }

    #[test]
    fn test_should_deviate_weight_one_always_moves() {
        assert!((0..100).all(|_| should_deviate(1)));
        assert!((0..100).all(|_| should_deviate(100)));
    }

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(1.23456, 2), 1.23);
        assert_eq!(round_to(2.5, 0), 3.0);
        assert_eq!(round_to(-2.5, 0), -3.0);
    }

    #[test]
    fn test_parse_range() {
        assert_eq!(parse_range::<i64>("1..10"), Some((1, 10)));
        assert_eq!(parse_range::<f64>("-5..0.5"), Some((-5.0, 0.5)));
        assert_eq!(parse_range::<i64>("1..2..3"), None);
        assert_eq!(parse_range::<i64>("1-10"), None);
        assert_eq!(parse_range::<i64>("a..b"), None);
    }
}
