//! `{{Number:...}}` tokens.
//!
//! - `Number:Range:min..max:precision`
//! - `Number:IncrementTracked:start..end:minDelta..maxDelta:weight:key`
//! - `Number:DecrementTracked:start..end:minDelta..maxDelta:weight:key`
//! - `Number:Reference:key`

use super::{HandlerContext, KeyScope, TokenHandler};
use crate::descriptor::{HandlerType, SourceType};
use crate::error::HandlerError;
use crate::random;
use dashmap::mapref::entry::Entry;

const HANDLER: HandlerType = HandlerType::Number;
const RANGE_PARAMETERS: usize = 4;
const TRACKED_PARAMETERS: usize = 6;
const REFERENCE_PARAMETERS: usize = 3;
/// Largest supported rounding precision.
const MAX_PRECISION: u32 = 15;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Direction {
    Up,
    Down,
}

impl Direction {
    fn reached(self, value: f64, end: f64) -> bool {
        match self {
            Direction::Up => value >= end,
            Direction::Down => value <= end,
        }
    }

    fn step(self, value: f64, delta: f64, end: f64) -> f64 {
        match self {
            Direction::Up => (value + delta).min(end),
            Direction::Down => (value - delta).max(end),
        }
    }
}

#[derive(Debug)]
enum NumberSource {
    Range {
        min: f64,
        max: f64,
        precision: u32,
    },
    Tracked {
        direction: Direction,
        start: f64,
        end: f64,
        min_delta: f64,
        max_delta: f64,
        weight: i64,
        key: String,
    },
    Reference {
        value: f64,
    },
}

pub struct NumberHandler<'a> {
    context: HandlerContext<'a>,
    source: NumberSource,
}

impl<'a> NumberHandler<'a> {
    pub fn new(context: HandlerContext<'a>) -> Result<Self, HandlerError> {
        let source = match context.source_type() {
            SourceType::Range => {
                context.expect_parameters(HANDLER, RANGE_PARAMETERS)?;
                let (min, max) = parse_bounds(&context, 2)?;
                let precision: u32 = context.parse_parameter(HANDLER, 3)?;
                if precision > MAX_PRECISION {
                    return Err(context.invalid_parameter(HANDLER, context.parameter(3)));
                }
                NumberSource::Range {
                    min,
                    max,
                    precision,
                }
            }
            SourceType::IncrementTracked | SourceType::DecrementTracked => {
                context.expect_parameters(HANDLER, TRACKED_PARAMETERS)?;
                let (start, end) = parse_bounds(&context, 2)?;
                let (min_delta, max_delta) = parse_bounds(&context, 3)?;
                let weight = context.parse_parameter(HANDLER, 4)?;
                let direction = if context.source_type() == SourceType::IncrementTracked {
                    Direction::Up
                } else {
                    Direction::Down
                };
                NumberSource::Tracked {
                    direction,
                    start,
                    end,
                    min_delta,
                    max_delta,
                    weight,
                    key: context.tracked_key(HANDLER, 5, KeyScope::Provider, "")?,
                }
            }
            SourceType::Reference => {
                context.expect_parameters(HANDLER, REFERENCE_PARAMETERS)?;
                let key = context.tracked_key(HANDLER, 2, KeyScope::Provider, "")?;
                let value = context
                    .state()
                    .numbers()
                    .get(&key)
                    .map(|value| *value)
                    .ok_or_else(|| context.invalid_parameter(HANDLER, &key))?;
                NumberSource::Reference { value }
            }
            _ => return Err(context.unsupported(HANDLER)),
        };

        Ok(Self { context, source })
    }

    /// Move the tracked value for `key` and return it. The first call records `start`;
    /// once `end` is reached the value stays there.
    #[allow(clippy::too_many_arguments)]
    fn next_tracked(
        &self,
        direction: Direction,
        start: f64,
        end: f64,
        min_delta: f64,
        max_delta: f64,
        weight: i64,
        key: &str,
    ) -> f64 {
        match self.context.state().numbers().entry(key.to_string()) {
            Entry::Vacant(entry) => {
                entry.insert(start);
                start
            }
            Entry::Occupied(mut entry) => {
                let last = *entry.get();
                if direction.reached(last, end) {
                    return end;
                }
                if !random::should_deviate(weight) {
                    return last;
                }
                let delta = random::next_number(min_delta, max_delta);
                let next = direction.step(last, delta, end);
                entry.insert(next);
                next
            }
        }
    }
}

impl TokenHandler for NumberHandler<'_> {
    fn replacement_value(&mut self) -> Result<String, HandlerError> {
        let value = match &self.source {
            NumberSource::Range {
                min,
                max,
                precision,
            } => random::round_to(random::next_double(*min, *max), *precision),
            NumberSource::Tracked {
                direction,
                start,
                end,
                min_delta,
                max_delta,
                weight,
                key,
            } => self.next_tracked(
                *direction, *start, *end, *min_delta, *max_delta, *weight, key,
            ),
            NumberSource::Reference { value } => *value,
        };
        Ok(value.to_string())
    }
}

fn parse_bounds(context: &HandlerContext<'_>, index: usize) -> Result<(f64, f64), HandlerError> {
    let value = context.parameter(index);
    random::parse_range(value).ok_or_else(|| context.invalid_parameter(HANDLER, value))
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use crate::error::{HandlerError, TemplateError};

    fn values(body: &str, renders: usize) -> Vec<f64> {
        let store = store_with(body, Vec::new());
        (0..renders)
            .map(|_| render(&store, 0).unwrap().parse().unwrap())
            .collect()
    }

    #[test]
    fn test_range_respects_bounds_and_precision() {
        let store = store_with("{{Number:Range:10..20:2}}", Vec::new());
        for _ in 0..200 {
            let rendered = render(&store, 0).unwrap();
            let value: f64 = rendered.parse().unwrap();
            assert!((10.0..=20.0).contains(&value));
            let decimals = rendered.split_once('.').map_or(0, |(_, fraction)| fraction.len());
            assert!(decimals <= 2, "too many decimals in {rendered}");
        }
    }

    #[test]
    fn test_range_precision_zero_prints_integers() {
        let rendered = render_token("{{Number:Range:1..1.4:0}}").unwrap();
        assert_eq!(rendered, "1");
    }

    #[test]
    fn test_increment_starts_at_start_and_never_passes_end() {
        let series = values("{{Number:IncrementTracked:0..10:1..3:1:counter}}", 50);
        assert_eq!(series[0], 0.0);
        assert!(series.windows(2).all(|pair| pair[1] >= pair[0]));
        assert!(series.iter().all(|value| *value <= 10.0));
        assert_eq!(*series.last().unwrap(), 10.0);
    }

    #[test]
    fn test_decrement_moves_down_to_end() {
        let series = values("{{Number:DecrementTracked:100..90:1..2:1:level}}", 30);
        assert_eq!(series[0], 100.0);
        assert!(series.windows(2).all(|pair| pair[1] <= pair[0]));
        assert_eq!(*series.last().unwrap(), 90.0);
    }

    #[test]
    fn test_increment_with_fractional_deltas() {
        let series = values("{{Number:IncrementTracked:0..5:0.5..1.5:1:fraction}}", 40);
        assert!(series.iter().all(|value| (0.0..=5.0).contains(value)));
        assert_eq!(*series.last().unwrap(), 5.0);
    }

    #[test]
    fn test_reference_reads_tracked_value() {
        let store = store_with(
            "{{Number:IncrementTracked:5..50:1..2:1:total}}|{{Number:Reference:total}}",
            Vec::new(),
        );
        for _ in 0..5 {
            let rendered = render(&store, 0).unwrap();
            let (tracked, referenced) = rendered.split_once('|').unwrap();
            assert_eq!(tracked, referenced);
        }
    }

    #[test]
    fn test_reference_without_tracked_value_fails() {
        let err = render_token("{{Number:Reference:never}}").unwrap_err();
        assert!(matches!(
            err,
            TemplateError::Token {
                source: HandlerError::InvalidParameter { .. },
                ..
            }
        ));
    }

    #[test]
    fn test_wrong_parameter_count() {
        let err = render_token("{{Number:Range:1..2}}").unwrap_err();
        match err {
            TemplateError::Token {
                source:
                    HandlerError::ParameterCount {
                        expected, actual, ..
                    },
                ..
            } => {
                assert_eq!(expected, 4);
                assert_eq!(actual, 3);
            }
            other => panic!("Expected ParameterCount, got {other:?}"),
        }
    }

    #[test]
    fn test_bad_range_is_invalid_parameter() {
        let err = render_token("{{Number:Range:1-2:0}}").unwrap_err();
        assert!(err.to_string().contains("'1-2'"));
    }
}
