//! `{{DateTime:Range:format:component:min..max}}` tokens, plus the time formats
//! shared with `Timestamp`.

use super::{HandlerContext, TokenHandler};
use crate::descriptor::{HandlerType, SourceType};
use crate::error::HandlerError;
use crate::random;
use chrono::{DateTime, Months, TimeDelta, Utc};

const HANDLER: HandlerType = HandlerType::DateTime;
const RANGE_PARAMETERS: usize = 5;

named_enum! {
    /// Text form of a generated instant.
    #[allow(clippy::upper_case_acronyms)]
    pub enum TimeFormat as "date time format" {
        /// Milliseconds since the Unix epoch.
        UnixTimeInMs,
        /// `yyyy-MM-ddTHH:mm:ss.fffffffZ`
        UTCISO8601,
        /// `yyyy-MM-dd`
        DateISO8601,
    }
}

named_enum! {
    /// Unit of a `DateTime` offset.
    pub enum TimeComponent as "date time component" {
        Years,
        Months,
        Days,
        Hours,
        Minutes,
        Seconds,
        Milliseconds,
    }
}

impl TimeFormat {
    pub fn format(self, instant: DateTime<Utc>) -> String {
        match self {
            TimeFormat::UnixTimeInMs => instant.timestamp_millis().to_string(),
            TimeFormat::UTCISO8601 => format!(
                "{}.{:07}Z",
                instant.format("%Y-%m-%dT%H:%M:%S"),
                instant.timestamp_subsec_nanos() / 100
            ),
            TimeFormat::DateISO8601 => instant.format("%Y-%m-%d").to_string(),
        }
    }
}

impl TimeComponent {
    /// `instant` shifted by `amount` units, or `None` when out of range.
    pub fn offset(self, instant: DateTime<Utc>, amount: i64) -> Option<DateTime<Utc>> {
        match self {
            TimeComponent::Years => shift_months(instant, amount.checked_mul(12)?),
            TimeComponent::Months => shift_months(instant, amount),
            TimeComponent::Days => instant.checked_add_signed(TimeDelta::try_days(amount)?),
            TimeComponent::Hours => instant.checked_add_signed(TimeDelta::try_hours(amount)?),
            TimeComponent::Minutes => instant.checked_add_signed(TimeDelta::try_minutes(amount)?),
            TimeComponent::Seconds => instant.checked_add_signed(TimeDelta::try_seconds(amount)?),
            TimeComponent::Milliseconds => {
                instant.checked_add_signed(TimeDelta::try_milliseconds(amount)?)
            }
        }
    }
}

fn shift_months(instant: DateTime<Utc>, months: i64) -> Option<DateTime<Utc>> {
    let magnitude = Months::new(u32::try_from(months.unsigned_abs()).ok()?);
    if months >= 0 {
        instant.checked_add_months(magnitude)
    } else {
        instant.checked_sub_months(magnitude)
    }
}

/// Current time shifted by a random offset.
pub struct DateTimeHandler<'a> {
    context: HandlerContext<'a>,
    format: TimeFormat,
    component: TimeComponent,
    min: i64,
    max: i64,
}

impl<'a> DateTimeHandler<'a> {
    pub fn new(context: HandlerContext<'a>) -> Result<Self, HandlerError> {
        if context.source_type() != SourceType::Range {
            return Err(context.unsupported(HANDLER));
        }
        context.expect_parameters(HANDLER, RANGE_PARAMETERS)?;
        let format = context.parse_parameter(HANDLER, 2)?;
        let component = context.parse_parameter(HANDLER, 3)?;
        let range = context.parameter(4);
        let (min, max) =
            random::parse_range(range).ok_or_else(|| context.invalid_parameter(HANDLER, range))?;

        Ok(Self {
            context,
            format,
            component,
            min,
            max,
        })
    }
}

impl TokenHandler for DateTimeHandler<'_> {
    fn replacement_value(&mut self) -> Result<String, HandlerError> {
        let amount = random::next_int(self.min, self.max);
        let instant = self
            .component
            .offset(Utc::now(), amount)
            .ok_or_else(|| {
                self.context
                    .invalid_parameter(HANDLER, self.context.parameter(4))
            })?;
        Ok(self.format.format(instant))
    }
}
