//! `{{Timestamp:...}}` tokens: `DateTime:format`, `Tracked:format:key` and
//! `Reference:key`. Values are the current UTC time.

use super::{HandlerContext, KeyScope, TimeFormat, TokenHandler};
use crate::descriptor::{HandlerType, SourceType};
use crate::error::HandlerError;
use chrono::Utc;

const HANDLER: HandlerType = HandlerType::Timestamp;
const DATE_TIME_PARAMETERS: usize = 3;
const TRACKED_PARAMETERS: usize = 4;
const REFERENCE_PARAMETERS: usize = 3;

#[derive(Debug)]
enum TimestampSource {
    Now(TimeFormat),
    Tracked(TimeFormat, String),
    Reference(String),
}

pub struct TimestampHandler<'a> {
    context: HandlerContext<'a>,
    source: TimestampSource,
}

impl<'a> TimestampHandler<'a> {
    pub fn new(context: HandlerContext<'a>) -> Result<Self, HandlerError> {
        let source = match context.source_type() {
            SourceType::DateTime => {
                context.expect_parameters(HANDLER, DATE_TIME_PARAMETERS)?;
                TimestampSource::Now(context.parse_parameter(HANDLER, 2)?)
            }
            SourceType::Tracked => {
                context.expect_parameters(HANDLER, TRACKED_PARAMETERS)?;
                TimestampSource::Tracked(
                    context.parse_parameter(HANDLER, 2)?,
                    context.tracked_key(HANDLER, 3, KeyScope::Worker, "")?,
                )
            }
            SourceType::Reference => {
                context.expect_parameters(HANDLER, REFERENCE_PARAMETERS)?;
                let key = context.tracked_key(HANDLER, 2, KeyScope::Worker, "")?;
                let value = context
                    .state()
                    .timestamps()
                    .get(&key)
                    .map(|value| value.clone())
                    .ok_or_else(|| context.invalid_parameter(HANDLER, &key))?;
                TimestampSource::Reference(value)
            }
            _ => return Err(context.unsupported(HANDLER)),
        };

        Ok(Self { context, source })
    }
}

impl TokenHandler for TimestampHandler<'_> {
    fn replacement_value(&mut self) -> Result<String, HandlerError> {
        match &self.source {
            TimestampSource::Now(format) => Ok(format.format(Utc::now())),
            TimestampSource::Tracked(format, key) => {
                let value = format.format(Utc::now());
                self.context
                    .state()
                    .timestamps()
                    .insert(key.clone(), value.clone());
                Ok(value)
            }
            TimestampSource::Reference(value) => Ok(value.clone()),
        }
    }
}
