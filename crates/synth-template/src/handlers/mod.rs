//! Token handlers.
//!
//! A handler is built for every token occurrence on every render, validates its
//! parameters at construction and then produces one replacement value. Handlers that
//! record or read tracked values do so through the store's [`TokenState`](crate::TokenState).
//!
//! | Handler          | Source types                                                 |
//! |------------------|--------------------------------------------------------------|
//! | `Number`         | `Range`, `IncrementTracked`, `DecrementTracked`, `Reference` |
//! | `Guid`           | `NewGuid`, `Tracked`, `Reference`                            |
//! | `Timestamp`      | `DateTime`, `Tracked`, `Reference`                           |
//! | `DateTime`       | `Range`                                                      |
//! | `JsonCollection` | `Collection`, `Tracked`, `Reference`                         |
//! | `CsvCollection`  | `Collection`, `Tracked`, `TrackedLimit`, `Reference`         |
//! | `Nested`         | `Json`                                                       |
//! | `MacAddress`     | `MacAddress`                                                 |
//! | `Coordinate`     | `Polygon`                                                    |

mod coordinate;
mod csv_collection;
mod datetime;
mod guid;
mod json_collection;
mod mac_address;
mod nested;
mod number;
mod timestamp;

pub use coordinate::{CoordinateFormat, CoordinateHandler};
pub use csv_collection::CsvCollectionHandler;
pub use datetime::{DateTimeHandler, TimeComponent, TimeFormat};
pub use guid::GuidHandler;
pub use json_collection::JsonCollectionHandler;
pub use mac_address::MacAddressHandler;
pub use nested::NestedHandler;
pub use number::NumberHandler;
pub use timestamp::TimestampHandler;

use crate::descriptor::{HandlerType, SourceType, TokenDescriptor};
use crate::error::HandlerError;
use crate::state::TokenState;
use crate::template::{RenderScope, TemplateData};
use std::str::FromStr;

/// Produces the text that replaces one token.
///
/// Handlers hold no resources beyond borrowed render state, so dropping one is its
/// cleanup.
pub trait TokenHandler {
    fn replacement_value(&mut self) -> Result<String, HandlerError>;
}

/// How far a tracked key is shared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyScope {
    /// One value per provider.
    Provider,
    /// One value per provider and queue worker.
    Worker,
}

/// Everything a handler sees while being built: its descriptor, the template being
/// rendered and the render scope.
#[derive(Debug, Clone, Copy)]
pub struct HandlerContext<'a> {
    descriptor: &'a TokenDescriptor,
    template: &'a TemplateData,
    scope: &'a RenderScope<'a>,
}

impl<'a> HandlerContext<'a> {
    pub fn new(
        descriptor: &'a TokenDescriptor,
        template: &'a TemplateData,
        scope: &'a RenderScope<'a>,
    ) -> Self {
        Self {
            descriptor,
            template,
            scope,
        }
    }

    pub fn descriptor(&self) -> &'a TokenDescriptor {
        self.descriptor
    }

    pub fn template(&self) -> &'a TemplateData {
        self.template
    }

    pub fn scope(&self) -> &'a RenderScope<'a> {
        self.scope
    }

    pub fn provider(&self) -> &'a str {
        self.template.provider_name()
    }

    pub fn state(&self) -> &'a TokenState {
        self.scope.store().state()
    }

    pub fn source_type(&self) -> SourceType {
        self.descriptor.source_type()
    }

    pub fn parameter(&self, index: usize) -> &'a str {
        self.descriptor.parameter(index)
    }

    /// Key for the tracked value named by the parameter at `index`: `provider-key`, or
    /// `provider-key-worker` for worker scope, followed by `suffix`. An empty key is
    /// an invalid parameter.
    pub fn tracked_key(
        &self,
        handler: HandlerType,
        index: usize,
        scope: KeyScope,
        suffix: &str,
    ) -> Result<String, HandlerError> {
        let key = self.parameter(index).trim();
        if key.is_empty() {
            return Err(self.invalid_parameter(handler, key));
        }
        Ok(match scope {
            KeyScope::Provider => format!("{}-{}{}", self.provider(), key, suffix),
            KeyScope::Worker => format!(
                "{}-{}-{}{}",
                self.provider(),
                key,
                self.scope.worker(),
                suffix
            ),
        })
    }

    /// Fail unless the token carries exactly `expected` parameters.
    pub fn expect_parameters(
        &self,
        handler: HandlerType,
        expected: usize,
    ) -> Result<(), HandlerError> {
        let actual = self.descriptor.parameters().len();
        if actual == expected {
            return Ok(());
        }
        Err(HandlerError::ParameterCount {
            handler,
            provider: self.provider().to_string(),
            expected,
            actual,
            token: self.descriptor.token().to_string(),
        })
    }

    /// Parse the parameter at `index`, failing with the offending text.
    pub fn parse_parameter<T: FromStr>(
        &self,
        handler: HandlerType,
        index: usize,
    ) -> Result<T, HandlerError> {
        let value = self.parameter(index);
        value
            .trim()
            .parse()
            .map_err(|_| self.invalid_parameter(handler, value))
    }

    pub fn invalid_parameter(&self, handler: HandlerType, value: &str) -> HandlerError {
        HandlerError::InvalidParameter {
            handler,
            provider: self.provider().to_string(),
            token: self.descriptor.token().to_string(),
            value: value.to_string(),
        }
    }

    pub fn not_found(&self, handler: HandlerType, what: &'static str, key: &str) -> HandlerError {
        HandlerError::NotFound {
            handler,
            provider: self.provider().to_string(),
            what,
            key: key.to_string(),
            token: self.descriptor.token().to_string(),
        }
    }

    pub fn unsupported(&self, handler: HandlerType) -> HandlerError {
        HandlerError::UnsupportedSource {
            handler,
            source_type: self.source_type(),
        }
    }
}

/// Build the handler named by the descriptor's handler type.
pub fn create_handler<'a>(
    context: HandlerContext<'a>,
) -> Result<Box<dyn TokenHandler + 'a>, HandlerError> {
    let handler: Box<dyn TokenHandler + 'a> = match context.descriptor().handler_type() {
        HandlerType::Number => Box::new(NumberHandler::new(context)?),
        HandlerType::Guid => Box::new(GuidHandler::new(context)?),
        HandlerType::Timestamp => Box::new(TimestampHandler::new(context)?),
        HandlerType::DateTime => Box::new(DateTimeHandler::new(context)?),
        HandlerType::JsonCollection => Box::new(JsonCollectionHandler::new(context)?),
        HandlerType::CsvCollection => Box::new(CsvCollectionHandler::new(context)?),
        HandlerType::Nested => Box::new(NestedHandler::new(context)?),
        HandlerType::MacAddress => Box::new(MacAddressHandler::new(context)?),
        HandlerType::Coordinate => Box::new(CoordinateHandler::new(context)?),
    };
    Ok(handler)
}
