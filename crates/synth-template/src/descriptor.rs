//! Token descriptors: the parsed form of a `{{Handler:Source:param...}}` token.

use crate::error::DescriptorError;
use std::str::FromStr;

pub const TOKEN_OPEN: &str = "{{";
pub const TOKEN_CLOSE: &str = "}}";
pub const PARAMETER_DELIMITER: char = ':';

/// Handler type and source type are always present.
pub const MIN_PARAMETERS: usize = 2;

named_enum! {
    /// The token handler a descriptor dispatches to.
    pub enum HandlerType as "handler type" {
        Number,
        Guid,
        Timestamp,
        DateTime,
        JsonCollection,
        CsvCollection,
        Nested,
        MacAddress,
        Coordinate,
    }
}

named_enum! {
    /// How a handler produces its value.
    pub enum SourceType as "source type" {
        Range,
        IncrementTracked,
        DecrementTracked,
        Reference,
        NewGuid,
        Tracked,
        TrackedLimit,
        DateTime,
        Timestamp,
        Collection,
        Json,
        MacAddress,
        Polygon,
    }
}

/// A parsed token. Parameters are kept verbatim, including the handler and source
/// names at positions 0 and 1.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenDescriptor {
    token: String,
    handler_type: HandlerType,
    source_type: SourceType,
    parameters: Vec<String>,
}

impl TokenDescriptor {
    /// Parse a full token including its `{{` and `}}` delimiters.
    pub fn parse(token: &str) -> Result<Self, DescriptorError> {
        let inner = token
            .strip_prefix(TOKEN_OPEN)
            .and_then(|rest| rest.strip_suffix(TOKEN_CLOSE))
            .ok_or_else(|| DescriptorError::Malformed(token.to_string()))?;

        let parameters: Vec<String> = inner
            .split(PARAMETER_DELIMITER)
            .map(str::to_string)
            .collect();

        if parameters.len() < MIN_PARAMETERS {
            return Err(DescriptorError::TooFewParameters {
                token: token.to_string(),
                actual: parameters.len(),
                expected: MIN_PARAMETERS,
            });
        }

        Ok(Self {
            token: token.to_string(),
            handler_type: parameters[0].parse()?,
            source_type: parameters[1].parse()?,
            parameters,
        })
    }

    /// The raw token text, delimiters included.
    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn handler_type(&self) -> HandlerType {
        self.handler_type
    }

    pub fn source_type(&self) -> SourceType {
        self.source_type
    }

    pub fn parameters(&self) -> &[String] {
        &self.parameters
    }

    /// Parameter at `index`, or an empty string when absent.
    pub fn parameter(&self, index: usize) -> &str {
        self.parameters.get(index).map(String::as_str).unwrap_or("")
    }
}

impl FromStr for TokenDescriptor {
    type Err = DescriptorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_number_range() {
        let descriptor = TokenDescriptor::parse("{{Number:Range:1..10:2}}").unwrap();
        assert_eq!(descriptor.handler_type(), HandlerType::Number);
        assert_eq!(descriptor.source_type(), SourceType::Range);
        assert_eq!(descriptor.parameters(), &["Number", "Range", "1..10", "2"]);
        assert_eq!(descriptor.token(), "{{Number:Range:1..10:2}}");
    }

    #[test]
    fn test_parse_is_case_insensitive() {
        let descriptor = TokenDescriptor::parse("{{guid:newguid}}").unwrap();
        assert_eq!(descriptor.handler_type(), HandlerType::Guid);
        assert_eq!(descriptor.source_type(), SourceType::NewGuid);
    }

    #[test]
    fn test_parse_rejects_single_parameter() {
        let err = TokenDescriptor::parse("{{Number}}").unwrap_err();
        assert_eq!(
            err,
            DescriptorError::TooFewParameters {
                token: "{{Number}}".to_string(),
                actual: 1,
                expected: 2,
            }
        );
    }

    #[test]
    fn test_parse_rejects_missing_delimiters() {
        assert!(matches!(
            TokenDescriptor::parse("Number:Range"),
            Err(DescriptorError::Malformed(_))
        ));
    }

    #[test]
    fn test_unknown_handler_lists_available_values() {
        let err = TokenDescriptor::parse("{{Bogus:Range}}").unwrap_err();
        let message = err.to_string();
        assert!(message.contains("'Bogus'"));
        assert!(message.contains("Number"));
        assert!(message.contains("Coordinate"));
    }

    #[test]
    fn test_missing_parameter_is_empty() {
        let descriptor = TokenDescriptor::parse("{{Guid:NewGuid}}").unwrap();
        assert_eq!(descriptor.parameter(5), "");
    }

    #[test]
    fn test_handler_types_are_distinct() {
        let names: Vec<&str> = HandlerType::ALL.iter().map(|handler| handler.name()).collect();
        assert_eq!(
            names,
            vec![
                "Number",
                "Guid",
                "Timestamp",
                "DateTime",
                "JsonCollection",
                "CsvCollection",
                "Nested",
                "MacAddress",
                "Coordinate",
            ]
        );
        for handler in HandlerType::ALL {
            assert_eq!(handler.name().parse::<HandlerType>().unwrap(), *handler);
        }
    }
}
