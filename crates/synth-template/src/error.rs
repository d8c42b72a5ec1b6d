//! Error types for token parsing, token evaluation and template loading.

use crate::descriptor::{HandlerType, SourceType};
use thiserror::Error;

/// Errors raised while turning a `{{...}}` token into a [`TokenDescriptor`](crate::TokenDescriptor).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DescriptorError {
    /// The token is not wrapped in `{{` and `}}`.
    #[error("Token '{0}' is not wrapped in '{{{{' and '}}}}'")]
    Malformed(String),

    /// Fewer than two colon-separated parameters.
    #[error("Unexpected parameter count of '{actual}', expecting at least '{expected}' from token '{token}'")]
    TooFewParameters {
        token: String,
        actual: usize,
        expected: usize,
    },

    /// A handler, source or format name that does not exist.
    #[error("Unable to get {kind} value with string of '{value}'. Available values are '{available}'")]
    UnknownVariant {
        kind: &'static str,
        value: String,
        available: String,
    },
}

/// Errors raised by token handlers, either at construction or when producing a value.
#[derive(Error, Debug)]
pub enum HandlerError {
    #[error(transparent)]
    Descriptor(#[from] DescriptorError),

    /// The token carries the wrong number of parameters for its source type.
    #[error("Token handler '{handler}' for provider '{provider}' expected '{expected}' token parameters, but got '{actual}' for token '{token}'")]
    ParameterCount {
        handler: HandlerType,
        provider: String,
        expected: usize,
        actual: usize,
        token: String,
    },

    /// A parameter could not be parsed, or a referenced tracked key was never recorded.
    #[error("Token handler '{handler}' for provider '{provider}' was unable to parse parameters from token '{token}' with a given value of '{value}'")]
    InvalidParameter {
        handler: HandlerType,
        provider: String,
        token: String,
        value: String,
    },

    /// The handler does not implement the requested source type.
    #[error("The selected source type of '{source_type}' is not supported with handler '{handler}'")]
    UnsupportedSource {
        handler: HandlerType,
        source_type: SourceType,
    },

    /// A collection, collection path, field or template could not be resolved.
    #[error("Token handler '{handler}' for provider '{provider}' could not find {what} '{key}' for token '{token}'")]
    NotFound {
        handler: HandlerType,
        provider: String,
        what: &'static str,
        key: String,
        token: String,
    },

    /// A nested template failed to render.
    #[error("Nested template failed to render: {0}")]
    Nested(Box<TemplateError>),
}

/// Errors raised while loading, looking up or rendering templates.
#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("IO error reading '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    /// A collection file could not be parsed.
    #[error("Unable to load contents from collection file '{file}': {message}")]
    CollectionLoad { file: String, message: String },

    /// Every failure found while loading templates and collections.
    #[error("Failed to load {} template source(s): {}", .0.len(), join_errors(.0))]
    Load(Vec<TemplateError>),

    #[error("Template '{template}' was not found for provider '{provider}'")]
    TemplateNotFound { provider: String, template: String },

    #[error("Nested templates exceeded the maximum depth of {0}")]
    NestingTooDeep(usize),

    #[error("Failed to evaluate token in template '{template}': {source}")]
    Token {
        template: String,
        source: HandlerError,
    },
}

fn join_errors(errors: &[TemplateError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parameter_count_message() {
        let err = HandlerError::ParameterCount {
            handler: HandlerType::Number,
            provider: "orders".to_string(),
            expected: 4,
            actual: 3,
            token: "{{Number:Range:1..2}}".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Token handler 'Number' for provider 'orders' expected '4' token parameters, but got '3' for token '{{Number:Range:1..2}}'"
        );
    }

    #[test]
    fn test_load_error_lists_every_failure() {
        let err = TemplateError::Load(vec![
            TemplateError::CollectionLoad {
                file: "a.collections.json".to_string(),
                message: "bad".to_string(),
            },
            TemplateError::CollectionLoad {
                file: "b.collections.csv".to_string(),
                message: "worse".to_string(),
            },
        ]);
        let message = err.to_string();
        assert!(message.starts_with("Failed to load 2 template source(s)"));
        assert!(message.contains("a.collections.json"));
        assert!(message.contains("b.collections.csv"));
    }

    #[test]
    fn test_malformed_message_shows_braces() {
        let err = DescriptorError::Malformed("Number".to_string());
        assert_eq!(
            err.to_string(),
            "Token 'Number' is not wrapped in '{{' and '}}'"
        );
    }
}
