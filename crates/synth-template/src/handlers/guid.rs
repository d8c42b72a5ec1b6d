//! `{{Guid:...}}` tokens: `NewGuid`, `Tracked:key` and `Reference:key`.
//!
//! Tracked GUIDs are kept per queue worker, so a `Reference` in the same payload sees
//! the GUID generated for that payload.

use super::{HandlerContext, KeyScope, TokenHandler};
use crate::descriptor::{HandlerType, SourceType};
use crate::error::HandlerError;
use uuid::Uuid;

const HANDLER: HandlerType = HandlerType::Guid;
const NEW_GUID_PARAMETERS: usize = 2;
const KEYED_PARAMETERS: usize = 3;

#[derive(Debug)]
enum GuidSource {
    New,
    Tracked(String),
    Reference(String),
}

pub struct GuidHandler<'a> {
    context: HandlerContext<'a>,
    source: GuidSource,
}

impl<'a> GuidHandler<'a> {
    pub fn new(context: HandlerContext<'a>) -> Result<Self, HandlerError> {
        let source = match context.source_type() {
            SourceType::NewGuid => {
                context.expect_parameters(HANDLER, NEW_GUID_PARAMETERS)?;
                GuidSource::New
            }
            SourceType::Tracked => {
                context.expect_parameters(HANDLER, KEYED_PARAMETERS)?;
                GuidSource::Tracked(context.tracked_key(HANDLER, 2, KeyScope::Worker, "")?)
            }
            SourceType::Reference => {
                context.expect_parameters(HANDLER, KEYED_PARAMETERS)?;
                let key = context.tracked_key(HANDLER, 2, KeyScope::Worker, "")?;
                let value = context
                    .state()
                    .guids()
                    .get(&key)
                    .map(|value| value.clone())
                    .ok_or_else(|| context.invalid_parameter(HANDLER, &key))?;
                GuidSource::Reference(value)
            }
            _ => return Err(context.unsupported(HANDLER)),
        };

        Ok(Self { context, source })
    }
}

impl TokenHandler for GuidHandler<'_> {
    fn replacement_value(&mut self) -> Result<String, HandlerError> {
        match &self.source {
            GuidSource::New => Ok(Uuid::new_v4().to_string()),
            GuidSource::Tracked(key) => {
                let guid = Uuid::new_v4().to_string();
                self.context
                    .state()
                    .guids()
                    .insert(key.clone(), guid.clone());
                Ok(guid)
            }
            GuidSource::Reference(value) => Ok(value.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use uuid::Uuid;

    #[test]
    fn test_new_guid_is_valid_and_unique() {
        let first = render_token("{{Guid:NewGuid}}").unwrap();
        let second = render_token("{{Guid:NewGuid}}").unwrap();
        assert!(Uuid::parse_str(&first).is_ok());
        assert_ne!(first, second);
    }

    #[test]
    fn test_reference_matches_tracked_in_same_render() {
        let store = store_with(
            "{{Guid:Tracked:order}} {{Guid:Reference:order}}",
            Vec::new(),
        );
        let rendered = render(&store, 0).unwrap();
        let (tracked, referenced) = rendered.split_once(' ').unwrap();
        assert_eq!(tracked, referenced);
    }

    #[test]
    fn test_tracked_values_are_per_worker() {
        let store = store_with("{{Guid:Tracked:order}}", Vec::new());
        let worker_zero = render(&store, 0).unwrap();
        let worker_one = render(&store, 1).unwrap();
        assert_ne!(worker_zero, worker_one);

        let reader = store_with("{{Guid:Reference:order}}", Vec::new());
        assert!(render(&reader, 0).is_err());
    }

    #[test]
    fn test_new_guid_rejects_extra_parameters() {
        assert!(render_token("{{Guid:NewGuid:extra}}").is_err());
    }
}
