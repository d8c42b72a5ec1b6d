//! `{{JsonCollection:...}}` tokens.
//!
//! - `JsonCollection:Collection:collection:path`
//! - `JsonCollection:Tracked:collection:path:key`
//! - `JsonCollection:Reference:key`
//!
//! `collection` names `<collection>.collections.json`; `path` is resolved below its
//! `collections` property and must select a non-empty array.

use super::{HandlerContext, KeyScope, TokenHandler};
use crate::collection::{
    select_path, value_to_text, COLLECTIONS_ROOT, JSON_COLLECTION_SUFFIX,
};
use crate::descriptor::{HandlerType, SourceType};
use crate::error::HandlerError;
use crate::random;
use serde_json::Value;

const HANDLER: HandlerType = HandlerType::JsonCollection;
const COLLECTION_PARAMETERS: usize = 4;
const TRACKED_PARAMETERS: usize = 5;
const REFERENCE_PARAMETERS: usize = 3;

#[derive(Debug)]
enum JsonSource<'a> {
    Collection(&'a [Value]),
    Tracked(&'a [Value], String),
    Reference(String),
}

pub struct JsonCollectionHandler<'a> {
    context: HandlerContext<'a>,
    source: JsonSource<'a>,
}

impl<'a> JsonCollectionHandler<'a> {
    pub fn new(context: HandlerContext<'a>) -> Result<Self, HandlerError> {
        let source = match context.source_type() {
            SourceType::Collection => {
                context.expect_parameters(HANDLER, COLLECTION_PARAMETERS)?;
                JsonSource::Collection(elements(&context)?)
            }
            SourceType::Tracked => {
                context.expect_parameters(HANDLER, TRACKED_PARAMETERS)?;
                JsonSource::Tracked(
                    elements(&context)?,
                    context.tracked_key(HANDLER, 4, KeyScope::Worker, JSON_COLLECTION_SUFFIX)?,
                )
            }
            SourceType::Reference => {
                context.expect_parameters(HANDLER, REFERENCE_PARAMETERS)?;
                let key =
                    context.tracked_key(HANDLER, 2, KeyScope::Worker, JSON_COLLECTION_SUFFIX)?;
                let value = context
                    .state()
                    .json_values()
                    .get(&key)
                    .map(|value| value.clone())
                    .ok_or_else(|| context.invalid_parameter(HANDLER, &key))?;
                JsonSource::Reference(value)
            }
            _ => return Err(context.unsupported(HANDLER)),
        };

        Ok(Self { context, source })
    }
}

impl TokenHandler for JsonCollectionHandler<'_> {
    fn replacement_value(&mut self) -> Result<String, HandlerError> {
        match &self.source {
            JsonSource::Collection(elements) => Ok(pick(elements)),
            JsonSource::Tracked(elements, key) => {
                let value = pick(elements);
                self.context
                    .state()
                    .json_values()
                    .insert(key.clone(), value.clone());
                Ok(value)
            }
            JsonSource::Reference(value) => Ok(value.clone()),
        }
    }
}

/// Elements of the array selected by parameters 2 (collection) and 3 (path).
fn elements<'a>(context: &HandlerContext<'a>) -> Result<&'a [Value], HandlerError> {
    let file_name = format!("{}{}", context.parameter(2), JSON_COLLECTION_SUFFIX);
    let document = context
        .template()
        .collection(&file_name)
        .and_then(|collection| collection.as_json())
        .ok_or_else(|| context.not_found(HANDLER, "collection", &file_name))?;

    let path = format!("{}.{}", COLLECTIONS_ROOT, context.parameter(3));
    match select_path(document, &path) {
        Some(Value::Array(items)) if !items.is_empty() => Ok(items),
        _ => Err(context.not_found(HANDLER, "collection path", &path)),
    }
}

fn pick(elements: &[Value]) -> String {
    value_to_text(&elements[random::next_index(elements.len())])
}
