//! `{{Nested:Json:template:min..max}}` tokens: render another template of the same
//! provider a random `[min, max)` number of times, joined with commas.

use super::{HandlerContext, TokenHandler};
use crate::descriptor::{HandlerType, SourceType};
use crate::error::HandlerError;
use crate::random;
use crate::template::TemplateData;
use std::sync::Arc;

const HANDLER: HandlerType = HandlerType::Nested;
const JSON_PARAMETERS: usize = 4;
pub const NESTED_SEPARATOR: &str = ",";

pub struct NestedHandler<'a> {
    context: HandlerContext<'a>,
    template: Arc<TemplateData>,
    min: i64,
    max: i64,
}

impl<'a> NestedHandler<'a> {
    pub fn new(context: HandlerContext<'a>) -> Result<Self, HandlerError> {
        if context.source_type() != SourceType::Json {
            return Err(context.unsupported(HANDLER));
        }
        context.expect_parameters(HANDLER, JSON_PARAMETERS)?;

        let name = context.parameter(2).trim();
        if name.is_empty() {
            return Err(context.invalid_parameter(HANDLER, name));
        }
        let range = context.parameter(3);
        let (min, max) =
            random::parse_range(range).ok_or_else(|| context.invalid_parameter(HANDLER, range))?;
        if min < 0 {
            return Err(context.invalid_parameter(HANDLER, range));
        }

        let template = context
            .scope()
            .store()
            .template_data(context.provider(), name)
            .map_err(|_| context.not_found(HANDLER, "template", name))?;

        Ok(Self {
            context,
            template,
            min,
            max,
        })
    }
}

impl TokenHandler for NestedHandler<'_> {
    fn replacement_value(&mut self) -> Result<String, HandlerError> {
        let scope = self
            .context
            .scope()
            .nested()
            .map_err(|e| HandlerError::Nested(Box::new(e)))?;

        let count = random::next_int(self.min, self.max);
        let mut rendered = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let item = self
                .template
                .render(&scope)
                .map_err(|e| HandlerError::Nested(Box::new(e)))?;
            rendered.push(item);
        }
        Ok(rendered.join(NESTED_SEPARATOR))
    }
}
