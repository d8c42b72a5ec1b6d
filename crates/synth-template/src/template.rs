//! Parsed templates: metadata, segments and rendering.

use crate::collection::{Collection, Collections};
use crate::descriptor::{TokenDescriptor, TOKEN_CLOSE, TOKEN_OPEN};
use crate::error::{HandlerError, TemplateError};
use crate::handlers::{create_handler, HandlerContext};
use crate::store::{TemplateStore, MAX_NESTING_DEPTH};
use regex::Regex;
use std::collections::HashMap;
use std::sync::{Arc, LazyLock};

/// A metadata line such as `::Header=Name,Age` followed by a newline.
pub const METADATA_PATTERN: &str = r"::(.*?)\n";
pub const METADATA_SEPARATOR: char = '=';

static METADATA_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(METADATA_PATTERN).expect("metadata pattern is valid"));

/// Piece of a template body.
#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    Literal(String),
    /// A raw token including its `{{` and `}}` delimiters.
    Token(String),
}

/// Where and on whose behalf a template is rendered.
#[derive(Debug, Clone, Copy)]
pub struct RenderScope<'a> {
    store: &'a TemplateStore,
    worker: usize,
    depth: usize,
}

impl<'a> RenderScope<'a> {
    pub fn new(store: &'a TemplateStore, worker: usize) -> Self {
        Self {
            store,
            worker,
            depth: 0,
        }
    }

    pub fn store(&self) -> &'a TemplateStore {
        self.store
    }

    /// Queue worker id; keys per-worker tracked values.
    pub fn worker(&self) -> usize {
        self.worker
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Scope for rendering a nested template one level deeper.
    pub fn nested(&self) -> Result<Self, TemplateError> {
        if self.depth >= MAX_NESTING_DEPTH {
            return Err(TemplateError::NestingTooDeep(MAX_NESTING_DEPTH));
        }
        Ok(Self {
            depth: self.depth + 1,
            ..*self
        })
    }
}

/// A template prepared for one provider.
#[derive(Debug)]
pub struct TemplateData {
    name: String,
    provider: String,
    metadata: HashMap<String, String>,
    template: String,
    segments: Vec<Segment>,
    collections: Arc<Collections>,
}

impl TemplateData {
    /// Strip metadata lines from `raw` and split the remaining body into segments.
    pub fn parse(
        name: impl Into<String>,
        provider: impl Into<String>,
        raw: &str,
        collections: Arc<Collections>,
    ) -> Self {
        let (metadata, template) = parse_metadata(raw);
        let segments = split_segments(&template);
        Self {
            name: name.into(),
            provider: provider.into(),
            metadata,
            template,
            segments,
            collections,
        }
    }

    /// Template file name, e.g. `order.template.json`.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn provider_name(&self) -> &str {
        &self.provider
    }

    pub fn metadata(&self) -> &HashMap<String, String> {
        &self.metadata
    }

    /// Template body with metadata lines removed.
    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn collection(&self, file_name: &str) -> Option<&Collection> {
        self.collections.get(file_name)
    }

    /// Render every segment in order, evaluating tokens with fresh handlers.
    pub fn render(&self, scope: &RenderScope<'_>) -> Result<String, TemplateError> {
        let mut rendered = String::with_capacity(self.template.len());
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => rendered.push_str(text),
                Segment::Token(token) => {
                    let value =
                        self.evaluate(token, scope)
                            .map_err(|source| TemplateError::Token {
                                template: self.name.clone(),
                                source,
                            })?;
                    rendered.push_str(&value);
                }
            }
        }
        Ok(rendered)
    }

    fn evaluate(&self, token: &str, scope: &RenderScope<'_>) -> Result<String, HandlerError> {
        let descriptor = TokenDescriptor::parse(token)?;
        let context = HandlerContext::new(&descriptor, self, scope);
        let mut handler = create_handler(context)?;
        handler.replacement_value()
    }
}

/// Remove every metadata line and return `(metadata, body)`. Keys and values are trimmed;
/// a line without a separator yields an empty value.
pub fn parse_metadata(raw: &str) -> (HashMap<String, String>, String) {
    let mut metadata = HashMap::new();
    for captures in METADATA_RE.captures_iter(raw) {
        let line = captures.get(1).map_or("", |m| m.as_str());
        let (key, value) = line.split_once(METADATA_SEPARATOR).unwrap_or((line, ""));
        metadata.insert(key.trim().to_string(), value.trim().to_string());
    }
    let body = METADATA_RE.replace_all(raw, "").into_owned();
    (metadata, body)
}

/// Split a body into literal and token segments. Empty fragments are dropped.
pub fn split_segments(template: &str) -> Vec<Segment> {
    let mut boundaries: Vec<usize> = template
        .match_indices(TOKEN_OPEN)
        .map(|(index, _)| index)
        .chain(
            template
                .match_indices(TOKEN_CLOSE)
                .map(|(index, _)| index + TOKEN_CLOSE.len()),
        )
        .collect();
    boundaries.push(0);
    boundaries.push(template.len());
    boundaries.sort_unstable();
    boundaries.dedup();

    boundaries
        .windows(2)
        .map(|pair| &template[pair[0]..pair[1]])
        .filter(|fragment| !fragment.is_empty())
        .map(classify)
        .collect()
}

fn classify(fragment: &str) -> Segment {
    let is_token = fragment.len() > TOKEN_OPEN.len() + TOKEN_CLOSE.len()
        && fragment.starts_with(TOKEN_OPEN)
        && fragment.ends_with(TOKEN_CLOSE)
        && !fragment[TOKEN_OPEN.len()..].contains(TOKEN_OPEN);
    if is_token {
        Segment::Token(fragment.to_string())
    } else {
        Segment::Literal(fragment.to_string())
    }
}
