//! `{{CsvCollection:...}}` tokens.
//!
//! - `CsvCollection:Collection:collection:field`
//! - `CsvCollection:Tracked:collection:field:key`
//! - `CsvCollection:TrackedLimit:percent:collection:field:key`
//! - `CsvCollection:Reference:field:key`
//!
//! Rows are walked in their shuffled load order by a cursor shared per provider and
//! collection file. `TrackedLimit` wraps the cursor after the first `percent`% of rows.

use super::{HandlerContext, KeyScope, TokenHandler};
use crate::collection::{CsvRecord, CSV_COLLECTION_SUFFIX};
use crate::descriptor::{HandlerType, SourceType};
use crate::error::HandlerError;
use std::sync::Arc;

const HANDLER: HandlerType = HandlerType::CsvCollection;
const COLLECTION_PARAMETERS: usize = 4;
const TRACKED_PARAMETERS: usize = 5;
const TRACKED_LIMIT_PARAMETERS: usize = 6;
const REFERENCE_PARAMETERS: usize = 4;

#[derive(Debug)]
enum CsvSource<'a> {
    /// Walk the rows; record the picked row under `key` when present.
    Rows {
        file_name: String,
        rows: &'a [Arc<CsvRecord>],
        limit: Option<f64>,
        field: String,
        key: Option<String>,
    },
    Reference {
        row: Arc<CsvRecord>,
        field: String,
    },
}

pub struct CsvCollectionHandler<'a> {
    context: HandlerContext<'a>,
    source: CsvSource<'a>,
}

impl<'a> CsvCollectionHandler<'a> {
    pub fn new(context: HandlerContext<'a>) -> Result<Self, HandlerError> {
        let source = match context.source_type() {
            SourceType::Collection => {
                context.expect_parameters(HANDLER, COLLECTION_PARAMETERS)?;
                rows_source(&context, 2, None, None)?
            }
            SourceType::Tracked => {
                context.expect_parameters(HANDLER, TRACKED_PARAMETERS)?;
                let key = tracked_key(&context, 4)?;
                rows_source(&context, 2, None, Some(key))?
            }
            SourceType::TrackedLimit => {
                context.expect_parameters(HANDLER, TRACKED_LIMIT_PARAMETERS)?;
                let percent: f64 = context.parse_parameter(HANDLER, 2)?;
                if !(1.0..=100.0).contains(&percent) {
                    return Err(context.invalid_parameter(HANDLER, context.parameter(2)));
                }
                let key = tracked_key(&context, 5)?;
                rows_source(&context, 3, Some(percent), Some(key))?
            }
            SourceType::Reference => {
                context.expect_parameters(HANDLER, REFERENCE_PARAMETERS)?;
                let key = tracked_key(&context, 3)?;
                let row = context
                    .state()
                    .csv_rows()
                    .get(&key)
                    .map(|row| Arc::clone(&row))
                    .ok_or_else(|| context.invalid_parameter(HANDLER, &key))?;
                CsvSource::Reference {
                    row,
                    field: context.parameter(2).to_string(),
                }
            }
            _ => return Err(context.unsupported(HANDLER)),
        };

        Ok(Self { context, source })
    }

    /// Next row for this provider and collection file. The cursor restarts at row 0
    /// once it passes the last permitted row.
    fn next_row(
        &self,
        file_name: &str,
        rows: &[Arc<CsvRecord>],
        limit: Option<f64>,
    ) -> Arc<CsvRecord> {
        let max_rows = limit.map_or(rows.len(), |percent| {
            ((percent * rows.len() as f64) / 100.0).floor() as usize
        });
        let cursor_key = format!("{}{}", self.context.provider(), file_name);

        let mut cursor = self
            .context
            .state()
            .csv_cursors()
            .entry(cursor_key)
            .or_insert(0);
        let index = if *cursor < max_rows { *cursor } else { 0 };
        *cursor = index + 1;
        Arc::clone(&rows[index])
    }

    fn field_value(&self, row: &CsvRecord, field: &str) -> Result<String, HandlerError> {
        row.get(field)
            .map(str::to_string)
            .ok_or_else(|| self.context.not_found(HANDLER, "field", field))
    }
}

impl TokenHandler for CsvCollectionHandler<'_> {
    fn replacement_value(&mut self) -> Result<String, HandlerError> {
        match &self.source {
            CsvSource::Rows {
                file_name,
                rows,
                limit,
                field,
                key,
            } => {
                let row = self.next_row(file_name, rows, *limit);
                let value = self.field_value(&row, field)?;
                if let Some(key) = key {
                    self.context.state().csv_rows().insert(key.clone(), row);
                }
                Ok(value)
            }
            CsvSource::Reference { row, field } => self.field_value(row, field),
        }
    }
}

fn tracked_key(context: &HandlerContext<'_>, index: usize) -> Result<String, HandlerError> {
    context.tracked_key(HANDLER, index, KeyScope::Worker, CSV_COLLECTION_SUFFIX)
}

/// Rows of the collection named at `index`, with the field name following it.
fn rows_source<'a>(
    context: &HandlerContext<'a>,
    index: usize,
    limit: Option<f64>,
    key: Option<String>,
) -> Result<CsvSource<'a>, HandlerError> {
    let file_name = format!("{}{}", context.parameter(index), CSV_COLLECTION_SUFFIX);
    let rows = context
        .template()
        .collection(&file_name)
        .and_then(|collection| collection.as_csv())
        .ok_or_else(|| context.not_found(HANDLER, "collection", &file_name))?;
    if rows.is_empty() {
        return Err(context.not_found(HANDLER, "rows in collection", &file_name));
    }

    Ok(CsvSource::Rows {
        file_name,
        rows,
        limit,
        field: context.parameter(index + 1).to_string(),
        key,
    })
}
