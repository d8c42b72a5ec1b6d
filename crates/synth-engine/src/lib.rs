//! Format engines for datasynth.
//!
//! An engine owns one prepared template for one provider and turns each render into a
//! typed payload:
//!
//! | Engine  | Output         | Validation                                   |
//! |---------|----------------|----------------------------------------------|
//! | `Raw`   | `String`       | none                                         |
//! | `CSV`   | `String`       | none, header taken from `::Header=` metadata |
//! | `JSON`  | `Value`        | every render must parse                      |
//! | `JSONL` | `String`       | the first render must parse                  |
//! | `Parquet` | `Map`        | every render must be a JSON object           |
//! | `Gremlin` | `GraphElement` | every render must be a vertex or an edge   |
//! | `XML`   | `XmlElement`   | every render must be a single-root document  |
//! | `Image` | `ImageSpec`    | JSON spec, rasterized to the requested format|
//! | `Proto` | `ProtoPayload` | JSON envelope mapped onto a `.proto` message |
//!
//! Engines are `Send + Sync` and are shared by all queue workers; `build_payload`
//! takes the worker id so per-worker tracked values stay separate.

pub mod csv;
pub mod engine;
pub mod error;
pub mod gremlin;
pub mod image;
pub mod json;
pub mod proto;
pub mod raw;
pub mod xml;

pub use crate::csv::CsvEngine;
pub use crate::image::{FontBook, ImageEngine, ImageSpec};
pub use crate::gremlin::{GraphElement, GremlinEdge, GremlinEngine, GremlinVertex};
pub use crate::json::{JsonEngine, JsonlEngine, ParquetEngine};
pub use crate::proto::{ProtoEngine, ProtoPayload, ProtoPool};
pub use crate::raw::RawEngine;
pub use crate::xml::{XmlElement, XmlEngine, XmlNode};
pub use engine::{spawn_reset_on_cancel, Engine, EngineConfig, EngineCore, EngineKind};
pub use error::EngineError;
