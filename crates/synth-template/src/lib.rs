//! Template tokens, token handlers and the template/collection store.
//!
//! A template is a text file whose body contains `{{...}}` tokens. Every token is a
//! colon-separated descriptor naming a handler and a source type followed by
//! handler-specific parameters:
//!
//! ```text
//! {{Number:Range:1..100:2}}
//! {{Guid:Tracked:order-id}}
//! {{CsvCollection:TrackedLimit:50:people:Name:person}}
//! ```
//!
//! # Architecture
//!
//! ```text
//! templates_dir/*.template.*      collections_dir/*.collections.{json,csv}
//!            │                                  │
//!            └───────────────┬──────────────────┘
//!                            ▼
//!                  ┌───────────────────┐
//!                  │   TemplateStore   │  lazy load, per-provider TemplateData
//!                  │   - TokenState    │  tracked values shared by all handlers
//!                  └─────────┬─────────┘
//!                            ▼
//!          TemplateData { metadata, segments, collections }
//!                            │ render(RenderScope)
//!                            ▼
//!          Literal segments + TokenHandler::replacement_value()
//! ```
//!
//! # Example
//!
//! ```rust
//! use synth_template::TemplateStore;
//!
//! let store = TemplateStore::from_sources(
//!     [("greeting.template.txt".to_string(), "id={{Number:Range:1..1.4:0}}".to_string())],
//!     [],
//! );
//! let rendered = store.render("demo", "greeting.template.txt", 0).unwrap();
//! assert_eq!(rendered, "id=1");
//! ```

#[macro_use]
mod macros;

pub mod collection;
pub mod descriptor;
pub mod error;
pub mod handlers;
pub mod random;
pub mod state;
pub mod store;
pub mod template;

pub use collection::{Collection, Collections, CsvRecord};
pub use descriptor::{HandlerType, SourceType, TokenDescriptor};
pub use error::{DescriptorError, HandlerError, TemplateError};
pub use handlers::{create_handler, HandlerContext, TokenHandler};
pub use state::TokenState;
pub use store::{StoreConfig, TemplateStore, COLLECTIONS_DIR, MAX_NESTING_DEPTH, TEMPLATES_DIR};
pub use template::{RenderScope, Segment, TemplateData};
