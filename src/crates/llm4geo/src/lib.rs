//! # llm4geo
//!
//! Turns a natural-language request about a QGIS project into a validated
//! function call `{chat, function_name, parameters}` using two structured
//! model calls:
//!
//! 1. **Selection** picks one function from the [`FunctionCatalog`]. Names
//!    outside the catalog are re-prompted a bounded number of times.
//! 2. **Resolution** fills in that function's parameters, grounded in the
//!    client's [`ProjectDescription`], and validates them against the
//!    function's JSON Schema, feeding validation errors back on failure.
//!
//! Functions without parameters skip the second stage. The core is
//! stateless per request; callers pass a bounded [`ChatHistory`] back in.
//!
//! ```rust,ignore
//! use llm4geo::{ChatHistory, FunctionCatalog, ProjectDescription, ProtocolOrchestrator, ProtocolSettings};
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//!
//! let catalog = Arc::new(FunctionCatalog::builtin()?);
//! let orchestrator = ProtocolOrchestrator::new(model, catalog, ProtocolSettings::default());
//! let call = orchestrator
//!     .handle(
//!         "add OpenStreetMap imagery",
//!         &ProjectDescription::empty(),
//!         &ChatHistory::default(),
//!         &CancellationToken::new(),
//!     )
//!     .await?;
//! assert_eq!(call.function_name, "add_map_layer");
//! ```

pub mod api;
pub mod catalog;
pub mod client;
pub mod config;
pub mod error;
pub mod export;
pub mod extractor;
pub mod history;
pub mod project;
pub mod prompts;
pub mod protocol;
pub mod resolver;
pub mod retry;
pub mod schema;
pub mod selector;

#[cfg(test)]
mod testing;

pub use catalog::{FunctionCatalog, FunctionSpec, ParameterSchema, PropertySchema};
pub use error::{ProtocolError, Result};
pub use export::{DataExportAdvisor, DataSource, ExportRecommendation, FileFormat};
pub use extractor::StructuredExtractor;
pub use history::{ChatHistory, HistoryPolicy};
pub use project::ProjectDescription;
pub use protocol::{InvocationResult, ProtocolOrchestrator, ProtocolSettings};
pub use resolver::{ParameterResolver, ParameterSet};
pub use retry::RetryPolicy;
pub use schema::SchemaValidator;
pub use selector::{FunctionSelection, FunctionSelector};
