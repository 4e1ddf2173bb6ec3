//! Streaming URL analysis.
//!
//! Reads candidate URLs one per line, parses each as a request URI and
//! projects a single field out of every accepted line: its host, path,
//! userinfo, query keys or values, the whole query map, or the complete
//! decomposed record.
//!
//! ```text
//! ┌──────────┐   ┌────────┐   ┌───────────┐   ┌────────────┐   ┌──────────────┐
//! │  lines   │──▶│ parsed │──▶│ validated │──▶│ projection │──▶│ keys/values  │
//! └──────────┘   └────────┘   └───────────┘   └────────────┘   └──────────────┘
//! ```
//!
//! See [`pipeline::run`] for a complete run and [`uri`] for the parser.

pub mod cli;
pub mod config;
pub mod output;
pub mod pipeline;
pub mod uri;
pub mod utils;

pub use config::{Mode, Options};
pub use output::{OutputSink, Render};
pub use pipeline::{run, Diagnostic, Pipeline, RunSummary, StageReport};
pub use uri::{parse_request_uri, ParseError, ParseMode, ParsedUri, QueryMap, UriError, Userinfo};
