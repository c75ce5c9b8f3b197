//! Core data model for methodmap.
//!
//! Source files ([`source::SourceFile`]), extracted definitions and call
//! sites ([`method::Method`]), the corpus-wide name registry, the caller →
//! callee dependency graph, query helpers, configuration, and the JSON
//! report format.

pub mod analysis;
pub mod config;
pub mod error;
pub mod export;
pub mod graph;
pub mod method;
pub mod query;
pub mod registry;
pub mod schema;
pub mod source;
pub mod storage;
