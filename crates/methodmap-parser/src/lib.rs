//! Definition and call-site extraction for Ruby, ERB and
//! JavaScript/TypeScript, plus the two-phase corpus analysis that ties the
//! extractors to the dependency graph.
//!
//! Extraction is line-oriented: strings and comments are blanked, definitions
//! are found with anchored patterns and bracket or `end` counting, and a call
//! candidate is kept only when the corpus registry or the language's
//! framework allowlist knows its name.

pub mod analysis;
pub mod erb;
pub mod extractor;
pub mod gate;
pub mod javascript;
pub mod languages;
pub mod ruby;
pub mod scanning;

pub use analysis::{AnalysisContext, analyze_corpus};
pub use extractor::{Extraction, LanguageExtractor, ParserFactory, ScanLimits};
pub use javascript::JsStrategy;
