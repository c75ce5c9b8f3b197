//! Extractor capability interface and the factory that routes a file's
//! language tag to the extractor handling it.

use crate::erb::ErbExtractor;
use crate::javascript::{JavascriptExtractor, JsStrategy};
use crate::languages::Vocabulary;
use crate::ruby::RubyExtractor;
use methodmap_core::analysis::TemplateCall;
use methodmap_core::config::{AnalyzerConfig, ScanConfig};
use methodmap_core::error::AnalysisError;
use methodmap_core::method::Method;
use methodmap_core::registry::DefinedMethodRegistry;
use methodmap_core::source::{Language, SourceFile};
use tracing::debug;

/// Output of one extractor run over one file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extraction {
    pub methods: Vec<Method>,
    /// Per-callee display records (templates only).
    pub template_calls: Vec<TemplateCall>,
    pub diagnostics: Vec<AnalysisError>,
}

impl Extraction {
    pub fn empty() -> Self {
        Self::default()
    }
}

/// Scanner bounds taken from [`ScanConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanLimits {
    pub max_block_lines: usize,
    pub max_snippet_len: usize,
}

impl Default for ScanLimits {
    fn default() -> Self {
        Self::from(&ScanConfig::default())
    }
}

impl From<&ScanConfig> for ScanLimits {
    fn from(config: &ScanConfig) -> Self {
        Self {
            max_block_lines: config.max_block_lines.max(1),
            max_snippet_len: config.max_snippet_len.max(1),
        }
    }
}

/// A definition and call-site extractor for one or more languages.
///
/// Implementations must not panic on any input; the corpus driver still
/// isolates each call so a bug costs one file, not the run.
pub trait LanguageExtractor: Send + Sync {
    fn name(&self) -> &'static str;

    fn supports(&self, language: Language) -> bool;

    /// Definitions only, with no call sites. Feeds the corpus registry.
    fn extract_definitions(&self, file: &SourceFile) -> Extraction;

    /// Definitions with call sites, gated by `registry` plus the file's own
    /// definitions.
    fn analyze(&self, file: &SourceFile, registry: &DefinedMethodRegistry) -> Extraction;
}

/// Extractors keyed by language, built once per analysis context.
pub struct ParserFactory {
    extractors: Vec<Box<dyn LanguageExtractor>>,
}

impl ParserFactory {
    /// A factory with no extractors registered.
    pub fn empty() -> Self {
        Self {
            extractors: Vec::new(),
        }
    }

    /// The built-in Ruby, ERB and JavaScript/TypeScript extractors.
    pub fn new(config: &AnalyzerConfig) -> Self {
        let limits = ScanLimits::from(&config.scan);
        let strategy = JsStrategy::select(config.scan.js_strategy);
        debug!(strategy = strategy.name(), "javascript strategy selected");

        let extras = |languages: &[Language]| -> Vec<String> {
            languages
                .iter()
                .flat_map(|l| config.extra_allowlist(*l).iter().cloned())
                .collect()
        };

        let mut factory = Self::empty();
        factory.register(Box::new(RubyExtractor::new(
            Vocabulary::with_extra_allowlist(Language::Ruby, extras(&[Language::Ruby])),
            limits,
        )));
        factory.register(Box::new(ErbExtractor::new(
            Vocabulary::with_extra_allowlist(
                Language::Erb,
                extras(&[Language::Ruby, Language::Erb]),
            ),
            limits,
        )));
        factory.register(Box::new(JavascriptExtractor::new(
            strategy,
            Vocabulary::with_extra_allowlist(
                Language::Javascript,
                extras(&[Language::Javascript, Language::Typescript, Language::Tsx]),
            ),
            limits,
        )));
        factory
    }

    /// Register an extractor. Earlier registrations win for a language.
    pub fn register(&mut self, extractor: Box<dyn LanguageExtractor>) {
        self.extractors.push(extractor);
    }

    pub fn extractor_for(&self, language: Language) -> Option<&dyn LanguageExtractor> {
        self.extractors
            .iter()
            .find(|e| e.supports(language))
            .map(|e| e.as_ref())
    }

    pub fn supports(&self, language: Language) -> bool {
        self.extractor_for(language).is_some()
    }
}

impl Default for ParserFactory {
    fn default() -> Self {
        Self::new(&AnalyzerConfig::default())
    }
}

/// Lines of a file, bounded by its declared line count.
pub(crate) fn source_lines(file: &SourceFile) -> Vec<&str> {
    file.content.lines().take(file.line_limit()).collect()
}

/// Index of the innermost callable method containing `line`.
pub(crate) fn innermost_callable(methods: &[Method], line: usize) -> Option<usize> {
    methods
        .iter()
        .enumerate()
        .filter(|(_, m)| m.kind.is_callable() && m.contains_line(line))
        .min_by_key(|(_, m)| m.span())
        .map(|(i, _)| i)
}

/// Raw text of the inclusive 1-indexed line range.
pub(crate) fn code_slice(lines: &[&str], start_line: usize, end_line: usize) -> String {
    let end = end_line.min(lines.len());
    if start_line == 0 || start_line > end {
        return String::new();
    }
    lines[start_line - 1..end].join("\n")
}
