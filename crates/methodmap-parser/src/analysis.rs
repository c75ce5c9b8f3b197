//! Two-phase corpus analysis.
//!
//! Phase 1 runs every extractor in definitions-only mode and unions the
//! names into one [`DefinedMethodRegistry`]. Phase 2 runs full extraction per
//! file against that registry. Phase 2 never starts before the registry is
//! complete. Files are independent within a phase and may run in parallel.

use crate::extractor::{Extraction, ParserFactory};
use methodmap_core::analysis::{CorpusAnalysis, FileAnalysis};
use methodmap_core::config::AnalyzerConfig;
use methodmap_core::error::AnalysisError;
use methodmap_core::graph::build_dependencies;
use methodmap_core::method::Method;
use methodmap_core::registry::DefinedMethodRegistry;
use methodmap_core::source::SourceFile;
use rayon::prelude::*;
use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};
use tracing::{info, warn};

/// Caller-owned analysis state: configuration plus the extractor factory.
///
/// Holds no per-corpus data, so one context can analyze any number of
/// corpora, concurrently or not.
pub struct AnalysisContext {
    config: AnalyzerConfig,
    factory: ParserFactory,
}

impl AnalysisContext {
    pub fn new(config: AnalyzerConfig) -> Self {
        let factory = ParserFactory::new(&config);
        Self { config, factory }
    }

    /// A context with a custom set of extractors.
    pub fn with_factory(config: AnalyzerConfig, factory: ParserFactory) -> Self {
        Self { config, factory }
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    pub fn factory(&self) -> &ParserFactory {
        &self.factory
    }

    /// Phase 1: the names defined anywhere in `files`.
    pub fn collect_definitions(&self, files: &[SourceFile]) -> DefinedMethodRegistry {
        let per_file = self.map_files(files, |file| {
            let Some(extractor) = self.factory.extractor_for(file.language) else {
                return DefinedMethodRegistry::new();
            };
            match isolate(file, || extractor.extract_definitions(file)) {
                Ok(extraction) => DefinedMethodRegistry::from_methods(&extraction.methods),
                Err(_) => DefinedMethodRegistry::new(),
            }
        });

        let mut registry = DefinedMethodRegistry::new();
        for names in &per_file {
            registry.union(names);
        }
        registry
    }

    /// Phase 2 for one file.
    ///
    /// Never fails: an unsupported language or a panicking extractor yields
    /// an empty method list with a diagnostic.
    pub fn analyze_file(&self, file: &SourceFile, registry: &DefinedMethodRegistry) -> FileAnalysis {
        let mut result = FileAnalysis::empty(&file.path, file.language);
        let Some(extractor) = self.factory.extractor_for(file.language) else {
            result.diagnostics.push(AnalysisError::UnsupportedLanguage {
                language: file.language.name().to_string(),
            });
            return result;
        };

        match isolate(file, || extractor.analyze(file, registry)) {
            Ok(extraction) => {
                let Extraction {
                    methods,
                    template_calls,
                    diagnostics,
                } = extraction;
                result.methods = within_bounds(file, methods);
                result.template_calls = template_calls;
                result.diagnostics = diagnostics;
            }
            Err(diagnostic) => result.diagnostics.push(diagnostic),
        }
        result
    }

    /// Both phases plus the dependency graph.
    pub fn analyze_corpus(&self, files: &[SourceFile]) -> CorpusAnalysis {
        let registry = self.collect_definitions(files);
        info!(
            files = files.len(),
            names = registry.len(),
            "definition pass complete"
        );

        let analyses = self.map_files(files, |file| self.analyze_file(file, &registry));
        let methods: Vec<Method> = analyses
            .iter()
            .flat_map(|f| f.methods.iter().cloned())
            .collect();
        let dependencies =
            build_dependencies(&methods, self.config.graph.max_representative_lines);

        let analysis = CorpusAnalysis {
            files: analyses,
            registry,
            dependencies,
        };
        info!(
            methods = analysis.method_count(),
            calls = analysis.call_count(),
            edges = analysis.dependencies.len(),
            "call pass complete"
        );
        analysis
    }

    fn map_files<T, F>(&self, files: &[SourceFile], f: F) -> Vec<T>
    where
        T: Send,
        F: Fn(&SourceFile) -> T + Send + Sync,
    {
        if self.config.analysis.parallel {
            files.par_iter().map(f).collect()
        } else {
            files.iter().map(f).collect()
        }
    }
}

impl Default for AnalysisContext {
    fn default() -> Self {
        Self::new(AnalyzerConfig::default())
    }
}

/// Analyze a corpus with the default configuration.
pub fn analyze_corpus(files: &[SourceFile]) -> CorpusAnalysis {
    AnalysisContext::default().analyze_corpus(files)
}

/// Run one extractor call, turning a panic into an `Unexpected` diagnostic.
fn isolate(
    file: &SourceFile,
    run: impl FnOnce() -> Extraction,
) -> Result<Extraction, AnalysisError> {
    catch_unwind(AssertUnwindSafe(run)).map_err(|payload| {
        let message = panic_message(payload.as_ref());
        warn!(path = %file.path, %message, "extractor panicked, skipping file");
        AnalysisError::Unexpected {
            path: file.path.clone(),
            message,
        }
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Clamp definitions to the file's line range and drop call sites outside
/// their method.
fn within_bounds(file: &SourceFile, methods: Vec<Method>) -> Vec<Method> {
    let limit = file.line_limit();
    methods
        .into_iter()
        .filter(|m| m.start_line >= 1 && m.start_line <= limit)
        .map(|mut m| {
            m.end_line = m.end_line.clamp(m.start_line, limit);
            let (start, end) = (m.start_line, m.end_line);
            m.calls.retain(|c| c.line >= start && c.line <= end);
            m
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use methodmap_core::method::{CallSite, MethodKind};
    use methodmap_core::source::Language;

    #[test]
    fn test_within_bounds_clamps_and_filters() {
        let file = SourceFile::new("a.rb", Language::Ruby, "def a\n  b\nend\n");
        let mut long = Method::new("a", MethodKind::Method, "a.rb", 1, 9);
        long.calls.push(CallSite {
            method_name: "b".into(),
            line: 2,
            snippet: "b".into(),
            import_line: None,
        });
        long.calls.push(CallSite {
            method_name: "c".into(),
            line: 7,
            snippet: "c".into(),
            import_line: None,
        });
        let outside = Method::new("z", MethodKind::Method, "a.rb", 5, 6);

        let kept = within_bounds(&file, vec![long, outside]);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].end_line, 3);
        assert_eq!(kept[0].calls.len(), 1);
    }

    #[test]
    fn test_panic_message() {
        let payload: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(payload.as_ref()), "boom");
        let payload: Box<dyn Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(payload.as_ref()), "bang");
        let payload: Box<dyn Any + Send> = Box::new(7u8);
        assert_eq!(panic_message(payload.as_ref()), "unknown panic");
    }

    #[test]
    fn test_unsupported_language_is_empty() {
        let ctx = AnalysisContext::default();
        let file = SourceFile::new("main.py", Language::from_tag("python"), "def f():\n  pass\n");
        let result = ctx.analyze_file(&file, &DefinedMethodRegistry::new());
        assert!(result.methods.is_empty());
        assert!(matches!(
            result.diagnostics.as_slice(),
            [AnalysisError::UnsupportedLanguage { .. }]
        ));
    }
}
