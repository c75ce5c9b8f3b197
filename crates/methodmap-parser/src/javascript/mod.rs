//! JavaScript / TypeScript / TSX extraction.
//!
//! Two strategies produce the same output: a tree-sitter walk (cargo feature
//! `ast`, on by default) and a line-pattern scanner. The strategy is chosen
//! once when the extractor is built; the syntax tree strategy falls back to
//! the line scanner for any file it cannot parse cleanly.

#[cfg(feature = "ast")]
mod ast;
mod heuristic;

use crate::extractor::{
    Extraction, LanguageExtractor, ScanLimits, innermost_callable, source_lines,
};
use crate::gate::CallGate;
use crate::languages::Vocabulary;
use crate::scanning::truncate_snippet;
use methodmap_core::config::JsStrategyPreference;
use methodmap_core::error::AnalysisError;
use methodmap_core::method::{CallSite, Method, MethodKind};
use methodmap_core::registry::DefinedMethodRegistry;
use methodmap_core::source::{Language, SourceFile};
use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;
use tracing::debug;

/// How definitions and call candidates are found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsStrategy {
    /// Walk a tree-sitter syntax tree.
    Ast,
    /// Anchored line patterns and bracket counting.
    Heuristic,
}

impl JsStrategy {
    /// Pick the strategy for a preference, given what was compiled in.
    pub fn select(preference: JsStrategyPreference) -> Self {
        match preference {
            JsStrategyPreference::Heuristic => JsStrategy::Heuristic,
            JsStrategyPreference::Auto if cfg!(feature = "ast") => JsStrategy::Ast,
            JsStrategyPreference::Auto => JsStrategy::Heuristic,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            JsStrategy::Ast => "ast",
            JsStrategy::Heuristic => "heuristic",
        }
    }
}

/// An identifier used like a call (`name(`, `new Name(`, `<Name`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Candidate {
    pub name: String,
    pub line: usize,
}

/// Raw strategy output, before call sites are gated and attributed.
#[derive(Debug, Default)]
pub(crate) struct JsScan {
    pub methods: Vec<Method>,
    pub candidates: Vec<Candidate>,
    pub diagnostics: Vec<AnalysisError>,
}

pub struct JavascriptExtractor {
    strategy: JsStrategy,
    vocabulary: Vocabulary,
    limits: ScanLimits,
}

impl JavascriptExtractor {
    pub fn new(strategy: JsStrategy, vocabulary: Vocabulary, limits: ScanLimits) -> Self {
        Self {
            strategy,
            vocabulary,
            limits,
        }
    }

    fn scan(&self, file: &SourceFile, lines: &[&str]) -> JsScan {
        let mut scan = match self.strategy {
            JsStrategy::Ast => match ast_scan(file, lines) {
                Ok(scan) => scan,
                Err(reason) => {
                    debug!(path = %file.path, %reason, "falling back to heuristic scan");
                    heuristic::scan(file, lines, self.limits)
                }
            },
            JsStrategy::Heuristic => heuristic::scan(file, lines, self.limits),
        };
        scan.methods.retain(|m| {
            !m.name.is_empty()
                && !self.vocabulary.is_keyword(&m.name)
                && !(m.kind.is_resolvable() && self.vocabulary.is_builtin(&m.name))
        });
        scan
    }
}

#[cfg(feature = "ast")]
fn ast_scan(file: &SourceFile, lines: &[&str]) -> Result<JsScan, AnalysisError> {
    ast::scan(file, lines)
}

#[cfg(not(feature = "ast"))]
fn ast_scan(_file: &SourceFile, _lines: &[&str]) -> Result<JsScan, AnalysisError> {
    Err(AnalysisError::ParserUnavailable {
        reason: "built without the `ast` feature".to_string(),
    })
}

impl LanguageExtractor for JavascriptExtractor {
    fn name(&self) -> &'static str {
        "javascript"
    }

    fn supports(&self, language: Language) -> bool {
        language.is_js_like()
    }

    fn extract_definitions(&self, file: &SourceFile) -> Extraction {
        let lines = source_lines(file);
        let scan = self.scan(file, &lines);
        Extraction {
            methods: scan.methods,
            template_calls: Vec::new(),
            diagnostics: scan.diagnostics,
        }
    }

    fn analyze(&self, file: &SourceFile, registry: &DefinedMethodRegistry) -> Extraction {
        let lines = source_lines(file);
        let JsScan {
            mut methods,
            candidates,
            diagnostics,
        } = self.scan(file, &lines);

        let mut local = DefinedMethodRegistry::from_methods(&methods);
        let mut import_lines: HashMap<String, usize> = HashMap::new();
        for import in methods.iter().filter(|m| m.kind == MethodKind::Import) {
            for binding in &import.bindings {
                local.insert(binding.clone());
                import_lines
                    .entry(binding.clone())
                    .or_insert(import.start_line);
            }
        }
        let gate = CallGate::new(&self.vocabulary, registry, &local);

        let mut accepted: Vec<(usize, CallSite)> = Vec::new();
        for candidate in candidates {
            let Some(owner) = innermost_callable(&methods, candidate.line) else {
                continue;
            };
            if !gate.accepts(&candidate.name) {
                continue;
            }
            let Some(raw) = lines.get(candidate.line - 1) else {
                continue;
            };
            accepted.push((
                owner,
                CallSite {
                    import_line: import_lines.get(&candidate.name).copied(),
                    method_name: candidate.name,
                    line: candidate.line,
                    snippet: truncate_snippet(raw, self.limits.max_snippet_len),
                },
            ));
        }
        for (owner, call) in accepted {
            methods[owner].push_call(call);
        }

        Extraction {
            methods,
            template_calls: Vec::new(),
            diagnostics,
        }
    }
}

pub(crate) fn looks_like_custom_hook(name: &str) -> bool {
    if !name.starts_with("use") || name.len() <= 3 {
        return false;
    }
    name.chars().nth(3).is_some_and(|c| c.is_ascii_uppercase())
}

pub(crate) fn looks_like_react_component(name: &str, source_snippet: &str) -> bool {
    static JSX_RETURN_RE: OnceLock<Regex> = OnceLock::new();
    let starts_upper = name.chars().next().is_some_and(|c| c.is_ascii_uppercase());
    if !starts_upper {
        return false;
    }
    let jsx_re = JSX_RETURN_RE
        .get_or_init(|| Regex::new(r"(?:\breturn|=>)\s*\(?\s*<[A-Za-z>/]").unwrap());
    jsx_re.is_match(source_snippet) || source_snippet.contains("className=")
}

/// Kind of a free-standing function-like definition.
pub(crate) fn classify_function(name: &str, source_snippet: &str) -> MethodKind {
    if looks_like_custom_hook(name) {
        MethodKind::CustomHook
    } else if looks_like_react_component(name, source_snippet) {
        MethodKind::Component
    } else {
        MethodKind::Function
    }
}

/// Whether the text contains JSX syntax.
pub(crate) fn has_jsx_markers(source: &str) -> bool {
    static JSX_RE: OnceLock<Regex> = OnceLock::new();
    JSX_RE
        .get_or_init(|| Regex::new(r"</[A-Za-z]|/>|<>").unwrap())
        .is_match(source)
}

/// Local names bound by an import clause such as
/// `React, { useState, Foo as Bar }` or `* as ns`.
pub(crate) fn import_clause_bindings(clause: &str) -> Vec<String> {
    let clause = clause.trim();
    let mut bindings = Vec::new();
    let (default_part, named_part) = match (clause.find('{'), clause.rfind('}')) {
        (Some(open), Some(close)) if open < close => {
            (&clause[..open], Some(&clause[open + 1..close]))
        }
        _ => (clause, None),
    };

    for part in default_part.split(',') {
        let part = part.trim();
        if let Some(ns) = part.strip_prefix('*') {
            if let Some(name) = ns.trim().strip_prefix("as") {
                push_identifier(&mut bindings, name);
            }
        } else {
            push_identifier(&mut bindings, part.trim_start_matches("type "));
        }
    }
    if let Some(named) = named_part {
        for spec in named.split(',') {
            let spec = spec.trim().trim_start_matches("type ");
            let local = spec.rsplit(" as ").next().unwrap_or(spec);
            // `{ a: b }` in destructured requires.
            let local = local.rsplit(':').next().unwrap_or(local);
            push_identifier(&mut bindings, local);
        }
    }
    bindings
}

fn push_identifier(out: &mut Vec<String>, candidate: &str) {
    let candidate = candidate.trim();
    let valid = !candidate.is_empty()
        && candidate
            .chars()
            .all(|c| c.is_alphanumeric() || c == '_' || c == '$')
        && !candidate.starts_with(|c: char| c.is_ascii_digit());
    if valid && !out.iter().any(|b| b == candidate) {
        out.push(candidate.to_string());
    }
}

/// Strip a trailing `as alias` and return `(local, exported)` names of one
/// export specifier.
pub(crate) fn export_specifier(spec: &str) -> Option<(String, String)> {
    let spec = spec.trim().trim_start_matches("type ").trim();
    if spec.is_empty() {
        return None;
    }
    match spec.split_once(" as ") {
        Some((local, exported)) => Some((local.trim().to_string(), exported.trim().to_string())),
        None => Some((spec.to_string(), spec.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hook_and_component_classification() {
        assert_eq!(classify_function("useAuth", "return user"), MethodKind::CustomHook);
        assert_eq!(
            classify_function("Foo", "const Foo = () => { return <div/>; };"),
            MethodKind::Component
        );
        assert_eq!(
            classify_function("Card", "function Card() {\n  return (\n    <section>"),
            MethodKind::Component
        );
        assert_eq!(classify_function("user", "return <div/>"), MethodKind::Function);
        assert_eq!(classify_function("Parser", "return a < b"), MethodKind::Function);
        assert_eq!(classify_function("user", "x"), MethodKind::Function);
    }

    #[test]
    fn test_import_clause_bindings() {
        assert_eq!(
            import_clause_bindings("React, { useState, Foo as Bar, type Props }"),
            vec!["React", "useState", "Bar", "Props"]
        );
        assert_eq!(import_clause_bindings("* as utils"), vec!["utils"]);
        assert_eq!(import_clause_bindings("{ a: b, c }"), vec!["b", "c"]);
    }

    #[test]
    fn test_export_specifier() {
        assert_eq!(
            export_specifier("helper as default"),
            Some(("helper".to_string(), "default".to_string()))
        );
        assert_eq!(export_specifier(" "), None);
    }

    #[test]
    fn test_strategy_selection() {
        assert_eq!(
            JsStrategy::select(JsStrategyPreference::Heuristic),
            JsStrategy::Heuristic
        );
        let auto = JsStrategy::select(JsStrategyPreference::Auto);
        assert_eq!(auto == JsStrategy::Ast, cfg!(feature = "ast"));
    }

    #[test]
    fn test_jsx_markers() {
        assert!(has_jsx_markers("return <div/>"));
        assert!(has_jsx_markers("<><A/></>"));
        assert!(!has_jsx_markers("const x: Array<number> = [];"));
    }
}
