//! Per-file and corpus-wide analysis results.

use crate::error::AnalysisError;
use crate::graph::Dependency;
use crate::method::Method;
use crate::query;
use crate::registry::DefinedMethodRegistry;
use crate::source::Language;
use serde::{Deserialize, Serialize};

/// Display record for one callee referenced from a template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateCall {
    pub name: String,
    /// Lines the callee appears on, ascending.
    pub lines: Vec<usize>,
    pub count: usize,
}

impl TemplateCall {
    /// Group the call sites of a template method by callee, in first-seen
    /// order.
    pub fn collect(method: &Method) -> Vec<TemplateCall> {
        let mut out: Vec<TemplateCall> = Vec::new();
        for call in &method.calls {
            match out.iter_mut().find(|t| t.name == call.method_name) {
                Some(existing) => {
                    existing.count += 1;
                    if !existing.lines.contains(&call.line) {
                        existing.lines.push(call.line);
                    }
                }
                None => out.push(TemplateCall {
                    name: call.method_name.clone(),
                    lines: vec![call.line],
                    count: 1,
                }),
            }
        }
        for record in &mut out {
            record.lines.sort_unstable();
        }
        out
    }
}

/// Everything extracted from one source file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileAnalysis {
    pub path: String,
    pub language: Language,
    pub methods: Vec<Method>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub template_calls: Vec<TemplateCall>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<AnalysisError>,
}

impl FileAnalysis {
    pub fn empty(path: impl Into<String>, language: Language) -> Self {
        Self {
            path: path.into(),
            language,
            methods: Vec::new(),
            template_calls: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    pub fn call_count(&self) -> usize {
        self.methods.iter().map(|m| m.calls.len()).sum()
    }
}

/// Result of analyzing a whole corpus.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CorpusAnalysis {
    /// One entry per input file, in input order.
    pub files: Vec<FileAnalysis>,
    pub registry: DefinedMethodRegistry,
    pub dependencies: Vec<Dependency>,
}

impl CorpusAnalysis {
    /// All methods of the corpus, flattened in file order.
    pub fn methods(&self) -> Vec<Method> {
        self.files
            .iter()
            .flat_map(|f| f.methods.iter().cloned())
            .collect()
    }

    pub fn method_count(&self) -> usize {
        self.files.iter().map(|f| f.methods.len()).sum()
    }

    pub fn call_count(&self) -> usize {
        self.files.iter().map(FileAnalysis::call_count).sum()
    }

    pub fn file(&self, path: &str) -> Option<&FileAnalysis> {
        self.files.iter().find(|f| f.path == path)
    }

    /// First definition named `name` in corpus order.
    pub fn find_definition(&self, name: &str) -> Option<&Method> {
        self.files
            .iter()
            .find_map(|f| query::find_definition(&f.methods, name))
    }

    /// Every method in the corpus that calls `name`.
    pub fn find_callers(&self, name: &str) -> Vec<&Method> {
        self.files
            .iter()
            .flat_map(|f| query::find_callers(&f.methods, name))
            .collect()
    }

    pub fn diagnostics(&self) -> impl Iterator<Item = (&str, &AnalysisError)> {
        self.files
            .iter()
            .flat_map(|f| f.diagnostics.iter().map(move |d| (f.path.as_str(), d)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::method::{CallSite, MethodKind};

    fn call(name: &str, line: usize) -> CallSite {
        CallSite {
            method_name: name.into(),
            line,
            snippet: String::new(),
            import_line: None,
        }
    }

    #[test]
    fn test_template_calls_grouped() {
        let mut m = Method::new("show.html.erb", MethodKind::ErbCall, "show.html.erb", 1, 5);
        m.calls = vec![call("name", 4), call("link_to", 2), call("name", 1)];
        let records = TemplateCall::collect(&m);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].name, "name");
        assert_eq!(records[0].lines, vec![1, 4]);
        assert_eq!(records[0].count, 2);
    }

    #[test]
    fn test_corpus_queries() {
        let mut a = FileAnalysis::empty("a.rb", Language::Ruby);
        let mut caller = Method::new("a", MethodKind::Method, "a.rb", 1, 3);
        caller.calls.push(call("b", 2));
        a.methods.push(caller);
        let mut b = FileAnalysis::empty("b.rb", Language::Ruby);
        b.methods.push(Method::new("b", MethodKind::Method, "b.rb", 1, 2));

        let corpus = CorpusAnalysis {
            files: vec![a, b],
            ..Default::default()
        };
        assert_eq!(corpus.method_count(), 2);
        assert_eq!(corpus.call_count(), 1);
        assert_eq!(corpus.find_definition("b").unwrap().file_path, "b.rb");
        assert_eq!(corpus.find_callers("b")[0].name, "a");
        assert!(corpus.file("c.rb").is_none());
    }
}
