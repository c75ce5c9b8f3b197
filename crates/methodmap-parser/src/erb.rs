//! ERB templates: call sites inside `<% %>` / `<%= %>` tags.
//!
//! Templates define nothing. Every call found in a file is gathered into one
//! file-level `erb_call` method plus per-callee [`TemplateCall`] records.

use crate::extractor::{Extraction, LanguageExtractor, ScanLimits, code_slice, source_lines};
use crate::gate::CallGate;
use crate::languages::Vocabulary;
use crate::ruby::ruby_call_names;
use crate::scanning::{LineCleaner, truncate_snippet};
use methodmap_core::analysis::TemplateCall;
use methodmap_core::method::{CallSite, Method, MethodKind};
use methodmap_core::registry::DefinedMethodRegistry;
use methodmap_core::source::{Language, SourceFile};
use std::collections::HashSet;

pub struct ErbExtractor {
    vocabulary: Vocabulary,
    limits: ScanLimits,
}

impl ErbExtractor {
    pub fn new(vocabulary: Vocabulary, limits: ScanLimits) -> Self {
        Self { vocabulary, limits }
    }
}

/// Ruby code from one line of one template tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct TagSegment {
    /// 1-indexed line.
    pub line: usize,
    pub code: String,
    /// Ordinal of the tag the segment belongs to.
    pub tag: usize,
}

/// Split template lines into the Ruby code inside its tags.
///
/// Comment tags (`<%#`) and literal `<%%` are skipped; a tag may span lines.
pub(crate) fn template_segments(lines: &[&str]) -> Vec<TagSegment> {
    let mut segments = Vec::new();
    let mut inside = false;
    let mut comment = false;
    let mut tag = 0;

    for (i, line) in lines.iter().enumerate() {
        let mut rest: &str = line;
        loop {
            if !inside {
                let Some(open) = rest.find("<%") else {
                    break;
                };
                let after = &rest[open + 2..];
                if let Some(literal) = after.strip_prefix('%') {
                    rest = literal;
                    continue;
                }
                comment = after.starts_with('#');
                inside = true;
                tag += 1;
                rest = after.trim_start_matches(['=', '-', '#']);
            } else {
                match rest.find("%>") {
                    Some(close) => {
                        let body = rest[..close].trim_end_matches('-');
                        if !comment && !body.trim().is_empty() {
                            segments.push(TagSegment {
                                line: i + 1,
                                code: body.to_string(),
                                tag,
                            });
                        }
                        inside = false;
                        rest = &rest[close + 2..];
                    }
                    None => {
                        if !comment && !rest.trim().is_empty() {
                            segments.push(TagSegment {
                                line: i + 1,
                                code: rest.to_string(),
                                tag,
                            });
                        }
                        break;
                    }
                }
            }
        }
    }
    segments
}

impl LanguageExtractor for ErbExtractor {
    fn name(&self) -> &'static str {
        "erb"
    }

    fn supports(&self, language: Language) -> bool {
        language == Language::Erb
    }

    fn extract_definitions(&self, _file: &SourceFile) -> Extraction {
        Extraction::empty()
    }

    fn analyze(&self, file: &SourceFile, registry: &DefinedMethodRegistry) -> Extraction {
        let lines = source_lines(file);
        if lines.is_empty() {
            return Extraction::empty();
        }

        let local = DefinedMethodRegistry::new();
        let gate = CallGate::new(&self.vocabulary, registry, &local);
        let mut method = Method::new(
            file.file_name(),
            MethodKind::ErbCall,
            &file.path,
            1,
            lines.len(),
        );

        let mut locals: HashSet<String> = HashSet::new();
        let mut cleaner = LineCleaner::new(Language::Erb);
        let mut current_tag = 0;
        for segment in template_segments(&lines) {
            if segment.tag != current_tag {
                cleaner = LineCleaner::new(Language::Erb);
                current_tag = segment.tag;
            }
            let cleaned = cleaner.clean(&segment.code);
            for name in ruby_call_names(&cleaned, &gate, &mut locals) {
                method.push_call(CallSite {
                    method_name: name,
                    line: segment.line,
                    snippet: truncate_snippet(lines[segment.line - 1], self.limits.max_snippet_len),
                    import_line: None,
                });
            }
        }

        if method.calls.is_empty() {
            return Extraction::empty();
        }
        method.code = code_slice(&lines, 1, lines.len());
        let template_calls = TemplateCall::collect(&method);
        Extraction {
            methods: vec![method],
            template_calls,
            diagnostics: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segments_skip_comments_and_literals() {
        let lines = vec![
            "<h1><%= title %></h1>",
            "<%# hidden(call) %>",
            "<p><%% not_code %></p>",
            "<% if admin? -%>",
        ];
        let segments = template_segments(&lines);
        let codes: Vec<(usize, &str)> = segments
            .iter()
            .map(|s| (s.line, s.code.trim()))
            .collect();
        assert_eq!(codes, vec![(1, "title"), (4, "if admin?")]);
    }

    #[test]
    fn test_multiline_tag() {
        let lines = vec!["<%= render partial: 'row',", "      locals: { row: row } %>"];
        let segments = template_segments(&lines);
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].tag, segments[1].tag);
        assert_eq!(segments[1].line, 2);
    }

    #[test]
    fn test_two_tags_on_one_line() {
        let lines = vec!["<%= a %> and <%= b %>"];
        let segments = template_segments(&lines);
        assert_eq!(segments.len(), 2);
        assert_ne!(segments[0].tag, segments[1].tag);
    }
}
