//! Ruby definition and call-site extraction.
//!
//! Method ends are found by counting block openers against `end`; call sites
//! are identifiers that pass the [`CallGate`].

use crate::extractor::{
    Extraction, LanguageExtractor, ScanLimits, code_slice, innermost_callable, source_lines,
};
use crate::gate::CallGate;
use crate::languages::{Vocabulary, is_builtin, is_keyword};
use crate::scanning::{
    LineCleaner, find_matching_bracket, parse_parameters, strip_comments, truncate_snippet,
};
use methodmap_core::error::AnalysisError;
use methodmap_core::method::{CallSite, Method, MethodKind, Parameter, Visibility};
use methodmap_core::registry::DefinedMethodRegistry;
use methodmap_core::source::{Language, SourceFile};
use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;
use tracing::debug;

pub struct RubyExtractor {
    vocabulary: Vocabulary,
    limits: ScanLimits,
}

impl RubyExtractor {
    pub fn new(vocabulary: Vocabulary, limits: ScanLimits) -> Self {
        Self { vocabulary, limits }
    }
}

impl LanguageExtractor for RubyExtractor {
    fn name(&self) -> &'static str {
        "ruby"
    }

    fn supports(&self, language: Language) -> bool {
        language == Language::Ruby
    }

    fn extract_definitions(&self, file: &SourceFile) -> Extraction {
        let lines = source_lines(file);
        let cleaned = LineCleaner::clean_all(Language::Ruby, &lines);
        let scan = scan_definitions(&file.path, &lines, &cleaned, self.limits);
        Extraction {
            methods: scan.methods,
            template_calls: Vec::new(),
            diagnostics: scan.diagnostics,
        }
    }

    fn analyze(&self, file: &SourceFile, registry: &DefinedMethodRegistry) -> Extraction {
        let lines = source_lines(file);
        let cleaned = LineCleaner::clean_all(Language::Ruby, &lines);
        let mut scan = scan_definitions(&file.path, &lines, &cleaned, self.limits);

        let local = DefinedMethodRegistry::from_methods(&scan.methods);
        let gate = CallGate::new(&self.vocabulary, registry, &local);

        for idx in 0..scan.methods.len() {
            let method = &scan.methods[idx];
            let mut locals: HashSet<String> =
                method.parameters.iter().map(|p| p.name.clone()).collect();
            let mut calls = Vec::new();

            for line_no in method.start_line..=method.end_line {
                // Lines of a nested definition belong to that definition.
                if innermost_callable(&scan.methods, line_no) != Some(idx) {
                    continue;
                }
                let line = &cleaned[line_no - 1];
                let segment = if line_no == method.start_line {
                    line.get(scan.body_offsets[idx]..).unwrap_or("")
                } else {
                    line.as_str()
                };
                for name in ruby_call_names(segment, &gate, &mut locals) {
                    calls.push(CallSite {
                        method_name: name,
                        line: line_no,
                        snippet: truncate_snippet(lines[line_no - 1], self.limits.max_snippet_len),
                        import_line: None,
                    });
                }
            }

            let method = &mut scan.methods[idx];
            for call in calls {
                method.push_call(call);
            }
        }

        Extraction {
            methods: scan.methods,
            template_calls: Vec::new(),
            diagnostics: scan.diagnostics,
        }
    }
}

struct DefinitionScan {
    methods: Vec<Method>,
    /// Byte offset in the cleaned start line where each method's body begins.
    body_offsets: Vec<usize>,
    diagnostics: Vec<AnalysisError>,
}

/// A parsed `def` line.
#[derive(Debug)]
struct DefHeader {
    name: String,
    class_method: bool,
    inline_visibility: Option<Visibility>,
    params: Option<String>,
    /// Byte offset in the trimmed line where the body starts.
    body_start: usize,
}

fn def_re() -> &'static Regex {
    static DEF_RE: OnceLock<Regex> = OnceLock::new();
    DEF_RE.get_or_init(|| {
        Regex::new(r"^(?:(private|protected|public)\s+)?def\s+(self\.)?([A-Za-z_]\w*[?!=]?)")
            .unwrap()
    })
}

fn parse_def(trimmed: &str) -> Option<DefHeader> {
    let caps = def_re().captures(trimmed)?;
    let whole = caps.get(0)?;
    let mut name = caps[3].to_string();
    let mut name_end = whole.end();
    // `def a = b` is an endless method named `a`, not a setter.
    if name.ends_with('=') && !trimmed[name_end..].starts_with('(') {
        name.pop();
        name_end -= 1;
    }
    let inline_visibility = caps.get(1).map(|v| match v.as_str() {
        "private" => Visibility::Private,
        _ => Visibility::Public,
    });

    let rest = &trimmed[name_end..];
    let (params, body_start) = if rest.starts_with('(') {
        match find_matching_bracket(rest, 0) {
            Some(close) => (Some(rest[1..close].to_string()), name_end + close + 1),
            None => (Some(rest[1..].to_string()), trimmed.len()),
        }
    } else {
        let tail = rest.trim_start();
        if tail.is_empty() || tail.starts_with('=') || tail.starts_with(';') {
            (None, name_end)
        } else {
            let end = rest.find(';').unwrap_or(rest.len());
            (Some(rest[..end].to_string()), name_end + end)
        }
    };

    Some(DefHeader {
        name,
        class_method: caps.get(2).is_some(),
        inline_visibility,
        params,
        body_start,
    })
}

/// Whether a `def` line is an endless method (`def a = expr`).
fn is_endless_def(trimmed: &str) -> bool {
    let Some(header) = parse_def(trimmed) else {
        return false;
    };
    let tail = trimmed[header.body_start..].trim_start();
    tail.starts_with('=') && !tail.starts_with("==") && !tail.starts_with("=~")
}

/// Net block depth change of one cleaned, trimmed line.
fn block_delta(trimmed: &str) -> i64 {
    static OPENER_RE: OnceLock<Regex> = OnceLock::new();
    static INLINE_OPENER_RE: OnceLock<Regex> = OnceLock::new();
    static DO_RE: OnceLock<Regex> = OnceLock::new();
    static END_RE: OnceLock<Regex> = OnceLock::new();

    let opener_re = OPENER_RE.get_or_init(|| {
        Regex::new(
            r"^(?:(?:private|protected|public)\s+)?(?:class|module|if|unless|case|while|until|for|begin|def)\b",
        )
        .unwrap()
    });
    let inline_re = INLINE_OPENER_RE.get_or_init(|| {
        Regex::new(r"(?:[^=!<>]=|\(|\|\||&&)\s*(?:if|unless|case|begin|while|until)\b")
            .unwrap()
    });
    let do_re = DO_RE.get_or_init(|| Regex::new(r"\bdo\b").unwrap());
    let end_re = END_RE.get_or_init(|| Regex::new(r"\bend\b").unwrap());

    let mut delta: i64 = 0;
    if opener_re.is_match(trimmed) && !is_endless_def(trimmed) {
        delta += 1;
    }
    delta += inline_re.find_iter(trimmed).count() as i64;

    let loop_header = ["while", "until", "for"]
        .iter()
        .any(|kw| trimmed.starts_with(kw) && !starts_with_word_char(&trimmed[kw.len()..]));
    if !loop_header {
        delta += do_re
            .find_iter(trimmed)
            .filter(|m| is_keyword_occurrence(trimmed, m.start(), m.end()))
            .count() as i64;
    }

    delta -= end_re
        .find_iter(trimmed)
        .filter(|m| is_keyword_occurrence(trimmed, m.start(), m.end()))
        .count() as i64;
    delta
}

fn starts_with_word_char(s: &str) -> bool {
    s.chars()
        .next()
        .is_some_and(|c| c.is_alphanumeric() || c == '_')
}

/// A keyword match that is not a method call (`x.end`), a symbol (`:end`),
/// a hash label (`end:`) or a predicate (`end?`).
fn is_keyword_occurrence(line: &str, start: usize, end: usize) -> bool {
    let before = line[..start].chars().next_back();
    let after = line[end..].chars().next();
    !matches!(before, Some('.' | ':' | '@' | '$')) && !matches!(after, Some('?' | '!' | ':'))
}

#[derive(Debug, PartialEq, Eq)]
enum BlockEnd {
    Closed(usize),
    /// A new `def` began before the block closed.
    Interrupted(usize),
    /// No matching `end` within the scan bound.
    Capped(usize),
}

/// Find the line index that closes the block opened on `start`.
fn find_block_end(cleaned: &[String], start: usize, limits: ScanLimits) -> BlockEnd {
    let mut depth = block_delta(cleaned[start].trim());
    if depth <= 0 {
        return BlockEnd::Closed(start);
    }
    let cap = cleaned.len().min(start + limits.max_block_lines);
    let opened_by_def = parse_def(cleaned[start].trim()).is_some();

    for (j, line) in cleaned.iter().enumerate().take(cap).skip(start + 1) {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if opened_by_def && parse_def(trimmed).is_some() {
            return BlockEnd::Interrupted(j - 1);
        }
        depth += block_delta(trimmed);
        if depth <= 0 {
            return BlockEnd::Closed(j);
        }
    }
    BlockEnd::Capped(cap.max(start + 1) - 1)
}

fn singleton_block_re() -> &'static Regex {
    static SINGLETON_RE: OnceLock<Regex> = OnceLock::new();
    SINGLETON_RE.get_or_init(|| Regex::new(r"^class\s*<<\s*self\b").unwrap())
}

fn scan_definitions(
    path: &str,
    lines: &[&str],
    cleaned: &[String],
    limits: ScanLimits,
) -> DefinitionScan {
    static CLASS_RE: OnceLock<Regex> = OnceLock::new();
    static VISIBILITY_SYMBOLS_RE: OnceLock<Regex> = OnceLock::new();
    let class_re = CLASS_RE.get_or_init(|| Regex::new(r"^(?:class|module)\s+[A-Z]").unwrap());
    let symbols_re = VISIBILITY_SYMBOLS_RE.get_or_init(|| {
        Regex::new(r"^(private|public|protected)\s+(:\w+[?!=]?(?:\s*,\s*:\w+[?!=]?)*)\s*$").unwrap()
    });

    let mut out = DefinitionScan {
        methods: Vec::new(),
        body_offsets: Vec::new(),
        diagnostics: Vec::new(),
    };
    let mut visibility = Visibility::Public;
    let mut singleton_until: Option<usize> = None;
    let mut private_names: Vec<(String, Visibility)> = Vec::new();

    for (i, line) in cleaned.iter().enumerate() {
        let trimmed = line.trim();
        if singleton_until.is_some_and(|end| i > end) {
            singleton_until = None;
        }

        match trimmed {
            "private" => visibility = Visibility::Private,
            // protected is treated as public.
            "public" | "protected" => visibility = Visibility::Public,
            _ => {}
        }
        if class_re.is_match(trimmed) {
            visibility = Visibility::Public;
        }
        if let Some(caps) = symbols_re.captures(trimmed) {
            let vis = if &caps[1] == "private" {
                Visibility::Private
            } else {
                Visibility::Public
            };
            for symbol in caps[2].split(',') {
                private_names.push((symbol.trim().trim_start_matches(':').to_string(), vis));
            }
            continue;
        }
        if singleton_block_re().is_match(trimmed) {
            let end = match find_block_end(cleaned, i, limits) {
                BlockEnd::Closed(e) | BlockEnd::Interrupted(e) | BlockEnd::Capped(e) => e,
            };
            singleton_until = Some(end);
            continue;
        }

        let Some(header) = parse_def(trimmed) else {
            continue;
        };
        if is_keyword(Language::Ruby, &header.name) || is_builtin(Language::Ruby, &header.name) {
            debug!(path, line = i + 1, name = %header.name, "skipping builtin-named method");
            continue;
        }
        let end = match find_block_end(cleaned, i, limits) {
            BlockEnd::Closed(e) => e,
            BlockEnd::Interrupted(e) => {
                let diag = AnalysisError::malformed(
                    path,
                    i + 1,
                    format!("method '{}' has no end before the next def", header.name),
                );
                debug!(%diag, "closing method early");
                out.diagnostics.push(diag);
                e
            }
            BlockEnd::Capped(e) => {
                let diag = AnalysisError::malformed(
                    path,
                    i + 1,
                    format!("method '{}' has no matching end", header.name),
                );
                debug!(%diag, "capping method end");
                out.diagnostics.push(diag);
                e
            }
        };

        let kind = if header.class_method || singleton_until.is_some() {
            MethodKind::ClassMethod
        } else {
            MethodKind::Method
        };
        let mut method = Method::new(&header.name, kind, path, i + 1, end + 1);
        method.visibility = header.inline_visibility.unwrap_or(visibility);
        method.parameters = raw_parameters(lines[i], &header);
        method.code = code_slice(lines, i + 1, end + 1);

        let indent = line.len() - line.trim_start().len();
        out.body_offsets.push(indent + header.body_start);
        out.methods.push(method);
    }

    for (name, vis) in private_names {
        for method in out.methods.iter_mut().filter(|m| m.name == name) {
            method.visibility = vis;
        }
    }
    out
}

/// Parameters parsed from the raw line so string defaults survive.
fn raw_parameters(raw: &str, header: &DefHeader) -> Vec<Parameter> {
    let stripped = strip_comments(raw, Language::Ruby);
    let source = parse_def(stripped.trim())
        .filter(|raw_header| raw_header.name == header.name)
        .and_then(|raw_header| raw_header.params)
        .or_else(|| header.params.clone());
    source.map_or_else(Vec::new, |list| parse_parameters(&list, Language::Ruby))
}

#[derive(Debug)]
struct Token {
    name: String,
    dotted: bool,
    assignment: bool,
}

fn is_assignment(rest: &str) -> bool {
    let rest = rest.trim_start();
    if let Some(after) = rest.strip_prefix('=') {
        return !after.starts_with(['=', '~', '>']);
    }
    ["+=", "-=", "*=", "/=", "%=", "**=", "||=", "&&=", "<<="]
        .iter()
        .any(|op| rest.starts_with(op))
}

/// Identifier tokens of a cleaned Ruby line that could name a method.
fn tokenize(segment: &str) -> Vec<Token> {
    static IDENT_RE: OnceLock<Regex> = OnceLock::new();
    let ident_re = IDENT_RE.get_or_init(|| Regex::new(r"[A-Za-z_][A-Za-z0-9_]*").unwrap());
    let bytes = segment.as_bytes();
    let mut tokens = Vec::new();

    for m in ident_re.find_iter(segment) {
        let start = m.start();
        let prev = start.checked_sub(1).map(|p| bytes[p]);
        let prev2 = start.checked_sub(2).map(|p| bytes[p]);
        if prev.is_some_and(|b| b.is_ascii_alphanumeric() || b == b'_') {
            continue;
        }

        let mut name = m.as_str().to_string();
        let mut after = m.end();
        if let Some(&suffix) = bytes.get(after)
            && (suffix == b'?' || suffix == b'!')
            && bytes.get(after + 1) != Some(&b'=')
        {
            name.push(suffix as char);
            after += 1;
        }

        let dotted = prev == Some(b'.') && prev2 != Some(b'.');
        if !dotted && matches!(prev, Some(b'@' | b'$' | b':' | b'.')) && prev2 != Some(b'.') {
            continue;
        }
        let rest = &segment[after..];
        // Hash keys and keyword arguments.
        if rest.starts_with(':') && !rest.starts_with("::") {
            continue;
        }
        if !dotted && name.starts_with(|c: char| c.is_ascii_uppercase()) {
            continue;
        }

        tokens.push(Token {
            name,
            dotted,
            assignment: is_assignment(rest),
        });
    }
    tokens
}

/// Accepted call names on one cleaned Ruby line, in order of appearance.
///
/// Assignment targets and block parameters on the line are added to
/// `locals` first; bare identifiers found in `locals` are variable reads,
/// not calls.
pub(crate) fn ruby_call_names(
    segment: &str,
    gate: &CallGate<'_>,
    locals: &mut HashSet<String>,
) -> Vec<String> {
    static BLOCK_PARAMS_RE: OnceLock<Regex> = OnceLock::new();
    let block_params_re = BLOCK_PARAMS_RE
        .get_or_init(|| Regex::new(r"(?:\bdo|\{)\s*\|([^|]*)\|").unwrap());

    let tokens = tokenize(segment);
    for token in tokens.iter().filter(|t| !t.dotted && t.assignment) {
        locals.insert(token.name.clone());
    }
    for caps in block_params_re.captures_iter(segment) {
        for param in caps[1].split(',') {
            let name = param.trim().trim_start_matches(['*', '&', '(']).trim_end_matches(')');
            if !name.is_empty() {
                locals.insert(name.to_string());
            }
        }
    }

    let mut names = Vec::new();
    for token in tokens {
        if token.assignment {
            continue;
        }
        if !token.dotted && locals.contains(&token.name) {
            continue;
        }
        if gate.accepts(&token.name) && !names.contains(&token.name) {
            names.push(token.name);
        }
    }
    names
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_def_variants() {
        let h = parse_def("def self.build(attrs = {})").unwrap();
        assert_eq!(h.name, "build");
        assert!(h.class_method);
        assert_eq!(h.params.as_deref(), Some("attrs = {}"));

        let h = parse_def("def valid?").unwrap();
        assert_eq!(h.name, "valid?");
        assert!(h.params.is_none());

        let h = parse_def("def name=(value)").unwrap();
        assert_eq!(h.name, "name=");

        let h = parse_def("def total = price * qty").unwrap();
        assert_eq!(h.name, "total");
        assert!(is_endless_def("def total = price * qty"));

        let h = parse_def("private def secret(a, b)").unwrap();
        assert_eq!(h.inline_visibility, Some(Visibility::Private));

        let h = parse_def("def greet name, greeting").unwrap();
        assert_eq!(h.params.as_deref(), Some(" name, greeting"));

        assert!(parse_def("define_method :x").is_none());
    }

    #[test]
    fn test_block_delta() {
        assert_eq!(block_delta("def a"), 1);
        assert_eq!(block_delta("def a; b; end"), 0);
        assert_eq!(block_delta("def a = b"), 0);
        assert_eq!(block_delta("x = if y"), 1);
        assert_eq!(block_delta("items.each do |i|"), 1);
        assert_eq!(block_delta("while running do"), 1);
        assert_eq!(block_delta("return x if y"), 0);
        assert_eq!(block_delta("return if done?"), 0);
        assert_eq!(block_delta("return unless ready?"), 0);
        assert_eq!(block_delta("raise ArgumentError unless valid?"), 0);
        assert_eq!(block_delta("end"), -1);
        assert_eq!(block_delta("range.end"), 0);
        assert_eq!(block_delta("module_function"), 0);
        assert_eq!(block_delta("validates :name, if: :active?"), 0);
    }

    #[test]
    fn test_tokenize_skips_symbols_ivars_and_labels() {
        let names: Vec<String> = tokenize("foo(:bar, key: @baz, $g) + obj.qux!")
            .into_iter()
            .map(|t| t.name)
            .collect();
        assert_eq!(names, vec!["foo", "obj", "qux!"]);
    }

    #[test]
    fn test_call_names_suppress_locals() {
        let vocab = Vocabulary::new(Language::Ruby);
        let registry: DefinedMethodRegistry = ["total", "tax"].into_iter().collect();
        let local = DefinedMethodRegistry::new();
        let gate = CallGate::new(&vocab, &registry, &local);
        let mut locals = HashSet::new();

        let first = ruby_call_names("total = tax + 1", &gate, &mut locals);
        assert_eq!(first, vec!["tax"]);
        let second = ruby_call_names("total * 2", &gate, &mut locals);
        assert!(second.is_empty());
        let dotted = ruby_call_names("self.total", &gate, &mut locals);
        assert_eq!(dotted, vec!["total"]);
    }
}
