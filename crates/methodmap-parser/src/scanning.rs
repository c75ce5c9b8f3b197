//! Line-level lexical helpers shared by the extractors.
//!
//! Nothing here parses. The goal is to make string and comment text invisible
//! to the identifier patterns while keeping every code character in place, so
//! a cleaned line can be matched with the same column positions as the raw one.

use methodmap_core::method::{Parameter, ParameterKind};
use methodmap_core::source::Language;
use regex::Regex;
use std::sync::OnceLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Code,
    Quoted(char),
    BlockComment,
}

/// An open `#{` / `${` inside a string, waiting for its closing brace.
#[derive(Debug, Clone, Copy)]
struct Frame {
    quote: char,
    depth: usize,
}

#[derive(Debug, Clone, Copy)]
struct Options {
    blank_strings: bool,
    drop_comments: bool,
}

#[derive(Debug, Clone)]
struct ScanState {
    mode: Mode,
    frames: Vec<Frame>,
}

impl Default for ScanState {
    fn default() -> Self {
        Self {
            mode: Mode::Code,
            frames: Vec::new(),
        }
    }
}

fn scan(line: &str, language: Language, state: &mut ScanState, opts: Options) -> String {
    let ruby = language.is_ruby_like();
    let chars: Vec<char> = line.chars().collect();
    let mut out = String::with_capacity(line.len());
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let next = chars.get(i + 1).copied();
        match state.mode {
            Mode::BlockComment => {
                if c == '*' && next == Some('/') {
                    state.mode = Mode::Code;
                    out.push_str(if opts.drop_comments { "  " } else { "*/" });
                    i += 2;
                    continue;
                }
                out.push(if opts.drop_comments { ' ' } else { c });
                i += 1;
            }
            Mode::Quoted(q) => {
                if c == '\\' {
                    if opts.blank_strings {
                        out.push(' ');
                        if next.is_some() {
                            out.push(' ');
                        }
                    } else {
                        out.push(c);
                        if let Some(n) = next {
                            out.push(n);
                        }
                    }
                    i += 2;
                    continue;
                }
                if c == q {
                    out.push(c);
                    state.mode = Mode::Code;
                    i += 1;
                    continue;
                }
                let interpolates = if ruby { q == '"' } else { q == '`' };
                let sigil = if ruby { '#' } else { '$' };
                if interpolates && c == sigil && next == Some('{') {
                    out.push(c);
                    out.push('{');
                    state.frames.push(Frame { quote: q, depth: 0 });
                    state.mode = Mode::Code;
                    i += 2;
                    continue;
                }
                out.push(if opts.blank_strings { ' ' } else { c });
                i += 1;
            }
            Mode::Code => {
                if let Some(frame) = state.frames.last_mut() {
                    if c == '{' {
                        frame.depth += 1;
                    } else if c == '}' {
                        if frame.depth == 0 {
                            let quote = frame.quote;
                            state.frames.pop();
                            out.push('}');
                            state.mode = Mode::Quoted(quote);
                            i += 1;
                            continue;
                        }
                        frame.depth -= 1;
                    }
                }
                let comment_start = if ruby {
                    c == '#' && next != Some('{')
                } else {
                    c == '/' && next == Some('/')
                };
                if comment_start {
                    if !opts.drop_comments {
                        out.extend(chars[i..].iter());
                    }
                    break;
                }
                if !ruby && c == '/' && next == Some('*') {
                    state.mode = Mode::BlockComment;
                    out.push_str(if opts.drop_comments { "  " } else { "/*" });
                    i += 2;
                    continue;
                }
                if matches!(c, '"' | '\'' | '`') {
                    state.mode = Mode::Quoted(c);
                }
                out.push(c);
                i += 1;
            }
        }
    }

    // Only JS template literals and block comments span lines.
    if ruby {
        state.mode = Mode::Code;
        state.frames.clear();
    } else if let Mode::Quoted(q) = state.mode
        && q != '`'
    {
        state.mode = Mode::Code;
    }
    out
}

/// Blank the contents of quoted spans, keeping the quotes.
///
/// Interpolated code (`#{...}` in Ruby double-quoted strings, `${...}` in JS
/// template literals) is kept so it can still be scanned for calls.
pub fn strip_string_literals(line: &str, language: Language) -> String {
    scan(
        line,
        language,
        &mut ScanState::default(),
        Options {
            blank_strings: true,
            drop_comments: false,
        },
    )
}

/// Remove trailing `#` / `//` comments and inline `/* */` comments.
///
/// Comment markers inside strings are ignored, and Ruby's `#{` never starts a
/// comment.
pub fn strip_comments(line: &str, language: Language) -> String {
    scan(
        line,
        language,
        &mut ScanState::default(),
        Options {
            blank_strings: false,
            drop_comments: true,
        },
    )
    .trim_end()
    .to_string()
}

/// Stateful cleaner for consecutive lines of one file.
///
/// Carries JS block comments and template literals across line breaks, and
/// blanks Ruby `=begin` / `=end` documentation blocks and heredoc bodies.
#[derive(Debug, Clone)]
pub struct LineCleaner {
    language: Language,
    state: ScanState,
    in_doc_block: bool,
    heredoc_terminator: Option<String>,
}

fn heredoc_re() -> &'static Regex {
    static HEREDOC_RE: OnceLock<Regex> = OnceLock::new();
    HEREDOC_RE.get_or_init(|| Regex::new(r#"<<[~-]?['"]?([A-Z_][A-Z0-9_]*)['"]?"#).unwrap())
}

impl LineCleaner {
    pub fn new(language: Language) -> Self {
        Self {
            language,
            state: ScanState::default(),
            in_doc_block: false,
            heredoc_terminator: None,
        }
    }

    /// Strip strings and comments from the next line of the file.
    pub fn clean(&mut self, line: &str) -> String {
        let ruby = self.language.is_ruby_like();
        if ruby {
            if let Some(terminator) = &self.heredoc_terminator {
                if line.trim() == terminator {
                    self.heredoc_terminator = None;
                }
                return String::new();
            }
            if self.in_doc_block {
                if line.starts_with("=end") {
                    self.in_doc_block = false;
                }
                return String::new();
            }
            if line.starts_with("=begin") {
                self.in_doc_block = true;
                return String::new();
            }
        }
        let out = scan(
            line,
            self.language,
            &mut self.state,
            Options {
                blank_strings: true,
                drop_comments: true,
            },
        );
        if ruby
            && let Some(caps) = heredoc_re().captures(line)
            && let Some(m) = caps.get(0)
            && out.get(m.start()..m.start() + 2) == Some("<<")
        {
            self.heredoc_terminator = Some(caps[1].to_string());
        }
        out
    }

    /// Clean every line of a file.
    pub fn clean_all(language: Language, lines: &[&str]) -> Vec<String> {
        let mut cleaner = Self::new(language);
        lines.iter().map(|line| cleaner.clean(line)).collect()
    }
}

/// Split a parameter list on commas that are not nested inside brackets,
/// generics, or quotes.
pub fn split_top_level_parameters(list: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut depth: i32 = 0;
    let mut quote: Option<char> = None;
    let mut prev = '\0';

    for c in list.chars() {
        if let Some(q) = quote {
            current.push(c);
            if c == q && prev != '\\' {
                quote = None;
            }
            prev = c;
            continue;
        }
        match c {
            '"' | '\'' | '`' => quote = Some(c),
            '(' | '{' | '[' | '<' => depth += 1,
            ')' | '}' | ']' => depth -= 1,
            '>' if prev != '=' => depth -= 1,
            ',' if depth <= 0 => {
                let part = current.trim();
                if !part.is_empty() {
                    parts.push(part.to_string());
                }
                current.clear();
                prev = c;
                continue;
            }
            _ => {}
        }
        current.push(c);
        prev = c;
    }

    let part = current.trim();
    if !part.is_empty() {
        parts.push(part.to_string());
    }
    parts
}

/// Byte index of the first top-level `target` in `s`.
///
/// For `=`, arrows and comparison operators are not matches.
fn find_top_level(s: &str, target: char) -> Option<usize> {
    let mut depth: i32 = 0;
    let mut quote: Option<char> = None;
    let chars: Vec<(usize, char)> = s.char_indices().collect();

    for (k, &(idx, c)) in chars.iter().enumerate() {
        if let Some(q) = quote {
            if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '"' | '\'' | '`' => quote = Some(c),
            '(' | '{' | '[' | '<' => depth += 1,
            ')' | '}' | ']' => depth -= 1,
            '>' if k > 0 && chars[k - 1].1 == '=' => {}
            '>' => depth -= 1,
            _ if c == target && depth <= 0 => {
                if target == '=' {
                    let next = chars.get(k + 1).map(|&(_, n)| n);
                    let prev = k.checked_sub(1).map(|p| chars[p].1);
                    if matches!(next, Some('>' | '='))
                        || matches!(prev, Some('=' | '!' | '<' | '>'))
                    {
                        continue;
                    }
                }
                return Some(idx);
            }
            _ => {}
        }
    }
    None
}

/// Classify one parameter of a definition's parameter list.
pub fn classify_parameter_fragment(fragment: &str, language: Language) -> Option<Parameter> {
    let fragment = fragment.trim();
    if fragment.is_empty() {
        return None;
    }
    if language.is_ruby_like() {
        Some(ruby_parameter(fragment))
    } else {
        Some(js_parameter(fragment))
    }
}

fn ruby_parameter(fragment: &str) -> Parameter {
    let prefixed = |prefix: &str, kind: ParameterKind| {
        let name = fragment[prefix.len()..].trim();
        Parameter {
            name: if name.is_empty() {
                prefix.to_string()
            } else {
                name.to_string()
            },
            kind: Some(kind),
            ..Parameter::positional("")
        }
    };

    if fragment.starts_with("**") {
        return prefixed("**", ParameterKind::DoubleSplat);
    }
    if fragment.starts_with('*') {
        return prefixed("*", ParameterKind::Splat);
    }
    if fragment.starts_with('&') {
        return prefixed("&", ParameterKind::Block);
    }
    if let Some((name, default)) = fragment.split_once(':')
        && !name.is_empty()
        && name.chars().all(|c| c.is_alphanumeric() || c == '_')
    {
        let default = default.trim();
        return Parameter {
            name: name.to_string(),
            default_value: (!default.is_empty()).then(|| default.to_string()),
            kind: Some(ParameterKind::Keyword),
            ..Parameter::positional("")
        };
    }
    if let Some(idx) = find_top_level(fragment, '=') {
        return Parameter {
            name: fragment[..idx].trim().to_string(),
            default_value: Some(fragment[idx + 1..].trim().to_string()),
            kind: Some(ParameterKind::Default),
            ..Parameter::positional("")
        };
    }
    Parameter::positional(fragment)
}

fn js_parameter(fragment: &str) -> Parameter {
    let mut rest = fragment;
    for modifier in ["public ", "private ", "protected ", "readonly ", "override "] {
        if let Some(stripped) = rest.strip_prefix(modifier) {
            rest = stripped.trim_start();
        }
    }

    let (head, default_value) = match find_top_level(rest, '=') {
        Some(idx) => (rest[..idx].trim(), Some(rest[idx + 1..].trim().to_string())),
        None => (rest, None),
    };

    let (mut head, rest_param) = match head.strip_prefix("...") {
        Some(stripped) => (stripped.trim(), true),
        None => (head, false),
    };

    let destructured = head.starts_with('{') || head.starts_with('[');
    let mut type_annotation = None;
    if let Some(idx) = find_top_level(head, ':') {
        let ty = head[idx + 1..].trim();
        if !ty.is_empty() {
            type_annotation = Some(ty.to_string());
        }
        head = head[..idx].trim();
    }
    let optional = head.ends_with('?');
    let name = head.trim_end_matches('?').trim().to_string();

    let kind = if rest_param {
        Some(ParameterKind::Rest)
    } else if destructured {
        Some(ParameterKind::Destructured)
    } else if default_value.is_some() {
        Some(ParameterKind::Default)
    } else if optional {
        Some(ParameterKind::Optional)
    } else {
        None
    };

    Parameter {
        name,
        type_annotation,
        default_value,
        kind,
    }
}

/// Parse a whole parameter list into parameters.
pub fn parse_parameters(list: &str, language: Language) -> Vec<Parameter> {
    split_top_level_parameters(list)
        .iter()
        .filter_map(|fragment| classify_parameter_fragment(fragment, language))
        .collect()
}

/// Net count of opening minus closing brackets on a cleaned line.
pub fn bracket_delta(cleaned: &str) -> i64 {
    cleaned.chars().fold(0, |acc, c| match c {
        '{' | '(' | '[' => acc + 1,
        '}' | ')' | ']' => acc - 1,
        _ => acc,
    })
}

/// Byte index of the bracket closing the one at `open_idx`, if any.
pub fn find_matching_bracket(s: &str, open_idx: usize) -> Option<usize> {
    let open = s[open_idx..].chars().next()?;
    let close = match open {
        '(' => ')',
        '{' => '}',
        '[' => ']',
        '<' => '>',
        _ => return None,
    };
    let mut depth = 0usize;
    for (idx, c) in s[open_idx..].char_indices() {
        if c == open {
            depth += 1;
        } else if c == close {
            depth -= 1;
            if depth == 0 {
                return Some(open_idx + idx);
            }
        }
    }
    None
}

/// Trim a source line into a call-site snippet of at most `max` characters.
pub fn truncate_snippet(line: &str, max: usize) -> String {
    let trimmed = line.trim();
    if trimmed.chars().count() <= max {
        return trimmed.to_string();
    }
    let mut out: String = trimmed.chars().take(max).collect();
    out.push_str("...");
    out
}
