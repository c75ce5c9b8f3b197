//! Line-pattern scanning for JavaScript and TypeScript.
//!
//! Declarations are matched with anchored patterns on string- and
//! comment-blanked lines, and a definition's extent is found by bracket
//! counting with a few continuation rules.

use super::{Candidate, JsScan, classify_function, export_specifier, import_clause_bindings};
use crate::extractor::{ScanLimits, code_slice};
use crate::scanning::{
    LineCleaner, bracket_delta, find_matching_bracket, parse_parameters, strip_comments,
};
use methodmap_core::error::AnalysisError;
use methodmap_core::method::{Method, MethodKind, Parameter, Visibility};
use methodmap_core::source::SourceFile;
use regex::Regex;
use std::sync::OnceLock;
use tracing::debug;

/// A statement ending with one of these continues on the next line.
const CONTINUATION_ENDERS: &[&str] = &[
    "=>", "=", "(", "?", ":", "||", "&&", "+", "|", "&", ".", "??",
];
/// A next line starting with one of these continues the statement.
const CONTINUATION_STARTERS: &[&str] = &[
    ".", "?.", "?", ":", "||", "&&", "|", "&", "{", "=>", "+", "??",
];

struct Patterns {
    function: Regex,
    class: Regex,
    interface: Regex,
    type_alias: Regex,
    enumeration: Regex,
    variable: Regex,
    class_method: Regex,
    class_property: Regex,
    interface_method: Regex,
    interface_property: Regex,
    import_start: Regex,
    import_from: Regex,
    import_bare: Regex,
    require: Regex,
    export_default: Regex,
    export_list: Regex,
    export_star: Regex,
    call: Regex,
    jsx: Regex,
}

fn patterns() -> &'static Patterns {
    static PATTERNS: OnceLock<Patterns> = OnceLock::new();
    PATTERNS.get_or_init(|| Patterns {
        function: Regex::new(
            r"^(?:export\s+(?:default\s+)?)?(?:declare\s+)?(?:async\s+)?function\s*\*?\s*([A-Za-z_$][\w$]*)",
        )
        .unwrap(),
        class: Regex::new(
            r"^(?:export\s+(?:default\s+)?)?(?:declare\s+)?(?:abstract\s+)?class\s+([A-Za-z_$][\w$]*)",
        )
        .unwrap(),
        interface: Regex::new(
            r"^(?:export\s+(?:default\s+)?)?(?:declare\s+)?interface\s+([A-Za-z_$][\w$]*)",
        )
        .unwrap(),
        type_alias: Regex::new(r"^(?:export\s+)?(?:declare\s+)?type\s+([A-Za-z_$][\w$]*)\s*[<=]")
            .unwrap(),
        enumeration: Regex::new(
            r"^(?:export\s+)?(?:declare\s+)?(?:const\s+)?enum\s+([A-Za-z_$][\w$]*)",
        )
        .unwrap(),
        variable: Regex::new(
            r"^(?:export\s+)?(?:declare\s+)?(?:const|let|var)\s+([A-Za-z_$][\w$]*)\s*(?::[^=]+)?=\s*",
        )
        .unwrap(),
        class_method: Regex::new(
            r"^((?:(?:public|private|protected|static|readonly|override|abstract|async|get|set|declare)\s+)*)\*?\s*(#?[A-Za-z_$][\w$]*)\s*\??\s*(?:<[^(]*>)?\s*\(",
        )
        .unwrap(),
        class_property: Regex::new(
            r"^((?:(?:public|private|protected|static|readonly|override|declare)\s+)*)(#?[A-Za-z_$][\w$]*)\s*\??\s*(?::[^=]+)?=\s*",
        )
        .unwrap(),
        interface_method: Regex::new(
            r"^(?:readonly\s+)?([A-Za-z_$][\w$]*)\s*\??\s*(?:<[^(]*>)?\s*\(",
        )
        .unwrap(),
        interface_property: Regex::new(
            r"^(?:readonly\s+)?([A-Za-z_$][\w$]*)\s*\??\s*:\s*(?:<[^(]*>)?\s*\([^)]*\)\s*=>",
        )
        .unwrap(),
        import_start: Regex::new(r#"^import(?:\s|\{|\*|'|")"#).unwrap(),
        import_from: Regex::new(r#"^import\s+(?:type\s+)?([\s\S]*?)\s*from\s*['"]([^'"]+)['"]"#)
            .unwrap(),
        import_bare: Regex::new(r#"^import\s*['"]([^'"]+)['"]"#).unwrap(),
        require: Regex::new(
            r#"^(?:export\s+)?(?:const|let|var)\s+(\{[^}]*\}|[A-Za-z_$][\w$]*)\s*=\s*require\s*\(\s*['"]([^'"]+)['"]"#,
        )
        .unwrap(),
        export_default: Regex::new(r"^export\s+default\s+([A-Za-z_$][\w$]*)\s*;?\s*$").unwrap(),
        export_list: Regex::new(
            r#"^export\s+(?:type\s+)?\{([^}]*)\}(?:\s*from\s*['"]([^'"]+)['"])?"#,
        )
        .unwrap(),
        export_star: Regex::new(
            r#"^export\s*\*\s*(?:as\s+([A-Za-z_$][\w$]*)\s+)?from\s*['"]([^'"]+)['"]"#,
        )
        .unwrap(),
        call: Regex::new(r"([A-Za-z_$][\w$]*)\s*(?:<[^<>()]*>\s*)?\(").unwrap(),
        jsx: Regex::new(r"<([A-Z][\w$]*)").unwrap(),
    })
}

/// Parameter list text when `rhs` starts a function expression or an arrow
/// function.
fn function_expression(rhs: &str) -> Option<String> {
    static SINGLE_PARAM_RE: OnceLock<Regex> = OnceLock::new();
    let mut s = rhs.trim_start();
    if let Some(rest) = s.strip_prefix("async")
        && rest.starts_with(|c: char| c.is_whitespace() || c == '(')
    {
        s = rest.trim_start();
    }
    if let Some(rest) = s.strip_prefix("function") {
        let open = rest.find('(')?;
        let close = find_matching_bracket(rest, open)?;
        return Some(rest[open + 1..close].to_string());
    }
    if s.starts_with('<') {
        let close = find_matching_bracket(s, 0)?;
        s = s[close + 1..].trim_start();
    }
    if s.starts_with('(') {
        let close = find_matching_bracket(s, 0)?;
        let after = s[close + 1..].trim_start();
        let arrow = after.starts_with("=>") || (after.starts_with(':') && after.contains("=>"));
        return arrow.then(|| s[1..close].to_string());
    }
    SINGLE_PARAM_RE
        .get_or_init(|| Regex::new(r"^([A-Za-z_$][\w$]*)\s*=>").unwrap())
        .captures(s)
        .map(|c| c[1].to_string())
}

/// Text after the opening paren of a `memo(`, `forwardRef(` or hook call
/// wrapping a function.
fn unwrap_function_wrapper(rhs: &str) -> Option<&str> {
    static WRAPPER_RE: OnceLock<Regex> = OnceLock::new();
    let rhs = rhs.trim_start();
    let m = WRAPPER_RE
        .get_or_init(|| {
            Regex::new(
                r"^(?:React\.)?(?:memo|forwardRef|useCallback|useMemo|useEffect|useLayoutEffect)\s*(?:<[^(]*>)?\s*\(",
            )
            .unwrap()
        })
        .find(rhs)?;
    Some(&rhs[m.end()..])
}

/// Parameter list of a function bound on the right-hand side of `=`.
fn bound_function(rhs: &str) -> Option<String> {
    function_expression(rhs).or_else(|| unwrap_function_wrapper(rhs).and_then(function_expression))
}

fn paren_contents(text: &str, from: usize) -> Option<String> {
    let open = from + text.get(from..)?.find('(')?;
    let close = find_matching_bracket(text, open)?;
    Some(text[open + 1..close].to_string())
}

/// Line index of the last line of the statement starting at `start`, or
/// `None` when it is still open after `limit` lines.
fn find_statement_end(cleaned: &[String], start: usize, limit: usize) -> Option<usize> {
    let cap = cleaned.len().min(start + limit);
    let mut depth: i64 = 0;
    for j in start..cap {
        depth += bracket_delta(&cleaned[j]);
        if depth > 0 {
            continue;
        }
        if depth < 0 {
            return Some(j);
        }
        let line = cleaned[j].trim_end();
        if line.trim().is_empty() && j > start {
            continue;
        }
        if CONTINUATION_ENDERS.iter().any(|e| line.ends_with(e)) {
            continue;
        }
        let next = cleaned[j + 1..cap]
            .iter()
            .map(|l| l.trim())
            .find(|l| !l.is_empty());
        if let Some(next) = next
            && CONTINUATION_STARTERS.iter().any(|s| next.starts_with(s))
        {
            continue;
        }
        return Some(j);
    }
    None
}

/// Brace depth at the start of each line.
fn brace_depths(cleaned: &[String]) -> Vec<i64> {
    let mut depth = 0i64;
    cleaned
        .iter()
        .map(|line| {
            let at_start = depth;
            for c in line.chars() {
                match c {
                    '{' => depth += 1,
                    '}' => depth -= 1,
                    _ => {}
                }
            }
            at_start
        })
        .collect()
}

/// A class, interface, enum, or type body whose lines are not scanned as
/// top-level statements.
struct Container {
    kind: MethodKind,
    start: usize,
    end: usize,
    body_depth: i64,
}

struct Scanner<'a> {
    file: &'a SourceFile,
    lines: &'a [&'a str],
    cleaned: Vec<String>,
    limits: ScanLimits,
    containers: Vec<Container>,
    /// (line index, name) of each definition header, skipped as a call.
    headers: Vec<(usize, String)>,
    scan: JsScan,
}

pub(crate) fn scan(file: &SourceFile, lines: &[&str], limits: ScanLimits) -> JsScan {
    let cleaned = LineCleaner::clean_all(file.language, lines);
    let depths = brace_depths(&cleaned);
    let mut scanner = Scanner {
        file,
        lines,
        cleaned,
        limits,
        containers: Vec::new(),
        headers: Vec::new(),
        scan: JsScan::default(),
    };
    for (idx, depth) in depths.into_iter().enumerate() {
        scanner.line(idx, depth);
    }
    scanner.collect_candidates();
    scanner.scan
}

impl Scanner<'_> {
    fn line(&mut self, idx: usize, depth: i64) {
        if self.cleaned[idx].trim().is_empty() {
            return;
        }
        let container = self
            .containers
            .iter()
            .rev()
            .find(|c| idx > c.start && idx <= c.end)
            .map(|c| (c.kind, c.body_depth));
        match container {
            Some((MethodKind::Class, body)) if depth == body => {
                self.class_member(idx);
                return;
            }
            Some((MethodKind::Class, _)) | None => {}
            Some((MethodKind::Interface, body)) if depth == body => {
                self.interface_member(idx);
                return;
            }
            Some(_) => return,
        }

        if !(self.import(idx) || self.require(idx) || self.export(idx)) {
            self.declaration(idx, depth);
        }
    }

    fn text(&self, idx: usize) -> &str {
        self.cleaned[idx].trim()
    }

    fn raw_line(&self, idx: usize) -> String {
        strip_comments(self.lines[idx], self.file.language)
            .trim_start()
            .to_string()
    }

    /// Comment-stripped raw text of lines `start..=end`.
    fn raw_statement(&self, start: usize, end: usize) -> String {
        self.lines[start..=end]
            .iter()
            .map(|l| strip_comments(l, self.file.language))
            .collect::<Vec<_>>()
            .join("\n")
            .trim_start()
            .to_string()
    }

    fn cleaned_statement(&self, start: usize, end: usize) -> String {
        self.cleaned[start..=end].join("\n").trim_start().to_string()
    }

    /// Last line of the statement at `idx` and whether it closed in bounds.
    fn extent(&self, idx: usize) -> (usize, bool) {
        match find_statement_end(&self.cleaned, idx, self.limits.max_block_lines) {
            Some(end) => (end, true),
            None => {
                let cap = self.cleaned.len().min(idx + self.limits.max_block_lines);
                (cap.saturating_sub(1).max(idx), false)
            }
        }
    }

    fn note_unclosed(&mut self, idx: usize, name: &str) {
        let diag = AnalysisError::malformed(
            &self.file.path,
            idx + 1,
            format!(
                "`{name}` not closed within {} lines",
                self.limits.max_block_lines
            ),
        );
        debug!(%diag, "capping definition end");
        self.scan.diagnostics.push(diag);
    }

    fn definition(&self, name: &str, kind: MethodKind, start: usize, end: usize) -> Method {
        let mut method = Method::new(name, kind, &self.file.path, start + 1, end + 1);
        method.code = code_slice(self.lines, start + 1, end + 1);
        method
    }

    /// Parameters after the `group` capture of `re`, read from the raw
    /// statement first and the cleaned one second.
    fn parameters_after(&self, re: &Regex, group: usize, start: usize, end: usize) -> Vec<Parameter> {
        [
            self.raw_statement(start, end),
            self.cleaned_statement(start, end),
        ]
        .iter()
        .find_map(|text| {
            let from = re.captures(text)?.get(group)?.end();
            paren_contents(text, from)
        })
        .map(|list| parse_parameters(&list, self.file.language))
        .unwrap_or_default()
    }

    /// Parameters of a function bound by `re` (which must end at the `=`).
    fn bound_parameters(&self, re: &Regex, start: usize, end: usize) -> Option<Vec<Parameter>> {
        let cleaned = self.cleaned_statement(start, end);
        let cleaned_rhs = &cleaned[re.find(&cleaned)?.end()..];
        let cleaned_list = bound_function(cleaned_rhs)?;

        let raw = self.raw_statement(start, end);
        let list = re
            .find(&raw)
            .and_then(|m| bound_function(&raw[m.end()..]))
            .unwrap_or(cleaned_list);
        Some(parse_parameters(&list, self.file.language))
    }

    fn import(&mut self, idx: usize) -> bool {
        let p = patterns();
        if !self.text(idx).starts_with("import") || !p.import_start.is_match(&self.raw_line(idx)) {
            return false;
        }
        let (end, _) = self.extent(idx);
        let raw = self.raw_statement(idx, end);
        let (module, bindings) = if let Some(c) = p.import_from.captures(&raw) {
            (c[2].to_string(), import_clause_bindings(&c[1]))
        } else if let Some(c) = p.import_bare.captures(&raw) {
            (c[1].to_string(), Vec::new())
        } else {
            return false;
        };
        let mut method = self.definition(&module, MethodKind::Import, idx, end);
        method.module = Some(module);
        method.bindings = bindings;
        self.scan.methods.push(method);
        true
    }

    fn require(&mut self, idx: usize) -> bool {
        let raw = self.raw_line(idx);
        let Some(r) = patterns().require.captures(&raw) else {
            return false;
        };
        let bindings = if r[1].starts_with('{') {
            import_clause_bindings(&r[1])
        } else {
            vec![r[1].to_string()]
        };
        let module = r[2].to_string();
        let (end, _) = self.extent(idx);
        let mut method = self.definition(&module, MethodKind::Import, idx, end);
        method.module = Some(module);
        method.bindings = bindings;
        self.scan.methods.push(method);
        true
    }

    fn export(&mut self, idx: usize) -> bool {
        let p = patterns();
        if !self.text(idx).starts_with("export") {
            return false;
        }
        let raw_line = self.raw_line(idx);
        if let Some(c) = p.export_default.captures(&raw_line) {
            let name = c[1].to_string();
            if matches!(name.as_str(), "function" | "class" | "async") {
                return false;
            }
            let mut method = self.definition(&name, MethodKind::Export, idx, idx);
            method.bindings = vec![name];
            self.scan.methods.push(method);
            return true;
        }
        if !(raw_line.starts_with("export *")
            || raw_line.starts_with("export{")
            || raw_line.starts_with("export {")
            || raw_line.starts_with("export type {"))
        {
            return false;
        }

        let (end, _) = self.extent(idx);
        let raw = self.raw_statement(idx, end);
        if let Some(c) = p.export_star.captures(&raw) {
            let name = c.get(1).map_or("*", |m| m.as_str()).to_string();
            let mut method = self.definition(&name, MethodKind::Export, idx, end);
            method.module = Some(c[2].to_string());
            self.scan.methods.push(method);
            return true;
        }
        let Some(c) = p.export_list.captures(&raw) else {
            return false;
        };
        let module = c.get(2).map(|m| m.as_str().to_string());
        for (local, exported) in c[1].split(',').filter_map(export_specifier) {
            let mut method = self.definition(&exported, MethodKind::Export, idx, end);
            method.module.clone_from(&module);
            method.bindings = vec![local];
            self.scan.methods.push(method);
        }
        true
    }

    fn declaration(&mut self, idx: usize, depth: i64) {
        let p = patterns();
        let text = self.text(idx).to_string();

        if let Some(c) = p.function.captures(&text) {
            let name = c[1].to_string();
            let (end, closed) = self.extent(idx);
            if !closed {
                self.note_unclosed(idx, &name);
            }
            let kind = classify_function(&name, &self.cleaned_statement(idx, end));
            let mut method = self.definition(&name, kind, idx, end);
            method.parameters = self.parameters_after(&p.function, 1, idx, end);
            self.headers.push((idx, name));
            self.scan.methods.push(method);
            return;
        }

        let container = [
            (&p.class, MethodKind::Class),
            (&p.interface, MethodKind::Interface),
            (&p.enumeration, MethodKind::Enum),
            (&p.type_alias, MethodKind::TypeAlias),
        ]
        .into_iter()
        .find_map(|(re, kind)| re.captures(&text).map(|c| (c[1].to_string(), kind)));
        if let Some((name, kind)) = container {
            let (end, closed) = self.extent(idx);
            if !closed {
                self.note_unclosed(idx, &name);
            }
            let method = self.definition(&name, kind, idx, end);
            self.scan.methods.push(method);
            self.containers.push(Container {
                kind,
                start: idx,
                end,
                body_depth: depth + 1,
            });
            return;
        }

        if let Some(c) = p.variable.captures(&text) {
            let name = c[1].to_string();
            let (end, closed) = self.extent(idx);
            let Some(parameters) = self.bound_parameters(&p.variable, idx, end) else {
                return;
            };
            if !closed {
                self.note_unclosed(idx, &name);
            }
            let kind = classify_function(&name, &self.cleaned_statement(idx, end));
            let mut method = self.definition(&name, kind, idx, end);
            method.parameters = parameters;
            self.scan.methods.push(method);
        }
    }

    fn class_member(&mut self, idx: usize) {
        let p = patterns();
        let text = self.text(idx).to_string();

        let (re, modifiers, raw_name, is_method) = if let Some(c) = p.class_method.captures(&text) {
            (&p.class_method, c[1].to_string(), c[2].to_string(), true)
        } else if let Some(c) = p.class_property.captures(&text) {
            (&p.class_property, c[1].to_string(), c[2].to_string(), false)
        } else {
            return;
        };

        let (end, closed) = self.extent(idx);
        let parameters = if is_method {
            self.parameters_after(re, 2, idx, end)
        } else {
            match self.bound_parameters(re, idx, end) {
                Some(parameters) => parameters,
                None => return,
            }
        };

        let name = raw_name.trim_start_matches('#').to_string();
        if !closed {
            self.note_unclosed(idx, &name);
        }
        let has_modifier = |word: &str| modifiers.split_whitespace().any(|m| m == word);
        let kind = if has_modifier("static") {
            MethodKind::ClassMethod
        } else {
            MethodKind::Method
        };
        let mut method = self.definition(&name, kind, idx, end);
        method.parameters = parameters;
        if has_modifier("private") || raw_name.starts_with('#') {
            method.visibility = Visibility::Private;
        }
        if is_method {
            self.headers.push((idx, name));
        }
        self.scan.methods.push(method);
    }

    fn interface_member(&mut self, idx: usize) {
        let p = patterns();
        let text = self.text(idx).to_string();
        let Some((re, name)) = [&p.interface_method, &p.interface_property]
            .into_iter()
            .find_map(|re| re.captures(&text).map(|c| (re, c[1].to_string())))
        else {
            return;
        };
        let (end, _) = self.extent(idx);
        let mut method = self.definition(&name, MethodKind::InterfaceMethod, idx, end);
        method.parameters = self.parameters_after(re, 1, idx, end);
        self.headers.push((idx, name));
        self.scan.methods.push(method);
    }

    fn collect_candidates(&mut self) {
        let p = patterns();
        let is_word = |c: char| c.is_alphanumeric() || c == '_' || c == '$';

        for (idx, line) in self.cleaned.iter().enumerate() {
            let mut headers: Vec<&str> = self
                .headers
                .iter()
                .filter(|(h, _)| *h == idx)
                .map(|(_, name)| name.as_str())
                .collect();

            for c in p.call.captures_iter(line) {
                let Some(m) = c.get(1) else { continue };
                if line[..m.start()].chars().next_back().is_some_and(is_word) {
                    continue;
                }
                if let Some(pos) = headers.iter().position(|h| *h == m.as_str()) {
                    headers.remove(pos);
                    continue;
                }
                self.scan.candidates.push(Candidate {
                    name: m.as_str().to_string(),
                    line: idx + 1,
                });
            }
            for c in p.jsx.captures_iter(line) {
                let Some(m) = c.get(1) else { continue };
                let open = m.start() - 1;
                if line[..open].chars().next_back().is_some_and(is_word) {
                    continue;
                }
                self.scan.candidates.push(Candidate {
                    name: m.as_str().to_string(),
                    line: idx + 1,
                });
            }
        }
        self.scan.candidates.sort_by_key(|c| c.line);
    }
}
