//! Input corpus model: source files tagged with a language.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Language tag attached to every source file.
///
/// Only Ruby, ERB, JavaScript, TypeScript and TSX have extractors. The other
/// tags are accepted so a corpus can be passed through unfiltered; they
/// analyze to an empty result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Ruby,
    Javascript,
    Typescript,
    Tsx,
    Erb,
    Yaml,
    Markdown,
    #[serde(other)]
    Unknown,
}

impl Language {
    pub const ALL: [Language; 8] = [
        Language::Ruby,
        Language::Javascript,
        Language::Typescript,
        Language::Tsx,
        Language::Erb,
        Language::Yaml,
        Language::Markdown,
        Language::Unknown,
    ];

    /// Parse a language tag. Unrecognized tags map to [`Language::Unknown`].
    pub fn from_tag(tag: &str) -> Self {
        match tag.trim().to_ascii_lowercase().as_str() {
            "ruby" | "rb" => Language::Ruby,
            "javascript" | "js" | "jsx" => Language::Javascript,
            "typescript" | "ts" => Language::Typescript,
            "tsx" => Language::Tsx,
            "erb" => Language::Erb,
            "yaml" | "yml" => Language::Yaml,
            "markdown" | "md" => Language::Markdown,
            _ => Language::Unknown,
        }
    }

    /// Detect the language from a file path's extension.
    pub fn from_path(path: &Path) -> Self {
        let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
            return Language::Unknown;
        };
        if file_name.ends_with(".erb") {
            return Language::Erb;
        }
        if file_name == "Rakefile" || file_name == "Gemfile" {
            return Language::Ruby;
        }
        match path.extension().and_then(|e| e.to_str()) {
            Some("rb" | "rake" | "gemspec") => Language::Ruby,
            Some("js" | "mjs" | "cjs" | "jsx") => Language::Javascript,
            Some("ts" | "mts" | "cts") => Language::Typescript,
            Some("tsx") => Language::Tsx,
            Some("yml" | "yaml") => Language::Yaml,
            Some("md" | "markdown") => Language::Markdown,
            _ => Language::Unknown,
        }
    }

    /// Canonical lowercase tag.
    pub fn name(self) -> &'static str {
        match self {
            Language::Ruby => "ruby",
            Language::Javascript => "javascript",
            Language::Typescript => "typescript",
            Language::Tsx => "tsx",
            Language::Erb => "erb",
            Language::Yaml => "yaml",
            Language::Markdown => "markdown",
            Language::Unknown => "unknown",
        }
    }

    /// True for the JavaScript family (JS, TS, TSX).
    pub fn is_js_like(self) -> bool {
        matches!(
            self,
            Language::Javascript | Language::Typescript | Language::Tsx
        )
    }

    /// True for Ruby and ERB.
    pub fn is_ruby_like(self) -> bool {
        matches!(self, Language::Ruby | Language::Erb)
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One file of the corpus. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceFile {
    pub path: String,
    pub language: Language,
    #[serde(rename = "rawContent")]
    pub content: String,
    pub total_lines: usize,
}

impl SourceFile {
    /// Build a source file, deriving `total_lines` from the content.
    pub fn new(path: impl Into<String>, language: Language, content: impl Into<String>) -> Self {
        let content = content.into();
        let total_lines = content.lines().count();
        Self {
            path: path.into(),
            language,
            content,
            total_lines,
        }
    }

    /// Build a source file, detecting the language from the path.
    pub fn detect(path: impl Into<String>, content: impl Into<String>) -> Self {
        let path = path.into();
        let language = Language::from_path(Path::new(&path));
        Self::new(path, language, content)
    }

    /// Lines of the file (without terminators).
    pub fn lines(&self) -> Vec<&str> {
        self.content.lines().collect()
    }

    /// Upper bound for any line number produced from this file.
    ///
    /// Uses the smaller of the declared and actual counts so a stale
    /// `total_lines` can never push a method past the end of the text.
    pub fn line_limit(&self) -> usize {
        self.total_lines.min(self.content.lines().count())
    }

    /// File name component of the path.
    pub fn file_name(&self) -> &str {
        self.path
            .rsplit(['/', '\\'])
            .next()
            .filter(|s| !s.is_empty())
            .unwrap_or(&self.path)
    }
}
