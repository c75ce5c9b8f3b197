//! Analysis diagnostics.
//!
//! Nothing here is fatal to a corpus run: each variant describes how one
//! file's result was degraded.

use serde::{Deserialize, Serialize};

/// Severity used when logging or displaying a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Debug,
    Info,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AnalysisError {
    #[error("no extractor registered for language '{language}'")]
    UnsupportedLanguage { language: String },
    #[error("{path}:{line}: {reason}")]
    MalformedConstruct {
        path: String,
        line: usize,
        reason: String,
    },
    #[error("syntax parser unavailable: {reason}")]
    ParserUnavailable { reason: String },
    #[error("analysis of {path} failed: {message}")]
    Unexpected { path: String, message: String },
}

impl AnalysisError {
    pub fn malformed(path: &str, line: usize, reason: impl Into<String>) -> Self {
        AnalysisError::MalformedConstruct {
            path: path.to_string(),
            line,
            reason: reason.into(),
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            AnalysisError::MalformedConstruct { .. } | AnalysisError::ParserUnavailable { .. } => {
                Severity::Debug
            }
            AnalysisError::UnsupportedLanguage { .. } => Severity::Info,
            AnalysisError::Unexpected { .. } => Severity::Warning,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_and_severity() {
        let err = AnalysisError::malformed("a.rb", 3, "unterminated block");
        assert_eq!(err.to_string(), "a.rb:3: unterminated block");
        assert_eq!(err.severity(), Severity::Debug);

        let err = AnalysisError::Unexpected {
            path: "b.js".into(),
            message: "boom".into(),
        };
        assert_eq!(err.severity(), Severity::Warning);
        let json = serde_json::to_string(&err).unwrap();
        assert!(json.contains("\"kind\":\"unexpected\""));
    }
}
