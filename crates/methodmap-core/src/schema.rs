//! Versioned JSON report and version handling.

use crate::analysis::{CorpusAnalysis, FileAnalysis};
use crate::graph::Dependency;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const CURRENT_VERSION: &str = "1.0.0";

/// Serialized form of a corpus analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    pub version: String,
    pub generated_at: DateTime<Utc>,
    pub files: Vec<FileAnalysis>,
    pub dependencies: Vec<Dependency>,
}

impl AnalysisReport {
    pub fn from_analysis(analysis: &CorpusAnalysis) -> Self {
        Self {
            version: CURRENT_VERSION.to_string(),
            generated_at: Utc::now(),
            files: analysis.files.clone(),
            dependencies: analysis.dependencies.clone(),
        }
    }

    /// Rebuild a corpus analysis. The registry is recomputed from the
    /// stored methods.
    pub fn into_analysis(self) -> CorpusAnalysis {
        let registry = crate::registry::DefinedMethodRegistry::from_methods(
            self.files.iter().flat_map(|f| f.methods.iter()),
        );
        CorpusAnalysis {
            files: self.files,
            registry,
            dependencies: self.dependencies,
        }
    }
}

/// Validate a report's schema version.
pub fn validate_version(report: &AnalysisReport) -> Result<()> {
    if report.version != CURRENT_VERSION {
        anyhow::bail!(
            "report version mismatch: expected {}, found {}",
            CURRENT_VERSION,
            report.version
        );
    }
    Ok(())
}

/// Serialize a report to a pretty-printed JSON string.
pub fn to_json(report: &AnalysisReport) -> Result<String> {
    serde_json::to_string_pretty(report).context("failed to serialize report to JSON")
}

/// Deserialize a report from a JSON string.
pub fn from_json(json: &str) -> Result<AnalysisReport> {
    let report: AnalysisReport =
        serde_json::from_str(json).context("failed to deserialize report from JSON")?;
    validate_version(&report)?;
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::method::{Method, MethodKind};
    use crate::source::Language;

    fn report() -> AnalysisReport {
        let mut file = FileAnalysis::empty("a.rb", Language::Ruby);
        file.methods
            .push(Method::new("a", MethodKind::Method, "a.rb", 1, 3));
        AnalysisReport::from_analysis(&CorpusAnalysis {
            files: vec![file],
            ..Default::default()
        })
    }

    #[test]
    fn test_json_field_names() {
        let json = to_json(&report()).unwrap();
        assert!(json.contains("\"generatedAt\""));
        assert!(json.contains("\"startLine\": 1"));
        assert!(json.contains("\"filePath\": \"a.rb\""));
    }

    #[test]
    fn test_version_mismatch_rejected() {
        let mut r = report();
        r.version = "0.1.0".into();
        let json = to_json(&r).unwrap();
        let err = from_json(&json).unwrap_err();
        assert!(err.to_string().contains("version mismatch"));
    }

    #[test]
    fn test_into_analysis_rebuilds_registry() {
        let json = to_json(&report()).unwrap();
        let analysis = from_json(&json).unwrap().into_analysis();
        assert!(analysis.registry.contains("a"));
    }
}
