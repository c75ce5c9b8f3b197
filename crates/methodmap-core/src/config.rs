//! Configuration for scanning, graph building, and corpus analysis.
//!
//! Load order: `.methodmap/config.toml` → environment variables → defaults.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::source::Language;

/// Top-level analyzer configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    pub scan: ScanConfig,
    pub graph: GraphConfig,
    pub analysis: AnalysisConfig,
    /// Extra framework names per language tag, merged into the built-in
    /// allowlists.
    ///
    /// Example:
    /// [allowlist]
    /// ruby = ["authorize!", "current_tenant"]
    pub allowlist: BTreeMap<String, Vec<String>>,
}

/// Which JavaScript/TypeScript strategy to use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JsStrategyPreference {
    /// Syntax tree walk when a parser is compiled in, heuristics otherwise.
    #[default]
    Auto,
    /// Always use the line heuristics.
    Heuristic,
}

impl std::str::FromStr for JsStrategyPreference {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "auto" | "ast" => Ok(JsStrategyPreference::Auto),
            "heuristic" | "regex" => Ok(JsStrategyPreference::Heuristic),
            other => Err(format!("unknown js strategy '{}'", other)),
        }
    }
}

/// Line scanner limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Maximum lines a single block is followed before it is closed
    /// forcibly. Guarantees termination on malformed nesting.
    pub max_block_lines: usize,
    /// Maximum characters kept in a call-site snippet.
    pub max_snippet_len: usize,
    pub js_strategy: JsStrategyPreference,
}

/// Dependency graph settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    /// Maximum call lines recorded per edge.
    pub max_representative_lines: usize,
}

/// Corpus run settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Analyze files of a phase on the rayon pool.
    pub parallel: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            max_block_lines: 1000,
            max_snippet_len: 160,
            js_strategy: JsStrategyPreference::Auto,
        }
    }
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            max_representative_lines: crate::graph::DEFAULT_REPRESENTATIVE_LINES,
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self { parallel: true }
    }
}

/// Helper to parse an env var and apply it to a config field.
fn env_override<T: std::str::FromStr>(var: &str, target: &mut T) {
    if let Ok(v) = std::env::var(var)
        && let Ok(n) = v.parse()
    {
        *target = n;
    }
}

impl AnalyzerConfig {
    /// Load config from `.methodmap/config.toml` in the project root, with env
    /// var overrides. Falls back to defaults if no config file exists.
    pub fn load(project_root: &Path) -> Result<Self> {
        let config_path = project_root.join(".methodmap").join("config.toml");

        let mut config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str(&content)?
        } else {
            Self::default()
        };

        // Normalize allowlist keys to canonical language tags.
        let normalized = std::mem::take(&mut config.allowlist)
            .into_iter()
            .map(|(k, v)| (Language::from_tag(&k).name().to_string(), v))
            .collect();
        config.allowlist = normalized;

        env_override("METHODMAP_MAX_BLOCK_LINES", &mut config.scan.max_block_lines);
        env_override("METHODMAP_MAX_SNIPPET_LEN", &mut config.scan.max_snippet_len);
        env_override("METHODMAP_JS_STRATEGY", &mut config.scan.js_strategy);
        env_override(
            "METHODMAP_MAX_EDGE_LINES",
            &mut config.graph.max_representative_lines,
        );
        env_override("METHODMAP_PARALLEL", &mut config.analysis.parallel);

        config.validate()?;
        Ok(config)
    }

    /// Reject settings the scanners cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.scan.max_block_lines == 0 {
            anyhow::bail!("scan.max_block_lines must be greater than 0");
        }
        if self.scan.max_snippet_len == 0 {
            anyhow::bail!("scan.max_snippet_len must be greater than 0");
        }
        Ok(())
    }

    /// Extra allowlisted names configured for a language.
    pub fn extra_allowlist(&self, language: Language) -> &[String] {
        self.allowlist
            .get(language.name())
            .map_or(&[], Vec::as_slice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AnalyzerConfig::default();
        assert_eq!(config.scan.max_block_lines, 1000);
        assert_eq!(config.scan.max_snippet_len, 160);
        assert_eq!(config.scan.js_strategy, JsStrategyPreference::Auto);
        assert_eq!(config.graph.max_representative_lines, 5);
        assert!(config.analysis.parallel);
        assert!(config.allowlist.is_empty());
    }

    #[test]
    fn test_config_from_toml() {
        let toml_str = r#"
[scan]
max_block_lines = 200
js_strategy = "heuristic"

[allowlist]
ruby = ["authorize!"]
"#;
        let config: AnalyzerConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.scan.max_block_lines, 200);
        assert_eq!(config.scan.js_strategy, JsStrategyPreference::Heuristic);
        assert_eq!(config.extra_allowlist(Language::Ruby), ["authorize!".to_string()]);
        // Defaults for unspecified fields
        assert_eq!(config.scan.max_snippet_len, 160);
        assert!(config.analysis.parallel);
    }

    #[test]
    fn test_config_load_nonexistent() {
        let config = AnalyzerConfig::load(Path::new("/nonexistent/path")).unwrap();
        assert!(config.scan.max_block_lines > 0);
    }

    #[test]
    fn test_load_normalizes_allowlist_keys() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join(".methodmap");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join("config.toml"),
            r#"
[allowlist]
TS = ["track"]
"#,
        )
        .unwrap();

        let config = AnalyzerConfig::load(tmp.path()).unwrap();
        assert_eq!(config.extra_allowlist(Language::Typescript), ["track".to_string()]);
    }

    #[test]
    fn test_load_rejects_zero_block_lines() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join(".methodmap");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("config.toml"), "[scan]\nmax_block_lines = 0\n").unwrap();

        let err = AnalyzerConfig::load(tmp.path()).unwrap_err();
        assert!(err.to_string().contains("max_block_lines"));
    }
}
