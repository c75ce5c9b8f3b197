//! Export a dependency list as DOT (Graphviz) or Mermaid flowchart.

use crate::graph::{Dependency, MethodRef};
use std::collections::BTreeSet;
use std::fmt::Write;

/// Export format for graph visualization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Dot,
    Mermaid,
}

impl ExportFormat {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "dot" | "graphviz" => Some(ExportFormat::Dot),
            "mermaid" | "mmd" => Some(ExportFormat::Mermaid),
            _ => None,
        }
    }
}

fn node_id(node: &MethodRef) -> String {
    format!("{}:{}", node.file_path, node.name)
}

fn nodes(dependencies: &[Dependency]) -> BTreeSet<&MethodRef> {
    dependencies
        .iter()
        .flat_map(|d| [&d.from, &d.to])
        .collect()
}

/// Export the edges as a DOT (Graphviz) string.
pub fn export_dot(dependencies: &[Dependency]) -> String {
    let mut out = String::new();
    writeln!(out, "digraph methodmap {{").unwrap();
    writeln!(out, "  rankdir=LR;").unwrap();
    writeln!(out, "  node [shape=box, fontsize=10];").unwrap();
    writeln!(out).unwrap();

    for node in nodes(dependencies) {
        writeln!(
            out,
            "  \"{}\" [label=\"{}\\n{}\"];",
            node_id(node),
            node.name,
            node.file_path
        )
        .unwrap();
    }

    writeln!(out).unwrap();

    for dep in dependencies {
        let style = if dep.is_internal() { "solid" } else { "dashed" };
        writeln!(
            out,
            "  \"{}\" -> \"{}\" [style={}, label=\"{}\"];",
            node_id(&dep.from),
            node_id(&dep.to),
            style,
            dep.count
        )
        .unwrap();
    }

    writeln!(out, "}}").unwrap();
    out
}

/// Export the edges as a Mermaid flowchart string.
pub fn export_mermaid(dependencies: &[Dependency]) -> String {
    let mut out = String::new();
    writeln!(out, "flowchart LR").unwrap();

    for node in nodes(dependencies) {
        writeln!(
            out,
            "  {}[\"{}\\n({})\"]",
            mermaid_safe_id(&node_id(node)),
            node.name,
            node.file_path
        )
        .unwrap();
    }

    for dep in dependencies {
        let arrow = if dep.is_internal() { "-->" } else { "-.->" };
        writeln!(
            out,
            "  {} {}|{}| {}",
            mermaid_safe_id(&node_id(&dep.from)),
            arrow,
            dep.count,
            mermaid_safe_id(&node_id(&dep.to))
        )
        .unwrap();
    }

    out
}

/// Make an ID safe for Mermaid (replace special characters).
fn mermaid_safe_id(id: &str) -> String {
    id.replace([':', '/', '\\', '.', ' ', '-', '?', '!', '$'], "_")
}

/// Export the edges in the specified format.
pub fn export(dependencies: &[Dependency], format: ExportFormat) -> String {
    match format {
        ExportFormat::Dot => export_dot(dependencies),
        ExportFormat::Mermaid => export_mermaid(dependencies),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::DependencyKind;

    fn dep(from: &str, to: &str, to_file: &str) -> Dependency {
        let kind = if to_file == "a.rb" {
            DependencyKind::Internal
        } else {
            DependencyKind::External
        };
        Dependency {
            from: MethodRef {
                name: from.into(),
                file_path: "a.rb".into(),
            },
            to: MethodRef {
                name: to.into(),
                file_path: to_file.into(),
            },
            count: 2,
            kind,
            lines: vec![3],
        }
    }

    #[test]
    fn test_dot_styles_edges_by_kind() {
        let out = export_dot(&[dep("a", "b", "a.rb"), dep("a", "c", "b.rb")]);
        assert!(out.starts_with("digraph methodmap {"));
        assert!(out.contains("\"a.rb:a\" -> \"a.rb:b\" [style=solid, label=\"2\"];"));
        assert!(out.contains("\"a.rb:a\" -> \"b.rb:c\" [style=dashed, label=\"2\"];"));
    }

    #[test]
    fn test_mermaid_ids_are_sanitized() {
        let out = export_mermaid(&[dep("valid?", "save!", "b.rb")]);
        assert!(out.contains("a_rb_valid_ -.->|2| b_rb_save_"));
    }

    #[test]
    fn test_format_from_name() {
        assert_eq!(ExportFormat::from_name("DOT"), Some(ExportFormat::Dot));
        assert_eq!(ExportFormat::from_name("mermaid"), Some(ExportFormat::Mermaid));
        assert_eq!(ExportFormat::from_name("svg"), None);
    }
}
