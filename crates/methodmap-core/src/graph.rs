//! Caller → callee dependency graph built from resolved call sites.

use crate::method::Method;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Default cap on the line numbers kept per edge.
pub const DEFAULT_REPRESENTATIVE_LINES: usize = 5;

/// Endpoint of a dependency edge.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MethodRef {
    pub name: String,
    pub file_path: String,
}

impl MethodRef {
    pub fn of(method: &Method) -> Self {
        Self {
            name: method.name.clone(),
            file_path: method.file_path.clone(),
        }
    }
}

/// Whether caller and callee live in the same file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DependencyKind {
    Internal,
    External,
}

/// An aggregated caller → callee edge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dependency {
    pub from: MethodRef,
    pub to: MethodRef,
    /// Number of call sites aggregated into this edge. Always ≥ 1.
    pub count: usize,
    #[serde(rename = "type")]
    pub kind: DependencyKind,
    /// Representative call lines in the caller's file, ascending.
    pub lines: Vec<usize>,
}

impl Dependency {
    pub fn is_internal(&self) -> bool {
        self.kind == DependencyKind::Internal
    }
}

/// Resolve every call site in `methods` against the definitions in
/// `methods` and aggregate the matches into edges.
///
/// Resolution is by name only. A callee name shared by several
/// definitions produces one edge per defining file; a name with no
/// resolvable definition (typically an allowlisted framework call)
/// produces none. Edges are emitted in first-seen order.
pub fn build_dependencies(methods: &[Method], max_lines: usize) -> Vec<Dependency> {
    // Same-named definitions in one file share a single edge endpoint.
    let mut by_name: HashMap<&str, Vec<MethodRef>> = HashMap::new();
    for method in methods.iter().filter(|m| m.kind.is_resolvable()) {
        let targets = by_name.entry(method.name.as_str()).or_default();
        let target = MethodRef::of(method);
        if !targets.contains(&target) {
            targets.push(target);
        }
    }

    let mut edges: Vec<Dependency> = Vec::new();
    let mut index: HashMap<(MethodRef, MethodRef), usize> = HashMap::new();

    for caller in methods {
        if caller.calls.is_empty() {
            continue;
        }
        let from = MethodRef::of(caller);
        for call in &caller.calls {
            let Some(targets) = by_name.get(call.method_name.as_str()) else {
                continue;
            };
            for target in targets {
                let to = target.clone();
                let key = (from.clone(), to.clone());
                let slot = *index.entry(key).or_insert_with(|| {
                    let kind = if from.file_path == to.file_path {
                        DependencyKind::Internal
                    } else {
                        DependencyKind::External
                    };
                    edges.push(Dependency {
                        from: from.clone(),
                        to,
                        count: 0,
                        kind,
                        lines: Vec::new(),
                    });
                    edges.len() - 1
                });
                let edge = &mut edges[slot];
                edge.count += 1;
                if edge.lines.len() < max_lines && !edge.lines.contains(&call.line) {
                    edge.lines.push(call.line);
                }
            }
        }
    }

    for edge in &mut edges {
        edge.lines.sort_unstable();
    }
    edges
}

/// Aggregate counts over a dependency list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphSummary {
    pub edges: usize,
    pub internal: usize,
    pub external: usize,
    pub resolved_calls: usize,
}

impl GraphSummary {
    pub fn of(dependencies: &[Dependency]) -> Self {
        let internal = dependencies.iter().filter(|d| d.is_internal()).count();
        Self {
            edges: dependencies.len(),
            internal,
            external: dependencies.len() - internal,
            resolved_calls: dependencies.iter().map(|d| d.count).sum(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::method::{CallSite, MethodKind};

    fn method(name: &str, file: &str, start: usize, end: usize) -> Method {
        Method::new(name, MethodKind::Method, file, start, end)
    }

    fn with_call(mut m: Method, callee: &str, line: usize) -> Method {
        m.calls.push(CallSite {
            method_name: callee.to_string(),
            line,
            snippet: callee.to_string(),
            import_line: None,
        });
        m
    }

    #[test]
    fn test_internal_edge_counts_repeats() {
        let a = with_call(with_call(method("a", "x.rb", 1, 4), "b", 2), "b", 3);
        let b = method("b", "x.rb", 5, 7);
        let deps = build_dependencies(&[a, b], DEFAULT_REPRESENTATIVE_LINES);
        assert_eq!(deps.len(), 1);
        assert_eq!(deps[0].count, 2);
        assert_eq!(deps[0].kind, DependencyKind::Internal);
        assert_eq!(deps[0].lines, vec![2, 3]);
    }

    #[test]
    fn test_same_file_duplicates_count_once() {
        let show = with_call(method("show", "views.rb", 9, 11), "label", 10);
        let a_label = method("label", "views.rb", 2, 4);
        let b_label = method("label", "views.rb", 6, 8);
        let deps = build_dependencies(&[a_label, b_label, show], DEFAULT_REPRESENTATIVE_LINES);
        assert_eq!(deps.len(), 1);
        assert_eq!(deps[0].count, 1);
        assert_eq!(deps[0].lines, vec![10]);
    }

    #[test]
    fn test_unresolved_call_emits_nothing() {
        let a = with_call(method("a", "x.rb", 1, 3), "save", 2);
        let deps = build_dependencies(&[a], DEFAULT_REPRESENTATIVE_LINES);
        assert!(deps.is_empty());
    }

    #[test]
    fn test_fan_out_to_every_definition() {
        let a = with_call(method("a", "x.rb", 1, 3), "helper", 2);
        let h1 = method("helper", "x.rb", 4, 6);
        let h2 = method("helper", "y.rb", 1, 3);
        let deps = build_dependencies(&[a, h1, h2], DEFAULT_REPRESENTATIVE_LINES);
        assert_eq!(deps.len(), 2);
        assert!(deps.iter().any(|d| d.is_internal()));
        assert!(deps.iter().any(|d| !d.is_internal() && d.to.file_path == "y.rb"));
    }

    #[test]
    fn test_import_records_are_not_targets() {
        let a = with_call(method("a", "x.js", 1, 3), "react", 2);
        let import = Method::new("react", MethodKind::Import, "x.js", 1, 1);
        let deps = build_dependencies(&[a, import], DEFAULT_REPRESENTATIVE_LINES);
        assert!(deps.is_empty());
    }

    #[test]
    fn test_representative_lines_capped() {
        let mut a = method("a", "x.rb", 1, 20);
        for line in 2..12 {
            a = with_call(a, "b", line);
        }
        let b = method("b", "x.rb", 21, 22);
        let deps = build_dependencies(&[a, b], 3);
        assert_eq!(deps[0].count, 10);
        assert_eq!(deps[0].lines, vec![2, 3, 4]);
    }

    #[test]
    fn test_summary() {
        let a = with_call(method("a", "x.rb", 1, 3), "b", 2);
        let b = with_call(method("b", "y.rb", 1, 3), "a", 2);
        let deps = build_dependencies(&[a, b], DEFAULT_REPRESENTATIVE_LINES);
        let summary = GraphSummary::of(&deps);
        assert_eq!(summary.edges, 2);
        assert_eq!(summary.external, 2);
        assert_eq!(summary.resolved_calls, 2);
    }
}
