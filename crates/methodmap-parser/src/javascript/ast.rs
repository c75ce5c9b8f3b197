//! Syntax-tree strategy: walk a tree-sitter parse of the file.
//!
//! TypeScript files containing JSX are parsed with the TSX grammar. Any
//! syntax error makes the walk decline so the caller can fall back to the
//! line scanner.

use super::{
    Candidate, JsScan, classify_function, export_specifier, has_jsx_markers,
    import_clause_bindings,
};
use crate::scanning::classify_parameter_fragment;
use methodmap_core::error::AnalysisError;
use methodmap_core::method::{Method, MethodKind, Parameter, Visibility};
use methodmap_core::source::{Language, SourceFile};
use tree_sitter::Node;

const FUNCTION_VALUE_KINDS: &[&str] = &[
    "arrow_function",
    "function_expression",
    "function",
    "generator_function",
];

/// Calls whose first argument is the function being defined.
const FUNCTION_WRAPPERS: &[&str] = &[
    "memo",
    "forwardRef",
    "useCallback",
    "useMemo",
    "useEffect",
    "useLayoutEffect",
];

pub(crate) fn scan(file: &SourceFile, lines: &[&str]) -> Result<JsScan, AnalysisError> {
    let source = lines.join("\n");
    let lang: tree_sitter::Language = match file.language {
        Language::Javascript => tree_sitter_javascript::LANGUAGE.into(),
        Language::Typescript if has_jsx_markers(&source) => {
            tree_sitter_typescript::LANGUAGE_TSX.into()
        }
        Language::Typescript => tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
        Language::Tsx => tree_sitter_typescript::LANGUAGE_TSX.into(),
        other => {
            return Err(AnalysisError::UnsupportedLanguage {
                language: other.name().to_string(),
            });
        }
    };

    let mut parser = tree_sitter::Parser::new();
    parser
        .set_language(&lang)
        .map_err(|e| AnalysisError::ParserUnavailable {
            reason: e.to_string(),
        })?;
    let Some(tree) = parser.parse(source.as_bytes(), None) else {
        return Err(AnalysisError::ParserUnavailable {
            reason: "parser produced no tree".to_string(),
        });
    };

    let root = tree.root_node();
    if root.has_error() {
        let row = first_error_row(&root).unwrap_or(0);
        return Err(AnalysisError::malformed(&file.path, row + 1, "syntax error"));
    }

    let mut walker = Walker {
        path: &file.path,
        source: &source,
        language: file.language,
        scan: JsScan::default(),
        pending: Vec::new(),
    };
    walker.walk(&root);
    walker.scan.candidates.sort_by_key(|c| c.line);
    Ok(walker.scan)
}

fn first_error_row(root: &Node) -> Option<usize> {
    let mut node = *root;
    loop {
        if node.is_error() || node.is_missing() {
            return Some(node.start_position().row);
        }
        let mut cursor = node.walk();
        let next = node.children(&mut cursor).find(|c| c.has_error());
        node = next?;
    }
}

fn has_child_kind(node: &Node, kind: &str) -> bool {
    let mut cursor = node.walk();
    node.children(&mut cursor).any(|c| c.kind() == kind)
}

fn find_child<'t>(node: &Node<'t>, kind: &str) -> Option<Node<'t>> {
    let mut cursor = node.walk();
    node.children(&mut cursor).find(|c| c.kind() == kind)
}

/// The node naming the function being called: an identifier, or the
/// property of a member expression.
fn callee_name_node<'t>(function: &Node<'t>) -> Option<Node<'t>> {
    match function.kind() {
        "identifier" => Some(*function),
        "member_expression" => function.child_by_field_name("property"),
        _ => None,
    }
}

/// A node still to be visited. Class members get their own step because
/// they are classified differently from top-level statements.
#[derive(Clone, Copy)]
enum Step<'tree> {
    Visit(Node<'tree>),
    ClassMember(Node<'tree>),
}

/// Pre-order traversal over an explicit stack; input nesting never
/// deepens the call stack.
struct Walker<'a, 'tree> {
    path: &'a str,
    source: &'a str,
    language: Language,
    scan: JsScan,
    pending: Vec<Step<'tree>>,
}

impl<'a, 'tree> Walker<'a, 'tree> {
    fn text(&self, node: &Node) -> &'a str {
        let source: &'a str = self.source;
        &source[node.byte_range()]
    }

    fn definition(&self, name: &str, kind: MethodKind, node: &Node) -> Method {
        let mut method = Method::new(
            name,
            kind,
            self.path,
            node.start_position().row + 1,
            node.end_position().row + 1,
        );
        method.code = self.text(node).to_string();
        method
    }

    fn parameters(&self, function: &Node) -> Vec<Parameter> {
        if let Some(list) = function.child_by_field_name("parameters") {
            let mut cursor = list.walk();
            return list
                .named_children(&mut cursor)
                .filter(|p| p.kind() != "comment")
                .filter_map(|p| classify_parameter_fragment(self.text(&p), self.language))
                .collect();
        }
        function
            .child_by_field_name("parameter")
            .map(|p| vec![Parameter::positional(self.text(&p))])
            .unwrap_or_default()
    }

    /// The function node bound by a declarator or field value, looking
    /// through `memo(...)`, `forwardRef(...)` and hook wrappers.
    fn bound_function<'t>(&self, value: &Node<'t>) -> Option<Node<'t>> {
        if FUNCTION_VALUE_KINDS.contains(&value.kind()) {
            return Some(*value);
        }
        if value.kind() != "call_expression" {
            return None;
        }
        let callee = value
            .child_by_field_name("function")
            .and_then(|f| callee_name_node(&f))?;
        if !FUNCTION_WRAPPERS.contains(&self.text(&callee)) {
            return None;
        }
        let args = value.child_by_field_name("arguments")?;
        let mut cursor = args.walk();
        let first = args.named_children(&mut cursor).next()?;
        FUNCTION_VALUE_KINDS
            .contains(&first.kind())
            .then_some(first)
    }

    fn walk(&mut self, root: &Node<'tree>) {
        self.descend(root);
        while let Some(step) = self.pending.pop() {
            match step {
                Step::Visit(node) => self.visit(&node),
                Step::ClassMember(member) => self.class_member_step(&member),
            }
        }
    }

    /// Queue the children of `node`, first child on top.
    fn descend(&mut self, node: &Node<'tree>) {
        let mut cursor = node.walk();
        let children: Vec<Node<'tree>> = node.children(&mut cursor).collect();
        self.pending.extend(children.into_iter().rev().map(Step::Visit));
    }

    fn visit(&mut self, node: &Node<'tree>) {
        match node.kind() {
            "function_declaration" | "generator_function_declaration" => {
                if let Some(name_node) = node.child_by_field_name("name") {
                    let name = self.text(&name_node);
                    let kind = classify_function(name, self.text(node));
                    let mut method = self.definition(name, kind, node);
                    method.parameters = self.parameters(node);
                    self.scan.methods.push(method);
                }
                self.descend(node);
            }
            "class_declaration" | "abstract_class_declaration" | "class" => {
                if let Some(name_node) = node.child_by_field_name("name") {
                    let method = self.definition(self.text(&name_node), MethodKind::Class, node);
                    self.scan.methods.push(method);
                }
                match node.child_by_field_name("body") {
                    Some(body) => self.class_body(&body),
                    None => self.descend(node),
                }
            }
            "interface_declaration" => self.interface(node),
            "type_alias_declaration" | "enum_declaration" => {
                if let Some(name_node) = node.child_by_field_name("name") {
                    let kind = if node.kind() == "enum_declaration" {
                        MethodKind::Enum
                    } else {
                        MethodKind::TypeAlias
                    };
                    let method = self.definition(self.text(&name_node), kind, node);
                    self.scan.methods.push(method);
                }
            }
            "lexical_declaration" | "variable_declaration" => {
                self.declaration(node);
                self.descend(node);
            }
            "import_statement" => self.import(node),
            "export_statement" => {
                self.export(node);
                self.descend(node);
            }
            "call_expression" => {
                if let Some(name_node) = node
                    .child_by_field_name("function")
                    .and_then(|f| callee_name_node(&f))
                {
                    self.candidate(&name_node, self.text(&name_node).trim_start_matches('#'));
                }
                self.descend(node);
            }
            "new_expression" => {
                if let Some(constructor) = node.child_by_field_name("constructor")
                    && constructor.kind() == "identifier"
                {
                    self.candidate(&constructor, self.text(&constructor));
                }
                self.descend(node);
            }
            "jsx_opening_element" | "jsx_self_closing_element" => {
                if let Some(name_node) = node.child_by_field_name("name") {
                    let head = self.text(&name_node).split('.').next().unwrap_or_default();
                    if head.starts_with(|c: char| c.is_ascii_uppercase()) {
                        self.candidate(&name_node, head);
                    }
                }
                self.descend(node);
            }
            _ => self.descend(node),
        }
    }

    fn candidate(&mut self, node: &Node, name: &str) {
        if name.is_empty() {
            return;
        }
        self.scan.candidates.push(Candidate {
            name: name.to_string(),
            line: node.start_position().row + 1,
        });
    }

    fn class_body(&mut self, body: &Node<'tree>) {
        let mut cursor = body.walk();
        let members: Vec<Node<'tree>> = body.children(&mut cursor).collect();
        self.pending.extend(members.into_iter().rev().map(Step::ClassMember));
    }

    fn class_member_step(&mut self, member: &Node<'tree>) {
        match member.kind() {
            "method_definition" | "abstract_method_signature" | "method_signature" => {
                self.class_member(member, member);
                self.descend(member);
            }
            "field_definition" | "public_field_definition" => {
                let function = member
                    .child_by_field_name("value")
                    .and_then(|v| self.bound_function(&v));
                if let Some(function) = function {
                    self.class_member(member, &function);
                }
                self.descend(member);
            }
            _ => self.visit(member),
        }
    }

    fn class_member(&mut self, member: &Node, function: &Node) {
        let Some(name_node) = member
            .child_by_field_name("name")
            .or_else(|| member.child_by_field_name("property"))
        else {
            return;
        };
        let raw_name = self.text(&name_node);
        let kind = if has_child_kind(member, "static") {
            MethodKind::ClassMethod
        } else {
            MethodKind::Method
        };
        let mut method = self.definition(raw_name.trim_start_matches('#'), kind, member);
        method.parameters = self.parameters(function);
        let private_modifier = find_child(member, "accessibility_modifier")
            .is_some_and(|m| self.text(&m) == "private");
        if private_modifier || name_node.kind() == "private_property_identifier" {
            method.visibility = Visibility::Private;
        }
        self.scan.methods.push(method);
    }

    fn interface(&mut self, node: &Node) {
        let Some(name_node) = node.child_by_field_name("name") else {
            return;
        };
        let method = self.definition(self.text(&name_node), MethodKind::Interface, node);
        self.scan.methods.push(method);

        let Some(body) = node.child_by_field_name("body") else {
            return;
        };
        let mut cursor = body.walk();
        for member in body.named_children(&mut cursor) {
            let Some(member_name) = member.child_by_field_name("name") else {
                continue;
            };
            let function = match member.kind() {
                "method_signature" => Some(member),
                "property_signature" => member
                    .child_by_field_name("type")
                    .filter(|t| self.text(t).contains("=>"))
                    .and_then(|t| {
                        let mut inner = t.walk();
                        t.named_children(&mut inner).next()
                    }),
                _ => None,
            };
            if let Some(function) = function {
                let mut method =
                    self.definition(self.text(&member_name), MethodKind::InterfaceMethod, &member);
                method.parameters = self.parameters(&function);
                self.scan.methods.push(method);
            }
        }
    }

    fn declaration(&mut self, node: &Node) {
        let mut cursor = node.walk();
        for decl in node.named_children(&mut cursor) {
            if decl.kind() != "variable_declarator" {
                continue;
            }
            let (Some(name_node), Some(value)) = (
                decl.child_by_field_name("name"),
                decl.child_by_field_name("value"),
            ) else {
                continue;
            };

            if let Some(module) = self.required_module(&value) {
                let bindings = if name_node.kind() == "identifier" {
                    vec![self.text(&name_node).to_string()]
                } else {
                    import_clause_bindings(self.text(&name_node))
                };
                let mut method = self.definition(&module, MethodKind::Import, node);
                method.module = Some(module);
                method.bindings = bindings;
                self.scan.methods.push(method);
                continue;
            }

            if name_node.kind() != "identifier" {
                continue;
            }
            if let Some(function) = self.bound_function(&value) {
                let name = self.text(&name_node);
                let kind = classify_function(name, self.text(node));
                let mut method = self.definition(name, kind, node);
                method.parameters = self.parameters(&function);
                self.scan.methods.push(method);
            }
        }
    }

    /// Module specifier of a `require('...')` call.
    fn required_module(&self, value: &Node) -> Option<String> {
        if value.kind() != "call_expression" {
            return None;
        }
        let function = value.child_by_field_name("function")?;
        if function.kind() != "identifier" || self.text(&function) != "require" {
            return None;
        }
        let args = value.child_by_field_name("arguments")?;
        let mut cursor = args.walk();
        let first = args.named_children(&mut cursor).next()?;
        (first.kind() == "string").then(|| unquote(self.text(&first)))
    }

    fn import(&mut self, node: &Node) {
        let Some(source_node) = node.child_by_field_name("source") else {
            return;
        };
        let module = unquote(self.text(&source_node));
        let bindings = find_child(node, "import_clause")
            .map(|clause| import_clause_bindings(self.text(&clause)))
            .unwrap_or_default();
        let mut method = self.definition(&module, MethodKind::Import, node);
        method.module = Some(module);
        method.bindings = bindings;
        self.scan.methods.push(method);
    }

    fn export(&mut self, node: &Node) {
        let module = node
            .child_by_field_name("source")
            .map(|s| unquote(self.text(&s)));

        if let Some(clause) = find_child(node, "export_clause") {
            let inner = self.text(&clause).trim_matches(|c| c == '{' || c == '}');
            for (local, exported) in inner.split(',').filter_map(export_specifier) {
                let mut method = self.definition(&exported, MethodKind::Export, node);
                method.module.clone_from(&module);
                method.bindings = vec![local];
                self.scan.methods.push(method);
            }
        } else if has_child_kind(node, "*") || find_child(node, "namespace_export").is_some() {
            let name = find_child(node, "namespace_export")
                .and_then(|ns| {
                    let mut cursor = ns.walk();
                    ns.named_children(&mut cursor)
                        .last()
                        .map(|id| self.text(&id).to_string())
                })
                .unwrap_or_else(|| "*".to_string());
            let mut method = self.definition(&name, MethodKind::Export, node);
            method.module = module;
            self.scan.methods.push(method);
        } else if let Some(value) = node.child_by_field_name("value")
            && value.kind() == "identifier"
        {
            let name = self.text(&value);
            let mut method = self.definition(name, MethodKind::Export, node);
            method.bindings = vec![name.to_string()];
            self.scan.methods.push(method);
        }
    }
}

fn unquote(literal: &str) -> String {
    literal
        .trim_matches(|c| c == '\'' || c == '"' || c == '`')
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan_source(path: &str, source: &str) -> Result<JsScan, AnalysisError> {
        let file = SourceFile::detect(path, source);
        let lines: Vec<&str> = source.lines().collect();
        scan(&file, &lines)
    }

    fn find<'a>(scan: &'a JsScan, name: &str) -> &'a Method {
        scan.methods
            .iter()
            .find(|m| m.name == name)
            .unwrap_or_else(|| panic!("no method named {name}"))
    }

    #[test]
    fn test_component_and_hook_definitions() {
        let source = "\
import React, { useState } from 'react';

export function useCounter(start = 0) {
  const [count, setCount] = useState(start);
  return count;
}

export const Counter = ({ label }) => {
  const value = useCounter(1);
  return <Badge label={label} value={value} />;
};
";
        let scan = scan_source("src/Counter.jsx", source).unwrap();
        let import = find(&scan, "react");
        assert_eq!(import.bindings, vec!["React", "useState"]);
        let hook = find(&scan, "useCounter");
        assert_eq!(hook.kind, MethodKind::CustomHook);
        assert_eq!(hook.parameters[0].default_value.as_deref(), Some("0"));
        let counter = find(&scan, "Counter");
        assert_eq!(counter.kind, MethodKind::Component);
        assert_eq!((counter.start_line, counter.end_line), (8, 11));

        let names: Vec<(&str, usize)> = scan
            .candidates
            .iter()
            .map(|c| (c.name.as_str(), c.line))
            .collect();
        assert!(names.contains(&("useState", 4)));
        assert!(names.contains(&("useCounter", 9)));
        assert!(names.contains(&("Badge", 10)));
    }

    #[test]
    fn test_typescript_class_and_interface() {
        let source = "\
interface Repo {
  find(id: string): User;
  onChange: (user: User) => void;
}

export class UserRepo implements Repo {
  private cache = new Map<string, User>();

  static open(url: string): UserRepo {
    return new UserRepo();
  }

  find(id: string): User {
    return this.load(id);
  }

  private load = (id: string): User => {
    return decode(id);
  };
}
";
        let scan = scan_source("src/repo.ts", source).unwrap();
        assert_eq!(find(&scan, "Repo").kind, MethodKind::Interface);
        assert_eq!(find(&scan, "onChange").kind, MethodKind::InterfaceMethod);
        assert_eq!(find(&scan, "open").kind, MethodKind::ClassMethod);
        let load = find(&scan, "load");
        assert_eq!(load.kind, MethodKind::Method);
        assert_eq!(load.visibility, Visibility::Private);
        assert_eq!(load.parameters[0].type_annotation.as_deref(), Some("string"));
        assert!(scan.methods.iter().all(|m| m.name != "cache"));

        let names: Vec<&str> = scan.candidates.iter().map(|c| c.name.as_str()).collect();
        assert!(names.contains(&"load"));
        assert!(names.contains(&"decode"));
        assert!(names.contains(&"UserRepo"));
    }

    #[test]
    fn test_deeply_nested_expression() {
        let depth = 20_000;
        let source = format!(
            "function outer() {{\n  return {}1{};\n}}\n\nfunction next() {{\n  outer();\n}}\n",
            "[".repeat(depth),
            "]".repeat(depth)
        );
        let scan = scan_source("src/deep.js", &source).unwrap();
        let outer = find(&scan, "outer");
        assert_eq!((outer.start_line, outer.end_line), (1, 3));
        let next = find(&scan, "next");
        assert_eq!((next.start_line, next.end_line), (5, 7));
        assert!(scan.candidates.iter().any(|c| c.name == "outer" && c.line == 6));
    }

    #[test]
    fn test_syntax_error_declines() {
        let err = scan_source("src/broken.js", "function broken( {\n  return 1;\n").unwrap_err();
        assert!(matches!(err, AnalysisError::MalformedConstruct { .. }));
    }

    #[test]
    fn test_exports() {
        let source = "\
const { join } = require('path');
function run() {}
export { run as start };
export * as tools from './tools';
export default run;
";
        let scan = scan_source("src/index.js", source).unwrap();
        assert_eq!(find(&scan, "path").bindings, vec!["join"]);
        assert_eq!(find(&scan, "start").bindings, vec!["run"]);
        assert_eq!(find(&scan, "tools").module.as_deref(), Some("./tools"));
        assert_eq!(find(&scan, "run").kind, MethodKind::Function);
        assert!(
            scan.methods
                .iter()
                .any(|m| m.kind == MethodKind::Export && m.name == "run")
        );
    }
}
