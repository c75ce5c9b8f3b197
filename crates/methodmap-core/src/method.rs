//! Definition model: methods, parameters, and the call sites inside them.

use serde::{Deserialize, Serialize};

/// What kind of definition a [`Method`] represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MethodKind {
    Function,
    Method,
    ClassMethod,
    InterfaceMethod,
    Component,
    CustomHook,
    Class,
    TypeAlias,
    Interface,
    Enum,
    Import,
    Export,
    ErbCall,
}

impl MethodKind {
    /// Kinds whose bodies are scanned for call sites.
    pub fn is_callable(self) -> bool {
        matches!(
            self,
            MethodKind::Function
                | MethodKind::Method
                | MethodKind::ClassMethod
                | MethodKind::Component
                | MethodKind::CustomHook
                | MethodKind::ErbCall
        )
    }

    /// Kinds that can be the target of a dependency edge.
    ///
    /// Import and export records only exist for navigation; template call
    /// aggregates are file-level and have no name other code could call.
    pub fn is_resolvable(self) -> bool {
        !matches!(
            self,
            MethodKind::Import | MethodKind::Export | MethodKind::ErbCall
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MethodKind::Function => "function",
            MethodKind::Method => "method",
            MethodKind::ClassMethod => "class_method",
            MethodKind::InterfaceMethod => "interface_method",
            MethodKind::Component => "component",
            MethodKind::CustomHook => "custom_hook",
            MethodKind::Class => "class",
            MethodKind::TypeAlias => "type_alias",
            MethodKind::Interface => "interface",
            MethodKind::Enum => "enum",
            MethodKind::Import => "import",
            MethodKind::Export => "export",
            MethodKind::ErbCall => "erb_call",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    #[default]
    Public,
    Private,
}

/// How a parameter is passed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterKind {
    /// Ruby `name:` / `name: default`.
    Keyword,
    /// Ruby `*args`.
    Splat,
    /// Ruby `**opts`.
    DoubleSplat,
    /// Ruby `&block`.
    Block,
    /// `name = value` (Ruby optional or JS default).
    Default,
    /// JS `...rest`.
    Rest,
    /// TS `name?: Type`.
    Optional,
    /// JS destructuring pattern `{ a, b }` / `[a, b]`.
    Destructured,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Parameter {
    pub name: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub type_annotation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<ParameterKind>,
}

impl Parameter {
    pub fn positional(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_annotation: None,
            default_value: None,
            kind: None,
        }
    }
}

/// A textual occurrence inside a method body believed to reference another
/// definition by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallSite {
    pub method_name: String,
    /// Absolute 1-indexed line in the file.
    pub line: usize,
    pub snippet: String,
    /// Line of the import statement that bound the callee, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub import_line: Option<usize>,
}

/// A named, navigable definition extracted from a source file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Method {
    pub name: String,
    pub kind: MethodKind,
    pub file_path: String,
    /// 1-indexed, inclusive.
    pub start_line: usize,
    /// 1-indexed, inclusive.
    pub end_line: usize,
    pub code: String,
    pub visibility: Visibility,
    #[serde(default)]
    pub parameters: Vec<Parameter>,
    #[serde(default)]
    pub calls: Vec<CallSite>,
    /// Module specifier for import/export records.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,
    /// Local names bound by an import record.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bindings: Vec<String>,
}

impl Method {
    /// A definition with no parameters, calls, or module metadata.
    pub fn new(
        name: impl Into<String>,
        kind: MethodKind,
        file_path: impl Into<String>,
        start_line: usize,
        end_line: usize,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            file_path: file_path.into(),
            start_line,
            end_line,
            code: String::new(),
            visibility: Visibility::Public,
            parameters: Vec::new(),
            calls: Vec::new(),
            module: None,
            bindings: Vec::new(),
        }
    }

    /// Whether a 1-indexed line falls inside this definition.
    pub fn contains_line(&self, line: usize) -> bool {
        line >= self.start_line && line <= self.end_line
    }

    /// Number of lines spanned.
    pub fn span(&self) -> usize {
        self.end_line + 1 - self.start_line
    }

    /// Whether any call site references `name`.
    pub fn calls_name(&self, name: &str) -> bool {
        self.calls.iter().any(|c| c.method_name == name)
    }

    /// Record a call site unless the same callee was already recorded on
    /// the same line.
    pub fn push_call(&mut self, call: CallSite) -> bool {
        let duplicate = self
            .calls
            .iter()
            .any(|c| c.line == call.line && c.method_name == call.method_name);
        if duplicate {
            return false;
        }
        self.calls.push(call);
        true
    }
}
