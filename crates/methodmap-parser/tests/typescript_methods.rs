use methodmap_core::analysis::CorpusAnalysis;
use methodmap_core::config::{AnalyzerConfig, JsStrategyPreference};
use methodmap_core::method::{Method, MethodKind, ParameterKind, Visibility};
use methodmap_core::source::{Language, SourceFile};
use methodmap_parser::AnalysisContext;

const PREFERENCES: [JsStrategyPreference; 2] =
    [JsStrategyPreference::Auto, JsStrategyPreference::Heuristic];

fn analyze(preference: JsStrategyPreference, path: &str, source: &str) -> CorpusAnalysis {
    let mut config = AnalyzerConfig::default();
    config.scan.js_strategy = preference;
    AnalysisContext::new(config).analyze_corpus(&[SourceFile::detect(path, source)])
}

fn method<'a>(analysis: &'a CorpusAnalysis, name: &str) -> &'a Method {
    analysis
        .find_definition(name)
        .unwrap_or_else(|| panic!("no method named {name}"))
}

#[test]
fn ts_arrow_returning_jsx_is_component() {
    for preference in PREFERENCES {
        for path in ["src/Foo.ts", "src/Foo.tsx"] {
            let analysis = analyze(preference, path, "const Foo = () => { return <div/>; };");
            let foo = method(&analysis, "Foo");
            assert_eq!(foo.kind, MethodKind::Component, "{preference:?} {path}");
            assert_eq!((foo.start_line, foo.end_line), (1, 1));
        }
    }
}

#[test]
fn tsx_component_renders_child_component() {
    let source = "\
import React from 'react';

interface RowProps {
  label: string;
}

function Row({ label }: RowProps) {
  return <li className=\"row\">{label}</li>;
}

export const List = ({ items }: { items: string[] }) => {
  return (
    <ul>
      {items.map((item) => (
        <Row key={item} label={item} />
      ))}
    </ul>
  );
};
";
    for preference in PREFERENCES {
        let analysis = analyze(preference, "src/List.tsx", source);
        assert_eq!(method(&analysis, "Row").kind, MethodKind::Component, "{preference:?}");
        let list = method(&analysis, "List");
        assert_eq!(list.kind, MethodKind::Component);
        assert_eq!((list.start_line, list.end_line), (11, 19));
        let row_call = list
            .calls
            .iter()
            .find(|c| c.method_name == "Row")
            .expect("List renders Row");
        assert_eq!(row_call.line, 15);
        assert!(
            analysis
                .dependencies
                .iter()
                .any(|d| d.from.name == "List" && d.to.name == "Row" && d.is_internal())
        );
    }
}

#[test]
fn ts_interface_type_and_enum_declarations() {
    let source = "\
export interface Speaker {
  speak(words: string): void;
  onDone: (ok: boolean) => void;
  volume: number;
}

export type Handler = (event: Event) => void;

enum Color {
  Red,
  Green,
}
";
    for preference in PREFERENCES {
        let analysis = analyze(preference, "src/types.ts", source);
        let speaker = method(&analysis, "Speaker");
        assert_eq!(speaker.kind, MethodKind::Interface, "{preference:?}");
        assert_eq!((speaker.start_line, speaker.end_line), (1, 5));

        let speak = method(&analysis, "speak");
        assert_eq!(speak.kind, MethodKind::InterfaceMethod);
        assert_eq!(speak.parameters[0].name, "words");
        assert_eq!(speak.parameters[0].type_annotation.as_deref(), Some("string"));
        assert_eq!(method(&analysis, "onDone").kind, MethodKind::InterfaceMethod);
        assert!(analysis.find_definition("volume").is_none());

        assert_eq!(method(&analysis, "Handler").kind, MethodKind::TypeAlias);
        let color = method(&analysis, "Color");
        assert_eq!(color.kind, MethodKind::Enum);
        assert_eq!(color.end_line, 12);
    }
}

#[test]
fn ts_class_members() {
    let source = "\
export class UserRepo {
  static open(url: string): UserRepo {
    return new UserRepo();
  }

  lookup(id: string, limit?: number) {
    return this.load(id);
  }

  private load = (id: string) => {
    return id;
  };
}
";
    for preference in PREFERENCES {
        let analysis = analyze(preference, "src/repo.ts", source);
        let repo = method(&analysis, "UserRepo");
        assert_eq!(repo.kind, MethodKind::Class, "{preference:?}");
        assert_eq!((repo.start_line, repo.end_line), (1, 13));

        assert_eq!(method(&analysis, "open").kind, MethodKind::ClassMethod);
        let lookup = method(&analysis, "lookup");
        assert_eq!(lookup.kind, MethodKind::Method);
        assert_eq!(lookup.parameters[1].name, "limit");
        assert_eq!(lookup.parameters[1].kind, Some(ParameterKind::Optional));
        assert!(lookup.calls_name("load"));

        let load = method(&analysis, "load");
        assert_eq!(load.visibility, Visibility::Private);
        assert_eq!((load.start_line, load.end_line), (10, 12));

        let open = method(&analysis, "open");
        assert!(open.calls_name("UserRepo"));
    }
}

#[test]
fn ts_memo_wrapped_component() {
    let source = "\
export const Badge = memo(({ count }: { count: number }) => {
  return <span>{format(count)}</span>;
});

function format(n: number): string {
  return String(n);
}
";
    for preference in PREFERENCES {
        let analysis = analyze(preference, "src/Badge.tsx", source);
        let badge = method(&analysis, "Badge");
        assert_eq!(badge.kind, MethodKind::Component, "{preference:?}");
        assert_eq!((badge.start_line, badge.end_line), (1, 3));
        assert!(badge.calls_name("format"));
        assert!(badge.calls_name("memo"));
        // `String` is a builtin.
        assert!(method(&analysis, "format").calls.is_empty());
    }
}

#[test]
fn ts_syntax_error_still_yields_definitions() {
    let source = "\
function ok() {
  return helper(;
}

function helper() {}
";
    let analysis = analyze(JsStrategyPreference::Auto, "src/broken.ts", source);
    assert_eq!(method(&analysis, "ok").kind, MethodKind::Function);
    assert_eq!(method(&analysis, "helper").start_line, 5);
}
