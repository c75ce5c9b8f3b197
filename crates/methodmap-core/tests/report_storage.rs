use methodmap_core::analysis::{CorpusAnalysis, FileAnalysis};
use methodmap_core::graph::build_dependencies;
use methodmap_core::method::{CallSite, Method, MethodKind};
use methodmap_core::schema::AnalysisReport;
use methodmap_core::source::Language;
use methodmap_core::storage;
use tempfile::TempDir;

fn analysis() -> CorpusAnalysis {
    let mut file = FileAnalysis::empty("app/user.rb", Language::Ruby);
    let mut a = Method::new("a", MethodKind::Method, "app/user.rb", 1, 3);
    a.calls.push(CallSite {
        method_name: "b".into(),
        line: 2,
        snippet: "b".into(),
        import_line: None,
    });
    file.methods.push(a);
    file.methods
        .push(Method::new("b", MethodKind::Method, "app/user.rb", 4, 6));
    let dependencies = build_dependencies(&file.methods, 5);
    CorpusAnalysis {
        files: vec![file],
        dependencies,
        ..Default::default()
    }
}

#[test]
fn test_save_and_load_roundtrip() {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path();
    let report = AnalysisReport::from_analysis(&analysis());

    assert!(!storage::report_exists(root));
    storage::save(root, &report).unwrap();
    assert!(storage::report_exists(root));

    let loaded = storage::load(root).unwrap();
    assert_eq!(loaded, report);
    let restored = loaded.into_analysis();
    assert_eq!(restored.find_callers("b").len(), 1);
    assert_eq!(restored.dependencies.len(), 1);
}

#[test]
fn test_load_missing_report_fails() {
    let tmp = TempDir::new().unwrap();
    let err = storage::load(tmp.path()).unwrap_err();
    assert!(err.to_string().contains("failed to read report"));
}
