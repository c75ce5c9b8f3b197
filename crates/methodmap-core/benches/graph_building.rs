use criterion::{Criterion, criterion_group, criterion_main};
use methodmap_core::graph::{DEFAULT_REPRESENTATIVE_LINES, build_dependencies};
use methodmap_core::method::{CallSite, Method, MethodKind};
use methodmap_core::registry::DefinedMethodRegistry;
use std::hint::black_box;

fn build_methods(count: usize) -> Vec<Method> {
    let mut methods = Vec::with_capacity(count);
    for i in 0..count {
        let file = format!("app/models/model_{}.rb", i / 10);
        let start = (i % 10) * 10 + 1;
        let mut method = Method::new(format!("method_{}", i), MethodKind::Method, file, start, start + 8);
        for j in 1..=3 {
            method.calls.push(CallSite {
                method_name: format!("method_{}", (i + j * 7) % count),
                line: start + j,
                snippet: String::new(),
                import_line: None,
            });
        }
        methods.push(method);
    }
    methods
}

fn bench_build_dependencies_500(c: &mut Criterion) {
    let methods = build_methods(500);

    c.bench_function("build_dependencies_500_methods", |b| {
        b.iter(|| build_dependencies(black_box(&methods), DEFAULT_REPRESENTATIVE_LINES))
    });
}

fn bench_build_dependencies_5000(c: &mut Criterion) {
    let methods = build_methods(5000);

    c.bench_function("build_dependencies_5000_methods", |b| {
        b.iter(|| build_dependencies(black_box(&methods), DEFAULT_REPRESENTATIVE_LINES))
    });
}

fn bench_registry_from_methods(c: &mut Criterion) {
    let methods = build_methods(5000);

    c.bench_function("registry_from_5000_methods", |b| {
        b.iter(|| DefinedMethodRegistry::from_methods(black_box(&methods)))
    });
}

fn bench_report_serialization(c: &mut Criterion) {
    let methods = build_methods(500);

    c.bench_function("serialize_json_500_methods", |b| {
        b.iter(|| serde_json::to_string(black_box(&methods)).unwrap())
    });
}

criterion_group!(
    benches,
    bench_build_dependencies_500,
    bench_build_dependencies_5000,
    bench_registry_from_methods,
    bench_report_serialization,
);
criterion_main!(benches);
