//! Lookups over already-extracted definitions.

use crate::method::Method;

/// First definition named `name`, in corpus order.
///
/// Import and export records are skipped so navigation lands on the real
/// definition rather than the line that mentions it.
pub fn find_definition<'a>(methods: &'a [Method], name: &str) -> Option<&'a Method> {
    methods
        .iter()
        .find(|m| m.name == name && m.kind.is_resolvable())
}

/// Every definition named `name`, in corpus order.
pub fn find_definitions<'a>(methods: &'a [Method], name: &str) -> Vec<&'a Method> {
    methods
        .iter()
        .filter(|m| m.name == name && m.kind.is_resolvable())
        .collect()
}

/// Every method whose call sites reference `name`.
pub fn find_callers<'a>(methods: &'a [Method], name: &str) -> Vec<&'a Method> {
    methods.iter().filter(|m| m.calls_name(name)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::method::{CallSite, MethodKind};

    fn corpus() -> Vec<Method> {
        let import = Method::new("helper", MethodKind::Import, "a.js", 1, 1);
        let mut caller = Method::new("main", MethodKind::Function, "a.js", 3, 5);
        caller.calls.push(CallSite {
            method_name: "helper".into(),
            line: 4,
            snippet: "helper()".into(),
            import_line: Some(1),
        });
        let helper = Method::new("helper", MethodKind::Function, "b.js", 1, 3);
        vec![import, caller, helper]
    }

    #[test]
    fn test_find_definition_skips_imports() {
        let methods = corpus();
        let found = find_definition(&methods, "helper").unwrap();
        assert_eq!(found.file_path, "b.js");
        assert!(find_definition(&methods, "missing").is_none());
        assert_eq!(find_definitions(&methods, "helper").len(), 1);
    }

    #[test]
    fn test_find_callers() {
        let methods = corpus();
        let callers = find_callers(&methods, "helper");
        assert_eq!(callers.len(), 1);
        assert_eq!(callers[0].name, "main");
        assert!(find_callers(&methods, "main").is_empty());
    }
}
