//! Acceptance test for call-site candidates.

use crate::languages::Vocabulary;
use methodmap_core::registry::DefinedMethodRegistry;

/// Decides whether an identifier found in a method body is a call.
///
/// A candidate passes when it is not a keyword, builtin or control word, and
/// it is either defined somewhere in the corpus, defined (or imported) in the
/// current file, or allowlisted for the language.
#[derive(Debug, Clone, Copy)]
pub struct CallGate<'a> {
    vocabulary: &'a Vocabulary,
    registry: &'a DefinedMethodRegistry,
    local: &'a DefinedMethodRegistry,
}

impl<'a> CallGate<'a> {
    pub fn new(
        vocabulary: &'a Vocabulary,
        registry: &'a DefinedMethodRegistry,
        local: &'a DefinedMethodRegistry,
    ) -> Self {
        Self {
            vocabulary,
            registry,
            local,
        }
    }

    pub fn accepts(&self, name: &str) -> bool {
        if name.is_empty() || self.vocabulary.is_excluded(name) {
            return false;
        }
        self.registry.contains(name)
            || self.local.contains(name)
            || self.vocabulary.is_allowlisted(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use methodmap_core::source::Language;

    #[test]
    fn test_gate_rules() {
        let vocab = Vocabulary::new(Language::Ruby);
        let registry: DefinedMethodRegistry = ["full_name", "puts"].into_iter().collect();
        let local: DefinedMethodRegistry = ["helper"].into_iter().collect();
        let gate = CallGate::new(&vocab, &registry, &local);

        assert!(gate.accepts("full_name"));
        assert!(gate.accepts("helper"));
        assert!(gate.accepts("where"));
        assert!(!gate.accepts("first_name"));
        // Builtins stay excluded even when something defines them.
        assert!(!gate.accepts("puts"));
        assert!(!gate.accepts("end"));
    }
}
