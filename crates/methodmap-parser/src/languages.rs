//! Per-language word tables: keywords, builtins, framework allowlists and
//! control-flow words, plus the predicates the extractors query them with.

use methodmap_core::source::Language;
use std::collections::HashSet;

/// Static word tables for one language family.
#[derive(Debug)]
pub struct LanguageTables {
    /// Never a valid call or definition name.
    pub keywords: &'static [&'static str],
    /// Standard-library names excluded from call detection.
    pub builtins: &'static [&'static str],
    /// Calls accepted without a local definition.
    pub framework_allowlist: &'static [&'static str],
    /// Statement words that look like calls when followed by `(`.
    pub control_patterns: &'static [&'static str],
}

static RUBY: LanguageTables = LanguageTables {
    keywords: &[
        "BEGIN", "END", "__FILE__", "__LINE__", "__method__", "alias", "and", "begin", "break",
        "case", "class", "def", "defined?", "do", "else", "elsif", "end", "ensure", "false",
        "for", "if", "in", "module", "next", "nil", "not", "or", "private", "protected",
        "public", "redo", "rescue", "retry", "return", "self", "super", "then", "true", "undef",
        "unless", "until", "when", "while", "yield",
    ],
    builtins: &[
        "attr_accessor", "attr_reader", "attr_writer", "block_given?", "catch", "class_eval",
        "define_method", "dup", "each", "each_with_index", "each_with_object", "extend",
        "format", "freeze", "frozen?", "gets", "include", "include?", "inspect", "instance_of?",
        "is_a?", "kind_of?", "lambda", "loop", "map", "module_function", "new", "nil?",
        "object_id", "p", "pp", "prepend", "print", "printf", "proc", "puts", "raise", "require",
        "require_relative", "respond_to?", "select", "send", "sleep", "sprintf", "tap", "then",
        "throw", "to_a", "to_h", "to_i", "to_s", "to_sym", "reject", "times", "inject", "reduce",
        "sum", "sort", "sort_by", "min", "max", "empty?", "present?", "blank?", "length", "size",
        "keys", "values", "merge", "fetch", "dig", "split", "join", "strip", "upcase",
        "downcase", "gsub", "sub", "compact", "flatten", "uniq", "zip", "any?", "all?", "none?",
    ],
    framework_allowlist: &[
        // ActiveRecord
        "all", "build", "count", "create", "create!", "delete", "destroy", "destroy!",
        "exists?", "find", "find_by", "find_by!", "find_each", "find_or_create_by",
        "includes", "joins", "limit", "order", "pluck", "reload", "save", "save!",
        "update", "update!", "update_all", "where", "group", "having", "offset", "distinct",
        "belongs_to", "has_many", "has_one", "has_and_belongs_to_many", "validates",
        "validate", "scope", "before_save", "after_save", "before_create", "after_create",
        "before_validation", "after_commit", "errors", "persisted?", "new_record?",
        // ActionController
        "before_action", "after_action", "skip_before_action", "around_action", "params",
        "permit", "require_params", "render", "redirect_to", "redirect_back", "respond_to",
        "head", "session", "cookies", "flash", "request", "response", "helper_method",
        // ActionView
        "button_to", "content_for", "content_tag", "form_for", "form_with", "image_tag",
        "javascript_include_tag", "l", "link_to", "number_to_currency", "partial",
        "pluralize", "raw", "safe_join", "simple_format", "stylesheet_link_tag", "t", "tag",
        "time_ago_in_words", "truncate", "url_for", "yield_content", "csrf_meta_tags",
        // Devise
        "authenticate_user!", "current_user", "sign_in", "sign_out", "user_signed_in?",
    ],
    control_patterns: &[
        "if", "unless", "while", "until", "case", "when", "for", "return", "yield", "rescue",
        "defined?", "super",
    ],
};

static JAVASCRIPT: LanguageTables = LanguageTables {
    keywords: &[
        "abstract", "as", "async", "await", "break", "case", "catch", "class", "const",
        "continue", "debugger", "declare", "default", "delete", "do", "else",
        "enum", "export", "extends", "false", "finally", "for", "from", "function", "get", "if",
        "implements", "import", "in", "instanceof", "interface", "is", "keyof", "let",
        "namespace", "new", "null", "of", "private", "protected", "public", "readonly",
        "return", "satisfies", "set", "static", "super", "switch", "this", "throw", "true",
        "try", "type", "typeof", "undefined", "var", "void", "while", "with", "yield",
    ],
    builtins: &[
        "Array", "Boolean", "Date", "Error", "JSON", "Map", "Math", "Number", "Object",
        "Promise", "RegExp", "Set", "String", "Symbol", "WeakMap", "addEventListener",
        "alert", "apply", "assign", "bind", "call", "clearInterval", "clearTimeout", "concat",
        "console", "entries", "every", "fetch", "filter", "find", "findIndex", "forEach",
        "getElementById", "includes", "indexOf", "isArray", "isNaN", "join", "keys", "log",
        "map", "parse", "parseFloat", "parseInt", "pop", "preventDefault", "push",
        "querySelector", "querySelectorAll", "reduce", "reject", "removeEventListener",
        "replace", "require", "resolve", "setInterval", "setTimeout", "shift", "slice", "some",
        "sort", "splice", "split", "startsWith", "endsWith", "stopPropagation", "stringify",
        "then", "toFixed", "toLowerCase", "toString", "toUpperCase", "trim", "unshift",
        "values", "warn", "error", "info", "debug",
    ],
    framework_allowlist: &[
        // React
        "useState", "useEffect", "useContext", "useReducer", "useCallback", "useMemo",
        "useRef", "useLayoutEffect", "useImperativeHandle", "useDebugValue", "useId",
        "useTransition", "useDeferredValue", "useSyncExternalStore", "createContext",
        "createElement", "createRoot", "forwardRef", "lazy", "memo", "render", "setState",
        "Fragment", "Suspense", "StrictMode",
        // Router / data libraries
        "useNavigate", "useParams", "useLocation", "useSearchParams", "useSelector",
        "useDispatch", "useQuery", "useMutation", "useQueryClient", "dispatch", "navigate",
    ],
    control_patterns: &[
        "if", "for", "while", "switch", "catch", "return", "typeof", "function", "super",
        "import",
    ],
};

/// Word tables for a language, if it has an extractor.
pub fn tables(language: Language) -> Option<&'static LanguageTables> {
    match language {
        Language::Ruby | Language::Erb => Some(&RUBY),
        Language::Javascript | Language::Typescript | Language::Tsx => Some(&JAVASCRIPT),
        Language::Yaml | Language::Markdown | Language::Unknown => None,
    }
}

pub fn is_keyword(language: Language, name: &str) -> bool {
    tables(language).is_some_and(|t| t.keywords.contains(&name))
}

pub fn is_builtin(language: Language, name: &str) -> bool {
    tables(language).is_some_and(|t| t.builtins.contains(&name))
}

pub fn is_allowlisted(language: Language, name: &str) -> bool {
    tables(language).is_some_and(|t| t.framework_allowlist.contains(&name))
}

pub fn is_control_pattern(language: Language, name: &str) -> bool {
    tables(language).is_some_and(|t| t.control_patterns.contains(&name))
}

/// Word tables for one language merged with configured extra allowlist
/// entries. Built once per extractor.
#[derive(Debug, Clone)]
pub struct Vocabulary {
    language: Language,
    extra_allowlist: HashSet<String>,
}

impl Vocabulary {
    pub fn new(language: Language) -> Self {
        Self {
            language,
            extra_allowlist: HashSet::new(),
        }
    }

    pub fn with_extra_allowlist<I, S>(language: Language, extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            language,
            extra_allowlist: extra.into_iter().map(Into::into).collect(),
        }
    }

    pub fn language(&self) -> Language {
        self.language
    }

    /// Keywords, builtins and control words can never be call sites.
    pub fn is_excluded(&self, name: &str) -> bool {
        is_keyword(self.language, name)
            || is_builtin(self.language, name)
            || is_control_pattern(self.language, name)
    }

    pub fn is_keyword(&self, name: &str) -> bool {
        is_keyword(self.language, name)
    }

    pub fn is_builtin(&self, name: &str) -> bool {
        is_builtin(self.language, name)
    }

    pub fn is_allowlisted(&self, name: &str) -> bool {
        is_allowlisted(self.language, name) || self.extra_allowlist.contains(name)
    }
}
