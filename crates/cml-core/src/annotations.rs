use regex::Regex;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::LazyLock;

use crate::catalogs::{
    ConstructKind, ANY_ANNOTATIONS, BOOLEAN_ANNOTATIONS, DATE_ANNOTATIONS, ENUM_ANNOTATIONS,
    INTEGER_ANNOTATIONS,
};
use crate::patterns::unquote;
use crate::types::Issue;

static RE_ANNOTATION_KV: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"([A-Za-z_][A-Za-z0-9_]*)\s*=\s*("[^"]*"|[^,\)]+)?"#).unwrap()
});
static RE_DATE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").unwrap());

/// Keys and raw values declared by the `@(...)` segments owned by one
/// construct.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnnotationSet {
    keys: BTreeSet<String>,
    values: BTreeMap<String, String>,
}

impl AnnotationSet {
    /// Extract `key=value` pairs from annotation text. Quoted values keep
    /// commas and parentheses; bare values run to the next `,` or `)`.
    /// A key with nothing after `=` is declared but has no value.
    /// A repeated key keeps its last value.
    pub fn parse(text: &str) -> Self {
        let mut set = AnnotationSet::default();
        for caps in RE_ANNOTATION_KV.captures_iter(text) {
            let key = caps[1].to_string();
            if let Some(raw) = caps.get(2) {
                set.values
                    .insert(key.clone(), unquote(raw.as_str().trim()).to_string());
            }
            set.keys.insert(key);
        }
        set
    }

    /// Parse several segments as one block.
    pub fn from_segments<S: AsRef<str>>(segments: &[S]) -> Self {
        let joined = segments
            .iter()
            .map(AsRef::as_ref)
            .collect::<Vec<_>>()
            .join(" ");
        Self::parse(&joined)
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.keys.contains(key)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Declared keys in sorted order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.keys.iter().map(String::as_str)
    }
}

/// Context label used in annotation messages, e.g. `type 'Laptop'`.
pub fn context_label(kind: ConstructKind, name: Option<&str>) -> String {
    match name {
        Some(name) => format!("{kind} '{name}'"),
        None => kind.to_string(),
    }
}

/// Check an annotation block against its construct's whitelist and the
/// value-shape tables.
pub fn check_annotations(
    kind: ConstructKind,
    set: &AnnotationSet,
    line: usize,
    context: &str,
    issues: &mut Vec<Issue>,
) {
    check_supported(set, kind.supported_annotations(), line, Some(context), issues);

    if kind == ConstructKind::Attribute {
        check_attribute_extras(set, line, context, issues);
    }

    check_values(set, line, context, issues);
}

/// Warn about annotations that never reached a construct. Keys known to any
/// construct kind are accepted.
pub fn check_orphaned(set: &AnnotationSet, line: usize, issues: &mut Vec<Issue>) {
    check_supported(set, &ANY_ANNOTATIONS, line, None, issues);
}

fn check_supported(
    set: &AnnotationSet,
    supported: &HashSet<&'static str>,
    line: usize,
    context: Option<&str>,
    issues: &mut Vec<Issue>,
) {
    for key in set.keys() {
        if supported.contains(key) {
            continue;
        }
        let message = match context {
            Some(ctx) => format!("Unsupported annotation '{key}' on {ctx}."),
            None => format!("Unsupported annotation '{key}'."),
        };
        issues.push(Issue::warning(Some(line), message));
    }
}

fn check_attribute_extras(set: &AnnotationSet, line: usize, context: &str, issues: &mut Vec<Issue>) {
    if set.contains("contextPath") {
        issues.push(Issue::warning(
            Some(line),
            format!("contextPath should only be used on extern variables (found on {context})."),
        ));
    }
    if set.contains("productGroup") {
        issues.push(Issue::warning(
            Some(line),
            "productGroup is deprecated; use minInstanceQty/maxInstanceQty type annotations instead.",
        ));
    }
}

fn check_values(set: &AnnotationSet, line: usize, context: &str, issues: &mut Vec<Issue>) {
    for key in set.keys() {
        let Some(value) = set.get(key) else {
            continue;
        };

        if BOOLEAN_ANNOTATIONS.contains(key) && !matches!(value, "true" | "false") {
            issues.push(Issue::warning(
                Some(line),
                format!("Annotation '{key}' expects true/false on {context}."),
            ));
        }
        if INTEGER_ANNOTATIONS.contains(key) && !is_all_digits(value) {
            issues.push(Issue::warning(
                Some(line),
                format!("Annotation '{key}' expects an integer on {context}."),
            ));
        }
        if let Some(allowed) = ENUM_ANNOTATIONS.get(key) {
            if !allowed.contains(&value) {
                issues.push(Issue::warning(
                    Some(line),
                    format!(
                        "Annotation '{key}' expects one of [{}] on {context}.",
                        allowed.join(", ")
                    ),
                ));
            }
        }
        if DATE_ANNOTATIONS.contains(key) && !RE_DATE.is_match(value) {
            issues.push(Issue::warning(
                Some(line),
                format!("Annotation '{key}' expects ISO date YYYY-MM-DD on {context}."),
            ));
        }
    }
}

fn is_all_digits(value: &str) -> bool {
    !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit())
}
