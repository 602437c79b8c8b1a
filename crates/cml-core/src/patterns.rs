use regex::Regex;
use std::sync::LazyLock;

use crate::types::{Cardinality, ConstraintKeyword, FieldType};

// --- Regex patterns ---

static RE_DEFINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*define\s+([A-Za-z_][A-Za-z0-9_]*)\s+\[(.*)\]\s*$").unwrap()
});
static RE_TYPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\s*type\s+([A-Za-z_][A-Za-z0-9_]*)\s*(?::\s*([A-Za-z_][A-Za-z0-9_]*))?\s*(\{.*|;\s*)$",
    )
    .unwrap()
});
static RE_RELATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*relation\s+([A-Za-z_][A-Za-z0-9_]*)\s*:\s*([A-Za-z_][A-Za-z0-9_]*)").unwrap()
});
static RE_CARDINALITY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[\s*(\d+)\s*(?:\.\.\s*(\d+))?\s*\]").unwrap());
static RE_ORDER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"order\s*\(([^)]*)\)").unwrap());
static RE_EXTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*extern\s+([A-Za-z0-9_()]+)\s+([A-Za-z_][A-Za-z0-9_]*)\s*(=\s*[^;]+)?;")
        .unwrap()
});
static RE_CONSTRAINT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(constraint|message|preference|require|exclude|rule|setdefault)\b").unwrap()
});
static RE_FIELD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\s*(string|int|boolean|decimal(?:\(\d+\))?)\s+([A-Za-z_][A-Za-z0-9_]*)\s*=\s*([^;]+);",
    )
    .unwrap()
});
static RE_HEADER_KEYWORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(define|property|extern)\b").unwrap());
static RE_RANGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[\s*(\d+)\s*\.\.\s*(\d+)\s*\]").unwrap());

/// What a single stripped line turned out to be.
#[derive(Debug, Clone, PartialEq)]
pub enum LineShape {
    Define {
        name: String,
        values: Vec<String>,
    },
    Type {
        name: String,
        base: Option<String>,
        is_abstract: bool,
    },
    Relation {
        name: String,
        target: String,
        cardinality: Option<Cardinality>,
        order: Vec<String>,
    },
    /// A line led by `@(...)` that is not an extern, keyword-led or field line.
    Annotation,
    Extern {
        type_token: String,
        name: String,
        has_default: bool,
    },
    Constraint {
        keyword: ConstraintKeyword,
    },
    Field {
        field_type: FieldType,
        name: String,
        rhs: String,
    },
    Blank,
    Other,
}

impl LineShape {
    /// Declarations expected in the file header, before any type.
    pub fn is_header_decl(&self) -> bool {
        matches!(self, LineShape::Define { .. } | LineShape::Extern { .. })
    }
}

/// A classified line plus the `@(...)` segments found at its start.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedLine<'a> {
    pub shape: LineShape,
    pub annotations: Vec<&'a str>,
}

/// The line split into its leading annotation segments and the remainder.
struct Candidate<'a> {
    line: &'a str,
    segments: Vec<&'a str>,
    rest: &'a str,
}

type Recognizer = fn(&Candidate<'_>) -> Option<LineShape>;

/// Recognizers in priority order; the first match wins.
static RECOGNIZERS: &[Recognizer] = &[
    recognize_define,
    recognize_type,
    recognize_relation,
    recognize_extern,
    recognize_constraint,
    recognize_field,
    recognize_annotation,
];

/// Classify one comment-stripped line.
pub fn classify(line: &str) -> ClassifiedLine<'_> {
    if line.trim().is_empty() {
        return ClassifiedLine {
            shape: LineShape::Blank,
            annotations: Vec::new(),
        };
    }

    let (segments, rest) = split_annotation_prefix(line);
    let candidate = Candidate {
        line,
        segments,
        rest,
    };

    let shape = RECOGNIZERS
        .iter()
        .find_map(|recognize| recognize(&candidate))
        .unwrap_or(LineShape::Other);

    ClassifiedLine {
        shape,
        annotations: candidate.segments,
    }
}

/// Lines led by a header keyword, including ones the pattern bank does not
/// model (`property`) or could not fully match.
pub fn starts_with_header_keyword(line: &str) -> bool {
    RE_HEADER_KEYWORD.is_match(line)
}

fn recognize_define(c: &Candidate<'_>) -> Option<LineShape> {
    let caps = RE_DEFINE.captures(c.line)?;
    let raw = caps[2].trim();
    let values = if raw.is_empty() {
        Vec::new()
    } else {
        split_list_values(raw)
    };
    Some(LineShape::Define {
        name: caps[1].to_string(),
        values,
    })
}

fn recognize_type(c: &Candidate<'_>) -> Option<LineShape> {
    let caps = RE_TYPE.captures(c.line)?;
    Some(LineShape::Type {
        name: caps[1].to_string(),
        base: caps.get(2).map(|m| m.as_str().to_string()),
        is_abstract: caps[3].starts_with(';'),
    })
}

fn recognize_relation(c: &Candidate<'_>) -> Option<LineShape> {
    let caps = RE_RELATION.captures(c.line)?;
    Some(LineShape::Relation {
        name: caps[1].to_string(),
        target: caps[2].to_string(),
        cardinality: parse_cardinality(c.line),
        order: parse_order_list(c.line),
    })
}

fn recognize_extern(c: &Candidate<'_>) -> Option<LineShape> {
    let caps = RE_EXTERN.captures(c.rest)?;
    Some(LineShape::Extern {
        type_token: caps[1].to_string(),
        name: caps[2].to_string(),
        has_default: caps.get(3).is_some(),
    })
}

fn recognize_constraint(c: &Candidate<'_>) -> Option<LineShape> {
    let caps = RE_CONSTRAINT.captures(c.rest)?;
    let keyword = ConstraintKeyword::from_keyword(&caps[1])?;
    Some(LineShape::Constraint { keyword })
}

fn recognize_field(c: &Candidate<'_>) -> Option<LineShape> {
    let caps = RE_FIELD.captures(c.rest)?;
    let field_type = FieldType::parse(&caps[1])?;
    Some(LineShape::Field {
        field_type,
        name: caps[2].to_string(),
        rhs: caps[3].trim().to_string(),
    })
}

fn recognize_annotation(c: &Candidate<'_>) -> Option<LineShape> {
    if c.segments.is_empty() {
        None
    } else {
        Some(LineShape::Annotation)
    }
}

// ---------------------------------------------------------------------------
// Token helpers
// ---------------------------------------------------------------------------

/// Split leading `@(...)` segments off a line. Parentheses inside quoted
/// values do not count; an unterminated segment runs to end of line.
pub fn split_annotation_prefix(line: &str) -> (Vec<&str>, &str) {
    let mut segments = Vec::new();
    let mut rest = line.trim_start();

    while rest.starts_with("@(") {
        let end = find_segment_end(rest);
        segments.push(&rest[..end]);
        rest = rest[end..].trim_start();
    }

    (segments, rest)
}

/// Byte offset just past the `)` closing the segment opened at `s[1]`.
fn find_segment_end(s: &str) -> usize {
    let bytes = s.as_bytes();
    let mut depth = 0usize;
    let mut in_quote = false;

    for (i, &b) in bytes.iter().enumerate().skip(1) {
        match b {
            b'"' => in_quote = !in_quote,
            b'(' if !in_quote => depth += 1,
            b')' if !in_quote => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return i + 1;
                }
            }
            _ => {}
        }
    }

    bytes.len()
}

/// Split `a, "b", c` into unquoted, non-empty members.
pub fn split_list_values(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|part| unquote(part.trim()).to_string())
        .filter(|v| !v.is_empty())
        .collect()
}

/// Strip one pair of surrounding double quotes.
pub fn unquote(s: &str) -> &str {
    if s.len() >= 2 && s.starts_with('"') && s.ends_with('"') {
        &s[1..s.len() - 1]
    } else {
        s
    }
}

/// First `[min..max]` or `[min]` token on a line. Bounds too large for
/// `u64` are treated as absent.
pub fn parse_cardinality(line: &str) -> Option<Cardinality> {
    let caps = RE_CARDINALITY.captures(line)?;
    let min = caps[1].parse().ok()?;
    let max = match caps.get(2) {
        Some(m) => Some(m.as_str().parse().ok()?),
        None => None,
    };
    Some(Cardinality { min, max })
}

/// Names inside the first `order(...)` token on a line.
pub fn parse_order_list(line: &str) -> Vec<String> {
    RE_ORDER
        .captures(line)
        .map(|caps| {
            caps[1]
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Members of a bracketed list literal such as `["Red", "Blue"]`.
pub fn parse_list_literal(rhs: &str) -> Option<Vec<String>> {
    let inner = rhs.strip_prefix('[')?.strip_suffix(']')?;
    Some(split_list_values(inner))
}

/// First `[low..high]` range token in an expression.
pub fn find_range(rhs: &str) -> Option<(i64, i64)> {
    let caps = RE_RANGE.captures(rhs)?;
    Some((caps[1].parse().ok()?, caps[2].parse().ok()?))
}
