use crate::annotations::{check_annotations, check_orphaned, context_label, AnnotationSet};
use crate::catalogs::ConstructKind;
use crate::comments::{split_lines, strip_comments};
use crate::domain::resolve_domain;
use crate::patterns::{classify, starts_with_header_keyword, ClassifiedLine, LineShape};
use crate::types::*;

// --- Parser state ---

struct ParserState<'o> {
    options: &'o ValidateOptions,
    model: CmlModel,
    issues: Vec<Issue>,
    brace_balance: i64,
    paren_balance: i64,
    seen_type: bool,
    /// `@(...)` lines waiting for the next construct.
    pending: Vec<String>,
    /// Brace balance at the start of the current line.
    line_start_balance: i64,
    /// Open type body and the brace balance outside it.
    scope: Option<(String, i64)>,
}

/// Run the forward pass over CML content.
pub fn parse_string(content: &str, file: &str, options: &ValidateOptions) -> ParsedFile {
    let raw = split_lines(content);
    let lines = strip_comments(&raw);
    parse_lines(&lines, file, options)
}

/// Run the forward pass over comment-stripped lines.
pub fn parse_lines(lines: &[SourceLine], file: &str, options: &ValidateOptions) -> ParsedFile {
    let mut state = ParserState {
        options,
        model: CmlModel::default(),
        issues: Vec::new(),
        brace_balance: 0,
        paren_balance: 0,
        seen_type: false,
        pending: Vec::new(),
        line_start_balance: 0,
        scope: None,
    };

    for line in lines {
        process_line(line, &mut state);
    }

    tracing::debug!(
        file,
        lines = lines.len(),
        types = state.model.types.len(),
        relations = state.model.relations.len(),
        fields = state.model.fields.len(),
        issues = state.issues.len(),
        "parsed CML file"
    );

    ParsedFile {
        model: state.model,
        issues: state.issues,
        brace_balance: state.brace_balance,
        paren_balance: state.paren_balance,
    }
}

fn process_line(line: &SourceLine, state: &mut ParserState<'_>) {
    state.line_start_balance = state.brace_balance;
    track_balance(line, state);

    if matches!(&state.scope, Some((_, outer)) if state.brace_balance <= *outer) {
        state.scope = None;
    }

    let classified = classify(&line.text);

    if state.seen_type
        && (classified.shape.is_header_decl() || starts_with_header_keyword(&line.text))
    {
        state.issues.push(Issue::warning(
            Some(line.number),
            "Header declarations should appear before the first type.",
        ));
    }

    let ClassifiedLine { shape, annotations } = classified;
    match shape {
        LineShape::Blank => {}
        LineShape::Define { name, values } => handle_define(name, values, line.number, state),
        LineShape::Type {
            name,
            base,
            is_abstract,
        } => handle_type(name, base, is_abstract, line.number, state),
        LineShape::Relation {
            name,
            target,
            cardinality,
            order,
        } => handle_relation(
            RelationDecl {
                name,
                target,
                owner: current_owner(state),
                cardinality,
                order,
                line: line.number,
            },
            state,
        ),
        LineShape::Annotation => state.pending.push(line.text.trim().to_string()),
        LineShape::Extern {
            type_token,
            name,
            has_default,
        } => handle_extern(
            ExternDecl {
                name,
                type_token,
                has_default,
                line: line.number,
            },
            &annotations,
            state,
        ),
        LineShape::Constraint { keyword } => {
            let set = take_annotations(state, &annotations);
            if state.options.annotations {
                let ctx = context_label(ConstructKind::Constraint, None);
                check_annotations(ConstructKind::Constraint, &set, line.number, &ctx, &mut state.issues);
            }
            state.model.constraints.push(ConstraintLine {
                keyword,
                line: line.number,
            });
        }
        LineShape::Field {
            field_type,
            name,
            rhs,
        } => handle_field(field_type, name, rhs, line.number, &annotations, state),
        LineShape::Other => handle_other(line.number, state),
    }
}

/// Count braces and parens before classification. A dip below zero is
/// reported at this line and the counter restarts from zero.
fn track_balance(line: &SourceLine, state: &mut ParserState<'_>) {
    let mut brace_delta = 0i64;
    let mut paren_delta = 0i64;
    for c in line.text.chars() {
        match c {
            '{' => brace_delta += 1,
            '}' => brace_delta -= 1,
            '(' => paren_delta += 1,
            ')' => paren_delta -= 1,
            _ => {}
        }
    }

    state.brace_balance += brace_delta;
    state.paren_balance += paren_delta;

    if state.brace_balance < 0 {
        state
            .issues
            .push(Issue::error(Some(line.number), "Unbalanced '}' brace."));
        state.brace_balance = 0;
    }
    if state.paren_balance < 0 {
        state
            .issues
            .push(Issue::warning(Some(line.number), "Unbalanced ')' parenthesis."));
        state.paren_balance = 0;
    }
}

fn current_owner(state: &ParserState<'_>) -> Option<String> {
    state.scope.as_ref().map(|(name, _)| name.clone())
}

/// Drain pending annotation lines and append the construct's own inline
/// segments.
fn take_annotations(state: &mut ParserState<'_>, inline: &[&str]) -> AnnotationSet {
    let mut segments = std::mem::take(&mut state.pending);
    segments.extend(inline.iter().map(|s| s.to_string()));
    AnnotationSet::from_segments(&segments)
}

fn handle_define(name: String, values: Vec<String>, line: usize, state: &mut ParserState<'_>) {
    match state.model.defines.iter_mut().find(|d| d.name == name) {
        Some(existing) => {
            existing.values = values;
            existing.line = line;
        }
        None => state.model.defines.push(DefineDecl { name, values, line }),
    }
}

fn handle_type(
    name: String,
    base: Option<String>,
    is_abstract: bool,
    line: usize,
    state: &mut ParserState<'_>,
) {
    state.seen_type = true;
    state.scope = if is_abstract {
        None
    } else {
        Some((name.clone(), state.line_start_balance))
    };

    let set = take_annotations(state, &[]);
    if state.options.annotations {
        let ctx = context_label(ConstructKind::Type, Some(&name));
        check_annotations(ConstructKind::Type, &set, line, &ctx, &mut state.issues);
    }

    match state.model.types.iter_mut().find(|t| t.name == name) {
        Some(existing) => {
            state.issues.push(Issue::error(
                Some(line),
                format!("Duplicate type definition '{name}'."),
            ));
            existing.base = base;
            existing.is_abstract = is_abstract;
        }
        None => state.model.types.push(TypeDecl {
            name,
            base,
            is_abstract,
            line,
        }),
    }
}

fn handle_relation(relation: RelationDecl, state: &mut ParserState<'_>) {
    let set = take_annotations(state, &[]);
    if state.options.annotations {
        let ctx = context_label(ConstructKind::Port, Some(&relation.name));
        check_annotations(ConstructKind::Port, &set, relation.line, &ctx, &mut state.issues);
    }

    if let Some(Cardinality { min, max: Some(max) }) = relation.cardinality {
        if max < min {
            state.issues.push(Issue::warning(
                Some(relation.line),
                format!("Relation '{}' cardinality has max < min.", relation.name),
            ));
        }
    }

    state.model.relations.push(relation);
}

fn handle_extern(decl: ExternDecl, inline: &[&str], state: &mut ParserState<'_>) {
    let set = take_annotations(state, inline);
    if state.options.annotations {
        let ctx = context_label(ConstructKind::Extern, Some(&decl.name));
        check_annotations(ConstructKind::Extern, &set, decl.line, &ctx, &mut state.issues);

        if !set.contains("contextPath") && !decl.has_default {
            state.issues.push(Issue::warning(
                Some(decl.line),
                format!(
                    "Extern '{}' has no default and no contextPath; it may remain unbound.",
                    decl.name
                ),
            ));
        }
    }

    state.model.externs.push(decl);
}

fn handle_field(
    field_type: FieldType,
    name: String,
    rhs: String,
    line: usize,
    inline: &[&str],
    state: &mut ParserState<'_>,
) {
    let set = take_annotations(state, inline);
    if state.options.annotations {
        let ctx = context_label(ConstructKind::Attribute, Some(&name));
        check_annotations(ConstructKind::Attribute, &set, line, &ctx, &mut state.issues);
    }

    let domain = resolve_domain(field_type, &rhs, &state.model.defines);
    state.model.fields.push(AttributeFieldDecl {
        name,
        field_type,
        owner: current_owner(state),
        rhs,
        default_value: set.get("defaultValue").map(str::to_string),
        domain,
        line,
    });
}

/// A line the pattern bank does not model. Pending annotations cannot
/// attach past it, so they are reported and dropped here.
fn handle_other(line: usize, state: &mut ParserState<'_>) {
    let set = take_annotations(state, &[]);
    if state.options.annotations && !set.is_empty() {
        check_orphaned(&set, line, &mut state.issues);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(content: &str) -> ParsedFile {
        parse_string(content, "test.cml", &ValidateOptions::default())
    }

    fn messages(parsed: &ParsedFile) -> Vec<&str> {
        parsed.issues.iter().map(|i| i.message.as_str()).collect()
    }

    #[test]
    fn builds_model_tables() {
        let parsed = parse(
            r#"define Colors ["Red", "Blue"]
extern int maxQty = 10;

type Product;
type Laptop : Product {
    relation parts : Part[0..4] order(Cpu);
    string color = Colors;
    constraint(color == "Red");
}
type Part;
type Cpu : Part { }
"#,
        );
        assert_eq!(messages(&parsed), Vec::<&str>::new());
        let model = &parsed.model;
        assert_eq!(
            model.types.iter().map(|t| t.name.as_str()).collect::<Vec<_>>(),
            vec!["Product", "Laptop", "Part", "Cpu"]
        );
        assert!(model.find_type("Product").unwrap().is_abstract);
        assert_eq!(model.find_type("Laptop").unwrap().base.as_deref(), Some("Product"));
        assert_eq!(model.defines.len(), 1);
        assert_eq!(model.externs.len(), 1);
        assert!(model.externs[0].has_default);
        assert_eq!(model.relations[0].order, vec!["Cpu".to_string()]);
        assert_eq!(model.constraints.len(), 1);
        assert_eq!(
            model.fields[0].domain,
            Some(Domain::Enumerated {
                values: vec!["Red".into(), "Blue".into()]
            })
        );
        assert_eq!(parsed.brace_balance, 0);
        assert_eq!(parsed.paren_balance, 0);
    }

    #[test]
    fn negative_balance_resets() {
        let parsed = parse("}\n)\ntype A {\n}");
        assert_eq!(
            parsed.issues,
            vec![
                Issue::error(Some(1), "Unbalanced '}' brace."),
                Issue::warning(Some(2), "Unbalanced ')' parenthesis."),
            ]
        );
        assert_eq!(parsed.brace_balance, 0);
    }

    #[test]
    fn comment_braces_are_not_counted() {
        let parsed = parse("type A { // }\n/* } */\n}");
        assert!(parsed.issues.is_empty());
        assert_eq!(parsed.brace_balance, 0);
    }

    #[test]
    fn header_after_type_warns_once() {
        let parsed = parse("type A;\ndefine X [a]\nextern int n;\nproperty p = 1;");
        let header: Vec<_> = parsed
            .issues
            .iter()
            .filter(|i| i.message.starts_with("Header declarations"))
            .map(|i| i.line)
            .collect();
        assert_eq!(header, vec![Some(2), Some(3), Some(4)]);
    }

    #[test]
    fn duplicate_type_last_flags_win() {
        let parsed = parse("type A;\ntype B;\ntype A : B { }\n");
        assert_eq!(
            parsed.issues,
            vec![Issue::error(Some(3), "Duplicate type definition 'A'.")]
        );
        let a = parsed.model.find_type("A").unwrap();
        assert_eq!(parsed.model.types.len(), 2);
        assert_eq!(a.line, 1);
        assert!(!a.is_abstract);
        assert_eq!(a.base.as_deref(), Some("B"));
    }

    #[test]
    fn pending_annotations_attach_to_next_construct() {
        let parsed = parse("@(sequence=1)\n\n@(bogus=2)\ntype Foo { }");
        assert_eq!(
            messages(&parsed),
            vec!["Unsupported annotation 'bogus' on type 'Foo'."]
        );
        assert_eq!(parsed.issues[0].line, Some(4));
    }

    #[test]
    fn annotations_are_consumed_once() {
        let parsed = parse("@(bogus=1)\ntype A;\ntype B;");
        assert_eq!(messages(&parsed).len(), 1);
    }

    #[test]
    fn orphaned_annotations_flush_on_other_line() {
        let parsed = parse("type A {\n@(sequence=1, nope=2)\n}\nstring s = \"x\";");
        assert_eq!(messages(&parsed), vec!["Unsupported annotation 'nope'."]);
        assert_eq!(parsed.issues[0].line, Some(3));
    }

    #[test]
    fn annotation_led_line_stays_pending() {
        let parsed = parse("type A {\n  @(bogus=1) }\ntype B {\n}");
        assert_eq!(
            parsed.issues,
            vec![Issue::warning(
                Some(3),
                "Unsupported annotation 'bogus' on type 'B'."
            )]
        );
    }

    #[test]
    fn annotation_led_relation_feeds_next_type() {
        let parsed = parse("@(sequence=x) relation r: T;\ntype T { }");
        assert_eq!(
            parsed.issues,
            vec![Issue::warning(
                Some(2),
                "Annotation 'sequence' expects an integer on type 'T'."
            )]
        );
        assert!(parsed.model.relations.is_empty());
    }

    #[test]
    fn known_orphaned_keys_are_silent() {
        let parsed = parse("type A {\n@(sequence=1)\n}");
        assert!(parsed.issues.is_empty());
    }

    #[test]
    fn inline_annotations_on_field() {
        let parsed = parse(
            "type A {\n    @(defaultValue=\"Green\", sequence=x) string c = [\"Red\", \"Blue\"];\n}",
        );
        assert_eq!(
            messages(&parsed),
            vec!["Annotation 'sequence' expects an integer on attribute 'c'."]
        );
        assert_eq!(parsed.model.fields[0].default_value.as_deref(), Some("Green"));
    }

    #[test]
    fn keys_come_only_from_annotation_text() {
        // `extras=` sits in the declaration text, not in an annotation.
        let parsed = parse(r#"@(contextPath="Quote.Id") extern string q = extras=1;"#);
        assert_eq!(messages(&parsed), Vec::<&str>::new());
    }

    #[test]
    fn extern_unbound() {
        let parsed = parse("extern string quoteId;\n@(contextPath=\"Quote.Id\")\nextern string bound;");
        assert_eq!(
            messages(&parsed),
            vec!["Extern 'quoteId' has no default and no contextPath; it may remain unbound."]
        );
    }

    #[test]
    fn disabled_annotations_skip_schema_checks() {
        let options = ValidateOptions {
            annotations: false,
            ..Default::default()
        };
        let parsed = parse_string("extern string q;\n@(bogus=1)\ntype A;", "t.cml", &options);
        assert!(parsed.issues.is_empty());
    }

    #[test]
    fn cardinality_max_below_min() {
        let parsed = parse("type A;\nrelation r : A[5..2];");
        assert_eq!(
            messages(&parsed),
            vec!["Relation 'r' cardinality has max < min."]
        );
    }

    #[test]
    fn owner_tracks_enclosing_type() {
        let parsed = parse(concat!(
            "type A {\n",
            "    relation r : B;\n",
            "    string s = \"x\";\n",
            "}\n",
            "type B { }\n",
            "relation loose : A;\n",
        ));
        let owners: Vec<_> = parsed.model.relations.iter().map(|r| r.owner.as_deref()).collect();
        assert_eq!(owners, vec![Some("A"), None]);
        assert_eq!(parsed.model.fields[0].owner.as_deref(), Some("A"));
    }

    #[test]
    fn define_after_field_is_not_its_domain() {
        let parsed = parse("type A {\nstring c = Later;\n}\n");
        assert_eq!(parsed.model.fields[0].domain, None);
    }
}
