use std::collections::BTreeSet;

use crate::domain::check_defaults;
use crate::types::*;

/// Run the post-pass checks over a parsed file.
///
/// Issues from the forward pass come first, in line order. The post-pass
/// appends, in order: end-of-file balance, relation targets, order-list
/// references, base types, then default-value domains.
pub fn validate(parsed: &ParsedFile) -> ValidateResult {
    let mut issues = parsed.issues.clone();
    let model = &parsed.model;

    check_final_balance(parsed, &mut issues);
    check_relation_targets(model, &mut issues);
    check_order_refs(model, &mut issues);
    check_base_types(model, &mut issues);
    check_defaults(model, &mut issues);

    ValidateResult {
        issues,
        leaf_types: leaf_types(model),
    }
}

fn check_final_balance(parsed: &ParsedFile, issues: &mut Vec<Issue>) {
    if parsed.brace_balance != 0 {
        issues.push(Issue::error(None, "Unbalanced '{'/'}' braces in file."));
    }
    if parsed.paren_balance != 0 {
        issues.push(Issue::warning(
            None,
            "Unbalanced '('/')' parentheses in file.",
        ));
    }
}

fn check_relation_targets(model: &CmlModel, issues: &mut Vec<Issue>) {
    for relation in &model.relations {
        if !model.has_type(&relation.target) {
            issues.push(Issue::error(
                Some(relation.line),
                format!(
                    "Relation '{}' references missing type '{}'.",
                    relation.name, relation.target
                ),
            ));
        }
    }
}

fn check_order_refs(model: &CmlModel, issues: &mut Vec<Issue>) {
    for relation in &model.relations {
        for name in &relation.order {
            if !model.has_type(name) {
                issues.push(Issue::warning(
                    Some(relation.line),
                    format!("Order list references missing type '{name}'."),
                ));
            }
        }
    }
}

fn check_base_types(model: &CmlModel, issues: &mut Vec<Issue>) {
    for decl in &model.types {
        let Some(base) = &decl.base else {
            continue;
        };
        if !model.has_type(base) {
            issues.push(Issue::warning(
                None,
                format!("Type '{}' extends missing base '{base}'.", decl.name),
            ));
        }
    }
}

/// Types that are neither abstract nor the base of another type. Built from
/// the final type table so late declarations count.
pub fn leaf_types(model: &CmlModel) -> BTreeSet<String> {
    let bases: BTreeSet<&str> = model
        .types
        .iter()
        .filter_map(|t| t.base.as_deref())
        .collect();

    model
        .types
        .iter()
        .filter(|t| !t.is_abstract && !bases.contains(t.name.as_str()))
        .map(|t| t.name.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_string;
    use pretty_assertions::assert_eq;

    fn run(content: &str) -> ValidateResult {
        validate(&parse_string(content, "test.cml", &ValidateOptions::default()))
    }

    fn set(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn clean_model() {
        let result = run("type Product;\ntype Laptop : Product {\n    relation disk : Disk;\n}\ntype Disk { }\n");
        assert!(result.issues.is_empty());
        assert_eq!(result.leaf_types, set(&["Disk", "Laptop"]));
    }

    #[test]
    fn eof_balance() {
        let result = run("type A {\n    constraint(a > (b);\n");
        assert_eq!(
            result.issues,
            vec![
                Issue::error(None, "Unbalanced '{'/'}' braces in file."),
                Issue::warning(None, "Unbalanced '('/')' parentheses in file."),
            ]
        );
    }

    #[test]
    fn missing_relation_target_is_error() {
        let result = run("type A {\n    relation r : Missing;\n}");
        assert_eq!(
            result.issues,
            vec![Issue::error(
                Some(2),
                "Relation 'r' references missing type 'Missing'."
            )]
        );
    }

    #[test]
    fn order_refs_and_bases() {
        let result = run("type A : Ghost {\n    relation r : A order(A, Nope);\n}");
        assert_eq!(
            result.issues,
            vec![
                Issue::warning(Some(2), "Order list references missing type 'Nope'."),
                Issue::warning(None, "Type 'A' extends missing base 'Ghost'."),
            ]
        );
    }

    #[test]
    fn base_flag_beats_concrete_body() {
        // A has a body but is still excluded because B extends it.
        let result = run("type A { }\ntype B : A { }\ntype C;");
        assert_eq!(result.leaf_types, set(&["B"]));
    }

    #[test]
    fn later_subtype_removes_leaf() {
        let result = run("type B : A { }\ntype A { }");
        assert_eq!(result.leaf_types, set(&["B"]));
    }

    #[test]
    fn domain_checks_follow_structure() {
        let result = run(concat!(
            "type A {\n",
            "    @(defaultValue=\"X\")\n",
            "    string c = [\"A\", \"B\"];\n",
            "    relation r : Missing;\n",
            "}\n",
        ));
        assert_eq!(
            result.issues,
            vec![
                Issue::error(Some(4), "Relation 'r' references missing type 'Missing'."),
                Issue::warning(Some(3), "Default 'X' not in enum for 'c'."),
            ]
        );
    }
}
