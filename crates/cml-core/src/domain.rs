use crate::patterns::{find_range, parse_list_literal};
use crate::types::{AttributeFieldDecl, CmlModel, DefineDecl, Domain, FieldType, Issue};

/// Work out the value domain of a field from its right-hand side. Only the
/// combinations that are later checked produce a domain: string fields take
/// an inline list or a named define, numeric fields take a `[low..high]`
/// range. `defines` must hold only the defines seen so far.
pub fn resolve_domain(field_type: FieldType, rhs: &str, defines: &[DefineDecl]) -> Option<Domain> {
    let rhs = rhs.trim();
    match field_type {
        FieldType::String => {
            let values = parse_list_literal(rhs).or_else(|| {
                defines
                    .iter()
                    .rev()
                    .find(|d| d.name == rhs)
                    .map(|d| d.values.clone())
            })?;
            Some(Domain::Enumerated { values })
        }
        FieldType::Int | FieldType::Decimal(_) => {
            let (low, high) = find_range(rhs)?;
            Some(Domain::Range { low, high })
        }
        FieldType::Boolean => None,
    }
}

/// Check every field's declared default against its domain.
pub fn check_defaults(model: &CmlModel, issues: &mut Vec<Issue>) {
    for field in &model.fields {
        if let Some(issue) = check_default(field) {
            issues.push(issue);
        }
    }
}

fn check_default(field: &AttributeFieldDecl) -> Option<Issue> {
    let default = field.default_value.as_deref()?;
    let domain = field.domain.as_ref()?;
    let name = &field.name;

    match domain {
        Domain::Enumerated { values } => {
            if values.iter().any(|v| v == default) {
                None
            } else {
                Some(Issue::warning(
                    Some(field.line),
                    format!("Default '{default}' not in enum for '{name}'."),
                ))
            }
        }
        Domain::Range { low, high } => match coerce_numeric(default) {
            Some(n) if n < *low || n > *high => Some(Issue::warning(
                Some(field.line),
                format!("Default '{default}' outside range for '{name}'."),
            )),
            Some(_) => None,
            None => Some(Issue::warning(
                Some(field.line),
                format!("Default '{default}' is not numeric for '{name}'."),
            )),
        },
    }
}

/// Parse as a float and truncate toward zero. Fractions are dropped rather
/// than rejected; non-finite values are not numeric.
fn coerce_numeric(raw: &str) -> Option<i64> {
    let value: f64 = raw.trim().parse().ok()?;
    if !value.is_finite() {
        return None;
    }
    Some(value.trunc() as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(field_type: FieldType, default: Option<&str>, domain: Option<Domain>) -> AttributeFieldDecl {
        AttributeFieldDecl {
            name: "f".into(),
            field_type,
            owner: None,
            rhs: String::new(),
            default_value: default.map(str::to_string),
            domain,
            line: 5,
        }
    }

    fn define(name: &str, values: &[&str]) -> DefineDecl {
        DefineDecl {
            name: name.into(),
            values: values.iter().map(|v| v.to_string()).collect(),
            line: 1,
        }
    }

    #[test]
    fn string_list_literal() {
        assert_eq!(
            resolve_domain(FieldType::String, r#"["A", "B"]"#, &[]),
            Some(Domain::Enumerated {
                values: vec!["A".into(), "B".into()]
            })
        );
    }

    #[test]
    fn string_named_define() {
        let defines = vec![define("Colors", &["Red", "Blue"])];
        assert_eq!(
            resolve_domain(FieldType::String, "Colors", &defines),
            Some(Domain::Enumerated {
                values: vec!["Red".into(), "Blue".into()]
            })
        );
        assert_eq!(resolve_domain(FieldType::String, "Sizes", &defines), None);
    }

    #[test]
    fn numeric_range() {
        assert_eq!(
            resolve_domain(FieldType::Decimal(Some(2)), "[0..100]", &[]),
            Some(Domain::Range { low: 0, high: 100 })
        );
        assert_eq!(resolve_domain(FieldType::Int, "[1, 2]", &[]), None);
    }

    #[test]
    fn boolean_has_no_domain() {
        assert_eq!(resolve_domain(FieldType::Boolean, "[true, false]", &[]), None);
    }

    #[test]
    fn enum_membership() {
        let domain = Some(Domain::Enumerated {
            values: vec!["A".into(), "B".into()],
        });
        assert!(check_default(&field(FieldType::String, Some("A"), domain.clone())).is_none());
        let issue = check_default(&field(FieldType::String, Some("X"), domain)).unwrap();
        assert_eq!(issue.message, "Default 'X' not in enum for 'f'.");
        assert_eq!(issue.line, Some(5));
    }

    #[test]
    fn range_is_inclusive_and_truncates() {
        let domain = Some(Domain::Range { low: 1, high: 10 });
        for ok in ["1", "10", "10.9", "1e1"] {
            assert!(check_default(&field(FieldType::Int, Some(ok), domain.clone())).is_none(), "{ok}");
        }
        let issue = check_default(&field(FieldType::Int, Some("11"), domain.clone())).unwrap();
        assert_eq!(issue.message, "Default '11' outside range for 'f'.");
        let issue = check_default(&field(FieldType::Int, Some("0.5"), domain)).unwrap();
        assert_eq!(issue.message, "Default '0.5' outside range for 'f'.");
    }

    #[test]
    fn non_numeric_default() {
        let domain = Some(Domain::Range { low: 0, high: 5 });
        for bad in ["abc", "inf", "NaN", ""] {
            let issue = check_default(&field(FieldType::Int, Some(bad), domain.clone())).unwrap();
            assert_eq!(issue.message, format!("Default '{bad}' is not numeric for 'f'."));
        }
    }

    #[test]
    fn missing_default_or_domain_is_skipped() {
        assert!(check_default(&field(FieldType::String, None, None)).is_none());
        assert!(check_default(&field(FieldType::String, Some("x"), None)).is_none());
    }
}
