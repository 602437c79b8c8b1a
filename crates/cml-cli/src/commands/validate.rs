use std::path::{Path, PathBuf};

use cml_core::{validate_files, AssociationData, BatchReport, Issue, ValidateOptions};

use crate::reader::Project;

pub struct ValidateArgs<'a> {
    pub path: &'a Path,
    pub data_dirs: &'a [PathBuf],
    pub expression_set_name: Option<&'a str>,
    pub no_annotations: bool,
    pub format: &'a str,
}

/// Validate the files under a path. Returns the rendered report and whether
/// the run failed (any error issue or any processing failure).
pub fn run_validate(args: &ValidateArgs<'_>) -> Result<(String, bool), String> {
    let project = Project::discover(args.path)?;

    if project.files.is_empty() {
        return Err(format!("No .cml files found at: {}", args.path.display()));
    }

    // Flags override the project config.
    let data_dirs = if args.data_dirs.is_empty() {
        project.config_data_dirs()
    } else {
        args.data_dirs.to_vec()
    };
    let options = ValidateOptions {
        annotations: !args.no_annotations && project.config.annotations.unwrap_or(true),
        expression_set_name: args
            .expression_set_name
            .map(str::to_string)
            .or_else(|| project.config.expression_set_name.clone()),
    };

    let associations = if data_dirs.is_empty() {
        None
    } else {
        Some(AssociationData::load(&data_dirs).map_err(|e| e.to_string())?)
    };

    let report = validate_files(&project.files, associations.as_ref(), &options);
    let failed = !report.is_success();

    let output = match args.format {
        "json" => render_json(&report, &project)?,
        _ => render_human(&report, &project),
    };

    Ok((output, failed))
}

fn format_issue(issue: &Issue) -> String {
    match issue.line {
        Some(line) => format!("  [{}] L{line}: {}", issue.severity, issue.message),
        None => format!("  [{}] {}", issue.severity, issue.message),
    }
}

fn render_human(report: &BatchReport, project: &Project) -> String {
    let mut groups: Vec<String> = Vec::new();

    for file in &report.reports {
        if file.issues.is_empty() {
            continue;
        }
        let mut lines = vec![format!("{}:", project.display_path(&file.file))];
        lines.extend(file.issues.iter().map(format_issue));
        groups.push(lines.join("\n"));
    }

    for file in &report.reports {
        let Some(issues) = file.associations.as_ref().filter(|a| !a.is_empty()) else {
            continue;
        };
        let mut lines = vec![format!(
            "{} (associations):",
            project.display_path(&file.file)
        )];
        lines.extend(issues.iter().map(format_issue));
        groups.push(lines.join("\n"));
    }

    for failure in &report.failures {
        groups.push(format!(
            "{}: failed: {}",
            project.display_path(&failure.file),
            failure.error
        ));
    }

    if report.is_clean() {
        groups.push("No structural issues found in CML files.".to_string());
    }

    let summary = report.summary();
    let error_word = if summary.errors == 1 { "error" } else { "errors" };
    let warning_word = if summary.warnings == 1 {
        "warning"
    } else {
        "warnings"
    };
    let file_word = if summary.files == 1 { "file" } else { "files" };
    groups.push(format!(
        "{} {error_word}, {} {warning_word} in {} {file_word}.",
        summary.errors, summary.warnings, summary.files
    ));

    groups.join("\n\n")
}

fn render_json(report: &BatchReport, project: &Project) -> Result<String, String> {
    let mut files = serde_json::Map::new();
    let mut associations = serde_json::Map::new();
    let mut failures = serde_json::Map::new();

    for file in &report.reports {
        let path = project.display_path(&file.file);
        files.insert(path.clone(), serde_json::json!(file.issues));
        if let Some(issues) = &file.associations {
            associations.insert(path, serde_json::json!(issues));
        }
    }
    for failure in &report.failures {
        failures.insert(
            project.display_path(&failure.file),
            serde_json::json!(failure.error),
        );
    }

    let output = serde_json::json!({
        "files": files,
        "associations": associations,
        "failures": failures,
        "summary": report.summary(),
    });
    serde_json::to_string_pretty(&output).map_err(|e| format!("JSON serialization error: {e}"))
}
