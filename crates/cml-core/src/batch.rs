use std::path::{Path, PathBuf};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::associations::{cross_reference, resolve_expression_set_name, AssociationData};
use crate::error::{CmlError, Result};
use crate::parser::parse_string;
use crate::report::BatchReport;
use crate::types::*;
use crate::validator::validate;

/// Validate one file's content. When association data is given, the
/// association group is filled in (possibly empty).
pub fn validate_source(
    content: &str,
    file: &str,
    options: &ValidateOptions,
    associations: Option<&AssociationData>,
) -> FileReport {
    let parsed = parse_string(content, file, options);
    let result = validate(&parsed);

    let (model_name, association_issues) = match associations {
        Some(data) => {
            let name = resolve_expression_set_name(
                options.expression_set_name.as_deref(),
                Some(data),
                file,
            );
            let issues = cross_reference(&name, &parsed.model, &result.leaf_types, &data.index);
            (Some(name), Some(issues))
        }
        None => (None, None),
    };

    FileReport {
        file: file.to_string(),
        issues: result.issues,
        associations: association_issues,
        model_name,
        model: parsed.model,
        leaf_types: result.leaf_types,
    }
}

/// Read and validate a file from disk.
pub fn validate_path(
    path: &Path,
    options: &ValidateOptions,
    associations: Option<&AssociationData>,
) -> Result<FileReport> {
    let content = std::fs::read_to_string(path).map_err(|source| CmlError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(validate_source(
        &content,
        &path.display().to_string(),
        options,
        associations,
    ))
}

/// Validate a batch of files. Results keep the input order; a file that
/// cannot be read becomes a processing failure and the rest still run.
pub fn validate_files(
    paths: &[PathBuf],
    associations: Option<&AssociationData>,
    options: &ValidateOptions,
) -> BatchReport {
    tracing::info!(files = paths.len(), "validating CML files");

    let run = |path: &PathBuf| validate_path(path, options, associations);

    #[cfg(feature = "parallel")]
    let outcomes: Vec<Result<FileReport>> = paths.par_iter().map(run).collect();
    #[cfg(not(feature = "parallel"))]
    let outcomes: Vec<Result<FileReport>> = paths.iter().map(run).collect();

    let mut report = BatchReport::default();
    for (path, outcome) in paths.iter().zip(outcomes) {
        match outcome {
            Ok(file_report) => report.reports.push(file_report),
            Err(e) => {
                tracing::warn!(file = %path.display(), error = %e, "failed to process CML file");
                report.failures.push(ProcessingFailure {
                    file: path.display().to_string(),
                    error: e.to_string(),
                });
            }
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::associations::{AssociationEntry, AssociationIndex};

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("cml-batch-{name}-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn source_without_associations() {
        let report = validate_source("type A { }", "a.cml", &ValidateOptions::default(), None);
        assert!(report.issues.is_empty());
        assert!(report.associations.is_none());
        assert!(report.model_name.is_none());
        assert!(!report.has_errors());
    }

    #[test]
    fn source_with_associations_uses_file_stem() {
        let data = AssociationData {
            index: [(
                "Laptop".to_string(),
                AssociationEntry {
                    types: ["A".to_string()].into(),
                    ports: Default::default(),
                },
            )]
            .into_iter()
            .collect::<AssociationIndex>(),
            expression_set_name: None,
        };
        let report = validate_source("type A { }", "models/Laptop.cml", &ValidateOptions::default(), Some(&data));
        assert_eq!(report.model_name.as_deref(), Some("Laptop"));
        assert_eq!(report.associations, Some(vec![]));
    }

    #[test]
    fn unreadable_file_does_not_abort_batch() {
        let dir = scratch_dir("unreadable");
        let good = dir.join("good.cml");
        std::fs::write(&good, "type A;\ntype B : A { }\n").unwrap();
        let missing = dir.join("missing.cml");

        let report = validate_files(&[missing.clone(), good.clone()], None, &ValidateOptions::default());
        assert_eq!(report.reports.len(), 1);
        assert_eq!(report.reports[0].file, good.display().to_string());
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].file, missing.display().to_string());
        assert!(report.failures[0].error.starts_with("failed to read"));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn batch_preserves_input_order() {
        let dir = scratch_dir("order");
        let paths: Vec<PathBuf> = (0..8)
            .map(|i| {
                let p = dir.join(format!("m{i}.cml"));
                std::fs::write(&p, format!("type T{i} {{ }}\n")).unwrap();
                p
            })
            .collect();

        let report = validate_files(&paths, None, &ValidateOptions::default());
        let files: Vec<_> = report.reports.iter().map(|r| r.file.clone()).collect();
        let expected: Vec<_> = paths.iter().map(|p| p.display().to_string()).collect();
        assert_eq!(files, expected);

        std::fs::remove_dir_all(&dir).ok();
    }
}
