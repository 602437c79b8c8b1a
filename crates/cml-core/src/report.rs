use serde::Serialize;

use crate::types::{FileReport, Issue, ProcessingFailure};

/// Outcome of validating a batch of files.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchReport {
    pub reports: Vec<FileReport>,
    pub failures: Vec<ProcessingFailure>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub errors: usize,
    pub warnings: usize,
    pub files: usize,
    pub failures: usize,
}

impl BatchReport {
    /// True if any file has an error-severity issue, structural or
    /// association.
    pub fn has_errors(&self) -> bool {
        self.reports.iter().any(FileReport::has_errors)
    }

    /// No errors and no processing failures.
    pub fn is_success(&self) -> bool {
        !self.has_errors() && self.failures.is_empty()
    }

    /// True when there is nothing to show: no issues in any group and no
    /// failures.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty() && self.reports.iter().all(|r| r.all_issues().next().is_none())
    }

    pub fn issues(&self) -> impl Iterator<Item = &Issue> {
        self.reports.iter().flat_map(FileReport::all_issues)
    }

    pub fn summary(&self) -> Summary {
        let (errors, warnings) = self.issues().fold((0, 0), |(e, w), issue| {
            if issue.is_error() {
                (e + 1, w)
            } else {
                (e, w + 1)
            }
        });
        Summary {
            errors,
            warnings,
            files: self.reports.len() + self.failures.len(),
            failures: self.failures.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CmlModel;

    fn file(issues: Vec<Issue>, associations: Option<Vec<Issue>>) -> FileReport {
        FileReport {
            file: "a.cml".into(),
            issues,
            associations,
            model_name: None,
            model: CmlModel::default(),
            leaf_types: Default::default(),
        }
    }

    #[test]
    fn empty_batch_is_clean() {
        let report = BatchReport::default();
        assert!(report.is_clean());
        assert!(report.is_success());
        assert_eq!(report.summary(), Summary::default());
    }

    #[test]
    fn errors_are_ored_across_files() {
        let report = BatchReport {
            reports: vec![
                file(vec![Issue::warning(Some(1), "w")], None),
                file(vec![], Some(vec![Issue::error(None, "e")])),
            ],
            failures: vec![],
        };
        assert!(report.has_errors());
        assert!(!report.is_clean());
        assert_eq!(
            report.summary(),
            Summary {
                errors: 1,
                warnings: 1,
                files: 2,
                failures: 0
            }
        );
    }

    #[test]
    fn failure_blocks_success_but_not_errors() {
        let report = BatchReport {
            reports: vec![file(vec![], Some(vec![]))],
            failures: vec![ProcessingFailure {
                file: "b.cml".into(),
                error: "failed to read b.cml".into(),
            }],
        };
        assert!(!report.has_errors());
        assert!(!report.is_success());
        assert_eq!(report.summary().files, 2);
    }
}
