//! JSON API for the C and wasm bindings.
//!
//! Every function takes strings and returns a JSON string of the shape
//! `{ "success": bool, "data"?: ..., "error"?: "..." }`. Panics never cross
//! the boundary.

use std::collections::BTreeSet;
use std::panic::{catch_unwind, UnwindSafe};

use serde::{Deserialize, Serialize};

use crate::associations::{AssociationData, AssociationIndex};
use crate::batch::validate_source;
use crate::catalogs::{REPORT_VERSION, VALIDATOR_VERSION};
use crate::parser::parse_string;
use crate::types::*;
use crate::validator::validate;

// ---------------------------------------------------------------------------
// Options types (deserialized from JSON input)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateJsonOptions {
    #[serde(default)]
    pub filename: String,
    #[serde(default)]
    pub expression_set_name: Option<String>,
    #[serde(default = "default_true")]
    pub annotations: bool,
    /// `{ model: { "type": [...], "port": [...] } }`. Presence turns the
    /// association check on.
    #[serde(default)]
    pub associations: Option<AssociationIndex>,
}

impl Default for ValidateJsonOptions {
    fn default() -> Self {
        Self {
            filename: String::new(),
            expression_set_name: None,
            annotations: true,
            associations: None,
        }
    }
}

fn default_true() -> bool {
    true
}

// ---------------------------------------------------------------------------
// Result types (serialized to JSON output)
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct FfiResult<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Model summary returned by `parse_to_json` and `cml parse`.
#[derive(Debug, Clone, Serialize)]
pub struct ModelSummary {
    pub file: String,
    #[serde(rename = "validatorVersion")]
    pub validator_version: &'static str,
    #[serde(rename = "reportVersion")]
    pub report_version: &'static str,
    #[serde(flatten)]
    pub model: CmlModel,
    #[serde(rename = "leafTypes")]
    pub leaf_types: BTreeSet<String>,
}

impl ModelSummary {
    pub fn from_source(content: &str, filename: &str) -> Self {
        let parsed = parse_string(content, filename, &ValidateOptions::default());
        let leaf_types = validate(&parsed).leaf_types;
        Self {
            file: filename.to_string(),
            validator_version: VALIDATOR_VERSION,
            report_version: REPORT_VERSION,
            model: parsed.model,
            leaf_types,
        }
    }
}

// ---------------------------------------------------------------------------
// Public FFI functions
// ---------------------------------------------------------------------------

/// Parse CML content and return the model summary as JSON.
pub fn parse_to_json(content: &str, filename: &str) -> String {
    run_guarded(|| ModelSummary::from_source(content, filename))
}

/// Validate CML content and return the file report as JSON.
///
/// `options_json` may be empty, in which case defaults apply.
pub fn validate_to_json(content: &str, options_json: &str) -> String {
    let opts: ValidateJsonOptions = if options_json.trim().is_empty() {
        ValidateJsonOptions::default()
    } else {
        match serde_json::from_str(options_json) {
            Ok(o) => o,
            Err(e) => return failure(format!("Invalid options JSON: {e}")),
        }
    };

    run_guarded(move || {
        let filename = if opts.filename.is_empty() {
            "input.cml"
        } else {
            opts.filename.as_str()
        };
        let options = ValidateOptions {
            annotations: opts.annotations,
            expression_set_name: opts.expression_set_name.clone(),
        };
        let data = opts.associations.clone().map(|index| AssociationData {
            index,
            expression_set_name: None,
        });
        validate_source(content, filename, &options, data.as_ref())
    })
}

fn run_guarded<T, F>(f: F) -> String
where
    T: Serialize,
    F: FnOnce() -> T + UnwindSafe,
{
    match catch_unwind(f) {
        Ok(data) => {
            let result = FfiResult {
                success: true,
                data: Some(data),
                error: None,
            };
            serde_json::to_string(&result)
                .unwrap_or_else(|e| failure(format!("JSON serialization error: {e}")))
        }
        Err(_) => failure("Internal validator panic".to_string()),
    }
}

fn failure(message: String) -> String {
    let result = FfiResult::<()> {
        success: false,
        data: None,
        error: Some(message),
    };
    serde_json::to_string(&result)
        .unwrap_or_else(|_| r#"{"success":false,"error":"serialization failure"}"#.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn options_default_annotations_on() {
        let opts: ValidateJsonOptions = serde_json::from_str(r#"{"filename":"m.cml"}"#).unwrap();
        assert!(opts.annotations);
        assert!(opts.associations.is_none());
    }

    #[test]
    fn options_accept_association_map() {
        let opts: ValidateJsonOptions = serde_json::from_str(
            r#"{"expressionSetName":"M","associations":{"M":{"type":["Bar"]}}}"#,
        )
        .unwrap();
        let index = opts.associations.unwrap();
        let entry = index.get("M").unwrap();
        assert!(entry.types.contains("Bar"));
        assert!(entry.ports.is_empty());
    }

    #[test]
    fn failure_shape() {
        let v: serde_json::Value = serde_json::from_str(&failure("boom".into())).unwrap();
        assert_eq!(v["success"], false);
        assert_eq!(v["error"], "boom");
        assert!(v.get("data").is_none());
    }
}
