//! CML validator WASM bindings.
//!
//! JavaScript-callable wrappers over the JSON API. Inputs and outputs are
//! strings; results have the shape `{ success, data?, error? }`.

use cml_core::{parse_to_json, validate_to_json};
use wasm_bindgen::prelude::*;

/// Parse CML content and return the model summary as JSON.
///
/// @param content - CML source text
/// @param filename - Source filename used in the summary
#[wasm_bindgen(js_name = "parse")]
pub fn wasm_parse(content: &str, filename: &str) -> String {
    parse_to_json(content, filename)
}

/// Validate CML content and return the file report as JSON.
///
/// @param content - CML source text
/// @param options_json - `{ filename?, expressionSetName?, annotations?, associations? }`
#[wasm_bindgen(js_name = "validate")]
pub fn wasm_validate(content: &str, options_json: &str) -> String {
    validate_to_json(content, options_json)
}
