//! C ABI bindings for the CML validator.
//!
//! Inputs are null-terminated UTF-8 strings. Every returned string is
//! heap-allocated JSON and must be released with `cml_free_string`.

use std::ffi::{CStr, CString};
use std::os::raw::c_char;

use cml_core::{parse_to_json, validate_to_json};

/// Parse CML content and return the model summary as JSON.
///
/// # Safety
/// - `content` and `filename` must be null or valid null-terminated strings.
/// - The returned pointer must be freed with `cml_free_string`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn cml_parse(content: *const c_char, filename: *const c_char) -> *mut c_char {
    let content = match unsafe { read_arg(content, "content") } {
        Ok(s) => s,
        Err(json) => return to_c_string(&json),
    };
    let filename = match unsafe { read_arg(filename, "filename") } {
        Ok(s) => s,
        Err(json) => return to_c_string(&json),
    };

    to_c_string(&parse_to_json(content, filename))
}

/// Validate CML content and return the file report as JSON.
///
/// `options_json` accepts `filename`, `expressionSetName`, `annotations` and
/// an `associations` map; null or an empty string selects the defaults.
///
/// # Safety
/// - `content` must be a valid null-terminated string.
/// - `options_json` must be null or a valid null-terminated string.
/// - The returned pointer must be freed with `cml_free_string`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn cml_validate(
    content: *const c_char,
    options_json: *const c_char,
) -> *mut c_char {
    let content = match unsafe { read_arg(content, "content") } {
        Ok(s) => s,
        Err(json) => return to_c_string(&json),
    };
    let options = if options_json.is_null() {
        ""
    } else {
        match unsafe { read_arg(options_json, "options_json") } {
            Ok(s) => s,
            Err(json) => return to_c_string(&json),
        }
    };

    to_c_string(&validate_to_json(content, options))
}

/// Free a string returned by `cml_parse` or `cml_validate`.
///
/// # Safety
/// - `ptr` must be null or a pointer previously returned by a `cml_*`
///   function, and must not be freed twice.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn cml_free_string(ptr: *mut c_char) {
    if !ptr.is_null() {
        drop(unsafe { CString::from_raw(ptr) });
    }
}

/// Borrow a C string argument, or build the failure JSON for it.
unsafe fn read_arg<'a>(ptr: *const c_char, name: &str) -> Result<&'a str, String> {
    if ptr.is_null() {
        return Err(format!(r#"{{"success":false,"error":"Null pointer for {name}"}}"#));
    }
    unsafe { CStr::from_ptr(ptr) }
        .to_str()
        .map_err(|_| format!(r#"{{"success":false,"error":"Invalid UTF-8 in {name}"}}"#))
}

fn to_c_string(s: &str) -> *mut c_char {
    // JSON output never contains interior NULs; fall back to an empty string.
    CString::new(s).unwrap_or_default().into_raw()
}
