pub mod annotations;
pub mod associations;
pub mod batch;
pub mod catalogs;
pub mod comments;
pub mod domain;
pub mod error;
pub mod ffi;
pub mod parser;
pub mod patterns;
pub mod report;
pub mod types;
pub mod validator;

pub use associations::{
    cross_reference, resolve_expression_set_name, AssociationData, AssociationEntry,
    AssociationIndex,
};
pub use batch::{validate_files, validate_path, validate_source};
pub use catalogs::{REPORT_VERSION, VALIDATOR_VERSION};
pub use comments::strip_comments;
pub use error::CmlError;
pub use ffi::{parse_to_json, validate_to_json, ModelSummary};
pub use parser::parse_string;
pub use report::{BatchReport, Summary};
pub use types::*;
pub use validator::{leaf_types, validate};
