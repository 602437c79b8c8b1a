use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

// ---------------------------------------------------------------------------
// Source lines
// ---------------------------------------------------------------------------

/// One line of CML source after comment stripping. Line numbers are 1-based
/// and always refer to the unstripped file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLine {
    pub number: usize,
    pub text: String,
}

// ---------------------------------------------------------------------------
// Issues
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => f.write_str("error"),
            Severity::Warning => f.write_str("warning"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    pub severity: Severity,
    pub line: Option<usize>,
    pub message: String,
}

impl Issue {
    pub fn error(line: Option<usize>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            line,
            message: message.into(),
        }
    }

    pub fn warning(line: Option<usize>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            line,
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

// ---------------------------------------------------------------------------
// Model tables
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeDecl {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base: Option<String>,
    #[serde(rename = "abstract")]
    pub is_abstract: bool,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DefineDecl {
    pub name: String,
    pub values: Vec<String>,
    pub line: usize,
}

/// `[min..max]` or `[min]` on a relation line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cardinality {
    pub min: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationDecl {
    pub name: String,
    pub target: String,
    /// Type whose body encloses the relation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cardinality: Option<Cardinality>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub order: Vec<String>,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExternDecl {
    pub name: String,
    #[serde(rename = "type")]
    pub type_token: String,
    #[serde(rename = "hasDefault")]
    pub has_default: bool,
    pub line: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConstraintKeyword {
    Constraint,
    Message,
    Preference,
    Require,
    Exclude,
    Rule,
    Setdefault,
}

impl ConstraintKeyword {
    pub fn from_keyword(word: &str) -> Option<Self> {
        match word {
            "constraint" => Some(Self::Constraint),
            "message" => Some(Self::Message),
            "preference" => Some(Self::Preference),
            "require" => Some(Self::Require),
            "exclude" => Some(Self::Exclude),
            "rule" => Some(Self::Rule),
            "setdefault" => Some(Self::Setdefault),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstraintLine {
    pub keyword: ConstraintKeyword,
    pub line: usize,
}

/// Declared type of an attribute field, serialized as its source spelling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum FieldType {
    String,
    Int,
    Boolean,
    Decimal(Option<u32>),
}

impl FieldType {
    /// Parse `string`, `int`, `boolean`, `decimal` or `decimal(N)`.
    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "string" => Some(FieldType::String),
            "int" => Some(FieldType::Int),
            "boolean" => Some(FieldType::Boolean),
            "decimal" => Some(FieldType::Decimal(None)),
            _ => {
                let scale = token.strip_prefix("decimal(")?.strip_suffix(')')?;
                scale.parse().ok().map(|n| FieldType::Decimal(Some(n)))
            }
        }
    }
}

impl TryFrom<String> for FieldType {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        FieldType::parse(&value).ok_or_else(|| format!("unknown field type \"{value}\""))
    }
}

impl From<FieldType> for String {
    fn from(value: FieldType) -> Self {
        value.to_string()
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::String => f.write_str("string"),
            FieldType::Int => f.write_str("int"),
            FieldType::Boolean => f.write_str("boolean"),
            FieldType::Decimal(None) => f.write_str("decimal"),
            FieldType::Decimal(Some(scale)) => write!(f, "decimal({scale})"),
        }
    }
}

/// Value domain a field's default is checked against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "kind")]
pub enum Domain {
    Enumerated { values: Vec<String> },
    Range { low: i64, high: i64 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeFieldDecl {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    pub rhs: String,
    #[serde(rename = "defaultValue", skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<Domain>,
    pub line: usize,
}

/// Everything the forward pass extracts from one file.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CmlModel {
    pub types: Vec<TypeDecl>,
    pub defines: Vec<DefineDecl>,
    pub relations: Vec<RelationDecl>,
    pub externs: Vec<ExternDecl>,
    pub constraints: Vec<ConstraintLine>,
    pub fields: Vec<AttributeFieldDecl>,
}

impl CmlModel {
    pub fn find_type(&self, name: &str) -> Option<&TypeDecl> {
        self.types.iter().find(|t| t.name == name)
    }

    pub fn has_type(&self, name: &str) -> bool {
        self.find_type(name).is_some()
    }

    pub fn relation_names(&self) -> BTreeSet<&str> {
        self.relations.iter().map(|r| r.name.as_str()).collect()
    }
}

/// Intermediate result from the forward pass over a single file.
#[derive(Debug, Clone)]
pub struct ParsedFile {
    pub model: CmlModel,
    /// Line-scan issues in detection order.
    pub issues: Vec<Issue>,
    /// Brace balance left over at end of file.
    pub brace_balance: i64,
    /// Paren balance left over at end of file.
    pub paren_balance: i64,
}

// ---------------------------------------------------------------------------
// Options and results
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct ValidateOptions {
    /// Run the annotation schema checks (whitelists, value shapes, unbound externs).
    pub annotations: bool,
    /// Explicit expression set name used for association lookups.
    pub expression_set_name: Option<String>,
}

impl Default for ValidateOptions {
    fn default() -> Self {
        Self {
            annotations: true,
            expression_set_name: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidateResult {
    pub issues: Vec<Issue>,
    #[serde(rename = "leafTypes")]
    pub leaf_types: BTreeSet<String>,
}

/// Combined outcome for one file: structural issues plus the optional
/// association group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileReport {
    pub file: String,
    pub issues: Vec<Issue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub associations: Option<Vec<Issue>>,
    #[serde(rename = "modelName", skip_serializing_if = "Option::is_none")]
    pub model_name: Option<String>,
    pub model: CmlModel,
    #[serde(rename = "leafTypes")]
    pub leaf_types: BTreeSet<String>,
}

impl FileReport {
    pub fn has_errors(&self) -> bool {
        self.all_issues().any(Issue::is_error)
    }

    /// Structural issues followed by association issues.
    pub fn all_issues(&self) -> impl Iterator<Item = &Issue> {
        self.issues
            .iter()
            .chain(self.associations.iter().flatten())
    }
}

/// A file that could not be validated at all.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessingFailure {
    pub file: String,
    pub error: String,
}
