use std::collections::{BTreeMap, BTreeSet};
use std::io::Read;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{CmlError, Result};
use crate::types::{CmlModel, Issue};

/// Association rows exported for a constraint model.
pub const ASSOCIATION_FILE: &str = "ExpressionSetConstraintObj.csv";
/// Expression set export used to infer the model name.
pub const EXPRESSION_SET_FILE: &str = "ExpressionSet.csv";

const MODEL_NAME_COLUMN: &str = "ExpressionSet.Name";
const MODEL_NAME_FALLBACK_COLUMN: &str = "ExpressionSet.ApiName";
const TAG_COLUMN: &str = "ConstraintModelTag";
const TAG_KIND_COLUMN: &str = "ConstraintModelTagType";
const EXPRESSION_SET_NAME_COLUMN: &str = "Name";

/// Tags bound to one model.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssociationEntry {
    #[serde(rename = "type", default)]
    pub types: BTreeSet<String>,
    #[serde(rename = "port", default)]
    pub ports: BTreeSet<String>,
}

/// Model name to bound tags. Built once per batch and read-only afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssociationIndex {
    models: BTreeMap<String, AssociationEntry>,
}

impl AssociationIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one association row. Rows missing a model name, tag, or tag kind
    /// are skipped, as are tag kinds other than `type` and `port`.
    pub fn insert_row(&mut self, model: &str, tag: &str, kind: &str) {
        let (model, tag, kind) = (model.trim(), tag.trim(), kind.trim().to_ascii_lowercase());
        if model.is_empty() || tag.is_empty() || kind.is_empty() {
            return;
        }
        let is_type = match kind.as_str() {
            "type" => true,
            "port" => false,
            _ => return,
        };
        let entry = self.models.entry(model.to_string()).or_default();
        if is_type {
            entry.types.insert(tag.to_string());
        } else {
            entry.ports.insert(tag.to_string());
        }
    }

    /// Read association rows from CSV.
    pub fn read_csv<R: Read>(reader: R, path: &Path) -> Result<Self> {
        let csv_err = |source| CmlError::Csv {
            path: path.to_path_buf(),
            source,
        };

        let mut rdr = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
        let headers = rdr.headers().map_err(csv_err)?.clone();
        let column = |name: &str| headers.iter().position(|h| h.trim() == name);

        let name_col = column(MODEL_NAME_COLUMN);
        let fallback_col = column(MODEL_NAME_FALLBACK_COLUMN);
        let tag_col = column(TAG_COLUMN);
        let kind_col = column(TAG_KIND_COLUMN);

        let mut index = Self::new();
        for record in rdr.records() {
            let record = record.map_err(csv_err)?;
            let cell = |col: Option<usize>| col.and_then(|i| record.get(i)).unwrap_or("").trim();

            let mut model = cell(name_col);
            if model.is_empty() {
                model = cell(fallback_col);
            }
            index.insert_row(model, cell(tag_col), cell(kind_col));
        }

        Ok(index)
    }

    /// Load the association table of one data directory. A directory without
    /// the table contributes nothing.
    pub fn load_dir(dir: &Path) -> Result<Self> {
        let path = dir.join(ASSOCIATION_FILE);
        if !path.is_file() {
            tracing::warn!(dir = %dir.display(), "no {ASSOCIATION_FILE} in data directory");
            return Ok(Self::new());
        }

        let file = std::fs::File::open(&path).map_err(|source| CmlError::Io {
            path: path.clone(),
            source,
        })?;
        let index = Self::read_csv(file, &path)?;
        tracing::info!(path = %path.display(), models = index.len(), "loaded associations");
        Ok(index)
    }

    /// Union another index into this one.
    pub fn merge(&mut self, other: AssociationIndex) {
        for (model, entry) in other.models {
            let target = self.models.entry(model).or_default();
            target.types.extend(entry.types);
            target.ports.extend(entry.ports);
        }
    }

    pub fn get(&self, model: &str) -> Option<&AssociationEntry> {
        self.models.get(model)
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

impl FromIterator<(String, AssociationEntry)> for AssociationIndex {
    fn from_iter<I: IntoIterator<Item = (String, AssociationEntry)>>(iter: I) -> Self {
        let mut index = Self::new();
        for (model, entry) in iter {
            let target = index.models.entry(model).or_default();
            target.types.extend(entry.types);
            target.ports.extend(entry.ports);
        }
        index
    }
}

/// Association data for a batch: the merged index and the model name found
/// in the data directories, if any.
#[derive(Debug, Clone, Default)]
pub struct AssociationData {
    pub index: AssociationIndex,
    pub expression_set_name: Option<String>,
}

impl AssociationData {
    /// Load and merge every data directory.
    pub fn load<P: AsRef<Path>>(dirs: &[P]) -> Result<Self> {
        let mut data = Self::default();
        for dir in dirs {
            let dir = dir.as_ref();
            data.index.merge(AssociationIndex::load_dir(dir)?);
            if data.expression_set_name.is_none() {
                data.expression_set_name = read_expression_set_name(dir)?;
            }
        }
        Ok(data)
    }
}

/// First non-empty `Name` cell of the expression set export in `dir`.
pub fn read_expression_set_name(dir: &Path) -> Result<Option<String>> {
    let path: PathBuf = dir.join(EXPRESSION_SET_FILE);
    if !path.is_file() {
        return Ok(None);
    }

    let csv_err = |source| CmlError::Csv {
        path: path.clone(),
        source,
    };
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(&path)
        .map_err(csv_err)?;
    let Some(col) = rdr
        .headers()
        .map_err(csv_err)?
        .iter()
        .position(|h| h.trim() == EXPRESSION_SET_NAME_COLUMN)
    else {
        return Ok(None);
    };

    for record in rdr.records() {
        let record = record.map_err(csv_err)?;
        if let Some(name) = record.get(col).map(str::trim).filter(|n| !n.is_empty()) {
            return Ok(Some(name.to_string()));
        }
    }

    Ok(None)
}

/// Model name used for association lookups: explicit override, then the
/// name found in the data directories, then the file stem.
pub fn resolve_expression_set_name(
    explicit: Option<&str>,
    data: Option<&AssociationData>,
    file: &str,
) -> String {
    explicit
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(str::to_string)
        .or_else(|| data.and_then(|d| d.expression_set_name.clone()))
        .unwrap_or_else(|| {
            Path::new(file)
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| file.to_string())
        })
}

/// Compare a parsed model against its association entry.
pub fn cross_reference(
    model_name: &str,
    model: &CmlModel,
    leaf_types: &BTreeSet<String>,
    index: &AssociationIndex,
) -> Vec<Issue> {
    let empty = AssociationEntry::default();
    let entry = index.get(model_name).unwrap_or(&empty);
    let relations = model.relation_names();
    let mut issues = Vec::new();

    for name in &relations {
        if !entry.ports.contains(*name) {
            issues.push(Issue::warning(
                None,
                format!("Missing port association for relation '{name}' in '{model_name}'"),
            ));
        }
    }
    for name in leaf_types {
        if !entry.types.contains(name) {
            issues.push(Issue::warning(
                None,
                format!("Missing type association for leaf type '{name}' in '{model_name}'"),
            ));
        }
    }
    for tag in &entry.types {
        if !model.has_type(tag) {
            issues.push(Issue::warning(
                None,
                format!("Type association '{tag}' not found in CML types for '{model_name}'"),
            ));
        }
    }
    for tag in &entry.ports {
        if !relations.contains(tag.as_str()) {
            issues.push(Issue::warning(
                None,
                format!("Port association '{tag}' not found in CML relations for '{model_name}'"),
            ));
        }
    }

    issues
}
