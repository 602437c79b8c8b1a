use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

pub const CONFIG_FILE: &str = "cml.config.yaml";

/// A CML file with its path and content.
pub struct CmlFile {
    pub path: PathBuf,
    pub content: String,
}

/// Project configuration from cml.config.yaml.
#[derive(Debug, Default, Deserialize)]
pub struct CmlConfig {
    pub sources: Option<Vec<String>>,
    pub data_dirs: Option<Vec<PathBuf>>,
    pub expression_set_name: Option<String>,
    pub annotations: Option<bool>,
}

/// Input files and the project settings that came with them.
pub struct Project {
    /// Directory paths are reported relative to.
    pub base_dir: PathBuf,
    pub files: Vec<PathBuf>,
    pub config: CmlConfig,
}

impl Project {
    /// Resolve an input path (file or directory) into a list of CML files.
    pub fn discover(input_path: &Path) -> Result<Self, String> {
        if !input_path.exists() {
            return Err(format!("Path does not exist: {}", input_path.display()));
        }

        if input_path.is_file() {
            let base_dir = input_path
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_default();
            return Ok(Project {
                base_dir,
                files: vec![input_path.to_path_buf()],
                config: CmlConfig::default(),
            });
        }

        if input_path.is_dir() {
            let config = read_project_config(input_path)?.unwrap_or_default();
            let files = match config.sources {
                Some(ref patterns) if !patterns.is_empty() => {
                    expand_patterns(input_path, patterns)?
                }
                _ => expand_patterns(input_path, &["*.cml".to_string()])?,
            };
            return Ok(Project {
                base_dir: input_path.to_path_buf(),
                files,
                config,
            });
        }

        Err(format!(
            "Path is neither a file nor a directory: {}",
            input_path.display()
        ))
    }

    /// Data directories from the config, resolved against the project dir.
    pub fn config_data_dirs(&self) -> Vec<PathBuf> {
        self.config
            .data_dirs
            .iter()
            .flatten()
            .map(|d| self.base_dir.join(d))
            .collect()
    }

    /// Display a file path relative to the project directory.
    pub fn display_path(&self, file: &str) -> String {
        let path = Path::new(file);
        path.strip_prefix(&self.base_dir)
            .unwrap_or(path)
            .to_string_lossy()
            .replace('\\', "/")
    }

    /// Read every discovered file. Any read failure aborts.
    pub fn read_files(&self) -> Result<Vec<CmlFile>, String> {
        self.files
            .iter()
            .map(|path| {
                let content = fs::read_to_string(path)
                    .map_err(|e| format!("Failed to read {}: {e}", path.display()))?;
                Ok(CmlFile {
                    path: path.clone(),
                    content,
                })
            })
            .collect()
    }
}

/// Read cml.config.yaml from a directory, if present.
pub fn read_project_config(dir_path: &Path) -> Result<Option<CmlConfig>, String> {
    let config_path = dir_path.join(CONFIG_FILE);
    if !config_path.exists() {
        return Ok(None);
    }

    let content = fs::read_to_string(&config_path)
        .map_err(|e| format!("Failed to read config: {e}"))?;
    let config = serde_yaml::from_str(&content).map_err(|e| format!("Invalid YAML config: {e}"))?;
    Ok(Some(config))
}

fn expand_patterns(base_dir: &Path, patterns: &[String]) -> Result<Vec<PathBuf>, String> {
    let mut files = Vec::new();
    let mut seen: HashSet<PathBuf> = HashSet::new();

    for pattern in patterns {
        let full_pattern = base_dir.join(pattern);
        let pattern_str = full_pattern.to_string_lossy().replace('\\', "/");
        let entries = glob::glob(&pattern_str)
            .map_err(|e| format!("Invalid glob pattern '{pattern}': {e}"))?;

        let mut matched = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| format!("Glob error: {e}"))?;
            if path.is_file() && seen.insert(path.clone()) {
                matched.push(path);
            }
        }
        matched.sort();
        files.extend(matched);
    }

    Ok(files)
}
