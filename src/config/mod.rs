use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};

use anyhow::{Context, Result, bail};
use globset::{Glob, GlobSet, GlobSetBuilder};
use serde_yml::Value;
use tracing::{debug, warn};

use crate::cop::CopConfig;
use crate::diagnostic::Severity;

pub const CONFIG_FILE_NAME: &str = ".rubocop.yml";

/// Resolved configuration from .rubocop.yml.
///
/// Reads a single YAML file and extracts per-cop Enabled/Severity/Include/
/// Exclude plus free-form options, and AllCops.Exclude. `inherit_from` and
/// department-level settings are not resolved.
#[derive(Debug, Default)]
pub struct ResolvedConfig {
    /// File the settings came from, if any.
    path: Option<PathBuf>,
    /// Directory that per-cop Include/Exclude globs are relative to.
    base_dir: Option<PathBuf>,
    /// Per-cop configs keyed by cop name (e.g. "GraphQL/FieldDefinitions")
    cop_configs: HashMap<String, CopConfig>,
    global_excludes: Vec<String>,
}

/// Load config from `path`, or look for `.rubocop.yml` in `search_dir`.
///
/// An explicit path must exist. Without one, a missing file yields the
/// default configuration.
pub fn load_config(path: Option<&Path>, search_dir: &Path) -> Result<ResolvedConfig> {
    let config_path = match path {
        Some(p) => {
            if !p.is_file() {
                bail!("config file {} does not exist", p.display());
            }
            p.to_path_buf()
        }
        None => {
            let candidate = search_dir.join(CONFIG_FILE_NAME);
            if !candidate.is_file() {
                debug!(dir = %search_dir.display(), "no {CONFIG_FILE_NAME} found, using defaults");
                let base_dir = std::env::current_dir().and_then(|d| d.canonicalize()).ok();
                return Ok(ResolvedConfig {
                    base_dir,
                    ..ResolvedConfig::default()
                });
            }
            candidate
        }
    };

    let contents = std::fs::read_to_string(&config_path)
        .with_context(|| format!("failed to read config {}", config_path.display()))?;
    let mut config = ResolvedConfig::from_yaml(&contents)
        .with_context(|| format!("failed to parse {}", config_path.display()))?;
    let config_dir = config_path
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    let base_dir = config_dir
        .canonicalize()
        .with_context(|| format!("failed to resolve {}", config_dir.display()))?;
    debug!(
        path = %config_path.display(),
        base = %base_dir.display(),
        cops = config.cop_configs.len(),
        "loaded config"
    );
    config.path = Some(config_path);
    config.base_dir = Some(base_dir);
    Ok(config)
}

impl ResolvedConfig {
    /// Parse configuration from YAML text.
    pub fn from_yaml(contents: &str) -> Result<Self> {
        let raw: Value = serde_yml::from_str(contents)?;

        let mut cop_configs = HashMap::new();
        let mut global_excludes = Vec::new();

        match &raw {
            Value::Mapping(map) => {
                for (key, value) in map {
                    let Some(key_str) = key.as_str() else {
                        continue;
                    };

                    if key_str == "AllCops" {
                        if let Some(excludes) = extract_string_list(value, "Exclude") {
                            global_excludes = excludes;
                        }
                        continue;
                    }

                    // Cop names contain "/" (e.g. "GraphQL/FieldDefinitions")
                    if key_str.contains('/') {
                        let cop_config = parse_cop_config(key_str, value);
                        cop_configs.insert(key_str.to_string(), cop_config);
                    }
                }
            }
            // An empty file parses as null.
            Value::Null => {}
            _ => bail!("expected a mapping at the top level"),
        }

        Ok(Self {
            path: None,
            base_dir: None,
            cop_configs,
            global_excludes,
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Directory that per-cop Include/Exclude globs are resolved against:
    /// the config file's directory, or the working directory when no file
    /// was found. `None` for configs built from YAML text.
    pub fn base_dir(&self) -> Option<&Path> {
        self.base_dir.as_deref()
    }

    /// Check if a cop is enabled.
    pub fn is_cop_enabled(&self, name: &str) -> bool {
        match self.cop_configs.get(name) {
            Some(config) => config.enabled,
            None => true, // enabled by default
        }
    }

    /// Get the resolved config for a specific cop.
    pub fn cop_config(&self, name: &str) -> CopConfig {
        self.cop_configs.get(name).cloned().unwrap_or_default()
    }

    /// Global exclude patterns from AllCops.Exclude.
    pub fn global_excludes(&self) -> &[String] {
        &self.global_excludes
    }
}

fn parse_cop_config(cop: &str, value: &Value) -> CopConfig {
    let mut config = CopConfig::default();

    if let Value::Mapping(map) = value {
        for (k, v) in map {
            let Some(key) = k.as_str() else {
                continue;
            };
            match key {
                "Enabled" => {
                    if let Some(b) = v.as_bool() {
                        config.enabled = b;
                    }
                }
                "Severity" => {
                    config.severity = v.as_str().and_then(Severity::from_str);
                    if config.severity.is_none() {
                        warn!(cop, value = ?v, "ignoring unknown Severity");
                    }
                }
                "Exclude" => {
                    if let Some(list) = value_to_string_list(v) {
                        config.exclude = list;
                    }
                }
                "Include" => {
                    if let Some(list) = value_to_string_list(v) {
                        config.include = list;
                    }
                }
                _ => {
                    config.options.insert(key.to_string(), v.clone());
                }
            }
        }
    }

    config
}

fn extract_string_list(value: &Value, key: &str) -> Option<Vec<String>> {
    value_to_string_list(value.as_mapping()?.get(&Value::String(key.to_string()))?)
}

fn value_to_string_list(value: &Value) -> Option<Vec<String>> {
    value.as_sequence().map(|seq| {
        seq.iter()
            .filter_map(|v| v.as_str().map(String::from))
            .collect()
    })
}

/// `path` relative to `base` when it lies under it, otherwise `path` as
/// given. Paths that do not exist on disk (such as a `--stdin` display
/// path) are resolved lexically against the working directory.
pub fn relative_to(base: &Path, path: &Path) -> PathBuf {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        match std::env::current_dir().and_then(|d| d.canonicalize()) {
            Ok(cwd) => cwd.join(path),
            Err(_) => return path.to_path_buf(),
        }
    };
    let absolute = absolute
        .canonicalize()
        .unwrap_or_else(|_| normalize(&absolute));
    match absolute.strip_prefix(base) {
        Ok(relative) => relative.to_path_buf(),
        Err(_) => path.to_path_buf(),
    }
}

/// Drop `.` components and fold `..` without touching the filesystem.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other),
        }
    }
    out
}

/// Compiled per-cop Include/Exclude globs.
///
/// An empty Include list accepts every path. Paths are matched as given,
/// with any leading `./` removed; callers resolve them against the config
/// directory first (see [`relative_to`]).
#[derive(Debug, Clone, Default)]
pub struct PathFilter {
    include: Option<GlobSet>,
    exclude: Option<GlobSet>,
}

impl PathFilter {
    pub fn new(include: &[String], exclude: &[String]) -> Result<Self, globset::Error> {
        Ok(Self {
            include: build_globset(include)?,
            exclude: build_globset(exclude)?,
        })
    }

    pub fn is_match(&self, path: &Path) -> bool {
        let path = path.strip_prefix(".").unwrap_or(path);
        if let Some(include) = &self.include {
            if !include.is_match(path) {
                return false;
            }
        }
        !self.exclude.as_ref().is_some_and(|ex| ex.is_match(path))
    }
}

fn build_globset(patterns: &[String]) -> Result<Option<GlobSet>, globset::Error> {
    if patterns.is_empty() {
        return Ok(None);
    }
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    builder.build().map(Some)
}
