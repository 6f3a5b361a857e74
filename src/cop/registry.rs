use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::{Cop, CopConfig, CopLoadError};
use crate::config::{PathFilter, ResolvedConfig, relative_to};
use crate::diagnostic::Severity;

struct Entry {
    cop: Box<dyn Cop>,
    severity: Severity,
    filter: PathFilter,
}

/// Configured cops, in registration order.
pub struct CopRegistry {
    entries: Vec<Entry>,
    index: HashMap<&'static str, usize>,
    /// Include/Exclude globs are matched relative to this directory.
    base_dir: Option<PathBuf>,
}

impl Default for CopRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl CopRegistry {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            index: HashMap::new(),
            base_dir: None,
        }
    }

    /// Names of every built-in cop, whether or not it is enabled.
    pub fn builtin_names() -> Vec<&'static str> {
        super::graphql::COP_NAMES.to_vec()
    }

    /// Build every enabled built-in cop. Patterns are compiled and options
    /// validated here, so a bad cop fails the whole load.
    pub fn from_config(config: &ResolvedConfig) -> Result<Self, CopLoadError> {
        let mut registry = Self::new();
        registry.base_dir = config.base_dir().map(Path::to_path_buf);
        super::graphql::register_all(&mut registry, config)?;
        debug!(cops = registry.len(), "registered cops");
        Ok(registry)
    }

    /// Register `cop` with its default severity and no path filter.
    pub fn register(&mut self, cop: Box<dyn Cop>) {
        let severity = cop.default_severity();
        self.insert(cop, severity, PathFilter::default());
    }

    /// Build and register the cop called `name` unless its config disables it.
    pub fn register_configured<F>(
        &mut self,
        config: &ResolvedConfig,
        name: &'static str,
        build: F,
    ) -> Result<(), CopLoadError>
    where
        F: FnOnce(&CopConfig) -> Result<Box<dyn Cop>, CopLoadError>,
    {
        if !config.is_cop_enabled(name) {
            debug!(cop = name, "disabled by configuration");
            return Ok(());
        }
        let cop_config = config.cop_config(name);
        let cop = build(&cop_config)?;
        let filter = PathFilter::new(&cop_config.include, &cop_config.exclude)
            .map_err(|source| CopLoadError::Glob { cop: name, source })?;
        let severity = cop_config
            .severity
            .unwrap_or_else(|| cop.default_severity());
        self.insert(cop, severity, filter);
        Ok(())
    }

    fn insert(&mut self, cop: Box<dyn Cop>, severity: Severity, filter: PathFilter) {
        let name = cop.name();
        let idx = self.entries.len();
        self.entries.push(Entry {
            cop,
            severity,
            filter,
        });
        self.index.insert(name, idx);
    }

    pub fn cops(&self) -> impl Iterator<Item = &dyn Cop> + '_ {
        self.entries.iter().map(|e| &*e.cop)
    }

    /// Cops whose Include/Exclude settings accept `path`. Under a config
    /// loaded from disk, `path` is first made relative to the config
    /// directory.
    pub fn cops_for(&self, path: &Path) -> Vec<&dyn Cop> {
        let relative = match &self.base_dir {
            Some(base) => relative_to(base, path),
            None => path.to_path_buf(),
        };
        self.entries
            .iter()
            .filter(|e| e.filter.is_match(&relative))
            .map(|e| &*e.cop)
            .collect()
    }

    pub fn get(&self, name: &str) -> Option<&dyn Cop> {
        self.index.get(name).map(|&idx| &*self.entries[idx].cop)
    }

    /// Configured severity, falling back to `Convention` for unknown names.
    pub fn severity(&self, name: &str) -> Severity {
        self.index
            .get(name)
            .map_or(Severity::Convention, |&idx| self.entries[idx].severity)
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.entries.iter().map(|e| e.cop.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
