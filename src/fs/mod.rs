use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use ignore::WalkBuilder;
use ignore::overrides::OverrideBuilder;
use tracing::debug;

use crate::config::ResolvedConfig;

/// Discover Ruby files from the given paths, respecting .gitignore
/// and AllCops.Exclude patterns.
pub fn discover_files(paths: &[PathBuf], config: &ResolvedConfig) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for path in paths {
        if path.is_file() {
            // Direct file paths bypass extension filtering
            files.push(path.clone());
        } else if path.is_dir() {
            let dir_files = walk_directory(path, config)?;
            debug!(dir = %path.display(), files = dir_files.len(), "walked directory");
            files.extend(dir_files);
        } else {
            anyhow::bail!("path does not exist: {}", path.display());
        }
    }

    files.sort();
    files.dedup();
    Ok(files)
}

fn walk_directory(dir: &Path, config: &ResolvedConfig) -> Result<Vec<PathBuf>> {
    let mut builder = WalkBuilder::new(dir);
    builder.hidden(true).git_ignore(true).git_global(true);

    // Apply AllCops.Exclude patterns as overrides
    let global_excludes = config.global_excludes();
    if !global_excludes.is_empty() {
        let mut overrides = OverrideBuilder::new(dir);
        for pattern in global_excludes {
            // ignore crate overrides: prefix with ! to exclude
            overrides
                .add(&format!("!{pattern}"))
                .with_context(|| format!("invalid exclude pattern: {pattern}"))?;
        }
        let overrides = overrides.build().context("failed to build overrides")?;
        builder.overrides(overrides);
    }

    let mut files = Vec::new();
    for entry in builder.build() {
        let entry = entry.context("error walking directory")?;
        let path = entry.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "rb") {
            files.push(path.to_path_buf());
        }
    }

    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn discovers_rb_files_in_directory() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.rb"), "").unwrap();
        fs::write(dir.path().join("b.rb"), "").unwrap();
        fs::write(dir.path().join("c.txt"), "").unwrap();

        let files = discover_files(&[dir.path().to_path_buf()], &ResolvedConfig::default()).unwrap();

        assert_eq!(files.len(), 2);
        assert!(files.iter().all(|f| f.extension().unwrap() == "rb"));
    }

    #[test]
    fn direct_file_bypasses_extension_filter() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("schema");
        fs::write(&script, "field :a").unwrap();

        let files = discover_files(&[script.clone()], &ResolvedConfig::default()).unwrap();

        assert_eq!(files, vec![script]);
    }

    #[test]
    fn nonexistent_path_errors() {
        let result = discover_files(&[PathBuf::from("/no/such/path")], &ResolvedConfig::default());
        assert!(result.is_err());
    }

    #[test]
    fn results_are_sorted_and_deduped() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("z.rb"), "").unwrap();
        fs::write(dir.path().join("a.rb"), "").unwrap();
        fs::write(dir.path().join("m.rb"), "").unwrap();

        let root = dir.path().to_path_buf();
        let files = discover_files(&[root.clone(), root], &ResolvedConfig::default()).unwrap();

        let names: Vec<_> = files
            .iter()
            .map(|f| f.file_name().unwrap().to_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["a.rb", "m.rb", "z.rb"]);
    }

    #[test]
    fn global_excludes_skip_matching_files() {
        let dir = tempfile::tempdir().unwrap();
        let vendor = dir.path().join("vendor");
        fs::create_dir_all(&vendor).unwrap();
        fs::write(dir.path().join("schema.rb"), "").unwrap();
        fs::write(vendor.join("gem.rb"), "").unwrap();

        let config = ResolvedConfig::from_yaml("AllCops:\n  Exclude:\n    - 'vendor/**'\n").unwrap();
        let files = discover_files(&[dir.path().to_path_buf()], &config).unwrap();

        assert_eq!(files, vec![dir.path().join("schema.rb")]);
    }

    #[test]
    fn discovers_nested_rb_files() {
        let dir = tempfile::tempdir().unwrap();
        let sub = dir.path().join("app/graphql/types");
        fs::create_dir_all(&sub).unwrap();
        fs::write(dir.path().join("top.rb"), "").unwrap();
        fs::write(sub.join("user_type.rb"), "").unwrap();

        let files = discover_files(&[dir.path().to_path_buf()], &ResolvedConfig::default()).unwrap();

        assert_eq!(files.len(), 2);
    }
}
