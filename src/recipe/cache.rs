// src/recipe/cache.rs

//! Recipe parse cache, keyed by path + mtime (§3 "Lifecycle")

use super::format::Recipe;
use super::parser;
use crate::error::Result;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::SystemTime;

#[derive(Clone)]
struct Entry {
    mtime: SystemTime,
    recipe: Recipe,
}

/// Caches parsed recipes by path, invalidated when the file's mtime changes.
/// A user overlay directory is searched before the embedded bundled set.
pub struct RecipeCache {
    overlay_dir: Option<PathBuf>,
    bundled_dir: PathBuf,
    entries: Mutex<HashMap<PathBuf, Entry>>,
}

impl RecipeCache {
    pub fn new(overlay_dir: Option<PathBuf>, bundled_dir: PathBuf) -> Self {
        Self { overlay_dir, bundled_dir, entries: Mutex::new(HashMap::new()) }
    }

    /// Resolve `name` to a recipe path: overlay directory wins over the
    /// embedded bundled set (§3 metadata "user overlay → embedded set").
    fn resolve_path(&self, name: &str) -> Option<PathBuf> {
        if let Some(dir) = &self.overlay_dir {
            let p = dir.join(format!("{name}.toml"));
            if p.is_file() {
                return Some(p);
            }
        }
        let p = self.bundled_dir.join(format!("{name}.toml"));
        p.is_file().then_some(p)
    }

    pub fn load(&self, name: &str) -> Result<Recipe> {
        let path = self
            .resolve_path(name)
            .ok_or_else(|| crate::error::Error::RecipeNotFound { name: name.to_string() })?;
        self.load_path(&path)
    }

    /// Enumerates known recipe names for the `recipes` CLI subcommand
    /// (§6 "enumerate known"). Overlay entries shadow bundled entries of
    /// the same name; the result is sorted and deduplicated.
    pub fn list_names(&self) -> Vec<String> {
        let mut names: std::collections::BTreeSet<String> = std::collections::BTreeSet::new();
        for dir in self.overlay_dir.iter().chain(std::iter::once(&self.bundled_dir)) {
            let Ok(entries) = std::fs::read_dir(dir) else { continue };
            for entry in entries.flatten() {
                let path = entry.path();
                if path.extension().and_then(|e| e.to_str()) == Some("toml")
                    && let Some(stem) = path.file_stem().and_then(|s| s.to_str())
                {
                    names.insert(stem.to_string());
                }
            }
        }
        names.into_iter().collect()
    }

    pub fn load_path(&self, path: &Path) -> Result<Recipe> {
        let mtime = std::fs::metadata(path)?.modified()?;

        {
            let entries = self.entries.lock().unwrap();
            if let Some(entry) = entries.get(path)
                && entry.mtime == mtime
            {
                return Ok(entry.recipe.clone());
            }
        }

        let recipe = parser::parse_file(path)?;
        self.entries
            .lock()
            .unwrap()
            .insert(path.to_path_buf(), Entry { mtime, recipe: recipe.clone() });
        Ok(recipe)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const RECIPE: &str = r#"
[metadata]
name = "x"

[version]
source = "github:a/b"

[verify]
command = "x --version"
"#;

    #[test]
    fn caches_until_mtime_changes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("x.toml");
        std::fs::write(&path, RECIPE).unwrap();

        let cache = RecipeCache::new(None, dir.path().to_path_buf());
        let first = cache.load("x").unwrap();
        assert_eq!(first.metadata.name, "x");

        // rewrite with different content but force a fresh mtime
        std::thread::sleep(std::time::Duration::from_millis(10));
        let mut f = std::fs::OpenOptions::new().write(true).truncate(true).open(&path).unwrap();
        write!(f, "{}", RECIPE.replace("\"x\"", "\"y\"")).unwrap();
        drop(f);

        let second = cache.load("x").unwrap();
        assert_eq!(second.metadata.name, "y");
    }

    #[test]
    fn overlay_wins_over_bundled() {
        let bundled = tempfile::tempdir().unwrap();
        let overlay = tempfile::tempdir().unwrap();
        std::fs::write(bundled.path().join("x.toml"), RECIPE).unwrap();
        std::fs::write(overlay.path().join("x.toml"), RECIPE.replace("\"x\"", "\"overlay\"")).unwrap();

        let cache = RecipeCache::new(Some(overlay.path().to_path_buf()), bundled.path().to_path_buf());
        let recipe = cache.load("x").unwrap();
        assert_eq!(recipe.metadata.name, "overlay");
    }

    #[test]
    fn list_names_merges_overlay_and_bundled_without_duplicates() {
        let bundled = tempfile::tempdir().unwrap();
        let overlay = tempfile::tempdir().unwrap();
        std::fs::write(bundled.path().join("x.toml"), RECIPE).unwrap();
        std::fs::write(bundled.path().join("y.toml"), RECIPE).unwrap();
        std::fs::write(overlay.path().join("x.toml"), RECIPE).unwrap();

        let cache = RecipeCache::new(Some(overlay.path().to_path_buf()), bundled.path().to_path_buf());
        assert_eq!(cache.list_names(), vec!["x".to_string(), "y".to_string()]);
    }

    #[test]
    fn missing_recipe_errors() {
        let dir = tempfile::tempdir().unwrap();
        let cache = RecipeCache::new(None, dir.path().to_path_buf());
        assert!(cache.load("missing").is_err());
    }
}
