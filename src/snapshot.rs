//! Project snapshot types.
//!
//! A snapshot is the unit of work for one render pass: an insertion-ordered
//! map of path -> content plus an optional single-string fallback used when
//! the generation backend produced no file map. Snapshot order is preserved
//! through assembly, so re-running the pipeline on the same snapshot always
//! yields the same merged program.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;
use walkdir::WalkDir;

use crate::error::PreviewError;

/// One generated file. Identity is the path; content is immutable for the
/// duration of a render pass.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SourceFile {
    pub path: String,
    pub content: String,
}

/// Theme-color overrides forwarded into the sandbox document as CSS custom
/// properties. Every field is optional; unset fields keep the built-in
/// defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ThemeColors {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secondary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub surface: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

/// Top-level input accepted from the host. `all_files` takes precedence over
/// `code` when it is non-empty.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewInput {
    #[serde(default)]
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub all_files: Option<IndexMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theme_colors: Option<ThemeColors>,
}

impl PreviewInput {
    /// Build the snapshot this input describes.
    pub fn snapshot(&self) -> ProjectSnapshot {
        let mut snapshot = match &self.all_files {
            Some(files) if !files.is_empty() => ProjectSnapshot::from_files(files.clone()),
            _ => ProjectSnapshot::new(),
        };
        if !self.code.is_empty() {
            snapshot = snapshot.with_fallback(self.code.clone());
        }
        snapshot
    }
}

/// Ordered set of source files plus the optional fallback string.
#[derive(Debug, Clone, Default)]
pub struct ProjectSnapshot {
    files: IndexMap<String, String>,
    fallback: Option<String>,
}

impl ProjectSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_files(files: IndexMap<String, String>) -> Self {
        let files = files
            .into_iter()
            .map(|(path, content)| (normalize_path(&path), content))
            .collect();
        Self {
            files,
            fallback: None,
        }
    }

    pub fn with_fallback(mut self, code: impl Into<String>) -> Self {
        let code = code.into();
        self.fallback = if code.is_empty() { None } else { Some(code) };
        self
    }

    pub fn insert(&mut self, path: impl AsRef<str>, content: impl Into<String>) {
        self.files
            .insert(normalize_path(path.as_ref()), content.into());
    }

    pub fn files(&self) -> &IndexMap<String, String> {
        &self.files
    }

    pub fn get(&self, path: &str) -> Option<&str> {
        self.files.get(&normalize_path(path)).map(String::as_str)
    }

    pub fn fallback(&self) -> Option<&str> {
        self.fallback.as_deref()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty() && self.fallback.is_none()
    }

    /// Load a snapshot from a directory tree. Convenience for host tooling
    /// and tests; only files in the component-language family plus plain CSS
    /// are picked up. Paths are stored relative to `dir` with `/` separators.
    pub fn from_dir(dir: &Path) -> Result<Self, PreviewError> {
        let mut snapshot = Self::new();

        for entry in WalkDir::new(dir).follow_links(true) {
            let entry = entry.map_err(|e| PreviewError::Io {
                path: dir.display().to_string(),
                source: e.into(),
            })?;
            let path = entry.path();
            if !path.is_file() || !is_snapshot_extension(path) {
                continue;
            }

            let relative = path
                .strip_prefix(dir)
                .unwrap_or(path)
                .to_string_lossy()
                .to_string();
            let content = std::fs::read_to_string(path).map_err(|e| PreviewError::Io {
                path: relative.clone(),
                source: e,
            })?;
            snapshot.insert(relative, content);
        }

        debug!(files = snapshot.files.len(), "loaded snapshot from disk");
        Ok(snapshot)
    }
}

fn is_snapshot_extension(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("tsx" | "jsx" | "ts" | "js" | "css")
    )
}

/// Normalize a snapshot path: forward slashes, no leading `./` or `/`.
pub fn normalize_path(path: &str) -> String {
    let mut normalized = path.replace('\\', "/");
    while let Some(rest) = normalized
        .strip_prefix("./")
        .or_else(|| normalized.strip_prefix('/'))
    {
        normalized = rest.to_string();
    }
    normalized
}

/// Final path segment.
pub fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// File stem of the final path segment.
pub fn file_stem(path: &str) -> &str {
    let name = file_name(path);
    name.rsplit_once('.').map(|(stem, _)| stem).unwrap_or(name)
}

/// Lowercased extension, if any.
pub fn extension(path: &str) -> Option<String> {
    file_name(path)
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path("./src/App.tsx"), "src/App.tsx");
        assert_eq!(normalize_path("/App.tsx"), "App.tsx");
        assert_eq!(normalize_path("src\\components\\Nav.tsx"), "src/components/Nav.tsx");
    }

    #[test]
    fn test_path_helpers() {
        assert_eq!(file_name("src/components/Nav.tsx"), "Nav.tsx");
        assert_eq!(file_stem("src/components/Nav.tsx"), "Nav");
        assert_eq!(extension("src/App.TSX"), Some("tsx".to_string()));
        assert_eq!(extension("Makefile"), None);
    }

    #[test]
    fn test_all_files_takes_precedence_over_code() {
        let mut files = IndexMap::new();
        files.insert("App.tsx".to_string(), "export default function App() {}".to_string());
        let input = PreviewInput {
            code: "const fallback = 1;".to_string(),
            all_files: Some(files),
            theme_colors: None,
        };
        let snapshot = input.snapshot();
        assert!(snapshot.get("App.tsx").is_some());
        // The raw code string is still carried as fallback.
        assert_eq!(snapshot.fallback(), Some("const fallback = 1;"));
    }

    #[test]
    fn test_empty_file_map_falls_back_to_code() {
        let input = PreviewInput {
            code: "function App() {}".to_string(),
            all_files: Some(IndexMap::new()),
            theme_colors: None,
        };
        let snapshot = input.snapshot();
        assert!(snapshot.files().is_empty());
        assert_eq!(snapshot.fallback(), Some("function App() {}"));
    }

    #[test]
    fn test_from_dir_collects_component_family_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("components")).unwrap();
        std::fs::write(dir.path().join("App.tsx"), "export default function App() {}").unwrap();
        std::fs::write(dir.path().join("components/Nav.jsx"), "export function Nav() {}").unwrap();
        std::fs::write(dir.path().join("styles.css"), ".a { color: red; }").unwrap();
        std::fs::write(dir.path().join("notes.md"), "ignored").unwrap();

        let snapshot = ProjectSnapshot::from_dir(dir.path()).unwrap();
        assert!(snapshot.get("App.tsx").is_some());
        assert!(snapshot.get("components/Nav.jsx").is_some());
        assert!(snapshot.get("styles.css").is_some());
        assert_eq!(snapshot.files().len(), 3);
    }

    #[test]
    fn test_input_deserializes_camel_case() {
        let raw = r##"{"code":"","allFiles":{"App.tsx":"x"},"themeColors":{"primary":"#fff"}}"##;
        let input: PreviewInput = serde_json::from_str(raw).unwrap();
        assert_eq!(input.all_files.unwrap().get("App.tsx").unwrap(), "x");
        assert_eq!(input.theme_colors.unwrap().primary.as_deref(), Some("#fff"));
    }
}
