//! File-Tree Presentation.
//!
//! Converts the snapshot's file map into a navigation hierarchy for host
//! UIs. Shares the assembler's path normalization; not part of the render
//! pipeline itself.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::snapshot::normalize_path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Directory,
    File,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileTreeNode {
    pub name: String,
    /// Full normalized path from the snapshot root.
    pub path: String,
    pub kind: NodeKind,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<FileTreeNode>,
}

/// Build the navigation hierarchy: directories before files, alphabetical
/// within each kind.
pub fn build_file_tree(files: &IndexMap<String, String>) -> Vec<FileTreeNode> {
    let mut roots: Vec<FileTreeNode> = Vec::new();

    for path in files.keys() {
        let normalized = normalize_path(path);
        if normalized.is_empty() {
            continue;
        }
        insert_path(&mut roots, &normalized);
    }

    sort_tree(&mut roots);
    roots
}

fn insert_path(nodes: &mut Vec<FileTreeNode>, path: &str) {
    let mut current = nodes;
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    let mut prefix = String::new();

    for (depth, segment) in segments.iter().enumerate() {
        if !prefix.is_empty() {
            prefix.push('/');
        }
        prefix.push_str(segment);
        let is_file = depth == segments.len() - 1;
        let kind = if is_file {
            NodeKind::File
        } else {
            NodeKind::Directory
        };

        let at = match current.iter().position(|n| n.name == *segment) {
            Some(at) => at,
            None => {
                current.push(FileTreeNode {
                    name: segment.to_string(),
                    path: prefix.clone(),
                    kind,
                    children: Vec::new(),
                });
                current.len() - 1
            }
        };
        current = &mut current[at].children;
    }
}

fn sort_tree(nodes: &mut Vec<FileTreeNode>) {
    nodes.sort_by(|a, b| {
        (a.kind == NodeKind::File)
            .cmp(&(b.kind == NodeKind::File))
            .then_with(|| a.name.to_ascii_lowercase().cmp(&b.name.to_ascii_lowercase()))
    });
    for node in nodes {
        sort_tree(&mut node.children);
    }
}

#[cfg(feature = "napi")]
use napi_derive::napi;

#[cfg(feature = "napi")]
#[napi]
pub fn file_tree_native(files: serde_json::Value) -> napi::Result<serde_json::Value> {
    let files: IndexMap<String, String> = serde_json::from_value(files)
        .map_err(|e| napi::Error::from_reason(format!("Invalid file map: {}", e)))?;
    serde_json::to_value(build_file_tree(&files))
        .map_err(|e| napi::Error::from_reason(e.to_string()))
}
