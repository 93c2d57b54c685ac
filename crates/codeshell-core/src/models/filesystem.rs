use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::MAX_FILE_HISTORY;
use crate::core::path;

// =============================================================================
// Node Types
// =============================================================================

/// Discriminant used when creating or converting nodes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeType {
    File,
    Folder,
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File => write!(f, "file"),
            Self::Folder => write!(f, "folder"),
        }
    }
}

/// One saved snapshot of a file's content.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRevision {
    pub content: String,
    /// Unix milliseconds
    pub timestamp: i64,
}

/// A node of the virtual tree.
///
/// Serialized as a flat object whose `type` field selects the variant, e.g.
/// `{"id": "..", "name": "src", "path": "/src", "type": "folder", "children": [..]}`.
/// `id` and `path` may be omitted in imported documents; they are recomputed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileNode {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub is_locked: bool,
    #[serde(default)]
    pub is_starred: bool,
    #[serde(flatten)]
    pub kind: NodeKind,
}

/// Variant-specific node data.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum NodeKind {
    File {
        #[serde(default)]
        content: String,
        #[serde(default)]
        language: String,
        /// Incremented on every successful save
        #[serde(default)]
        version: u32,
        /// Oldest first, capped at `MAX_FILE_HISTORY`
        #[serde(default)]
        history: Vec<FileRevision>,
    },
    Folder {
        #[serde(default)]
        children: Vec<FileNode>,
        #[serde(default, rename = "isOpen")]
        is_open: bool,
    },
}

impl NodeKind {
    /// Empty file data for a node called `name`.
    pub fn empty_file(name: &str) -> Self {
        Self::File {
            content: String::new(),
            language: language_for(name).to_string(),
            version: 0,
            history: Vec::new(),
        }
    }

    pub fn empty_folder() -> Self {
        Self::Folder {
            children: Vec::new(),
            is_open: false,
        }
    }
}

// =============================================================================
// FileNode
// =============================================================================

impl FileNode {
    /// Create an empty file named `name` under `parent`.
    pub fn file(name: &str, parent: &str) -> Self {
        Self::new(name, parent, NodeKind::empty_file(name))
    }

    /// Create a file with initial content (version 0, no revisions).
    pub fn file_with_content(name: &str, parent: &str, content: impl Into<String>) -> Self {
        let mut node = Self::file(name, parent);
        if let NodeKind::File { content: c, .. } = &mut node.kind {
            *c = content.into();
        }
        node
    }

    /// Create an empty folder named `name` under `parent`.
    pub fn folder(name: &str, parent: &str) -> Self {
        Self::new(name, parent, NodeKind::empty_folder())
    }

    fn new(name: &str, parent: &str, kind: NodeKind) -> Self {
        Self {
            id: new_id(),
            name: name.to_string(),
            path: path::join(parent, name),
            is_locked: false,
            is_starred: false,
            kind,
        }
    }

    pub fn node_type(&self) -> NodeType {
        match self.kind {
            NodeKind::File { .. } => NodeType::File,
            NodeKind::Folder { .. } => NodeType::Folder,
        }
    }

    pub fn is_folder(&self) -> bool {
        matches!(self.kind, NodeKind::Folder { .. })
    }

    pub fn is_file(&self) -> bool {
        matches!(self.kind, NodeKind::File { .. })
    }

    /// Children of a folder (`None` for files).
    pub fn children(&self) -> Option<&[FileNode]> {
        match &self.kind {
            NodeKind::Folder { children, .. } => Some(children),
            NodeKind::File { .. } => None,
        }
    }

    pub fn children_mut(&mut self) -> Option<&mut Vec<FileNode>> {
        match &mut self.kind {
            NodeKind::Folder { children, .. } => Some(children),
            NodeKind::File { .. } => None,
        }
    }

    /// Content of a file (`None` for folders).
    pub fn content(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::File { content, .. } => Some(content),
            NodeKind::Folder { .. } => None,
        }
    }

    pub fn version(&self) -> Option<u32> {
        match &self.kind {
            NodeKind::File { version, .. } => Some(*version),
            NodeKind::Folder { .. } => None,
        }
    }

    pub fn revisions(&self) -> &[FileRevision] {
        match &self.kind {
            NodeKind::File { history, .. } => history,
            NodeKind::Folder { .. } => &[],
        }
    }

    /// Move the node to `new_path`, rewriting every descendant path.
    pub fn relocate(&mut self, new_path: String) {
        if let Some(children) = self.children_mut() {
            for child in children.iter_mut() {
                let child_path = path::join(&new_path, &child.name);
                child.relocate(child_path);
            }
        }
        self.path = new_path;
    }

    /// Assign fresh ids to this node and all descendants.
    pub fn refresh_ids(&mut self) {
        self.id = new_id();
        if let Some(children) = self.children_mut() {
            children.iter_mut().for_each(FileNode::refresh_ids);
        }
    }

    /// Fill in ids that are missing (imported documents may omit them).
    pub(crate) fn fill_missing_ids(&mut self) {
        if self.id.is_empty() {
            self.id = new_id();
        }
        if let Some(children) = self.children_mut() {
            children.iter_mut().for_each(FileNode::fill_missing_ids);
        }
    }

    /// Replace a file's content as a new saved version. Returns the version.
    pub(crate) fn save_content(&mut self, new_content: String, timestamp: i64) -> Option<u32> {
        let NodeKind::File {
            content,
            version,
            history,
            ..
        } = &mut self.kind
        else {
            return None;
        };
        *version += 1;
        history.push(FileRevision {
            content: new_content.clone(),
            timestamp,
        });
        if history.len() > MAX_FILE_HISTORY {
            let overflow = history.len() - MAX_FILE_HISTORY;
            history.drain(..overflow);
        }
        *content = new_content;
        Some(*version)
    }

    /// Number of nodes in this subtree, including itself.
    pub fn count(&self) -> usize {
        1 + self
            .children()
            .map(|c| c.iter().map(FileNode::count).sum())
            .unwrap_or(0)
    }
}

/// Fresh node id.
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Editor language id for a file name, from its extension.
pub fn language_for(name: &str) -> &'static str {
    let ext = match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => ext.to_lowercase(),
        _ => return "plaintext",
    };
    match ext.as_str() {
        "js" | "jsx" | "mjs" | "cjs" => "javascript",
        "ts" | "tsx" => "typescript",
        "rs" => "rust",
        "py" => "python",
        "json" => "json",
        "md" | "markdown" => "markdown",
        "css" | "scss" => "css",
        "html" | "htm" => "html",
        "toml" => "toml",
        "yml" | "yaml" => "yaml",
        "sh" | "bash" => "shell",
        "mmd" | "mermaid" => "mermaid",
        _ => "plaintext",
    }
}
