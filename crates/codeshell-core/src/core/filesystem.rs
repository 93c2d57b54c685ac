use unicode_normalization::UnicodeNormalization;

use super::error::{ShellError, ShellResult};
use super::path::{self, ROOT};
use crate::models::{FileNode, NodeKind, NodeType, language_for};

/// In-memory tree of file and folder nodes.
///
/// # Path Convention
///
/// - Virtual root: `"/"` (not a node, the parent of every root node)
/// - Root node: `"/src"`
/// - Nested node: `"/src/components/Button.jsx"`
///
/// Every node's `path` equals its parent's path joined with its name, and
/// sibling names are unique. All mutating methods keep both properties.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct VirtualFileTree {
    roots: Vec<FileNode>,
}

impl VirtualFileTree {
    /// Create an empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a tree from root nodes, validating names and recomputing every
    /// path from the names. Missing ids are generated.
    pub fn from_roots(mut roots: Vec<FileNode>) -> ShellResult<Self> {
        normalize_level(&mut roots, ROOT)?;
        Ok(Self { roots })
    }

    pub fn roots(&self) -> &[FileNode] {
        &self.roots
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    // =========================================================================
    // Lookup
    // =========================================================================

    /// Find the node at an absolute path.
    pub fn lookup(&self, path: &str) -> Option<&FileNode> {
        let path: String = path.nfc().collect();
        let mut segments = path.split('/').filter(|s| !s.is_empty());
        let first = segments.next()?;
        let mut node = self.roots.iter().find(|n| n.name == first)?;
        for segment in segments {
            node = node.children()?.iter().find(|n| n.name == segment)?;
        }
        Some(node)
    }

    pub fn lookup_mut(&mut self, path: &str) -> Option<&mut FileNode> {
        let path: String = path.nfc().collect();
        let mut segments = path.split('/').filter(|s| !s.is_empty());
        let first = segments.next()?;
        let mut node = self.roots.iter_mut().find(|n| n.name == first)?;
        for segment in segments {
            node = node.children_mut()?.iter_mut().find(|n| n.name == segment)?;
        }
        Some(node)
    }

    /// Whether a node exists at `path`. The root always exists.
    pub fn exists(&self, path: &str) -> bool {
        path == ROOT || self.lookup(path).is_some()
    }

    /// Whether `path` is a folder (or the root).
    pub fn is_folder(&self, path: &str) -> bool {
        path == ROOT || self.lookup(path).is_some_and(FileNode::is_folder)
    }

    /// Children of a folder, or the root nodes for `/`.
    pub fn children_of(&self, path: &str) -> ShellResult<&[FileNode]> {
        if path == ROOT {
            return Ok(&self.roots);
        }
        let node = self
            .lookup(path)
            .ok_or_else(|| ShellError::PathNotFound(path.to_string()))?;
        node.children()
            .ok_or_else(|| ShellError::NotADirectory(path.to_string()))
    }

    fn children_vec_mut(&mut self, path: &str) -> ShellResult<&mut Vec<FileNode>> {
        if path == ROOT {
            return Ok(&mut self.roots);
        }
        match self.lookup_mut(path) {
            Some(node) => node
                .children_mut()
                .ok_or_else(|| ShellError::NotADirectory(path.to_string())),
            None => Err(ShellError::PathNotFound(path.to_string())),
        }
    }

    /// Every node, depth first, parents before children.
    pub fn walk(&self) -> Walk<'_> {
        Walk {
            stack: self.roots.iter().rev().collect(),
        }
    }

    /// Number of nodes in the tree.
    pub fn len(&self) -> usize {
        self.roots.iter().map(FileNode::count).sum()
    }

    // =========================================================================
    // Structural Mutation
    // =========================================================================

    /// Insert `node` under the folder at `parent`. Returns the new path.
    pub fn insert(&mut self, parent: &str, mut node: FileNode) -> ShellResult<String> {
        let name = normalize_name(&node.name)?;
        let target = path::join(parent, &name);
        let siblings = self.children_vec_mut(parent)?;
        if siblings.iter().any(|n| n.name == name) {
            return Err(ShellError::PathExists(target));
        }
        node.name = name;
        node.relocate(target.clone());
        siblings.push(node);
        Ok(target)
    }

    /// Rename in place, cascading to descendants. Returns the new path.
    pub fn rename(&mut self, path: &str, new_name: &str) -> ShellResult<String> {
        let name = normalize_name(new_name)?;
        let node = self.require(path)?;
        if let Some(locked) = first_locked(node) {
            return Err(ShellError::NodeLocked(locked.to_string()));
        }
        let current = node.path.clone();
        let parent = path::parent(&current);
        let target = path::join(&parent, &name);
        if target == current {
            return Ok(target);
        }
        if self.exists(&target) {
            return Err(ShellError::PathExists(target));
        }

        let node = self
            .lookup_mut(&current)
            .ok_or_else(|| ShellError::PathNotFound(current.clone()))?;
        set_name(node, name);
        node.relocate(target.clone());
        Ok(target)
    }

    /// Move `source` into the folder `target_folder`, keeping its name.
    pub fn move_node(&mut self, source: &str, target_folder: &str) -> ShellResult<String> {
        let name = self.require(source)?.name.clone();
        self.transplant(source, target_folder, name)
    }

    /// Move `source` so that it ends up at exactly `destination`.
    pub fn move_to(&mut self, source: &str, destination: &str) -> ShellResult<String> {
        let name = normalize_name(path::file_name(destination))?;
        self.transplant(source, &path::parent(destination), name)
    }

    fn transplant(&mut self, source: &str, parent: &str, name: String) -> ShellResult<String> {
        let node = self.require(source)?;
        if let Some(locked) = first_locked(node) {
            return Err(ShellError::NodeLocked(locked.to_string()));
        }
        let source = node.path.clone();
        if parent == source || path::is_descendant(parent, &source) {
            return Err(ShellError::InvalidMove {
                path: source,
                target: parent.to_string(),
            });
        }
        if path::parent(&source) == parent {
            return self.rename(&source, &name);
        }
        self.require_folder(parent)?;

        let target = path::join(parent, &name);
        if self.exists(&target) {
            return Err(ShellError::PathExists(target));
        }

        let mut node = self.detach(&source)?;
        set_name(&mut node, name);
        node.relocate(target.clone());
        self.children_vec_mut(parent)?.push(node);
        Ok(target)
    }

    /// Remove a node and its descendants. Non-empty folders need `recursive`.
    pub fn remove(&mut self, path: &str, recursive: bool) -> ShellResult<FileNode> {
        let node = self.require(path)?;
        if let Some(locked) = first_locked(node) {
            return Err(ShellError::NodeLocked(locked.to_string()));
        }
        if !recursive && node.children().is_some_and(|c| !c.is_empty()) {
            return Err(ShellError::DirectoryNotEmpty(node.path.clone()));
        }
        let path = node.path.clone();
        self.detach(&path)
    }

    fn detach(&mut self, path: &str) -> ShellResult<FileNode> {
        let name = path::file_name(path).to_string();
        let siblings = self.children_vec_mut(&path::parent(path))?;
        let index = siblings
            .iter()
            .position(|n| n.name == name)
            .ok_or_else(|| ShellError::PathNotFound(path.to_string()))?;
        Ok(siblings.remove(index))
    }

    /// Clone `node` with fresh ids, placed at `new_path`.
    pub fn deep_copy(node: &FileNode, new_path: &str) -> FileNode {
        let mut copy = node.clone();
        copy.refresh_ids();
        set_name(&mut copy, path::file_name(new_path).to_string());
        copy.relocate(new_path.to_string());
        copy
    }

    /// Deep-copy `source` into the folder `target_folder`, keeping its name.
    pub fn copy_node(&mut self, source: &str, target_folder: &str) -> ShellResult<String> {
        let name = self.require(source)?.name.clone();
        self.copy_as(source, target_folder, &name)
    }

    /// Deep-copy `source` so that the copy lives at `destination`.
    pub fn copy_to(&mut self, source: &str, destination: &str) -> ShellResult<String> {
        let name = normalize_name(path::file_name(destination))?;
        self.copy_as(source, &path::parent(destination), &name)
    }

    fn copy_as(&mut self, source: &str, parent: &str, name: &str) -> ShellResult<String> {
        let target = path::join(parent, name);
        self.require_folder(parent)?;
        if self.exists(&target) {
            return Err(ShellError::PathExists(target));
        }
        let copy = Self::deep_copy(self.require(source)?, &target);
        self.children_vec_mut(parent)?.push(copy);
        Ok(target)
    }

    /// Replace the node's variant in place, keeping id, name, path and flags.
    pub fn convert(&mut self, path: &str, to: NodeType) -> ShellResult<()> {
        let node = self
            .lookup_mut(path)
            .ok_or_else(|| ShellError::PathNotFound(path.to_string()))?;
        if node.is_locked {
            return Err(ShellError::NodeLocked(node.path.clone()));
        }
        if node.node_type() == to {
            return Ok(());
        }
        match to {
            NodeType::Folder => node.kind = NodeKind::empty_folder(),
            NodeType::File => {
                if node.children().is_some_and(|c| !c.is_empty()) {
                    return Err(ShellError::DirectoryNotEmpty(node.path.clone()));
                }
                node.kind = NodeKind::empty_file(&node.name);
            }
        }
        Ok(())
    }

    pub fn convert_to_folder(&mut self, path: &str) -> ShellResult<()> {
        self.convert(path, NodeType::Folder)
    }

    pub fn convert_to_file(&mut self, path: &str) -> ShellResult<()> {
        self.convert(path, NodeType::File)
    }

    // =========================================================================
    // Content and Flags
    // =========================================================================

    /// Save new content to a file. Returns the new version.
    pub fn write_file(&mut self, path: &str, content: String, timestamp: i64) -> ShellResult<u32> {
        let node = self
            .lookup_mut(path)
            .ok_or_else(|| ShellError::PathNotFound(path.to_string()))?;
        if node.is_locked {
            return Err(ShellError::NodeLocked(node.path.clone()));
        }
        node.save_content(content, timestamp)
            .ok_or_else(|| ShellError::NotAFile(path.to_string()))
    }

    pub fn set_locked(&mut self, path: &str, locked: bool) -> ShellResult<()> {
        self.require_mut(path)?.is_locked = locked;
        Ok(())
    }

    pub fn set_starred(&mut self, path: &str, starred: bool) -> ShellResult<()> {
        self.require_mut(path)?.is_starred = starred;
        Ok(())
    }

    /// Expand or collapse a folder in the explorer.
    pub fn set_open(&mut self, path: &str, open: bool) -> ShellResult<()> {
        match &mut self.require_mut(path)?.kind {
            NodeKind::Folder { is_open, .. } => {
                *is_open = open;
                Ok(())
            }
            NodeKind::File { .. } => Err(ShellError::NotADirectory(path.to_string())),
        }
    }

    // =========================================================================
    // Export / Import
    // =========================================================================

    /// Pretty JSON array of the root nodes.
    pub fn export_json(&self) -> ShellResult<String> {
        serde_json::to_string_pretty(&self.roots)
            .map_err(|e| ShellError::InvalidWorkspace(e.to_string()))
    }

    /// Parse and validate an exported document.
    pub fn import_json(json: &str) -> ShellResult<Self> {
        let roots: Vec<FileNode> =
            serde_json::from_str(json).map_err(|e| ShellError::InvalidWorkspace(e.to_string()))?;
        Self::from_roots(roots)
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    fn require(&self, path: &str) -> ShellResult<&FileNode> {
        self.lookup(path)
            .ok_or_else(|| ShellError::PathNotFound(path.to_string()))
    }

    fn require_mut(&mut self, path: &str) -> ShellResult<&mut FileNode> {
        self.lookup_mut(path)
            .ok_or_else(|| ShellError::PathNotFound(path.to_string()))
    }

    fn require_folder(&self, path: &str) -> ShellResult<()> {
        if self.is_folder(path) {
            Ok(())
        } else if self.exists(path) {
            Err(ShellError::NotADirectory(path.to_string()))
        } else {
            Err(ShellError::PathNotFound(path.to_string()))
        }
    }
}

/// Depth-first iterator over a tree's nodes.
pub struct Walk<'a> {
    stack: Vec<&'a FileNode>,
}

impl<'a> Iterator for Walk<'a> {
    type Item = &'a FileNode;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        if let Some(children) = node.children() {
            self.stack.extend(children.iter().rev());
        }
        Some(node)
    }
}

/// NFC-normalize and validate a node name.
pub fn normalize_name(name: &str) -> ShellResult<String> {
    let name: String = name.nfc().collect();
    if name.is_empty() || name == "." || name == ".." || name.contains('/') {
        return Err(ShellError::InvalidName(name));
    }
    Ok(name)
}

fn set_name(node: &mut FileNode, name: String) {
    if let NodeKind::File { language, .. } = &mut node.kind {
        *language = language_for(&name).to_string();
    }
    node.name = name;
}

fn first_locked(node: &FileNode) -> Option<&str> {
    if node.is_locked {
        return Some(&node.path);
    }
    node.children()?.iter().find_map(first_locked)
}

fn normalize_level(nodes: &mut [FileNode], parent: &str) -> ShellResult<()> {
    let mut seen = std::collections::HashSet::new();
    for node in nodes.iter_mut() {
        let name = normalize_name(&node.name)
            .map_err(|e| ShellError::InvalidWorkspace(e.to_string()))?;
        let node_path = path::join(parent, &name);
        if !seen.insert(name.clone()) {
            return Err(ShellError::InvalidWorkspace(format!(
                "duplicate name: {}",
                node_path
            )));
        }
        node.name = name;
        node.path = node_path;
        node.fill_missing_ids();
        match &mut node.kind {
            NodeKind::File { language, .. } if language.is_empty() => {
                *language = language_for(&node.name).to_string();
            }
            NodeKind::File { .. } => {}
            NodeKind::Folder { children, .. } => normalize_level(children, &node.path)?,
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::ErrorKind;

    fn create_test_tree() -> VirtualFileTree {
        let mut tree = VirtualFileTree::new();
        tree.insert("/", FileNode::folder("src", "/")).unwrap();
        tree.insert("/src", FileNode::folder("components", "/")).unwrap();
        let button = FileNode::file_with_content("Button.jsx", "/", "btn");
        tree.insert("/src/components", button).unwrap();
        tree.insert("/src", FileNode::file_with_content("App.jsx", "/", "app"))
            .unwrap();
        tree.insert("/", FileNode::folder("public", "/")).unwrap();
        tree
    }

    #[test]
    fn test_lookup() {
        let tree = create_test_tree();
        assert!(tree.lookup("/src/components/Button.jsx").is_some());
        assert!(tree.lookup("/src/missing").is_none());
        assert!(tree.lookup("/").is_none());
        assert!(tree.exists("/"));
        assert!(tree.is_folder("/src/components"));
        assert!(!tree.is_folder("/src/App.jsx"));
    }

    #[test]
    fn test_children_keep_insertion_order() {
        let tree = create_test_tree();
        let names: Vec<_> = tree
            .children_of("/src")
            .unwrap()
            .iter()
            .map(|n| n.name.as_str())
            .collect();
        assert_eq!(names, vec!["components", "App.jsx"]);
        let roots: Vec<_> = tree
            .children_of("/")
            .unwrap()
            .iter()
            .map(|n| n.name.as_str())
            .collect();
        assert_eq!(roots, vec!["src", "public"]);
        assert_eq!(
            tree.children_of("/src/App.jsx").unwrap_err().kind(),
            ErrorKind::NotADirectory
        );
    }

    #[test]
    fn test_insert_errors() {
        let mut tree = create_test_tree();
        let err = tree.insert("/src", FileNode::file("App.jsx", "/")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PathExists);
        let err = tree.insert("/src/App.jsx", FileNode::file("x", "/")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotADirectory);
        let err = tree.insert("/nope", FileNode::file("x", "/")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PathNotFound);
        let err = tree.insert("/src", FileNode::file("..", "/")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidName);
    }

    #[test]
    fn test_names_are_nfc_normalized() {
        let mut tree = VirtualFileTree::new();
        // "e" + combining acute accent
        tree.insert("/", FileNode::file("cafe\u{301}.txt", "/")).unwrap();
        assert!(tree.lookup("/caf\u{e9}.txt").is_some());
        let err = tree.insert("/", FileNode::file("caf\u{e9}.txt", "/")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PathExists);
    }

    #[test]
    fn test_rename_cascades() {
        let mut tree = create_test_tree();
        let new_path = tree.rename("/src", "app").unwrap();
        assert_eq!(new_path, "/app");
        let button = tree.lookup("/app/components/Button.jsx").unwrap();
        assert_eq!(button.path, "/app/components/Button.jsx");
        assert!(tree.lookup("/src").is_none());
        assert!(tree.walk().all(|n| !n.path.starts_with("/src")));
    }

    #[test]
    fn test_rename_updates_language() {
        let mut tree = create_test_tree();
        tree.rename("/src/App.jsx", "notes.md").unwrap();
        match &tree.lookup("/src/notes.md").unwrap().kind {
            NodeKind::File { language, .. } => assert_eq!(language, "markdown"),
            NodeKind::Folder { .. } => panic!("expected file"),
        }
    }

    #[test]
    fn test_rename_clash() {
        let mut tree = create_test_tree();
        let err = tree.rename("/src/App.jsx", "components").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PathExists);
    }

    #[test]
    fn test_move_into_folder() {
        let mut tree = create_test_tree();
        let moved = tree.move_node("/src/components", "/public").unwrap();
        assert_eq!(moved, "/public/components");
        assert!(tree.lookup("/public/components/Button.jsx").is_some());
        assert!(tree.lookup("/src/components").is_none());
    }

    #[test]
    fn test_move_into_descendant_fails() {
        let mut tree = create_test_tree();
        let err = tree.move_node("/src", "/src/components").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidMove);
        let err = tree.move_node("/src", "/src").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidMove);
        assert!(tree.lookup("/src/components/Button.jsx").is_some());
    }

    #[test]
    fn test_move_to_renames_across_folders() {
        let mut tree = create_test_tree();
        let moved = tree.move_to("/src/App.jsx", "/public/Main.jsx").unwrap();
        assert_eq!(moved, "/public/Main.jsx");
        assert_eq!(tree.lookup("/public/Main.jsx").unwrap().content(), Some("app"));
    }

    #[test]
    fn test_remove() {
        let mut tree = create_test_tree();
        let err = tree.remove("/src", false).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DirectoryNotEmpty);
        tree.remove("/public", false).unwrap();
        let removed = tree.remove("/src", true).unwrap();
        assert_eq!(removed.count(), 4);
        assert!(tree.is_empty());
    }

    #[test]
    fn test_locked_descendant_blocks_remove() {
        let mut tree = create_test_tree();
        tree.set_locked("/src/components/Button.jsx", true).unwrap();
        let err = tree.remove("/src", true).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NodeLocked);
        let err = tree.rename("/src/components/Button.jsx", "B.jsx").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NodeLocked);
        let err = tree
            .write_file("/src/components/Button.jsx", "x".into(), 0)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NodeLocked);
    }

    #[test]
    fn test_locked_descendant_blocks_rename_and_move() {
        let mut tree = create_test_tree();
        tree.set_locked("/src/components/Button.jsx", true).unwrap();
        let before = tree.clone();

        let err = tree.rename("/src", "lib").unwrap_err();
        assert!(matches!(&err, ShellError::NodeLocked(p) if p == "/src/components/Button.jsx"));
        let err = tree.move_node("/src/components", "/public").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NodeLocked);
        let err = tree.move_to("/src", "/public/src").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NodeLocked);
        assert_eq!(tree, before);

        // Unlocked siblings still move.
        tree.move_node("/src/App.jsx", "/public").unwrap();
        assert!(tree.lookup("/public/App.jsx").is_some());
    }

    #[test]
    fn test_deep_copy_fresh_ids() {
        let mut tree = create_test_tree();
        tree.copy_to("/src", "/backup").unwrap();
        let original = tree.lookup("/src/components/Button.jsx").unwrap().id.clone();
        let copy = tree.lookup("/backup/components/Button.jsx").unwrap();
        assert_ne!(copy.id, original);
        assert_eq!(copy.content(), Some("btn"));

        let mut ids: Vec<_> = tree.walk().map(|n| n.id.clone()).collect();
        let before = ids.len();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), before);
    }

    #[test]
    fn test_convert() {
        let mut tree = create_test_tree();
        let id = tree.lookup("/src/App.jsx").unwrap().id.clone();
        tree.convert_to_folder("/src/App.jsx").unwrap();
        let node = tree.lookup("/src/App.jsx").unwrap();
        assert!(node.is_folder());
        assert_eq!(node.id, id);

        let err = tree.convert_to_file("/src").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DirectoryNotEmpty);
        tree.convert("/public", NodeType::File).unwrap();
        assert!(tree.lookup("/public").unwrap().is_file());
    }

    #[test]
    fn test_write_file_versions() {
        let mut tree = create_test_tree();
        assert_eq!(tree.write_file("/src/App.jsx", "one".into(), 1).unwrap(), 1);
        assert_eq!(tree.write_file("/src/App.jsx", "two".into(), 2).unwrap(), 2);
        let node = tree.lookup("/src/App.jsx").unwrap();
        assert_eq!(node.content(), Some("two"));
        assert_eq!(node.revisions().len(), 2);
        let err = tree.write_file("/src", "x".into(), 3).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotAFile);
    }

    #[test]
    fn test_walk_order() {
        let tree = create_test_tree();
        let paths: Vec<_> = tree.walk().map(|n| n.path.as_str()).collect();
        assert_eq!(
            paths,
            vec![
                "/src",
                "/src/components",
                "/src/components/Button.jsx",
                "/src/App.jsx",
                "/public"
            ]
        );
        assert_eq!(tree.len(), 5);
    }

    #[test]
    fn test_export_import() {
        let tree = create_test_tree();
        let json = tree.export_json().unwrap();
        let imported = VirtualFileTree::import_json(&json).unwrap();
        assert_eq!(imported, tree);
    }

    #[test]
    fn test_import_recomputes_paths_and_rejects_duplicates() {
        let json = r#"[{"name": "src", "path": "/wrong", "type": "folder",
            "children": [{"name": "a.js", "type": "file", "content": "x"}]}]"#;
        let tree = VirtualFileTree::import_json(json).unwrap();
        let node = tree.lookup("/src/a.js").unwrap();
        assert_eq!(node.path, "/src/a.js");
        assert!(!node.id.is_empty());

        let dup = r#"[{"name": "a", "type": "file"}, {"name": "a", "type": "folder"}]"#;
        let err = VirtualFileTree::import_json(dup).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidWorkspace);
        let err = VirtualFileTree::import_json("{not json").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidWorkspace);
    }
}
