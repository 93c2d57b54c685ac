//! The persisted workspace: one tree plus the store that backs it.
//!
//! Every mutation is applied to a copy of the tree first. The record diff
//! between what the store holds and the copy is written to the store, and
//! the copy replaces the live tree only once every write has succeeded. A
//! failed write therefore leaves the in-memory tree exactly as it was, and
//! the next commit also re-issues whatever the failed one left behind.

use super::error::{ShellError, ShellResult};
use super::filesystem::VirtualFileTree;
use super::parser::RedirectMode;
use super::path;
use super::store::{PersistenceStore, RecordSet, apply_ops, rebuild_tree};
use crate::models::{FileNode, NodeType};
use crate::utils::now_millis;

/// Starter project seeded into an empty store.
const STARTER_PROJECT: &[(&str, &str)] = &[
    ("/src/index.js", include_str!("../../assets/starter/index.js")),
    ("/src/App.jsx", include_str!("../../assets/starter/App.jsx")),
    ("/src/styles.css", include_str!("../../assets/starter/styles.css")),
    ("/public/index.html", include_str!("../../assets/starter/index.html")),
    ("/package.json", include_str!("../../assets/starter/package.json")),
    ("/README.md", include_str!("../../assets/starter/README.md")),
];

/// Owner of the live tree and its store.
pub struct Workspace<S> {
    tree: VirtualFileTree,
    store: S,
    /// Records the store is known to hold
    persisted: RecordSet,
}

impl<S: PersistenceStore> Workspace<S> {
    /// Rebuild the tree from the records in `store`.
    pub async fn load(store: S) -> ShellResult<Self> {
        let folders = store.list_all_folders().await?;
        let files = store.list_all_files().await?;
        let persisted = RecordSet::from_records(folders.clone(), files.clone());
        let tree = rebuild_tree(folders, files);
        tracing::info!(nodes = tree.len(), "workspace loaded");
        Ok(Self {
            tree,
            store,
            persisted,
        })
    }

    /// Load `store`, seeding the starter project when it holds no records.
    pub async fn load_or_seed(store: S) -> ShellResult<Self> {
        let mut workspace = Self::load(store).await?;
        if workspace.tree.is_empty() {
            workspace.commit(starter_tree()?).await?;
            tracing::info!(nodes = workspace.tree.len(), "seeded starter project");
        }
        Ok(workspace)
    }

    pub fn tree(&self) -> &VirtualFileTree {
        &self.tree
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    // =========================================================================
    // Persist-first plumbing
    // =========================================================================

    /// Write the difference between the stored records and `next`, then
    /// install `next`. On a store failure the live tree is kept.
    async fn commit(&mut self, next: VirtualFileTree) -> ShellResult<()> {
        let ops = self.persisted.diff(&RecordSet::from_tree(&next));
        if ops.is_empty() {
            self.tree = next;
            return Ok(());
        }
        tracing::debug!(ops = ops.len(), "persisting workspace change");
        if let Err(e) = apply_ops(&self.store, &ops, &mut self.persisted).await {
            tracing::error!(error = %e, "persistence failed, tree left unchanged");
            return Err(e.into());
        }
        self.tree = next;
        Ok(())
    }

    async fn mutate<T>(
        &mut self,
        change: impl FnOnce(&mut VirtualFileTree) -> ShellResult<T>,
    ) -> ShellResult<T> {
        let mut next = self.tree.clone();
        let out = change(&mut next)?;
        self.commit(next).await?;
        Ok(out)
    }

    // =========================================================================
    // Explorer Actions
    // =========================================================================

    /// Create an empty file or folder named `name` in `parent`.
    pub async fn create_node(
        &mut self,
        parent: &str,
        name: &str,
        node_type: NodeType,
    ) -> ShellResult<String> {
        let node = match node_type {
            NodeType::File => FileNode::file(name, parent),
            NodeType::Folder => FileNode::folder(name, parent),
        };
        let path = self.mutate(|tree| tree.insert(parent, node)).await?;
        tracing::debug!(%path, %node_type, "created node");
        Ok(path)
    }

    pub async fn rename_node(&mut self, path: &str, new_name: &str) -> ShellResult<String> {
        self.mutate(|tree| tree.rename(path, new_name)).await
    }

    /// Move `source` into `target_folder`.
    pub async fn move_node(&mut self, source: &str, target_folder: &str) -> ShellResult<String> {
        self.mutate(|tree| tree.move_node(source, target_folder))
            .await
    }

    /// Move `source` to exactly `destination` (rename across folders).
    pub async fn relocate_node(&mut self, source: &str, destination: &str) -> ShellResult<String> {
        self.mutate(|tree| tree.move_to(source, destination)).await
    }

    /// Delete a node and everything below it.
    pub async fn delete_node(&mut self, path: &str) -> ShellResult<()> {
        self.remove_node(path, true).await
    }

    pub async fn remove_node(&mut self, path: &str, recursive: bool) -> ShellResult<()> {
        let removed = self.mutate(|tree| tree.remove(path, recursive)).await?;
        tracing::debug!(path = %removed.path, nodes = removed.count(), "removed node");
        Ok(())
    }

    pub async fn convert_node(&mut self, path: &str, to: NodeType) -> ShellResult<()> {
        self.mutate(|tree| tree.convert(path, to)).await
    }

    /// Deep-copy `source` into `target_folder`.
    pub async fn copy_node(&mut self, source: &str, target_folder: &str) -> ShellResult<String> {
        self.mutate(|tree| tree.copy_node(source, target_folder))
            .await
    }

    /// Deep-copy `source` so the copy lives at `destination`.
    pub async fn copy_to(&mut self, source: &str, destination: &str) -> ShellResult<String> {
        self.mutate(|tree| tree.copy_to(source, destination)).await
    }

    /// Save editor content. Returns the new version.
    pub async fn save_file(&mut self, path: &str, content: &str) -> ShellResult<u32> {
        let timestamp = now_millis();
        let version = self
            .mutate(|tree| tree.write_file(path, content.to_string(), timestamp))
            .await?;
        tracing::debug!(%path, version, "saved file");
        Ok(version)
    }

    /// Write command output to `path`, creating the file when it is missing.
    ///
    /// `Append` adds a newline and `text` to an existing file, even an empty
    /// one, and sets `text` on a new file. Returns the new version.
    pub async fn write_file(
        &mut self,
        path: &str,
        text: &str,
        mode: RedirectMode,
    ) -> ShellResult<u32> {
        let timestamp = now_millis();
        self.mutate(|tree| {
            let existing = match tree.lookup(path) {
                Some(node) => Some(
                    node.content()
                        .ok_or_else(|| ShellError::NotAFile(path.to_string()))?
                        .to_string(),
                ),
                None => None,
            };
            let target = match existing {
                Some(_) => path.to_string(),
                None => {
                    let parent = path::parent(path);
                    tree.insert(&parent, FileNode::file(path::file_name(path), &parent))?
                }
            };
            let content = match (mode, existing) {
                (RedirectMode::Append, Some(current)) => format!("{}\n{}", current, text),
                _ => text.to_string(),
            };
            tree.write_file(&target, content, timestamp)
        })
        .await
    }

    pub async fn set_locked(&mut self, path: &str, locked: bool) -> ShellResult<()> {
        self.mutate(|tree| tree.set_locked(path, locked)).await
    }

    pub async fn set_starred(&mut self, path: &str, starred: bool) -> ShellResult<()> {
        self.mutate(|tree| tree.set_starred(path, starred)).await
    }

    pub async fn set_open(&mut self, path: &str, open: bool) -> ShellResult<()> {
        self.mutate(|tree| tree.set_open(path, open)).await
    }

    // =========================================================================
    // Export / Import
    // =========================================================================

    pub fn export_json(&self) -> ShellResult<String> {
        self.tree.export_json()
    }

    /// Replace the whole tree with an exported document.
    ///
    /// The document is fully validated before anything is written.
    pub async fn import_json(&mut self, json: &str) -> ShellResult<()> {
        let next = VirtualFileTree::import_json(json)?;
        let nodes = next.len();
        self.commit(next).await?;
        tracing::info!(nodes, "imported workspace");
        Ok(())
    }
}

/// The starter project as a tree.
fn starter_tree() -> ShellResult<VirtualFileTree> {
    let mut tree = VirtualFileTree::new();
    for (file_path, content) in STARTER_PROJECT {
        let parent = path::parent(file_path);
        if !tree.exists(&parent) {
            let grandparent = path::parent(&parent);
            tree.insert(
                &grandparent,
                FileNode::folder(path::file_name(&parent), &grandparent),
            )?;
        }
        tree.insert(
            &parent,
            FileNode::file_with_content(path::file_name(file_path), &parent, *content),
        )?;
    }
    Ok(tree)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::ErrorKind;
    use crate::core::store::MemoryStore;

    async fn seeded() -> Workspace<MemoryStore> {
        Workspace::load_or_seed(MemoryStore::new()).await.unwrap()
    }

    #[tokio::test]
    async fn test_seed_starter_project() {
        let ws = seeded().await;
        assert!(ws.tree().lookup("/src/App.jsx").is_some());
        assert!(ws.tree().lookup("/public/index.html").is_some());
        assert_eq!(ws.store().record_count(), ws.tree().len());
    }

    #[tokio::test]
    async fn test_reload_reproduces_tree() {
        let mut ws = seeded().await;
        ws.create_node("/src", "components", NodeType::Folder)
            .await
            .unwrap();
        ws.move_node("/src/App.jsx", "/src/components").await.unwrap();
        ws.save_file("/src/components/App.jsx", "export {}").await.unwrap();
        ws.set_starred("/README.md", true).await.unwrap();

        let tree = ws.tree().clone();
        let reloaded = Workspace::load(ws.into_store()).await.unwrap();
        assert_eq!(reloaded.tree(), &tree);
    }

    #[tokio::test]
    async fn test_failed_write_leaves_tree_unchanged() {
        let mut ws = seeded().await;
        let before = ws.tree().clone();
        ws.store().set_fail_writes(true);

        let err = ws.rename_node("/src", "lib").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Persistence);
        assert_eq!(ws.tree(), &before);

        let err = ws.save_file("/src/App.jsx", "x").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Persistence);
        assert_eq!(ws.tree().lookup("/src/App.jsx").unwrap().version(), Some(0));
    }

    #[tokio::test]
    async fn test_partial_failure_is_repaired_by_next_commit() {
        let mut ws = seeded().await;
        ws.store().fail_after_writes(2);
        let err = ws.rename_node("/src", "lib").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Persistence);
        assert!(ws.tree().lookup("/src/App.jsx").is_some());

        ws.store().set_fail_writes(false);
        ws.create_node("/", "notes.txt", NodeType::File).await.unwrap();

        let tree = ws.tree().clone();
        let reloaded = Workspace::load(ws.into_store()).await.unwrap();
        assert_eq!(reloaded.tree(), &tree);
        assert!(reloaded.tree().lookup("/src/index.js").is_some());
        assert!(reloaded.tree().lookup("/src/App.jsx").is_some());
        assert!(reloaded.tree().lookup("/lib").is_none());
    }

    #[tokio::test]
    async fn test_locked_descendant_blocks_rename() {
        let mut ws = seeded().await;
        ws.set_locked("/src/App.jsx", true).await.unwrap();
        let before = ws.tree().clone();
        let err = ws.rename_node("/src", "lib").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NodeLocked);
        let err = ws.move_node("/src", "/public").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NodeLocked);
        assert_eq!(ws.tree(), &before);
    }

    #[tokio::test]
    async fn test_validation_errors_skip_store() {
        let mut ws = seeded().await;
        ws.store().set_fail_writes(true);
        // Rejected before any write is attempted
        let err = ws
            .create_node("/src", "App.jsx", NodeType::File)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PathExists);
    }

    #[tokio::test]
    async fn test_write_file_modes() {
        let mut ws = seeded().await;
        assert_eq!(
            ws.write_file("/src/notes.txt", "one", RedirectMode::Append)
                .await
                .unwrap(),
            1
        );
        ws.write_file("/src/notes.txt", "two", RedirectMode::Append)
            .await
            .unwrap();
        let node = ws.tree().lookup("/src/notes.txt").unwrap();
        assert_eq!(node.content(), Some("one\ntwo"));
        assert_eq!(node.version(), Some(2));

        ws.write_file("/src/notes.txt", "reset", RedirectMode::Truncate)
            .await
            .unwrap();
        assert_eq!(
            ws.tree().lookup("/src/notes.txt").unwrap().content(),
            Some("reset")
        );

        ws.create_node("/src", "empty.txt", NodeType::File)
            .await
            .unwrap();
        ws.write_file("/src/empty.txt", "x", RedirectMode::Append)
            .await
            .unwrap();
        assert_eq!(
            ws.tree().lookup("/src/empty.txt").unwrap().content(),
            Some("\nx")
        );

        let err = ws
            .write_file("/src", "x", RedirectMode::Truncate)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotAFile);
        let err = ws
            .write_file("/nowhere/x.txt", "x", RedirectMode::Truncate)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PathNotFound);
    }

    #[tokio::test]
    async fn test_import_replaces_tree() {
        let mut ws = seeded().await;
        ws.import_json(r#"[{"name": "docs", "type": "folder", "children": []}]"#)
            .await
            .unwrap();
        assert_eq!(ws.tree().len(), 1);
        assert_eq!(ws.store().record_count(), 1);

        let err = ws.import_json("[1, 2]").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidWorkspace);
        assert!(ws.tree().lookup("/docs").is_some());
    }

    #[tokio::test]
    async fn test_locked_node() {
        let mut ws = seeded().await;
        ws.set_locked("/package.json", true).await.unwrap();
        let err = ws.delete_node("/package.json").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NodeLocked);
        let err = ws
            .convert_node("/package.json", NodeType::Folder)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NodeLocked);
        ws.set_locked("/package.json", false).await.unwrap();
        ws.delete_node("/package.json").await.unwrap();
    }
}
