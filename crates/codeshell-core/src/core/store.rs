//! Persistence contract and record model.
//!
//! The tree is stored flat: one [`FolderRecord`] per folder and one
//! [`FileRecord`] per file, each carrying its path and its position among its
//! siblings. [`RecordSet::diff`] turns two snapshots of a tree into the
//! [`StoreOp`]s that bring a store from one to the other, and
//! [`rebuild_tree`] turns the records back into a tree.
//!
//! [`MemoryStore`] is the in-process implementation. Hosts plug in their own
//! backend (IndexedDB, a JSON file) by implementing [`PersistenceStore`].

use std::collections::BTreeMap;
#[cfg(any(test, feature = "mock"))]
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use super::error::PersistenceError;
use super::filesystem::VirtualFileTree;
use super::path;
use crate::models::{FileNode, FileRevision, NodeKind};

// =============================================================================
// Records
// =============================================================================

/// Stored form of a file node.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRecord {
    pub id: String,
    pub name: String,
    pub path: String,
    /// Index among its siblings
    #[serde(default)]
    pub position: usize,
    #[serde(default)]
    pub is_locked: bool,
    #[serde(default)]
    pub is_starred: bool,
    pub content: String,
    pub language: String,
    pub version: u32,
    #[serde(default)]
    pub history: Vec<FileRevision>,
}

/// Stored form of a folder node (children are separate records).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderRecord {
    pub id: String,
    pub name: String,
    pub path: String,
    #[serde(default)]
    pub position: usize,
    #[serde(default)]
    pub is_locked: bool,
    #[serde(default)]
    pub is_starred: bool,
    #[serde(default)]
    pub is_open: bool,
}

/// A single store write.
#[derive(Clone, Debug, PartialEq)]
pub enum StoreOp {
    SaveFile(FileRecord),
    SaveFolder(FolderRecord),
    /// Delete the file stored at this path
    DeleteFile(String),
    /// Delete the folder with this id
    DeleteFolder(String),
}

/// Every record of a tree, keyed by path.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RecordSet {
    pub files: BTreeMap<String, FileRecord>,
    pub folders: BTreeMap<String, FolderRecord>,
}

impl RecordSet {
    pub fn from_tree(tree: &VirtualFileTree) -> Self {
        let mut set = Self::default();
        set.collect(tree.roots());
        set
    }

    /// Records as listed by a store.
    pub fn from_records(folders: Vec<FolderRecord>, files: Vec<FileRecord>) -> Self {
        Self {
            files: files.into_iter().map(|r| (r.path.clone(), r)).collect(),
            folders: folders.into_iter().map(|r| (r.path.clone(), r)).collect(),
        }
    }

    /// Mirror one operation the store has accepted.
    pub fn apply(&mut self, op: &StoreOp) {
        match op {
            StoreOp::SaveFile(record) => {
                self.files.insert(record.path.clone(), record.clone());
            }
            StoreOp::SaveFolder(record) => {
                self.folders.insert(record.path.clone(), record.clone());
            }
            StoreOp::DeleteFile(path) => {
                self.files.remove(path);
            }
            StoreOp::DeleteFolder(id) => self.folders.retain(|_, record| record.id != *id),
        }
    }

    fn collect(&mut self, nodes: &[FileNode]) {
        for (position, node) in nodes.iter().enumerate() {
            match &node.kind {
                NodeKind::File {
                    content,
                    language,
                    version,
                    history,
                } => {
                    self.files.insert(
                        node.path.clone(),
                        FileRecord {
                            id: node.id.clone(),
                            name: node.name.clone(),
                            path: node.path.clone(),
                            position,
                            is_locked: node.is_locked,
                            is_starred: node.is_starred,
                            content: content.clone(),
                            language: language.clone(),
                            version: *version,
                            history: history.clone(),
                        },
                    );
                }
                NodeKind::Folder { children, is_open } => {
                    self.folders.insert(
                        node.path.clone(),
                        FolderRecord {
                            id: node.id.clone(),
                            name: node.name.clone(),
                            path: node.path.clone(),
                            position,
                            is_locked: node.is_locked,
                            is_starred: node.is_starred,
                            is_open: *is_open,
                        },
                    );
                    self.collect(children);
                }
            }
        }
    }

    /// Operations turning a store holding `self` into one holding `next`.
    ///
    /// Deletes come first so that a folder keeping its id under a new path
    /// (rename, move) is re-saved after its old record is gone.
    pub fn diff(&self, next: &RecordSet) -> Vec<StoreOp> {
        let mut ops = Vec::new();

        for path in self.files.keys() {
            if !next.files.contains_key(path) {
                ops.push(StoreOp::DeleteFile(path.clone()));
            }
        }
        for (path, old) in &self.folders {
            let kept = next.folders.get(path).is_some_and(|new| new.id == old.id);
            if !kept {
                ops.push(StoreOp::DeleteFolder(old.id.clone()));
            }
        }

        for (path, new) in &next.folders {
            let unchanged = self.folders.get(path).is_some_and(|old| old == new);
            if !unchanged {
                ops.push(StoreOp::SaveFolder(new.clone()));
            }
        }
        for (path, new) in &next.files {
            if self.files.get(path) != Some(new) {
                ops.push(StoreOp::SaveFile(new.clone()));
            }
        }

        ops
    }

    /// Every record as a save operation (used to seed or replace a store).
    pub fn save_all(&self) -> Vec<StoreOp> {
        let folders = self.folders.values().cloned().map(StoreOp::SaveFolder);
        let files = self.files.values().cloned().map(StoreOp::SaveFile);
        folders.chain(files).collect()
    }
}

/// Rebuild a tree from flat records.
///
/// Records are placed parents first, siblings in stored position order.
/// Records whose parent is missing or whose name clashes are skipped.
pub fn rebuild_tree(folders: Vec<FolderRecord>, files: Vec<FileRecord>) -> VirtualFileTree {
    let mut entries: Vec<(String, usize, FileNode)> =
        Vec::with_capacity(folders.len() + files.len());

    for record in folders {
        let node = FileNode {
            id: record.id,
            name: record.name,
            path: record.path.clone(),
            is_locked: record.is_locked,
            is_starred: record.is_starred,
            kind: NodeKind::Folder {
                children: Vec::new(),
                is_open: record.is_open,
            },
        };
        entries.push((record.path, record.position, node));
    }
    for record in files {
        let node = FileNode {
            id: record.id,
            name: record.name,
            path: record.path.clone(),
            is_locked: record.is_locked,
            is_starred: record.is_starred,
            kind: NodeKind::File {
                content: record.content,
                language: record.language,
                version: record.version,
                history: record.history,
            },
        };
        entries.push((record.path, record.position, node));
    }

    entries.sort_by(|(a, a_pos, _), (b, b_pos, _)| {
        path::depth(a)
            .cmp(&path::depth(b))
            .then_with(|| path::parent(a).cmp(&path::parent(b)))
            .then_with(|| a_pos.cmp(b_pos))
            .then_with(|| a.cmp(b))
    });

    let mut tree = VirtualFileTree::new();
    for (record_path, _, node) in entries {
        let parent = path::parent(&record_path);
        if let Err(e) = tree.insert(&parent, node) {
            tracing::warn!(path = %record_path, error = %e, "skipping stored record");
        }
    }
    tree
}

// =============================================================================
// Store Contract
// =============================================================================

/// Async key-value store holding tree records and session command logs.
#[async_trait]
pub trait PersistenceStore: Send + Sync {
    async fn get_file(&self, path: &str) -> Result<Option<FileRecord>, PersistenceError>;
    async fn save_file(&self, record: &FileRecord) -> Result<(), PersistenceError>;
    async fn delete_file(&self, path: &str) -> Result<(), PersistenceError>;

    async fn get_folder(&self, path: &str) -> Result<Option<FolderRecord>, PersistenceError>;
    async fn save_folder(&self, record: &FolderRecord) -> Result<(), PersistenceError>;
    async fn delete_folder(&self, id: &str) -> Result<(), PersistenceError>;

    async fn list_all_folders(&self) -> Result<Vec<FolderRecord>, PersistenceError>;
    async fn list_all_files(&self) -> Result<Vec<FileRecord>, PersistenceError>;

    async fn load_command_log(&self, session_id: &str) -> Result<Vec<String>, PersistenceError>;
    async fn save_command_log(
        &self,
        session_id: &str,
        log: &[String],
    ) -> Result<(), PersistenceError>;
    async fn delete_command_log(&self, session_id: &str) -> Result<(), PersistenceError>;
}

/// Issue `ops` in order, stopping at the first failure.
///
/// Operations issued before the failure stay applied, and each accepted
/// operation is recorded in `persisted`, which therefore always matches
/// what the store holds.
pub async fn apply_ops<S>(
    store: &S,
    ops: &[StoreOp],
    persisted: &mut RecordSet,
) -> Result<(), PersistenceError>
where
    S: PersistenceStore + ?Sized,
{
    for op in ops {
        match op {
            StoreOp::SaveFile(record) => store.save_file(record).await?,
            StoreOp::SaveFolder(record) => store.save_folder(record).await?,
            StoreOp::DeleteFile(path) => store.delete_file(path).await?,
            StoreOp::DeleteFolder(id) => store.delete_folder(id).await?,
        }
        persisted.apply(op);
    }
    Ok(())
}

// =============================================================================
// MemoryStore
// =============================================================================

/// Serializable contents of a [`MemoryStore`].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreSnapshot {
    #[serde(default)]
    pub folders: Vec<FolderRecord>,
    #[serde(default)]
    pub files: Vec<FileRecord>,
    #[serde(default)]
    pub command_logs: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Default)]
struct Tables {
    files: BTreeMap<String, FileRecord>,
    folders: BTreeMap<String, FolderRecord>,
    command_logs: BTreeMap<String, Vec<String>>,
}

/// In-memory [`PersistenceStore`].
#[derive(Debug)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    /// Remaining writes before failures start (`usize::MAX`: never)
    #[cfg(any(test, feature = "mock"))]
    write_budget: AtomicUsize,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self {
            tables: Mutex::new(Tables::default()),
            #[cfg(any(test, feature = "mock"))]
            write_budget: AtomicUsize::new(usize::MAX),
        }
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: StoreSnapshot) -> Self {
        let store = Self::default();
        {
            let mut tables = store.tables.lock();
            for record in snapshot.folders {
                tables.folders.insert(record.path.clone(), record);
            }
            for record in snapshot.files {
                tables.files.insert(record.path.clone(), record);
            }
            tables.command_logs = snapshot.command_logs;
        }
        store
    }

    pub fn to_snapshot(&self) -> StoreSnapshot {
        let tables = self.tables.lock();
        StoreSnapshot {
            folders: tables.folders.values().cloned().collect(),
            files: tables.files.values().cloned().collect(),
            command_logs: tables.command_logs.clone(),
        }
    }

    /// Number of stored file and folder records.
    pub fn record_count(&self) -> usize {
        let tables = self.tables.lock();
        tables.files.len() + tables.folders.len()
    }

    /// Make every following write fail (or succeed again).
    #[cfg(any(test, feature = "mock"))]
    pub fn set_fail_writes(&self, fail: bool) {
        let budget = if fail { 0 } else { usize::MAX };
        self.write_budget.store(budget, Ordering::SeqCst);
    }

    /// Let `writes` more writes succeed, then fail the rest.
    #[cfg(any(test, feature = "mock"))]
    pub fn fail_after_writes(&self, writes: usize) {
        self.write_budget.store(writes, Ordering::SeqCst);
    }

    fn check_write(&self) -> Result<(), PersistenceError> {
        #[cfg(any(test, feature = "mock"))]
        {
            let allowed = self
                .write_budget
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |budget| match budget {
                    usize::MAX => Some(budget),
                    0 => None,
                    n => Some(n - 1),
                })
                .is_ok();
            if !allowed {
                return Err(PersistenceError::Backend("injected write failure".to_string()));
            }
        }
        Ok(())
    }
}

#[async_trait]
impl PersistenceStore for MemoryStore {
    async fn get_file(&self, path: &str) -> Result<Option<FileRecord>, PersistenceError> {
        Ok(self.tables.lock().files.get(path).cloned())
    }

    async fn save_file(&self, record: &FileRecord) -> Result<(), PersistenceError> {
        self.check_write()?;
        self.tables
            .lock()
            .files
            .insert(record.path.clone(), record.clone());
        Ok(())
    }

    async fn delete_file(&self, path: &str) -> Result<(), PersistenceError> {
        self.check_write()?;
        self.tables.lock().files.remove(path);
        Ok(())
    }

    async fn get_folder(&self, path: &str) -> Result<Option<FolderRecord>, PersistenceError> {
        Ok(self.tables.lock().folders.get(path).cloned())
    }

    async fn save_folder(&self, record: &FolderRecord) -> Result<(), PersistenceError> {
        self.check_write()?;
        self.tables
            .lock()
            .folders
            .insert(record.path.clone(), record.clone());
        Ok(())
    }

    async fn delete_folder(&self, id: &str) -> Result<(), PersistenceError> {
        self.check_write()?;
        self.tables.lock().folders.retain(|_, record| record.id != id);
        Ok(())
    }

    async fn list_all_folders(&self) -> Result<Vec<FolderRecord>, PersistenceError> {
        Ok(self.tables.lock().folders.values().cloned().collect())
    }

    async fn list_all_files(&self) -> Result<Vec<FileRecord>, PersistenceError> {
        Ok(self.tables.lock().files.values().cloned().collect())
    }

    async fn load_command_log(&self, session_id: &str) -> Result<Vec<String>, PersistenceError> {
        Ok(self
            .tables
            .lock()
            .command_logs
            .get(session_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn save_command_log(
        &self,
        session_id: &str,
        log: &[String],
    ) -> Result<(), PersistenceError> {
        self.check_write()?;
        self.tables
            .lock()
            .command_logs
            .insert(session_id.to_string(), log.to_vec());
        Ok(())
    }

    async fn delete_command_log(&self, session_id: &str) -> Result<(), PersistenceError> {
        self.check_write()?;
        self.tables.lock().command_logs.remove(session_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_tree() -> VirtualFileTree {
        let mut tree = VirtualFileTree::new();
        tree.insert("/", FileNode::folder("src", "/")).unwrap();
        tree.insert("/src", FileNode::file_with_content("b.js", "/", "b"))
            .unwrap();
        tree.insert("/src", FileNode::file_with_content("a.js", "/", "a"))
            .unwrap();
        tree.insert("/", FileNode::file("README.md", "/")).unwrap();
        tree
    }

    #[test]
    fn test_record_positions() {
        let set = RecordSet::from_tree(&sample_tree());
        assert_eq!(set.files["/src/b.js"].position, 0);
        assert_eq!(set.files["/src/a.js"].position, 1);
        assert_eq!(set.folders["/src"].position, 0);
        assert_eq!(set.files["/README.md"].position, 1);
    }

    #[test]
    fn test_rebuild_preserves_order() {
        let tree = sample_tree();
        let set = RecordSet::from_tree(&tree);
        let rebuilt = rebuild_tree(
            set.folders.into_values().collect(),
            set.files.into_values().collect(),
        );
        assert_eq!(rebuilt, tree);
    }

    #[test]
    fn test_rebuild_skips_orphans() {
        let mut set = RecordSet::from_tree(&sample_tree());
        let mut orphan = set.files["/src/a.js"].clone();
        orphan.path = "/missing/a.js".to_string();
        set.files.insert(orphan.path.clone(), orphan);
        let rebuilt = rebuild_tree(
            set.folders.into_values().collect(),
            set.files.into_values().collect(),
        );
        assert_eq!(rebuilt.len(), 4);
        assert!(rebuilt.lookup("/missing/a.js").is_none());
    }

    #[test]
    fn test_diff_rename_folder() {
        let before = sample_tree();
        let mut after = before.clone();
        after.rename("/src", "lib").unwrap();

        let ops = RecordSet::from_tree(&before).diff(&RecordSet::from_tree(&after));
        let id = before.lookup("/src").unwrap().id.clone();
        assert!(ops.contains(&StoreOp::DeleteFolder(id)));
        assert!(ops.contains(&StoreOp::DeleteFile("/src/a.js".to_string())));
        let first_save = ops
            .iter()
            .position(|op| matches!(op, StoreOp::SaveFile(_) | StoreOp::SaveFolder(_)))
            .unwrap();
        assert!(ops[..first_save]
            .iter()
            .all(|op| matches!(op, StoreOp::DeleteFile(_) | StoreOp::DeleteFolder(_))));
        assert_eq!(ops.len(), 6);
    }

    #[test]
    fn test_diff_unchanged_is_empty() {
        let tree = sample_tree();
        let set = RecordSet::from_tree(&tree);
        assert!(set.diff(&set.clone()).is_empty());
    }

    #[tokio::test]
    async fn test_memory_store_roundtrip_through_ops() {
        let store = MemoryStore::new();
        let tree = sample_tree();
        let mut persisted = RecordSet::default();
        apply_ops(&store, &RecordSet::from_tree(&tree).save_all(), &mut persisted)
            .await
            .unwrap();
        assert_eq!(store.record_count(), 4);
        assert_eq!(persisted, RecordSet::from_tree(&tree));
        assert!(store.get_folder("/src").await.unwrap().is_some());

        let rebuilt = rebuild_tree(
            store.list_all_folders().await.unwrap(),
            store.list_all_files().await.unwrap(),
        );
        assert_eq!(rebuilt, tree);
    }

    #[tokio::test]
    async fn test_injected_failures() {
        let store = MemoryStore::new();
        let tree = sample_tree();
        store.fail_after_writes(2);
        let mut persisted = RecordSet::default();
        let err = apply_ops(&store, &RecordSet::from_tree(&tree).save_all(), &mut persisted)
            .await
            .unwrap_err();
        assert!(matches!(err, PersistenceError::Backend(_)));
        assert_eq!(store.record_count(), 2);
        let listed = RecordSet::from_records(
            store.list_all_folders().await.unwrap(),
            store.list_all_files().await.unwrap(),
        );
        assert_eq!(persisted, listed);

        store.set_fail_writes(false);
        store
            .save_command_log("t1", &["ls".to_string()])
            .await
            .unwrap();
        assert_eq!(store.load_command_log("t1").await.unwrap(), vec!["ls"]);
        store.delete_command_log("t1").await.unwrap();
        assert!(store.load_command_log("t1").await.unwrap().is_empty());
    }

    #[test]
    fn test_snapshot() {
        let snapshot = StoreSnapshot {
            command_logs: BTreeMap::from([("t1".to_string(), vec!["pwd".to_string()])]),
            ..StoreSnapshot::default()
        };
        let store = MemoryStore::from_snapshot(snapshot.clone());
        assert_eq!(store.to_snapshot(), snapshot);
    }
}
