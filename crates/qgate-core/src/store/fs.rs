use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use fs2::FileExt;
use tempfile::NamedTempFile;

use super::{digest_bytes, DocumentStore, GateDocument};
use crate::domain::Result;
use crate::obs;

/// File-backed gate document.
///
/// Layout: `<path>` holds the JSON document, `<path>.lock` is the advisory
/// lock file. Writers take an exclusive `flock` on the lock file (plus an
/// in-process mutex) for the whole load -> mutate -> save cycle; readers take
/// a shared one. Saves go through a temp file in the same directory followed
/// by a rename, so a crash never leaves a partially written document.
pub struct FsDocumentStore {
    path: PathBuf,
    lock_path: PathBuf,
    guard: Mutex<()>,
}

impl FsDocumentStore {
    /// Open the store at `path`, creating parent directories if needed.
    /// The document itself is created on the first successful write.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let mut lock_name = path.as_os_str().to_os_string();
        lock_name.push(".lock");
        Ok(Self {
            lock_path: PathBuf::from(lock_name),
            path,
            guard: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn open_lock(&self) -> Result<File> {
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&self.lock_path)?;
        Ok(file)
    }

    fn read_document(&self) -> Result<GateDocument> {
        match fs::read(&self.path) {
            Ok(bytes) => GateDocument::from_json_slice(&bytes, &self.path),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(GateDocument::default()),
            Err(e) => Err(e.into()),
        }
    }

    /// Atomically replace the document. Returns the digest of the bytes written.
    fn write_document(&self, doc: &GateDocument) -> Result<String> {
        let bytes = doc.to_json_bytes()?;
        let digest = digest_bytes(&bytes);
        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };

        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(&bytes)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| e.error)?;
        Ok(digest)
    }
}

impl DocumentStore for FsDocumentStore {
    fn load(&self) -> Result<GateDocument> {
        let lock = self.open_lock()?;
        FileExt::lock_shared(&lock)?;
        let doc = self.read_document();
        drop(lock);
        doc
    }

    fn transact<T, F>(&self, op: F) -> Result<T>
    where
        F: FnOnce(&mut GateDocument) -> Result<T>,
    {
        // The mutex guards no data, so a poisoned lock is still usable.
        let _guard = self.guard.lock().unwrap_or_else(|p| p.into_inner());
        let lock = self.open_lock()?;
        FileExt::lock_exclusive(&lock)?;

        let mut doc = self.read_document()?;
        let before = doc.clone();
        let out = op(&mut doc)?;
        if doc != before {
            let digest = self.write_document(&doc)?;
            obs::emit_state_saved(&self.path, &digest);
        }
        drop(lock);
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Change, QualityGateError};
    use chrono::Utc;
    use tracing_test::traced_test;

    fn make_store() -> (tempfile::TempDir, FsDocumentStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = FsDocumentStore::new(dir.path().join("gates").join("state.json")).unwrap();
        (dir, store)
    }

    fn insert_change(doc: &mut GateDocument) -> Result<String> {
        let change = Change::new(doc.next_change_seq(), "t", "d", "a", Utc::now());
        let id = change.change_id.clone();
        doc.changes.insert(id.clone(), change);
        Ok(id)
    }

    #[test]
    fn missing_file_loads_empty_document() {
        let (_dir, store) = make_store();
        assert_eq!(store.load().unwrap(), GateDocument::default());
        assert!(!store.path().exists());
    }

    #[test]
    fn transaction_persists_on_success() {
        let (_dir, store) = make_store();
        let id = store.transact(insert_change).unwrap();
        let doc = store.load().unwrap();
        assert!(doc.changes.contains_key(&id));
        assert!(store.path().exists());
    }

    #[test]
    fn failed_transaction_leaves_file_untouched() {
        let (_dir, store) = make_store();
        store.transact(insert_change).unwrap();
        let before = fs::read(store.path()).unwrap();

        let err = store
            .transact(|doc| -> Result<()> {
                insert_change(doc)?;
                Err(QualityGateError::MissingField("title"))
            })
            .unwrap_err();
        assert!(matches!(err, QualityGateError::MissingField("title")));
        assert_eq!(fs::read(store.path()).unwrap(), before);
    }

    #[test]
    fn corrupt_document_fails_loudly_and_is_preserved() {
        let (_dir, store) = make_store();
        fs::write(store.path(), b"{\"changes\": [").unwrap();

        assert!(matches!(
            store.load(),
            Err(QualityGateError::CorruptState { .. })
        ));
        assert!(matches!(
            store.transact(insert_change),
            Err(QualityGateError::CorruptState { .. })
        ));
        assert_eq!(fs::read(store.path()).unwrap(), b"{\"changes\": [");
    }

    #[traced_test]
    #[test]
    fn saved_digest_matches_persisted_bytes() {
        let (_dir, store) = make_store();
        store.transact(insert_change).unwrap();
        let on_disk = digest_bytes(&fs::read(store.path()).unwrap());
        assert_eq!(on_disk, store.load().unwrap().digest().unwrap());
        assert!(logs_contain("state.saved"));
        assert!(logs_contain(&on_disk));
    }

    #[test]
    fn no_op_transaction_does_not_create_file() {
        let (_dir, store) = make_store();
        store.transact(|_doc| Ok(())).unwrap();
        assert!(!store.path().exists());
    }

    #[test]
    fn no_temp_files_left_behind() {
        let (_dir, store) = make_store();
        for _ in 0..3 {
            store.transact(insert_change).unwrap();
        }
        let parent = store.path().parent().unwrap();
        let mut names: Vec<String> = fs::read_dir(parent)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        assert_eq!(names, vec!["state.json", "state.json.lock"]);
    }
}
