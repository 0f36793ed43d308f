use std::sync::Mutex;

use super::{DocumentStore, GateDocument};
use crate::domain::Result;

/// In-memory gate document for tests and in-process embedding.
#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    doc: Mutex<GateDocument>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_document(doc: GateDocument) -> Self {
        Self {
            doc: Mutex::new(doc),
        }
    }
}

impl DocumentStore for MemoryDocumentStore {
    fn load(&self) -> Result<GateDocument> {
        let doc = self.doc.lock().unwrap_or_else(|p| p.into_inner());
        Ok(doc.clone())
    }

    fn transact<T, F>(&self, op: F) -> Result<T>
    where
        F: FnOnce(&mut GateDocument) -> Result<T>,
    {
        let mut doc = self.doc.lock().unwrap_or_else(|p| p.into_inner());
        let mut working = doc.clone();
        let out = op(&mut working)?;
        *doc = working;
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Change, QualityGateError};
    use chrono::Utc;

    #[test]
    fn failed_transaction_discards_changes() {
        let store = MemoryDocumentStore::new();
        let err = store
            .transact(|doc| -> Result<()> {
                let c = Change::new(1, "t", "d", "a", Utc::now());
                doc.changes.insert(c.change_id.clone(), c);
                Err(QualityGateError::MissingField("title"))
            })
            .unwrap_err();
        assert!(matches!(err, QualityGateError::MissingField(_)));
        assert!(store.load().unwrap().changes.is_empty());
    }

    #[test]
    fn successful_transaction_is_visible() {
        let store = MemoryDocumentStore::new();
        store
            .transact(|doc| {
                let c = Change::new(1, "t", "d", "a", Utc::now());
                doc.changes.insert(c.change_id.clone(), c);
                Ok(())
            })
            .unwrap();
        assert_eq!(store.load().unwrap().changes.len(), 1);
    }
}
