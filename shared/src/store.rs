//! Remote document store seam.
//!
//! The board only ever talks to a [`RemoteStore`]. [`MemoryStore`] keeps
//! everything in process and is what the HTTP server serves from.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::document::{Document, DocumentId, Fields};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("document {id} not found in `{collection}`")]
    NotFound { collection: String, id: DocumentId },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("store rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("malformed document: {0}")]
    Malformed(String),
}

/// Collections of schemaless documents addressed by name.
///
/// No ordering is promised across collections. Deleting a document that does
/// not exist succeeds.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Stores `fields` as a new document and returns the assigned id.
    async fn add_document(&self, collection: &str, fields: Fields)
        -> Result<DocumentId, StoreError>;

    async fn list_documents(&self, collection: &str) -> Result<Vec<Document>, StoreError>;

    /// Merges `fields` into an existing document.
    async fn update_document(
        &self,
        collection: &str,
        id: &DocumentId,
        fields: Fields,
    ) -> Result<(), StoreError>;

    async fn delete_document(&self, collection: &str, id: &DocumentId) -> Result<(), StoreError>;
}

/// In-process store. Documents keep insertion order within a collection.
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: Mutex<HashMap<String, Vec<Document>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_collections<R>(&self, f: impl FnOnce(&mut HashMap<String, Vec<Document>>) -> R) -> R {
        let mut collections = self
            .collections
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        f(&mut collections)
    }
}

#[async_trait]
impl RemoteStore for MemoryStore {
    async fn add_document(
        &self,
        collection: &str,
        fields: Fields,
    ) -> Result<DocumentId, StoreError> {
        let id = DocumentId::new(Uuid::new_v4().simple().to_string());
        self.with_collections(|collections| {
            collections
                .entry(collection.to_string())
                .or_default()
                .push(Document {
                    id: id.clone(),
                    fields,
                });
        });
        log::debug!("added {id} to {collection}");
        Ok(id)
    }

    async fn list_documents(&self, collection: &str) -> Result<Vec<Document>, StoreError> {
        Ok(self.with_collections(|collections| {
            collections.get(collection).cloned().unwrap_or_default()
        }))
    }

    async fn update_document(
        &self,
        collection: &str,
        id: &DocumentId,
        fields: Fields,
    ) -> Result<(), StoreError> {
        self.with_collections(|collections| {
            let document = collections
                .get_mut(collection)
                .and_then(|documents| documents.iter_mut().find(|doc| &doc.id == id))
                .ok_or_else(|| StoreError::NotFound {
                    collection: collection.to_string(),
                    id: id.clone(),
                })?;
            document.fields.extend(fields);
            Ok(())
        })
    }

    async fn delete_document(&self, collection: &str, id: &DocumentId) -> Result<(), StoreError> {
        let removed = self.with_collections(|collections| {
            collections.get_mut(collection).map_or(false, |documents| {
                let before = documents.len();
                documents.retain(|doc| &doc.id != id);
                documents.len() != before
            })
        });
        if !removed {
            log::debug!("delete of missing document {id} in {collection}");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn fields(value: Value) -> Fields {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn lists_in_insertion_order() {
        let store = MemoryStore::new();
        let first = store
            .add_document("todo", fields(json!({ "text": "one" })))
            .await
            .unwrap();
        let second = store
            .add_document("todo", fields(json!({ "text": "two" })))
            .await
            .unwrap();

        let ids: Vec<_> = store
            .list_documents("todo")
            .await
            .unwrap()
            .into_iter()
            .map(|doc| doc.id)
            .collect();
        assert_eq!(ids, vec![first, second]);
        assert!(store.list_documents("done").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn update_merges_fields() {
        let store = MemoryStore::new();
        let id = store
            .add_document("todo", fields(json!({ "text": "", "editable": true })))
            .await
            .unwrap();

        store
            .update_document("todo", &id, fields(json!({ "text": "buy milk" })))
            .await
            .unwrap();

        let docs = store.list_documents("todo").await.unwrap();
        assert_eq!(docs[0].fields["text"], json!("buy milk"));
        assert_eq!(docs[0].fields["editable"], json!(true));
    }

    #[tokio::test]
    async fn update_of_missing_document_is_not_found() {
        let store = MemoryStore::new();
        let err = store
            .update_document("todo", &DocumentId::from("nope"), Fields::new())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let store = MemoryStore::new();
        let id = store.add_document("done", Fields::new()).await.unwrap();

        store.delete_document("done", &id).await.unwrap();
        store.delete_document("done", &id).await.unwrap();
        store
            .delete_document("never-created", &id)
            .await
            .unwrap();

        assert!(store.list_documents("done").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn collections_are_independent() {
        let store = MemoryStore::new();
        let id = store.add_document("todo", Fields::new()).await.unwrap();

        store.delete_document("inProgress", &id).await.unwrap();

        assert_eq!(store.list_documents("todo").await.unwrap().len(), 1);
    }
}
