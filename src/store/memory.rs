//! In-memory document store.
//!
//! Deterministic `DocumentStore` backend used by integration tests and the
//! `memory` backend for local development. All state is in-process; a forced
//! error hook lets tests exercise partial-write behavior.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use super::{Document, DocumentPage, DocumentStore, Query};

const BACKEND_NAME: &str = "memory";

/// In-memory collection map. Cloning shares the underlying state.
#[derive(Clone, Default)]
pub struct MemoryStore {
    collections: Arc<Mutex<HashMap<String, Vec<Document>>>>,
    /// If set, all operations return this error until cleared.
    force_error: Arc<Mutex<Option<String>>>,
    /// If set, fail only writes to this collection. Lets tests break a
    /// specific step of a multi-write sequence.
    fail_collection: Arc<Mutex<Option<String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Force all subsequent operations to return an error.
    pub fn set_error(&self, msg: &str) {
        *self.force_error.lock().unwrap() = Some(msg.to_string());
    }

    /// Clear any forced error.
    pub fn clear_error(&self) {
        *self.force_error.lock().unwrap() = None;
    }

    /// Fail writes to a single collection only.
    pub fn fail_writes_to(&self, collection: &str) {
        *self.fail_collection.lock().unwrap() = Some(collection.to_string());
    }

    pub fn clear_write_failures(&self) {
        *self.fail_collection.lock().unwrap() = None;
    }

    /// Number of documents currently held in a collection.
    pub fn count(&self, collection: &str) -> usize {
        self.collections
            .lock()
            .unwrap()
            .get(collection)
            .map(|docs| docs.len())
            .unwrap_or(0)
    }

    fn check_forced_error(&self) -> Result<()> {
        if let Some(msg) = self.force_error.lock().unwrap().as_ref() {
            return Err(anyhow!("{msg}"));
        }
        Ok(())
    }

    fn check_write_allowed(&self, collection: &str) -> Result<()> {
        self.check_forced_error()?;
        if let Some(blocked) = self.fail_collection.lock().unwrap().as_ref() {
            if blocked == collection {
                return Err(anyhow!("Write to {collection} failed (forced)"));
            }
        }
        Ok(())
    }

    fn matches(doc: &Document, query: &Query) -> bool {
        query.equals.iter().all(|(field, value)| {
            doc.fields.get(field).map(|v| v == value).unwrap_or(false)
        })
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn list(&self, collection: &str, query: &Query) -> Result<DocumentPage> {
        self.check_forced_error()?;

        let collections = self.collections.lock().unwrap();
        let mut matched: Vec<Document> = collections
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .filter(|d| Self::matches(d, query))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        // Only createdAt ordering is supported, matching the backend's use.
        if query.order_desc.is_some() {
            matched.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        }

        let total = matched.len() as u64;
        if let Some(limit) = query.limit {
            matched.truncate(limit as usize);
        }

        Ok(DocumentPage {
            total,
            documents: matched,
        })
    }

    async fn create(&self, collection: &str, id: &str, fields: Value) -> Result<Document> {
        self.check_write_allowed(collection)?;

        let doc = Document {
            id: id.to_string(),
            created_at: Utc::now(),
            fields,
        };

        let mut collections = self.collections.lock().unwrap();
        let docs = collections.entry(collection.to_string()).or_default();
        if docs.iter().any(|d| d.id == id) {
            return Err(anyhow!("Document {id} already exists in {collection}"));
        }
        docs.push(doc.clone());
        Ok(doc)
    }

    async fn update(&self, collection: &str, id: &str, fields: Value) -> Result<Document> {
        self.check_write_allowed(collection)?;

        let mut collections = self.collections.lock().unwrap();
        let docs = collections
            .get_mut(collection)
            .ok_or_else(|| anyhow!("Unknown collection: {collection}"))?;
        let doc = docs
            .iter_mut()
            .find(|d| d.id == id)
            .ok_or_else(|| anyhow!("Document not found: {collection}/{id}"))?;

        if let (Value::Object(existing), Value::Object(patch)) = (&mut doc.fields, fields) {
            for (k, v) in patch {
                existing.insert(k, v);
            }
        }

        Ok(doc.clone())
    }

    fn name(&self) -> &str {
        BACKEND_NAME
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_create_and_list() {
        let store = MemoryStore::new();
        store
            .create("profiles", "p1", json!({ "userId": "u1", "balance": 10.0 }))
            .await
            .unwrap();
        store
            .create("profiles", "p2", json!({ "userId": "u2", "balance": 20.0 }))
            .await
            .unwrap();

        let page = store
            .list("profiles", &Query::new().equal("userId", "u1"))
            .await
            .unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.documents[0].id, "p1");
    }

    #[tokio::test]
    async fn test_duplicate_id_rejected() {
        let store = MemoryStore::new();
        store.create("txs", "t1", json!({})).await.unwrap();
        assert!(store.create("txs", "t1", json!({})).await.is_err());
    }

    #[tokio::test]
    async fn test_update_merges_fields() {
        let store = MemoryStore::new();
        store
            .create("profiles", "p1", json!({ "balance": 10.0, "kycStatus": "pending" }))
            .await
            .unwrap();

        let doc = store
            .update("profiles", "p1", json!({ "balance": 25.0 }))
            .await
            .unwrap();
        assert_eq!(doc.fields["balance"], 25.0);
        assert_eq!(doc.fields["kycStatus"], "pending");
    }

    #[tokio::test]
    async fn test_update_missing_document_errors() {
        let store = MemoryStore::new();
        store.create("txs", "t1", json!({})).await.unwrap();
        assert!(store.update("txs", "nope", json!({})).await.is_err());
    }

    #[tokio::test]
    async fn test_list_limit_keeps_total() {
        let store = MemoryStore::new();
        for i in 0..5 {
            store
                .create("txs", &format!("t{i}"), json!({ "userId": "u1" }))
                .await
                .unwrap();
        }
        let page = store
            .list("txs", &Query::new().equal("userId", "u1").limit(2))
            .await
            .unwrap();
        assert_eq!(page.total, 5);
        assert_eq!(page.documents.len(), 2);
    }

    #[tokio::test]
    async fn test_forced_error() {
        let store = MemoryStore::new();
        store.set_error("store down");
        assert!(store.list("txs", &Query::new()).await.is_err());
        store.clear_error();
        assert!(store.list("txs", &Query::new()).await.is_ok());
    }

    #[tokio::test]
    async fn test_fail_single_collection() {
        let store = MemoryStore::new();
        store.fail_writes_to("notifications");
        assert!(store.create("txs", "t1", json!({})).await.is_ok());
        assert!(store.create("notifications", "n1", json!({})).await.is_err());
        store.clear_write_failures();
        assert!(store.create("notifications", "n1", json!({})).await.is_ok());
    }
}
