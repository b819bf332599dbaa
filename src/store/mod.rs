//! Remote store abstractions.
//!
//! Defines the `DocumentStore`, `Identity`, and `BlobStore` traits and
//! provides implementations for:
//! - REST (hosted BaaS document API) — production backend
//! - Memory — in-process backend for tests and local development
//!
//! The engine never talks to a concrete backend directly; it goes through
//! the typed `Ledger` repository built on `DocumentStore`.

pub mod ledger;
pub mod memory;
pub mod rest;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;

pub use ledger::Ledger;
pub use memory::MemoryStore;
pub use rest::RestStore;

// ---------------------------------------------------------------------------
// Documents and queries
// ---------------------------------------------------------------------------

/// A raw document as held by the remote store.
#[derive(Debug, Clone)]
pub struct Document {
    pub id: String,
    pub created_at: DateTime<Utc>,
    /// All non-system fields, as a JSON object.
    pub fields: Value,
}

impl Document {
    /// Deserialize the document into a typed record, injecting the system
    /// `id` and `createdAt` fields so domain types can carry them.
    pub fn into_typed<T: serde::de::DeserializeOwned>(self) -> Result<T> {
        let mut fields = self.fields;
        if let Value::Object(ref mut map) = fields {
            map.insert("id".to_string(), Value::String(self.id));
            map.entry("createdAt")
                .or_insert_with(|| Value::String(self.created_at.to_rfc3339()));
        }
        Ok(serde_json::from_value(fields)?)
    }
}

/// A page of documents plus the total match count.
#[derive(Debug, Clone, Default)]
pub struct DocumentPage {
    pub total: u64,
    pub documents: Vec<Document>,
}

impl DocumentPage {
    /// Deserialize every document in the page.
    pub fn into_typed<T: serde::de::DeserializeOwned>(self) -> Result<Vec<T>> {
        self.documents.into_iter().map(Document::into_typed).collect()
    }
}

/// Filter/ordering spec for `DocumentStore::list`.
///
/// Only the shapes the platform actually needs: equality filters, a single
/// descending order-by, and a result limit.
#[derive(Debug, Clone, Default)]
pub struct Query {
    pub equals: Vec<(String, Value)>,
    pub order_desc: Option<String>,
    pub limit: Option<u32>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn equal(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.equals.push((field.to_string(), value.into()));
        self
    }

    pub fn order_desc(mut self, field: &str) -> Self {
        self.order_desc = Some(field.to_string());
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }
}

// ---------------------------------------------------------------------------
// Store traits
// ---------------------------------------------------------------------------

/// Abstraction over the remote document store.
///
/// No multi-document transaction primitive is assumed; callers that need
/// cross-document consistency must sequence writes themselves (see
/// `engine::reconciler`).
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// List documents in a collection matching the query.
    async fn list(&self, collection: &str, query: &Query) -> Result<DocumentPage>;

    /// Create a document with the given id and fields.
    async fn create(&self, collection: &str, id: &str, fields: Value) -> Result<Document>;

    /// Patch an existing document's fields.
    async fn update(&self, collection: &str, id: &str, fields: Value) -> Result<Document>;

    /// Backend name for logging.
    fn name(&self) -> &str;
}

/// The authenticated user behind a session token.
#[derive(Debug, Clone)]
pub struct SessionUser {
    pub id: String,
    pub email: String,
    pub roles: Vec<String>,
}

impl SessionUser {
    pub fn is_admin(&self) -> bool {
        self.roles.iter().any(|r| r == "admin")
    }
}

/// Session/identity provider. The session token is threaded explicitly into
/// every call; there is no ambient current-user global.
#[async_trait]
pub trait Identity: Send + Sync {
    async fn current_user(&self, session_token: &str) -> Result<SessionUser>;
}

/// Reference to an uploaded blob.
#[derive(Debug, Clone)]
pub struct FileRef {
    pub id: String,
    pub url: String,
}

/// Blob storage for deposit receipts and KYC images. Consumed by the request
/// flows, never by the reconciliation engine itself.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn upload(&self, bucket: &str, id: &str, bytes: Vec<u8>) -> Result<FileRef>;
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
