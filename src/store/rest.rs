//! Hosted document-store REST client.
//!
//! Talks to the platform's BaaS over its v1 HTTP API: per-collection CRUD
//! with equality/order-by queries, account lookup for session tokens, and
//! bucket uploads for receipts/KYC images.
//!
//! Auth: `X-Meridian-Project` identifies the project, `X-Meridian-Key` is
//! the server API key. Session lookups pass the user token instead.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use super::{BlobStore, Document, DocumentPage, DocumentStore, FileRef, Identity, Query, SessionUser};

const BACKEND_NAME: &str = "rest";

// ---------------------------------------------------------------------------
// API response types (store JSON → Rust)
// ---------------------------------------------------------------------------

/// A document as returned by the API. System fields are `$`-prefixed;
/// everything else lands in `fields`.
#[derive(Debug, Deserialize)]
struct DocumentEnvelope {
    #[serde(rename = "$id")]
    id: String,
    #[serde(rename = "$createdAt")]
    created_at: DateTime<Utc>,
    #[serde(flatten)]
    fields: Value,
}

impl From<DocumentEnvelope> for Document {
    fn from(env: DocumentEnvelope) -> Self {
        Document {
            id: env.id,
            created_at: env.created_at,
            fields: env.fields,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ListEnvelope {
    total: u64,
    documents: Vec<DocumentEnvelope>,
}

#[derive(Debug, Deserialize)]
struct AccountEnvelope {
    #[serde(rename = "$id")]
    id: String,
    email: String,
    #[serde(default)]
    labels: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct FileEnvelope {
    #[serde(rename = "$id")]
    id: String,
    url: String,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// REST implementation of the store traits.
pub struct RestStore {
    http: Client,
    base_url: String,
    project_id: String,
    api_key: String,
    database_id: String,
}

impl RestStore {
    pub fn new(
        base_url: &str,
        project_id: &str,
        api_key: &str,
        database_id: &str,
    ) -> Result<Self> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            project_id: project_id.to_string(),
            api_key: api_key.to_string(),
            database_id: database_id.to_string(),
        })
    }

    fn documents_url(&self, collection: &str) -> String {
        format!(
            "{}/v1/databases/{}/collections/{}/documents",
            self.base_url, self.database_id, collection,
        )
    }

    /// Serialize a `Query` into the API's query-string form.
    fn query_params(query: &Query) -> String {
        let mut parts: Vec<String> = Vec::new();
        for (field, value) in &query.equals {
            let rendered = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            parts.push(format!(
                "equal={}:{}",
                urlencoding::encode(field),
                urlencoding::encode(&rendered),
            ));
        }
        if let Some(field) = &query.order_desc {
            parts.push(format!("orderDesc={}", urlencoding::encode(field)));
        }
        if let Some(limit) = query.limit {
            parts.push(format!("limit={limit}"));
        }
        parts.join("&")
    }

    fn auth_headers(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        req.header("X-Meridian-Project", &self.project_id)
            .header("X-Meridian-Key", &self.api_key)
    }
}

#[async_trait]
impl DocumentStore for RestStore {
    async fn list(&self, collection: &str, query: &Query) -> Result<DocumentPage> {
        let mut url = self.documents_url(collection);
        let params = Self::query_params(query);
        if !params.is_empty() {
            url = format!("{url}?{params}");
        }

        let resp = self
            .auth_headers(self.http.get(&url))
            .send()
            .await
            .with_context(|| format!("List request failed for {collection}"))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("Store list failed {status}: {body}");
        }

        let list: ListEnvelope = resp
            .json()
            .await
            .with_context(|| format!("Failed to parse document list for {collection}"))?;

        debug!(
            collection,
            total = list.total,
            returned = list.documents.len(),
            "Documents listed"
        );

        Ok(DocumentPage {
            total: list.total,
            documents: list.documents.into_iter().map(Document::from).collect(),
        })
    }

    async fn create(&self, collection: &str, id: &str, fields: Value) -> Result<Document> {
        let body = serde_json::json!({
            "documentId": id,
            "data": fields,
        });

        let resp = self
            .auth_headers(self.http.post(self.documents_url(collection)))
            .json(&body)
            .send()
            .await
            .with_context(|| format!("Create request failed for {collection}"))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("Store create failed {status}: {body}");
        }

        let doc: DocumentEnvelope = resp
            .json()
            .await
            .with_context(|| format!("Failed to parse created document for {collection}"))?;

        debug!(collection, id = %doc.id, "Document created");
        Ok(doc.into())
    }

    async fn update(&self, collection: &str, id: &str, fields: Value) -> Result<Document> {
        let url = format!("{}/{}", self.documents_url(collection), id);
        let body = serde_json::json!({ "data": fields });

        let resp = self
            .auth_headers(self.http.patch(&url))
            .json(&body)
            .send()
            .await
            .with_context(|| format!("Update request failed for {collection}/{id}"))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("Store update failed {status}: {body}");
        }

        let doc: DocumentEnvelope = resp
            .json()
            .await
            .with_context(|| format!("Failed to parse updated document for {collection}/{id}"))?;

        debug!(collection, id = %doc.id, "Document updated");
        Ok(doc.into())
    }

    fn name(&self) -> &str {
        BACKEND_NAME
    }
}

#[async_trait]
impl Identity for RestStore {
    async fn current_user(&self, session_token: &str) -> Result<SessionUser> {
        let url = format!("{}/v1/account", self.base_url);

        let resp = self
            .http
            .get(&url)
            .header("X-Meridian-Project", &self.project_id)
            .header("X-Meridian-Session", session_token)
            .send()
            .await
            .context("Account lookup request failed")?;

        if !resp.status().is_success() {
            let status = resp.status();
            anyhow::bail!("Account lookup failed {status}");
        }

        let account: AccountEnvelope = resp
            .json()
            .await
            .context("Failed to parse account response")?;

        Ok(SessionUser {
            id: account.id,
            email: account.email,
            roles: account.labels,
        })
    }
}

#[async_trait]
impl BlobStore for RestStore {
    async fn upload(&self, bucket: &str, id: &str, bytes: Vec<u8>) -> Result<FileRef> {
        let url = format!("{}/v1/storage/buckets/{}/files", self.base_url, bucket);

        let resp = self
            .auth_headers(self.http.post(&url))
            .header("X-Meridian-File-Id", id)
            .header("Content-Type", "application/octet-stream")
            .body(bytes)
            .send()
            .await
            .with_context(|| format!("Upload request failed for bucket {bucket}"))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("Upload failed {status}: {body}");
        }

        let file: FileEnvelope = resp
            .json()
            .await
            .context("Failed to parse upload response")?;

        Ok(FileRef {
            id: file.id,
            url: file.url,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_params_rendering() {
        let q = Query::new()
            .equal("userId", "u 1")
            .equal("status", "pending")
            .order_desc("createdAt")
            .limit(25);
        let params = RestStore::query_params(&q);
        assert_eq!(
            params,
            "equal=userId:u%201&equal=status:pending&orderDesc=createdAt&limit=25"
        );
    }

    #[test]
    fn test_query_params_empty() {
        assert_eq!(RestStore::query_params(&Query::new()), "");
    }

    #[test]
    fn test_document_envelope_splits_system_fields() {
        let json = r#"{
            "$id": "doc-1",
            "$createdAt": "2026-03-01T09:00:00Z",
            "userId": "u1",
            "amount": 500.0
        }"#;
        let env: DocumentEnvelope = serde_json::from_str(json).unwrap();
        let doc: Document = env.into();
        assert_eq!(doc.id, "doc-1");
        assert_eq!(doc.fields["userId"], "u1");
        assert!(doc.fields.get("$id").is_none());
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let store = RestStore::new("https://api.example.com/", "proj", "key", "db").unwrap();
        assert_eq!(
            store.documents_url("profiles"),
            "https://api.example.com/v1/databases/db/collections/profiles/documents"
        );
    }
}
