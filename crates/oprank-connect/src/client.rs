//! 1Password Connect Server API client.
//!
//! Implements [`BackendClient`] over the Connect REST endpoints. Vault and
//! item lookups use the server-side `filter` query so only matching records
//! cross the wire.
//!
//! **Never** leaks raw API error bodies to callers: all errors are mapped to
//! sanitized variants.

use std::fmt;
use std::time::Duration;

use oprank_core::backend::{BackendClient, BackendError, BackendFuture};
use oprank_core::types::{File, Item, ItemSummary, Vault};
use serde::de::DeserializeOwned;
use tracing::debug;

/// 1Password Connect API error types. Raw API error messages are never exposed.
#[derive(Debug, thiserror::Error)]
pub enum ConnectApiError {
    #[error("failed to build HTTP client")]
    Build(#[source] reqwest::Error),

    #[error("network error communicating with 1Password Connect")]
    Network(#[source] reqwest::Error),

    #[error("1Password Connect authentication failed (check bearer token)")]
    Unauthorized,

    #[error("resource not found: {0}")]
    NotFound(String),

    #[error("expected one 1Password Vault named '{name}', got {count}")]
    AmbiguousVault { name: String, count: usize },

    #[error("1Password Connect server error")]
    ServerError,

    #[error("unexpected 1Password Connect response: status {0}")]
    UnexpectedStatus(u16),

    #[error("file {0} has no content path")]
    MissingContentPath(String),
}

/// 1Password Connect REST API client.
///
/// Holds the bearer token for its whole lifetime; one client serves one
/// store configuration.
#[derive(Clone)]
pub struct ConnectClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl fmt::Debug for ConnectClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

/// Quote a value for a Connect `filter` expression.
fn filter_eq(attribute: &str, value: &str) -> String {
    let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
    format!("{attribute} eq \"{escaped}\"")
}

impl ConnectClient {
    fn user_agent() -> String {
        format!("oprank/{}", env!("CARGO_PKG_VERSION"))
    }

    /// Create a client for the Connect server at `base_url`.
    pub fn new(base_url: &str, token: &str, timeout: Duration) -> Result<Self, ConnectApiError> {
        let http = reqwest::Client::builder()
            .user_agent(Self::user_agent())
            .timeout(timeout)
            .build()
            .map_err(ConnectApiError::Build)?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_owned(),
            token: token.to_owned(),
        })
    }

    /// GET `path` and map the response status.
    async fn get(
        &self,
        path: &str,
        filter: Option<String>,
        what: impl FnOnce() -> String,
    ) -> Result<reqwest::Response, ConnectApiError> {
        let url = format!("{}{}", self.base_url, path);
        debug!(%url, filter = filter.as_deref().unwrap_or(""), "connect request");

        let mut request = self.http.get(&url).bearer_auth(&self.token);
        if let Some(filter) = filter {
            request = request.query(&[("filter", filter)]);
        }
        let resp = request.send().await.map_err(ConnectApiError::Network)?;

        match resp.status().as_u16() {
            200 => Ok(resp),
            401 | 403 => Err(ConnectApiError::Unauthorized),
            404 => Err(ConnectApiError::NotFound(what())),
            500..=599 => Err(ConnectApiError::ServerError),
            other => Err(ConnectApiError::UnexpectedStatus(other)),
        }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        filter: Option<String>,
        what: impl FnOnce() -> String,
    ) -> Result<T, ConnectApiError> {
        self.get(path, filter, what)
            .await?
            .json::<T>()
            .await
            .map_err(ConnectApiError::Network)
    }

    /// Vaults accessible with the token, optionally only those named `name`.
    pub async fn list_vaults(&self, name: Option<&str>) -> Result<Vec<Vault>, ConnectApiError> {
        self.get_json(
            "/v1/vaults",
            name.map(|n| filter_eq("name", n)),
            || "vaults endpoint".into(),
        )
        .await
    }

    /// Items in a vault, optionally only those titled `title`.
    pub async fn list_vault_items(
        &self,
        vault_id: &str,
        title: Option<&str>,
    ) -> Result<Vec<ItemSummary>, ConnectApiError> {
        self.get_json(
            &format!("/v1/vaults/{vault_id}/items"),
            title.map(|t| filter_eq("title", t)),
            || format!("vault {vault_id}"),
        )
        .await
    }

    /// A single item with all field values and file descriptors.
    pub async fn fetch_item(&self, item_id: &str, vault_id: &str) -> Result<Item, ConnectApiError> {
        self.get_json(
            &format!("/v1/vaults/{vault_id}/items/{item_id}"),
            None,
            || format!("item {item_id} in vault {vault_id}"),
        )
        .await
    }

    /// Download a document file's contents.
    pub async fn fetch_file_content(&self, file: &File) -> Result<Vec<u8>, ConnectApiError> {
        let path = file
            .content_path
            .as_deref()
            .ok_or_else(|| ConnectApiError::MissingContentPath(file.id.clone()))?;
        let bytes = self
            .get(path, None, || format!("file {}", file.id))
            .await?
            .bytes()
            .await
            .map_err(ConnectApiError::Network)?;
        Ok(bytes.to_vec())
    }

    /// All items in the vault named `vault_name`, which must match exactly one vault.
    pub async fn list_items_in_named_vault(
        &self,
        vault_name: &str,
    ) -> Result<Vec<ItemSummary>, ConnectApiError> {
        let vaults = self.list_vaults(Some(vault_name)).await?;
        match vaults.as_slice() {
            [vault] => self.list_vault_items(&vault.id, None).await,
            [] => Err(ConnectApiError::NotFound(format!("vault '{vault_name}'"))),
            _ => Err(ConnectApiError::AmbiguousVault {
                name: vault_name.to_owned(),
                count: vaults.len(),
            }),
        }
    }
}

impl BackendClient for ConnectClient {
    fn find_vaults_by_name<'a>(&'a self, name: &'a str) -> BackendFuture<'a, Vec<Vault>> {
        Box::pin(async move {
            self.list_vaults(Some(name))
                .await
                .map_err(BackendError::from)
        })
    }

    fn find_items_by_title<'a>(
        &'a self,
        title: &'a str,
        vault_id: &'a str,
    ) -> BackendFuture<'a, Vec<ItemSummary>> {
        Box::pin(async move {
            self.list_vault_items(vault_id, Some(title))
                .await
                .map_err(BackendError::from)
        })
    }

    fn get_item<'a>(&'a self, item_id: &'a str, vault_id: &'a str) -> BackendFuture<'a, Item> {
        Box::pin(async move {
            self.fetch_item(item_id, vault_id)
                .await
                .map_err(BackendError::from)
        })
    }

    fn get_file_content<'a>(&'a self, file: &'a File) -> BackendFuture<'a, Vec<u8>> {
        Box::pin(async move {
            self.fetch_file_content(file)
                .await
                .map_err(BackendError::from)
        })
    }

    fn list_items<'a>(&'a self, vault_name: &'a str) -> BackendFuture<'a, Vec<ItemSummary>> {
        Box::pin(async move {
            self.list_items_in_named_vault(vault_name)
                .await
                .map_err(BackendError::from)
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(uri: &str) -> ConnectClient {
        ConnectClient::new(uri, "test-connect-token", Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn base_url_trimmed() {
        let client = client("http://localhost:8080/");
        assert_eq!(client.base_url, "http://localhost:8080");
    }

    #[test]
    fn user_agent_contains_version() {
        assert!(ConnectClient::user_agent().starts_with("oprank/"));
    }

    #[test]
    fn debug_does_not_leak_token() {
        let debug = format!("{:?}", client("http://localhost:8080"));
        assert!(debug.contains("ConnectClient"));
        assert!(!debug.contains("test-connect-token"));
    }

    #[test]
    fn filter_quotes_values() {
        assert_eq!(filter_eq("title", "my-item"), r#"title eq "my-item""#);
        assert_eq!(filter_eq("title", r#"say "hi""#), r#"title eq "say \"hi\"""#);
    }

    #[test]
    fn error_display() {
        assert!(ConnectApiError::Unauthorized.to_string().contains("authentication failed"));
        assert!(ConnectApiError::NotFound("vault 'x'".into()).to_string().contains("not found"));
        assert!(ConnectApiError::UnexpectedStatus(418).to_string().contains("418"));
    }

    #[tokio::test]
    async fn find_vaults_sends_filter_and_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/vaults"))
            .and(query_param("filter", r#"name eq "Personal""#))
            .and(header("Authorization", "Bearer test-connect-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"id": "v1", "name": "Personal", "description": "My vault"}
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let vaults = client(&server.uri())
            .find_vaults_by_name("Personal")
            .await
            .unwrap();
        assert_eq!(vaults.len(), 1);
        assert_eq!(vaults[0].id, "v1");
        assert_eq!(vaults[0].description.as_deref(), Some("My vault"));
    }

    #[tokio::test]
    async fn find_items_by_title() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/vaults/v1/items"))
            .and(query_param("filter", r#"title eq "db""#))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"id": "i1", "title": "db", "vault": {"id": "v1"}, "category": "LOGIN"},
                {"id": "i2", "title": "db", "vault": {"id": "v1"}, "category": "LOGIN"}
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let items = client(&server.uri())
            .find_items_by_title("db", "v1")
            .await
            .unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[1].vault.id, "v1");
    }

    #[tokio::test]
    async fn get_item_with_fields() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/vaults/v1/items/i1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "i1",
                "title": "db",
                "vault": {"id": "v1"},
                "category": "LOGIN",
                "fields": [{"id": "password", "label": "password", "value": "s3cret"}]
            })))
            .mount(&server)
            .await;

        let item = client(&server.uri()).get_item("i1", "v1").await.unwrap();
        assert_eq!(item.fields[0].value(), "s3cret");
    }

    #[tokio::test]
    async fn file_content_follows_content_path() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/vaults/v1/items/d1/files/f1/content"))
            .and(header("Authorization", "Bearer test-connect-token"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0u8, 159, 146, 150]))
            .expect(1)
            .mount(&server)
            .await;

        let file = File {
            content_path: Some("/v1/vaults/v1/items/d1/files/f1/content".into()),
            ..File::new("f1", "blob.bin")
        };
        let bytes = client(&server.uri()).get_file_content(&file).await.unwrap();
        assert_eq!(bytes, vec![0u8, 159, 146, 150]);
    }

    #[tokio::test]
    async fn file_without_content_path_fails() {
        let err = client("http://localhost:1")
            .fetch_file_content(&File::new("f1", "x"))
            .await
            .unwrap_err();
        assert!(matches!(err, ConnectApiError::MissingContentPath(ref id) if id == "f1"));
    }

    #[tokio::test]
    async fn status_mapping() {
        let cases = [
            (401, "authentication failed"),
            (403, "authentication failed"),
            (404, "not found"),
            (503, "server error"),
            (418, "status 418"),
        ];
        for (status, expected) in cases {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .and(path("/v1/vaults/v1/items/i1"))
                .respond_with(ResponseTemplate::new(status).set_body_string("raw body"))
                .mount(&server)
                .await;

            let err = client(&server.uri()).fetch_item("i1", "v1").await.unwrap_err();
            let msg = err.to_string();
            assert!(msg.contains(expected), "status {status}: {msg}");
            assert!(!msg.contains("raw body"));
        }
    }

    #[tokio::test]
    async fn list_items_resolves_vault_name() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/vaults"))
            .and(query_param("filter", r#"name eq "Shared""#))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"id": "v2", "name": "Shared"}
            ])))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/vaults/v2/items"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"id": "i1", "title": "a"},
                {"id": "i2", "title": "b"}
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let items = client(&server.uri()).list_items("Shared").await.unwrap();
        assert_eq!(items.len(), 2);
    }

    #[tokio::test]
    async fn list_items_unknown_vault() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/vaults"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .mount(&server)
            .await;

        let err = client(&server.uri())
            .list_items_in_named_vault("Nope")
            .await
            .unwrap_err();
        assert!(matches!(err, ConnectApiError::NotFound(_)));
    }

    #[tokio::test]
    async fn list_items_rejects_duplicate_vault_name() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/vaults"))
            .and(query_param("filter", r#"name eq "Shared""#))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"id": "v2", "name": "Shared"},
                {"id": "v3", "name": "Shared"}
            ])))
            .mount(&server)
            .await;
        // Neither vault's items may be listed.
        Mock::given(method("GET"))
            .and(path("/v1/vaults/v2/items"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .expect(0)
            .mount(&server)
            .await;

        let err = client(&server.uri())
            .list_items_in_named_vault("Shared")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ConnectApiError::AmbiguousVault { ref name, count: 2 } if name == "Shared"
        ));
    }
}
