//! 1Password Connect backend for oprank.
//!
//! [`ConnectClient`] implements the core `BackendClient` over HTTP, and
//! [`build_provider`] wires a validated store config into a ready
//! `OnePasswordProvider`.

pub mod client;
pub mod token;

use std::sync::Arc;
use std::time::Duration;

use oprank_core::OnePasswordProvider;
use oprank_core::config::StoreConfig;
use tracing::info;

pub use client::{ConnectApiError, ConnectClient};
pub use token::{TokenError, resolve_token};

#[derive(Debug, thiserror::Error)]
pub enum SetupError {
    #[error("failed to resolve 1Password connect token: {0}")]
    Token(#[from] TokenError),

    #[error(transparent)]
    Client(#[from] ConnectApiError),
}

/// Resolve the connect token and build a provider for `config`.
pub fn build_provider(config: &StoreConfig) -> Result<OnePasswordProvider, SetupError> {
    let token = resolve_token(&config.token_ref)?;
    let client = ConnectClient::new(
        &config.connect_host,
        &token,
        Duration::from_secs(config.timeout_secs),
    )?;
    info!(
        host = %config.connect_host,
        vaults = config.vaults.len(),
        "connect backend ready"
    );
    Ok(OnePasswordProvider::new(Arc::new(client), &config.vaults))
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::HashMap;

    use oprank_core::testing::MockClient;
    use oprank_core::{ResolveError, SecretReference};
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn mount_vault(server: &MockServer, name: &str, id: &str) {
        Mock::given(method("GET"))
            .and(path("/v1/vaults"))
            .and(query_param("filter", format!("name eq \"{name}\"")))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!([{"id": id, "name": name}])),
            )
            .mount(server)
            .await;
    }

    async fn mount_search(server: &MockServer, vault_id: &str, title: &str, body: serde_json::Value) {
        Mock::given(method("GET"))
            .and(path(format!("/v1/vaults/{vault_id}/items")))
            .and(query_param("filter", format!("title eq \"{title}\"")))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(server)
            .await;
    }

    fn config(uri: &str, token_env: &str, vaults: &[(&str, i64)]) -> StoreConfig {
        StoreConfig {
            connect_host: uri.to_owned(),
            token_ref: format!("env:{token_env}"),
            timeout_secs: 5,
            allow_http: true,
            vaults: vaults
                .iter()
                .map(|(n, r)| ((*n).to_owned(), *r))
                .collect::<HashMap<_, _>>(),
        }
    }

    fn set_token(suffix: &str) -> String {
        let name = format!("OPRANK_CONNECT_TEST_TOKEN_{suffix}_{}", std::process::id());
        unsafe { std::env::set_var(&name, "test-connect-token") };
        name
    }

    #[tokio::test]
    async fn resolves_field_from_highest_precedence_vault() {
        let server = MockServer::start().await;
        mount_vault(&server, "my-vault", "v1").await;
        mount_vault(&server, "my-shared-vault", "v2").await;
        mount_search(
            &server,
            "v1",
            "my-item",
            serde_json::json!([{"id": "i1", "title": "my-item", "vault": {"id": "v1"}}]),
        )
        .await;
        Mock::given(method("GET"))
            .and(path("/v1/vaults/v1/items/i1"))
            .and(header("Authorization", "Bearer test-connect-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "i1",
                "title": "my-item",
                "vault": {"id": "v1"},
                "category": "LOGIN",
                "fields": [
                    {"id": "username", "label": "username", "value": "admin"},
                    {"id": "password", "label": "password", "value": "from-my-vault"}
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;
        // The shared vault must never be searched.
        Mock::given(method("GET"))
            .and(path("/v1/vaults/v2/items"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .expect(0)
            .mount(&server)
            .await;

        let token_env = set_token("precedence");
        let provider = build_provider(&config(
            &server.uri(),
            &token_env,
            &[("my-vault", 1), ("my-shared-vault", 2)],
        ))
        .unwrap();

        let value = provider
            .get_secret(&SecretReference::new("my-item"))
            .await
            .unwrap();
        assert_eq!(value.as_str(), Some("from-my-vault"));
    }

    #[tokio::test]
    async fn falls_through_empty_vault_and_reads_document() {
        let server = MockServer::start().await;
        mount_vault(&server, "first", "v1").await;
        mount_vault(&server, "second", "v2").await;
        mount_search(&server, "v1", "tls", serde_json::json!([])).await;
        mount_search(
            &server,
            "v2",
            "tls",
            serde_json::json!([{"id": "d1", "title": "tls", "vault": {"id": "v2"}}]),
        )
        .await;
        Mock::given(method("GET"))
            .and(path("/v1/vaults/v2/items/d1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "d1",
                "title": "tls",
                "vault": {"id": "v2"},
                "category": "DOCUMENT",
                "files": [{
                    "id": "f1",
                    "name": "cert.pem",
                    "content_path": "/v1/vaults/v2/items/d1/files/f1/content"
                }]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/vaults/v2/items/d1/files/f1/content"))
            .respond_with(ResponseTemplate::new(200).set_body_string("-----BEGIN CERTIFICATE-----"))
            .mount(&server)
            .await;

        let token_env = set_token("document");
        let provider =
            build_provider(&config(&server.uri(), &token_env, &[("first", 1), ("second", 2)]))
                .unwrap();

        let map = provider
            .get_secret_map(&SecretReference::new("tls"))
            .await
            .unwrap();
        assert_eq!(map.len(), 1);
        assert_eq!(map["cert.pem"].as_str(), Some("-----BEGIN CERTIFICATE-----"));
    }

    #[tokio::test]
    async fn unauthorized_surfaces_as_backend_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/vaults"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let token_env = set_token("unauthorized");
        let provider =
            build_provider(&config(&server.uri(), &token_env, &[("my-vault", 1)])).unwrap();

        let err = provider
            .get_secret(&SecretReference::new("x"))
            .await
            .unwrap_err();
        assert!(matches!(err, ResolveError::Backend { .. }));
        assert!(err.to_string().contains("authentication failed"));

        let err = provider.validate().await.unwrap_err();
        assert!(err.to_string().contains("authentication failed"));
    }

    #[tokio::test]
    async fn connect_backend_matches_in_memory_backend() {
        let server = MockServer::start().await;
        mount_vault(&server, "first", "first-id").await;
        mount_vault(&server, "second", "second-id").await;
        mount_search(&server, "first-id", "db", serde_json::json!([])).await;
        mount_search(
            &server,
            "second-id",
            "db",
            serde_json::json!([{"id": "db-id", "title": "db", "vault": {"id": "second-id"}}]),
        )
        .await;
        Mock::given(method("GET"))
            .and(path("/v1/vaults/second-id/items/db-id"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "db-id",
                "title": "db",
                "vault": {"id": "second-id"},
                "category": "DATABASE",
                "fields": [{"id": "password", "label": "password", "value": "s3cret"}]
            })))
            .mount(&server)
            .await;

        let ranks = [("first", 1), ("second", 2)];
        let token_env = set_token("parity");
        let over_http = build_provider(&config(&server.uri(), &token_env, &ranks)).unwrap();

        let in_memory = OnePasswordProvider::new(
            Arc::new(
                MockClient::new()
                    .add_predictable_vault("first")
                    .add_predictable_vault("second")
                    .add_predictable_item_with_field("second", "db", "password", "s3cret"),
            ),
            &config(&server.uri(), &token_env, &ranks).vaults,
        );

        let reference = SecretReference::new("db");
        let http_value = over_http.get_secret(&reference).await.unwrap();
        let mock_value = in_memory.get_secret(&reference).await.unwrap();
        assert_eq!(http_value.as_bytes(), mock_value.as_bytes());
        assert_eq!(http_value.as_str(), Some("s3cret"));
    }

    #[test]
    fn missing_token_fails_setup() {
        let err = build_provider(&config(
            "http://localhost:8080",
            "OPRANK_CONNECT_TEST_TOKEN_NEVER_SET",
            &[("v", 1)],
        ))
        .unwrap_err();
        assert!(matches!(err, SetupError::Token(TokenError::EnvNotFound(_))));
    }
}
