//! Name-to-identifier resolution.
//!
//! The manager addresses everything by opaque ids; humans supply names.
//! `/{Type}/id` lists `{name, value}` pairs, and the manager enforces
//! name uniqueness per type, so the first exact match wins.

use crate::core::domain::{
    error::{OvmError, OvmResult},
    model::resource::{IdPair, ResourceRef, ResourceType},
};
use crate::core::infrastructure::api_client::ApiClient;
use tracing::debug;

/// Resolves display names to manager identifiers over one transport.
pub struct Resolver<'a> {
    api: &'a ApiClient,
}

impl<'a> Resolver<'a> {
    pub fn new(api: &'a ApiClient) -> Self {
        Self { api }
    }

    /// Looks `name` up in the collection listing for `kind`.
    ///
    /// Matching is exact and case-sensitive. Absence is a soft `None`;
    /// callers decide whether a missing id is fatal.
    pub async fn resolve(&self, kind: ResourceType, name: &str) -> OvmResult<Option<String>> {
        let listing: Vec<IdPair> = self
            .api
            .get_as(&format!("{}/id", kind.path_segment()))
            .await?;

        let id = listing
            .into_iter()
            .find(|pair| pair.name == name)
            .map(|pair| pair.value);

        debug!(kind = %kind, name, resolved = id.as_deref(), "name resolution");
        Ok(id)
    }

    /// Like [`resolve`](Self::resolve), but escalates absence to
    /// `OvmError::NotFound`. Used at the point an id is actually consumed.
    pub async fn resolve_required(&self, kind: ResourceType, name: &str) -> OvmResult<ResourceRef> {
        match self.resolve(kind, name).await? {
            Some(id) => Ok(ResourceRef::named(kind, id, name)),
            None => Err(OvmError::NotFound {
                kind,
                name: name.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::domain::model::connection::OvmConnection;
    use crate::core::domain::value_object::manager_url::ManagerUrl;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_client(server_uri: &str) -> ApiClient {
        let url = ManagerUrl::new(server_uri).unwrap();
        ApiClient::new(OvmConnection::new(url, "admin", "secret", true)).unwrap()
    }

    async fn mount_listing(server: &MockServer, kind: &str, pairs: serde_json::Value) {
        Mock::given(method("GET"))
            .and(path(format!("/ovm/core/wsapi/rest/{kind}/id")))
            .respond_with(ResponseTemplate::new(200).set_body_json(pairs))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn resolves_exact_match() {
        let server = MockServer::start().await;
        mount_listing(
            &server,
            "Repository",
            serde_json::json!([
                {"name": "repo-a", "value": "0004fb01"},
                {"name": "repo-b", "value": "0004fb02"}
            ]),
        )
        .await;

        let api = test_client(&server.uri());
        let resolver = Resolver::new(&api);
        let id = resolver
            .resolve(ResourceType::Repository, "repo-b")
            .await
            .unwrap();
        assert_eq!(id.as_deref(), Some("0004fb02"));
    }

    #[tokio::test]
    async fn match_is_case_sensitive() {
        let server = MockServer::start().await;
        mount_listing(
            &server,
            "Vm",
            serde_json::json!([{"name": "Web-01", "value": "vm-1"}]),
        )
        .await;

        let api = test_client(&server.uri());
        let resolver = Resolver::new(&api);
        assert!(
            resolver
                .resolve(ResourceType::Vm, "web-01")
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn missing_name_is_soft_none() {
        let server = MockServer::start().await;
        mount_listing(&server, "Network", serde_json::json!([])).await;

        let api = test_client(&server.uri());
        let resolver = Resolver::new(&api);
        assert!(
            resolver
                .resolve(ResourceType::Network, "backend")
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn resolve_required_escalates_to_not_found() {
        let server = MockServer::start().await;
        mount_listing(&server, "ServerPool", serde_json::json!([])).await;

        let api = test_client(&server.uri());
        let resolver = Resolver::new(&api);
        let err = resolver
            .resolve_required(ResourceType::ServerPool, "pool-1")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            OvmError::NotFound { kind: ResourceType::ServerPool, ref name } if name == "pool-1"
        ));
    }

    #[tokio::test]
    async fn resolution_is_idempotent_without_remote_mutation() {
        let server = MockServer::start().await;
        mount_listing(
            &server,
            "Repository",
            serde_json::json!([{"name": "repo-a", "value": "0004fb01"}]),
        )
        .await;

        let api = test_client(&server.uri());
        let resolver = Resolver::new(&api);
        let first = resolver
            .resolve(ResourceType::Repository, "repo-a")
            .await
            .unwrap();
        let second = resolver
            .resolve(ResourceType::Repository, "repo-a")
            .await
            .unwrap();
        assert_eq!(first, second);
    }
}
