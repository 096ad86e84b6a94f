//! HTTP client for the manager's REST surface.
//!
//! Authenticates every request with static basic credentials and speaks
//! JSON both ways. By manager convention a non-2xx status is not itself a
//! failure: error details live in the decoded body, and callers inspect
//! the returned structures. Only network failures and non-JSON bodies
//! surface as `OvmError::Transport`.

use crate::core::domain::{error::OvmError, error::OvmResult, model::connection::OvmConnection};
use reqwest::{
    Client, Method,
    header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderValue},
};
use serde_json::Value;

/// Stateless JSON transport over one manager connection.
///
/// Holds nothing beyond the base URL, the credentials, and the reqwest
/// client; all run state lives with the callers.
#[derive(Debug)]
pub struct ApiClient {
    http: Client,
    connection: OvmConnection,
}

impl ApiClient {
    /// Builds the client. TLS verification follows the connection's
    /// policy; disabling it is an explicit caller opt-in.
    ///
    /// # Errors
    /// Returns `OvmError::Transport` if the underlying HTTP client cannot
    /// be constructed.
    pub fn new(connection: OvmConnection) -> OvmResult<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let http = Client::builder()
            .default_headers(headers)
            .danger_accept_invalid_certs(!connection.verify_tls())
            .build()
            .map_err(|e| OvmError::Transport(e.to_string()))?;

        Ok(Self { http, connection })
    }

    pub fn connection(&self) -> &OvmConnection {
        &self.connection
    }

    /// GET a resource path, decoding the body as loose JSON.
    pub async fn get(&self, path: &str) -> OvmResult<Value> {
        self.execute(Method::GET, path, None, &[]).await
    }

    /// GET a resource path, decoding the body into `T`.
    pub async fn get_as<T>(&self, path: &str) -> OvmResult<T>
    where
        T: serde::de::DeserializeOwned,
    {
        let value = self.get(path).await?;
        serde_json::from_value(value)
            .map_err(|e| OvmError::Transport(format!("unexpected response shape at {path}: {e}")))
    }

    /// POST a JSON body under a parent resource, with optional query
    /// parameters.
    pub async fn post(
        &self,
        path: &str,
        body: &Value,
        query: &[(&str, String)],
    ) -> OvmResult<Value> {
        self.execute(Method::POST, path, Some(body), query).await
    }

    /// PUT an update or action. Some actions (clone, start, kill) carry no
    /// body and parameterize through the query string instead.
    pub async fn put(
        &self,
        path: &str,
        body: Option<&Value>,
        query: &[(&str, String)],
    ) -> OvmResult<Value> {
        self.execute(Method::PUT, path, body, query).await
    }

    /// DELETE a resource.
    pub async fn delete(&self, path: &str) -> OvmResult<Value> {
        self.execute(Method::DELETE, path, None, &[]).await
    }

    async fn execute(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        query: &[(&str, String)],
    ) -> OvmResult<Value> {
        let url = self.connection.url().endpoint(path);

        let mut req = self
            .http
            .request(method.clone(), &url)
            .basic_auth(self.connection.username(), Some(self.connection.password()));

        if !query.is_empty() {
            req = req.query(query);
        }
        if let Some(body) = body {
            req = req.json(body);
        }

        let response = req
            .send()
            .await
            .map_err(|e| OvmError::Transport(format!("{method} {url} failed: {e}")))?;

        let status = response.status();
        response
            .json::<Value>()
            .await
            .map_err(|e| OvmError::Transport(format!("{method} {url} ({status}): non-JSON response: {e}")))
    }
}
