//! Object store backend over plain HTTP.
//!
//! Objects live at `{endpoint}/{container}/{key}` and are read with `GET`,
//! written with `PUT` and probed with `HEAD`. This matches the path-style
//! interface of S3-compatible stores and of most bucket proxies. An optional
//! bearer token is sent with every request.

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, RequestBuilder, StatusCode, header};
use tracing::debug;

use crate::blobstore::Blobstore;
use crate::error::{Error, Result};

/// Blob storage in one container of an HTTP object store.
#[derive(Debug, Clone)]
pub struct HttpBlobstore {
    client: Client,
    endpoint: String,
    container: String,
    token: Option<String>,
}

impl HttpBlobstore {
    /// Create a backend for `container` at `endpoint`.
    ///
    /// # Arguments
    ///
    /// * `endpoint` - Base URL of the object store (e.g., "https://storage.example.com")
    /// * `container` - Bucket or container name
    pub fn new(endpoint: &str, container: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| Error::Http {
                url: endpoint.to_string(),
                source: e,
            })?;
        Self::with_client(endpoint, container, client)
    }

    /// Create a backend with a custom reqwest Client.
    pub fn with_client(endpoint: &str, container: &str, client: Client) -> Result<Self> {
        let endpoint = endpoint.trim_end_matches('/').to_string();

        if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
            return Err(Error::InvalidUrl(format!(
                "URL must start with http:// or https://, got: {}",
                endpoint
            )));
        }

        let container = container.trim_matches('/').to_string();
        if container.is_empty() {
            return Err(Error::InvalidUrl("container name cannot be empty".to_string()));
        }

        Ok(Self {
            client,
            endpoint,
            container,
            token: None,
        })
    }

    /// Authenticate requests with a bearer token.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// The container name.
    pub fn container(&self) -> &str {
        &self.container
    }

    fn url(&self, key: &str) -> Result<String> {
        if key.is_empty() || key.contains('/') {
            return Err(Error::InvalidKey(key.to_string()));
        }
        Ok(format!("{}/{}/{}", self.endpoint, self.container, key))
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send(&self, url: &str, request: RequestBuilder) -> Result<reqwest::Response> {
        self.authorize(request)
            .send()
            .await
            .map_err(|e| Error::Http {
                url: url.to_string(),
                source: e,
            })
    }
}

fn status_error(key: &str, status: StatusCode) -> Error {
    Error::Storage {
        key: key.to_string(),
        message: format!("object store returned HTTP {}", status),
    }
}

#[async_trait]
impl Blobstore for HttpBlobstore {
    async fn get(&self, key: &str) -> Result<Bytes> {
        let url = self.url(key)?;
        debug!("GET {}", url);
        let response = self.send(&url, self.client.get(&url)).await?;

        match response.status() {
            status if status.is_success() => response.bytes().await.map_err(|e| Error::Http {
                url: url.clone(),
                source: e,
            }),
            StatusCode::NOT_FOUND => Err(Error::NotFound {
                key: key.to_string(),
            }),
            status => Err(status_error(key, status)),
        }
    }

    async fn put(&self, key: &str, body: Bytes) -> Result<()> {
        let url = self.url(key)?;
        debug!("PUT {} ({} bytes)", url, body.len());
        let request = self
            .client
            .put(&url)
            .header(header::CONTENT_TYPE, "application/json")
            .body(body);
        let response = self.send(&url, request).await?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(status_error(key, status))
        }
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        let url = self.url(key)?;
        debug!("HEAD {}", url);
        let response = self.send(&url, self.client.head(&url)).await?;

        match response.status() {
            status if status.is_success() => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            status => Err(status_error(key, status)),
        }
    }

    fn describe(&self) -> String {
        format!("{}/{}", self.endpoint, self.container)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_bytes, header as header_matcher, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_invalid_endpoint() {
        let result = HttpBlobstore::new("storage.example.com", "bucket");
        assert!(matches!(result, Err(Error::InvalidUrl(_))));
    }

    #[test]
    fn test_empty_container() {
        let result = HttpBlobstore::new("https://storage.example.com", "/");
        assert!(matches!(result, Err(Error::InvalidUrl(_))));
    }

    #[test]
    fn test_describe_normalizes() {
        let store = HttpBlobstore::new("https://storage.example.com/", "/river/").unwrap();
        assert_eq!(store.describe(), "https://storage.example.com/river");
        assert_eq!(store.container(), "river");
    }

    #[tokio::test]
    async fn test_get_existing() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/river/2024-01-02.json"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{\"items\":[]}"))
            .expect(1)
            .mount(&server)
            .await;

        let store = HttpBlobstore::new(&server.uri(), "river").unwrap();
        let body = store.get("2024-01-02.json").await.unwrap();
        assert_eq!(body, Bytes::from_static(b"{\"items\":[]}"));
    }

    #[tokio::test]
    async fn test_get_missing_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let store = HttpBlobstore::new(&server.uri(), "river").unwrap();
        let err = store.get("2024-01-02.json").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_get_server_error_is_storage_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let store = HttpBlobstore::new(&server.uri(), "river").unwrap();
        let err = store.get("2024-01-02.json").await.unwrap_err();
        assert!(matches!(err, Error::Storage { .. }));
    }

    #[tokio::test]
    async fn test_put_sends_body_and_token() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/river/2024-01-02.json"))
            .and(header_matcher("authorization", "Bearer s3cret"))
            .and(header_matcher("content-type", "application/json"))
            .and(body_bytes(b"{\"meta\":{}}".to_vec()))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let store = HttpBlobstore::new(&server.uri(), "river")
            .unwrap()
            .with_token("s3cret");
        store
            .put("2024-01-02.json", Bytes::from_static(b"{\"meta\":{}}"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_put_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let store = HttpBlobstore::new(&server.uri(), "river").unwrap();
        let err = store
            .put("2024-01-02.json", Bytes::from_static(b"{}"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Storage { .. }));
    }

    #[tokio::test]
    async fn test_exists_uses_head() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .and(path("/river/2024-01-02.json"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
        Mock::given(method("HEAD"))
            .and(path("/river/2024-01-01.json"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let store = HttpBlobstore::new(&server.uri(), "river").unwrap();
        assert!(store.exists("2024-01-02.json").await.unwrap());
        assert!(!store.exists("2024-01-01.json").await.unwrap());
    }
}
