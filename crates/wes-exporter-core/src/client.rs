//! HTTP client for the WES device.

use std::future::Future;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::field_tree::{FieldTree, decode_body};

/// Structured feed path, relative to the device base URL.
pub const STRUCTURED_PATH: &str = "DATA.CGX";
/// Diagnostics page path, relative to the device base URL.
pub const DIAGNOSTICS_PATH: &str = "WEBPROG/CGX/PCEVAL.CGX";

/// Where the raw readings of a cycle come from.
pub trait DeviceSource {
    /// Fetch and parse the structured feed.
    fn fetch_structured(&self) -> impl Future<Output = Result<FieldTree>> + Send;

    /// Fetch the diagnostics page body.
    fn fetch_diagnostics_text(&self) -> impl Future<Output = Result<String>> + Send;
}

/// Device address and credentials.
#[derive(Clone)]
pub struct ClientConfig {
    /// Base URL, e.g. `http://192.168.0.200`.
    pub base_url: String,
    pub username: String,
    pub password: String,
    /// Per-request timeout. `None` leaves the transport default.
    pub timeout: Option<Duration>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://192.168.0.200".to_string(),
            username: "admin".to_string(),
            password: "wes".to_string(),
            timeout: None,
        }
    }
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url)
            .field("username", &self.username)
            .field("password", &"***")
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl ClientConfig {
    /// Absolute URL of a device path.
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }
}

/// reqwest-backed [`DeviceSource`] using HTTP basic authentication.
#[derive(Debug, Clone)]
pub struct WesClient {
    http: reqwest::Client,
    config: ClientConfig,
}

impl WesClient {
    pub fn new(config: ClientConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().map_err(|source| Error::Transport {
            url: config.base_url.clone(),
            source,
        })?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    async fn get(&self, path: &str) -> Result<Vec<u8>> {
        let url = self.config.url(path);
        let transport = |source: reqwest::Error| Error::Transport {
            url: url.clone(),
            source,
        };
        let response = self
            .http
            .get(&url)
            .basic_auth(&self.config.username, Some(&self.config.password))
            .send()
            .await
            .map_err(transport)?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::HttpStatus {
                url: url.clone(),
                status: status.as_u16(),
            });
        }
        let body = response.bytes().await.map_err(transport)?;
        log::debug!("GET {url}: {} bytes", body.len());
        Ok(body.to_vec())
    }
}

impl DeviceSource for WesClient {
    async fn fetch_structured(&self) -> Result<FieldTree> {
        let body = self.get(STRUCTURED_PATH).await?;
        FieldTree::from_xml(&decode_body(&body))
    }

    async fn fetch_diagnostics_text(&self) -> Result<String> {
        let body = self.get(DIAGNOSTICS_PATH).await?;
        Ok(decode_body(&body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_joins_base_and_path() {
        let config = ClientConfig {
            base_url: "http://10.0.0.5:8080/".into(),
            ..ClientConfig::default()
        };
        assert_eq!(config.url(STRUCTURED_PATH), "http://10.0.0.5:8080/DATA.CGX");
        assert_eq!(
            ClientConfig::default().url(DIAGNOSTICS_PATH),
            "http://192.168.0.200/WEBPROG/CGX/PCEVAL.CGX"
        );
    }

    #[test]
    fn debug_output_hides_password() {
        let config = ClientConfig {
            password: "s3cret".into(),
            ..ClientConfig::default()
        };
        let shown = format!("{config:?}");
        assert!(!shown.contains("s3cret"));
        assert!(shown.contains("admin"));
    }

    #[tokio::test]
    async fn unreachable_device_is_a_transport_error() {
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let client = WesClient::new(ClientConfig {
            base_url: format!("http://127.0.0.1:{port}"),
            timeout: Some(Duration::from_secs(2)),
            ..ClientConfig::default()
        })
        .unwrap();
        let err = client.fetch_structured().await.unwrap_err();
        assert_eq!(err.kind(), "transport");
    }
}
