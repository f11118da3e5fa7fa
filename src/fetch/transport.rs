use std::time::Duration;

use log::{debug, error};
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use tokio::runtime::Handle;

use crate::constants::PKG_VERSION;
use crate::errors::ClientError;
use crate::errors::ErrorKind::{InvalidArgument, Network};

/// Fetches raw configuration documents.
///
/// Implementations are called from a blocking context and may block the calling thread.
pub trait Transport: Sync + Send {
    /// Downloads the document found at `url`.
    fn fetch(&self, url: &str) -> Result<String, ClientError>;
}

/// [`Transport`] that downloads documents over HTTP(S).
///
/// The requests are driven by the tokio runtime the [`crate::Toggle`] runs on, so
/// [`HttpTransport::fetch`] must be called from within that runtime's blocking pool.
pub struct HttpTransport {
    http_client: reqwest::Client,
}

impl HttpTransport {
    /// Creates a new [`HttpTransport`] with the given request timeout.
    ///
    /// # Errors
    ///
    /// This method fails if the underlying HTTP client can't be initialized.
    pub fn new(timeout: Duration) -> Result<Self, ClientError> {
        let to_err = |err: String| {
            ClientError::new(
                InvalidArgument,
                format!("Failed to initialize the HTTP client. {err}"),
            )
        };
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(format!("Toggle-Rust/{PKG_VERSION}").as_str())
                .map_err(|err| to_err(err.to_string()))?,
        );
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .map_err(|err| to_err(err.to_string()))?;
        Ok(Self { http_client })
    }

    async fn fetch_http(&self, url: &str) -> Result<String, ClientError> {
        let result = self.http_client.get(url).send().await;
        match result {
            Ok(response) => match response.status().as_u16() {
                200..=299 => {
                    let body = response.text().await.map_err(|err| {
                        let msg = format!("Fetching the config was successful but the HTTP response content could not be read. {err}");
                        error!(event_id = Network.as_u16(); "{}", msg);
                        ClientError::new(Network, msg)
                    })?;
                    debug!("Fetch was successful: new config fetched from '{url}'");
                    Ok(body)
                }
                code => {
                    let msg = format!("Unexpected HTTP response was received while trying to fetch the config. Status code: {code}");
                    error!(event_id = Network.as_u16(); "{}", msg);
                    Err(ClientError::new(Network, msg))
                }
            },
            Err(err) => {
                let msg = if err.is_timeout() {
                    "Request timed out while trying to fetch the config.".to_owned()
                } else {
                    format!("Unexpected error occurred while trying to fetch the config. It is most likely due to a local network issue. {err}")
                };
                error!(event_id = Network.as_u16(); "{}", msg);
                Err(ClientError::new(Network, msg))
            }
        }
    }
}

impl Transport for HttpTransport {
    fn fetch(&self, url: &str) -> Result<String, ClientError> {
        let handle = Handle::try_current().map_err(|err| {
            ClientError::new(
                Network,
                format!("HTTP requests need a running tokio runtime. {err}"),
            )
        })?;
        handle.block_on(self.fetch_http(url))
    }
}
