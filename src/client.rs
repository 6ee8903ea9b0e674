use std::fmt;
use std::sync::Arc;

use reqwest::header::{self, HeaderValue};
use reqwest::{Client as ReqwestClient, StatusCode};

use crate::client_logger::ClientLogger;
use crate::error::{Error, Result};
use crate::session::{CancelHandle, SessionOptions, StreamSession, request_error};
use crate::types::{MODELS_PATH, ModelList, RequestSpec, endpoint};

/// Something that can open a chat completion session.
///
/// [`Client`] is the HTTP implementation; the conversation controller only depends on this
/// trait, so other transports can stand in for it.
pub trait Completions: Send + Sync {
    /// Open a session for `spec`.  Nothing is sent until the session is polled.
    fn start(&self, spec: RequestSpec) -> StreamSession;
}

/// Client for OpenAI-compatible chat completion servers.
#[derive(Clone)]
pub struct Client {
    http: ReqwestClient,
    options: SessionOptions,
    logger: Option<Arc<dyn ClientLogger>>,
}

impl Client {
    /// Create a client with the default 120 second timeout and 10 ms pacing.
    pub fn new() -> Result<Self> {
        Self::with_options(SessionOptions::default())
    }

    /// Create a client with custom session options.
    pub fn with_options(options: SessionOptions) -> Result<Self> {
        let http = ReqwestClient::builder()
            .timeout(options.timeout)
            .build()
            .map_err(|e| {
                Error::http_client(
                    format!("Failed to build HTTP client: {e}"),
                    Some(Box::new(e)),
                )
            })?;
        Ok(Self {
            http,
            options,
            logger: None,
        })
    }

    /// Log every exchange through `logger`.
    pub fn with_logger(mut self, logger: Arc<dyn ClientLogger>) -> Self {
        self.logger = Some(logger);
        self
    }

    /// The options every session of this client uses.
    pub fn options(&self) -> SessionOptions {
        self.options
    }

    /// Open a chat completion session for `spec`.
    ///
    /// The returned session is lazy: the request goes out when it is first polled, and the
    /// timeout counts from now.
    pub fn start(&self, spec: RequestSpec) -> StreamSession {
        StreamSession::connect(self.http.clone(), spec, self.options, self.logger.clone())
    }

    /// List the model identifiers served at `server_base_url`.
    pub async fn list_models(&self, server_base_url: &str, api_key: &str) -> Result<Vec<String>> {
        let url = endpoint(server_base_url, MODELS_PATH)?;
        let response = self
            .http
            .get(url)
            .header(header::ACCEPT, HeaderValue::from_static("application/json"))
            .bearer_auth(api_key)
            .send()
            .await
            .map_err(|e| request_error(e, self.options.timeout))?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::server(status.as_u16(), body.trim()));
        }

        let models = response.json::<ModelList>().await.map_err(|e| {
            Error::decoding(
                format!("Failed to parse model list: {e}"),
                Some(Box::new(e)),
            )
        })?;
        Ok(models.ids())
    }

    /// Like [`Client::list_models`], but yields `Ok(None)` as soon as `cancel` fires.
    pub async fn list_models_or_cancel(
        &self,
        server_base_url: &str,
        api_key: &str,
        cancel: &CancelHandle,
    ) -> Result<Option<Vec<String>>> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Ok(None),
            models = self.list_models(server_base_url, api_key) => models.map(Some),
        }
    }
}

impl Completions for Client {
    fn start(&self, spec: RequestSpec) -> StreamSession {
        Client::start(self, spec)
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("options", &self.options)
            .field("logger", &self.logger.is_some())
            .finish()
    }
}
