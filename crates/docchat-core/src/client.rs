use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use crate::config::Config;
use crate::error::ClientError;

#[derive(Serialize)]
struct ChatRequest<'a> {
    query: &'a str,
}

#[derive(Serialize)]
struct SelectedTextRequest<'a> {
    selected_text: &'a str,
    query: &'a str,
}

/// Answer to a free-form question
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ChatReply {
    pub response: String,
    #[serde(default)]
    pub sources: Vec<String>,
}

/// Answer to a question about a selected passage
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SelectionReply {
    pub response: String,
}

/// Result of the translate operation.
///
/// The backend has no translation endpoint yet, so every value produced
/// today is a local placeholder and must not be presented as authoritative.
#[derive(Debug, Clone, PartialEq)]
pub struct Translation {
    pub translated_text: String,
    stub: bool,
}

impl Translation {
    pub(crate) fn placeholder(text: &str) -> Self {
        Self {
            translated_text: format!("Mock translation of: {}", text),
            stub: true,
        }
    }

    pub fn is_stub(&self) -> bool {
        self.stub
    }
}

/// Typed client for the question-answering backend.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    config: Config,
}

impl ApiClient {
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("docchat/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .build()?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub async fn ask(&self, query: &str) -> Result<ChatReply, ClientError> {
        self.post("/api/chat", &ChatRequest { query })
            .await
            .inspect_err(|err| log_failure("ask", err))
    }

    /// Both arguments must be non-empty; callers check this before dispatch.
    pub async fn ask_about_selection(
        &self,
        selected_text: &str,
        query: &str,
    ) -> Result<SelectionReply, ClientError> {
        let request = SelectedTextRequest { selected_text, query };
        self.post("/api/chat/selected-text", &request)
            .await
            .inspect_err(|err| log_failure("ask_about_selection", err))
    }

    pub async fn translate(&self, text: &str) -> Result<Translation, ClientError> {
        warn!("translation endpoint is not implemented by the backend, returning placeholder");
        Ok(Translation::placeholder(text))
    }

    async fn post<B, R>(&self, path: &str, body: &B) -> Result<R, ClientError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = self.config.endpoint(path);
        debug!(%url, "dispatching backend request");

        let response = self.client.post(&url).json(body).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Server { status: status.as_u16() });
        }

        Ok(response.json::<R>().await?)
    }
}

fn log_failure(operation: &str, err: &ClientError) {
    error!(operation, error = %err, "backend request failed");
}
