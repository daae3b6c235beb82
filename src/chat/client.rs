//! HTTP client for an OpenAI-compatible chat-completions endpoint.

use std::{fmt, time::Duration};

use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

/// The API used when `CHAT_API_URL` is not set.
pub const DEFAULT_API_URL: &str = "https://openrouter.ai/api/v1";
/// The model used when `CHAT_MODEL` is not set.
pub const DEFAULT_MODEL: &str = "deepseek/deepseek-r1-0528:free";

const TEMPERATURE: f32 = 0.7;
const MAX_TOKENS: u32 = 1000;
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Errors from talking to the chat API.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    /// The request could not be sent or the response could not be read.
    #[error("could not reach the chat API: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with a non-success status.
    #[error("the chat API returned HTTP {status}: {body}")]
    Status {
        /// The HTTP status code.
        status: StatusCode,
        /// The response body, for the logs.
        body: String,
    },

    /// The API answered without any message content.
    #[error("the chat API returned an empty reply")]
    EmptyReply,
}

/// Who wrote a message in the conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    /// Instructions and data for the model.
    System,
    /// The person using the dashboard.
    User,
    /// The model.
    Assistant,
}

/// One message in the conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// The author of the message.
    pub role: ChatRole,
    /// The text of the message.
    pub content: String,
}

impl ChatMessage {
    /// A message written by `role`.
    pub fn new(role: ChatRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// Settings for the chat assistant, usually read from the environment.
#[derive(Clone)]
pub struct ChatConfig {
    /// The bearer token for the API. Without one the assistant is disabled.
    pub api_key: Option<String>,
    /// The API base URL, e.g. `https://openrouter.ai/api/v1`.
    pub api_url: String,
    /// The model name sent with every request.
    pub model: String,
    /// How long to wait for a reply.
    pub timeout: Duration,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_url: DEFAULT_API_URL.to_owned(),
            model: DEFAULT_MODEL.to_owned(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl fmt::Debug for ChatConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChatConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "********"))
            .field("api_url", &self.api_url)
            .field("model", &self.model)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl ChatConfig {
    /// Read `CHAT_API_KEY`, `CHAT_API_URL` and `CHAT_MODEL`, falling back to
    /// the defaults for anything unset or blank.
    pub fn from_env() -> Self {
        let var = |name: &str| {
            std::env::var(name)
                .ok()
                .map(|value| value.trim().to_owned())
                .filter(|value| !value.is_empty())
        };
        let defaults = Self::default();

        Self {
            api_key: var("CHAT_API_KEY"),
            api_url: var("CHAT_API_URL").unwrap_or(defaults.api_url),
            model: var("CHAT_MODEL").unwrap_or(defaults.model),
            timeout: defaults.timeout,
        }
    }

    /// Build a client, or `None` when no API key is configured.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn into_client(self) -> Result<Option<ChatClient>, ChatError> {
        match self.api_key.clone() {
            Some(api_key) => ChatClient::new(api_key, self).map(Some),
            None => Ok(None),
        }
    }
}

/// A client for one chat-completions endpoint and model.
#[derive(Clone)]
pub struct ChatClient {
    client: Client,
    api_key: String,
    config: ChatConfig,
}

impl fmt::Debug for ChatClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChatClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    content: Option<String>,
}

impl ChatClient {
    /// Create a client that authenticates with `api_key`.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(api_key: String, config: ChatConfig) -> Result<Self, ChatError> {
        let client = Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            client,
            api_key,
            config,
        })
    }

    fn chat_url(&self) -> String {
        format!("{}/chat/completions", self.config.api_url.trim_end_matches('/'))
    }

    /// Send `messages` and return the text of the first choice.
    ///
    /// # Errors
    /// Returns an error if the request fails, the API answers with an error
    /// status, or the reply has no content.
    pub async fn complete(&self, messages: &[ChatMessage]) -> Result<String, ChatError> {
        let request = ChatRequest {
            model: &self.config.model,
            messages,
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKENS,
        };

        tracing::debug!(
            "sending {} messages to {} using {}",
            messages.len(),
            self.chat_url(),
            self.config.model
        );

        let response = self
            .client
            .post(self.chat_url())
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ChatError::Status { status, body });
        }

        let response: ChatResponse = response.json().await?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or(ChatError::EmptyReply)
    }
}
