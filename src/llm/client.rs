use crate::error::{AnalysisError, Result};
use crate::llm::types::*;
use crate::narrative::CommentaryRequest;
use log::warn;
use reqwest::Client;
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://api.groq.com/openai/v1";
const DEFAULT_MODEL: &str = "llama-3.1-8b-instant";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
const RETRY_DELAY: Duration = Duration::from_secs(2);

/// Client for the external commentary service: an OpenAI-compatible
/// chat-completions endpoint. One request per analysis, with a timeout and
/// a single retry on transient failure; the response text is returned
/// verbatim for display.
#[derive(Clone)]
pub struct CommentaryClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl CommentaryClient {
    pub fn new(api_key: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub async fn generate(&self, request: &CommentaryRequest) -> Result<String> {
        let payload = ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage::system(&request.system),
                ChatMessage::user(&request.user),
            ],
        };

        match self.try_generate(&payload).await {
            Ok(text) => Ok(text),
            Err(Attempt { transient: true, message }) => {
                warn!("Commentary request failed ({message}); retrying once");
                tokio::time::sleep(RETRY_DELAY).await;
                self.try_generate(&payload)
                    .await
                    .map_err(|a| AnalysisError::Commentary(a.message))
            }
            Err(attempt) => Err(AnalysisError::Commentary(attempt.message)),
        }
    }

    async fn try_generate(
        &self,
        payload: &ChatCompletionRequest,
    ) -> std::result::Result<String, Attempt> {
        let url = format!("{}/chat/completions", self.base_url);

        let res = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .timeout(REQUEST_TIMEOUT)
            .json(payload)
            .send()
            .await
            .map_err(|e| Attempt {
                transient: true,
                message: format!("Transport error: {e}"),
            })?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(Attempt {
                transient: status.is_server_error(),
                message: format!("API error (status {status}): {body}"),
            });
        }

        let body: ChatCompletionResponse = res.json().await.map_err(|e| Attempt {
            transient: false,
            message: format!("Malformed response body: {e}"),
        })?;

        body.choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| Attempt {
                transient: false,
                message: "No choices returned".to_string(),
            })
    }
}

struct Attempt {
    transient: bool,
    message: String,
}
