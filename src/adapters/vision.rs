//! Mistral / OpenAI 相容視覺端點的對話補全客戶端

use crate::domain::model::ExtractionRequest;
use crate::domain::ports::{ConfigProvider, VisionModel};
use crate::utils::error::{PhoneExtractError, Result};
use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_API_ENDPOINT: &str = "https://api.mistral.ai/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "pixtral-12b-2409";

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    n: u32,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: Vec<ContentPart<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart<'a> {
    Text { text: &'a str },
    ImageUrl { image_url: &'a str },
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    content: Option<MessageContent>,
}

// 有些端點回傳字串，有些回傳 chunk 陣列
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum MessageContent {
    Text(String),
    Chunks(Vec<ContentChunk>),
}

#[derive(Debug, Deserialize)]
struct ContentChunk {
    #[serde(default)]
    text: Option<String>,
}

impl MessageContent {
    fn into_text(self) -> String {
        match self {
            MessageContent::Text(text) => text,
            MessageContent::Chunks(chunks) => chunks
                .into_iter()
                .filter_map(|chunk| chunk.text)
                .collect::<Vec<_>>()
                .join(""),
        }
    }
}

impl<'a> ChatRequest<'a> {
    fn single_turn(request: &'a ExtractionRequest) -> Self {
        Self {
            model: &request.model,
            n: 1,
            messages: vec![ChatMessage {
                role: "user",
                content: vec![
                    ContentPart::Text {
                        text: &request.instruction,
                    },
                    ContentPart::ImageUrl {
                        image_url: &request.image_data_uri,
                    },
                ],
            }],
        }
    }
}

/// 每張圖片送出一次請求，回傳第一則補全的文字
pub struct ChatCompletionClient {
    client: Client,
    endpoint: String,
    api_key: SecretString,
}

impl ChatCompletionClient {
    pub fn new(endpoint: impl Into<String>, api_key: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            api_key: SecretString::from(api_key.to_string()),
        })
    }

    pub fn from_config<C: ConfigProvider>(config: &C) -> Result<Self> {
        Self::new(
            config.api_endpoint(),
            config.api_key(),
            config.request_timeout(),
        )
    }
}

fn model_call_failed(message: impl Into<String>) -> PhoneExtractError {
    PhoneExtractError::ModelCallFailed {
        message: message.into(),
    }
}

#[async_trait]
impl VisionModel for ChatCompletionClient {
    async fn complete(&self, request: &ExtractionRequest) -> Result<String> {
        let body = ChatRequest::single_turn(request);

        tracing::debug!("Making chat completion request to: {}", self.endpoint);
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(self.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    model_call_failed(format!("request timed out: {}", e))
                } else {
                    model_call_failed(format!("request failed: {}", e))
                }
            })?;

        let status = response.status();
        tracing::debug!("Chat completion response status: {}", status);
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(model_call_failed(format!("HTTP {}: {}", status, detail.trim())));
        }

        let payload: ChatResponse = response
            .json()
            .await
            .map_err(|e| model_call_failed(format!("invalid completion payload: {}", e)))?;

        let choice = payload
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| model_call_failed("response contained no completion"))?;

        Ok(choice
            .message
            .content
            .map(MessageContent::into_text)
            .unwrap_or_default())
    }
}
