use std::time::{Duration, Instant};

use async_trait::async_trait;
use rand::Rng;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::ProviderConfig;
use crate::error::ProviderError;
use crate::prompts::{Prompt, Task};
use crate::traits::provider::AiProvider;

// 错误信息里保留的响应体长度
const MAX_ERROR_BODY: usize = 512;

#[derive(Debug, Clone)]
pub struct ProviderSettings {
    pub base_url: String,
    pub api_key: String,
    pub ocr_model: String,
    pub eval_model: String,
    pub timeout: Duration,
    pub max_attempts: u32,
    pub retry_backoff: Duration,
}

impl From<&ProviderConfig> for ProviderSettings {
    fn from(config: &ProviderConfig) -> Self {
        ProviderSettings {
            base_url: config.base_url.clone(),
            api_key: config.api_key.clone(),
            ocr_model: config.ocr_model.clone(),
            eval_model: config.eval_model.clone(),
            timeout: config.timeout(),
            max_attempts: config.max_attempts,
            retry_backoff: config.retry_backoff(),
        }
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: MessageContent<'a>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum MessageContent<'a> {
    Text(&'a str),
    Parts(Vec<ContentPart<'a>>),
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart<'a> {
    Text { text: &'a str },
    ImageUrl { image_url: ImageUrl<'a> },
}

#[derive(Serialize)]
struct ImageUrl<'a> {
    url: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    usage: Option<ChatUsage>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ChatUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

/// OpenAI 兼容的 chat/completions 客户端
#[derive(Clone)]
pub struct ProviderClient {
    client: Client,
    endpoint: String,
    settings: ProviderSettings,
}

impl ProviderClient {
    pub fn new(settings: ProviderSettings) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|e| ProviderError::Request(e.to_string()))?;
        let endpoint = format!("{}/chat/completions", settings.base_url.trim_end_matches('/'));
        Ok(ProviderClient {
            client,
            endpoint,
            settings,
        })
    }

    fn model_for(&self, task: Task) -> &str {
        match task {
            Task::Ocr => &self.settings.ocr_model,
            Task::Evaluation => &self.settings.eval_model,
        }
    }

    fn build_request<'a>(&'a self, prompt: &'a Prompt) -> ChatRequest<'a> {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = prompt.system {
            messages.push(ChatMessage {
                role: "system",
                content: MessageContent::Text(system),
            });
        }
        let content = match &prompt.image_url {
            Some(url) => MessageContent::Parts(vec![
                ContentPart::Text { text: &prompt.user },
                ContentPart::ImageUrl {
                    image_url: ImageUrl { url },
                },
            ]),
            None => MessageContent::Text(&prompt.user),
        };
        messages.push(ChatMessage {
            role: "user",
            content,
        });
        ChatRequest {
            model: self.model_for(prompt.task),
            messages,
        }
    }

    async fn send_once(&self, request: &ChatRequest<'_>) -> Result<String, ProviderError> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.settings.api_key)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let mut message = response.text().await.unwrap_or_default();
            if message.len() > MAX_ERROR_BODY {
                let mut cut = MAX_ERROR_BODY;
                while !message.is_char_boundary(cut) {
                    cut -= 1;
                }
                message.truncate(cut);
            }
            return Err(ProviderError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: ChatResponse = response.json().await?;
        if let Some(usage) = parsed.usage {
            log::debug!(
                "Token usage - Prompt: {}, Completion: {}, Total: {}",
                usage.prompt_tokens,
                usage.completion_tokens,
                usage.total_tokens
            );
        }
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty())
            .ok_or(ProviderError::Empty)
    }

    /// 指数退避，再加最多 25% 的随机抖动
    fn backoff(&self, attempt: u32) -> Duration {
        let delay = self
            .settings
            .retry_backoff
            .saturating_mul(1u32 << attempt.saturating_sub(1).min(16));
        let jitter_ms = rand::thread_rng().gen_range(0..=delay.as_millis() as u64 / 4);
        delay + Duration::from_millis(jitter_ms)
    }
}

#[async_trait]
impl AiProvider for ProviderClient {
    async fn complete(&self, prompt: &Prompt) -> Result<String, ProviderError> {
        let request = self.build_request(prompt);
        let started = Instant::now();
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.send_once(&request).await {
                Ok(text) => {
                    log::info!(
                        "Provider call ({}) succeeded in {:.2}s after {} attempt(s)",
                        request.model,
                        started.elapsed().as_secs_f64(),
                        attempt
                    );
                    return Ok(text);
                }
                Err(e) if e.is_retryable() && attempt < self.settings.max_attempts => {
                    let delay = self.backoff(attempt);
                    log::warn!(
                        "Provider call failed: {}, attempt {}/{}, retrying in {:?}",
                        e,
                        attempt,
                        self.settings.max_attempts,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                }
                // 重试用完时返回最后一次的原始错误
                Err(e) => {
                    log::error!("Provider call ({}) failed: {}", request.model, e);
                    return Err(e);
                }
            }
        }
    }
}
