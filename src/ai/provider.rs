//! Completion providers: a prompt goes in, model text comes out.
//!
//! Remote calls are separated from the advisor so the same fallback handling
//! runs in production (Gemini / OpenAI) and in tests (mock).

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};

pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";

const USER_AGENT: &str = "leafcart/0.1";

pub type CompletionFuture<'a> = Pin<Box<dyn Future<Output = Result<String>> + Send + 'a>>;

pub trait Provider: Send + Sync + 'static {
    /// One prompt, one completion. Errors cover transport, HTTP status and
    /// malformed bodies alike; callers treat them all as "no answer".
    fn complete<'a>(&'a self, prompt: &'a str) -> CompletionFuture<'a>;
    fn name(&self) -> &'static str;
}

pub type DynProvider = Arc<dyn Provider>;

fn http_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .connect_timeout(Duration::from_secs(4))
        .timeout(Duration::from_secs(30))
        .build()
        .context("building HTTP client")
}

// ------------------------------------------------------------
// Gemini
// ------------------------------------------------------------

/// Google Generative Language `generateContent` endpoint.
pub struct GeminiProvider {
    http: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiProvider {
    pub fn new(api_key: impl Into<String>, model: Option<&str>) -> Result<Self> {
        Ok(Self {
            http: http_client()?,
            api_key: api_key.into(),
            model: model.unwrap_or(DEFAULT_GEMINI_MODEL).to_string(),
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
        })
    }
}

impl Provider for GeminiProvider {
    fn complete<'a>(&'a self, prompt: &'a str) -> CompletionFuture<'a> {
        Box::pin(async move {
            if self.api_key.is_empty() {
                bail!("gemini: missing API key");
            }

            #[derive(Serialize)]
            struct Part<'a> {
                text: &'a str,
            }
            #[derive(Serialize)]
            struct Content<'a> {
                parts: Vec<Part<'a>>,
            }
            #[derive(Serialize)]
            struct Req<'a> {
                contents: Vec<Content<'a>>,
            }
            #[derive(Deserialize)]
            struct Resp {
                #[serde(default)]
                candidates: Vec<Candidate>,
            }
            #[derive(Deserialize)]
            struct Candidate {
                content: Option<RespContent>,
            }
            #[derive(Deserialize)]
            struct RespContent {
                #[serde(default)]
                parts: Vec<RespPart>,
            }
            #[derive(Deserialize)]
            struct RespPart {
                #[serde(default)]
                text: String,
            }

            let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
            let req = Req {
                contents: vec![Content {
                    parts: vec![Part { text: prompt }],
                }],
            };
            let resp = self
                .http
                .post(url)
                .header("x-goog-api-key", &self.api_key)
                .json(&req)
                .send()
                .await
                .context("gemini: request failed")?;

            let status = resp.status();
            if !status.is_success() {
                bail!("gemini: HTTP {status}");
            }
            let body: Resp = resp.json().await.context("gemini: malformed response")?;
            let text = body
                .candidates
                .into_iter()
                .next()
                .and_then(|c| c.content)
                .map(|c| c.parts.into_iter().map(|p| p.text).collect::<String>())
                .unwrap_or_default();
            Ok(text)
        })
    }

    fn name(&self) -> &'static str {
        "gemini"
    }
}

// ------------------------------------------------------------
// OpenAI
// ------------------------------------------------------------

/// OpenAI Chat Completions.
pub struct OpenAiProvider {
    http: reqwest::Client,
    api_key: String,
    model: String,
}

impl OpenAiProvider {
    pub fn new(api_key: impl Into<String>, model: Option<&str>) -> Result<Self> {
        Ok(Self {
            http: http_client()?,
            api_key: api_key.into(),
            model: model.unwrap_or(DEFAULT_OPENAI_MODEL).to_string(),
        })
    }
}

impl Provider for OpenAiProvider {
    fn complete<'a>(&'a self, prompt: &'a str) -> CompletionFuture<'a> {
        Box::pin(async move {
            if self.api_key.is_empty() {
                bail!("openai: missing API key");
            }

            #[derive(Serialize)]
            struct Msg<'a> {
                role: &'a str,
                content: &'a str,
            }
            #[derive(Serialize)]
            struct Req<'a> {
                model: &'a str,
                messages: Vec<Msg<'a>>,
                temperature: f32,
            }
            #[derive(Deserialize)]
            struct Resp {
                choices: Vec<Choice>,
            }
            #[derive(Deserialize)]
            struct Choice {
                message: ChoiceMsg,
            }
            #[derive(Deserialize)]
            struct ChoiceMsg {
                #[serde(default)]
                content: Option<String>,
            }

            let req = Req {
                model: &self.model,
                messages: vec![Msg {
                    role: "user",
                    content: prompt,
                }],
                temperature: 0.2,
            };
            let resp = self
                .http
                .post("https://api.openai.com/v1/chat/completions")
                .bearer_auth(&self.api_key)
                .json(&req)
                .send()
                .await
                .context("openai: request failed")?;

            let status = resp.status();
            if !status.is_success() {
                bail!("openai: HTTP {status}");
            }
            let body: Resp = resp.json().await.context("openai: malformed response")?;
            Ok(body
                .choices
                .into_iter()
                .next()
                .and_then(|c| c.message.content)
                .unwrap_or_default())
        })
    }

    fn name(&self) -> &'static str {
        "openai"
    }
}

// ------------------------------------------------------------
// Disabled + mock
// ------------------------------------------------------------

/// Always errors; used when AI is switched off.
pub struct DisabledProvider;

impl Provider for DisabledProvider {
    fn complete<'a>(&'a self, _prompt: &'a str) -> CompletionFuture<'a> {
        Box::pin(async { Err(anyhow!("AI provider disabled")) })
    }

    fn name(&self) -> &'static str {
        "disabled"
    }
}

/// Scripted provider for tests and `AI_TEST_MODE=mock`.
///
/// Queued replies are served first, in order; after that every call gets the
/// fallback reply. Every prompt is recorded.
pub struct MockProvider {
    queue: Mutex<VecDeque<Result<String, String>>>,
    fallback: Result<String, String>,
    prompts: Mutex<Vec<String>>,
}

impl MockProvider {
    pub fn fixed(reply: impl Into<String>) -> Self {
        Self::with_fallback(Ok(reply.into()))
    }

    pub fn failing(error: impl Into<String>) -> Self {
        Self::with_fallback(Err(error.into()))
    }

    fn with_fallback(fallback: Result<String, String>) -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            fallback,
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn then_reply(self, reply: impl Into<String>) -> Self {
        self.push(Ok(reply.into()))
    }

    pub fn then_fail(self, error: impl Into<String>) -> Self {
        self.push(Err(error.into()))
    }

    fn push(self, item: Result<String, String>) -> Self {
        if let Ok(mut q) = self.queue.lock() {
            q.push_back(item);
        }
        self
    }

    /// Prompts received so far.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }

    fn next_reply(&self, prompt: &str) -> Result<String> {
        if let Ok(mut p) = self.prompts.lock() {
            p.push(prompt.to_string());
        }
        let queued = self.queue.lock().ok().and_then(|mut q| q.pop_front());
        queued
            .unwrap_or_else(|| self.fallback.clone())
            .map_err(|e| anyhow!("mock: {e}"))
    }
}

impl Provider for MockProvider {
    fn complete<'a>(&'a self, prompt: &'a str) -> CompletionFuture<'a> {
        let out = self.next_reply(prompt);
        Box::pin(async move { out })
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_serves_queue_then_fallback() {
        let m = MockProvider::fixed("default").then_reply("first").then_fail("boom");
        assert_eq!(m.complete("a").await.unwrap(), "first");
        assert!(m.complete("b").await.is_err());
        assert_eq!(m.complete("c").await.unwrap(), "default");
        assert_eq!(m.prompts(), vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn disabled_always_errors() {
        assert!(DisabledProvider.complete("x").await.is_err());
        assert_eq!(DisabledProvider.name(), "disabled");
    }

    #[tokio::test]
    async fn remote_providers_refuse_without_key() {
        let g = GeminiProvider::new("", None).unwrap();
        assert!(g.complete("x").await.is_err());
        let o = OpenAiProvider::new("", None).unwrap();
        assert!(o.complete("x").await.is_err());
    }
}
