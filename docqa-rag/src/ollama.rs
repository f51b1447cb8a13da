//! Ollama-backed embedding provider and generator.
//!
//! This module is only available when the `ollama` feature is enabled.

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::config::ModelConfig;
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::generation::{Generator, PromptBuilder};

/// Text embedded once at startup to learn the embedding length.
const DIMENSION_PROBE: &str = "dimension probe";

/// Upper bound on the wait between two attempts.
const MAX_RETRY_DELAY: Duration = Duration::from_secs(30);

/// Delay before retry number `attempt + 1`: `base * 2^attempt`, capped.
fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    base.checked_mul(2u32.saturating_pow(attempt))
        .map_or(MAX_RETRY_DELAY, |delay| delay.min(MAX_RETRY_DELAY))
}

/// Shared HTTP plumbing for both Ollama endpoints.
#[derive(Debug, Clone)]
struct OllamaHttp {
    client: reqwest::Client,
    base_url: String,
    max_retries: u32,
    retry_backoff: Duration,
}

impl OllamaHttp {
    fn new(config: &ModelConfig) -> std::result::Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(config.http_timeout())
            .pool_max_idle_per_host(5)
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            max_retries: config.max_retries,
            retry_backoff: config.retry_backoff(),
        })
    }

    /// POST `body` to `path`, retrying with exponential backoff.
    ///
    /// Errors are reported as plain messages; callers wrap them in the error
    /// kind that fits the endpoint.
    async fn post_json<Req, Resp>(&self, path: &str, body: &Req) -> std::result::Result<Resp, String>
    where
        Req: Serialize + Sync,
        Resp: DeserializeOwned + Send,
    {
        let url = format!("{}{path}", self.base_url);
        let mut last_error = String::new();

        for attempt in 0..=self.max_retries {
            match self.post_once(&url, body).await {
                Ok(response) => return Ok(response),
                Err(e) => {
                    last_error = e;
                    if attempt < self.max_retries {
                        let delay = backoff_delay(self.retry_backoff, attempt);
                        warn!(
                            url = %url,
                            attempt = attempt + 1,
                            max_attempts = self.max_retries.saturating_add(1),
                            ?delay,
                            error = %last_error,
                            "request failed, retrying"
                        );
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }

        Err(last_error)
    }

    async fn post_once<Req, Resp>(&self, url: &str, body: &Req) -> std::result::Result<Resp, String>
    where
        Req: Serialize + Sync,
        Resp: DeserializeOwned + Send,
    {
        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| format!("request failed: {e}"))?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = response.text().await.unwrap_or_default();
            return Err(format!("API returned {status}: {detail}"));
        }

        response.json().await.map_err(|e| format!("failed to parse response: {e}"))
    }

    async fn is_reachable(&self) -> bool {
        let url = format!("{}/api/tags", self.base_url);
        match self.client.get(&url).send().await {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }
}

// ── Ollama API request/response types ──────────────────────────────

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embedding: Vec<f32>,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Serialize)]
struct GenerateOptions {
    temperature: f32,
    num_predict: u32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

// ── Embedding provider ─────────────────────────────────────────────

/// An [`EmbeddingProvider`] backed by Ollama's `/api/embeddings` endpoint.
///
/// The embedding length is taken from [`ModelConfig::embed_dimensions`] or
/// probed from the server by [`OllamaEmbedder::connect`].
///
/// # Example
///
/// ```rust,ignore
/// use docqa_rag::{ModelConfig, OllamaEmbedder};
///
/// let embedder = OllamaEmbedder::connect(&ModelConfig::from_env()).await?;
/// let embedding = embedder.embed("hello world").await?;
/// ```
pub struct OllamaEmbedder {
    http: OllamaHttp,
    model: String,
    dimensions: usize,
}

impl OllamaEmbedder {
    /// Create an embedder, probing the server for the embedding length if the
    /// configuration does not declare it.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::EmbeddingFailure`] if the client cannot be built or
    /// the probe request fails.
    pub async fn connect(config: &ModelConfig) -> Result<Self> {
        let http = OllamaHttp::new(config).map_err(|e| client_error(&config.embed_model, e))?;
        let mut embedder = Self { http, model: config.embed_model.clone(), dimensions: 0 };

        embedder.dimensions = match config.embed_dimensions {
            Some(dimensions) => dimensions,
            None => embedder.request(DIMENSION_PROBE).await?.len(),
        };
        if embedder.dimensions == 0 {
            return Err(RagError::EmbeddingFailure {
                provider: "Ollama".into(),
                message: format!("model '{}' returned an empty embedding", embedder.model),
            });
        }

        info!(model = %embedder.model, dimensions = embedder.dimensions, "connected embedder");
        Ok(embedder)
    }

    async fn request(&self, text: &str) -> Result<Vec<f32>> {
        let body = EmbedRequest { model: &self.model, prompt: text };
        let response: EmbedResponse =
            self.http.post_json("/api/embeddings", &body).await.map_err(|message| {
                error!(provider = "Ollama", model = %self.model, error = %message, "embedding failed");
                RagError::EmbeddingFailure { provider: "Ollama".into(), message }
            })?;
        Ok(response.embedding)
    }
}

fn client_error(model: &str, e: reqwest::Error) -> RagError {
    RagError::EmbeddingFailure {
        provider: "Ollama".into(),
        message: format!("failed to create HTTP client for '{model}': {e}"),
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        debug!(provider = "Ollama", text_len = text.len(), "embedding single text");
        let embedding = self.request(text).await?;
        if embedding.len() != self.dimensions {
            return Err(RagError::DimensionMismatch {
                expected: self.dimensions,
                actual: embedding.len(),
            });
        }
        Ok(embedding)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

// ── Generator ──────────────────────────────────────────────────────

/// A [`Generator`] backed by Ollama's non-streaming `/api/generate` endpoint.
pub struct OllamaGenerator {
    http: OllamaHttp,
    model: String,
    temperature: f32,
    max_new_tokens: u32,
}

impl OllamaGenerator {
    /// Create a generator from the model configuration.
    ///
    /// No request is made until [`generate`](Generator::generate) is called.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::GenerationFailure`] if the HTTP client cannot be built.
    pub fn new(config: &ModelConfig) -> Result<Self> {
        let http = OllamaHttp::new(config).map_err(|e| RagError::GenerationFailure {
            provider: "Ollama".into(),
            message: format!("failed to create HTTP client: {e}"),
        })?;
        Ok(Self {
            http,
            model: config.generate_model.clone(),
            temperature: config.temperature,
            max_new_tokens: config.max_new_tokens,
        })
    }

    /// Whether the Ollama server answers on `/api/tags`.
    pub async fn health_check(&self) -> bool {
        self.http.is_reachable().await
    }
}

#[async_trait]
impl Generator for OllamaGenerator {
    async fn generate(&self, query: &str, context: &str) -> Result<String> {
        let prompt = PromptBuilder::build_rag_prompt(query, context);
        debug!(model = %self.model, prompt_len = prompt.len(), "generating answer");

        let body = GenerateRequest {
            model: &self.model,
            prompt: &prompt,
            stream: false,
            options: GenerateOptions {
                temperature: self.temperature,
                num_predict: self.max_new_tokens,
            },
        };
        let response: GenerateResponse =
            self.http.post_json("/api/generate", &body).await.map_err(|message| {
                error!(provider = "Ollama", model = %self.model, error = %message, "generation failed");
                RagError::GenerationFailure { provider: "Ollama".into(), message }
            })?;

        if response.response.trim().is_empty() {
            return Err(RagError::GenerationFailure {
                provider: "Ollama".into(),
                message: format!("model '{}' returned an empty answer", self.model),
            });
        }
        Ok(response.response)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
