// /////////////////////////////////////////////////////////////////////////////
// Krai Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # External Service Clients
//!
//! `reqwest`-backed adapters for the `EmbeddingClient`, `VisionClient`,
//! `OcrClient` and `ScrapeClient` ports (`SPEC_FULL.md` §4.7/§4.4/§2). The
//! embedding and vision/OCR backends speak the OpenAI-compatible HTTP API
//! shape, mirroring the batch-first, fixed-dimension
//! `EmbeddingProvider` contract in
//! `examples/lexlapax-rs-llmspell/llmspell-core/src/traits/embedding.rs`.
//! A non-2xx response maps to a permanent error (4xx) or transient error
//! (5xx/network failure) per the service's `RetryPolicy` tag.

use base64::Engine;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use krai_pipeline_domain::error::PipelineError;
use krai_pipeline_domain::services::embedding_client::EmbeddingClient;
use krai_pipeline_domain::services::scrape_client::{ScrapeClient, ScrapedPage};
use krai_pipeline_domain::services::vision_client::{OcrClient, VisionClient, VisionDescription};

fn map_status(service: &'static str, status: StatusCode, body: String) -> PipelineError {
    if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
        PipelineError::transient(service, format!("{status}: {body}"))
    } else {
        PipelineError::permanent(service, format!("{status}: {body}"))
    }
}

fn map_transport(service: &'static str, error: reqwest::Error) -> PipelineError {
    if error.is_timeout() || error.is_connect() {
        PipelineError::transient(service, error.to_string())
    } else {
        PipelineError::permanent(service, error.to_string())
    }
}

// ---------------------------------------------------------------------------
// Embedding client
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingDatum>,
}

#[derive(Deserialize)]
struct EmbeddingDatum {
    embedding: Vec<f32>,
    index: usize,
}

pub struct HttpEmbeddingClient {
    client: Client,
    endpoint: String,
    api_key: String,
    model: String,
    dimension: usize,
}

impl HttpEmbeddingClient {
    pub fn new(client: Client, endpoint: impl Into<String>, api_key: impl Into<String>, model: impl Into<String>, dimension: usize) -> Self {
        Self { client, endpoint: endpoint.into(), api_key: api_key.into(), model: model.into(), dimension }
    }
}

#[async_trait::async_trait]
impl EmbeddingClient for HttpEmbeddingClient {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, PipelineError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&EmbeddingRequest { model: &self.model, input: texts })
            .send()
            .await
            .map_err(|e| map_transport("embedder", e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(map_status("embedder", status, body));
        }

        let mut parsed: EmbeddingResponse = response.json().await.map_err(|e| PipelineError::transient("embedder", e.to_string()))?;
        if parsed.data.len() != texts.len() {
            return Err(PipelineError::transient(
                "embedder",
                format!("expected {} embeddings, got {}", texts.len(), parsed.data.len()),
            ));
        }

        parsed.data.sort_by_key(|d| d.index);
        for datum in &parsed.data {
            if datum.embedding.len() != self.dimension {
                return Err(PipelineError::transient(
                    "embedder",
                    format!("expected dimension {}, got {}", self.dimension, datum.embedding.len()),
                ));
            }
        }

        Ok(parsed.data.into_iter().map(|d| d.embedding).collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

// ---------------------------------------------------------------------------
// Vision / OCR clients
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    response_format: Option<ResponseFormat<'a>>,
}

#[derive(Serialize)]
struct ResponseFormat<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
}

#[derive(Serialize)]
struct ChatMessage {
    role: &'static str,
    content: Vec<ChatContent>,
}

#[derive(Serialize)]
#[serde(tag = "type")]
enum ChatContent {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "image_url")]
    ImageUrl {
        #[serde(rename = "image_url")]
        image_url: ImageUrl,
    },
}

#[derive(Serialize)]
struct ImageUrl {
    url: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: String,
}

#[derive(Deserialize)]
struct VisionCaption {
    description: String,
    confidence: f32,
}

fn image_message(prompt: &str, png_bytes: &[u8]) -> ChatMessage {
    let data_url = format!("data:image/png;base64,{}", base64::engine::general_purpose::STANDARD.encode(png_bytes));
    ChatMessage {
        role: "user",
        content: vec![
            ChatContent::Text { text: prompt.to_string() },
            ChatContent::ImageUrl { image_url: ImageUrl { url: data_url } },
        ],
    }
}

async fn chat_completion(client: &Client, endpoint: &str, api_key: &str, service: &'static str, request: &ChatRequest<'_>) -> Result<String, PipelineError> {
    let response = client
        .post(endpoint)
        .bearer_auth(api_key)
        .json(request)
        .send()
        .await
        .map_err(|e| map_transport(service, e))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(map_status(service, status, body));
    }

    let mut parsed: ChatResponse = response.json().await.map_err(|e| PipelineError::transient(service, e.to_string()))?;
    let choice = parsed.choices.pop().ok_or_else(|| PipelineError::transient(service, "no choices in response"))?;
    Ok(choice.message.content)
}

pub struct HttpVisionClient {
    client: Client,
    endpoint: String,
    api_key: String,
    model: String,
}

impl HttpVisionClient {
    pub fn new(client: Client, endpoint: impl Into<String>, api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self { client, endpoint: endpoint.into(), api_key: api_key.into(), model: model.into() }
    }
}

const VISION_PROMPT: &str =
    "Describe this image from a printer/MFP service manual in one sentence. \
     Respond as JSON: {\"description\": string, \"confidence\": number between 0 and 1}.";

#[async_trait::async_trait]
impl VisionClient for HttpVisionClient {
    async fn describe_image(&self, png_bytes: &[u8]) -> Result<VisionDescription, PipelineError> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![image_message(VISION_PROMPT, png_bytes)],
            response_format: Some(ResponseFormat { kind: "json_object" }),
        };
        let content = chat_completion(&self.client, &self.endpoint, &self.api_key, "vision", &request).await?;

        match serde_json::from_str::<VisionCaption>(&content) {
            Ok(caption) => Ok(VisionDescription { description: caption.description, confidence: caption.confidence.clamp(0.0, 1.0) }),
            Err(_) => Ok(VisionDescription { description: content, confidence: 0.5 }),
        }
    }
}

const OCR_PROMPT: &str = "Transcribe any text visible in this image verbatim. If there is no text, respond with exactly NONE.";

pub struct HttpOcrClient {
    client: Client,
    endpoint: String,
    api_key: String,
    model: String,
}

impl HttpOcrClient {
    pub fn new(client: Client, endpoint: impl Into<String>, api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self { client, endpoint: endpoint.into(), api_key: api_key.into(), model: model.into() }
    }
}

#[async_trait::async_trait]
impl OcrClient for HttpOcrClient {
    async fn extract_text(&self, png_bytes: &[u8]) -> Result<Option<String>, PipelineError> {
        let request = ChatRequest { model: &self.model, messages: vec![image_message(OCR_PROMPT, png_bytes)], response_format: None };
        let content = chat_completion(&self.client, &self.endpoint, &self.api_key, "vision", &request).await?;

        let trimmed = content.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("none") {
            Ok(None)
        } else {
            Ok(Some(trimmed.to_string()))
        }
    }
}

// ---------------------------------------------------------------------------
// Scrape client
// ---------------------------------------------------------------------------

pub struct HttpScrapeClient {
    client: Client,
}

impl HttpScrapeClient {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait::async_trait]
impl ScrapeClient for HttpScrapeClient {
    async fn scrape(&self, url: &str) -> Result<ScrapedPage, PipelineError> {
        if !url.starts_with("https://") {
            return Err(PipelineError::permanent("scrape", "only https URLs are supported"));
        }

        let response = self.client.get(url).send().await.map_err(|e| map_transport("scrape", e))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(map_status("scrape", status, body));
        }

        let content = response.text().await.map_err(|e| PipelineError::transient("scrape", e.to_string()))?;
        let content_hash = format!("{:x}", Sha256::digest(content.as_bytes()));

        Ok(ScrapedPage { content, content_hash, backend: "http" })
    }
}
