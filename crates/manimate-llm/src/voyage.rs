use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::LlmError;
use crate::provider::{EmbeddingProvider, InputType, MAX_EMBED_BATCH};
use crate::retry::{RetryPolicy, send_with_retry};

pub const DEFAULT_BASE_URL: &str = "https://api.voyageai.com/v1";
pub const DEFAULT_MODEL: &str = "voyage-code-3";

#[derive(Clone)]
pub struct VoyageProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    batch_size: usize,
    retry: RetryPolicy,
}

impl fmt::Debug for VoyageProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VoyageProvider")
            .field("client", &"<reqwest::Client>")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("batch_size", &self.batch_size)
            .field("max_retries", &self.retry.max_retries)
            .finish()
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    input: &'a [String],
    model: &'a str,
    input_type: &'static str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    #[serde(default)]
    index: usize,
}

impl VoyageProvider {
    /// # Errors
    ///
    /// Returns an error if the API key is empty or the HTTP client cannot be built.
    pub fn new(api_key: String, mut base_url: String, model: String) -> Result<Self, LlmError> {
        if api_key.trim().is_empty() {
            return Err(LlmError::MissingApiKey { provider: "voyage" });
        }
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Ok(Self {
            client: crate::http::default_client()?,
            api_key,
            base_url,
            model,
            batch_size: MAX_EMBED_BATCH,
            retry: RetryPolicy::default(),
        })
    }

    /// Cap the number of texts per upstream request. Values above
    /// [`MAX_EMBED_BATCH`] are clamped.
    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.clamp(1, MAX_EMBED_BATCH);
        self
    }

    /// Retries spent on 429 and transient 5xx responses before giving up.
    #[must_use]
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.retry.max_retries = max_retries;
        self
    }

    #[must_use]
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    async fn embed_chunk(
        &self,
        texts: &[String],
        input_type: InputType,
    ) -> Result<Vec<Vec<f32>>, LlmError> {
        let body = EmbeddingRequest {
            input: texts,
            model: &self.model,
            input_type: input_type.as_str(),
        };
        let url = format!("{}/embeddings", self.base_url);

        let response = send_with_retry("voyage", self.retry, || {
            self.client
                .post(&url)
                .bearer_auth(&self.api_key)
                .json(&body)
                .send()
        })
        .await?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            tracing::error!(%status, body = %text, "Voyage embedding API error");
            return Err(LlmError::Api {
                provider: "voyage",
                status: status.as_u16(),
                message: truncate_message(&text),
            });
        }

        let resp: EmbeddingResponse = serde_json::from_str(&text)?;
        order_embeddings(resp.data, texts.len())
    }
}

fn order_embeddings(
    mut data: Vec<EmbeddingData>,
    expected: usize,
) -> Result<Vec<Vec<f32>>, LlmError> {
    if data.is_empty() {
        return Err(LlmError::EmptyResponse { provider: "voyage" });
    }
    if data.len() != expected {
        return Err(LlmError::CountMismatch {
            provider: "voyage",
            expected,
            got: data.len(),
        });
    }
    data.sort_by_key(|d| d.index);
    Ok(data.into_iter().map(|d| d.embedding).collect())
}

fn truncate_message(text: &str) -> String {
    text.chars().take(500).collect()
}

impl EmbeddingProvider for VoyageProvider {
    async fn embed_batch(
        &self,
        texts: &[String],
        input_type: InputType,
    ) -> Result<Vec<Vec<f32>>, LlmError> {
        let mut out = Vec::with_capacity(texts.len());
        for chunk in texts.chunks(self.batch_size) {
            out.extend(self.embed_chunk(chunk, input_type).await?);
        }
        Ok(out)
    }

    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "voyage"
    }
}
