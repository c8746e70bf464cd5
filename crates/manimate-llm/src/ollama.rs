use ollama_rs::Ollama;
use ollama_rs::generation::embeddings::request::{EmbeddingsInput, GenerateEmbeddingsRequest};
use reqwest::Url;

use crate::error::LlmError;
use crate::provider::{EmbeddingProvider, InputType, MAX_EMBED_BATCH};

pub const DEFAULT_BASE_URL: &str = "http://localhost:11434";
pub const DEFAULT_MODEL: &str = "nomic-embed-text";

const DEFAULT_PORT: u16 = 11434;

/// Local embeddings through an Ollama server.
///
/// Nomic models are trained with task prefixes, so documents and queries get
/// `search_document: ` and `search_query: ` prepended when the model name calls for it.
#[derive(Debug, Clone)]
pub struct OllamaProvider {
    client: Ollama,
    model: String,
    batch_size: usize,
    task_prefixes: bool,
}

impl OllamaProvider {
    #[must_use]
    pub fn new(base_url: &str, model: String) -> Self {
        let (host, port) = split_endpoint(base_url);
        let task_prefixes = model.starts_with("nomic-embed");
        Self {
            client: Ollama::new(host, port),
            model,
            batch_size: MAX_EMBED_BATCH,
            task_prefixes,
        }
    }

    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.clamp(1, MAX_EMBED_BATCH);
        self
    }

    #[must_use]
    pub fn with_task_prefixes(mut self, enabled: bool) -> Self {
        self.task_prefixes = enabled;
        self
    }

    fn prepare(&self, texts: &[String], input_type: InputType) -> Vec<String> {
        if !self.task_prefixes {
            return texts.to_vec();
        }
        let prefix = match input_type {
            InputType::Document => "search_document: ",
            InputType::Query => "search_query: ",
        };
        texts.iter().map(|t| format!("{prefix}{t}")).collect()
    }
}

impl EmbeddingProvider for OllamaProvider {
    async fn embed_batch(
        &self,
        texts: &[String],
        input_type: InputType,
    ) -> Result<Vec<Vec<f32>>, LlmError> {
        let mut vectors = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size) {
            let input = EmbeddingsInput::from(self.prepare(batch, input_type));
            let request = GenerateEmbeddingsRequest::new(self.model.clone(), input);
            let embeddings = match self.client.generate_embeddings(request).await {
                Ok(response) => response.embeddings,
                Err(e) => {
                    tracing::error!(model = %self.model, error = %e, "ollama embedding failed");
                    return Err(LlmError::Other(format!("ollama embedding request failed: {e}")));
                }
            };
            if embeddings.len() != batch.len() {
                return Err(LlmError::CountMismatch {
                    provider: "ollama",
                    expected: batch.len(),
                    got: embeddings.len(),
                });
            }
            vectors.extend(embeddings);
        }
        Ok(vectors)
    }

    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "ollama"
    }
}

/// Split a base URL into the `scheme://host` and port pair the Ollama client wants.
/// Unparseable input is handed through as the host with the default port.
fn split_endpoint(base_url: &str) -> (String, u16) {
    let Ok(url) = Url::parse(base_url.trim()) else {
        return (base_url.trim_end_matches('/').to_owned(), DEFAULT_PORT);
    };
    let Some(host) = url.host_str() else {
        return (base_url.trim_end_matches('/').to_owned(), DEFAULT_PORT);
    };
    let port = url.port().unwrap_or(DEFAULT_PORT);
    (format!("{}://{host}", url.scheme()), port)
}
