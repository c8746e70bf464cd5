use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::error::LlmError;

/// Upper bound on documents sent to a provider in a single upstream request.
pub const MAX_EMBED_BATCH: usize = 128;

/// Hint passed to providers that embed documents and queries asymmetrically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputType {
    Document,
    Query,
}

impl InputType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Document => "document",
            Self::Query => "query",
        }
    }
}

pub trait EmbeddingProvider: Send + Sync {
    /// Embed a batch of texts, returning one vector per input in input order.
    ///
    /// Implementations split the batch into upstream requests of at most
    /// [`MAX_EMBED_BATCH`] texts.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider fails to communicate or the response is invalid.
    fn embed_batch(
        &self,
        texts: &[String],
        input_type: InputType,
    ) -> impl Future<Output = Result<Vec<Vec<f32>>, LlmError>> + Send;

    /// Embed a single search query.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider fails or returns no vector.
    fn embed_query(&self, text: &str) -> impl Future<Output = Result<Vec<f32>, LlmError>> + Send {
        let texts = vec![text.to_owned()];
        async move {
            let name = self.name();
            self.embed_batch(&texts, InputType::Query)
                .await?
                .into_iter()
                .next()
                .ok_or_else(|| LlmError::Other(format!("empty query embedding from {name}")))
        }
    }

    fn name(&self) -> &str;
}
