#[cfg(feature = "mock")]
use crate::mock::MockEmbedder;
use crate::ollama::OllamaProvider;
use crate::provider::{EmbeddingProvider, InputType};
use crate::voyage::VoyageProvider;

/// Generates a match over all `AnyEmbedder` variants, binding the inner provider
/// and evaluating the given expression for each arm.
macro_rules! delegate_embedder {
    ($self:expr, |$p:ident| $expr:expr) => {
        match $self {
            AnyEmbedder::Voyage($p) => $expr,
            AnyEmbedder::Ollama($p) => $expr,
            #[cfg(feature = "mock")]
            AnyEmbedder::Mock($p) => $expr,
        }
    };
}

/// Runtime-selected embedding backend.
#[derive(Debug, Clone)]
pub enum AnyEmbedder {
    Voyage(VoyageProvider),
    Ollama(OllamaProvider),
    #[cfg(feature = "mock")]
    Mock(MockEmbedder),
}

impl EmbeddingProvider for AnyEmbedder {
    async fn embed_batch(
        &self,
        texts: &[String],
        input_type: InputType,
    ) -> Result<Vec<Vec<f32>>, crate::LlmError> {
        delegate_embedder!(self, |p| p.embed_batch(texts, input_type).await)
    }

    fn name(&self) -> &str {
        delegate_embedder!(self, |p| p.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delegates_name() {
        let p = AnyEmbedder::Ollama(OllamaProvider::new("http://localhost:11434", "m".into()));
        assert_eq!(p.name(), "ollama");
    }

    #[cfg(feature = "mock")]
    #[tokio::test]
    async fn delegates_embed_to_mock() {
        let p = AnyEmbedder::Mock(MockEmbedder::new(4));
        let vectors = p
            .embed_batch(&["a".to_owned(), "b".to_owned()], InputType::Document)
            .await
            .unwrap();
        assert_eq!(vectors.len(), 2);
        assert_eq!(vectors[0].len(), 4);
    }
}
