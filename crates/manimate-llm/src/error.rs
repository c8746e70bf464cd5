/// Failures from an embedding backend.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("embedding request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("malformed embedding response: {0}")]
    Json(#[from] serde_json::Error),

    #[error("rate limit persisted after retries")]
    RateLimited,

    #[error("{provider} needs an API key")]
    MissingApiKey { provider: &'static str },

    #[error("{provider} rejected the request (HTTP {status}): {message}")]
    Api {
        provider: &'static str,
        status: u16,
        message: String,
    },

    #[error("{provider} returned no embeddings")]
    EmptyResponse { provider: &'static str },

    #[error("{provider} returned {got} embeddings for {expected} inputs")]
    CountMismatch {
        provider: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, LlmError>;
