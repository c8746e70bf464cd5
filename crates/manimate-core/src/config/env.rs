use std::path::PathBuf;

use super::Config;

impl Config {
    pub(crate) fn apply_env_overrides(&mut self) {
        self.apply_env_overrides_embedding();
        self.apply_env_overrides_store();
        self.apply_env_overrides_index();
        self.apply_env_overrides_retrieval();
    }

    fn apply_env_overrides_embedding(&mut self) {
        if let Ok(v) = std::env::var("MANIMATE_EMBEDDING_PROVIDER") {
            if let Ok(kind) = serde_json::from_value(serde_json::Value::String(v.clone())) {
                self.embedding.provider = kind;
            } else {
                tracing::warn!("ignoring invalid MANIMATE_EMBEDDING_PROVIDER value: {v}");
            }
        }
        if let Ok(v) = std::env::var("MANIMATE_EMBEDDING_MODEL") {
            self.embedding.model = Some(v);
        }
        if let Ok(v) = std::env::var("MANIMATE_EMBEDDING_BASE_URL") {
            self.embedding.base_url = Some(v);
        }
        if let Ok(v) = std::env::var("MANIMATE_EMBEDDING_BATCH_SIZE")
            && let Ok(size) = v.parse::<usize>()
        {
            self.embedding.batch_size = size;
        }
        if let Ok(v) = std::env::var("MANIMATE_EMBEDDING_MAX_RETRIES")
            && let Ok(retries) = v.parse::<u32>()
        {
            self.embedding.max_retries = retries;
        }
    }

    fn apply_env_overrides_store(&mut self) {
        if let Ok(v) = std::env::var("MANIMATE_STORE_BACKEND") {
            if let Ok(backend) = serde_json::from_value(serde_json::Value::String(v.clone())) {
                self.store.backend = backend;
            } else {
                tracing::warn!("ignoring invalid MANIMATE_STORE_BACKEND value: {v}");
            }
        }
        if let Ok(v) = std::env::var("MANIMATE_QDRANT_URL") {
            self.store.qdrant_url = v;
        }
        if let Ok(v) = std::env::var("MANIMATE_API_COLLECTION") {
            self.store.api_collection = v;
        }
        if let Ok(v) = std::env::var("MANIMATE_EXAMPLES_COLLECTION") {
            self.store.examples_collection = v;
        }
    }

    fn apply_env_overrides_index(&mut self) {
        if let Ok(v) = std::env::var("MANIMATE_SOURCE_ROOT") {
            self.index.source_root = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("MANIMATE_PACKAGE_NAME") {
            self.index.package_name = v;
        }
        if let Ok(v) = std::env::var("MANIMATE_EXAMPLES_DIR") {
            self.index.examples_dir = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("MANIMATE_INDEX_BATCH_SIZE")
            && let Ok(size) = v.parse::<usize>()
        {
            self.index.batch_size = size;
        }
        if let Ok(v) = std::env::var("MANIMATE_AUTO_BUILD") {
            if let Ok(enabled) = v.parse::<bool>() {
                self.index.auto_build = enabled;
            } else {
                tracing::warn!("ignoring invalid MANIMATE_AUTO_BUILD value: {v}");
            }
        }
    }

    fn apply_env_overrides_retrieval(&mut self) {
        if let Ok(v) = std::env::var("MANIMATE_TOP_K_API")
            && let Ok(k) = v.parse::<usize>()
        {
            self.retrieval.top_k_api = k;
        }
        if let Ok(v) = std::env::var("MANIMATE_TOP_K_EXAMPLES")
            && let Ok(k) = v.parse::<usize>()
        {
            self.retrieval.top_k_examples = k;
        }
        if let Ok(v) = std::env::var("MANIMATE_FALLBACK_MAX_RESULTS")
            && let Ok(n) = v.parse::<usize>()
        {
            self.retrieval.fallback_max_results = n;
        }
    }
}
