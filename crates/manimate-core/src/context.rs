//! Generation context assembly: user-selected examples, semantic retrieval, and the
//! keyword fallback, rendered into a prompt section.

use std::collections::HashSet;
use std::fmt::Write as _;
use std::sync::Arc;

use manimate_index::{
    ApiRef, DegradeReason, Example, ExampleHit, ExampleLibrary, KeywordScorer, RagRetriever,
    RetrievalOutcome,
};
use manimate_llm::EmbeddingProvider;
use serde::{Serialize, Serializer};

/// Examples rendered into a prompt section.
pub const MAX_PROMPT_EXAMPLES: usize = 2;

/// Where the reference examples of a [`GenerationContext`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ContextSource {
    /// Explicitly selected by id.
    Selected,
    Semantic,
    /// Semantic API refs, keyword-ranked examples.
    Mixed,
    Keyword,
}

/// An example as shown to the code generator, regardless of how it was found.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReferenceExample {
    pub id: String,
    pub name: String,
    pub tags: Vec<String>,
    pub description: String,
    pub code: String,
    pub notes: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f32>,
}

impl From<&Example> for ReferenceExample {
    fn from(example: &Example) -> Self {
        Self {
            id: example.id.clone(),
            name: example.name.clone(),
            tags: example.tags.clone(),
            description: example.description.clone(),
            code: example.code.clone(),
            notes: example.notes.clone(),
            score: None,
        }
    }
}

impl From<ExampleHit> for ReferenceExample {
    fn from(hit: ExampleHit) -> Self {
        Self {
            id: hit.id,
            name: hit.name,
            tags: hit.tags,
            description: hit.description,
            code: hit.code,
            notes: hit.notes,
            score: Some(hit.score),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationContext {
    pub prompt: String,
    pub source: ContextSource,
    pub examples: Vec<ReferenceExample>,
    pub api_refs: Vec<ApiRef>,
    /// Why semantic retrieval was skipped or failed, if it was.
    #[serde(
        serialize_with = "serialize_reason",
        skip_serializing_if = "Option::is_none"
    )]
    pub degraded: Option<DegradeReason>,
}

#[allow(clippy::ref_option)]
fn serialize_reason<S: Serializer>(
    reason: &Option<DegradeReason>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match reason {
        Some(reason) => serializer.collect_str(reason),
        None => serializer.serialize_none(),
    }
}

impl GenerationContext {
    /// Render the reference examples (at most [`MAX_PROMPT_EXAMPLES`]) and API
    /// reference blocks for a system prompt. Empty when there is nothing to show.
    #[must_use]
    pub fn to_prompt_section(&self) -> String {
        let mut out = String::new();

        if !self.examples.is_empty() {
            out.push_str("REFERENCE EXAMPLES:\n\n");
            for (i, ex) in self.examples.iter().take(MAX_PROMPT_EXAMPLES).enumerate() {
                let _ = writeln!(out, "Example {}: {}", i + 1, ex.name);
                let _ = writeln!(out, "Tags: {}", ex.tags.join(", "));
                out.push_str("```python\n");
                out.push_str(ex.code.trim_end());
                out.push_str("\n```\n");
                if !ex.notes.is_empty() {
                    let _ = writeln!(out, "Notes: {}", ex.notes.trim());
                }
                out.push('\n');
            }
        }

        if !self.api_refs.is_empty() {
            out.push_str("API REFERENCE:\n\n");
            for api in &self.api_refs {
                out.push_str(api.content.trim_end());
                out.push_str("\n\n");
            }
        }

        out
    }
}

/// Chooses reference material for a generation request.
///
/// Semantic retrieval is preferred; when the retriever is not ready, failed, or finds no
/// examples, the keyword scorer ranks the local library instead.
pub struct ContextAssembler<P> {
    retriever: Arc<RagRetriever<P>>,
    library: Arc<ExampleLibrary>,
    scorer: KeywordScorer,
}

impl<P: EmbeddingProvider> ContextAssembler<P> {
    #[must_use]
    pub fn new(
        retriever: Arc<RagRetriever<P>>,
        library: Arc<ExampleLibrary>,
        scorer: KeywordScorer,
    ) -> Self {
        Self {
            retriever,
            library,
            scorer,
        }
    }

    #[must_use]
    pub fn retriever(&self) -> &Arc<RagRetriever<P>> {
        &self.retriever
    }

    #[must_use]
    pub fn library(&self) -> &ExampleLibrary {
        &self.library
    }

    pub async fn assemble(&self, prompt: &str, selected_ids: &[String]) -> GenerationContext {
        let selected = self.resolve_selected(selected_ids);
        if !selected.is_empty() {
            let (api_refs, degraded) = if self.retriever.is_ready() {
                match self.retriever.retrieve(prompt).await {
                    RetrievalOutcome::Ok(results) => (results.api_refs, None),
                    RetrievalOutcome::Degraded(reason) => (Vec::new(), Some(reason)),
                }
            } else {
                (Vec::new(), None)
            };
            return GenerationContext {
                prompt: prompt.to_owned(),
                source: ContextSource::Selected,
                examples: selected,
                api_refs,
                degraded,
            };
        }

        match self.retriever.retrieve(prompt).await {
            RetrievalOutcome::Ok(results) if !results.examples.is_empty() => GenerationContext {
                prompt: prompt.to_owned(),
                source: ContextSource::Semantic,
                examples: results.examples.into_iter().map(Into::into).collect(),
                api_refs: results.api_refs,
                degraded: None,
            },
            RetrievalOutcome::Ok(results) => {
                tracing::debug!("no semantic example hits, ranking examples by keyword");
                GenerationContext {
                    prompt: prompt.to_owned(),
                    source: ContextSource::Mixed,
                    examples: self.keyword_examples(prompt),
                    api_refs: results.api_refs,
                    degraded: None,
                }
            }
            RetrievalOutcome::Degraded(reason) => {
                tracing::info!(
                    reason = %reason,
                    "semantic retrieval unavailable, using keyword fallback"
                );
                GenerationContext {
                    prompt: prompt.to_owned(),
                    source: ContextSource::Keyword,
                    examples: self.keyword_examples(prompt),
                    api_refs: Vec::new(),
                    degraded: Some(reason),
                }
            }
        }
    }

    fn resolve_selected(&self, ids: &[String]) -> Vec<ReferenceExample> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for id in ids {
            if !seen.insert(id.as_str()) {
                continue;
            }
            match self.library.get(id) {
                Some(example) => out.push(ReferenceExample::from(example)),
                None => tracing::warn!(id = %id, "selected example not found"),
            }
        }
        out
    }

    fn keyword_examples(&self, prompt: &str) -> Vec<ReferenceExample> {
        self.scorer
            .search(self.library.list(), prompt)
            .into_iter()
            .map(ReferenceExample::from)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use manimate_index::{Difficulty, Indexer, IndexerConfig, RetrieverConfig};
    use manimate_llm::mock::MockEmbedder;
    use manimate_store::InMemoryVectorStore;
    use tempfile::TempDir;

    use super::*;

    fn example(id: &str, name: &str, tags: &[&str]) -> Example {
        Example {
            id: id.into(),
            name: name.into(),
            tags: tags.iter().map(|t| (*t).to_owned()).collect(),
            difficulty: Difficulty::Easy,
            description: format!("{name} demo"),
            code: format!("class {}(Scene):\n    pass\n", name.replace(' ', "")),
            notes: String::new(),
        }
    }

    fn write_example(root: &std::path::Path, id: &str, name: &str, tags: &[&str]) {
        let dir = root.join(id);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join("example.py"),
            format!("class {}(Scene):\n    pass\n", name.replace(' ', "")),
        )
        .unwrap();
        let meta = serde_json::json!({"name": name, "tags": tags, "difficulty": "easy"});
        std::fs::write(dir.join("meta.json"), meta.to_string()).unwrap();
    }

    fn fixture(with_curated: bool) -> TempDir {
        let dir = tempfile::tempdir().unwrap();
        let lib = dir.path().join("lib");
        std::fs::create_dir_all(&lib).unwrap();
        std::fs::write(
            lib.join("arrows.py"),
            "class Arrow:\n    \"\"\"A line with a tip.\"\"\"\n\n    def set_tip(self, tip):\n        pass\n",
        )
        .unwrap();
        let curated = dir.path().join("curated");
        std::fs::create_dir_all(&curated).unwrap();
        if with_curated {
            write_example(&curated, "01_axes_plot", "Axes Plot", &["axes", "plot"]);
            write_example(&curated, "02_vector_arrow", "Vector Arrow", &["vector"]);
        }
        dir
    }

    fn retriever(dir: &TempDir) -> Arc<RagRetriever<MockEmbedder>> {
        let config = IndexerConfig {
            source_root: dir.path().join("lib"),
            examples_dir: dir.path().join("curated"),
            ..IndexerConfig::default()
        };
        let indexer = Indexer::new(
            Arc::new(InMemoryVectorStore::new()),
            Arc::new(MockEmbedder::new(32)),
            config,
        );
        Arc::new(RagRetriever::new(indexer, RetrieverConfig::default()))
    }

    fn library() -> Arc<ExampleLibrary> {
        Arc::new(ExampleLibrary::from_examples(vec![
            example("01_axes_plot", "Axes Plot", &["axes", "plot"]),
            example("02_vector_arrow", "Vector Arrow", &["vector"]),
            example("03_square", "Square Spin", &["square"]),
        ]))
    }

    #[tokio::test]
    async fn uninitialized_retriever_falls_back_to_keywords() {
        let dir = fixture(true);
        let assembler = ContextAssembler::new(retriever(&dir), library(), KeywordScorer::default());

        let ctx = assembler.assemble("plot axes function", &[]).await;
        assert_eq!(ctx.source, ContextSource::Keyword);
        assert_eq!(ctx.degraded, Some(DegradeReason::NotReady));
        assert!(ctx.api_refs.is_empty());
        assert_eq!(ctx.examples.len(), 1);
        assert_eq!(ctx.examples[0].id, "01_axes_plot");
        assert!(ctx.examples[0].score.is_none());
    }

    #[tokio::test]
    async fn ready_retriever_uses_semantic_results() {
        let dir = fixture(true);
        let retriever = retriever(&dir);
        retriever.initialize(false).await.unwrap();
        let assembler = ContextAssembler::new(retriever, library(), KeywordScorer::default());

        let ctx = assembler.assemble("draw an arrow with a tip", &[]).await;
        assert_eq!(ctx.source, ContextSource::Semantic);
        assert!(ctx.degraded.is_none());
        assert_eq!(ctx.examples.len(), 2);
        assert!(ctx.examples.iter().all(|e| e.score.is_some()));
        assert_eq!(ctx.api_refs[0].name, "Arrow");
    }

    #[tokio::test]
    async fn empty_example_hits_mix_in_keyword_examples() {
        let dir = fixture(false);
        let retriever = retriever(&dir);
        retriever.initialize(false).await.unwrap();
        let assembler = ContextAssembler::new(retriever, library(), KeywordScorer::default());

        let ctx = assembler.assemble("vector arrow", &[]).await;
        assert_eq!(ctx.source, ContextSource::Mixed);
        assert!(!ctx.api_refs.is_empty());
        assert_eq!(ctx.examples[0].id, "02_vector_arrow");
    }

    #[tokio::test]
    async fn selected_ids_win_and_keep_api_refs() {
        let dir = fixture(true);
        let retriever = retriever(&dir);
        retriever.initialize(false).await.unwrap();
        let assembler = ContextAssembler::new(retriever, library(), KeywordScorer::default());

        let ids = vec![
            "03_square".to_owned(),
            "missing".to_owned(),
            "03_square".to_owned(),
        ];
        let ctx = assembler.assemble("arrow tip", &ids).await;
        assert_eq!(ctx.source, ContextSource::Selected);
        assert_eq!(ctx.examples.len(), 1);
        assert_eq!(ctx.examples[0].id, "03_square");
        assert!(!ctx.api_refs.is_empty());
    }

    #[tokio::test]
    async fn selected_ids_without_ready_retriever() {
        let dir = fixture(true);
        let assembler = ContextAssembler::new(retriever(&dir), library(), KeywordScorer::default());

        let ctx = assembler
            .assemble("anything", &["01_axes_plot".to_owned()])
            .await;
        assert_eq!(ctx.source, ContextSource::Selected);
        assert!(ctx.api_refs.is_empty());
        assert!(ctx.degraded.is_none());
    }

    #[tokio::test]
    async fn unknown_selected_ids_fall_through_to_retrieval() {
        let dir = fixture(true);
        let assembler = ContextAssembler::new(retriever(&dir), library(), KeywordScorer::default());

        let ctx = assembler.assemble("square", &["nope".to_owned()]).await;
        assert_eq!(ctx.source, ContextSource::Keyword);
        assert_eq!(ctx.examples[0].id, "03_square");
    }

    fn reference(name: &str, notes: &str) -> ReferenceExample {
        ReferenceExample {
            notes: notes.into(),
            ..ReferenceExample::from(&example(&name.to_lowercase(), name, &["a", "b"]))
        }
    }

    #[test]
    fn prompt_section_caps_examples_and_lists_api() {
        let ctx = GenerationContext {
            prompt: "p".into(),
            source: ContextSource::Semantic,
            examples: vec![
                reference("One", "Keep it short"),
                reference("Two", ""),
                reference("Three", ""),
            ],
            api_refs: vec![ApiRef {
                id: "manim.Arrow".into(),
                name: "Arrow".into(),
                module: "manim".into(),
                kind: "class".into(),
                content: "Class: Arrow\nModule: manim".into(),
                score: 0.8,
            }],
            degraded: None,
        };

        let section = ctx.to_prompt_section();
        assert!(section.starts_with("REFERENCE EXAMPLES:\n\nExample 1: One\nTags: a, b\n```python\nclass One(Scene):\n    pass\n```\nNotes: Keep it short\n\n"));
        assert!(section.contains("Example 2: Two"));
        assert!(!section.contains("Three"));
        assert!(section.contains("API REFERENCE:\n\nClass: Arrow\nModule: manim\n\n"));
    }

    #[test]
    fn prompt_section_empty_without_material() {
        let ctx = GenerationContext {
            prompt: "p".into(),
            source: ContextSource::Keyword,
            examples: Vec::new(),
            api_refs: Vec::new(),
            degraded: Some(DegradeReason::NotReady),
        };
        assert!(ctx.to_prompt_section().is_empty());
    }

    #[test]
    fn context_serializes_reason_as_text() {
        let ctx = GenerationContext {
            prompt: "p".into(),
            source: ContextSource::Keyword,
            examples: Vec::new(),
            api_refs: Vec::new(),
            degraded: Some(DegradeReason::NotReady),
        };
        let json = serde_json::to_value(&ctx).unwrap();
        assert_eq!(json["source"], "keyword");
        assert_eq!(json["degraded"], "retriever not initialized");
    }
}
