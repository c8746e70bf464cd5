//! Fixed-schema views over the flat metadata stored with each document.
//!
//! Decoding never fails: absent or malformed fields fall back to defaults so a
//! hand-edited or older collection still yields usable search results.

use manimate_store::Metadata;
use serde_json::Value;

use crate::chunker::Chunk;
use crate::examples::{Difficulty, Example};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChunkMetadata {
    pub kind: String,
    pub name: String,
    pub module: String,
    pub bases: Vec<String>,
    pub methods: Vec<String>,
    pub content_hash: String,
}

impl ChunkMetadata {
    #[must_use]
    pub fn from_chunk(chunk: &Chunk, max_methods: usize) -> Self {
        Self {
            kind: chunk.kind.as_str().to_owned(),
            name: chunk.name.clone(),
            module: chunk.module_path.clone(),
            bases: chunk.bases.clone(),
            methods: chunk
                .method_signatures
                .iter()
                .take(max_methods)
                .cloned()
                .collect(),
            content_hash: chunk.content_hash.clone(),
        }
    }

    #[must_use]
    pub fn to_payload(&self) -> Metadata {
        Metadata::from([
            ("kind".into(), Value::String(self.kind.clone())),
            ("name".into(), Value::String(self.name.clone())),
            ("module".into(), Value::String(self.module.clone())),
            ("bases".into(), Value::String(encode_list(&self.bases))),
            ("methods".into(), Value::String(encode_list(&self.methods))),
            (
                "content_hash".into(),
                Value::String(self.content_hash.clone()),
            ),
        ])
    }

    #[must_use]
    pub fn from_payload(payload: &Metadata) -> Self {
        Self {
            kind: string_field(payload, "kind"),
            name: string_field(payload, "name"),
            module: string_field(payload, "module"),
            bases: decode_list(payload.get("bases")),
            methods: decode_list(payload.get("methods")),
            content_hash: string_field(payload, "content_hash"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExampleMetadata {
    pub name: String,
    pub tags: Vec<String>,
    pub difficulty: Difficulty,
    pub description: String,
    pub code: String,
    pub notes: String,
}

impl From<&Example> for ExampleMetadata {
    fn from(example: &Example) -> Self {
        Self {
            name: example.name.clone(),
            tags: example.tags.clone(),
            difficulty: example.difficulty,
            description: example.description.clone(),
            code: example.code.clone(),
            notes: example.notes.clone(),
        }
    }
}

impl ExampleMetadata {
    #[must_use]
    pub fn to_payload(&self) -> Metadata {
        Metadata::from([
            ("name".into(), Value::String(self.name.clone())),
            ("tags".into(), Value::String(encode_list(&self.tags))),
            (
                "difficulty".into(),
                Value::String(self.difficulty.as_str().to_owned()),
            ),
            ("description".into(), Value::String(self.description.clone())),
            ("code".into(), Value::String(self.code.clone())),
            ("notes".into(), Value::String(self.notes.clone())),
        ])
    }

    #[must_use]
    pub fn from_payload(payload: &Metadata) -> Self {
        Self {
            name: string_field(payload, "name"),
            tags: decode_list(payload.get("tags")),
            difficulty: Difficulty::parse_lenient(&string_field(payload, "difficulty")),
            description: string_field(payload, "description"),
            code: string_field(payload, "code"),
            notes: string_field(payload, "notes"),
        }
    }
}

fn string_field(payload: &Metadata, key: &str) -> String {
    match payload.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    }
}

fn encode_list(items: &[String]) -> String {
    serde_json::to_string(items).unwrap_or_else(|_| "[]".into())
}

/// A JSON-encoded string array, or a native array. Anything else is empty.
pub(crate) fn decode_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::String(s)) => match serde_json::from_str::<Value>(s) {
            Ok(Value::Array(items)) => strings_of(&items),
            _ => Vec::new(),
        },
        Some(Value::Array(items)) => strings_of(items),
        _ => Vec::new(),
    }
}

fn strings_of(items: &[Value]) -> Vec<String> {
    items
        .iter()
        .filter_map(|v| v.as_str().map(str::to_owned))
        .collect()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::chunker::ChunkKind;

    #[test]
    fn chunk_metadata_round_trip() {
        let chunk = Chunk {
            id: "manim.Circle".into(),
            kind: ChunkKind::Class,
            name: "Circle".into(),
            module_path: "manim".into(),
            content: "Class: Circle".into(),
            bases: vec!["Arc".into()],
            method_signatures: (0..25).map(|i| format!("m{i}()")).collect(),
            content_hash: "h".into(),
        };
        let meta = ChunkMetadata::from_chunk(&chunk, 20);
        assert_eq!(meta.methods.len(), 20);

        let payload = meta.to_payload();
        assert_eq!(payload["bases"], json!("[\"Arc\"]"));
        assert_eq!(payload["kind"], json!("class"));
        assert_eq!(ChunkMetadata::from_payload(&payload), meta);
    }

    #[test]
    fn example_metadata_round_trip() {
        let meta = ExampleMetadata {
            name: "Axes Plot".into(),
            tags: vec!["axes".into(), "plot".into()],
            difficulty: Difficulty::Easy,
            description: "d".into(),
            code: "c".into(),
            notes: "n".into(),
        };
        assert_eq!(ExampleMetadata::from_payload(&meta.to_payload()), meta);
    }

    #[test]
    fn tags_decode_defensively() {
        assert_eq!(decode_list(Some(&json!("[\"a\",\"b\"]"))), ["a", "b"]);
        assert_eq!(decode_list(Some(&json!(["a", 1, "b"]))), ["a", "b"]);
        assert!(decode_list(Some(&json!("not json"))).is_empty());
        assert!(decode_list(Some(&json!("{\"a\":1}"))).is_empty());
        assert!(decode_list(Some(&json!(42))).is_empty());
        assert!(decode_list(None).is_empty());
    }

    #[test]
    fn missing_fields_default() {
        let meta = ExampleMetadata::from_payload(&Metadata::new());
        assert_eq!(meta, ExampleMetadata::default());

        let payload = Metadata::from([("name".into(), json!(7)), ("kind".into(), json!(null))]);
        let chunk = ChunkMetadata::from_payload(&payload);
        assert_eq!(chunk.name, "7");
        assert!(chunk.kind.is_empty());
    }
}
