//! Curated example library: one directory per example holding `example.py`, an
//! optional `meta.json` and optional `notes.md`.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Difficulty {
    /// Parse case-insensitively; unknown values degrade to `Medium`.
    #[must_use]
    pub fn parse_lenient(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "easy" => Self::Easy,
            "hard" => Self::Hard,
            _ => Self::Medium,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Easy => "easy",
            Self::Medium => "medium",
            Self::Hard => "hard",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Example {
    pub id: String,
    pub name: String,
    pub tags: Vec<String>,
    pub difficulty: Difficulty,
    pub description: String,
    pub code: String,
    pub notes: String,
}

#[derive(Debug, Clone, Default)]
pub struct ExampleLibrary {
    examples: Vec<Example>,
}

impl ExampleLibrary {
    /// Load every example directory under `dir`, sorted by directory name.
    ///
    /// A missing `dir` yields an empty library. Directories without `example.py` or with
    /// blank code are skipped; a malformed `meta.json` falls back to defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if `dir` exists but cannot be listed.
    pub fn load(dir: &Path) -> Result<Self> {
        if !dir.is_dir() {
            tracing::warn!(dir = %dir.display(), "examples directory not found");
            return Ok(Self::default());
        }

        let mut entries: Vec<_> = std::fs::read_dir(dir)?
            .filter_map(std::result::Result::ok)
            .filter(|e| e.file_type().is_ok_and(|ft| ft.is_dir()))
            .collect();
        entries.sort_by_key(std::fs::DirEntry::file_name);

        let mut examples = Vec::with_capacity(entries.len());
        for entry in entries {
            let id = entry.file_name().to_string_lossy().into_owned();
            match load_example(&entry.path(), id) {
                Some(example) => examples.push(example),
                None => {
                    tracing::debug!(dir = %entry.path().display(), "skipping example without code");
                }
            }
        }

        tracing::debug!(count = examples.len(), "example library loaded");
        Ok(Self { examples })
    }

    #[must_use]
    pub fn from_examples(examples: Vec<Example>) -> Self {
        Self { examples }
    }

    #[must_use]
    pub fn list(&self) -> &[Example] {
        &self.examples
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Example> {
        self.examples.iter().find(|e| e.id == id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.examples.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.examples.is_empty()
    }
}

fn load_example(dir: &Path, id: String) -> Option<Example> {
    let code = std::fs::read_to_string(dir.join("example.py")).ok()?;
    if code.trim().is_empty() {
        return None;
    }
    let notes = std::fs::read_to_string(dir.join("notes.md")).unwrap_or_default();
    let meta = read_meta(&dir.join("meta.json"));

    Some(Example {
        name: meta
            .name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| id.clone()),
        id,
        tags: meta.tags,
        difficulty: meta.difficulty,
        description: meta.description,
        code,
        notes,
    })
}

#[derive(Debug, Default)]
struct Meta {
    name: Option<String>,
    tags: Vec<String>,
    difficulty: Difficulty,
    description: String,
}

fn read_meta(path: &Path) -> Meta {
    let Ok(raw) = std::fs::read_to_string(path) else {
        return Meta::default();
    };
    match serde_json::from_str::<serde_json::Value>(&raw) {
        Ok(value) => parse_meta(&value),
        Err(e) => {
            tracing::warn!(
                file = %path.display(),
                error = %e,
                "malformed meta.json, using defaults"
            );
            Meta::default()
        }
    }
}

fn parse_meta(value: &serde_json::Value) -> Meta {
    let str_field = |key: &str| value.get(key).and_then(|v| v.as_str()).map(str::to_owned);
    Meta {
        name: str_field("name"),
        tags: value
            .get("tags")
            .and_then(|v| v.as_array())
            .map(|tags| {
                tags.iter()
                    .filter_map(|t| t.as_str().map(str::to_owned))
                    .collect()
            })
            .unwrap_or_default(),
        difficulty: str_field("difficulty")
            .map(|d| Difficulty::parse_lenient(&d))
            .unwrap_or_default(),
        description: str_field("description").unwrap_or_default(),
    }
}
