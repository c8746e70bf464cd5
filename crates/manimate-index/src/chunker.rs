//! Module and class documentation chunks extracted from a Python library tree via
//! tree-sitter.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tree_sitter::{Node, Parser};

use crate::error::{IndexError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkKind {
    Module,
    Class,
}

impl ChunkKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Module => "module",
            Self::Class => "class",
        }
    }
}

/// One documentation unit of the library API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Module path, qualified by the enclosing class chain for classes. Repeated
    /// definitions get a `~N` suffix.
    pub id: String,
    pub kind: ChunkKind,
    pub name: String,
    pub module_path: String,
    pub content: String,
    pub bases: Vec<String>,
    pub method_signatures: Vec<String>,
    pub content_hash: String,
}

/// Chunker configuration.
#[derive(Debug, Clone)]
pub struct ChunkerConfig {
    /// Dotted prefix for module paths (default: `manim`).
    pub package_name: String,
    /// Docstrings longer than this keep this many lines plus an ellipsis (default: 30).
    pub max_docstring_lines: usize,
    /// Method signatures kept per class (default: 20).
    pub max_methods: usize,
    /// Module docstrings must be longer than this many characters (default: 20).
    pub min_module_doc_chars: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            package_name: "manim".into(),
            max_docstring_lines: 30,
            max_methods: 20,
            min_module_doc_chars: 20,
        }
    }
}

struct ChunkCtx<'a> {
    source: &'a str,
    module_path: &'a str,
    config: &'a ChunkerConfig,
}

/// Walk `source_root` and chunk every eligible `.py` file, in sorted path order.
///
/// Files that cannot be read, are not UTF-8, or do not parse cleanly are skipped.
///
/// # Errors
///
/// Returns an error if `source_root` is not a directory or the Python grammar cannot be
/// loaded.
pub fn extract_chunks(source_root: &Path, config: &ChunkerConfig) -> Result<Vec<Chunk>> {
    if !source_root.is_dir() {
        return Err(IndexError::Other(format!(
            "library source root {} is not a directory",
            source_root.display()
        )));
    }

    let mut parser = python_parser()?;
    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut chunks = Vec::new();
    let mut files = 0usize;
    let mut skipped = 0usize;

    let walker = ignore::WalkBuilder::new(source_root)
        .standard_filters(false)
        .hidden(true)
        .sort_by_file_name(|a, b| a.cmp(b))
        .filter_entry(|entry| {
            entry.depth() == 0
                || !entry.file_type().is_some_and(|ft| ft.is_dir())
                || !is_skipped_dir(&entry.file_name().to_string_lossy())
        })
        .build();

    for entry in walker.flatten() {
        let path = entry.path();
        if !entry.file_type().is_some_and(|ft| ft.is_file()) || !is_python_source(path) {
            continue;
        }
        files += 1;

        let Some(module_path) = module_path_for(source_root, path, &config.package_name) else {
            skipped += 1;
            continue;
        };
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        let source = match std::fs::read(path).map(String::from_utf8) {
            Ok(Ok(source)) => source,
            Ok(Err(_)) => {
                tracing::debug!(file = %path.display(), "skipping non-UTF-8 file");
                skipped += 1;
                continue;
            }
            Err(e) => {
                tracing::debug!(file = %path.display(), error = %e, "skipping unreadable file");
                skipped += 1;
                continue;
            }
        };

        match chunk_with_parser(&mut parser, &source, &module_path, &stem, config, &mut seen) {
            Ok(file_chunks) => chunks.extend(file_chunks),
            Err(e) => {
                tracing::debug!(file = %path.display(), error = %e, "skipping file");
                skipped += 1;
            }
        }
    }

    tracing::info!(files, skipped, chunks = chunks.len(), "library source chunked");
    Ok(chunks)
}

/// Chunk a single Python source text.
///
/// # Errors
///
/// Returns [`IndexError::Parse`] if the source contains syntax errors.
pub fn chunk_source(
    source: &str,
    module_path: &str,
    file_stem: &str,
    config: &ChunkerConfig,
) -> Result<Vec<Chunk>> {
    let mut parser = python_parser()?;
    chunk_with_parser(
        &mut parser,
        source,
        module_path,
        file_stem,
        config,
        &mut HashMap::new(),
    )
}

fn python_parser() -> Result<Parser> {
    let mut parser = Parser::new();
    parser
        .set_language(&tree_sitter_python::LANGUAGE.into())
        .map_err(|e| IndexError::Parse(format!("set_language failed: {e}")))?;
    Ok(parser)
}

fn chunk_with_parser(
    parser: &mut Parser,
    source: &str,
    module_path: &str,
    file_stem: &str,
    config: &ChunkerConfig,
    seen: &mut HashMap<String, usize>,
) -> Result<Vec<Chunk>> {
    let tree = parser
        .parse(source, None)
        .ok_or_else(|| IndexError::Parse(format!("parse failed for {module_path}")))?;
    let root = tree.root_node();
    if root.has_error() {
        return Err(IndexError::Parse(format!("syntax errors in {module_path}")));
    }

    let ctx = ChunkCtx {
        source,
        module_path,
        config,
    };
    let mut chunks = Vec::new();

    if let Some(doc) = docstring(&ctx, root)
        && doc.trim().chars().count() > config.min_module_doc_chars
    {
        let doc = truncate_lines(doc.trim(), config.max_docstring_lines);
        let content = format!("Module: {module_path}\n\n{doc}");
        chunks.push(Chunk {
            id: unique_id(module_path.to_owned(), seen),
            kind: ChunkKind::Module,
            name: file_stem.to_owned(),
            module_path: module_path.to_owned(),
            content_hash: blake3_hex(&content),
            content,
            bases: Vec::new(),
            method_signatures: Vec::new(),
        });
    }

    let mut scope = Vec::new();
    collect_classes(&ctx, root, &mut scope, seen, &mut chunks);
    Ok(chunks)
}

/// Node kinds that may contain class definitions somewhere below them.
const CONTAINER_KINDS: &[&str] = &[
    "block",
    "decorated_definition",
    "function_definition",
    "if_statement",
    "elif_clause",
    "else_clause",
    "for_statement",
    "while_statement",
    "try_statement",
    "except_clause",
    "except_group_clause",
    "finally_clause",
    "with_statement",
    "match_statement",
    "case_clause",
];

fn collect_classes(
    ctx: &ChunkCtx<'_>,
    node: Node<'_>,
    scope: &mut Vec<String>,
    seen: &mut HashMap<String, usize>,
    out: &mut Vec<Chunk>,
) {
    for child in named_children(node) {
        if child.kind() == "class_definition" {
            let Some(name) = child
                .child_by_field_name("name")
                .map(|n| text(ctx, n).to_owned())
            else {
                continue;
            };
            out.push(class_chunk(ctx, child, &name, scope, seen));
            if let Some(body) = child.child_by_field_name("body") {
                scope.push(name);
                collect_classes(ctx, body, scope, seen, out);
                scope.pop();
            }
        } else if CONTAINER_KINDS.contains(&child.kind()) {
            collect_classes(ctx, child, scope, seen, out);
        }
    }
}

fn class_chunk(
    ctx: &ChunkCtx<'_>,
    node: Node<'_>,
    name: &str,
    scope: &[String],
    seen: &mut HashMap<String, usize>,
) -> Chunk {
    let bases = node
        .child_by_field_name("superclasses")
        .map(|args| {
            named_children(args)
                .filter(|n| !matches!(n.kind(), "keyword_argument" | "comment"))
                .map(|n| collapse_whitespace(text(ctx, n)))
                .collect::<Vec<_>>()
        })
        .unwrap_or_default();

    let body = node.child_by_field_name("body");
    let doc = body
        .and_then(|b| docstring(ctx, b))
        .map(|d| truncate_lines(d.trim(), ctx.config.max_docstring_lines))
        .unwrap_or_default();
    let methods: Vec<String> = body
        .map(|b| method_signatures(ctx, b))
        .unwrap_or_default();

    let mut parts = vec![format!("Class: {name}"), format!("Module: {}", ctx.module_path)];
    if !bases.is_empty() {
        parts.push(format!("Bases: {}", bases.join(", ")));
    }
    if !doc.is_empty() {
        parts.push(format!("\nDocstring:\n{doc}"));
    }
    if !methods.is_empty() {
        let lines: Vec<String> = methods.iter().map(|m| format!("  - {m}")).collect();
        parts.push(format!("\nMethods:\n{}", lines.join("\n")));
    }
    let content = parts.join("\n");

    let mut qualified = String::from(ctx.module_path);
    for outer in scope {
        qualified.push('.');
        qualified.push_str(outer);
    }
    qualified.push('.');
    qualified.push_str(name);

    Chunk {
        id: unique_id(qualified, seen),
        kind: ChunkKind::Class,
        name: name.to_owned(),
        module_path: ctx.module_path.to_owned(),
        content_hash: blake3_hex(&content),
        content,
        bases,
        method_signatures: methods,
    }
}

fn method_signatures(ctx: &ChunkCtx<'_>, body: Node<'_>) -> Vec<String> {
    named_children(body)
        .filter_map(|item| match item.kind() {
            "function_definition" => Some(item),
            "decorated_definition" => item
                .child_by_field_name("definition")
                .filter(|d| d.kind() == "function_definition"),
            _ => None,
        })
        .filter_map(|func| format_signature(ctx, func))
        .take(ctx.config.max_methods)
        .collect()
}

fn format_signature(ctx: &ChunkCtx<'_>, func: Node<'_>) -> Option<String> {
    let name = text(ctx, func.child_by_field_name("name")?);
    if name.starts_with('_') && !name.starts_with("__") {
        return None;
    }

    let mut args: Vec<String> = Vec::new();
    let mut keyword_only = false;
    let mut first = true;

    if let Some(params) = func.child_by_field_name("parameters") {
        for param in named_children(params) {
            let (arg_name, annotation) = match param.kind() {
                "identifier" => (text(ctx, param), None),
                "default_parameter" => (text(ctx, param.child_by_field_name("name")?), None),
                "typed_default_parameter" => (
                    text(ctx, param.child_by_field_name("name")?),
                    param.child_by_field_name("type"),
                ),
                "typed_parameter" => {
                    let inner = param.named_child(0)?;
                    match inner.kind() {
                        "list_splat_pattern" => {
                            args.push(collapse_whitespace(text(ctx, inner)));
                            keyword_only = true;
                            first = false;
                            continue;
                        }
                        "dictionary_splat_pattern" => {
                            args.push(collapse_whitespace(text(ctx, inner)));
                            first = false;
                            continue;
                        }
                        _ => (text(ctx, inner), param.child_by_field_name("type")),
                    }
                }
                "list_splat_pattern" => {
                    args.push(collapse_whitespace(text(ctx, param)));
                    keyword_only = true;
                    first = false;
                    continue;
                }
                "dictionary_splat_pattern" => {
                    args.push(collapse_whitespace(text(ctx, param)));
                    first = false;
                    continue;
                }
                "keyword_separator" => {
                    keyword_only = true;
                    first = false;
                    continue;
                }
                _ => continue,
            };

            let implicit = first && matches!(arg_name, "self" | "cls");
            first = false;
            if implicit || keyword_only {
                continue;
            }
            match annotation {
                Some(ann) => args.push(format!(
                    "{arg_name}: {}",
                    collapse_whitespace(text(ctx, ann))
                )),
                None => args.push(arg_name.to_owned()),
            }
        }
    }

    let ret = func
        .child_by_field_name("return_type")
        .map(|r| format!(" -> {}", collapse_whitespace(text(ctx, r))))
        .unwrap_or_default();

    Some(format!("{name}({}){ret}", args.join(", ")))
}

/// Cleaned docstring of a module or block: the first statement, if it is a plain
/// string literal.
fn docstring(ctx: &ChunkCtx<'_>, node: Node<'_>) -> Option<String> {
    let first = named_children(node).find(|n| n.kind() != "comment")?;
    if first.kind() != "expression_statement" {
        return None;
    }
    let literal = first.named_child(0)?;
    if literal.kind() != "string" {
        return None;
    }
    strip_string_literal(text(ctx, literal)).map(clean_docstring)
}

fn strip_string_literal(raw: &str) -> Option<&str> {
    let prefix_len = raw
        .find(|c: char| c == '"' || c == '\'')
        .unwrap_or(raw.len());
    let prefix = &raw[..prefix_len];
    if prefix.chars().any(|c| matches!(c, 'b' | 'B' | 'f' | 'F')) {
        return None;
    }
    let body = &raw[prefix_len..];
    ["\"\"\"", "'''", "\"", "'"].into_iter().find_map(|q| {
        (body.len() >= 2 * q.len() && body.starts_with(q) && body.ends_with(q))
            .then(|| &body[q.len()..body.len() - q.len()])
    })
}

/// First line left-trimmed, common indentation of the remaining lines removed, leading
/// and trailing blank lines dropped.
fn clean_docstring(raw: &str) -> String {
    let lines: Vec<&str> = raw.lines().collect();
    let margin = lines
        .iter()
        .skip(1)
        .filter(|l| !l.trim().is_empty())
        .map(|l| l.chars().take_while(|c| c.is_whitespace()).count())
        .min()
        .unwrap_or(0);

    let cleaned: Vec<&str> = lines
        .iter()
        .enumerate()
        .map(|(i, line)| {
            if i == 0 {
                line.trim_start()
            } else {
                line.char_indices().nth(margin).map_or("", |(at, _)| &line[at..])
            }
        })
        .collect();

    let start = cleaned
        .iter()
        .position(|l| !l.trim().is_empty())
        .unwrap_or(cleaned.len());
    let end = cleaned
        .iter()
        .rposition(|l| !l.trim().is_empty())
        .map_or(start, |i| i + 1);
    cleaned[start..end].join("\n")
}

fn truncate_lines(text: &str, max_lines: usize) -> String {
    let lines: Vec<&str> = text.lines().collect();
    if lines.len() <= max_lines {
        return text.to_owned();
    }
    let mut kept = lines[..max_lines].to_vec();
    kept.push("...");
    kept.join("\n")
}

fn unique_id(base: String, seen: &mut HashMap<String, usize>) -> String {
    let n = seen.entry(base.clone()).or_insert(0);
    *n += 1;
    if *n == 1 {
        base
    } else {
        format!("{base}~{n}")
    }
}

fn named_children<'t>(node: Node<'t>) -> impl Iterator<Item = Node<'t>> {
    let count = u32::try_from(node.named_child_count()).unwrap_or(u32::MAX);
    (0..count).filter_map(move |i| node.named_child(i))
}

fn text<'s>(ctx: &ChunkCtx<'s>, node: Node<'_>) -> &'s str {
    &ctx.source[node.byte_range()]
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn is_skipped_dir(name: &str) -> bool {
    matches!(name, "__pycache__" | "build" | "dist") || name.ends_with(".egg-info")
}

fn is_python_source(path: &Path) -> bool {
    if path.extension().and_then(|e| e.to_str()) != Some("py") {
        return false;
    }
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy())
        .unwrap_or_default();
    !(stem.contains("_test") || stem.starts_with("test_"))
}

/// `<package>.<relative.dotted.path>`; a package's `__init__.py` maps to the package
/// itself.
fn module_path_for(root: &Path, path: &Path, package: &str) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?.with_extension("");
    let mut parts: Vec<String> = Vec::new();
    if !package.is_empty() {
        parts.push(package.to_owned());
    }
    for component in rel.components() {
        parts.push(component.as_os_str().to_str()?.to_owned());
    }
    if parts.len() > 1 && parts.last().is_some_and(|p| p == "__init__") {
        parts.pop();
    }
    Some(parts.join("."))
}

pub(crate) fn blake3_hex(input: &str) -> String {
    blake3::hash(input.as_bytes()).to_hex().to_string()
}
