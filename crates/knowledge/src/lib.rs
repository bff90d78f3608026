//! Tiny local knowledge base with keyword-overlap retrieval.
//!
//! Files live under `kb_root/<tag>/*.txt|*.md`. At load time each file is
//! chunked paragraph-wise and tokenized; at query time chunks are ranked by
//! token overlap with the query, optionally scoped to a tag set. No external
//! index, no embeddings — rosters and knowledge trees are small enough that a
//! full scan per query is cheap.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use showroom_core::{KnowledgeSnippet, KnowledgeSource};
use tracing::{debug, warn};

/// One indexed chunk of a knowledge file.
#[derive(Debug, Clone)]
struct KnowledgeChunk {
    tag: String,
    file_path: String,
    chunk_index: usize,
    text: String,
    tokens: HashSet<String>,
}

/// A load-once, read-many knowledge index over a directory tree.
pub struct KnowledgeBase {
    kb_root: PathBuf,
    chunk_chars: usize,
    chunks: Vec<KnowledgeChunk>,
}

impl KnowledgeBase {
    /// Index every `.txt`/`.md` file under `kb_root/<tag>/`. A missing root
    /// yields an empty (but functional) knowledge base.
    pub fn load(kb_root: impl Into<PathBuf>, chunk_chars: usize) -> Self {
        let kb_root = kb_root.into();
        let mut kb = Self { kb_root, chunk_chars, chunks: Vec::new() };
        kb.reload();
        kb
    }

    /// Re-index from disk, replacing the current chunk set.
    pub fn reload(&mut self) {
        self.chunks.clear();
        if !self.kb_root.exists() {
            debug!(root = %self.kb_root.display(), "Knowledge root missing, index empty");
            return;
        }

        for (tag, path) in knowledge_files(&self.kb_root) {
            let text = match std::fs::read_to_string(&path) {
                Ok(text) => text,
                Err(e) => {
                    warn!(file = %path.display(), error = %e, "Skipping unreadable knowledge file");
                    continue;
                }
            };
            let rel = path
                .strip_prefix(&self.kb_root)
                .unwrap_or(&path)
                .to_string_lossy()
                .to_string();

            for (i, chunk) in chunk_text(&text, self.chunk_chars).into_iter().enumerate() {
                let tokens: HashSet<String> = tokenize(&chunk).into_iter().collect();
                if tokens.is_empty() {
                    continue;
                }
                self.chunks.push(KnowledgeChunk {
                    tag: tag.clone(),
                    file_path: rel.clone(),
                    chunk_index: i,
                    text: chunk,
                    tokens,
                });
            }
        }
        debug!(root = %self.kb_root.display(), chunks = self.chunks.len(), "Knowledge base indexed");
    }

    /// Chunk size this index was built with.
    pub fn chunk_chars(&self) -> usize {
        self.chunk_chars
    }

    /// One-line summary for startup logging.
    pub fn summary(&self) -> String {
        let mut tags: Vec<&str> = self
            .chunks
            .iter()
            .map(|c| c.tag.as_str())
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        tags.sort_unstable();
        format!("{} chunks, {} tags: {:?}", self.chunks.len(), tags.len(), tags)
    }
}

impl KnowledgeSource for KnowledgeBase {
    fn search(&self, query: &str, tags: &[String], k: usize) -> Vec<KnowledgeSnippet> {
        let q_tokens: HashSet<String> = tokenize(query).into_iter().collect();
        if q_tokens.is_empty() {
            return Vec::new();
        }

        let tag_set: HashSet<&str> = tags
            .iter()
            .map(|t| t.trim())
            .filter(|t| !t.is_empty())
            .collect();

        let mut scored: Vec<(f64, &KnowledgeChunk)> = self
            .chunks
            .iter()
            .filter(|c| tag_set.is_empty() || tag_set.contains(c.tag.as_str()))
            .filter_map(|c| {
                let overlap = q_tokens.intersection(&c.tokens).count();
                if overlap == 0 {
                    return None;
                }
                // overlap, plus a small bonus for covering more of the query
                let score =
                    overlap as f64 + 0.25 * (overlap as f64 / q_tokens.len().max(1) as f64);
                Some((score, c))
            })
            .collect();

        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);

        scored
            .into_iter()
            .map(|(score, c)| KnowledgeSnippet {
                tag: c.tag.clone(),
                file: c.file_path.clone(),
                chunk_index: c.chunk_index,
                score: (score * 10_000.0).round() / 10_000.0,
                text: c.text.clone(),
            })
            .collect()
    }
}

/// Word tokens: alphanumeric runs (plus `_`), lowercased.
fn tokenize(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    for c in text.chars() {
        if c.is_alphanumeric() || c == '_' {
            current.extend(c.to_lowercase());
        } else if !current.is_empty() {
            tokens.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

/// Split text into paragraphs (blank-line separated), then re-pack them into
/// chunks of roughly `chunk_chars`. A single paragraph longer than
/// `chunk_chars` is sliced at fixed width.
fn chunk_text(text: &str, chunk_chars: usize) -> Vec<String> {
    let chunk_chars = chunk_chars.max(1);
    let paragraphs: Vec<&str> = text
        .split("\n\n")
        .flat_map(|p| p.split("\r\n\r\n"))
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect();

    let mut chunks: Vec<String> = Vec::new();
    let mut buf: Vec<&str> = Vec::new();
    let mut buf_len = 0usize;

    for p in &paragraphs {
        if p.len() > chunk_chars {
            if !buf.is_empty() {
                chunks.push(buf.join("\n\n"));
                buf.clear();
                buf_len = 0;
            }
            let chars: Vec<char> = p.chars().collect();
            chunks.extend(
                chars
                    .chunks(chunk_chars)
                    .map(|c| c.iter().collect::<String>()),
            );
        } else if buf_len + p.len() + 2 <= chunk_chars {
            buf.push(p);
            buf_len += p.len() + 2;
        } else {
            if !buf.is_empty() {
                chunks.push(buf.join("\n\n"));
            }
            buf = vec![p];
            buf_len = p.len();
        }
    }
    if !buf.is_empty() {
        chunks.push(buf.join("\n\n"));
    }

    chunks
}

/// All knowledge files, as `(tag, path)`, sorted for deterministic indexing.
fn knowledge_files(kb_root: &Path) -> Vec<(String, PathBuf)> {
    let mut out = Vec::new();
    let Ok(entries) = std::fs::read_dir(kb_root) else {
        return out;
    };
    let mut tag_dirs: Vec<PathBuf> = entries
        .flatten()
        .map(|e| e.path())
        .filter(|p| p.is_dir())
        .collect();
    tag_dirs.sort();

    for tag_dir in tag_dirs {
        let tag = tag_dir
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let mut files = Vec::new();
        collect_files(&tag_dir, &mut files);
        files.sort();
        for path in files {
            out.push((tag.clone(), path));
        }
    }
    out
}

fn collect_files(dir: &Path, out: &mut Vec<PathBuf>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_files(&path, out);
        } else if matches!(
            path.extension().and_then(|e| e.to_str()).map(str::to_lowercase).as_deref(),
            Some("txt") | Some("md")
        ) {
            out.push(path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_kb(files: &[(&str, &str, &str)]) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        for (tag, name, text) in files {
            let tag_dir = dir.path().join(tag);
            std::fs::create_dir_all(&tag_dir).unwrap();
            std::fs::write(tag_dir.join(name), text).unwrap();
        }
        dir
    }

    #[test]
    fn indexes_tagged_files() {
        let dir = write_kb(&[
            ("products", "widgets.txt", "Our widget line supports telemetry."),
            ("company", "history.md", "Founded in a garage."),
        ]);
        let kb = KnowledgeBase::load(dir.path(), 900);
        assert!(kb.summary().contains("2 chunks"));
        assert!(kb.summary().contains("2 tags"));
    }

    #[test]
    fn search_ranks_by_overlap() {
        let dir = write_kb(&[
            ("docs", "a.txt", "telemetry dashboards and alerts"),
            ("docs", "b.txt", "telemetry plus widget pricing plus support"),
        ]);
        let kb = KnowledgeBase::load(dir.path(), 900);
        let results = kb.search("widget telemetry pricing", &[], 5);
        assert_eq!(results.len(), 2);
        assert!(results[0].file.ends_with("b.txt"));
        assert!(results[0].score > results[1].score);
    }

    #[test]
    fn search_scopes_to_tags() {
        let dir = write_kb(&[
            ("products", "a.txt", "widget specifications"),
            ("company", "b.txt", "widget origins"),
        ]);
        let kb = KnowledgeBase::load(dir.path(), 900);
        let results = kb.search("widget", &["company".to_string()], 5);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].tag, "company");
    }

    #[test]
    fn empty_query_returns_nothing() {
        let dir = write_kb(&[("docs", "a.txt", "content")]);
        let kb = KnowledgeBase::load(dir.path(), 900);
        assert!(kb.search("   !!! ", &[], 5).is_empty());
    }

    #[test]
    fn unmatched_query_returns_nothing() {
        let dir = write_kb(&[("docs", "a.txt", "alpha beta")]);
        let kb = KnowledgeBase::load(dir.path(), 900);
        assert!(kb.search("gamma", &[], 5).is_empty());
    }

    #[test]
    fn missing_root_is_empty_not_fatal() {
        let kb = KnowledgeBase::load("/nonexistent/kb", 900);
        assert!(kb.search("anything", &[], 5).is_empty());
    }

    #[test]
    fn respects_k() {
        let dir = write_kb(&[
            ("docs", "a.txt", "widget alpha"),
            ("docs", "b.txt", "widget beta"),
            ("docs", "c.txt", "widget gamma"),
        ]);
        let kb = KnowledgeBase::load(dir.path(), 900);
        assert_eq!(kb.search("widget", &[], 2).len(), 2);
    }

    #[test]
    fn non_text_files_ignored() {
        let dir = write_kb(&[("docs", "a.txt", "indexed")]);
        std::fs::write(dir.path().join("docs").join("image.png"), b"\x89PNG").unwrap();
        let kb = KnowledgeBase::load(dir.path(), 900);
        assert!(kb.summary().contains("1 chunks"));
    }

    #[test]
    fn chunking_packs_paragraphs() {
        let text = "one one one\n\ntwo two two\n\nthree three three";
        let chunks = chunk_text(text, 26);
        assert_eq!(chunks.len(), 2);
        assert!(chunks[0].contains("one"));
        assert!(chunks[0].contains("two"));
        assert!(chunks[1].contains("three"));
    }

    #[test]
    fn oversized_paragraphs_are_sliced() {
        let text = "x".repeat(100);
        let chunks = chunk_text(&text, 40);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].len(), 40);
        assert_eq!(chunks[2].len(), 20);
    }

    #[test]
    fn oversized_paragraph_flushes_the_packed_buffer_first() {
        let text = format!("short one\n\n{}", "y".repeat(50));
        let chunks = chunk_text(&text, 30);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0], "short one");
        assert_eq!(chunks[1].len(), 30);
        assert_eq!(chunks[2].len(), 20);
    }

    #[test]
    fn chunk_indices_are_per_file() {
        let long = format!("{}\n\n{}", "alpha ".repeat(100), "beta ".repeat(100));
        let dir = write_kb(&[("docs", "long.txt", &long)]);
        let kb = KnowledgeBase::load(dir.path(), 620);
        let results = kb.search("beta", &[], 5);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].chunk_index, 1);
    }
}
