//! Policy corpus ingestion.
//!
//! Policy documents are markdown files carrying clause blocks:
//!
//! ```text
//! - clause_id: UHC-LCD-123 §3b
//! - effective: 2024-01-01 → 2025-12-31
//! Text: Modifier 59 is required when ...
//! continuation lines until a blank line or the next clause
//! ```
//!
//! The end date is optional. Anything outside a clause block is ignored.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use codexia_core::Passage;
use regex::Regex;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::StoreError;

static EFFECTIVE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^- effective:\s*(\d{4}-\d{2}-\d{2})\s*→\s*(\d{4}-\d{2}-\d{2})?")
        .expect("valid effective-date regex")
});

const CLAUSE_MARKER: &str = "- clause_id:";
const TEXT_MARKER: &str = "Text:";

/// Parse every clause block of one document.
pub fn extract_clauses(md: &str, source: &str) -> Vec<Passage> {
    let lines: Vec<&str> = md.lines().collect();
    let mut passages = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        let line = lines[i].trim();
        i += 1;
        let Some(clause_id) = line.strip_prefix(CLAUSE_MARKER).map(str::trim) else {
            continue;
        };
        let Some(effective) = lines.get(i).and_then(|l| EFFECTIVE_RE.captures(l.trim())) else {
            warn!(source, clause_id, "clause without effective-date line, skipped");
            i += 1;
            continue;
        };
        let from = effective[1].to_string();
        let to = effective.get(2).map(|m| m.as_str().to_string());
        i += 1;

        let mut text_lines: Vec<&str> = Vec::new();
        if let Some((_, first)) = lines
            .get(i)
            .filter(|l| l.trim().starts_with(TEXT_MARKER))
            .and_then(|l| l.split_once(TEXT_MARKER))
        {
            text_lines.push(first.trim());
            i += 1;
            while let Some(next) = lines.get(i).map(|l| l.trim())
                && !next.is_empty()
                && !next.starts_with(CLAUSE_MARKER)
            {
                text_lines.push(next);
                i += 1;
            }
        }
        let text = text_lines.join(" ");
        let text = text.trim();

        passages.push(Passage {
            text: format!("{clause_id} ({from}→{}) {text}", to.as_deref().unwrap_or(""))
                .trim()
                .to_string(),
            source: source.to_string(),
            clause_id: clause_id.to_string(),
            effective_from: from,
            effective_to: to,
        });
    }
    passages
}

/// `*.md` files directly under `dir`, sorted by file name.
pub fn policy_files(dir: &Path) -> Result<Vec<PathBuf>, StoreError> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == "md"))
        .collect();
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// All passages of the corpus, documents in file-name order.
pub fn gather_passages(dir: &Path) -> Result<Vec<Passage>, StoreError> {
    let mut passages = Vec::new();
    for path in policy_files(dir)? {
        let md = std::fs::read_to_string(&path)?;
        let found = extract_clauses(&md, &file_name(&path));
        debug!(source = %path.display(), clauses = found.len(), "parsed policy");
        passages.extend(found);
    }
    Ok(passages)
}

/// sha256 over every policy file name and its bytes, in file-name order.
///
/// Unchanged documents give an unchanged fingerprint regardless of mtimes.
pub fn corpus_fingerprint(dir: &Path) -> Result<String, StoreError> {
    let mut hasher = Sha256::new();
    for path in policy_files(dir)? {
        hasher.update(file_name(&path).as_bytes());
        hasher.update([0u8]);
        hasher.update(std::fs::read(&path)?);
        hasher.update([0u8]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const DOC: &str = "\
# UHC therapy policy

- clause_id: UHC-LCD-123 §3b
- effective: 2024-01-01 → 2025-12-31
Text: Modifier 59 is required when
  97012 and 97110 are billed on the same date.

- clause_id: UHC-LCD-123 §4
- effective: 2024-06-01 →
Text: Open-ended clause.
- clause_id: UHC-LCD-123 §5
- effective: sometime
Text: skipped.
";

    #[test]
    fn parses_blocks() {
        let passages = extract_clauses(DOC, "UHC.md");
        assert_eq!(passages.len(), 2);

        let first = &passages[0];
        assert_eq!(first.clause_id, "UHC-LCD-123 §3b");
        assert_eq!(first.effective_from, "2024-01-01");
        assert_eq!(first.effective_to.as_deref(), Some("2025-12-31"));
        assert_eq!(
            first.text,
            "UHC-LCD-123 §3b (2024-01-01→2025-12-31) Modifier 59 is required when 97012 and 97110 are billed on the same date."
        );
        assert_eq!(first.source, "UHC.md");

        let second = &passages[1];
        assert_eq!(second.effective_to, None);
        assert_eq!(second.text, "UHC-LCD-123 §4 (2024-06-01→) Open-ended clause.");
    }

    #[test]
    fn clause_without_text_keeps_header() {
        let passages = extract_clauses("- clause_id: X §1\n- effective: 2024-01-01 →\n", "x.md");
        assert_eq!(passages.len(), 1);
        assert_eq!(passages[0].text, "X §1 (2024-01-01→)");
    }

    #[test]
    fn files_sorted_and_non_markdown_ignored() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("b.md"), "- clause_id: B §1\n- effective: 2024-01-01 →\nText: b\n").unwrap();
        std::fs::write(tmp.path().join("a.md"), "- clause_id: A §1\n- effective: 2024-01-01 →\nText: a\n").unwrap();
        std::fs::write(tmp.path().join("notes.txt"), "- clause_id: N §1\n").unwrap();

        let passages = gather_passages(tmp.path()).unwrap();
        let ids: Vec<_> = passages.iter().map(|p| p.clause_id.as_str()).collect();
        assert_eq!(ids, vec!["A §1", "B §1"]);
        assert_eq!(passages[0].source, "a.md");
    }

    #[test]
    fn fingerprint_tracks_content_only() {
        let tmp = TempDir::new().unwrap();
        let doc = tmp.path().join("a.md");
        std::fs::write(&doc, "one").unwrap();
        let before = corpus_fingerprint(tmp.path()).unwrap();
        std::fs::write(&doc, "one").unwrap();
        assert_eq!(before, corpus_fingerprint(tmp.path()).unwrap());
        std::fs::write(&doc, "two").unwrap();
        assert_ne!(before, corpus_fingerprint(tmp.path()).unwrap());
    }

    #[test]
    fn missing_dir_is_io_error() {
        assert!(matches!(
            gather_passages(Path::new("/nonexistent/policies")),
            Err(StoreError::Io(_))
        ));
    }
}
