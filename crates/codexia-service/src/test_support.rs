//! Fixtures shared by the service tests: the bundled corpus and sample claims.

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use codexia_core::{Claim, PassageIndex, TextEmbedder};
use codexia_store::{FlatIndex, build_index, embed_passages, gather_passages};

use crate::Settings;

fn data_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../../data")
}

pub(crate) fn policies_dir() -> PathBuf {
    data_dir().join("policies")
}

pub(crate) fn claims_dir() -> PathBuf {
    data_dir().join("claims")
}

pub(crate) fn sample_claim(file: &str) -> Claim {
    let text = std::fs::read_to_string(claims_dir().join(file)).unwrap();
    serde_json::from_str(&text).unwrap()
}

pub(crate) fn mod59_claim() -> Claim {
    sample_claim("mod59_traction_exercise.json")
}

/// In-memory flat index over the bundled corpus.
pub(crate) async fn corpus_index(embedder: &dyn TextEmbedder) -> Arc<dyn PassageIndex> {
    let passages = gather_passages(&policies_dir()).unwrap();
    let vectors = embed_passages(&passages, embedder).await.unwrap();
    let index =
        FlatIndex::new(embedder.model(), embedder.dim(), "fixture", passages, vectors).unwrap();
    Arc::new(index)
}

/// Default settings rooted in `dir`, with the hash-embedded corpus index already built.
pub(crate) async fn built_settings(dir: &Path) -> Settings {
    let settings = Settings {
        vector_path: dir.join("vector"),
        audit_path: dir.join("audit"),
        policies_path: policies_dir(),
        ..Settings::default()
    };
    let embedder = codexia_ai::HashEmbedder::default();
    build_index(&settings.policies_path, &settings.vector_path, &embedder, false)
        .await
        .unwrap();
    settings
}

/// In-memory log sink; clones share one buffer.
#[derive(Clone, Default)]
pub(crate) struct Captured(Arc<Mutex<Vec<u8>>>);

impl Write for Captured {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Captured {
    pub(crate) fn text(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
    }
}
