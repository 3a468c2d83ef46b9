//! Index pipeline: reads policy markdown, embeds every clause, writes the vector index.

use std::time::Instant;

use anyhow::Context;
use codexia_core::TextEmbedder;
use codexia_service::Settings;
use codexia_store::BuildStats;

pub struct IndexStats {
    pub build: BuildStats,
    /// Rows written to the Lance table, when exported.
    pub lance_rows: Option<usize>,
    pub elapsed_secs: f64,
}

/// Build the flat index, then optionally export the same passages to LanceDB.
pub async fn run_index_pipeline(
    settings: &Settings,
    embedder: &dyn TextEmbedder,
    rebuild: bool,
    lance: bool,
) -> anyhow::Result<IndexStats> {
    let start = Instant::now();

    eprintln!(
        "  Indexing {} with {} ({} dims)",
        settings.policies_path.display(),
        embedder.model(),
        embedder.dim()
    );
    let build = codexia_store::build_index(
        &settings.policies_path,
        &settings.vector_path,
        embedder,
        rebuild,
    )
    .await
    .context("building flat vector index")?;

    if build.skipped {
        eprintln!("  Index up to date ({} passages)", build.passages);
    } else {
        eprintln!("  Wrote {} passages to {}", build.passages, build.path.display());
    }

    let lance_rows = if lance {
        Some(export_lance(settings, embedder).await?)
    } else {
        None
    };

    Ok(IndexStats {
        build,
        lance_rows,
        elapsed_secs: start.elapsed().as_secs_f64(),
    })
}

#[cfg(feature = "lancedb")]
async fn export_lance(settings: &Settings, embedder: &dyn TextEmbedder) -> anyhow::Result<usize> {
    let passages = codexia_store::gather_passages(&settings.policies_path)
        .context("reading policy corpus")?;
    let vectors = codexia_store::embed_passages(&passages, embedder)
        .await
        .context("generating embeddings")?;

    eprintln!("  Writing to LanceDB...");
    let path = settings.lance_path();
    let index = codexia_store::LanceIndex::write(&path, &passages, &vectors, embedder.dim())
        .await
        .context("writing passage table to LanceDB")?;
    Ok(index.count().await?)
}

#[cfg(not(feature = "lancedb"))]
async fn export_lance(_settings: &Settings, _embedder: &dyn TextEmbedder) -> anyhow::Result<usize> {
    anyhow::bail!("LanceDB export needs a build with the lancedb feature")
}
