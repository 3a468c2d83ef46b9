//! ONNX Runtime sentence embedder (all-MiniLM-L6-v2, mean pooled).
//!
//! The model directory must contain `model.onnx` and `tokenizer.json`.

use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use codexia_core::{IndexError, TextEmbedder};
use ort::session::Session;
use ort::value::Tensor;
use tokenizers::Tokenizer;
use tracing::info;

use crate::hash::normalize;

pub const MODEL_NAME: &str = "all-MiniLM-L6-v2";
const MAX_TOKENS: usize = 256;
const FALLBACK_DIM: usize = 384;

struct Model {
    session: Session,
    tokenizer: Tokenizer,
}

/// Sentence-transformers embedder. One inference runs at a time, on the
/// blocking pool.
pub struct OnnxEmbedder {
    model: Arc<Mutex<Model>>,
    dim: usize,
}

fn embedding_err(e: impl std::fmt::Display) -> IndexError {
    IndexError::Embedding(e.to_string())
}

impl OnnxEmbedder {
    pub fn load(model_dir: &Path) -> anyhow::Result<Self> {
        let model_path = model_dir.join("model.onnx");
        let tokenizer_path = model_dir.join("tokenizer.json");
        anyhow::ensure!(model_path.exists(), "model.onnx not found in {model_dir:?}");
        anyhow::ensure!(
            tokenizer_path.exists(),
            "tokenizer.json not found in {model_dir:?}"
        );

        let session = Session::builder()?.commit_from_file(&model_path)?;
        let dim = infer_dim(session.outputs()[0].dtype()).unwrap_or(FALLBACK_DIM);

        let mut tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow::anyhow!("load tokenizer: {e}"))?;
        tokenizer
            .with_truncation(Some(tokenizers::TruncationParams {
                max_length: MAX_TOKENS,
                ..Default::default()
            }))
            .map_err(|e| anyhow::anyhow!("set truncation: {e}"))?;
        tokenizer.with_padding(Some(tokenizers::PaddingParams::default()));

        info!(dim, model = %model_path.display(), "loaded onnx embedding model");
        Ok(Self {
            model: Arc::new(Mutex::new(Model { session, tokenizer })),
            dim,
        })
    }

    /// One unit-length vector per input text.
    pub async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, IndexError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let model = Arc::clone(&self.model);
        let texts: Vec<String> = texts.iter().map(|t| (*t).to_owned()).collect();
        let dim = self.dim;
        tokio::task::spawn_blocking(move || {
            let mut model = model.lock().unwrap_or_else(PoisonError::into_inner);
            model.run(&texts, dim)
        })
        .await
        .map_err(embedding_err)?
    }
}

impl Model {
    fn run(&mut self, texts: &[String], dim: usize) -> Result<Vec<Vec<f32>>, IndexError> {
        let batch = texts.len();
        let encodings = self
            .tokenizer
            .encode_batch(texts.iter().map(String::as_str).collect::<Vec<_>>(), true)
            .map_err(embedding_err)?;
        let seq_len = encodings.iter().map(|e| e.get_ids().len()).max().unwrap_or(0);

        let mut ids = vec![0i64; batch * seq_len];
        let mut mask = vec![0i64; batch * seq_len];
        let mut type_ids = vec![0i64; batch * seq_len];
        for (i, enc) in encodings.iter().enumerate() {
            let row = i * seq_len;
            for (j, ((&id, &m), &t)) in enc
                .get_ids()
                .iter()
                .zip(enc.get_attention_mask())
                .zip(enc.get_type_ids())
                .enumerate()
            {
                ids[row + j] = i64::from(id);
                mask[row + j] = i64::from(m);
                type_ids[row + j] = i64::from(t);
            }
        }

        let shape = [batch as i64, seq_len as i64];
        let inputs = ort::inputs![
            "input_ids" => Tensor::from_array((shape, ids.into_boxed_slice())).map_err(embedding_err)?,
            "attention_mask" => Tensor::from_array((shape, mask.clone().into_boxed_slice())).map_err(embedding_err)?,
            "token_type_ids" => Tensor::from_array((shape, type_ids.into_boxed_slice())).map_err(embedding_err)?,
        ];
        let outputs = self.session.run(inputs).map_err(embedding_err)?;

        let (out_shape, data) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(embedding_err)?;
        let dims: &[i64] = out_shape;
        if dims.len() != 3 || dims[0] as usize != batch {
            return Err(IndexError::Embedding(format!(
                "unexpected output shape {dims:?} for batch of {batch}"
            )));
        }
        if dims[2] as usize != dim {
            return Err(IndexError::Dimension {
                expected: dim,
                actual: dims[2] as usize,
            });
        }
        let out_seq = dims[1] as usize;

        Ok((0..batch)
            .map(|i| {
                let token_mask = &mask[i * seq_len..(i + 1) * seq_len];
                let tokens = &data[i * out_seq * dim..(i + 1) * out_seq * dim];
                mean_pool(tokens, token_mask, dim)
            })
            .collect())
    }
}

/// Attention-masked mean over token vectors, then L2 normalisation.
fn mean_pool(tokens: &[f32], mask: &[i64], dim: usize) -> Vec<f32> {
    let mut pooled = vec![0.0f32; dim];
    let mut count = 0.0f32;
    for (token, &m) in tokens.chunks_exact(dim).zip(mask) {
        if m > 0 {
            for (p, x) in pooled.iter_mut().zip(token) {
                *p += x;
            }
            count += 1.0;
        }
    }
    if count > 0.0 {
        pooled.iter_mut().for_each(|p| *p /= count);
    }
    normalize(&mut pooled);
    pooled
}

/// Last dimension of the first output, when the model declares it.
fn infer_dim(output_type: &ort::value::ValueType) -> Option<usize> {
    match output_type {
        ort::value::ValueType::Tensor { shape, .. } => {
            shape.last().and_then(|&d| (d > 0).then_some(d as usize))
        }
        _ => None,
    }
}

#[async_trait]
impl TextEmbedder for OnnxEmbedder {
    fn model(&self) -> &str {
        MODEL_NAME
    }

    fn dim(&self) -> usize {
        self.dim
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, IndexError> {
        self.embed_batch(&[text])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| IndexError::Embedding("model returned no vector".into()))
    }
}
