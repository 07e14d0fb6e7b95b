//! # Sentence embeddings
//!
//! The [`Embedder`] trait is the seam between the retrieval index and whatever
//! turns text into vectors. The production implementation,
//! [`SentenceEmbeddingsModel`], runs a BERT encoder locally with Candle (pure
//! Rust), mean-pools the token states under the attention mask and
//! L2-normalises the result. Weights, tokenizer and config come from the
//! Hugging Face hub and are cached under the configured directory, so only the
//! first run needs the network.
//!
//! ```no_run
//! use camara_rag::embedding::{Embedder, SentenceEmbeddingsModel};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//! let model = SentenceEmbeddingsModel::load(
//!     "sentence-transformers/paraphrase-multilingual-MiniLM-L12-v2",
//!     "data/embeddings_cache",
//! )?;
//! let vectors = model.embed(&["Quem gastou mais com passagens?".to_string()])?;
//! assert_eq!(vectors[0].len(), model.dimension());
//! # Ok(()) }
//! ```

use std::{error::Error, path::Path};

use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config, DTYPE};
use hf_hub::{Repo, RepoType, api::sync::ApiBuilder};
use tokenizers::{Tokenizer, TruncationParams};
use tracing::{debug, info};

pub type EmbedResult<T> = Result<T, Box<dyn Error + Send + Sync>>;

/// Turns a batch of texts into fixed-dimension vectors, one per input, in order.
pub trait Embedder {
    /// Length of every vector this embedder produces.
    fn dimension(&self) -> usize;

    fn embed(&self, texts: &[String]) -> EmbedResult<Vec<Vec<f32>>>;

    /// Embed a single text.
    fn embed_one(&self, text: &str) -> EmbedResult<Vec<f32>> {
        self.embed(&[text.to_string()])?
            .into_iter()
            .next()
            .ok_or_else(|| "embedder returned no vector".into())
    }
}

/// Sentence embeddings model using Candle (pure Rust).
pub struct SentenceEmbeddingsModel {
    model: BertModel,
    tokenizer: Tokenizer,
    device: Device,
    dimension: usize,
}

impl SentenceEmbeddingsModel {
    /// Load `model_id` from the Hugging Face hub, caching files in `cache_dir`.
    pub fn load(model_id: &str, cache_dir: impl AsRef<Path>) -> EmbedResult<Self> {
        let device = Device::Cpu;
        let cache_dir = cache_dir.as_ref();
        std::fs::create_dir_all(cache_dir)?;

        info!("Loading embedding model {model_id} (cache: {})", cache_dir.display());
        let repo = Repo::with_revision(model_id.to_string(), RepoType::Model, "main".to_string());
        let api = ApiBuilder::new()
            .with_cache_dir(cache_dir.to_path_buf())
            .with_progress(false)
            .build()?;
        let api_repo = api.repo(repo);

        let config_filename = api_repo.get("config.json")?;
        let tokenizer_filename = api_repo.get("tokenizer.json")?;
        let weights_filename = api_repo.get("model.safetensors")?;

        let config = std::fs::read_to_string(config_filename)?;
        let dimension = serde_json::from_str::<serde_json::Value>(&config)?
            .get("hidden_size")
            .and_then(serde_json::Value::as_u64)
            .ok_or("config.json has no hidden_size")? as usize;
        let config: Config = serde_json::from_str(&config)?;

        let mut tokenizer = Tokenizer::from_file(tokenizer_filename)
            .map_err(|e| format!("Failed to load tokenizer: {}", e))?;
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length: 512,
                ..Default::default()
            }))
            .map_err(|e| format!("Failed to configure truncation: {}", e))?;
        tokenizer.with_padding(None);

        let vb = unsafe { VarBuilder::from_mmaped_safetensors(&[weights_filename], DTYPE, &device)? };
        let model = BertModel::load(vb, &config)?;

        Ok(Self {
            model,
            tokenizer,
            device,
            dimension,
        })
    }

    /// Encode one text into a normalised embedding.
    pub fn encode(&self, text: &str) -> EmbedResult<Vec<f32>> {
        let tokens = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| format!("Tokenization error: {}", e))?;

        let token_ids = Tensor::new(tokens.get_ids(), &self.device)?.unsqueeze(0)?;
        let token_type_ids = Tensor::new(tokens.get_type_ids(), &self.device)?.unsqueeze(0)?;

        let output = self.model.forward(&token_ids, &token_type_ids, None)?;
        let embedding = self.mean_pooling(&output, tokens.get_attention_mask())?;
        let embedding = self.normalize(&embedding)?;

        Ok(embedding.to_vec1::<f32>()?)
    }

    /// Mean pooling over token embeddings, considering the attention mask.
    fn mean_pooling(&self, embeddings: &Tensor, attention_mask: &[u32]) -> EmbedResult<Tensor> {
        // embeddings: [1, seq_len, hidden]; mask broadcast as [1, seq_len, 1]
        let mask = Tensor::new(attention_mask, &self.device)?
            .to_dtype(DType::F32)?
            .unsqueeze(0)?
            .unsqueeze(2)?;

        let sum = embeddings.broadcast_mul(&mask)?.sum(1)?;
        let count = mask.sum(1)?.clamp(1f32, f32::INFINITY)?;
        Ok(sum.broadcast_div(&count)?.squeeze(0)?)
    }

    fn normalize(&self, tensor: &Tensor) -> EmbedResult<Tensor> {
        let norm = tensor.sqr()?.sum_all()?.sqrt()?;
        Ok(tensor.broadcast_div(&norm)?)
    }
}

impl Embedder for SentenceEmbeddingsModel {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn embed(&self, texts: &[String]) -> EmbedResult<Vec<Vec<f32>>> {
        debug!("Embedding {} texts", texts.len());
        texts.iter().map(|t| self.encode(t)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::KeywordEmbedder;

    #[test]
    fn test_embed_one_uses_the_batch_path() {
        let embedder = KeywordEmbedder::new(&["deputado", "despesa"]);
        let one = embedder.embed_one("despesa despesa").unwrap();
        let batch = embedder.embed(&["despesa despesa".to_string()]).unwrap();
        assert_eq!(one, batch[0]);
        assert_eq!(one.len(), embedder.dimension());
    }

    #[test]
    #[ignore = "downloads model weights from the Hugging Face hub"]
    fn test_sentence_embeddings_model() {
        let cache = tempfile::tempdir().unwrap();
        let model = SentenceEmbeddingsModel::load(
            "sentence-transformers/paraphrase-multilingual-MiniLM-L12-v2",
            cache.path(),
        )
        .unwrap();
        let v = model
            .embed(&["Despesas com combustível".to_string()])
            .unwrap();
        assert_eq!(v[0].len(), model.dimension());
        let norm: f32 = v[0].iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-3);
    }
}
