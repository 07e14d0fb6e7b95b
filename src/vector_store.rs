//! # VectorStore
//!
//! Session-local retrieval index for the assistant.
//!
//! [`FlatL2Index`] is an exact (brute-force) Euclidean nearest-neighbour index
//! over a row-major `N × D` matrix. [`VectorStore`] pairs it with the corpus:
//! it embeds every normalised text once, in corpus order, so row `i` of the
//! matrix is the embedding of corpus entry `i`, and answers text queries with
//! the same [`Embedder`].
//!
//! Nothing here is persisted; the store is rebuilt every session.
//!
//! ## Quick Example
//! ```no_run
//! use camara_rag::embedding::SentenceEmbeddingsModel;
//! use camara_rag::vector_store::VectorStore;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//! let model = SentenceEmbeddingsModel::load(
//!     "sentence-transformers/paraphrase-multilingual-MiniLM-L12-v2",
//!     "data/embeddings_cache",
//! )?;
//! let texts = vec!["Ana PL SP".to_string(), "Bruno PT BA".to_string()];
//! let store = VectorStore::build(&model, &texts)?;
//! let hits = store.search(&model, "deputada de São Paulo", 1)?;
//! println!("best match: {}", texts[hits[0].index]);
//! # Ok(()) }
//! ```

use std::cmp::Ordering;

use rayon::prelude::*;
use tracing::{debug, info};

use crate::{
    embedding::Embedder,
    error::{AssistantError, IndexError},
};

/// A search hit: corpus position and Euclidean distance to the query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub index: usize,
    pub distance: f32,
}

/// Exact L2 index over a dense matrix.
#[derive(Debug, Clone)]
pub struct FlatL2Index {
    dimension: usize,
    data: Vec<f32>,
}

impl FlatL2Index {
    /// Build from one vector per row. Every vector must have the same length.
    pub fn new(rows: Vec<Vec<f32>>) -> Result<Self, IndexError> {
        let dimension = rows.first().ok_or(IndexError::EmptyCorpus)?.len();
        let mut data = Vec::with_capacity(rows.len() * dimension);
        for (row, vector) in rows.into_iter().enumerate() {
            if vector.len() != dimension || dimension == 0 {
                return Err(IndexError::DimensionMismatch {
                    row,
                    expected: dimension,
                    found: vector.len(),
                });
            }
            data.extend(vector);
        }
        Ok(Self { dimension, data })
    }

    pub fn len(&self) -> usize {
        self.data.len() / self.dimension
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// The stored vector at `index`.
    pub fn row(&self, index: usize) -> Option<&[f32]> {
        let start = index.checked_mul(self.dimension)?;
        self.data.get(start..start + self.dimension)
    }

    /// The `k` rows closest to `query`, nearest first.
    ///
    /// Equal distances are ordered by row index. Fails instead of returning a
    /// short list when `k` exceeds the number of rows.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>, IndexError> {
        if query.len() != self.dimension {
            return Err(IndexError::DimensionMismatch {
                row: 0,
                expected: self.dimension,
                found: query.len(),
            });
        }
        if k == 0 {
            return Err(IndexError::InvalidK);
        }
        let available = self.len();
        if k > available {
            return Err(IndexError::InsufficientEntries { k, available });
        }

        let mut scored: Vec<(usize, f32)> = self
            .data
            .par_chunks(self.dimension)
            .enumerate()
            .map(|(i, row)| (i, squared_euclidean(query, row)))
            .collect();

        scored.sort_by(|a, b| match a.1.total_cmp(&b.1) {
            Ordering::Equal => a.0.cmp(&b.0),
            other => other,
        });
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .map(|(index, d2)| Neighbor {
                index,
                distance: d2.sqrt(),
            })
            .collect())
    }
}

fn squared_euclidean(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| (x - y).powi(2)).sum()
}

/// Embeddings of the whole corpus plus the index over them.
#[derive(Debug, Clone)]
pub struct VectorStore {
    index: FlatL2Index,
}

impl VectorStore {
    /// Embed `texts` in order and index the result.
    ///
    /// # Errors
    /// - [`IndexError::EmptyCorpus`] when `texts` is empty (the embedder is not called).
    /// - [`AssistantError::Embedding`] when the model fails or returns the
    ///   wrong number of vectors.
    /// - [`IndexError::DimensionMismatch`] when a vector has the wrong length.
    pub fn build<E: Embedder + ?Sized>(
        embedder: &E,
        texts: &[String],
    ) -> Result<Self, AssistantError> {
        if texts.is_empty() {
            return Err(IndexError::EmptyCorpus.into());
        }
        info!("Embedding {} corpus entries", texts.len());
        let vectors = embedder
            .embed(texts)
            .map_err(|e| AssistantError::Embedding(e.to_string()))?;
        if vectors.len() != texts.len() {
            return Err(AssistantError::Embedding(format!(
                "expected {} vectors, got {}",
                texts.len(),
                vectors.len()
            )));
        }
        if let Some((row, v)) = vectors
            .iter()
            .enumerate()
            .find(|(_, v)| v.len() != embedder.dimension())
        {
            return Err(IndexError::DimensionMismatch {
                row,
                expected: embedder.dimension(),
                found: v.len(),
            }
            .into());
        }

        let index = FlatL2Index::new(vectors)?;
        debug!("Index built: {} x {}", index.len(), index.dimension());
        Ok(Self { index })
    }

    /// Embed `query` and return its `k` nearest corpus positions.
    pub fn search<E: Embedder + ?Sized>(
        &self,
        embedder: &E,
        query: &str,
        k: usize,
    ) -> Result<Vec<Neighbor>, AssistantError> {
        let vector = embedder
            .embed_one(query)
            .map_err(|e| AssistantError::Embedding(e.to_string()))?;
        Ok(self.index.search(&vector, k)?)
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn dimension(&self) -> usize {
        self.index.dimension()
    }

    pub fn row(&self, index: usize) -> Option<&[f32]> {
        self.index.row(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FailingEmbedder, KeywordEmbedder};
    use std::collections::HashSet;

    fn grid(n: usize) -> Vec<Vec<f32>> {
        (0..n).map(|i| vec![(i % 7) as f32, (i / 7) as f32, 1.0]).collect()
    }

    #[test]
    fn test_search_returns_k_distinct_sorted_indices() {
        let n = 50;
        let index = FlatL2Index::new(grid(n)).unwrap();

        let hits = index.search(&[3.2, 2.9, 1.0], 20).unwrap();

        assert_eq!(hits.len(), 20);
        let distinct: HashSet<usize> = hits.iter().map(|h| h.index).collect();
        assert_eq!(distinct.len(), 20);
        assert!(hits.iter().all(|h| h.index < n));
        assert!(hits.windows(2).all(|w| w[0].distance <= w[1].distance));
        // (3, 3) is the closest grid point
        assert_eq!(hits[0].index, 3 * 7 + 3);
    }

    #[test]
    fn test_search_matches_brute_force() {
        let rows = grid(30);
        let index = FlatL2Index::new(rows.clone()).unwrap();
        let query = [1.5, 0.5, 0.0];

        let hits = index.search(&query, 30).unwrap();

        for hit in hits {
            let expected = squared_euclidean(&query, &rows[hit.index]).sqrt();
            assert!((hit.distance - expected).abs() < 1e-6);
        }
    }

    #[test]
    fn test_ties_break_by_row_order() {
        let index = FlatL2Index::new(vec![vec![1.0], vec![-1.0], vec![1.0], vec![5.0]]).unwrap();
        let hits = index.search(&[0.0], 3).unwrap();
        let order: Vec<usize> = hits.iter().map(|h| h.index).collect();
        assert_eq!(order, vec![0, 1, 2]);
    }

    #[test]
    fn test_search_fails_when_k_exceeds_corpus() {
        let index = FlatL2Index::new(grid(19)).unwrap();
        assert_eq!(
            index.search(&[0.0, 0.0, 0.0], 20),
            Err(IndexError::InsufficientEntries {
                k: 20,
                available: 19
            })
        );
        assert_eq!(index.search(&[0.0, 0.0, 0.0], 0), Err(IndexError::InvalidK));
        assert!(matches!(
            index.search(&[0.0], 1),
            Err(IndexError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_new_rejects_empty_and_ragged_input() {
        assert_eq!(FlatL2Index::new(vec![]).unwrap_err(), IndexError::EmptyCorpus);
        assert_eq!(
            FlatL2Index::new(vec![vec![1.0, 2.0], vec![1.0]]).unwrap_err(),
            IndexError::DimensionMismatch {
                row: 1,
                expected: 2,
                found: 1
            }
        );
    }

    #[test]
    fn test_rows_stay_aligned_with_texts() {
        let embedder = KeywordEmbedder::new(&["ana", "bruno", "passagem", "combustível"]);
        let texts: Vec<String> = [
            "1 Ana PL",
            "2 Bruno PT",
            "2024-08-01 Ana PASSAGEM 300",
            "2024-08-02 Bruno COMBUSTÍVEL 80",
            "Bruno passagem passagem",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();

        let store = VectorStore::build(&embedder, &texts).unwrap();

        assert_eq!(store.len(), texts.len());
        for (i, text) in texts.iter().enumerate() {
            let expected = embedder.embed_one(text).unwrap();
            assert_eq!(store.row(i).unwrap(), expected.as_slice());
        }
        assert!(store.row(texts.len()).is_none());

        let hits = store.search(&embedder, "passagem", 1).unwrap();
        assert_eq!(hits[0].index, 2);
    }

    #[test]
    fn test_build_errors() {
        let embedder = KeywordEmbedder::new(&["x"]);
        assert!(matches!(
            VectorStore::build(&embedder, &[]),
            Err(AssistantError::Index(IndexError::EmptyCorpus))
        ));
        assert!(matches!(
            VectorStore::build(&FailingEmbedder, &["x".to_string()]),
            Err(AssistantError::Embedding(_))
        ));
    }
}
