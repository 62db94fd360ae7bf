//! Embedding gateway trait and vector utilities.
//!
//! [`Embedder`] is the black-box `text → vector` function the index and
//! search pipeline depend on. Concrete HTTP providers (OpenAI, Ollama) live
//! in the `clause-harness` app crate; tests use deterministic fakes.
//!
//! Implementations report transport, quota, and timeout problems as
//! [`ClauseError::TransientExternal`]. The core never retries.

use async_trait::async_trait;

use crate::error::{ClauseError, Result};

/// Maps text to fixed-dimension vectors.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Model identifier (e.g. `"text-embedding-3-small"`).
    fn model_name(&self) -> &str;

    /// Dimension of every vector this embedder returns (e.g. `1536`).
    fn dims(&self) -> usize;

    /// Embed a batch of texts, returning one vector per text in input order.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

/// Embed a single text.
pub async fn embed_one(embedder: &dyn Embedder, text: &str) -> Result<Vec<f32>> {
    embedder
        .embed(&[text.to_string()])
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| ClauseError::TransientExternal("empty embedding response".to_string()))
}

/// Embed texts in batches of `batch_size`, all or nothing.
///
/// Fails without returning partial results if any batch fails or returns
/// the wrong number of vectors.
pub async fn embed_batched(
    embedder: &dyn Embedder,
    texts: &[String],
    batch_size: usize,
) -> Result<Vec<Vec<f32>>> {
    let mut vectors = Vec::with_capacity(texts.len());
    for (i, batch) in texts.chunks(batch_size.max(1)).enumerate() {
        tracing::debug!(batch = i + 1, size = batch.len(), "embedding batch");
        let out = embedder.embed(batch).await?;
        if out.len() != batch.len() {
            return Err(ClauseError::TransientExternal(format!(
                "embedding response length mismatch: sent {}, received {}",
                batch.len(),
                out.len()
            )));
        }
        vectors.extend(out);
    }
    Ok(vectors)
}

/// Reject a vector whose length differs from the index-wide dimension.
pub fn check_dims(expected: usize, vector: &[f32]) -> Result<()> {
    if vector.len() != expected {
        return Err(ClauseError::Config(format!(
            "vector dimension {} does not match index dimension {}",
            vector.len(),
            expected
        )));
    }
    Ok(())
}

/// Encode a float vector as a BLOB (little-endian f32 bytes).
///
/// # Example
///
/// ```rust
/// use clause_harness_core::embedding::{vec_to_blob, blob_to_vec};
///
/// let v = vec![1.0f32, -2.5, 3.125];
/// let blob = vec_to_blob(&v);
/// assert_eq!(blob.len(), 12);
/// assert_eq!(blob_to_vec(&blob), v);
/// ```
pub fn vec_to_blob(vec: &[f32]) -> Vec<u8> {
    vec.iter().flat_map(|v| v.to_le_bytes()).collect()
}

/// Decode a BLOB written by [`vec_to_blob`].
pub fn blob_to_vec(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

/// Cosine similarity of two vectors, in `[-1.0, 1.0]`.
///
/// ```text
///            a · b
/// cos(θ) = ─────────
///          ‖a‖ × ‖b‖
/// ```
///
/// Returns `0.0` for empty vectors, vectors of different lengths, or a
/// zero-norm vector.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;

    for (&x, &y) in a.iter().zip(b.iter()) {
        let (x, y) = (x as f64, y as f64);
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < f64::EPSILON {
        return 0.0;
    }

    dot / denom
}
