// SPDX-License-Identifier: MIT OR Apache-2.0

//! Persisted form of annotation embeddings.
//!
//! Embeddings are stored as a [CBOR] array of 32-bit floats, which keeps the column compact and
//! independent of the platform's byte order.
//!
//! [CBOR]: https://cbor.io/
use ciborium::de::Error as DeserializeError;
use ciborium::ser::Error as SerializeError;
use thiserror::Error;

/// Encodes an embedding vector into CBOR bytes.
pub fn encode_embedding(embedding: &[f32]) -> Result<Vec<u8>, EmbeddingError> {
    let mut bytes = Vec::with_capacity(embedding.len() * 5 + 9);
    ciborium::ser::into_writer(embedding, &mut bytes)?;
    Ok(bytes)
}

/// Decodes an embedding vector from CBOR bytes.
///
/// Non-finite components are rejected, they would poison every similarity score computed with
/// them.
pub fn decode_embedding(bytes: &[u8]) -> Result<Vec<f32>, EmbeddingError> {
    let embedding: Vec<f32> = ciborium::from_reader(bytes)?;
    if let Some(position) = embedding.iter().position(|value| !value.is_finite()) {
        return Err(EmbeddingError::NonFinite(position));
    }
    Ok(embedding)
}

#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("embedding can't be written: {0}")]
    Encode(String),

    #[error("malformed embedding bytes at position {0:?}: {1}")]
    Decode(Option<usize>, String),

    #[error("embedding component {0} is not a finite number")]
    NonFinite(usize),
}

impl From<SerializeError<std::io::Error>> for EmbeddingError {
    fn from(value: SerializeError<std::io::Error>) -> Self {
        match value {
            SerializeError::Io(err) => EmbeddingError::Encode(err.to_string()),
            SerializeError::Value(description) => EmbeddingError::Encode(description),
        }
    }
}

impl From<DeserializeError<std::io::Error>> for EmbeddingError {
    fn from(value: DeserializeError<std::io::Error>) -> Self {
        match value {
            DeserializeError::Io(err) => EmbeddingError::Decode(None, err.to_string()),
            DeserializeError::Syntax(offset) => {
                EmbeddingError::Decode(Some(offset), "invalid syntax".into())
            }
            DeserializeError::Semantic(offset, description) => {
                EmbeddingError::Decode(offset, description)
            }
            DeserializeError::RecursionLimitExceeded => {
                EmbeddingError::Decode(None, "recursion limit exceeded".into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{EmbeddingError, decode_embedding, encode_embedding};

    #[test]
    fn embedding_survives_encoding() {
        let embedding = vec![0.25_f32, -1.0, 3.5];
        let bytes = encode_embedding(&embedding).unwrap();
        assert_eq!(decode_embedding(&bytes).unwrap(), embedding);

        assert!(decode_embedding(&[]).unwrap_err().to_string().contains("malformed"));
        assert!(matches!(
            decode_embedding(&[0xff, 0x00]),
            Err(EmbeddingError::Decode(..))
        ));

        let bytes = encode_embedding(&[1.0, f32::NAN]).unwrap();
        assert!(matches!(
            decode_embedding(&bytes),
            Err(EmbeddingError::NonFinite(1))
        ));
    }
}
