//! Model Store: persist and reload a trained model.
//!
//! The artifact is a bincode encoding of `ModelArtifact`, which holds the
//! similarity matrix together with the user ids labelling its rows. Storing
//! the ids means a server can resolve a user id to its row explicitly
//! instead of assuming ids are row numbers.
//!
//! Decoding validates everything the engine guarantees (square, symmetric,
//! finite, one id per row, no repeated ids); anything else is a
//! `DeserializationFailure`.

use crate::error::{Result, SimilarityError};
use crate::similarity_matrix::SimilarityMatrix;
use data_loader::UserId;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;
use tracing::{info, instrument};

/// A trained model: row-labelled similarity matrix
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawArtifact")]
pub struct ModelArtifact {
    users: Vec<UserId>,
    similarity: SimilarityMatrix,
}

#[derive(Deserialize)]
struct RawArtifact {
    users: Vec<UserId>,
    similarity: SimilarityMatrix,
}

impl TryFrom<RawArtifact> for ModelArtifact {
    type Error = SimilarityError;

    fn try_from(raw: RawArtifact) -> Result<Self> {
        Self::new(raw.users, raw.similarity)
    }
}

impl ModelArtifact {
    /// Pair a similarity matrix with the ids of its rows, in row order
    pub fn new(users: Vec<UserId>, similarity: SimilarityMatrix) -> Result<Self> {
        if users.len() != similarity.len() {
            return Err(SimilarityError::DeserializationFailure(format!(
                "{} user ids for a {}x{} matrix",
                users.len(),
                similarity.len(),
                similarity.len()
            )));
        }

        let mut seen = HashSet::with_capacity(users.len());
        if let Some(duplicate) = users.iter().find(|user| !seen.insert(*user)) {
            return Err(SimilarityError::DeserializationFailure(format!(
                "user id {} labels more than one row",
                duplicate
            )));
        }

        Ok(Self { users, similarity })
    }

    pub fn empty() -> Self {
        Self {
            users: Vec::new(),
            similarity: SimilarityMatrix::empty(),
        }
    }

    /// User ids in row order
    pub fn users(&self) -> &[UserId] {
        &self.users
    }

    pub fn similarity(&self) -> &SimilarityMatrix {
        &self.similarity
    }

    pub fn user_count(&self) -> usize {
        self.users.len()
    }

    /// Map from user id to row index
    pub fn user_index(&self) -> HashMap<UserId, usize> {
        self.users
            .iter()
            .enumerate()
            .map(|(row, user)| (user.clone(), row))
            .collect()
    }
}

/// Serialize an artifact to bytes
pub fn encode(artifact: &ModelArtifact) -> Result<Vec<u8>> {
    bincode::serialize(artifact)
        .map_err(|e| SimilarityError::SerializationFailure(e.to_string()))
}

/// Deserialize and validate an artifact
pub fn decode(bytes: &[u8]) -> Result<ModelArtifact> {
    bincode::deserialize(bytes).map_err(|e| SimilarityError::DeserializationFailure(e.to_string()))
}

/// Write an artifact to disk
#[instrument(skip(artifact), fields(users = artifact.user_count()))]
pub fn save(artifact: &ModelArtifact, path: &Path) -> Result<()> {
    let bytes = encode(artifact)?;
    fs::write(path, &bytes)?;
    info!("Saved model ({} bytes) to {:?}", bytes.len(), path);
    Ok(())
}

/// Read an artifact from disk
#[instrument]
pub fn load(path: &Path) -> Result<ModelArtifact> {
    let bytes = fs::read(path)?;
    let artifact = decode(&bytes)?;
    info!("Loaded model with {} users from {:?}", artifact.user_count(), path);
    Ok(artifact)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ModelArtifact {
        let similarity =
            SimilarityMatrix::from_values(2, vec![1.0, 0.624_695_047_554_424_2, 0.624_695_047_554_424_2, 1.0])
                .unwrap();
        ModelArtifact::new(vec![UserId::new("u1"), UserId::new("u2")], similarity).unwrap()
    }

    #[test]
    fn test_encode_decode_is_exact() {
        let artifact = sample();
        let decoded = decode(&encode(&artifact).unwrap()).unwrap();
        assert_eq!(decoded, artifact);
    }

    #[test]
    fn test_empty_artifact_round_trips() {
        let artifact = ModelArtifact::empty();
        let decoded = decode(&encode(&artifact).unwrap()).unwrap();
        assert_eq!(decoded, artifact);
        assert!(decoded.similarity().is_empty());
    }

    #[test]
    fn test_label_count_must_match() {
        let result = ModelArtifact::new(vec![UserId::new("u1")], sample().similarity().clone());
        assert!(matches!(result, Err(SimilarityError::DeserializationFailure(_))));
    }

    #[test]
    fn test_duplicate_labels_rejected() {
        let result = ModelArtifact::new(
            vec![UserId::new("u1"), UserId::new("u1")],
            sample().similarity().clone(),
        );
        assert!(matches!(result, Err(SimilarityError::DeserializationFailure(_))));
    }

    #[test]
    fn test_garbage_bytes_fail_to_decode() {
        assert!(matches!(
            decode(&[0xff, 0x01, 0x02]),
            Err(SimilarityError::DeserializationFailure(_))
        ));
    }

    #[test]
    fn test_asymmetric_payload_fails_to_decode() {
        // Same wire layout as ModelArtifact, without the validation
        #[derive(Serialize)]
        struct Forged {
            users: Vec<UserId>,
            similarity: ForgedMatrix,
        }
        #[derive(Serialize)]
        struct ForgedMatrix {
            size: usize,
            values: Vec<f64>,
        }

        let forged = Forged {
            users: vec![UserId::new("a"), UserId::new("b")],
            similarity: ForgedMatrix {
                size: 2,
                values: vec![1.0, 0.3, 0.7, 1.0],
            },
        };
        let bytes = bincode::serialize(&forged).unwrap();
        assert!(matches!(
            decode(&bytes),
            Err(SimilarityError::DeserializationFailure(_))
        ));
    }

    #[test]
    fn test_user_index() {
        let index = sample().user_index();
        assert_eq!(index[&UserId::new("u2")], 1);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("recommendation_model.bin");

        save(&sample(), &path).unwrap();
        assert_eq!(load(&path).unwrap(), sample());
    }

    #[test]
    fn test_load_missing_file() {
        assert!(matches!(
            load(Path::new("no/such/model.bin")),
            Err(SimilarityError::Io(_))
        ));
    }
}
