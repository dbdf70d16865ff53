//! # Recommendation Service
//!
//! Read-only serving layer over a trained model:
//! 1. Resolve the request's user id to a similarity-matrix row
//! 2. Rank the row's neighbours (top-N, ties by index)
//! 3. Return row indices, or indices with ids and scores
//!
//! The model is loaded once and shared behind an `Arc`; it is never
//! mutated, so any number of handlers can query it without locking.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, instrument};

use crate::config::{IndexMapping, ServiceConfig};
use data_loader::UserId;
use similarity::{ModelArtifact, SimilarityError, top_similar_scored};

/// User id as it arrives in a request: a JSON number or a string
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UserKey {
    Index(i64),
    Id(String),
}

impl fmt::Display for UserKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserKey::Index(index) => write!(f, "{}", index),
            UserKey::Id(id) => f.write_str(id),
        }
    }
}

impl From<&str> for UserKey {
    fn from(id: &str) -> Self {
        UserKey::Id(id.to_string())
    }
}

impl From<i64> for UserKey {
    fn from(index: i64) -> Self {
        UserKey::Index(index)
    }
}

/// Errors surfaced to the HTTP layer
#[derive(Error, Debug)]
pub enum ServiceError {
    /// Lookup mode: the id is not one of the model's users
    #[error("Unknown user {0}")]
    UnknownUser(String),

    /// Cast mode: the id is not an integer
    #[error("User id {0:?} is not an integer row index")]
    InvalidUserKey(String),

    #[error(transparent)]
    Model(#[from] SimilarityError),
}

/// One recommended neighbour
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendation {
    /// Row in the similarity matrix
    pub index: usize,
    pub user_id: UserId,
    pub score: f64,
}

/// Shared, read-only recommendation service
#[derive(Clone)]
pub struct RecommendationService {
    model: Arc<ModelArtifact>,
    user_rows: Arc<HashMap<UserId, usize>>,
    config: ServiceConfig,
}

impl RecommendationService {
    /// Wrap a loaded model
    pub fn new(model: Arc<ModelArtifact>, config: ServiceConfig) -> Self {
        let user_rows = Arc::new(model.user_index());
        Self {
            model,
            user_rows,
            config,
        }
    }

    pub fn model(&self) -> &ModelArtifact {
        &self.model
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Row indices of the most similar users
    pub fn recommend(
        &self,
        key: &UserKey,
        limit: Option<usize>,
    ) -> Result<Vec<usize>, ServiceError> {
        Ok(self
            .recommend_detailed(key, limit)?
            .into_iter()
            .map(|rec| rec.index)
            .collect())
    }

    /// Most similar users with their ids and similarity scores
    #[instrument(skip(self, key), fields(key = %key))]
    pub fn recommend_detailed(
        &self,
        key: &UserKey,
        limit: Option<usize>,
    ) -> Result<Vec<Recommendation>, ServiceError> {
        let similarity = self.model.similarity();
        if similarity.is_empty() {
            return Err(SimilarityError::EmptyModel.into());
        }

        let row = self.resolve(key)?;
        let limit = limit.unwrap_or(self.config.default_limit);
        let ranked = top_similar_scored(similarity, row, limit, self.config.include_self)?;

        let users = self.model.users();
        let recommendations: Vec<Recommendation> = ranked
            .into_iter()
            .map(|(index, score)| Recommendation {
                index,
                user_id: users[index].clone(),
                score,
            })
            .collect();

        debug!(
            "Resolved {} to row {}, returning {} neighbours",
            key,
            row,
            recommendations.len()
        );
        Ok(recommendations)
    }

    /// Turn a request's user id into a row index
    pub fn resolve(&self, key: &UserKey) -> Result<usize, ServiceError> {
        match self.config.index_mapping {
            IndexMapping::Lookup => {
                let id = UserId::new(key.to_string());
                self.user_rows
                    .get(&id)
                    .copied()
                    .ok_or_else(|| ServiceError::UnknownUser(key.to_string()))
            }
            IndexMapping::Cast => {
                let index = match key {
                    UserKey::Index(index) => *index,
                    UserKey::Id(id) => id
                        .trim()
                        .parse::<i64>()
                        .map_err(|_| ServiceError::InvalidUserKey(id.clone()))?,
                };
                Ok(self.model.similarity().checked_index(index)?)
            }
        }
    }
}
