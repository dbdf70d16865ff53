//! Offline training: interaction log in, model artifact out.
//!
//! The feature matrix only lives for the duration of `train`; the artifact
//! keeps its row labels so the row order stays recoverable later.

use crate::engine::{Execution, compute_similarity_with};
use crate::error::Result;
use crate::matrix::UserFeatureMatrix;
use crate::store::ModelArtifact;
use data_loader::InteractionLog;
use std::time::Instant;
use tracing::{info, instrument};

/// Build the feature matrix and similarity model for a log
#[instrument(skip(log), fields(records = log.record_count()))]
pub fn train(log: &InteractionLog) -> Result<ModelArtifact> {
    train_with(log, Execution::default())
}

/// `train` with an explicit schedule for the similarity pass
pub fn train_with(log: &InteractionLog, execution: Execution) -> Result<ModelArtifact> {
    let start = Instant::now();

    let features = UserFeatureMatrix::from_log(log)?;
    info!(
        "Feature matrix: {} users x {} products",
        features.user_count(),
        features.product_count()
    );

    let similarity = compute_similarity_with(&features, execution);
    let artifact = ModelArtifact::new(features.users().to_vec(), similarity)?;

    info!(
        "Trained model for {} users in {:.2?}",
        artifact.user_count(),
        start.elapsed()
    );
    Ok(artifact)
}
