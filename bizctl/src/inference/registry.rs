//! Loads per-tier model artifacts from a directory and keeps them cached.

use async_trait::async_trait;
use moka::future::Cache;
use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::Arc,
};
use tracing::{debug, info, instrument, warn};

use super::{Features, InferenceError, LinearModel, ModelArtifact, Predictor};
use crate::billing::tiers::ModelTier;

/// The production [`Predictor`]: `<models_dir>/<tier>.json`, loaded on first use.
///
/// Failed loads are not cached, so replacing a broken artifact takes effect on the next request.
pub struct ModelRegistry {
    models_dir: PathBuf,
    cache: Cache<ModelTier, Arc<LinearModel>>,
}

impl ModelRegistry {
    pub fn new(models_dir: impl Into<PathBuf>, cache_capacity: u64) -> Self {
        Self {
            models_dir: models_dir.into(),
            cache: Cache::new(cache_capacity),
        }
    }

    pub fn artifact_path(&self, tier: ModelTier) -> PathBuf {
        self.models_dir.join(format!("{tier}.json"))
    }

    /// Try to load every tier, logging the ones that are unusable.
    ///
    /// Startup does not fail on a bad artifact; predictions on that tier fail instead.
    pub async fn warm_up(&self) -> usize {
        let mut loaded = 0;
        for tier in ModelTier::ALL {
            match self.model(tier).await {
                Ok(_) => loaded += 1,
                Err(e) => warn!("Model {tier} unavailable at startup: {e}"),
            }
        }
        info!("Loaded {loaded}/{} models from {}", ModelTier::COUNT, self.models_dir.display());
        loaded
    }

    async fn model(&self, tier: ModelTier) -> Result<Arc<LinearModel>, InferenceError> {
        let path = self.artifact_path(tier);
        self.cache
            .try_get_with(tier, load_artifact(tier, path))
            .await
            .map_err(|e| e.as_ref().clone())
    }
}

#[instrument(skip(path), fields(path = %path.display()))]
async fn load_artifact(tier: ModelTier, path: PathBuf) -> Result<Arc<LinearModel>, InferenceError> {
    let bytes = tokio::fs::read(&path).await.map_err(|e| read_error(tier, &path, e))?;
    let artifact: ModelArtifact = serde_json::from_slice(&bytes).map_err(|e| InferenceError::InvalidArtifact {
        tier,
        reason: e.to_string(),
    })?;
    let model = LinearModel::from_artifact(tier, &artifact)?;
    debug!("Loaded model artifact");
    Ok(Arc::new(model))
}

fn read_error(tier: ModelTier, path: &Path, e: std::io::Error) -> InferenceError {
    if e.kind() == ErrorKind::NotFound {
        InferenceError::ModelUnavailable {
            tier,
            path: path.to_path_buf(),
        }
    } else {
        InferenceError::InvalidArtifact {
            tier,
            reason: format!("could not read {}: {e}", path.display()),
        }
    }
}

#[async_trait]
impl Predictor for ModelRegistry {
    async fn predict(&self, tier: ModelTier, features: &Features) -> Result<i64, InferenceError> {
        let model = self.model(tier).await?;
        Ok(model.predict(features))
    }
}
