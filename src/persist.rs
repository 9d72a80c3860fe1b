use crate::model::SoftmaxClassifier;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

// Weights are stored as JSON. The write goes to a temporary sibling file
// first and is renamed into place, so an interrupted run cannot leave a
// half-written weights file behind under the real name.
pub fn save(model: &SoftmaxClassifier, path: &Path) -> Result<()> {
    let json = serde_json::to_vec(model).context("serializing model weights")?;
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, &json).with_context(|| format!("writing {}", tmp.display()))?;
    fs::rename(&tmp, path)
        .with_context(|| format!("moving {} to {}", tmp.display(), path.display()))?;
    Ok(())
}

pub fn load(path: &Path) -> Result<SoftmaxClassifier> {
    let bytes = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_slice(&bytes)
        .with_context(|| format!("parsing model weights in {}", path.display()))
}
