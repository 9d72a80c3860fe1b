use anyhow::{Result, ensure};
use std::path::PathBuf;

// Hyperparameters and file locations for a training run. The values below are
// the ones the run ships with; validate() keeps a hand-edited config from
// producing a degenerate run (zero-sized batches, a 0x0 image, ...).
#[derive(Debug, Clone)]
pub struct TrainingConfig {
    pub epochs: usize,
    pub batch_size: usize,
    pub learning_rate: f64,
    // Images are resized to image_side x image_side before flattening.
    pub image_side: usize,
    pub classes: usize,
    pub data_dir: PathBuf,
    pub weights_path: PathBuf,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        TrainingConfig {
            epochs: 5,
            batch_size: 32,
            learning_rate: 1e-3,
            image_side: 16,
            classes: 10,
            data_dir: PathBuf::from("data"),
            weights_path: PathBuf::from("model.json"),
        }
    }
}

impl TrainingConfig {
    // Length of one flattened input vector.
    pub fn input_len(&self) -> usize {
        self.image_side * self.image_side
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(self.epochs > 0, "epochs must be at least 1");
        ensure!(self.batch_size > 0, "batch size must be at least 1");
        ensure!(
            self.learning_rate.is_finite() && self.learning_rate > 0.0,
            "learning rate must be positive and finite, got {}",
            self.learning_rate
        );
        ensure!(self.image_side > 0, "image side must be at least 1");
        ensure!(self.classes > 1, "need at least 2 classes to classify");
        Ok(())
    }
}
