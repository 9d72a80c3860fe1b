use crate::config::TrainingConfig;
use crate::model::SoftmaxClassifier;
use crate::optim::Adam;
use crate::preprocess::Dataset;
use log::info;
use ndarray::{Array2, ArrayView1, Axis};
use ndarray_rand::rand::Rng;
use ndarray_rand::rand::seq::SliceRandom;

// Training metrics for one epoch, measured on the training split itself.
pub struct EpochReport {
    pub epoch: usize,
    pub loss: f64,
    pub accuracy: f64,
}

pub struct Metrics {
    pub loss: f64,
    pub accuracy: f64,
}

pub struct Trainer {
    config: TrainingConfig,
    optimizer: Adam,
}

impl Trainer {
    pub fn new(config: TrainingConfig, model: &SoftmaxClassifier) -> Self {
        let optimizer = Adam::new(config.learning_rate, model);
        Trainer { config, optimizer }
    }

    // Run the configured number of epochs unconditionally. Each epoch shuffles
    // the sample indices, walks them in mini-batches, and applies one Adam
    // update per batch. The gradient of softmax followed by cross-entropy
    // against one-hot targets collapses to (probabilities - targets), so no
    // general backpropagation machinery is needed for a single layer.
    pub fn fit<R: Rng + ?Sized>(
        &mut self,
        model: &mut SoftmaxClassifier,
        data: &Dataset,
        rng: &mut R,
    ) -> Vec<EpochReport> {
        let mut indices: Vec<usize> = (0..data.len()).collect();
        let mut reports = Vec::with_capacity(self.config.epochs);

        for epoch in 1..=self.config.epochs {
            indices.shuffle(rng);

            let mut summed_loss = 0.0;
            let mut correct = 0usize;
            for batch in indices.chunks(self.config.batch_size) {
                let inputs = data.inputs.select(Axis(0), batch);
                let targets = data.targets.select(Axis(0), batch);
                let batch_len = batch.len() as f64;

                let probs = model.probabilities(&inputs);
                summed_loss += cross_entropy(&probs, &targets) * batch_len;
                for (row, &index) in probs.rows().into_iter().zip(batch.iter()) {
                    if argmax(row) == usize::from(data.labels[index]) {
                        correct += 1;
                    }
                }

                let delta = probs - targets;
                let grad_weights = inputs.t().dot(&delta) / batch_len;
                let grad_biases = delta.sum_axis(Axis(0)) / batch_len;
                self.optimizer.step(model, &grad_weights, &grad_biases);
            }

            let loss = summed_loss / data.len() as f64;
            let accuracy = correct as f64 / data.len() as f64;
            info!(
                "epoch {}/{}: loss {:.4}, accuracy {:.4}",
                epoch, self.config.epochs, loss, accuracy
            );
            reports.push(EpochReport {
                epoch,
                loss,
                accuracy,
            });
        }
        reports
    }
}

// Forward pass over a whole dataset, reporting aggregate cross-entropy loss
// and argmax accuracy. Mutates nothing.
pub fn evaluate(model: &SoftmaxClassifier, data: &Dataset) -> Metrics {
    let probs = model.probabilities(&data.inputs);
    let loss = cross_entropy(&probs, &data.targets);
    let mut correct = 0usize;
    for (row, &label) in probs.rows().into_iter().zip(data.labels.iter()) {
        if argmax(row) == usize::from(label) {
            correct += 1;
        }
    }
    Metrics {
        loss,
        accuracy: correct as f64 / data.len() as f64,
    }
}

// Mean categorical cross-entropy. Probabilities are clamped away from zero so
// a confidently wrong prediction yields a large finite loss rather than inf.
pub fn cross_entropy(probs: &Array2<f64>, targets: &Array2<f64>) -> f64 {
    let count = probs.dim().0 as f64;
    let log_probs = probs.mapv(|p| p.max(1e-12).ln());
    -(targets * &log_probs).sum() / count
}

pub fn argmax(row: ArrayView1<f64>) -> usize {
    row.iter()
        .enumerate()
        .max_by(|(_, a), (_, b)| a.total_cmp(b))
        .map(|(index, _)| index)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preprocess::one_hot;
    use ndarray::{Array1, array};
    use ndarray_rand::rand::SeedableRng;
    use ndarray_rand::rand::rngs::StdRng;

    fn toy_config(epochs: usize, batch_size: usize, learning_rate: f64) -> TrainingConfig {
        TrainingConfig {
            epochs,
            batch_size,
            learning_rate,
            image_side: 2,
            classes: 3,
            ..TrainingConfig::default()
        }
    }

    // 12 samples, 3 classes, each class a distinct one-hot corner of R^4.
    fn toy_dataset() -> Dataset {
        let labels = Array1::from_vec(vec![0u8, 1, 2, 0, 1, 2, 0, 1, 2, 0, 1, 2]);
        let inputs = Array2::from_shape_fn((12, 4), |(i, feature)| {
            if usize::from(labels[i]) == feature {
                1.0
            } else {
                0.0
            }
        });
        Dataset {
            inputs,
            targets: one_hot(&labels, 3),
            labels,
        }
    }

    #[test]
    fn cross_entropy_of_a_perfect_prediction_is_zero() {
        let probs = array![[1.0, 0.0, 0.0]];
        let targets = array![[1.0, 0.0, 0.0]];
        assert!(cross_entropy(&probs, &targets).abs() < 1e-12);
    }

    #[test]
    fn cross_entropy_of_a_uniform_prediction_is_log_classes() {
        let probs = array![[0.25, 0.25, 0.25, 0.25], [0.25, 0.25, 0.25, 0.25]];
        let targets = array![[1.0, 0.0, 0.0, 0.0], [0.0, 0.0, 1.0, 0.0]];
        assert!((cross_entropy(&probs, &targets) - 4.0f64.ln()).abs() < 1e-12);
    }

    #[test]
    fn argmax_picks_the_largest_entry() {
        assert_eq!(argmax(array![0.1, 0.7, 0.2].view()), 1);
        assert_eq!(argmax(array![-3.0, -1.0, -2.0].view()), 1);
        assert_eq!(argmax(array![5.0].view()), 0);
    }

    #[test]
    fn evaluate_scores_a_hand_built_model() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut model = SoftmaxClassifier::new(3, 3, &mut rng);
        {
            let (weights, biases) = model.params_mut();
            weights.fill(0.0);
            biases.fill(0.0);
            for i in 0..3 {
                weights[[i, i]] = 5.0;
            }
        }

        let labels = Array1::from_vec(vec![0u8, 1, 2]);
        let data = Dataset {
            inputs: one_hot(&labels, 3),
            targets: one_hot(&labels, 3),
            labels,
        };
        let metrics = evaluate(&model, &data);
        assert_eq!(metrics.accuracy, 1.0);
        assert!(metrics.loss < 0.1);
    }

    #[test]
    fn fit_learns_a_separable_toy_problem() {
        let mut rng = StdRng::seed_from_u64(3);
        let data = toy_dataset();
        let config = toy_config(100, 4, 0.05);
        let mut model = SoftmaxClassifier::new(4, 3, &mut rng);
        let mut trainer = Trainer::new(config, &model);

        let reports = trainer.fit(&mut model, &data, &mut rng);
        assert_eq!(reports.len(), 100);
        assert!(reports.last().unwrap().loss < reports.first().unwrap().loss);

        let metrics = evaluate(&model, &data);
        assert!(metrics.accuracy >= 0.9);
        assert!(metrics.loss < 0.5);
    }

    #[test]
    fn fit_runs_the_configured_number_of_epochs() {
        let mut rng = StdRng::seed_from_u64(1);
        let data = toy_dataset();
        let mut model = SoftmaxClassifier::new(4, 3, &mut rng);
        let mut trainer = Trainer::new(toy_config(3, 5, 1e-3), &model);
        let reports = trainer.fit(&mut model, &data, &mut rng);
        assert_eq!(reports.len(), 3);
        assert_eq!(reports[0].epoch, 1);
        assert_eq!(reports[2].epoch, 3);
    }
}
