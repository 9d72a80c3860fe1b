use ndarray::{Array1, Array2};
use ndarray_rand::RandomExt;
use ndarray_rand::rand::Rng;
use ndarray_rand::rand_distr::Uniform;
use serde::{Deserialize, Serialize};

// A single dense layer with a softmax on top: the whole model. predict-side
// it is a pure function of its inputs; the trainer mutates the parameters
// between calls through params_mut.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoftmaxClassifier {
    weights: Array2<f64>,
    biases: Array1<f64>,
}

impl SoftmaxClassifier {
    // Glorot-uniform weights, zero biases.
    pub fn new(input_len: usize, classes: usize, rng: &mut impl Rng) -> Self {
        let limit = (6.0 / (input_len + classes) as f64).sqrt();
        SoftmaxClassifier {
            weights: Array2::random_using((input_len, classes), Uniform::new(-limit, limit), rng),
            biases: Array1::zeros(classes),
        }
    }

    pub fn input_len(&self) -> usize {
        self.weights.dim().0
    }

    pub fn classes(&self) -> usize {
        self.weights.dim().1
    }

    // Forward pass over a batch of row vectors [n, input_len], producing one
    // probability distribution per row [n, classes].
    pub fn probabilities(&self, inputs: &Array2<f64>) -> Array2<f64> {
        softmax(inputs.dot(&self.weights) + &self.biases)
    }

    pub fn params_mut(&mut self) -> (&mut Array2<f64>, &mut Array1<f64>) {
        (&mut self.weights, &mut self.biases)
    }
}

// Row-wise softmax, shifted by the row maximum so large logits cannot
// overflow the exponential.
pub fn softmax(mut logits: Array2<f64>) -> Array2<f64> {
    for mut row in logits.rows_mut() {
        let max = row.fold(f64::NEG_INFINITY, |a, &b| a.max(b));
        row.mapv_inplace(|z| (z - max).exp());
        let sum = row.sum();
        row.mapv_inplace(|p| p / sum);
    }
    logits
}
