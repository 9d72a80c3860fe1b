use crate::model::SoftmaxClassifier;
use ndarray::{Array, Array1, Array2, Dimension, Zip};

// Adam keeps a running mean (m) and uncentered variance (v) of the gradient
// for every parameter, both bias-corrected by the step counter t. One state
// slot per parameter tensor of the model.
pub struct Adam {
    learning_rate: f64,
    beta1: f64,
    beta2: f64,
    epsilon: f64,
    t: i32,
    weight_m: Array2<f64>,
    weight_v: Array2<f64>,
    bias_m: Array1<f64>,
    bias_v: Array1<f64>,
}

impl Adam {
    pub fn new(learning_rate: f64, model: &SoftmaxClassifier) -> Self {
        let weight_shape = (model.input_len(), model.classes());
        Adam {
            learning_rate,
            beta1: 0.9,
            beta2: 0.999,
            epsilon: 1e-8,
            t: 0,
            weight_m: Array2::zeros(weight_shape),
            weight_v: Array2::zeros(weight_shape),
            bias_m: Array1::zeros(model.classes()),
            bias_v: Array1::zeros(model.classes()),
        }
    }

    // Apply one update to the model from the batch gradients.
    pub fn step(
        &mut self,
        model: &mut SoftmaxClassifier,
        grad_weights: &Array2<f64>,
        grad_biases: &Array1<f64>,
    ) {
        self.t += 1;
        let (weights, biases) = model.params_mut();
        update(
            self.t,
            self.learning_rate,
            self.beta1,
            self.beta2,
            self.epsilon,
            weights,
            grad_weights,
            &mut self.weight_m,
            &mut self.weight_v,
        );
        update(
            self.t,
            self.learning_rate,
            self.beta1,
            self.beta2,
            self.epsilon,
            biases,
            grad_biases,
            &mut self.bias_m,
            &mut self.bias_v,
        );
    }
}

#[allow(clippy::too_many_arguments)]
fn update<D: Dimension>(
    t: i32,
    learning_rate: f64,
    beta1: f64,
    beta2: f64,
    epsilon: f64,
    param: &mut Array<f64, D>,
    grad: &Array<f64, D>,
    m: &mut Array<f64, D>,
    v: &mut Array<f64, D>,
) {
    let m_correction = 1.0 - beta1.powi(t);
    let v_correction = 1.0 - beta2.powi(t);
    Zip::from(param)
        .and(grad)
        .and(m)
        .and(v)
        .for_each(|p, &g, m, v| {
            *m = beta1 * *m + (1.0 - beta1) * g;
            *v = beta2 * *v + (1.0 - beta2) * g * g;
            let m_hat = *m / m_correction;
            let v_hat = *v / v_correction;
            *p -= learning_rate * m_hat / (v_hat.sqrt() + epsilon);
        });
}
