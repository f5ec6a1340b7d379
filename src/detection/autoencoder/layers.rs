//! Recurrent and dense layers with hand-written backpropagation.
//!
//! All tensors are batch-major: a timestep is an `(batch, features)` matrix.

use ndarray::{s, Array1, Array2, Axis};
use rand::rngs::StdRng;
use rand::Rng;
use rand_distr::{Distribution, Uniform};

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Glorot-uniform matrix of shape `(fan_in, fan_out)`.
fn glorot_uniform(fan_in: usize, fan_out: usize, rng: &mut StdRng) -> Array2<f64> {
    let limit = (6.0 / (fan_in + fan_out) as f64).sqrt();
    let dist = Uniform::new_inclusive(-limit, limit);
    Array2::from_shape_fn((fan_in, fan_out), |_| dist.sample(rng))
}

/// Inverted-dropout mask: each unit is zeroed with probability `rate` and
/// survivors are scaled by `1 / (1 - rate)`.
pub(crate) fn dropout_mask(shape: (usize, usize), rate: f64, rng: &mut StdRng) -> Array2<f64> {
    if rate <= 0.0 {
        return Array2::ones(shape);
    }
    let keep = 1.0 / (1.0 - rate);
    Array2::from_shape_fn(shape, |_| if rng.gen::<f64>() < rate { 0.0 } else { keep })
}

/// Activations of one LSTM step kept for the backward pass.
#[derive(Debug, Clone)]
pub(crate) struct LstmStep {
    x: Array2<f64>,
    h_prev: Array2<f64>,
    c_prev: Array2<f64>,
    input_gate: Array2<f64>,
    forget_gate: Array2<f64>,
    candidate: Array2<f64>,
    output_gate: Array2<f64>,
    tanh_c: Array2<f64>,
}

/// Gradients of an [`LstmLayer`]'s parameters.
#[derive(Debug, Clone)]
pub(crate) struct LstmGradients {
    pub kernel: Array2<f64>,
    pub recurrent: Array2<f64>,
    pub bias: Array1<f64>,
}

/// LSTM layer with gate blocks ordered input, forget, candidate, output.
#[derive(Debug, Clone)]
pub(crate) struct LstmLayer {
    /// `(input, 4 * hidden)`
    pub kernel: Array2<f64>,
    /// `(hidden, 4 * hidden)`
    pub recurrent: Array2<f64>,
    /// `4 * hidden`
    pub bias: Array1<f64>,
    hidden: usize,
}

impl LstmLayer {
    pub fn new(input: usize, hidden: usize, rng: &mut StdRng) -> Self {
        let kernel = glorot_uniform(input, 4 * hidden, rng);
        let recurrent = glorot_uniform(hidden, 4 * hidden, rng);
        let mut bias = Array1::zeros(4 * hidden);
        bias.slice_mut(s![hidden..2 * hidden]).fill(1.0);
        Self {
            kernel,
            recurrent,
            bias,
            hidden,
        }
    }

    pub fn hidden(&self) -> usize {
        self.hidden
    }

    /// Run the sequence from a zero state, returning every hidden state.
    pub fn forward(&self, inputs: &[Array2<f64>]) -> (Vec<Array2<f64>>, Vec<LstmStep>) {
        let batch = inputs.first().map(|x| x.nrows()).unwrap_or(0);
        let hd = self.hidden;
        let mut h = Array2::zeros((batch, hd));
        let mut c = Array2::zeros((batch, hd));
        let mut outputs = Vec::with_capacity(inputs.len());
        let mut steps = Vec::with_capacity(inputs.len());

        for x in inputs {
            let z = x.dot(&self.kernel) + h.dot(&self.recurrent) + &self.bias;
            let input_gate = z.slice(s![.., 0..hd]).mapv(sigmoid);
            let forget_gate = z.slice(s![.., hd..2 * hd]).mapv(sigmoid);
            let candidate = z.slice(s![.., 2 * hd..3 * hd]).mapv(f64::tanh);
            let output_gate = z.slice(s![.., 3 * hd..]).mapv(sigmoid);

            let c_next = &forget_gate * &c + &input_gate * &candidate;
            let tanh_c = c_next.mapv(f64::tanh);
            let h_next = &output_gate * &tanh_c;

            steps.push(LstmStep {
                x: x.clone(),
                h_prev: std::mem::replace(&mut h, h_next),
                c_prev: std::mem::replace(&mut c, c_next),
                input_gate,
                forget_gate,
                candidate,
                output_gate,
                tanh_c,
            });
            outputs.push(h.clone());
        }
        (outputs, steps)
    }

    /// Backpropagate through time.
    ///
    /// `dh_out[t]` is the loss gradient flowing into hidden state `t` from
    /// above. Returns parameter gradients and the gradient for each input.
    pub fn backward(&self, steps: &[LstmStep], dh_out: &[Array2<f64>]) -> (LstmGradients, Vec<Array2<f64>>) {
        let hd = self.hidden;
        let mut grads = LstmGradients {
            kernel: Array2::zeros(self.kernel.raw_dim()),
            recurrent: Array2::zeros(self.recurrent.raw_dim()),
            bias: Array1::zeros(self.bias.len()),
        };
        let batch = steps.first().map(|s| s.x.nrows()).unwrap_or(0);
        let mut dh_next = Array2::zeros((batch, hd));
        let mut dc_next = Array2::zeros((batch, hd));
        let mut dxs = vec![Array2::zeros((0, 0)); steps.len()];

        for (t, step) in steps.iter().enumerate().rev() {
            let dh = &dh_out[t] + &dh_next;

            let d_output = &dh * &step.tanh_c;
            let dc = &dh * &step.output_gate * &step.tanh_c.mapv(|v| 1.0 - v * v) + &dc_next;
            let d_input = &dc * &step.candidate;
            let d_candidate = &dc * &step.input_gate;
            let d_forget = &dc * &step.c_prev;
            dc_next = &dc * &step.forget_gate;

            let mut dz = Array2::zeros((batch, 4 * hd));
            dz.slice_mut(s![.., 0..hd])
                .assign(&(d_input * step.input_gate.mapv(|g| g * (1.0 - g))));
            dz.slice_mut(s![.., hd..2 * hd])
                .assign(&(d_forget * step.forget_gate.mapv(|g| g * (1.0 - g))));
            dz.slice_mut(s![.., 2 * hd..3 * hd])
                .assign(&(d_candidate * step.candidate.mapv(|g| 1.0 - g * g)));
            dz.slice_mut(s![.., 3 * hd..])
                .assign(&(d_output * step.output_gate.mapv(|g| g * (1.0 - g))));

            grads.kernel += &step.x.t().dot(&dz);
            grads.recurrent += &step.h_prev.t().dot(&dz);
            grads.bias += &dz.sum_axis(Axis(0));

            dxs[t] = dz.dot(&self.kernel.t());
            dh_next = dz.dot(&self.recurrent.t());
        }
        (grads, dxs)
    }
}

/// Fully connected projection applied to every timestep.
#[derive(Debug, Clone)]
pub(crate) struct Dense {
    /// `(input, output)`
    pub kernel: Array2<f64>,
    pub bias: Array1<f64>,
}

impl Dense {
    pub fn new(input: usize, output: usize, rng: &mut StdRng) -> Self {
        Self {
            kernel: glorot_uniform(input, output, rng),
            bias: Array1::zeros(output),
        }
    }

    pub fn forward(&self, x: &Array2<f64>) -> Array2<f64> {
        x.dot(&self.kernel) + &self.bias
    }

    /// Accumulate parameter gradients for input `x` and return the input gradient.
    pub fn backward(
        &self,
        x: &Array2<f64>,
        dy: &Array2<f64>,
        d_kernel: &mut Array2<f64>,
        d_bias: &mut Array1<f64>,
    ) -> Array2<f64> {
        *d_kernel += &x.t().dot(dy);
        *d_bias += &dy.sum_axis(Axis(0));
        dy.dot(&self.kernel.t())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::SeedableRng;

    /// Sum of hidden states as a scalar loss for gradient checks.
    fn loss(layer: &LstmLayer, inputs: &[Array2<f64>]) -> f64 {
        let (hs, _) = layer.forward(inputs);
        hs.iter().map(|h| h.sum()).sum()
    }

    fn inputs() -> Vec<Array2<f64>> {
        (0..4)
            .map(|t| Array2::from_shape_fn((2, 3), |(b, f)| 0.1 * (t + b) as f64 - 0.05 * f as f64))
            .collect()
    }

    #[test]
    fn forward_shapes() {
        let mut rng = StdRng::seed_from_u64(1);
        let layer = LstmLayer::new(3, 5, &mut rng);
        let (hs, steps) = layer.forward(&inputs());
        assert_eq!(hs.len(), 4);
        assert_eq!(steps.len(), 4);
        assert_eq!(hs[0].shape(), &[2, 5]);
        assert!(hs.iter().all(|h| h.iter().all(|v| v.abs() < 1.0)));
    }

    #[test]
    fn forget_bias_starts_at_one() {
        let mut rng = StdRng::seed_from_u64(1);
        let layer = LstmLayer::new(1, 4, &mut rng);
        assert_eq!(layer.bias.slice(s![4..8]).to_vec(), vec![1.0; 4]);
        assert_eq!(layer.bias.slice(s![0..4]).to_vec(), vec![0.0; 4]);
    }

    #[test]
    fn backward_matches_finite_differences() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut layer = LstmLayer::new(3, 4, &mut rng);
        let xs = inputs();
        let (hs, steps) = layer.forward(&xs);
        let ones: Vec<Array2<f64>> = hs.iter().map(|h| Array2::ones(h.raw_dim())).collect();
        let (grads, dxs) = layer.backward(&steps, &ones);

        let eps = 1e-6;
        for &(i, j) in &[(0, 0), (2, 5), (1, 13)] {
            let original = layer.kernel[[i, j]];
            layer.kernel[[i, j]] = original + eps;
            let up = loss(&layer, &xs);
            layer.kernel[[i, j]] = original - eps;
            let down = loss(&layer, &xs);
            layer.kernel[[i, j]] = original;
            assert_relative_eq!(grads.kernel[[i, j]], (up - down) / (2.0 * eps), epsilon = 1e-6);
        }
        for &(i, j) in &[(0, 1), (3, 9)] {
            let original = layer.recurrent[[i, j]];
            layer.recurrent[[i, j]] = original + eps;
            let up = loss(&layer, &xs);
            layer.recurrent[[i, j]] = original - eps;
            let down = loss(&layer, &xs);
            layer.recurrent[[i, j]] = original;
            assert_relative_eq!(grads.recurrent[[i, j]], (up - down) / (2.0 * eps), epsilon = 1e-6);
        }

        let mut shifted = xs.clone();
        shifted[1][[0, 2]] += eps;
        let up = loss(&layer, &shifted);
        shifted[1][[0, 2]] -= 2.0 * eps;
        let down = loss(&layer, &shifted);
        assert_relative_eq!(dxs[1][[0, 2]], (up - down) / (2.0 * eps), epsilon = 1e-6);
    }

    #[test]
    fn dense_backward_matches_finite_differences() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut dense = Dense::new(3, 2, &mut rng);
        let x = Array2::from_shape_fn((4, 3), |(i, j)| (i as f64 - j as f64) * 0.3);
        let dy = Array2::ones((4, 2));
        let mut dk = Array2::zeros((3, 2));
        let mut db = Array1::zeros(2);
        dense.backward(&x, &dy, &mut dk, &mut db);

        let eps = 1e-6;
        let original = dense.kernel[[1, 1]];
        dense.kernel[[1, 1]] = original + eps;
        let up = dense.forward(&x).sum();
        dense.kernel[[1, 1]] = original - eps;
        let down = dense.forward(&x).sum();
        assert_relative_eq!(dk[[1, 1]], (up - down) / (2.0 * eps), epsilon = 1e-6);
        assert_relative_eq!(db[0], 4.0);
    }

    #[test]
    fn dropout_mask_scales_survivors() {
        let mut rng = StdRng::seed_from_u64(9);
        let mask = dropout_mask((50, 40), 0.2, &mut rng);
        assert!(mask.iter().all(|&m| m == 0.0 || (m - 1.25).abs() < 1e-12));
        let dropped = mask.iter().filter(|&&m| m == 0.0).count() as f64 / 2000.0;
        assert!((dropped - 0.2).abs() < 0.05);

        assert!(dropout_mask((3, 3), 0.0, &mut rng).iter().all(|&m| m == 1.0));
    }
}
