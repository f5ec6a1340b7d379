//! Adam optimizer over a fixed set of parameter slots.

use ndarray::{Array, ArrayD, Dimension, IxDyn, Zip};

use crate::config::AdamConfig;

/// Adam with bias correction folded into the step size.
///
/// Each parameter tensor owns a slot; moments for a slot are created on its
/// first update.
#[derive(Debug, Clone)]
pub(crate) struct Adam {
    config: AdamConfig,
    step: i32,
    first_moments: Vec<ArrayD<f64>>,
    second_moments: Vec<ArrayD<f64>>,
}

impl Adam {
    pub fn new(config: AdamConfig) -> Self {
        Self {
            config,
            step: 0,
            first_moments: Vec::new(),
            second_moments: Vec::new(),
        }
    }

    /// Advance the time step; call once per batch before the updates.
    pub fn next_step(&mut self) {
        self.step += 1;
    }

    fn step_size(&self) -> f64 {
        let t = self.step.max(1);
        let c = &self.config;
        c.learning_rate * (1.0 - c.beta2.powi(t)).sqrt() / (1.0 - c.beta1.powi(t))
    }

    pub fn update<D: Dimension>(&mut self, slot: usize, param: &mut Array<f64, D>, grad: &Array<f64, D>) {
        if self.first_moments.len() <= slot {
            self.first_moments.resize_with(slot + 1, || ArrayD::zeros(IxDyn(&[0])));
            self.second_moments.resize_with(slot + 1, || ArrayD::zeros(IxDyn(&[0])));
        }
        if self.first_moments[slot].shape() != grad.shape() {
            self.first_moments[slot] = ArrayD::zeros(grad.shape());
            self.second_moments[slot] = ArrayD::zeros(grad.shape());
        }

        let lr = self.step_size();
        let AdamConfig {
            beta1,
            beta2,
            epsilon,
            ..
        } = self.config;

        Zip::from(param.view_mut().into_dyn())
            .and(grad.view().into_dyn())
            .and(&mut self.first_moments[slot])
            .and(&mut self.second_moments[slot])
            .for_each(|p, &g, m, v| {
                *m = beta1 * *m + (1.0 - beta1) * g;
                *v = beta2 * *v + (1.0 - beta2) * g * g;
                *p -= lr * *m / (v.sqrt() + epsilon);
            });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::{array, Array1};

    #[test]
    fn first_step_moves_by_learning_rate() {
        let mut adam = Adam::new(AdamConfig::default());
        let mut w = array![[1.0, -1.0]];
        adam.next_step();
        adam.update(0, &mut w, &array![[0.5, -2.0]]);

        // After bias correction the first step is lr * sign(g).
        assert_relative_eq!(w[[0, 0]], 1.0 - 0.001, epsilon = 1e-6);
        assert_relative_eq!(w[[0, 1]], -1.0 + 0.001, epsilon = 1e-6);
    }

    #[test]
    fn minimises_quadratic() {
        let config = AdamConfig {
            learning_rate: 0.05,
            ..Default::default()
        };
        let mut adam = Adam::new(config);
        let mut x = Array1::from(vec![3.0, -2.0]);
        for _ in 0..2000 {
            let grad = x.mapv(|v| 2.0 * v);
            adam.next_step();
            adam.update(0, &mut x, &grad);
        }
        assert!(x.iter().all(|v| v.abs() < 0.1));
    }

    #[test]
    fn slots_are_independent() {
        let mut adam = Adam::new(AdamConfig::default());
        let mut a = Array1::from(vec![0.0]);
        let mut b = array![[0.0, 0.0]];
        adam.next_step();
        adam.update(1, &mut b, &array![[1.0, 1.0]]);
        adam.update(0, &mut a, &Array1::from(vec![-1.0]));
        assert!(a[0] > 0.0);
        assert!(b.iter().all(|&v| v < 0.0));
    }
}
