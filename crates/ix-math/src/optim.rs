//! First-order optimiser state for stochastic objectives.

use serde::{Deserialize, Serialize};

/// Adam optimiser over a fixed-length parameter vector (minimisation).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Adam {
    pub learning_rate: f64,
    pub beta1: f64,
    pub beta2: f64,
    pub epsilon: f64,
    m: Vec<f64>,
    v: Vec<f64>,
    t: u64,
}

impl Adam {
    pub fn new(dim: usize, learning_rate: f64) -> Self {
        Self {
            learning_rate,
            beta1: 0.9,
            beta2: 0.999,
            epsilon: 1e-8,
            m: vec![0.0; dim],
            v: vec![0.0; dim],
            t: 0,
        }
    }

    /// Number of steps taken so far.
    pub fn steps(&self) -> u64 {
        self.t
    }

    /// Move `params` against `grads`.
    ///
    /// Both slices must have the dimension the optimiser was created with;
    /// extra entries are ignored.
    pub fn step(&mut self, params: &mut [f64], grads: &[f64]) {
        self.t += 1;
        let t = self.t.min(i32::MAX as u64) as i32;
        let bias_correction1 = 1.0 - self.beta1.powi(t);
        let bias_correction2 = 1.0 - self.beta2.powi(t);
        let step_size = self.learning_rate * bias_correction2.sqrt() / bias_correction1;

        for (i, (p, g)) in params.iter_mut().zip(grads).enumerate().take(self.m.len()) {
            let m = &mut self.m[i];
            let v = &mut self.v[i];
            *m = self.beta1 * *m + (1.0 - self.beta1) * g;
            *v = self.beta2 * *v + (1.0 - self.beta2) * g * g;
            *p -= step_size * *m / (v.sqrt() + self.epsilon);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimises_a_quadratic() {
        // f(x, y) = (x - 3)^2 + 2 (y + 1)^2
        let mut params = vec![0.0, 0.0];
        let mut adam = Adam::new(2, 0.1);
        for _ in 0..2_000 {
            let grads = [2.0 * (params[0] - 3.0), 4.0 * (params[1] + 1.0)];
            adam.step(&mut params, &grads);
        }
        assert!((params[0] - 3.0).abs() < 2e-2, "x={}", params[0]);
        assert!((params[1] + 1.0).abs() < 2e-2, "y={}", params[1]);
        assert_eq!(adam.steps(), 2_000);
    }

    #[test]
    fn first_step_moves_by_learning_rate() {
        let mut params = vec![1.0];
        let mut adam = Adam::new(1, 0.05);
        adam.step(&mut params, &[10.0]);
        assert!((params[0] - 0.95).abs() < 1e-6);
    }

    #[test]
    fn zero_gradient_leaves_params() {
        let mut params = vec![0.5, -0.5];
        let mut adam = Adam::new(2, 0.05);
        adam.step(&mut params, &[0.0, 0.0]);
        assert_eq!(params, vec![0.5, -0.5]);
    }
}
