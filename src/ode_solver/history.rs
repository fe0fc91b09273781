use std::collections::VecDeque;

use crate::scalar::Scalar;
use crate::vector::Vector;

/// The fixed-capacity BDF history ring (§3): up to `kmax = 6` prior
/// accepted states with their timestamps, most recent first. Cleared at
/// solve start; one slot appended per accepted step; oldest discarded once
/// the ring exceeds the current order.
pub struct HistoryRing<T: Scalar, V: Vector<T = T>> {
    times: VecDeque<T>,
    states: VecDeque<V>,
    kmax: usize,
}

impl<T: Scalar, V: Vector<T = T>> HistoryRing<T, V> {
    pub fn new(kmax: usize) -> Self {
        Self {
            times: VecDeque::with_capacity(kmax + 1),
            states: VecDeque::with_capacity(kmax + 1),
            kmax,
        }
    }

    pub fn clear(&mut self) {
        self.times.clear();
        self.states.clear();
    }

    pub fn push(&mut self, t: T, x: V) {
        self.times.push_front(t);
        self.states.push_front(x);
        while self.times.len() > self.kmax {
            self.times.pop_back();
            self.states.pop_back();
        }
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    pub fn latest_time(&self) -> Option<T> {
        self.times.front().copied()
    }

    pub fn latest_state(&self) -> Option<&V> {
        self.states.front()
    }

    /// The state `age` slots back from the most recent (`age = 0` is the
    /// latest accepted state), used to assemble `psi` from the BDF
    /// coefficients without exposing the deque directly.
    pub fn nth_state(&self, age: usize) -> Option<&V> {
        self.states.get(age)
    }

    /// BDF coefficients `{alpha_0, .., alpha_order}` at the new point
    /// `t_next` for the requested `order` (capped at however much history
    /// is actually available), via the derivative of the Lagrange
    /// interpolant through `t_next` and the last `order` history points
    /// (§9 "variable-step BDF coefficient derivation"). `alpha_0` weights
    /// the unknown `x_{n+1}`; `alpha_i` weights `x_{n+1-i}`.
    pub fn bdf_alpha(&self, dt: T, t_next: T, order: usize) -> Vec<T> {
        let order = order.min(self.times.len());
        let mut nodes = Vec::with_capacity(order + 1);
        nodes.push(t_next);
        nodes.extend(self.times.iter().take(order).copied());
        let weights = first_derivative_weights(t_next, &nodes);
        weights.into_iter().map(|w| w * dt).collect()
    }

    /// Extrapolates the interpolating polynomial through the last `order`
    /// history points to `t_next`, used as the Newton predictor (§4.6 step
    /// 3). Falls back to the latest state when no history exists yet
    /// (the very first step).
    pub fn predict(&self, t_next: T, order: usize) -> V {
        let order = order.min(self.times.len());
        if order == 0 {
            return self
                .states
                .front()
                .cloned()
                .expect("predict called before any state was pushed");
        }
        let nodes: Vec<T> = self.times.iter().take(order).copied().collect();
        let n = self.states.front().unwrap().len();
        let mut out = V::zeros(n);
        for i in 0..n {
            let values: Vec<T> = self.states.iter().take(order).map(|s| s[i]).collect();
            out[i] = lagrange_eval(t_next, &nodes, &values);
        }
        out
    }
}

/// Fornberg's algorithm for first-derivative finite-difference weights at
/// `z` over the stencil `nodes` (`z` itself may be, and for BDF always is,
/// one of the nodes). Exact for any polynomial of degree `<= nodes.len() -
/// 1`, which is what §8 invariant 4 checks.
fn first_derivative_weights<T: Scalar>(z: T, nodes: &[T]) -> Vec<T> {
    let n = nodes.len() - 1;
    let mut weights = vec![vec![T::zero(); 2]; n + 1];
    weights[0][0] = T::one();

    let mut c1 = T::one();
    let mut c4 = nodes[0] - z;
    for i in 1..=n {
        let mn = 1usize.min(i);
        let mut c2 = T::one();
        let c5 = c4;
        c4 = nodes[i] - z;
        for j in 0..i {
            let c3 = nodes[i] - nodes[j];
            c2 = c2 * c3;
            if j == i - 1 {
                for k in (1..=mn).rev() {
                    let kt = T::from_f64(k as f64).unwrap();
                    weights[i][k] = c1 * (kt * weights[i - 1][k - 1] - c5 * weights[i - 1][k]) / c2;
                }
                weights[i][0] = -c1 * c5 * weights[i - 1][0] / c2;
            }
            for k in (1..=mn).rev() {
                let kt = T::from_f64(k as f64).unwrap();
                weights[j][k] = (c4 * weights[j][k] - kt * weights[j][k - 1]) / c3;
            }
            weights[j][0] = c4 * weights[j][0] / c3;
        }
        c1 = c2;
    }
    weights.into_iter().map(|w| w[1]).collect()
}

/// Value of the degree-`<=nodes.len()-1` interpolating polynomial through
/// `(nodes[i], values[i])` at `z`, by direct Lagrange evaluation (the
/// stencils here are never long enough — `kmax = 6` — to need a more
/// numerically careful scheme).
fn lagrange_eval<T: Scalar>(z: T, nodes: &[T], values: &[T]) -> T {
    let mut acc = T::zero();
    for i in 0..nodes.len() {
        let mut term = values[i];
        for j in 0..nodes.len() {
            if i != j {
                term = term * (z - nodes[j]) / (nodes[i] - nodes[j]);
            }
        }
        acc = acc + term;
    }
    acc
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::DVector;
    use proptest::prelude::*;

    #[test]
    fn bdf1_coefficients_match_backward_euler() {
        let mut history: HistoryRing<f64, DVector<f64>> = HistoryRing::new(6);
        history.push(0.0, DVector::from_vec(vec![1.0]));
        let dt = 0.1;
        let alpha = history.bdf_alpha(dt, dt, 1);
        assert_eq!(alpha.len(), 2);
        assert!((alpha[0] - 1.0).abs() < 1e-12);
        assert!((alpha[1] + 1.0).abs() < 1e-12);
    }

    #[test]
    fn derivative_weights_are_exact_for_linear_polynomial() {
        // x(t) = 2t + 3, x'(t) = 2 everywhere; any stencil must reproduce that.
        let nodes = vec![1.0, 0.6, 0.1];
        let weights = first_derivative_weights(1.0, &nodes);
        let values: Vec<f64> = nodes.iter().map(|&t| 2.0 * t + 3.0).collect();
        let approx: f64 = weights.iter().zip(values.iter()).map(|(w, v)| w * v).sum();
        assert!((approx - 2.0).abs() < 1e-10);
    }

    #[test]
    fn predict_extrapolates_constant_history_exactly() {
        let mut history: HistoryRing<f64, DVector<f64>> = HistoryRing::new(6);
        history.push(0.2, DVector::from_vec(vec![5.0]));
        history.push(0.1, DVector::from_vec(vec![5.0]));
        history.push(0.0, DVector::from_vec(vec![5.0]));
        let x = history.predict(0.3, 3);
        assert!((x[0] - 5.0).abs() < 1e-10);
    }

    proptest! {
        /// Invariant 4 (§8): the derivative weights at order `k` reproduce
        /// the exact derivative of any polynomial of degree `<= k`, for
        /// randomized stencils and coefficients.
        #[test]
        fn derivative_weights_are_exact_for_any_degree_k_polynomial(
            order in 1usize..=5,
            step_sizes in prop::collection::vec(0.05f64..1.0, 5),
            coeffs in prop::collection::vec(-5.0f64..5.0, 6),
        ) {
            let z = 0.0f64;
            let mut nodes = vec![z];
            let mut t = z;
            for i in 0..order {
                t -= step_sizes[i];
                nodes.push(t);
            }
            let coeffs = &coeffs[..=order];

            let poly = |x: f64| coeffs.iter().enumerate().map(|(j, c)| c * x.powi(j as i32)).sum::<f64>();
            let poly_deriv = |x: f64| {
                coeffs.iter().enumerate().skip(1).map(|(j, c)| (j as f64) * c * x.powi(j as i32 - 1)).sum::<f64>()
            };

            let weights = first_derivative_weights(z, &nodes);
            let values: Vec<f64> = nodes.iter().map(|&n| poly(n)).collect();
            let approx: f64 = weights.iter().zip(values.iter()).map(|(w, v)| w * v).sum();

            prop_assert!((approx - poly_deriv(z)).abs() < 1e-6);
        }
    }
}
