use log::debug;
use ndarray::Array1;
use std::collections::VecDeque;

/// Result of one minimization run. The parameters are the best iterate
/// found, whether or not the run converged.
#[derive(Debug, Clone)]
pub struct Solution {
    pub params: Array1<f64>,
    pub objective: f64,
    pub iterations: usize,
    pub converged: bool,
}

/// Limited-memory quasi-Newton minimizer.
///
/// Descent directions come from the L-BFGS two-loop recursion over a
/// short history of curvature pairs; step lengths from an Armijo
/// backtracking line search. The caller supplies the objective value
/// and its gradient in one evaluation.
#[derive(Debug, Clone)]
pub struct LbfgsSolver {
    /// Curvature pairs kept for the inverse-Hessian estimate.
    pub memory: usize,

    pub max_iterations: usize,

    /// Convergence threshold on the gradient's infinity norm.
    pub gradient_tolerance: f64,
}

impl Default for LbfgsSolver {
    fn default() -> Self {
        Self {
            memory: 8,
            max_iterations: 200,
            gradient_tolerance: 1e-8,
        }
    }
}

const ARMIJO_C1: f64 = 1e-4;
const MAX_BACKTRACKS: usize = 40;

impl LbfgsSolver {
    pub fn minimize<F>(&self, x0: Array1<f64>, objective: F) -> Solution
    where
        F: Fn(&Array1<f64>) -> (f64, Array1<f64>),
    {
        let mut x = x0;
        let (mut fx, mut grad) = objective(&x);
        let mut history: VecDeque<CurvaturePair> = VecDeque::with_capacity(self.memory);

        for iteration in 0..self.max_iterations {
            let grad_norm = grad.iter().fold(0.0_f64, |acc, g| acc.max(g.abs()));
            if grad_norm <= self.gradient_tolerance {
                debug!("converged after {iteration} iterations (objective {fx:.6e})");
                return Solution {
                    params: x,
                    objective: fx,
                    iterations: iteration,
                    converged: true,
                };
            }

            let mut direction = descent_direction(&grad, &history);
            let mut slope = direction.dot(&grad);
            if slope >= 0.0 {
                // The curvature history produced an ascent direction;
                // fall back to steepest descent.
                direction = -grad.clone();
                slope = -grad.dot(&grad);
            }

            let mut step = if history.is_empty() {
                (1.0 / grad_norm).min(1.0)
            } else {
                1.0
            };

            let mut accepted = None;
            for _ in 0..MAX_BACKTRACKS {
                let candidate = &x + &direction.mapv(|d| d * step);
                let (f_candidate, g_candidate) = objective(&candidate);
                if f_candidate <= fx + ARMIJO_C1 * step * slope {
                    accepted = Some((candidate, f_candidate, g_candidate));
                    break;
                }
                step *= 0.5;
            }

            let Some((next, f_next, g_next)) = accepted else {
                // No decrease along the search direction; the current
                // iterate is as good as this run gets.
                debug!("line search stalled after {iteration} iterations (objective {fx:.6e})");
                return Solution {
                    params: x,
                    objective: fx,
                    iterations: iteration,
                    converged: false,
                };
            };

            let s = &next - &x;
            let y = &g_next - &grad;
            let sy = s.dot(&y);
            if sy > 1e-12 {
                if history.len() == self.memory {
                    history.pop_front();
                }
                history.push_back(CurvaturePair {
                    rho: 1.0 / sy,
                    s,
                    y,
                });
            }

            x = next;
            fx = f_next;
            grad = g_next;
        }

        debug!(
            "stopping after {} iterations without convergence (objective {fx:.6e})",
            self.max_iterations
        );
        Solution {
            params: x,
            objective: fx,
            iterations: self.max_iterations,
            converged: false,
        }
    }
}

struct CurvaturePair {
    s: Array1<f64>,
    y: Array1<f64>,
    rho: f64,
}

/// L-BFGS two-loop recursion: applies the inverse-Hessian estimate
/// implied by the curvature history to the current gradient.
fn descent_direction(grad: &Array1<f64>, history: &VecDeque<CurvaturePair>) -> Array1<f64> {
    let mut q = grad.clone();

    let mut alphas = Vec::with_capacity(history.len());
    for pair in history.iter().rev() {
        let alpha = pair.rho * pair.s.dot(&q);
        q.scaled_add(-alpha, &pair.y);
        alphas.push(alpha);
    }

    if let Some(pair) = history.back() {
        let gamma = pair.s.dot(&pair.y) / pair.y.dot(&pair.y);
        q.mapv_inplace(|v| v * gamma);
    }

    for (pair, &alpha) in history.iter().zip(alphas.iter().rev()) {
        let beta = pair.rho * pair.y.dot(&q);
        q.scaled_add(alpha - beta, &pair.s);
    }

    -q
}
