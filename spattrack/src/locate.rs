use crate::solver::{LbfgsSolver, Solution};
use log::debug;
use ndarray::{Array1, ArrayView2};

/// Source location estimate for one analysis window.
#[derive(Debug, Clone)]
pub struct SourceEstimate {
    /// Fitted decay parameter per distance-map column.
    pub params: Array1<f64>,

    /// Final sum of squared residuals.
    pub objective: f64,

    pub converged: bool,
}

/// Fits the amplitude-decay model against observed reference-channel
/// amplitudes.
///
/// The predicted amplitude at distance-map row `j` is
/// `Σ_s exp(−β_s · d_{j,s})` over the map's station columns, and the
/// objective is the sum of squared residuals against `observed`,
/// paired index-wise over the shorter of the two lengths. The fit
/// starts from the zero vector; the best iterate is returned whether
/// or not the solver converged, and the flag says which.
pub fn locate_source(observed: &[f64], distance_map: ArrayView2<'_, f64>) -> SourceEstimate {
    let paired = observed.len().min(distance_map.nrows());
    let stations = distance_map.ncols();

    let Solution {
        params,
        objective,
        iterations,
        converged,
    } = LbfgsSolver::default().minimize(Array1::zeros(stations), |beta: &Array1<f64>| {
        let mut value = 0.0;
        let mut grad = Array1::zeros(stations);
        let mut decays = vec![0.0; stations];
        for j in 0..paired {
            let mut predicted = 0.0;
            for s in 0..stations {
                let decay = (-beta[s] * distance_map[[j, s]]).exp();
                decays[s] = decay;
                predicted += decay;
            }
            let residual = observed[j] - predicted;
            value += residual * residual;
            for s in 0..stations {
                grad[s] += 2.0 * residual * distance_map[[j, s]] * decays[s];
            }
        }
        (value, grad)
    });

    debug!("source fit: objective {objective:.6e} after {iterations} iterations");

    SourceEstimate {
        params,
        objective,
        converged,
    }
}
