//! Line-search minimizers over flat coordinate vectors: steepest descent
//! for the embedding refinement and L-BFGS for the force field.

use std::collections::VecDeque;

use thiserror::Error;

/// A differentiable function of flat `[x0, y0, z0, x1, ...]` coordinates.
pub trait Objective {
    /// Value at `x`; overwrites `grad` with the gradient.
    fn evaluate(&self, x: &[f64], grad: &mut [f64]) -> f64;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MinimizerSettings {
    pub max_iterations: u32,
    /// Stop once the RMS gradient component falls below this.
    pub gradient_tolerance: f64,
    /// Stop once an accepted step lowers the value by less than this
    /// fraction (absolute for values below 1).
    pub energy_tolerance: f64,
    /// Largest move of any single coordinate in one step.
    pub max_step: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MinimizeOutcome {
    pub energy: f64,
    pub iterations: u32,
    pub converged: bool,
}

#[derive(Debug, Clone, PartialEq, Error)]
#[error("non-finite energy or gradient at iteration {iteration}")]
pub struct NonFiniteError {
    pub iteration: u32,
}

const INITIAL_STEP: f64 = 1e-3;
const STEP_GROWTH: f64 = 1.5;
const ARMIJO: f64 = 1e-4;
const MAX_BACKTRACKS: usize = 40;

/// Minimize `objective` in place starting from `x`.
pub fn steepest_descent<O: Objective + ?Sized>(
    objective: &O,
    x: &mut [f64],
    settings: &MinimizerSettings,
) -> Result<MinimizeOutcome, NonFiniteError> {
    let len = x.len();
    let mut grad = vec![0.0; len];
    let mut energy = objective.evaluate(x, &mut grad);
    if !energy.is_finite() || !all_finite(&grad) {
        return Err(NonFiniteError { iteration: 0 });
    }
    if len == 0 {
        return Ok(MinimizeOutcome {
            energy,
            iterations: 0,
            converged: true,
        });
    }

    let mut trial = vec![0.0; len];
    let mut trial_grad = vec![0.0; len];
    let mut alpha = INITIAL_STEP;

    for iteration in 1..=settings.max_iterations {
        let g2: f64 = grad.iter().map(|g| g * g).sum();
        if (g2 / len as f64).sqrt() < settings.gradient_tolerance {
            return Ok(MinimizeOutcome {
                energy,
                iterations: iteration - 1,
                converged: true,
            });
        }
        let g_max = grad.iter().fold(0.0_f64, |m, g| m.max(g.abs()));
        if alpha * g_max > settings.max_step {
            alpha = settings.max_step / g_max;
        }

        let mut accepted = None;
        for _ in 0..MAX_BACKTRACKS {
            for ((t, xi), gi) in trial.iter_mut().zip(x.iter()).zip(&grad) {
                *t = xi - alpha * gi;
            }
            let e = objective.evaluate(&trial, &mut trial_grad);
            if e.is_finite() && e <= energy - ARMIJO * alpha * g2 {
                accepted = Some(e);
                break;
            }
            alpha *= 0.5;
        }
        let Some(new_energy) = accepted else {
            // No descent left along the gradient at machine precision.
            return Ok(MinimizeOutcome {
                energy,
                iterations: iteration,
                converged: false,
            });
        };
        if !all_finite(&trial_grad) {
            return Err(NonFiniteError { iteration });
        }

        x.copy_from_slice(&trial);
        std::mem::swap(&mut grad, &mut trial_grad);
        let drop = energy - new_energy;
        energy = new_energy;
        if drop <= settings.energy_tolerance * energy.abs().max(1.0) {
            return Ok(MinimizeOutcome {
                energy,
                iterations: iteration,
                converged: true,
            });
        }
        alpha *= STEP_GROWTH;
    }

    Ok(MinimizeOutcome {
        energy,
        iterations: settings.max_iterations,
        converged: false,
    })
}

/// Curvature pairs kept by [`lbfgs`].
const MEMORY: usize = 8;

struct Correction {
    s: Vec<f64>,
    y: Vec<f64>,
    rho: f64,
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Two-loop recursion: `direction = -H grad` for the inverse Hessian
/// estimate held in `history`.
fn search_direction(history: &VecDeque<Correction>, grad: &[f64], direction: &mut [f64]) {
    direction.copy_from_slice(grad);
    let mut alphas = Vec::with_capacity(history.len());
    for c in history.iter().rev() {
        let a = c.rho * dot(&c.s, direction);
        for (d, y) in direction.iter_mut().zip(&c.y) {
            *d -= a * y;
        }
        alphas.push(a);
    }
    if let Some(last) = history.back() {
        let gamma = dot(&last.s, &last.y) / dot(&last.y, &last.y);
        direction.iter_mut().for_each(|d| *d *= gamma);
    }
    for (c, a) in history.iter().zip(alphas.iter().rev()) {
        let beta = c.rho * dot(&c.y, direction);
        for (d, s) in direction.iter_mut().zip(&c.s) {
            *d += s * (a - beta);
        }
    }
    direction.iter_mut().for_each(|d| *d = -*d);
}

/// Limited-memory BFGS with a backtracking line search. Stops on the same
/// criteria as [`steepest_descent`]; a direction that fails to descend
/// clears the curvature history and falls back to the gradient.
pub fn lbfgs<O: Objective + ?Sized>(
    objective: &O,
    x: &mut [f64],
    settings: &MinimizerSettings,
) -> Result<MinimizeOutcome, NonFiniteError> {
    let len = x.len();
    let mut grad = vec![0.0; len];
    let mut energy = objective.evaluate(x, &mut grad);
    if !energy.is_finite() || !all_finite(&grad) {
        return Err(NonFiniteError { iteration: 0 });
    }
    if len == 0 {
        return Ok(MinimizeOutcome {
            energy,
            iterations: 0,
            converged: true,
        });
    }

    let mut history: VecDeque<Correction> = VecDeque::with_capacity(MEMORY);
    let mut direction = vec![0.0; len];
    let mut trial = vec![0.0; len];
    let mut trial_grad = vec![0.0; len];

    for iteration in 1..=settings.max_iterations {
        let g2 = dot(&grad, &grad);
        if (g2 / len as f64).sqrt() < settings.gradient_tolerance {
            return Ok(MinimizeOutcome {
                energy,
                iterations: iteration - 1,
                converged: true,
            });
        }

        search_direction(&history, &grad, &mut direction);
        let mut slope = dot(&grad, &direction);
        if slope.is_nan() || slope >= 0.0 {
            history.clear();
            for (d, g) in direction.iter_mut().zip(&grad) {
                *d = -g;
            }
            slope = -g2;
        }
        let d_max = direction.iter().fold(0.0_f64, |m, d| m.max(d.abs()));
        let mut alpha = if d_max > settings.max_step {
            settings.max_step / d_max
        } else {
            1.0
        };

        let mut accepted = None;
        for _ in 0..MAX_BACKTRACKS {
            for ((t, xi), di) in trial.iter_mut().zip(x.iter()).zip(&direction) {
                *t = xi + alpha * di;
            }
            let e = objective.evaluate(&trial, &mut trial_grad);
            if e.is_finite() && e <= energy + ARMIJO * alpha * slope {
                accepted = Some(e);
                break;
            }
            alpha *= 0.5;
        }
        let Some(new_energy) = accepted else {
            if history.is_empty() {
                return Ok(MinimizeOutcome {
                    energy,
                    iterations: iteration,
                    converged: false,
                });
            }
            history.clear();
            continue;
        };
        if !all_finite(&trial_grad) {
            return Err(NonFiniteError { iteration });
        }

        let s: Vec<f64> = trial.iter().zip(x.iter()).map(|(t, xi)| t - xi).collect();
        let y: Vec<f64> = trial_grad.iter().zip(&grad).map(|(a, b)| a - b).collect();
        let sy = dot(&s, &y);
        if sy > 1e-10 {
            if history.len() == MEMORY {
                history.pop_front();
            }
            history.push_back(Correction { s, y, rho: 1.0 / sy });
        }

        x.copy_from_slice(&trial);
        std::mem::swap(&mut grad, &mut trial_grad);
        let drop = energy - new_energy;
        energy = new_energy;
        if drop <= settings.energy_tolerance * energy.abs().max(1.0) {
            return Ok(MinimizeOutcome {
                energy,
                iterations: iteration,
                converged: true,
            });
        }
    }

    Ok(MinimizeOutcome {
        energy,
        iterations: settings.max_iterations,
        converged: false,
    })
}

fn all_finite(values: &[f64]) -> bool {
    values.iter().all(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    struct Bowl {
        center: Vec<f64>,
    }

    impl Objective for Bowl {
        fn evaluate(&self, x: &[f64], grad: &mut [f64]) -> f64 {
            let mut e = 0.0;
            for ((xi, ci), gi) in x.iter().zip(&self.center).zip(grad.iter_mut()) {
                let d = xi - ci;
                e += d * d;
                *gi = 2.0 * d;
            }
            e
        }
    }

    struct Poisoned;

    impl Objective for Poisoned {
        fn evaluate(&self, _x: &[f64], grad: &mut [f64]) -> f64 {
            grad.fill(0.0);
            f64::NAN
        }
    }

    fn settings() -> MinimizerSettings {
        MinimizerSettings {
            max_iterations: 2000,
            gradient_tolerance: 1e-6,
            energy_tolerance: 0.0,
            max_step: 0.5,
        }
    }

    #[test]
    fn finds_the_bottom_of_a_bowl() {
        let bowl = Bowl {
            center: vec![1.0, -2.0, 0.5],
        };
        let mut x = vec![0.0; 3];
        let out = steepest_descent(&bowl, &mut x, &settings()).unwrap();
        assert!(out.converged);
        assert!(out.energy < 1e-9);
        assert_abs_diff_eq!(x[1], -2.0, epsilon = 1e-5);
    }

    #[test]
    fn iteration_cap_is_not_an_error() {
        let bowl = Bowl {
            center: vec![100.0; 6],
        };
        let mut x = vec![0.0; 6];
        let capped = MinimizerSettings {
            max_iterations: 3,
            ..settings()
        };
        let out = steepest_descent(&bowl, &mut x, &capped).unwrap();
        assert!(!out.converged);
        assert_eq!(out.iterations, 3);
        assert!(x[0] > 0.0);
    }

    /// Narrow valley: curvature differs by 400x between the axes.
    struct Valley;

    impl Objective for Valley {
        fn evaluate(&self, x: &[f64], grad: &mut [f64]) -> f64 {
            let (a, b) = (x[0] - 3.0, x[1] + 1.0);
            grad[0] = 2.0 * a;
            grad[1] = 800.0 * b;
            a * a + 400.0 * b * b
        }
    }

    #[test]
    fn lbfgs_finds_the_bottom_of_a_bowl() {
        let bowl = Bowl {
            center: vec![1.0, -2.0, 0.5, 4.0],
        };
        let mut x = vec![0.0; 4];
        let out = lbfgs(&bowl, &mut x, &settings()).unwrap();
        assert!(out.converged);
        assert_abs_diff_eq!(x[3], 4.0, epsilon = 1e-5);
    }

    #[test]
    fn lbfgs_beats_steepest_descent_in_a_valley() {
        let mut a = vec![0.0, 0.0];
        let mut b = vec![0.0, 0.0];
        let quasi_newton = lbfgs(&Valley, &mut a, &settings()).unwrap();
        let gradient = steepest_descent(&Valley, &mut b, &settings()).unwrap();
        assert!(quasi_newton.converged);
        assert!(quasi_newton.iterations < gradient.iterations);
        assert_abs_diff_eq!(a[0], 3.0, epsilon = 1e-4);
        assert_abs_diff_eq!(a[1], -1.0, epsilon = 1e-6);
    }

    #[test]
    fn lbfgs_respects_the_iteration_cap() {
        let bowl = Bowl {
            center: vec![100.0; 6],
        };
        let mut x = vec![0.0; 6];
        let capped = MinimizerSettings {
            max_iterations: 3,
            ..settings()
        };
        let out = lbfgs(&bowl, &mut x, &capped).unwrap();
        assert!(!out.converged);
        assert_eq!(out.iterations, 3);
    }

    #[test]
    fn non_finite_start_is_rejected() {
        let mut x = vec![0.0; 3];
        assert_eq!(lbfgs(&Poisoned, &mut x, &settings()), Err(NonFiniteError { iteration: 0 }));
        let mut x = vec![0.0; 3];
        assert_eq!(
            steepest_descent(&Poisoned, &mut x, &settings()),
            Err(NonFiniteError { iteration: 0 })
        );
    }
}
