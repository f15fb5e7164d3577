use super::engine::run_projection;
use super::types::{Inputs, Projection};

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum BreakEvenVariable {
    Valuation,
    SoldValuePerShare,
    ExitProbability,
}

#[derive(Debug, Clone, Copy)]
pub struct BreakEvenConfig {
    pub variable: BreakEvenVariable,
    pub search_min: f64,
    pub search_max: f64,
    pub tolerance: f64,
    pub max_iterations: u32,
}

#[derive(Debug, Clone, Copy)]
pub struct BreakEvenIteration {
    pub iteration: u32,
    pub lower_bound: f64,
    pub upper_bound: f64,
    pub candidate_value: f64,
    pub compensation_difference: f64,
}

#[derive(Debug, Clone)]
pub struct BreakEvenResult {
    pub variable: BreakEvenVariable,
    pub search_min: f64,
    pub search_max: f64,
    pub tolerance: f64,
    pub max_iterations: u32,
    pub solved_value: Option<f64>,
    pub solved_projection: Option<Projection>,
    pub iterations: Vec<BreakEvenIteration>,
    pub converged: bool,
    pub feasible: bool,
    pub message: String,
}

/// Searches for the value of one input at which the equity-bearing role's
/// total yearly compensation matches the standard role's. Bisection over the
/// compensation difference; the bounds must bracket a sign change, otherwise
/// the result is reported infeasible.
pub fn solve_break_even(
    inputs: &Inputs,
    config: BreakEvenConfig,
) -> Result<BreakEvenResult, String> {
    validate_config(config)?;

    let low_diff = difference_at(inputs, config.variable, config.search_min);
    let high_diff = difference_at(inputs, config.variable, config.search_max);

    let mut iterations = Vec::with_capacity(config.max_iterations as usize);
    let mut solved_value = None;
    let mut converged = false;
    let feasible;
    let message;

    if low_diff * high_diff > 0.0 {
        feasible = false;
        message =
            "Compensation difference has the same sign at both search bounds; no break-even within range."
                .to_string();
    } else {
        let rising = low_diff <= high_diff;
        let mut lo = config.search_min;
        let mut hi = config.search_max;
        let mut it = 0;
        while it < config.max_iterations {
            it += 1;
            let mid = (lo + hi) * 0.5;
            let diff = difference_at(inputs, config.variable, mid);
            iterations.push(BreakEvenIteration {
                iteration: it,
                lower_bound: lo,
                upper_bound: hi,
                candidate_value: mid,
                compensation_difference: diff,
            });

            let crossed = if rising { diff >= 0.0 } else { diff <= 0.0 };
            if crossed {
                hi = mid;
            } else {
                lo = mid;
            }

            if (hi - lo).abs() <= config.tolerance {
                converged = true;
                solved_value = Some((lo + hi) * 0.5);
                break;
            }
        }
        if solved_value.is_none() {
            solved_value = Some((lo + hi) * 0.5);
        }
        feasible = true;
        message = if converged {
            "Solved break-even value.".to_string()
        } else {
            "Reached max iterations before tolerance was met; returning best estimate.".to_string()
        };
    }

    let solved_projection = solved_value.map(|value| {
        let mut solved_inputs = inputs.clone();
        apply_variable(&mut solved_inputs, config.variable, value);
        run_projection(&solved_inputs)
    });

    Ok(BreakEvenResult {
        variable: config.variable,
        search_min: config.search_min,
        search_max: config.search_max,
        tolerance: config.tolerance,
        max_iterations: config.max_iterations,
        solved_value,
        solved_projection,
        iterations,
        converged,
        feasible,
        message,
    })
}

fn difference_at(inputs: &Inputs, variable: BreakEvenVariable, value: f64) -> f64 {
    let mut probe = inputs.clone();
    apply_variable(&mut probe, variable, value);
    run_projection(&probe).compensation_difference
}

fn apply_variable(inputs: &mut Inputs, variable: BreakEvenVariable, value: f64) {
    match variable {
        BreakEvenVariable::Valuation => inputs.valuation = value.max(0.0),
        BreakEvenVariable::SoldValuePerShare => inputs.sold_value_per_share = value.max(0.0),
        BreakEvenVariable::ExitProbability => inputs.exit_probability = value.clamp(0.0, 1.0),
    }
}

fn validate_config(config: BreakEvenConfig) -> Result<(), String> {
    if !config.search_min.is_finite() || !config.search_max.is_finite() {
        return Err("search bounds must be finite".to_string());
    }
    if config.search_max <= config.search_min {
        return Err("search_max must be greater than search_min".to_string());
    }
    if !config.tolerance.is_finite() || config.tolerance <= 0.0 {
        return Err("tolerance must be > 0".to_string());
    }
    if config.max_iterations == 0 {
        return Err("max_iterations must be > 0".to_string());
    }
    Ok(())
}
