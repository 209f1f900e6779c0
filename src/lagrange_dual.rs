//! [`LagrangeDualCore`]: an optional Lagrangian-dual warm start that pins
//! every variable to a bound each iteration and ascends the multipliers by
//! projected subgradient.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use crate::callback::{IterationCallback, IterationContext};
use crate::incumbent::IncumbentHolder;
use crate::model::{Model, Sense, EPSILON};
use crate::options::LagrangeDualOptions;
use crate::result::TerminationStatus;
use crate::score::SolutionScore;

/// What the Lagrangian-dual phase found: a primal point to seed the next
/// phase with, and a dual bound candidate.
#[derive(Debug, Clone)]
pub struct LagrangeDualOutcome {
    /// The variable assignment with the best (highest) Lagrangian value
    /// found, in the model's original units.
    pub best_primal_values: Vec<i64>,
    /// That assignment's raw objective value.
    pub best_primal_objective: f64,
    /// `sign * best_lagrangian`: a valid bound on the optimum in the
    /// model's original (un-sign-adjusted) objective units.
    pub dual_bound: f64,
    /// Iterations actually run.
    pub iterations: u64,
    /// Why the phase stopped.
    pub termination_status: TerminationStatus,
}

/// Stateless entry point: all per-run state (multipliers, the past-value
/// queue, the step size) is local to [`LagrangeDualCore::run`].
pub struct LagrangeDualCore;

impl LagrangeDualCore {
    /// Runs projected subgradient ascent to convergence or a resource
    /// limit, leaving `model` assigned to the best primal point found.
    pub fn run(
        model: &mut Model,
        options: &LagrangeDualOptions,
        target_objective_value: Option<f64>,
        callback: &IterationCallback,
        interrupt: Option<&dyn Fn() -> bool>,
    ) -> LagrangeDualOutcome {
        let start_time = Instant::now();
        let sense = model.sense();
        let sign = sense.sign();
        let constraint_count = model.constraints().len();
        let mut multipliers = vec![0.0_f64; constraint_count];
        let mut step_size = 1.0 / (model.variables().len().max(1) as f64);

        let mut queue: VecDeque<f64> = VecDeque::with_capacity(options.queue_size);
        let mut best_lagrangian = f64::NEG_INFINITY;
        let mut best_primal_values = model.values();
        let mut best_primal_objective = model.reported_objective_value();

        let mut iteration: u64 = 0;
        let status;
        loop {
            if iteration >= options.iteration_max {
                status = TerminationStatus::IterationOver;
                break;
            }
            if start_time.elapsed() >= Duration::from_secs_f64(options.time_max) {
                status = TerminationStatus::TimeOver;
                break;
            }
            if let Some(interrupt) = interrupt {
                if interrupt() {
                    status = TerminationStatus::EarlyStop;
                    break;
                }
            }

            pin_variables_to_lagrangian_gradient(model, &multipliers, sign);

            let signed_objective = model.objective_value();
            let raw_objective = model.reported_objective_value();
            let lagrangian_value =
                signed_objective + model.constraints().iter().zip(multipliers.iter()).map(|(c, &lambda)| lambda * c.value()).sum::<f64>();

            if lagrangian_value > best_lagrangian {
                best_lagrangian = lagrangian_value;
                best_primal_values = model.values();
                best_primal_objective = raw_objective;
            }

            if let Some(target) = target_objective_value {
                if model.is_feasible() && sign * (raw_objective - target) <= EPSILON {
                    status = TerminationStatus::ReachTarget;
                    iteration += 1;
                    break;
                }
            }

            if queue.len() >= options.queue_size {
                let average: f64 = queue.iter().sum::<f64>() / queue.len() as f64;
                if average.abs() > EPSILON && (lagrangian_value - average).abs() / average.abs() < options.tolerance {
                    status = TerminationStatus::Optimal;
                    iteration += 1;
                    break;
                }
            }

            for (index, constraint) in model.constraints().iter().enumerate() {
                multipliers[index] += step_size * constraint.value();
                multipliers[index] = match constraint.sense() {
                    Sense::LessEqual => multipliers[index].max(0.0),
                    Sense::GreaterEqual => multipliers[index].min(0.0),
                    Sense::Equal => multipliers[index],
                };
            }

            if queue.len() >= options.queue_size {
                queue.pop_front();
            }
            let average_before_push: f64 = if queue.is_empty() { lagrangian_value } else { queue.iter().sum::<f64>() / queue.len() as f64 };
            let max_before_push: f64 = queue.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
            if lagrangian_value > average_before_push {
                step_size *= options.step_size_extend_rate;
            } else if !max_before_push.is_infinite() && lagrangian_value < max_before_push {
                step_size *= options.step_size_reduce_rate;
            }
            queue.push_back(lagrangian_value);

            if options.queue_size > 0 {
                let score = SolutionScore::from_model(model);
                callback(&IterationContext {
                    phase: "lagrange_dual",
                    iteration,
                    score: &score,
                    sense,
                    previous_score: None,
                    start_time: Some(start_time),
                    time_max: Some(Duration::from_secs_f64(options.time_max)),
                    iteration_max: Some(options.iteration_max),
                });
            }

            iteration += 1;
        }

        for (variable, &target) in model.variables_mut().iter_mut().zip(best_primal_values.iter()) {
            if !variable.is_fixed() && variable.value() != target {
                variable.set_value(target);
            }
        }
        model.recompute_caches_from_scratch();

        LagrangeDualOutcome {
            best_primal_values,
            best_primal_objective,
            dual_bound: sign * best_lagrangian,
            iterations: iteration,
            termination_status: status,
        }
    }
}

/// One gradient-pinning pass: every non-fixed variable goes to whichever
/// bound minimizes its marginal contribution to the (sign-adjusted)
/// Lagrangian `c_j = sign·objective_sensitivity_j + Σ_i λ_i·sensitivity_{i,j}`.
fn pin_variables_to_lagrangian_gradient(model: &mut Model, multipliers: &[f64], sign: f64) {
    let targets: Vec<i64> = model
        .variables()
        .iter()
        .map(|variable| {
            if variable.is_fixed() {
                return variable.value();
            }
            let marginal = sign * variable.objective_sensitivity()
                + variable
                    .constraint_sensitivities()
                    .iter()
                    .map(|&(constraint_id, sensitivity)| multipliers[constraint_id.index()] * sensitivity)
                    .sum::<f64>();
            if marginal > 0.0 {
                variable.lower_bound()
            } else {
                variable.upper_bound()
            }
        })
        .collect();

    for (variable, target) in model.variables_mut().iter_mut().zip(targets.into_iter()) {
        if !variable.is_fixed() && variable.value() != target {
            variable.set_value(target);
        }
    }
    model.recompute_caches_from_scratch();
}

/// Offers a [`LagrangeDualOutcome`]'s dual bound to an incumbent holder.
pub fn offer_dual_bound(incumbent: &mut IncumbentHolder, outcome: &LagrangeDualOutcome, model: &Model) {
    incumbent.offer_dual_bound(outcome.dual_bound, model.sense());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::callback::silent_callback;
    use crate::model::{ConstraintTag, OptimizationSense, VariableKind};

    fn tiny_knapsack() -> Model {
        let mut model = Model::new(OptimizationSense::Maximize);
        let x0 = model.add_variable(VariableKind::Binary, 0, 0, 1, 5.0);
        let x1 = model.add_variable(VariableKind::Binary, 0, 0, 1, 4.0);
        model.add_constraint(Sense::LessEqual, vec![(x0, 1.0), (x1, 1.0)], -1.0, ConstraintTag::Knapsack);
        model
    }

    #[test]
    fn runs_to_iteration_limit_and_leaves_model_at_best_primal() {
        let mut model = tiny_knapsack();
        let options = LagrangeDualOptions {
            iteration_max: 25,
            queue_size: 5,
            ..LagrangeDualOptions::default()
        };
        let callback = silent_callback();
        let outcome = LagrangeDualCore::run(&mut model, &options, None, &callback, None);
        assert_eq!(outcome.iterations, 25);
        assert_eq!(outcome.termination_status, TerminationStatus::IterationOver);
        assert_eq!(model.values(), outcome.best_primal_values);
    }

    #[test]
    fn dual_bound_is_finite_after_a_run() {
        let mut model = tiny_knapsack();
        let options = LagrangeDualOptions {
            iteration_max: 10,
            queue_size: 3,
            ..LagrangeDualOptions::default()
        };
        let callback = silent_callback();
        let outcome = LagrangeDualCore::run(&mut model, &options, None, &callback, None);
        assert!(outcome.dual_bound.is_finite());
    }
}
