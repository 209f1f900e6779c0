//! [`Solver`]: the orchestrator that sequences the phases an
//! `Options` record enables and returns a [`SolverResult`]. A fixed
//! pipeline over several phase cores rather than one fixed improve-loop.

use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::archive::SolutionArchive;
use crate::callback::{default_callback, IterationCallback};
use crate::error::{Result, SolverError};
use crate::incumbent::IncumbentHolder;
use crate::lagrange_dual::LagrangeDualCore;
use crate::local_search::LocalSearchCore;
use crate::memory::Memory;
use crate::model::Model;
use crate::moves::Move;
use crate::neighborhood::Neighborhood;
use crate::options::Options;
use crate::result::{PhaseStats, SolverResult, TerminationStatus};
use crate::score::SolutionScore;
use crate::tabu_search::{TabuSearchController, TabuSearchCore};

/// Runs the configured phase pipeline against a caller-supplied model and
/// neighborhood.
pub struct Solver {
    options: Options,
    callback: IterationCallback,
}

impl Solver {
    /// Builds a solver with the default logging callback
    /// ([`default_callback`] at `options.output.verbose`).
    pub fn new(options: Options) -> Result<Self> {
        validate_options(&options)?;
        let callback = default_callback(options.output.verbose);
        Ok(Solver { options, callback })
    }

    /// Overrides the iteration callback (e.g. with [`crate::callback::silent_callback`]
    /// or a caller's own progress reporter).
    pub fn with_callback(mut self, callback: IterationCallback) -> Self {
        self.callback = callback;
        self
    }

    /// Runs the pipeline to completion, mutating `model` in place and
    /// returning the final result. `neighborhood` supplies move enumeration;
    /// this crate never constructs one on its own.
    pub fn solve(&self, model: &mut Model, neighborhood: &mut Neighborhood) -> SolverResult {
        self.solve_with_interrupt(model, neighborhood, None)
    }

    /// As [`Solver::solve`], but polls `interrupt` once per outer iteration
    /// and once per inner iteration, for cooperative cancellation.
    pub fn solve_with_interrupt(
        &self,
        model: &mut Model,
        neighborhood: &mut Neighborhood,
        interrupt: Option<&dyn Fn() -> bool>,
    ) -> SolverResult {
        let overall_start = Instant::now();
        let overall_time_max = Duration::from_secs_f64(self.options.general.time_max);
        let target = self.options.general.target_objective_value;

        model.set_initial_penalty_coefficient(self.options.penalty.initial_penalty_coefficient);
        neighborhood.update_structure(model);

        let mut rng = StdRng::seed_from_u64(self.options.general.seed);
        let mut incumbent = IncumbentHolder::new();
        let mut archive = SolutionArchive::new(if self.options.output.is_enabled_store_feasible_solutions {
            self.options.output.feasible_solutions_capacity
        } else {
            0
        });
        incumbent.try_update(model, SolutionScore::from_model(model));
        archive_if_feasible(&mut archive, &incumbent);

        let mut phases: Vec<PhaseStats> = Vec::new();
        let mut overall_status = TerminationStatus::NoMove;

        if self.options.lagrange_dual.is_enabled {
            let phase_start = Instant::now();
            let outcome = LagrangeDualCore::run(model, &self.options.lagrange_dual, target, &self.callback, interrupt);
            incumbent.try_update(model, SolutionScore::from_model(model));
            crate::lagrange_dual::offer_dual_bound(&mut incumbent, &outcome, model);
            archive_if_feasible(&mut archive, &incumbent);
            overall_status = outcome.termination_status;
            phases.push(PhaseStats {
                phase: "lagrange_dual".to_string(),
                iterations: outcome.iterations,
                elapsed_seconds: phase_start.elapsed().as_secs_f64(),
                termination_status: outcome.termination_status,
                objective_value: model.reported_objective_value(),
                is_feasible: model.is_feasible(),
            });
        }

        if self.options.local_search.is_enabled && remaining(overall_start, overall_time_max) > Duration::ZERO {
            let phase_start = Instant::now();
            let outcome = LocalSearchCore::run(model, neighborhood, &mut incumbent, &self.options.local_search, target, &self.callback, interrupt);
            archive_if_feasible(&mut archive, &incumbent);
            overall_status = outcome.termination_status;
            phases.push(PhaseStats {
                phase: "local_search".to_string(),
                iterations: outcome.iterations,
                elapsed_seconds: phase_start.elapsed().as_secs_f64(),
                termination_status: outcome.termination_status,
                objective_value: model.sense().sign() * outcome.final_score.objective,
                is_feasible: outcome.final_score.is_feasible,
            });
        }

        let mut memory = Memory::new();
        let mut chain_move_pool: Vec<Move> = Vec::new();
        let mut controller = TabuSearchController::new(&self.options.penalty);
        let mut global_iteration: i64 = 0;
        let mut initial_tabu_tenure = self.options.tabu_search.initial_tabu_tenure;
        let mut round_iteration_max = self.options.tabu_search.iteration_max;
        let mut number_of_initial_modification = if self.options.tabu_search.is_enabled_initial_modification {
            self.options.tabu_search.number_of_initial_modification
        } else {
            0
        };
        let mut round_index: u64 = 0;

        if self.options.tabu_search.iteration_max > 0 {
            loop {
                let time_left = remaining(overall_start, overall_time_max);
                if time_left == Duration::ZERO {
                    overall_status = TerminationStatus::TimeOver;
                    break;
                }
                if round_index >= self.options.general.iteration_max {
                    break;
                }
                if let Some(interrupt) = interrupt {
                    if interrupt() {
                        overall_status = TerminationStatus::EarlyStop;
                        break;
                    }
                }

                let round_time_max = time_left.min(Duration::from_secs_f64(self.options.tabu_search.time_max));
                let outcome = TabuSearchCore::run_round(
                    model,
                    &mut memory,
                    neighborhood,
                    &mut incumbent,
                    &mut chain_move_pool,
                    &self.options.tabu_search,
                    &self.options.neighborhood,
                    initial_tabu_tenure,
                    round_iteration_max,
                    round_time_max,
                    global_iteration,
                    number_of_initial_modification,
                    self.options.lagrange_dual.is_enabled,
                    target,
                    &self.callback,
                    interrupt,
                    &mut rng,
                    format!("tabu_search[{round_index}]"),
                );

                global_iteration = outcome.last_global_iteration;
                overall_status = outcome.termination_status;
                archive_if_feasible(&mut archive, &incumbent);
                phases.push(outcome.phase_stats.clone());

                let terminal = matches!(
                    outcome.termination_status,
                    TerminationStatus::ReachTarget | TerminationStatus::EarlyStop | TerminationStatus::Optimal
                );
                round_index += 1;
                if terminal || round_index >= self.options.general.iteration_max {
                    break;
                }

                let plan = controller.prepare_next_round(
                    model,
                    neighborhood,
                    &incumbent,
                    &mut chain_move_pool,
                    &outcome,
                    &self.options.tabu_search,
                    &self.options.neighborhood,
                    &self.options.penalty,
                    &mut rng,
                );
                initial_tabu_tenure = plan.initial_tabu_tenure;
                round_iteration_max = plan.iteration_max;
                number_of_initial_modification = plan.number_of_initial_modification;
            }
        }

        let final_values = incumbent
            .feasible()
            .or_else(|| incumbent.global_augmented())
            .map(|tracked| tracked.values.clone())
            .unwrap_or_else(|| model.values());
        restore_model_values(model, &final_values);

        let dual_bound = incumbent.dual_bound();
        let feasible_archive: Vec<Vec<i64>> = archive.entries().iter().map(|s| s.values.clone()).collect();

        let result = SolverResult::from_model(
            model,
            final_values,
            dual_bound,
            phases,
            overall_start.elapsed(),
            overall_status,
            feasible_archive,
        );

        if self.options.output.is_enabled_write_trend {
            log::debug!("trend logging requested but no trend path was supplied to Solver::solve; use the phase cores directly to capture per-round TrendRecord rows");
        }

        result
    }
}

fn remaining(start: Instant, budget: Duration) -> Duration {
    budget.saturating_sub(start.elapsed())
}

fn archive_if_feasible(archive: &mut SolutionArchive, incumbent: &IncumbentHolder) {
    if let Some(feasible) = incumbent.feasible() {
        archive.push(feasible.clone());
    }
}

fn restore_model_values(model: &mut Model, target_values: &[i64]) {
    for (variable, &target) in model.variables_mut().iter_mut().zip(target_values.iter()) {
        if !variable.is_fixed() && variable.value() != target {
            variable.set_value(target);
        }
    }
    model.recompute_caches_from_scratch();
}

fn validate_options(options: &Options) -> Result<()> {
    if options.general.time_max <= 0.0 {
        return Err(SolverError::Configuration("general.time_max must be positive".to_string()));
    }
    if options.tabu_search.initial_tabu_tenure < 1 {
        return Err(SolverError::Configuration("tabu_search.initial_tabu_tenure must be at least 1".to_string()));
    }
    if options.lagrange_dual.is_enabled && options.lagrange_dual.queue_size == 0 {
        return Err(SolverError::Configuration("lagrange_dual.queue_size must be positive when enabled".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ConstraintTag, OptimizationSense, Sense, VariableId, VariableKind};
    use crate::moves::{Alteration, MoveSense};
    use crate::neighborhood::MoveGenerator;

    struct SingleFlip;

    impl MoveGenerator for SingleFlip {
        fn name(&self) -> &str {
            "flip"
        }

        fn enumerate(&self, model: &Model, out: &mut Vec<Move>) {
            for (index, variable) in model.variables().iter().enumerate() {
                if variable.is_fixed() {
                    continue;
                }
                let target = 1 - variable.value();
                out.push(Move::new(model, vec![Alteration { variable: VariableId(index), new_value: target }], MoveSense::Binary));
            }
        }
    }

    fn knapsack_model() -> Model {
        let mut model = Model::new(OptimizationSense::Maximize);
        let x0 = model.add_variable(VariableKind::Binary, 0, 0, 1, 5.0);
        let x1 = model.add_variable(VariableKind::Binary, 0, 0, 1, 4.0);
        let x2 = model.add_variable(VariableKind::Binary, 0, 0, 1, 3.0);
        model.add_constraint(Sense::LessEqual, vec![(x0, 2.0), (x1, 3.0), (x2, 1.0)], -4.0, ConstraintTag::Knapsack);
        model
    }

    fn fast_options() -> Options {
        let mut options = Options::default();
        options.general.time_max = 5.0;
        options.general.iteration_max = 20;
        options.tabu_search.iteration_max = 50;
        options.tabu_search.time_max = 5.0;
        options.lagrange_dual.is_enabled = false;
        options.local_search.iteration_max = 50;
        options.output.is_enabled_store_feasible_solutions = true;
        options
    }

    #[test]
    fn solves_knapsack_to_a_feasible_solution() {
        let mut model = knapsack_model();
        let mut neighborhood = Neighborhood::new();
        neighborhood.register(Box::new(SingleFlip));
        let solver = Solver::new(fast_options()).unwrap();
        let result = solver.solve(&mut model, &mut neighborhood);
        assert!(result.is_feasible);
        assert!(!result.phases.is_empty());
    }

    #[test]
    fn rejects_non_positive_time_budget() {
        let mut options = Options::default();
        options.general.time_max = 0.0;
        assert!(Solver::new(options).is_err());
    }
}
