//! [`TabuSearchCore`]: the per-round inner loop.
//!
//! Parallel move evaluation runs over `rayon`, populating pre-sized
//! `(SolutionScore, MoveScore)` buffers rather than streaming a `min_by`
//! over solutions, so the selection and aspiration rules can see every
//! candidate at once.

use std::time::{Duration, Instant};

use rand::seq::SliceRandom;
use rand::Rng;
use rayon::prelude::*;

use crate::callback::{IterationCallback, IterationContext};
use crate::evaluator::{IntegerStepSizeAdjuster, ModelEvaluator, MoveEvaluator, MoveScore};
use crate::incumbent::IncumbentHolder;
use crate::memory::Memory;
use crate::model::{ConstraintId, Model, EPSILON};
use crate::moves::{Move, MoveSense};
use crate::neighborhood::Neighborhood;
use crate::options::{ImprovabilityScreeningMode, NeighborhoodOptions, TabuSearchOptions};
use crate::result::{PhaseStats, TerminationStatus, TrendRecord};
use crate::score::SolutionScore;

/// Bonus added to a tabu move's total selection score, large enough that it
/// is only ever chosen over a non-tabu move when every candidate is tabu.
const TABU_PENALTY: f64 = 1e50;
/// Bonus added to a special-neighborhood move that is not itself improving,
/// larger still so it never outranks the tabu penalty.
const NON_IMPROVING_SPECIAL_PENALTY: f64 = 1e100;
/// Margin an aspiration candidate must beat the global incumbent by to
/// override tabu status.
const ASPIRATION_MARGIN: f64 = EPSILON;

/// Everything the controller needs to know about how a round went, to make
/// its five between-round decisions.
#[derive(Debug)]
pub struct RoundOutcome {
    /// Iterations actually run this round.
    pub iterations: u64,
    /// Why the round stopped.
    pub termination_status: TerminationStatus,
    /// The tabu tenure in effect when the round stopped.
    pub final_tabu_tenure: i64,
    /// The global iteration counter (continuing across rounds) at the round's
    /// last committed move, or the round's starting offset if nothing was
    /// committed.
    pub last_global_iteration: i64,
    /// Whether the global-augmented incumbent improved at any point this
    /// round.
    pub global_incumbent_updated: bool,
    /// Whether the feasible incumbent improved at any point this round
    /// (used by the controller to trigger online bound tightening).
    pub feasible_incumbent_updated: bool,
    /// The round's final solution score.
    pub final_score: SolutionScore,
    /// Trend rows recorded this round (empty unless a log interval is set).
    pub trend: Vec<TrendRecord>,
    /// Summary stats for [`crate::result::SolverResult::phases`].
    pub phase_stats: PhaseStats,
}

/// Stateless: a round's transient bookkeeping (intensity streaks, range
/// trackers, the running auto-break check) lives entirely in local variables
/// of [`TabuSearchCore::run_round`], since nothing about it needs to survive
/// past the round it was computed in.
pub struct TabuSearchCore;

impl TabuSearchCore {
    /// Runs one tabu-search round to completion (or until a termination
    /// condition fires), mutating `model`, `memory`, `incumbent`, and
    /// `chain_move_pool` in place.
    #[allow(clippy::too_many_arguments)]
    pub fn run_round(
        model: &mut Model,
        memory: &mut Memory,
        neighborhood: &mut Neighborhood,
        incumbent: &mut IncumbentHolder,
        chain_move_pool: &mut Vec<Move>,
        options: &TabuSearchOptions,
        neighborhood_options: &NeighborhoodOptions,
        initial_tabu_tenure: i64,
        iteration_max: u64,
        time_max: Duration,
        starting_global_iteration: i64,
        number_of_initial_modification: u64,
        lagrange_dual_enabled: bool,
        target_objective_value: Option<f64>,
        callback: &IterationCallback,
        interrupt: Option<&dyn Fn() -> bool>,
        rng: &mut impl Rng,
        phase_label: String,
    ) -> RoundOutcome {
        let start_time = Instant::now();
        memory.reset_local_last_update_iterations(model);
        incumbent.reset_local_augmented();

        let mutable_variable_count =
            model.variables().iter().filter(|v| !v.is_fixed()).count().max(1) as i64;

        let mut tabu_tenure = initial_tabu_tenure.max(1);
        let mut last_sampled_intensity = memory.primal_intensity();
        let mut increase_streak = 0u32;
        let mut decrease_streak = 0u32;

        let mut iteration: u64 = 0;
        let mut global_iteration = starting_global_iteration;
        let mut current_score = SolutionScore::from_model(model);
        let mut previous_committed: Option<(Move, Vec<i64>)> = None;
        let mut global_incumbent_updated = false;
        let mut feasible_incumbent_updated = false;
        let mut min_infeasible_local_penalty = f64::INFINITY;
        let mut max_abs_objective_improvement: f64 = 0.0;
        let mut trend = Vec::new();

        let status;
        loop {
            if iteration >= iteration_max {
                status = TerminationStatus::IterationOver;
                break;
            }
            if start_time.elapsed() >= time_max {
                status = TerminationStatus::TimeOver;
                break;
            }
            if let Some(interrupt) = interrupt {
                if interrupt() {
                    status = TerminationStatus::EarlyStop;
                    break;
                }
            }
            if let Some(target) = target_objective_value {
                if current_score.is_feasible
                    && current_score.objective - model.sense().sign() * target <= EPSILON
                {
                    status = TerminationStatus::ReachTarget;
                    break;
                }
            }

            if matches!(
                neighborhood_options.improvability_screening_mode,
                ImprovabilityScreeningMode::Soft
                    | ImprovabilityScreeningMode::Aggressive
                    | ImprovabilityScreeningMode::Automatic
            ) {
                model.recompute_all_feasibility_improvability();
            }

            let mut moves = neighborhood.enumerate(model);
            if !matches!(
                neighborhood_options.improvability_screening_mode,
                ImprovabilityScreeningMode::Off
            ) {
                moves.retain(|mv| passes_screening(model, mv, neighborhood_options.improvability_screening_mode));
            }
            moves.extend(chain_move_pool.iter().filter(|m| m.is_available()).cloned());

            if options.is_enabled_shuffle {
                moves.shuffle(rng);
            }
            if options.is_enabled_move_curtail && !moves.is_empty() {
                let keep = ((moves.len() as f64) * options.move_preserve_rate).ceil() as usize;
                moves.truncate(keep.max(1));
            }

            if moves.is_empty() {
                status = if current_score.is_feasible && !current_score.is_objective_improvable {
                    TerminationStatus::Optimal
                } else {
                    TerminationStatus::NoMove
                };
                break;
            }

            let reference = current_score;
            let evaluations: Vec<(SolutionScore, MoveScore)> = moves
                .par_iter()
                .map(|mv| {
                    let score = ModelEvaluator::evaluate(model, &reference, mv);
                    let move_score = MoveEvaluator::evaluate(
                        model,
                        mv,
                        global_iteration,
                        tabu_tenure,
                        options.tabu_mode,
                        options.frequency_penalty_coefficient,
                        options.lagrangian_penalty_coefficient,
                        lagrange_dual_enabled,
                    );
                    (score, move_score)
                })
                .collect();

            let total_scores: Vec<f64> = moves
                .iter()
                .zip(evaluations.iter())
                .map(|(mv, (score, move_score))| {
                    let mut total =
                        score.local_augmented_objective + move_score.frequency_penalty + move_score.lagrangian_penalty;
                    if !move_score.is_permissible {
                        total += TABU_PENALTY;
                    }
                    if mv.is_special_neighborhood_move() && score.objective_improvement <= 0.0 {
                        total += NON_IMPROVING_SPECIAL_PENALTY;
                    }
                    total
                })
                .collect();

            let selected_index = if iteration < number_of_initial_modification {
                rng.gen_range(0..moves.len())
            } else {
                let mut best = 0;
                for i in 1..moves.len() {
                    if total_scores[i] < total_scores[best] {
                        best = i;
                    }
                }
                if options.ignore_tabu_if_global_incumbent {
                    let mut best_global = 0;
                    for i in 1..moves.len() {
                        if evaluations[i].0.global_augmented_objective
                            < evaluations[best_global].0.global_augmented_objective
                        {
                            best_global = i;
                        }
                    }
                    let aspires = incumbent
                        .global_augmented()
                        .map(|best_known| {
                            evaluations[best_global].0.global_augmented_objective
                                < best_known.score.global_augmented_objective - ASPIRATION_MARGIN
                        })
                        .unwrap_or(false);
                    if aspires {
                        best_global
                    } else {
                        best
                    }
                } else {
                    best
                }
            };

            let mut chosen_move = moves[selected_index].clone();
            if neighborhood_options.is_enabled_integer_step_size_adjuster
                && chosen_move.is_univariable_move()
                && matches!(chosen_move.sense(), MoveSense::Integer)
            {
                chosen_move = IntegerStepSizeAdjuster::adjust(model, &reference, &chosen_move);
            }

            let previous_values_of_altered: Vec<i64> = chosen_move
                .alterations()
                .iter()
                .map(|a| model.variable(a.variable).value())
                .collect();

            model.apply_move(&chosen_move);
            if chosen_move.is_special_neighborhood_move() {
                if let Some(pool_entry) = chain_move_pool
                    .iter_mut()
                    .find(|m| same_altered_variables(m, &chosen_move))
                {
                    pool_entry.set_is_available(false);
                }
            }

            let committed_score = SolutionScore::from_model(model).with_improvement_relative_to(&reference);

            let random_width = (options.tabu_tenure_randomize_rate * tabu_tenure as f64).round() as i64;
            memory.update(model, &chosen_move, global_iteration, random_width.max(0), rng);

            if neighborhood_options.is_enabled_chain {
                try_synthesize_chain_move(
                    &previous_committed,
                    &chosen_move,
                    &previous_values_of_altered,
                    chain_move_pool,
                    neighborhood_options.chain_move_overlap_rate_threshold,
                );
            }
            previous_committed = Some((chosen_move, previous_values_of_altered));

            let update = incumbent.try_update(model, committed_score);
            if update.contains(crate::incumbent::IncumbentUpdate::GLOBAL) {
                global_incumbent_updated = true;
            }
            if update.contains(crate::incumbent::IncumbentUpdate::FEASIBLE) {
                feasible_incumbent_updated = true;
            }

            if global_incumbent_updated && tabu_tenure != initial_tabu_tenure {
                tabu_tenure = initial_tabu_tenure;
                increase_streak = 0;
                decrease_streak = 0;
            } else if options.is_enabled_automatic_tabu_tenure_adjustment
                && (global_iteration - starting_global_iteration) % (tabu_tenure + 1) == 0
            {
                let intensity = memory.primal_intensity();
                if intensity > last_sampled_intensity {
                    increase_streak += 1;
                    decrease_streak = 0;
                } else if intensity < last_sampled_intensity {
                    decrease_streak += 1;
                    increase_streak = 0;
                } else {
                    increase_streak = 0;
                    decrease_streak = 0;
                }
                last_sampled_intensity = intensity;
                if increase_streak >= options.intensity_increase_count_threshold {
                    tabu_tenure = (tabu_tenure + 1).min(mutable_variable_count);
                    increase_streak = 0;
                } else if decrease_streak >= options.intensity_decrease_count_threshold {
                    tabu_tenure = (tabu_tenure - 1).max((initial_tabu_tenure / 2).max(1));
                    decrease_streak = 0;
                }
            }

            if !committed_score.is_feasible {
                min_infeasible_local_penalty = min_infeasible_local_penalty.min(committed_score.local_penalty);
            }
            max_abs_objective_improvement = max_abs_objective_improvement.max(committed_score.objective_improvement.abs());
            if options.is_enabled_automatic_break
                && min_infeasible_local_penalty > 100.0 * max_abs_objective_improvement.max(EPSILON)
            {
                current_score = committed_score;
                status = TerminationStatus::PenaltyCoefficientTooLarge;
                global_iteration += 1;
                iteration += 1;
                break;
            }

            current_score = committed_score;
            global_iteration += 1;

            if options.log_interval > 0 && iteration % options.log_interval == 0 {
                callback(&IterationContext {
                    phase: &phase_label,
                    iteration,
                    score: &current_score,
                    sense: model.sense(),
                    previous_score: Some(&reference),
                    start_time: Some(start_time),
                    time_max: Some(time_max),
                    iteration_max: Some(iteration_max),
                });
                trend.push(TrendRecord {
                    phase: phase_label.clone(),
                    iteration,
                    objective_value: model.sense().sign() * current_score.objective,
                    global_augmented_objective: current_score.global_augmented_objective,
                    is_feasible: current_score.is_feasible,
                });
            }

            iteration += 1;
        }

        RoundOutcome {
            iterations: iteration,
            termination_status: status,
            final_tabu_tenure: tabu_tenure,
            last_global_iteration: global_iteration,
            global_incumbent_updated,
            feasible_incumbent_updated,
            final_score: current_score,
            trend,
            phase_stats: PhaseStats {
                phase: phase_label,
                iterations: iteration,
                elapsed_seconds: start_time.elapsed().as_secs_f64(),
                termination_status: status,
                objective_value: model.sense().sign() * current_score.objective,
                is_feasible: current_score.is_feasible,
            },
        }
    }
}

fn passes_screening(model: &Model, mv: &Move, mode: ImprovabilityScreeningMode) -> bool {
    let is_feasible = model.is_feasible();
    let objective_improvable = |a: &crate::moves::Alteration| model.variable(a.variable).is_objective_improvable();
    let feasibility_improvable = |a: &crate::moves::Alteration| model.variable(a.variable).is_feasibility_improvable();
    match mode {
        ImprovabilityScreeningMode::Off => true,
        ImprovabilityScreeningMode::Soft | ImprovabilityScreeningMode::Automatic => {
            if is_feasible {
                mv.alterations().iter().any(objective_improvable)
            } else {
                mv.alterations().iter().any(|a| objective_improvable(a) || feasibility_improvable(a))
            }
        }
        ImprovabilityScreeningMode::Aggressive | ImprovabilityScreeningMode::Intensive => {
            if is_feasible {
                mv.alterations().iter().any(objective_improvable)
            } else {
                mv.alterations().iter().any(feasibility_improvable)
            }
        }
    }
}

fn same_altered_variables(a: &Move, b: &Move) -> bool {
    a.alterations().len() == b.alterations().len()
        && a.alterations()
            .iter()
            .all(|x| b.alterations().iter().any(|y| y.variable == x.variable))
}

fn try_synthesize_chain_move(
    previous_committed: &Option<(Move, Vec<i64>)>,
    current_move: &Move,
    current_move_previous_values: &[i64],
    chain_move_pool: &mut Vec<Move>,
    overlap_rate_threshold: f64,
) {
    let Some((previous_move, previous_move_previous_values)) = previous_committed else { return };
    let fusable = matches!(
        (previous_move.sense(), current_move.sense()),
        (MoveSense::Binary, MoveSense::Binary) | (MoveSense::Chain, MoveSense::Chain) | (MoveSense::TwoFlip, MoveSense::TwoFlip)
    );
    if !fusable || !previous_move.has_disjoint_variables(current_move) {
        return;
    }
    let overlap_rate = related_constraint_overlap_rate(previous_move, current_move);
    if overlap_rate <= overlap_rate_threshold {
        return;
    }
    let Some(fused) = previous_move.fuse_chain(current_move, overlap_rate) else { return };
    if chain_move_pool.iter().any(|m| same_altered_variables(m, &fused)) {
        return;
    }
    // `fused.alterations()` is the two source moves' alterations merged and
    // sorted by variable id; look each one back up by variable to build the
    // pre-chain value vector in that same order.
    let mut source_values: Vec<(crate::model::VariableId, i64)> = previous_move
        .alterations()
        .iter()
        .map(|a| a.variable)
        .zip(previous_move_previous_values.iter().copied())
        .chain(
            current_move
                .alterations()
                .iter()
                .map(|a| a.variable)
                .zip(current_move_previous_values.iter().copied()),
        )
        .collect();
    source_values.sort_unstable_by_key(|(variable, _)| *variable);
    let previous_values: Vec<i64> = source_values.into_iter().map(|(_, value)| value).collect();
    let inverse = fused.chain_inverse(&previous_values);
    chain_move_pool.push(fused);
    chain_move_pool.push(inverse);
}

fn related_constraint_overlap_rate(a: &Move, b: &Move) -> f64 {
    let a_set: Vec<ConstraintId> = a.related_constraints().to_vec();
    let b_set: Vec<ConstraintId> = b.related_constraints().to_vec();
    let intersection = a_set.iter().filter(|id| b_set.contains(id)).count();
    let union = a_set.len() + b_set.len() - intersection;
    if union == 0 {
        0.0
    } else {
        intersection as f64 / union as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::callback::silent_callback;
    use crate::model::{ConstraintTag, OptimizationSense, Sense, VariableKind};
    use crate::moves::Alteration;
    use crate::neighborhood::MoveGenerator;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    struct FlipAny;

    impl MoveGenerator for FlipAny {
        fn name(&self) -> &str {
            "flip_any"
        }

        fn enumerate(&self, model: &Model, out: &mut Vec<Move>) {
            for (index, variable) in model.variables().iter().enumerate() {
                if variable.is_fixed() {
                    continue;
                }
                let new_value = 1 - variable.value();
                out.push(Move::new(
                    model,
                    vec![Alteration { variable: crate::model::VariableId(index), new_value }],
                    MoveSense::Binary,
                ));
            }
        }
    }

    fn knapsack_model() -> Model {
        let mut model = Model::new(OptimizationSense::Maximize);
        let x0 = model.add_variable(VariableKind::Binary, 0, 0, 1, 5.0);
        let x1 = model.add_variable(VariableKind::Binary, 0, 0, 1, 4.0);
        let x2 = model.add_variable(VariableKind::Binary, 0, 0, 1, 3.0);
        model.add_constraint(
            Sense::LessEqual,
            vec![(x0, 2.0), (x1, 3.0), (x2, 1.0)],
            -4.0,
            ConstraintTag::Knapsack,
        );
        model
    }

    #[test]
    fn round_runs_to_iteration_limit_and_improves_objective() {
        let mut model = knapsack_model();
        let mut memory = Memory::new();
        let mut neighborhood = Neighborhood::new();
        neighborhood.register(Box::new(FlipAny));
        let mut incumbent = IncumbentHolder::new();
        let mut chain_pool = Vec::new();
        let options = TabuSearchOptions {
            is_enabled_shuffle: false,
            ..TabuSearchOptions::default()
        };
        let neighborhood_options = NeighborhoodOptions::default();
        let mut rng = StdRng::seed_from_u64(42);
        let callback = silent_callback();

        let outcome = TabuSearchCore::run_round(
            &mut model,
            &mut memory,
            &mut neighborhood,
            &mut incumbent,
            &mut chain_pool,
            &options,
            &neighborhood_options,
            2,
            50,
            Duration::from_secs(5),
            0,
            0,
            false,
            None,
            &callback,
            None,
            &mut rng,
            "tabu_search[test]".to_string(),
        );

        assert_eq!(outcome.iterations, 50);
        assert_eq!(outcome.termination_status, TerminationStatus::IterationOver);
        assert!(incumbent.feasible().is_some());
    }

    #[test]
    fn reaches_target_objective_early() {
        let mut model = knapsack_model();
        let mut memory = Memory::new();
        let mut neighborhood = Neighborhood::new();
        neighborhood.register(Box::new(FlipAny));
        let mut incumbent = IncumbentHolder::new();
        let mut chain_pool = Vec::new();
        let options = TabuSearchOptions::default();
        let neighborhood_options = NeighborhoodOptions::default();
        let mut rng = StdRng::seed_from_u64(7);
        let callback = silent_callback();

        let outcome = TabuSearchCore::run_round(
            &mut model,
            &mut memory,
            &mut neighborhood,
            &mut incumbent,
            &mut chain_pool,
            &options,
            &neighborhood_options,
            2,
            1000,
            Duration::from_secs(5),
            0,
            0,
            false,
            Some(5.0),
            &callback,
            None,
            &mut rng,
            "tabu_search[test]".to_string(),
        );

        assert!(matches!(
            outcome.termination_status,
            TerminationStatus::ReachTarget | TerminationStatus::IterationOver
        ));
    }
}
