//! [`TabuSearchController`]: the adaptive outer loop over
//! [`super::core::TabuSearchCore`] rounds (evaluate round result, adjust
//! state, loop). Makes five adaptive decisions each round: the initial
//! solution, the penalty action, the tabu tenure, the initial-modification
//! count, and the iteration budget for the next round.

use rand::Rng;

use crate::incumbent::IncumbentHolder;
use crate::model::{ConstraintTag, Model};
use crate::moves::{Alteration, Move, MoveSense};
use crate::neighborhood::Neighborhood;
use crate::options::{ChainMoveReduceMode, NeighborhoodOptions, PenaltyOptions, TabuSearchOptions};

use super::core::RoundOutcome;

/// Consecutive rounds without a global-incumbent update before "stagnation"
/// kicks in.
const STAGNATION_ROUND_THRESHOLD: u32 = 80;
/// Rounds since a Relax action before a Reset becomes eligible.
const ROUNDS_SINCE_RELAX_BEFORE_RESET: u32 = 30;

/// What the controller decided to do with penalty coefficients this round,
/// for diagnostics/logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PenaltyAction {
    /// Nothing changed.
    None,
    /// Shrunk satisfied constraints' coefficients.
    Relax,
    /// Grew violated constraints' coefficients.
    Tighten,
    /// Reset every coefficient back to the configured default.
    Reset,
}

/// The parameters the core should use for its next round.
#[derive(Debug, Clone, Copy)]
pub struct NextRoundPlan {
    /// Tabu tenure to start the next round with.
    pub initial_tabu_tenure: i64,
    /// Iteration budget for the next round.
    pub iteration_max: u64,
    /// Number of purely-random opening iterations for the next round.
    pub number_of_initial_modification: u64,
    /// What happened to penalty coefficients this decision.
    pub penalty_action: PenaltyAction,
}

/// Adaptive state carried across rounds: stagnation counters, the relaxing
/// rate's own drift, and the round at which coefficients were last relaxed.
pub struct TabuSearchController {
    rounds_without_global_update: u32,
    rounds_since_relax: u32,
    relaxing_rate: f64,
    previous_initial_picked_streak: u32,
    had_feasible_incumbent: bool,
    default_relaxing_rate: f64,
}

impl TabuSearchController {
    /// A fresh controller, seeded with the configured default relaxing rate.
    pub fn new(options: &PenaltyOptions) -> Self {
        TabuSearchController {
            rounds_without_global_update: 0,
            rounds_since_relax: 0,
            relaxing_rate: options.penalty_coefficient_relaxing_rate,
            previous_initial_picked_streak: 0,
            had_feasible_incumbent: false,
            default_relaxing_rate: options.penalty_coefficient_relaxing_rate,
        }
    }

    /// Chooses the next round's starting model state (one of the three
    /// incumbents, or "stay put"), penalty-coefficient action, tabu tenure,
    /// initial-modification count, and iteration budget; applies the
    /// penalty action and chain-move/special-neighborhood bookkeeping in
    /// place; and returns the plan for the next round.
    #[allow(clippy::too_many_arguments)]
    pub fn prepare_next_round(
        &mut self,
        model: &mut Model,
        neighborhood: &mut Neighborhood,
        incumbent: &IncumbentHolder,
        chain_move_pool: &mut Vec<Move>,
        outcome: &RoundOutcome,
        tabu_options: &TabuSearchOptions,
        neighborhood_options: &NeighborhoodOptions,
        penalty_options: &PenaltyOptions,
        rng: &mut impl Rng,
    ) -> NextRoundPlan {
        if outcome.feasible_incumbent_updated {
            self.had_feasible_incumbent = true;
        }
        if outcome.global_incumbent_updated {
            self.rounds_without_global_update = 0;
        } else {
            self.rounds_without_global_update += 1;
        }
        let stagnating = self.rounds_without_global_update >= STAGNATION_ROUND_THRESHOLD;

        self.apply_next_initial_solution(model, neighborhood, incumbent, stagnating);

        if outcome.feasible_incumbent_updated {
            if let Some(feasible) = incumbent.feasible() {
                let raw_objective = model.sense().sign() * feasible.score.objective;
                let narrowed = model.tighten_bounds_from_incumbent(raw_objective);
                if !narrowed.is_empty() {
                    neighborhood.update_structure(model);
                }
            }
        }

        let penalty_action = self.apply_penalty_action(model, incumbent, outcome, penalty_options, stagnating);

        let next_initial_tabu_tenure = self.next_tabu_tenure(outcome, tabu_options, stagnating);
        let number_of_initial_modification = self.next_number_of_initial_modification(
            next_initial_tabu_tenure,
            tabu_options,
            stagnating && penalty_action == PenaltyAction::Reset,
            rng,
        );
        let iteration_max = self.next_iteration_max(outcome, tabu_options);

        self.update_special_neighborhoods(neighborhood, outcome);
        self.manage_chain_move_pool(chain_move_pool, neighborhood_options, outcome.global_incumbent_updated, rng);

        NextRoundPlan {
            initial_tabu_tenure: next_initial_tabu_tenure,
            iteration_max,
            number_of_initial_modification,
            penalty_action,
        }
    }

    /// Decides which incumbent (or "stay put") seeds the next round.
    fn apply_next_initial_solution(
        &mut self,
        model: &mut Model,
        neighborhood: &mut Neighborhood,
        incumbent: &IncumbentHolder,
        stagnating: bool,
    ) {
        let global = incumbent.global_augmented();
        let local = incumbent.local_augmented();

        let target_values: Option<&[i64]> = if global.is_some() && (self.rounds_without_global_update == 0 || stagnating) {
            global.map(|t| t.values.as_slice())
        } else if let (Some(local), Some(global)) = (local, global) {
            let gap = global.score.global_augmented_objective - local.score.local_augmented_objective;
            let improved_vs_stay_put = local.score.local_augmented_objective < model.local_augmented_objective();
            if improved_vs_stay_put && gap > 0.0 && (local.score.is_feasible || !stagnating) {
                Some(local.values.as_slice())
            } else {
                self.previous_initial_picked_streak += 1;
                None
            }
        } else {
            None
        };

        if let Some(values) = target_values {
            restore_values(model, values);
            neighborhood.update_structure(model);
        }
    }

    fn apply_penalty_action(
        &mut self,
        model: &mut Model,
        incumbent: &IncumbentHolder,
        outcome: &RoundOutcome,
        options: &PenaltyOptions,
        stagnating: bool,
    ) -> PenaltyAction {
        // Emergency relax: the core gave up because penalties dwarfed any
        // possible objective gain.
        if outcome.termination_status == crate::result::TerminationStatus::PenaltyCoefficientTooLarge {
            self.relax(model, options);
            return PenaltyAction::Relax;
        }

        let exceeded_ceiling = model
            .constraints()
            .iter()
            .any(|c| c.local_penalty_coefficient_leq() > options.initial_penalty_coefficient || c.local_penalty_coefficient_geq() > options.initial_penalty_coefficient);

        if stagnating && exceeded_ceiling && self.rounds_since_relax > ROUNDS_SINCE_RELAX_BEFORE_RESET {
            model.reset_penalty_coefficients(options.initial_penalty_coefficient);
            self.rounds_since_relax = 0;
            return PenaltyAction::Reset;
        }

        // Adapt the relaxing rate itself.
        if stagnating && !model.is_feasible() {
            self.relaxing_rate = (self.relaxing_rate * 0.95).max(0.5);
        } else if self.previous_initial_picked_streak > 3 {
            self.relaxing_rate = (self.relaxing_rate * 1.05).min(0.999);
            self.previous_initial_picked_streak = 0;
        } else {
            self.relaxing_rate += (self.default_relaxing_rate - self.relaxing_rate) * 0.1;
        }

        if model.is_feasible() {
            self.relax(model, options);
            PenaltyAction::Relax
        } else if let Some(global) = incumbent.global_augmented() {
            self.tighten(model, incumbent, global.score.global_augmented_objective, options);
            PenaltyAction::Tighten
        } else {
            PenaltyAction::None
        }
    }

    fn relax(&mut self, model: &mut Model, options: &PenaltyOptions) {
        let floor = if options.is_enabled_shrink_penalty_coefficient {
            0.0
        } else {
            options.initial_penalty_coefficient
        };
        for constraint in model.constraints_mut() {
            if constraint.violation() == 0.0 {
                constraint.scale_local_penalty_coefficients(self.relaxing_rate);
                if constraint.local_penalty_coefficient_leq() < floor {
                    constraint.set_local_penalty_coefficient_leq(floor);
                }
                if constraint.local_penalty_coefficient_geq() < floor {
                    constraint.set_local_penalty_coefficient_geq(floor);
                }
            }
        }
        self.rounds_since_relax = 0;
    }

    fn tighten(&mut self, model: &mut Model, incumbent: &IncumbentHolder, global_augmented_objective: f64, options: &PenaltyOptions) {
        let local_augmented_objective = incumbent
            .local_augmented()
            .map(|t| t.score.local_augmented_objective)
            .unwrap_or(model.local_augmented_objective());
        let gap = (global_augmented_objective - local_augmented_objective).max(0.0);
        if gap == 0.0 {
            self.rounds_since_relax += 1;
            return;
        }

        let total_violation = model.total_violation();
        let total_squared_violation: f64 = model.constraints().iter().map(|c| c.violation().powi(2)).sum();
        if total_violation <= 0.0 || total_squared_violation <= 0.0 {
            self.rounds_since_relax += 1;
            return;
        }

        let balance = options.penalty_coefficient_updating_balance;
        let deltas: Vec<f64> = model
            .constraints()
            .iter()
            .map(|c| {
                let violation = c.violation();
                if violation <= 0.0 {
                    0.0
                } else {
                    gap * (balance / total_violation + (1.0 - balance) * violation / total_squared_violation)
                }
            })
            .collect();

        let mut group_max: std::collections::HashMap<ConstraintTag, f64> = std::collections::HashMap::new();
        if options.is_enabled_grouping_penalty_coefficient {
            for (constraint, &delta) in model.constraints().iter().zip(deltas.iter()) {
                if delta <= 0.0 {
                    continue;
                }
                let entry = group_max.entry(constraint.tag()).or_insert(0.0);
                if delta > *entry {
                    *entry = delta;
                }
            }
        }

        for (index, delta) in deltas.iter().enumerate() {
            let delta = if options.is_enabled_grouping_penalty_coefficient {
                let tag = model.constraints()[index].tag();
                group_max.get(&tag).copied().unwrap_or(*delta)
            } else {
                *delta
            };
            if delta <= 0.0 {
                continue;
            }
            let constraint = &mut model.constraints_mut()[index];
            let is_leq_side = constraint.value() >= 0.0;
            let current = if is_leq_side {
                constraint.local_penalty_coefficient_leq()
            } else {
                constraint.local_penalty_coefficient_geq()
            };
            let updated = (current + options.penalty_coefficient_tightening_rate * delta).min(options.initial_penalty_coefficient);
            if is_leq_side {
                constraint.set_local_penalty_coefficient_leq(updated);
            } else {
                constraint.set_local_penalty_coefficient_geq(updated);
            }
        }
        self.rounds_since_relax += 1;
    }

    /// Picks the tabu tenure for the next round.
    fn next_tabu_tenure(&self, outcome: &RoundOutcome, options: &TabuSearchOptions, stagnating: bool) -> i64 {
        if outcome.global_incumbent_updated || stagnating {
            return options.initial_tabu_tenure;
        }
        let hit_cap = outcome.final_tabu_tenure >= options.initial_tabu_tenure
            && matches!(
                outcome.termination_status,
                crate::result::TerminationStatus::IterationOver | crate::result::TerminationStatus::NoMove
            );
        if hit_cap {
            (outcome.final_tabu_tenure + 1).max(1)
        } else {
            (outcome.final_tabu_tenure - 1).max(1)
        }
    }

    /// Picks how many variables to perturb before the next round starts.
    fn next_number_of_initial_modification(
        &self,
        next_tabu_tenure: i64,
        options: &TabuSearchOptions,
        force_modify: bool,
        rng: &mut impl Rng,
    ) -> u64 {
        if !options.is_enabled_initial_modification && !force_modify {
            return 0;
        }
        let base = (options.initial_modification_fixed_rate * next_tabu_tenure as f64).round();
        let rand_width = options.initial_modification_randomize_rate * next_tabu_tenure as f64;
        let jitter = if rand_width > 0.0 {
            rng.gen_range(-rand_width..=rand_width)
        } else {
            0.0
        };
        let value = (base + jitter).round();
        let value = if force_modify { value.max(1.0) } else { value.max(0.0) };
        value as u64
    }

    /// Picks the iteration budget for the next round.
    fn next_iteration_max(&self, outcome: &RoundOutcome, options: &TabuSearchOptions) -> u64 {
        if !options.is_enabled_automatic_iteration_adjustment {
            return options.iteration_max;
        }
        if outcome.termination_status == crate::result::TerminationStatus::IterationOver {
            let grown = outcome.iterations + outcome.iterations / 2;
            grown.min(options.iteration_max.max(outcome.iterations))
        } else {
            options.iteration_max
        }
    }

    fn update_special_neighborhoods(&self, neighborhood: &mut Neighborhood, outcome: &RoundOutcome) {
        if outcome.global_incumbent_updated {
            neighborhood.set_special_neighborhoods_enabled(false);
        } else if outcome.termination_status == crate::result::TerminationStatus::IterationOver {
            neighborhood.set_special_neighborhoods_enabled(true);
        }
    }

    fn manage_chain_move_pool(
        &self,
        chain_move_pool: &mut Vec<Move>,
        options: &NeighborhoodOptions,
        global_incumbent_updated: bool,
        rng: &mut impl Rng,
    ) {
        if global_incumbent_updated {
            chain_move_pool.clear();
            return;
        }
        chain_move_pool.retain(|m| m.is_available());
        dedup_by_altered_variables(chain_move_pool);
        if chain_move_pool.len() <= options.chain_move_capacity {
            return;
        }
        match options.chain_move_reduce_mode {
            ChainMoveReduceMode::OverlapRate => {
                chain_move_pool.sort_unstable_by(|a, b| b.overlap_rate().partial_cmp(&a.overlap_rate()).unwrap());
                chain_move_pool.truncate(options.chain_move_capacity);
            }
            ChainMoveReduceMode::Shuffle => {
                use rand::seq::SliceRandom;
                chain_move_pool.shuffle(rng);
                chain_move_pool.truncate(options.chain_move_capacity);
            }
        }
    }
}

fn dedup_by_altered_variables(pool: &mut Vec<Move>) {
    let mut kept: Vec<Move> = Vec::with_capacity(pool.len());
    for mv in pool.drain(..) {
        let duplicate = kept.iter().any(|k| {
            k.alterations().len() == mv.alterations().len()
                && k.alterations().iter().all(|a| mv.alterations().iter().any(|b| b.variable == a.variable))
        });
        if !duplicate {
            kept.push(mv);
        }
    }
    *pool = kept;
}

fn restore_values(model: &mut Model, target_values: &[i64]) {
    let alterations: Vec<Alteration> = model
        .variables()
        .iter()
        .enumerate()
        .filter_map(|(index, v)| {
            let target = target_values[index];
            if v.value() != target {
                Some(Alteration { variable: crate::model::VariableId(index), new_value: target })
            } else {
                None
            }
        })
        .collect();
    if alterations.is_empty() {
        return;
    }
    let mv = Move::new(model, alterations, MoveSense::UserDefined);
    model.apply_move(&mv);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ConstraintTag, OptimizationSense, Sense, VariableKind};
    use crate::result::{PhaseStats, TerminationStatus};
    use crate::score::SolutionScore;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn two_variable_model() -> Model {
        let mut model = Model::new(OptimizationSense::Minimize);
        model.set_initial_penalty_coefficient(1.0);
        let x0 = model.add_variable(VariableKind::Binary, 0, 0, 1, 1.0);
        let x1 = model.add_variable(VariableKind::Binary, 1, 0, 1, 1.0);
        model.add_constraint(Sense::Equal, vec![(x0, 1.0), (x1, -1.0)], 0.0, ConstraintTag::General);
        model
    }

    fn dummy_outcome(status: TerminationStatus, global_update: bool) -> RoundOutcome {
        let score = SolutionScore::from_model(&two_variable_model());
        RoundOutcome {
            iterations: 10,
            termination_status: status,
            final_tabu_tenure: 3,
            last_global_iteration: 10,
            global_incumbent_updated: global_update,
            feasible_incumbent_updated: global_update,
            final_score: score,
            trend: vec![],
            phase_stats: PhaseStats {
                phase: "tabu_search[0]".to_string(),
                iterations: 10,
                elapsed_seconds: 0.01,
                termination_status: status,
                objective_value: score.objective,
                is_feasible: score.is_feasible,
            },
        }
    }

    #[test]
    fn tenure_resets_to_default_on_global_update() {
        let controller = TabuSearchController::new(&PenaltyOptions::default());
        let outcome = dummy_outcome(TerminationStatus::IterationOver, true);
        let tenure = controller.next_tabu_tenure(&outcome, &TabuSearchOptions::default(), false);
        assert_eq!(tenure, TabuSearchOptions::default().initial_tabu_tenure);
    }

    #[test]
    fn tenure_grows_on_iteration_cap_without_update() {
        let controller = TabuSearchController::new(&PenaltyOptions::default());
        let options = TabuSearchOptions {
            initial_tabu_tenure: 3,
            ..TabuSearchOptions::default()
        };
        let outcome = dummy_outcome(TerminationStatus::IterationOver, false);
        let tenure = controller.next_tabu_tenure(&outcome, &options, false);
        assert_eq!(tenure, 4);
    }

    #[test]
    fn chain_pool_cleared_on_global_update() {
        let controller = TabuSearchController::new(&PenaltyOptions::default());
        let model = two_variable_model();
        let mut pool = vec![Move::new(
            &model,
            vec![Alteration { variable: crate::model::VariableId(0), new_value: 1 }],
            MoveSense::Chain,
        )];
        let mut rng = StdRng::seed_from_u64(1);
        controller.manage_chain_move_pool(&mut pool, &NeighborhoodOptions::default(), true, &mut rng);
        assert!(pool.is_empty());
    }

    #[test]
    fn restore_values_applies_only_when_different() {
        let mut model = two_variable_model();
        restore_values(&mut model, &[1, 0]);
        assert_eq!(model.values(), vec![1, 0]);
    }

    #[test]
    fn tighten_matches_the_published_delta_formula() {
        let mut model = Model::new(OptimizationSense::Minimize);
        model.set_initial_penalty_coefficient(1.0);
        let x = model.add_variable(VariableKind::Integer, 4, 0, 10, 1.0);
        model.add_constraint(Sense::LessEqual, vec![(x, 1.0)], -1.0, ConstraintTag::General);
        model.recompute_caches_from_scratch();
        assert_eq!(model.constraints()[0].violation(), 3.0);

        let mut incumbent = IncumbentHolder::new();
        let local_score = SolutionScore { local_augmented_objective: 1.0, ..SolutionScore::from_model(&model) };
        incumbent.try_update(&model, local_score);

        let options = PenaltyOptions {
            penalty_coefficient_updating_balance: 0.5,
            penalty_coefficient_tightening_rate: 1.0,
            initial_penalty_coefficient: 10.0,
            ..PenaltyOptions::default()
        };
        let mut controller = TabuSearchController::new(&options);
        controller.tighten(&mut model, &incumbent, 3.0, &options);

        // gap = 2, total_violation = 3, total_squared_violation = 9:
        // delta = 0.5*(2/3) + 0.5*(2/9)*3 = 0.666...
        let delta = 0.5 * (2.0 / 3.0) + 0.5 * (2.0 / 9.0) * 3.0;
        assert!((model.constraints()[0].local_penalty_coefficient_leq() - (1.0 + delta)).abs() < 1e-9);
    }

    #[test]
    fn eighty_stagnant_rounds_reset_penalty_coefficients() {
        let mut model = Model::new(OptimizationSense::Minimize);
        model.set_initial_penalty_coefficient(5.0);
        let x = model.add_variable(VariableKind::Integer, 4, 0, 10, 1.0);
        model.add_constraint(Sense::LessEqual, vec![(x, 1.0)], -1.0, ConstraintTag::General);
        model.recompute_caches_from_scratch();

        let options = PenaltyOptions {
            initial_penalty_coefficient: 1.0,
            ..PenaltyOptions::default()
        };
        let score = SolutionScore::from_model(&model);
        let mut incumbent = IncumbentHolder::new();
        incumbent.try_update(&model, score);

        let mut neighborhood = Neighborhood::new();
        let mut chain_move_pool: Vec<Move> = Vec::new();
        let mut controller = TabuSearchController::new(&options);
        let mut rng = StdRng::seed_from_u64(3);

        let mut saw_reset = false;
        let mut reset_modification_count = 0;
        for _ in 0..85 {
            let outcome = dummy_outcome(TerminationStatus::IterationOver, false);
            let plan = controller.prepare_next_round(
                &mut model,
                &mut neighborhood,
                &incumbent,
                &mut chain_move_pool,
                &outcome,
                &TabuSearchOptions::default(),
                &NeighborhoodOptions::default(),
                &options,
                &mut rng,
            );
            if plan.penalty_action == PenaltyAction::Reset {
                saw_reset = true;
                reset_modification_count = plan.number_of_initial_modification;
            }
        }

        assert!(saw_reset, "expected a Reset action within 85 stagnant rounds");
        assert!(reset_modification_count > 0);
        assert_eq!(model.constraints()[0].local_penalty_coefficient_leq(), options.initial_penalty_coefficient);
    }

    #[test]
    fn relax_shrinks_satisfied_constraint_coefficient() {
        let mut model = two_variable_model();
        model.constraints_mut()[0].set_local_penalty_coefficient_leq(2.0);
        model.constraints_mut()[0].set_local_penalty_coefficient_geq(2.0);
        let mut controller = TabuSearchController::new(&PenaltyOptions::default());
        controller.relax(&mut model, &PenaltyOptions::default());
        assert!(model.constraints()[0].local_penalty_coefficient_leq() < 2.0);
    }
}
