//! [`LocalSearchCore`]: the memoryless, tabu-free counterpart to the tabu
//! search inner loop. Each iteration evaluates the whole
//! neighborhood and commits a maximal set of pairwise-disjoint improving
//! moves in one shot, rather than a single best move.

use std::time::{Duration, Instant};

use rayon::prelude::*;

use crate::callback::{IterationCallback, IterationContext};
use crate::evaluator::ModelEvaluator;
use crate::incumbent::IncumbentHolder;
use crate::model::{ConstraintId, Model, EPSILON};
use crate::moves::Move;
use crate::neighborhood::Neighborhood;
use crate::options::LocalSearchOptions;
use crate::result::TerminationStatus;
use crate::score::SolutionScore;

/// Summary of one [`LocalSearchCore::run`] call.
#[derive(Debug, Clone)]
pub struct LocalSearchOutcome {
    /// Outer iterations actually run.
    pub iterations: u64,
    /// Why the phase stopped.
    pub termination_status: TerminationStatus,
    /// Total number of moves committed across every iteration.
    pub moves_committed: u64,
    /// The solution score after the last committed batch of moves.
    pub final_score: SolutionScore,
}

/// Stateless entry point, mirroring [`crate::tabu_search::TabuSearchCore`]
/// but without a [`crate::memory::Memory`] or tabu bookkeeping.
pub struct LocalSearchCore;

impl LocalSearchCore {
    pub fn run(
        model: &mut Model,
        neighborhood: &mut Neighborhood,
        incumbent: &mut IncumbentHolder,
        options: &LocalSearchOptions,
        target_objective_value: Option<f64>,
        callback: &IterationCallback,
        interrupt: Option<&dyn Fn() -> bool>,
    ) -> LocalSearchOutcome {
        let start_time = Instant::now();
        let sense = model.sense();
        let mut reference = SolutionScore::from_model(model);
        incumbent.try_update(model, reference);

        let mut iteration: u64 = 0;
        let mut moves_committed: u64 = 0;
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
            if let Some(target) = target_objective_value {
                if reference.is_feasible && reference.objective - sense.sign() * target <= EPSILON {
                    status = TerminationStatus::ReachTarget;
                    break;
                }
            }

            let candidates = neighborhood.enumerate(model);
            if candidates.is_empty() {
                status = TerminationStatus::NoMove;
                break;
            }

            let scores: Vec<SolutionScore> = candidates
                .par_iter()
                .map(|mv| ModelEvaluator::evaluate(model, &reference, mv))
                .collect();

            let mut improving: Vec<(usize, SolutionScore)> = scores
                .into_iter()
                .enumerate()
                .filter(|(_, score)| score.global_augmented_objective < reference.global_augmented_objective - EPSILON)
                .collect();

            if improving.is_empty() {
                status = TerminationStatus::NoMove;
                break;
            }

            improving.sort_by(|(a_index, a_score), (b_index, b_score)| {
                let a_related = candidates[*a_index].related_constraints().len();
                let b_related = candidates[*b_index].related_constraints().len();
                a_related
                    .cmp(&b_related)
                    .then_with(|| a_score.global_augmented_objective.partial_cmp(&b_score.global_augmented_objective).unwrap())
            });

            let mut committed_constraints: Vec<ConstraintId> = Vec::new();
            let mut committed_any = false;
            for (index, _) in &improving {
                let mv = &candidates[*index];
                if mv.related_constraints().iter().any(|c| committed_constraints.contains(c)) {
                    continue;
                }
                model.apply_move(mv);
                committed_constraints.extend_from_slice(mv.related_constraints());
                moves_committed += 1;
                committed_any = true;
            }

            if !committed_any {
                status = TerminationStatus::NoMove;
                break;
            }

            reference = SolutionScore::from_model(model);
            incumbent.try_update(model, reference);

            iteration += 1;
            callback(&IterationContext {
                phase: "local_search",
                iteration,
                score: &reference,
                sense,
                previous_score: None,
                start_time: Some(start_time),
                time_max: Some(Duration::from_secs_f64(options.time_max)),
                iteration_max: Some(options.iteration_max),
            });
        }

        LocalSearchOutcome {
            iterations: iteration,
            termination_status: status,
            moves_committed,
            final_score: reference,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::callback::silent_callback;
    use crate::model::{ConstraintTag, OptimizationSense, Sense, VariableId, VariableKind};
    use crate::moves::{Alteration, MoveSense};

    struct SingleFlip;

    impl crate::neighborhood::MoveGenerator for SingleFlip {
        fn name(&self) -> &str {
            "flip"
        }

        fn enumerate(&self, model: &Model, out: &mut Vec<Move>) {
            for (index, variable) in model.variables().iter().enumerate() {
                if variable.is_fixed() {
                    continue;
                }
                let id = VariableId(index);
                let target = 1 - variable.value();
                out.push(Move::new(
                    model,
                    vec![Alteration { variable: id, new_value: target }],
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
    fn commits_disjoint_improving_moves_and_stops_on_no_move() {
        let mut model = knapsack_model();
        let mut neighborhood = Neighborhood::new();
        neighborhood.register(Box::new(SingleFlip));
        let mut incumbent = IncumbentHolder::new();
        let options = LocalSearchOptions {
            iteration_max: 50,
            ..LocalSearchOptions::default()
        };
        let callback = silent_callback();
        let outcome = LocalSearchCore::run(&mut model, &mut neighborhood, &mut incumbent, &options, None, &callback, None);
        assert_eq!(outcome.termination_status, TerminationStatus::NoMove);
        assert!(outcome.moves_committed > 0);
        assert!(model.is_feasible());
    }

    #[test]
    fn stops_at_iteration_cap() {
        let mut model = knapsack_model();
        let mut neighborhood = Neighborhood::new();
        neighborhood.register(Box::new(SingleFlip));
        let mut incumbent = IncumbentHolder::new();
        let options = LocalSearchOptions {
            iteration_max: 0,
            ..LocalSearchOptions::default()
        };
        let callback = silent_callback();
        let outcome = LocalSearchCore::run(&mut model, &mut neighborhood, &mut incumbent, &options, None, &callback, None);
        assert_eq!(outcome.termination_status, TerminationStatus::IterationOver);
        assert_eq!(outcome.iterations, 0);
    }
}
