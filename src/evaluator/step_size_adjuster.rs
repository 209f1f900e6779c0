//! [`IntegerStepSizeAdjuster`]: widens an improving single-step integer move
//! into the best step in the same direction.

use crate::evaluator::model_evaluator::ModelEvaluator;
use crate::model::Model;
use crate::moves::{Alteration, Move, MoveSense};
use crate::score::SolutionScore;

/// Stateless; every call takes the model and pre-move reference score it
/// needs.
pub struct IntegerStepSizeAdjuster;

impl IntegerStepSizeAdjuster {
    /// Given an improving move that steps a single integer variable by ±1,
    /// searches for the best step in the same direction:
    /// 1. **Exponential probe**: try step 2, 4, 8, … until the
    ///    global-augmented objective stops improving or a bound is hit.
    /// 2. **Binary refine** between the last-improving and first-non-improving
    ///    steps.
    ///
    /// Each trial costs `O(|related constraints|)` via
    /// [`ModelEvaluator::evaluate_multi`] against the pre-move `reference`.
    /// Returns the best single-variable move found (never worse than `mv`).
    pub fn adjust(model: &Model, reference: &SolutionScore, mv: &Move) -> Move {
        debug_assert!(mv.is_univariable_move());
        let alteration = mv.alterations()[0];
        let variable_id = alteration.variable;
        let variable = model.variable(variable_id);
        let base_value = variable.value();
        let direction = (alteration.new_value - base_value).signum();
        if direction == 0 {
            return mv.clone();
        }
        let (lower, upper) = (variable.lower_bound(), variable.upper_bound());

        let score_at = |value: i64| -> SolutionScore {
            let trial = Move::with_related_constraints(
                vec![Alteration { variable: variable_id, new_value: value }],
                MoveSense::Integer,
                mv.related_constraints().to_vec(),
            );
            ModelEvaluator::evaluate_multi(model, reference, &trial)
        };

        let mut best_value = alteration.new_value;
        let mut best_score = score_at(best_value);

        let mut step: i64 = 2;
        let mut last_improving_value = best_value;
        let mut first_non_improving_value: Option<i64> = None;
        loop {
            let candidate = base_value + direction * step;
            if candidate < lower || candidate > upper {
                break;
            }
            let candidate_score = score_at(candidate);
            if candidate_score.global_augmented_objective < best_score.global_augmented_objective {
                best_value = candidate;
                best_score = candidate_score;
                last_improving_value = candidate;
                step *= 2;
            } else {
                first_non_improving_value = Some(candidate);
                break;
            }
        }

        if let Some(mut hi) = first_non_improving_value {
            let mut lo = last_improving_value;
            while (hi - lo).abs() > 1 {
                let mid = lo + (hi - lo) / 2;
                if mid == lo || mid == hi {
                    break;
                }
                let mid_score = score_at(mid);
                if mid_score.global_augmented_objective < best_score.global_augmented_objective {
                    lo = mid;
                    best_value = mid;
                    best_score = mid_score;
                } else {
                    hi = mid;
                }
            }
        }

        Move::with_related_constraints(
            vec![Alteration { variable: variable_id, new_value: best_value }],
            MoveSense::Integer,
            mv.related_constraints().to_vec(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ConstraintTag, OptimizationSense, Sense, VariableKind};

    use crate::model::VariableId;

    /// `min x` subject to `x >= 37` (violated initially at `x = 0`),
    /// modeled purely linearly.
    fn threshold_penalty_model() -> Model {
        let mut model = Model::new(OptimizationSense::Minimize);
        model.set_initial_penalty_coefficient(5.0);
        let x = model.add_variable(VariableKind::Integer, 0, 0, 100, 1.0);
        model.add_constraint(Sense::GreaterEqual, vec![(x, 1.0)], -37.0, ConstraintTag::General);
        model
    }

    #[test]
    fn widens_step_toward_a_much_better_value() {
        let model = threshold_penalty_model();
        let reference = SolutionScore::from_model(&model);
        let base_move = Move::new(
            &model,
            vec![Alteration { variable: VariableId(0), new_value: 1 }],
            MoveSense::Integer,
        );
        let base_score = ModelEvaluator::evaluate_multi(&model, &reference, &base_move);
        let adjusted = IntegerStepSizeAdjuster::adjust(&model, &reference, &base_move);
        let adjusted_score = ModelEvaluator::evaluate_multi(&model, &reference, &adjusted);

        assert!(adjusted_score.global_augmented_objective < base_score.global_augmented_objective);
        // The exponential probe should have reached well past the halfway
        // point toward the threshold, not stalled near the base step.
        assert!(adjusted.alterations()[0].new_value >= 16);
    }
}
