//! [`MoveEvaluator`]: scores a candidate move's tabu standing.

use crate::model::Model;
use crate::moves::{Move, MoveSense};
use crate::options::TabuMode;

/// A move's tabu-related score: whether it is currently permissible, plus
/// the frequency and Lagrangian penalties to fold into its selection score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MoveScore {
    /// Whether the tabu memory currently allows this move.
    pub is_permissible: bool,
    /// `(Σ altered_var.update_count) / total_update_count * frequency_penalty_coefficient`.
    pub frequency_penalty: f64,
    /// `Σ (v.lagrangian_coefficient * Δv) * lagrangian_penalty_coefficient`,
    /// zero unless the Lagrangian-dual phase is active.
    pub lagrangian_penalty: f64,
}

/// Stateless scorer; every call takes the model/iteration context it needs.
pub struct MoveEvaluator;

impl MoveEvaluator {
    /// Scores `mv`'s tabu standing at `iteration`, against `tabu_tenure`
    /// under `mode`.
    ///
    /// **Permissibility**: a variable is still tagged if it was last
    /// updated at or after `iteration - tabu_tenure`; under `All`, a
    /// (non-selection) move is tabu iff *every* altered variable is still
    /// tagged, under `Any` iff *any* altered variable is. Selection moves
    /// bypass the `All` branch and use the `Any` rule, confirmed against the
    /// original `compute_permissibility`.
    pub fn evaluate(
        model: &Model,
        mv: &Move,
        iteration: i64,
        tabu_tenure: i64,
        mode: TabuMode,
        frequency_penalty_coefficient: f64,
        lagrangian_penalty_coefficient: f64,
        lagrange_dual_enabled: bool,
    ) -> MoveScore {
        let is_permissible = !Self::is_tabu(model, mv, iteration, tabu_tenure, mode);
        let frequency_penalty =
            Self::compute_frequency_penalty(model, mv, frequency_penalty_coefficient);
        let lagrangian_penalty = if lagrange_dual_enabled {
            Self::compute_lagrangian_penalty(model, mv, lagrangian_penalty_coefficient)
        } else {
            0.0
        };
        MoveScore {
            is_permissible,
            frequency_penalty,
            lagrangian_penalty,
        }
    }

    fn is_tabu(model: &Model, mv: &Move, iteration: i64, tabu_tenure: i64, mode: TabuMode) -> bool {
        let duration = iteration - tabu_tenure;
        let use_any = mv.is_selection_move() || mode == TabuMode::Any;
        if use_any {
            // Tabu iff *any* altered variable is still tagged.
            mv.alterations().iter().any(|alteration| {
                model.variable(alteration.variable).local_last_update_iteration() >= duration
            })
        } else {
            // All: tabu iff *every* altered variable is still tagged.
            mv.alterations().iter().all(|alteration| {
                model.variable(alteration.variable).local_last_update_iteration() >= duration
            })
        }
    }

    fn compute_frequency_penalty(model: &Model, mv: &Move, coefficient: f64) -> f64 {
        let total_update_count: u64 = model.variables().iter().map(|v| v.update_count()).sum();
        if total_update_count == 0 {
            return 0.0;
        }
        let altered_update_count: u64 = mv
            .alterations()
            .iter()
            .map(|a| model.variable(a.variable).update_count())
            .sum();
        (altered_update_count as f64 / total_update_count as f64) * coefficient
    }

    fn compute_lagrangian_penalty(model: &Model, mv: &Move, coefficient: f64) -> f64 {
        mv.alterations()
            .iter()
            .map(|alteration| {
                let variable = model.variable(alteration.variable);
                let delta = (alteration.new_value - variable.value()) as f64;
                variable.lagrangian_coefficient() * delta
            })
            .sum::<f64>()
            * coefficient
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{OptimizationSense, VariableId, VariableKind};
    use crate::moves::Alteration;

    fn two_variable_model() -> Model {
        let mut model = Model::new(OptimizationSense::Minimize);
        model.add_variable(VariableKind::Binary, 0, 0, 1, 1.0);
        model.add_variable(VariableKind::Binary, 0, 0, 1, 1.0);
        model
    }

    #[test]
    fn fresh_model_has_no_tabu_moves() {
        let model = two_variable_model();
        let mv = Move::new(
            &model,
            vec![Alteration { variable: VariableId(0), new_value: 1 }],
            MoveSense::Binary,
        );
        let score = MoveEvaluator::evaluate(&model, &mv, 0, 0, TabuMode::Any, 0.0, 0.0, false);
        assert!(score.is_permissible);
    }

    #[test]
    fn any_mode_blocks_recently_touched_variable() {
        let mut model = two_variable_model();
        let mv = Move::new(
            &model,
            vec![Alteration { variable: VariableId(0), new_value: 1 }],
            MoveSense::Binary,
        );
        model.apply_move(&mv);
        model.variables_mut()[0].set_local_last_update_iteration(5);

        let undo = Move::new(
            &model,
            vec![Alteration { variable: VariableId(0), new_value: 0 }],
            MoveSense::Binary,
        );
        let score = MoveEvaluator::evaluate(&model, &undo, 3, 0, TabuMode::Any, 0.0, 0.0, false);
        assert!(!score.is_permissible);

        let score_later = MoveEvaluator::evaluate(&model, &undo, 6, 0, TabuMode::Any, 0.0, 0.0, false);
        assert!(score_later.is_permissible);
    }

    #[test]
    fn all_mode_requires_every_variable_tagged() {
        let mut model = two_variable_model();
        model.variables_mut()[0].set_local_last_update_iteration(10);
        // variable 1 untagged (sentinel, far in the past).
        let mv = Move::new(
            &model,
            vec![
                Alteration { variable: VariableId(0), new_value: 1 },
                Alteration { variable: VariableId(1), new_value: 1 },
            ],
            MoveSense::Chain,
        );
        let score = MoveEvaluator::evaluate(&model, &mv, 3, 0, TabuMode::All, 0.0, 0.0, false);
        assert!(score.is_permissible);
    }

    #[test]
    fn tabu_tenure_extends_the_forbidden_window() {
        let mut model = two_variable_model();
        model.variables_mut()[0].set_local_last_update_iteration(5);
        let mv = Move::new(
            &model,
            vec![Alteration { variable: VariableId(0), new_value: 1 }],
            MoveSense::Binary,
        );

        // duration = iteration - tenure = 9 - 4 = 5, still >= 5: tabu.
        let still_tabu = MoveEvaluator::evaluate(&model, &mv, 9, 4, TabuMode::Any, 0.0, 0.0, false);
        assert!(!still_tabu.is_permissible);

        // duration = 10 - 4 = 6 > 5: no longer tabu.
        let expired = MoveEvaluator::evaluate(&model, &mv, 10, 4, TabuMode::Any, 0.0, 0.0, false);
        assert!(expired.is_permissible);

        // Without the tenure offset (tenure 0), iteration 9 alone would already
        // have let the move through; the tenure is what keeps it tabu.
        let without_tenure = MoveEvaluator::evaluate(&model, &mv, 9, 0, TabuMode::Any, 0.0, 0.0, false);
        assert!(without_tenure.is_permissible);
    }
}
