//! [`SolutionScore`]: the evaluation result produced by the
//! [`ModelEvaluator`][crate::evaluator::model_evaluator::ModelEvaluator] for
//! a move, or read off the current [`Model`][crate::model::Model] state.

/// A snapshot of how good a solution (or hypothetical post-move solution)
/// is, from every angle the core cares about.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolutionScore {
    /// The objective value, sign-adjusted by
    /// [`OptimizationSense::sign`][crate::model::OptimizationSense::sign] so
    /// lower is always better regardless of the model's actual sense. See
    /// [`crate::model::Model::objective_value`].
    pub objective: f64,
    /// `reference.objective - self.objective`: positive means improving,
    /// already in the sign-adjusted convention `objective` uses.
    pub objective_improvement: f64,
    /// Sum of violation over enabled constraints.
    pub total_violation: f64,
    /// Sum of `local_penalty_coefficient * violation` over enabled
    /// constraints.
    pub local_penalty: f64,
    /// `total_violation * global_penalty_coefficient`.
    pub global_penalty: f64,
    /// `objective + local_penalty`.
    pub local_augmented_objective: f64,
    /// `objective + global_penalty`.
    pub global_augmented_objective: f64,
    /// `total_violation <= EPSILON`.
    pub is_feasible: bool,
    /// Whether any variable has a further objective-improving alteration
    /// available.
    pub is_objective_improvable: bool,
    /// Whether any variable has a further feasibility-improving alteration
    /// available.
    pub is_feasibility_improvable: bool,
}

impl SolutionScore {
    /// Builds a score from a model's current cached state, with no
    /// reference solution to compare against (`objective_improvement` is
    /// `0.0`).
    pub fn from_model(model: &crate::model::Model) -> Self {
        SolutionScore {
            objective: model.objective_value(),
            objective_improvement: 0.0,
            total_violation: model.total_violation(),
            local_penalty: model.local_penalty(),
            global_penalty: model.global_penalty(),
            local_augmented_objective: model.local_augmented_objective(),
            global_augmented_objective: model.global_augmented_objective(),
            is_feasible: model.is_feasible(),
            is_objective_improvable: model.variables().iter().any(|v| v.is_objective_improvable()),
            is_feasibility_improvable: model
                .variables()
                .iter()
                .any(|v| v.is_feasibility_improvable()),
        }
    }

    /// A copy of `self` with `objective_improvement` computed relative to
    /// `reference`.
    pub fn with_improvement_relative_to(mut self, reference: &SolutionScore) -> Self {
        self.objective_improvement = reference.objective - self.objective;
        self
    }
}
