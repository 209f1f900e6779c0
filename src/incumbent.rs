//! [`IncumbentHolder`]: the three best-known solutions plus a dual bound.

use crate::model::{Model, OptimizationSense};
use crate::score::SolutionScore;

/// Bitmask returned by [`IncumbentHolder::try_update`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IncumbentUpdate(u8);

impl IncumbentUpdate {
    /// No incumbent was updated.
    pub const NONE: IncumbentUpdate = IncumbentUpdate(0);
    /// The local-augmented incumbent was updated.
    pub const LOCAL: IncumbentUpdate = IncumbentUpdate(1 << 0);
    /// The global-augmented incumbent was updated.
    pub const GLOBAL: IncumbentUpdate = IncumbentUpdate(1 << 1);
    /// The feasible incumbent was updated.
    pub const FEASIBLE: IncumbentUpdate = IncumbentUpdate(1 << 2);

    fn union(self, other: IncumbentUpdate) -> IncumbentUpdate {
        IncumbentUpdate(self.0 | other.0)
    }

    /// Whether `self` contains all bits of `flag`.
    pub fn contains(self, flag: IncumbentUpdate) -> bool {
        self.0 & flag.0 == flag.0
    }

    /// Whether no bit is set.
    pub fn is_none(self) -> bool {
        self.0 == 0
    }
}

/// A tracked solution: its variable assignment and score.
#[derive(Debug, Clone)]
pub struct TrackedSolution {
    /// Variable values at the time this solution was recorded.
    pub values: Vec<i64>,
    /// The solution's score.
    pub score: SolutionScore,
}

/// Tracks the feasible-best, global-augmented-best, and local-augmented-best
/// solutions seen so far, plus a monotone dual bound.
#[derive(Debug, Clone, Default)]
pub struct IncumbentHolder {
    feasible: Option<TrackedSolution>,
    global_augmented: Option<TrackedSolution>,
    local_augmented: Option<TrackedSolution>,
    dual_bound: Option<f64>,
}

impl IncumbentHolder {
    /// An incumbent holder with nothing recorded yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// The feasible incumbent, if one has been found.
    pub fn feasible(&self) -> Option<&TrackedSolution> {
        self.feasible.as_ref()
    }

    /// The global-augmented-best incumbent.
    pub fn global_augmented(&self) -> Option<&TrackedSolution> {
        self.global_augmented.as_ref()
    }

    /// The local-augmented-best incumbent.
    pub fn local_augmented(&self) -> Option<&TrackedSolution> {
        self.local_augmented.as_ref()
    }

    /// The current dual bound, if any.
    pub fn dual_bound(&self) -> Option<f64> {
        self.dual_bound
    }

    /// Clears the local-augmented incumbent. Called at the start of each
    /// tabu-search round.
    pub fn reset_local_augmented(&mut self) {
        self.local_augmented = None;
    }

    /// Offers `values`/`score` (read from `model`'s current assignment) as a
    /// candidate for each of the three tracked incumbents. Returns a bitmask
    /// of which were updated; calling twice with an unchanged score is
    /// idempotent and returns [`IncumbentUpdate::NONE`] the second time.
    pub fn try_update(&mut self, model: &Model, score: SolutionScore) -> IncumbentUpdate {
        let mut update = IncumbentUpdate::NONE;
        let values = model.values();

        if score.is_feasible {
            let improves = self
                .feasible
                .as_ref()
                .map(|best| score.objective < best.score.objective)
                .unwrap_or(true);
            if improves {
                self.feasible = Some(TrackedSolution {
                    values: values.clone(),
                    score,
                });
                update = update.union(IncumbentUpdate::FEASIBLE);
            }
        }

        let improves_global = self
            .global_augmented
            .as_ref()
            .map(|best| score.global_augmented_objective < best.score.global_augmented_objective)
            .unwrap_or(true);
        if improves_global {
            self.global_augmented = Some(TrackedSolution {
                values: values.clone(),
                score,
            });
            update = update.union(IncumbentUpdate::GLOBAL);
        }

        let improves_local = self
            .local_augmented
            .as_ref()
            .map(|best| score.local_augmented_objective < best.score.local_augmented_objective)
            .unwrap_or(true);
        if improves_local {
            self.local_augmented = Some(TrackedSolution { values, score });
            update = update.union(IncumbentUpdate::LOCAL);
        }

        update
    }

    /// Offers a candidate dual bound, keeping the tightest: `max` for
    /// minimization, `min` for maximization.
    pub fn offer_dual_bound(&mut self, candidate: f64, sense: OptimizationSense) {
        self.dual_bound = Some(match (self.dual_bound, sense) {
            (None, _) => candidate,
            (Some(current), OptimizationSense::Minimize) => current.max(candidate),
            (Some(current), OptimizationSense::Maximize) => current.min(candidate),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ConstraintTag, OptimizationSense, Sense, VariableKind};

    fn feasible_score(objective: f64) -> SolutionScore {
        SolutionScore {
            objective,
            objective_improvement: 0.0,
            total_violation: 0.0,
            local_penalty: 0.0,
            global_penalty: 0.0,
            local_augmented_objective: objective,
            global_augmented_objective: objective,
            is_feasible: true,
            is_objective_improvable: false,
            is_feasibility_improvable: false,
        }
    }

    fn trivial_model() -> Model {
        let mut model = Model::new(OptimizationSense::Minimize);
        let x = model.add_variable(VariableKind::Binary, 0, 0, 1, 1.0);
        model.add_constraint(Sense::Equal, vec![(x, 1.0)], -1.0, ConstraintTag::Singleton);
        model
    }

    #[test]
    fn first_offer_updates_everything() {
        let model = trivial_model();
        let mut incumbent = IncumbentHolder::new();
        let update = incumbent.try_update(&model, feasible_score(5.0));
        assert!(update.contains(IncumbentUpdate::FEASIBLE));
        assert!(update.contains(IncumbentUpdate::GLOBAL));
        assert!(update.contains(IncumbentUpdate::LOCAL));
    }

    #[test]
    fn repeated_offer_is_idempotent() {
        let model = trivial_model();
        let mut incumbent = IncumbentHolder::new();
        incumbent.try_update(&model, feasible_score(5.0));
        let second = incumbent.try_update(&model, feasible_score(5.0));
        assert!(second.is_none());
    }

    #[test]
    fn worse_score_does_not_update() {
        let model = trivial_model();
        let mut incumbent = IncumbentHolder::new();
        incumbent.try_update(&model, feasible_score(3.0));
        let update = incumbent.try_update(&model, feasible_score(4.0));
        assert!(update.is_none());
        assert_eq!(incumbent.feasible().unwrap().score.objective, 3.0);
    }

    #[test]
    fn dual_bound_is_monotone_for_minimization() {
        let mut incumbent = IncumbentHolder::new();
        incumbent.offer_dual_bound(1.0, OptimizationSense::Minimize);
        incumbent.offer_dual_bound(0.5, OptimizationSense::Minimize);
        incumbent.offer_dual_bound(2.0, OptimizationSense::Minimize);
        assert_eq!(incumbent.dual_bound(), Some(2.0));
    }
}
