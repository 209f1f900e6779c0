//! The [`Model`]: variables, linear constraints, and a single linear
//! objective, owned exclusively by the model.
//!
//! Variables and constraints reference each other only through the stable
//! [`VariableId`]/[`ConstraintId`] indices of [`ids`], an arena design rather
//! than owning pointers or `Rc`/`RefCell`.

pub mod constraint;
pub mod expression;
pub mod ids;
pub mod variable;

pub use constraint::{Constraint, ConstraintTag, Sense};
pub use expression::Expression;
pub use ids::{ConstraintId, VariableId};
pub use variable::{Variable, VariableKind};

use crate::error::{Result, SolverError};
use crate::moves::Move;

/// Numerical tolerance used throughout the crate for floating-point
/// feasibility/violation comparisons.
pub const EPSILON: f64 = 1e-5;

/// Whether the model's single objective is minimized or maximized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptimizationSense {
    /// Minimize the objective.
    Minimize,
    /// Maximize the objective.
    Maximize,
}

impl OptimizationSense {
    /// `+1.0` for minimization, `-1.0` for maximization: the `sign` used by
    /// [`crate::evaluator::model_evaluator::ModelEvaluator`] so the core
    /// always "minimizes" internally.
    pub fn sign(self) -> f64 {
        match self {
            OptimizationSense::Minimize => 1.0,
            OptimizationSense::Maximize => -1.0,
        }
    }
}

/// A mixed-integer linear model: variables, linear constraints, and a
/// single linear objective.
#[derive(Debug, Clone)]
pub struct Model {
    sense: OptimizationSense,
    variables: Vec<Variable>,
    constraints: Vec<Constraint>,
    objective: Expression,
    global_penalty_coefficient: f64,

    objective_value: f64,
    total_violation: f64,
}

impl Model {
    /// Creates an empty model with no variables or constraints.
    pub fn new(sense: OptimizationSense) -> Self {
        Model {
            sense,
            variables: Vec::new(),
            constraints: Vec::new(),
            objective: Expression::default(),
            global_penalty_coefficient: 1.0,
            objective_value: 0.0,
            total_violation: 0.0,
        }
    }

    /// The optimization sense.
    pub fn sense(&self) -> OptimizationSense {
        self.sense
    }

    /// Adds a variable and returns its stable id.
    pub fn add_variable(
        &mut self,
        kind: VariableKind,
        initial_value: i64,
        lower_bound: i64,
        upper_bound: i64,
        objective_sensitivity: f64,
    ) -> VariableId {
        let id = VariableId(self.variables.len());
        self.variables.push(Variable::new(
            kind,
            initial_value,
            lower_bound,
            upper_bound,
            objective_sensitivity,
        ));
        self.objective_value += self.sense.sign() * objective_sensitivity * initial_value as f64;
        id
    }

    /// Adds a linear constraint `sense(Σ terms + constant)` and returns its
    /// stable id. Builds the variable → constraint back-edges for each term
    /// immediately (`setup_structure` only needs to be called again if the
    /// structural term set changes later, e.g. during presolve).
    pub fn add_constraint(
        &mut self,
        sense: Sense,
        terms: Vec<(VariableId, f64)>,
        constant: f64,
        tag: ConstraintTag,
    ) -> ConstraintId {
        let id = ConstraintId(self.constraints.len());
        let values: Vec<i64> = self.variables.iter().map(Variable::value).collect();
        let expression = Expression::new(terms.clone(), constant);
        let initial_value = expression.evaluate(&values);

        for &(variable_id, sensitivity) in &terms {
            self.variables[variable_id.index()].push_constraint_sensitivity(id, sensitivity);
        }

        let constraint = Constraint::new(
            sense,
            expression,
            initial_value,
            self.global_penalty_coefficient,
            tag,
        );
        self.total_violation += constraint.violation();
        self.constraints.push(constraint);
        id
    }

    /// Sets the initial local (and, as a default, global) penalty
    /// coefficient applied to future violations. Existing constraints keep
    /// their current coefficients; use [`Model::reset_penalty_coefficients`]
    /// to also reset them.
    pub fn set_initial_penalty_coefficient(&mut self, coefficient: f64) {
        self.global_penalty_coefficient = coefficient;
    }

    /// The (model-wide) global penalty coefficient used for the
    /// global-augmented objective.
    pub fn global_penalty_coefficient(&self) -> f64 {
        self.global_penalty_coefficient
    }

    /// Resets every constraint's local penalty coefficients back to the
    /// given default. Used by the controller's "Reset" action.
    pub fn reset_penalty_coefficients(&mut self, default: f64) {
        for constraint in &mut self.constraints {
            constraint.set_local_penalty_coefficient_leq(default);
            constraint.set_local_penalty_coefficient_geq(default);
        }
    }

    /// Rebuilds the variable → constraint back-edges from scratch. Needed
    /// only after a structural change to the constraint set (not needed for
    /// normal value updates, which mutate caches incrementally).
    pub fn setup_structure(&mut self) {
        for variable in &mut self.variables {
            variable.clear_constraint_sensitivities();
        }
        for (index, constraint) in self.constraints.iter().enumerate() {
            let constraint_id = ConstraintId(index);
            for &(variable_id, sensitivity) in constraint.expression().terms() {
                self.variables[variable_id.index()]
                    .push_constraint_sensitivity(constraint_id, sensitivity);
            }
        }
        self.recompute_caches_from_scratch();
    }

    /// Recomputes `objective_value` and `total_violation` from the current
    /// variable values, ignoring the incremental caches. Used for
    /// consistency checks and after [`Model::setup_structure`].
    pub fn recompute_caches_from_scratch(&mut self) {
        let values: Vec<i64> = self.variables.iter().map(Variable::value).collect();
        self.objective_value = self.sense.sign()
            * (self.objective.evaluate(&values)
                + self
                    .variables
                    .iter()
                    .map(|v| v.objective_sensitivity() * v.value() as f64)
                    .sum::<f64>());
        self.total_violation = 0.0;
        for constraint in &mut self.constraints {
            let value = constraint.expression().evaluate(&values);
            constraint.set_value(value);
            if constraint.is_enabled() {
                self.total_violation += constraint.violation();
            }
        }
    }

    /// All variables.
    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    /// All variables, mutably. Exposed for [`crate::memory::Memory`], the
    /// only other component allowed to mutate variable bookkeeping fields
    /// directly.
    pub fn variables_mut(&mut self) -> &mut [Variable] {
        &mut self.variables
    }

    /// A single variable.
    pub fn variable(&self, id: VariableId) -> &Variable {
        &self.variables[id.index()]
    }

    /// All constraints.
    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    /// All constraints, mutably. See [`Model::variables_mut`].
    pub fn constraints_mut(&mut self) -> &mut [Constraint] {
        &mut self.constraints
    }

    /// A single constraint.
    pub fn constraint(&self, id: ConstraintId) -> &Constraint {
        &self.constraints[id.index()]
    }

    /// Current values of every variable, indexed by [`VariableId`].
    pub fn values(&self) -> Vec<i64> {
        self.variables.iter().map(Variable::value).collect()
    }

    /// The objective value at the current assignment, sign-adjusted by
    /// [`OptimizationSense::sign`] so lower is always better regardless of
    /// `sense` — the convention every internal comparison and the augmented
    /// objectives below are built on. Use [`Model::reported_objective_value`]
    /// to recover the user-facing minimize-or-maximize value.
    pub fn objective_value(&self) -> f64 {
        self.objective_value
    }

    /// The user-facing objective value, un-adjusted back from the internal
    /// sign convention described on [`Model::objective_value`].
    pub fn reported_objective_value(&self) -> f64 {
        self.sense.sign() * self.objective_value
    }

    /// Sum of violation over all *enabled* constraints.
    pub fn total_violation(&self) -> f64 {
        self.total_violation
    }

    /// `total_violation <= EPSILON`.
    pub fn is_feasible(&self) -> bool {
        self.total_violation <= EPSILON
    }

    /// Sum over enabled constraints of `local_penalty_coefficient * violation`.
    pub fn local_penalty(&self) -> f64 {
        self.constraints
            .iter()
            .filter(|c| c.is_enabled())
            .map(|c| c.active_local_penalty_coefficient() * c.violation())
            .sum()
    }

    /// `total_violation * global_penalty_coefficient`.
    pub fn global_penalty(&self) -> f64 {
        self.total_violation * self.global_penalty_coefficient
    }

    /// `objective + local_penalty`.
    pub fn local_augmented_objective(&self) -> f64 {
        self.objective_value + self.local_penalty()
    }

    /// `objective + global_penalty`.
    pub fn global_augmented_objective(&self) -> f64 {
        self.objective_value + self.global_penalty()
    }

    /// Ids of constraints currently in violation.
    pub fn current_violative_constraint_ids(&self) -> Vec<ConstraintId> {
        self.constraints
            .iter()
            .enumerate()
            .filter(|(_, c)| c.is_enabled() && c.violation() > EPSILON)
            .map(|(i, _)| ConstraintId(i))
            .collect()
    }

    /// Fixes a variable at its current value; any later move altering it is
    /// an invariant violation.
    pub fn fix_variable(&mut self, id: VariableId) -> Result<()> {
        let variable = self
            .variables
            .get_mut(id.index())
            .ok_or(SolverError::UnknownIndex {
                kind: "variable",
                index: id.index(),
            })?;
        if variable.is_fixed() {
            return Err(SolverError::InvariantViolation(format!(
                "variable {id} is already fixed"
            )));
        }
        variable.set_fixed(true);
        Ok(())
    }

    /// Commits `mv`'s alterations: updates variable values and incrementally
    /// refreshes the objective and every touched constraint's cached value
    /// and violation, then recomputes
    /// improvability flags for the variables that could have changed.
    ///
    /// Panics (via `debug_assert!`) if `mv` would alter a fixed variable —
    /// this is a boundary-precondition violation the [`Neighborhood`][crate::neighborhood::Neighborhood]
    /// is responsible for never producing, not a recoverable runtime error.
    pub fn apply_move(&mut self, mv: &Move) {
        let mut touched_constraints: Vec<ConstraintId> = Vec::new();
        for alteration in mv.alterations() {
            let variable = &mut self.variables[alteration.variable.index()];
            debug_assert!(
                !variable.is_fixed(),
                "attempted to commit a move altering fixed variable {}",
                alteration.variable
            );
            let old_value = variable.value();
            let delta = (alteration.new_value - old_value) as f64;
            if delta == 0.0 {
                continue;
            }
            variable.set_value(alteration.new_value);
            self.objective_value += self.sense.sign() * variable.objective_sensitivity() * delta;

            let sensitivities: Vec<(ConstraintId, f64)> =
                variable.constraint_sensitivities().to_vec();
            for (constraint_id, sensitivity) in sensitivities {
                let constraint = &mut self.constraints[constraint_id.index()];
                if !constraint.is_enabled() || sensitivity == 0.0 {
                    continue;
                }
                let old_violation = constraint.violation();
                constraint.set_value(constraint.value() + sensitivity * delta);
                self.total_violation += constraint.violation() - old_violation;
                touched_constraints.push(constraint_id);
            }
        }
        touched_constraints.sort_unstable_by_key(ConstraintId::index);
        touched_constraints.dedup();
        self.recompute_improvability_flags(&touched_constraints);
    }

    /// Recomputes `is_objective_improvable`/`is_feasibility_improvable` for
    /// every variable touched by `touched_constraints` (feasibility) or by
    /// the objective (objective improvability is global, not scoped to any
    /// constraint set).
    fn recompute_improvability_flags(&mut self, touched_constraints: &[ConstraintId]) {
        let sense = self.sense;
        for variable in &mut self.variables {
            if variable.is_fixed() {
                variable.set_is_objective_improvable(false);
            } else {
                variable.set_is_objective_improvable(is_objective_improvable(variable, sense));
            }
        }
        let mut touched_variables: Vec<VariableId> = Vec::new();
        for &constraint_id in touched_constraints {
            for &(variable_id, _) in self.constraints[constraint_id.index()].expression().terms()
            {
                touched_variables.push(variable_id);
            }
        }
        touched_variables.sort_unstable_by_key(VariableId::index);
        touched_variables.dedup();
        for variable_id in touched_variables {
            let improvable = if self.variables[variable_id.index()].is_fixed() {
                false
            } else {
                is_feasibility_improvable(&self.variables[variable_id.index()], &self.constraints)
            };
            self.variables[variable_id.index()].set_is_feasibility_improvable(improvable);
        }
    }

    /// Full recomputation of feasibility-improvability for every variable,
    /// scoped to *all* currently-violated constraints (the "Soft"/
    /// "Aggressive" screening modes, as opposed to "Intensive" which only
    /// looks at the previously committed move's constraints via
    /// [`Model::apply_move`]'s incremental update).
    pub fn recompute_all_feasibility_improvability(&mut self) {
        for index in 0..self.variables.len() {
            let improvable = if self.variables[index].is_fixed() {
                false
            } else {
                is_feasibility_improvable(&self.variables[index], &self.constraints)
            };
            self.variables[index].set_is_feasibility_improvable(improvable);
        }
    }

    /// Adds a "no worse than the feasible incumbent" constraint and
    /// tightens variable bounds by simple interval propagation against it.
    /// Returns the ids of variables whose bounds actually narrowed, so
    /// callers can re-fix newly-implicit variables and refresh neighborhood
    /// caches.
    pub fn tighten_bounds_from_incumbent(&mut self, incumbent_objective: f64) -> Vec<VariableId> {
        let limit = match self.sense {
            OptimizationSense::Minimize => incumbent_objective,
            OptimizationSense::Maximize => -incumbent_objective,
        };
        // Interval propagation on `Σ sign * c_i x_i <= limit` (objective
        // restated so "better or equal" is always `<= limit`).
        let flip = matches!(self.sense, OptimizationSense::Maximize);
        let mut narrowed = Vec::new();
        for index in 0..self.variables.len() {
            let coefficient = {
                let v = &self.variables[index];
                if flip {
                    -v.objective_sensitivity()
                } else {
                    v.objective_sensitivity()
                }
            };
            if coefficient == 0.0 {
                continue;
            }
            let mut other_min = if flip { -self.objective.constant_value() } else { self.objective.constant_value() };
            for (other_index, other) in self.variables.iter().enumerate() {
                if other_index == index {
                    continue;
                }
                let c = if flip {
                    -other.objective_sensitivity()
                } else {
                    other.objective_sensitivity()
                };
                other_min += if c >= 0.0 {
                    c * other.lower_bound() as f64
                } else {
                    c * other.upper_bound() as f64
                };
            }
            let slack = limit - other_min;
            let variable = &mut self.variables[index];
            let (lower_bound, upper_bound) = if coefficient > 0.0 {
                (variable.lower_bound(), (slack / coefficient).floor() as i64)
            } else {
                ((slack / coefficient).ceil() as i64, variable.upper_bound())
            };
            let before = (variable.lower_bound(), variable.upper_bound());
            let new_lower = variable.lower_bound().max(lower_bound.min(variable.upper_bound()));
            let new_upper = variable.upper_bound().min(upper_bound.max(variable.lower_bound()));
            if (new_lower, new_upper) != before && new_lower <= new_upper {
                variable.tighten_bounds(new_lower, new_upper);
                narrowed.push(VariableId(index));
            }
        }
        narrowed
    }
}

pub(crate) fn is_objective_improvable(variable: &Variable, sense: OptimizationSense) -> bool {
    is_objective_improvable_at(variable, variable.value(), sense)
}

/// Like [`is_objective_improvable`], but evaluated against a hypothetical
/// `value` rather than the variable's current cached value. Lets
/// [`crate::evaluator::model_evaluator::ModelEvaluator`] answer "would this
/// variable still be objective-improvable after the candidate move" without
/// mutating the model.
pub(crate) fn is_objective_improvable_at(
    variable: &Variable,
    value: i64,
    sense: OptimizationSense,
) -> bool {
    let sensitivity = variable.objective_sensitivity();
    if sensitivity == 0.0 {
        return false;
    }
    // Direction that decreases `sensitivity * value` (minimization).
    let decreasing_needs_room_below = sensitivity > 0.0;
    let minimize_improvable = if decreasing_needs_room_below {
        value > variable.lower_bound()
    } else {
        value < variable.upper_bound()
    };
    match sense {
        OptimizationSense::Minimize => minimize_improvable,
        OptimizationSense::Maximize => {
            // Maximizing `sensitivity*value` is minimizing `-sensitivity*value`.
            if sensitivity > 0.0 {
                value < variable.upper_bound()
            } else {
                value > variable.lower_bound()
            }
        }
    }
}

pub(crate) fn is_feasibility_improvable(variable: &Variable, constraints: &[Constraint]) -> bool {
    is_feasibility_improvable_at(variable, variable.value(), constraints)
}

/// Like [`is_feasibility_improvable`], but evaluated against a hypothetical
/// `value`.
pub(crate) fn is_feasibility_improvable_at(
    variable: &Variable,
    value: i64,
    constraints: &[Constraint],
) -> bool {
    for &(constraint_id, sensitivity) in variable.constraint_sensitivities() {
        if sensitivity == 0.0 {
            continue;
        }
        let constraint = &constraints[constraint_id.index()];
        if !constraint.is_enabled() || constraint.violation() <= EPSILON {
            continue;
        }
        // Violation shrinks by moving `value` toward reducing |constraint value|.
        let required_delta_sign = -(constraint.value().signum()) * sensitivity.signum();
        let has_room = if required_delta_sign > 0.0 {
            value < variable.upper_bound()
        } else if required_delta_sign < 0.0 {
            value > variable.lower_bound()
        } else {
            false
        };
        if has_room {
            return true;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::moves::{Alteration, Move, MoveSense};

    fn knapsack_model() -> Model {
        // maximize 5x0 + 4x1 + 3x2 subject to 2x0 + 3x1 + 1x2 <= 4, binary.
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
    fn starts_feasible_and_at_zero_objective() {
        let model = knapsack_model();
        assert!(model.is_feasible());
        assert_eq!(model.objective_value(), 0.0);
        assert_eq!(model.total_violation(), 0.0);
    }

    #[test]
    fn apply_move_updates_objective_and_violation_incrementally() {
        let mut model = knapsack_model();
        let x0 = VariableId(0);
        let x1 = VariableId(1);
        let mv = Move::new(
            &model,
            vec![
                Alteration { variable: x0, new_value: 1 },
                Alteration { variable: x1, new_value: 1 },
            ],
            MoveSense::Binary,
        );
        model.apply_move(&mv);
        assert_eq!(model.objective_value(), -9.0);
        assert_eq!(model.reported_objective_value(), 9.0);
        // 2*1 + 3*1 + 1*0 - 4 = 1 > 0: violated by 1.
        assert_eq!(model.total_violation(), 1.0);
        assert!(!model.is_feasible());

        model.recompute_caches_from_scratch();
        assert_eq!(model.objective_value(), -9.0);
        assert_eq!(model.reported_objective_value(), 9.0);
        assert_eq!(model.total_violation(), 1.0);
    }

    #[test]
    fn fixing_an_already_fixed_variable_errors() {
        let mut model = knapsack_model();
        let x0 = VariableId(0);
        model.fix_variable(x0).unwrap();
        assert!(model.fix_variable(x0).is_err());
    }

    #[test]
    fn current_violative_constraint_ids_reports_only_violated() {
        let mut model = knapsack_model();
        assert!(model.current_violative_constraint_ids().is_empty());
        let mv = Move::new(
            &model,
            vec![Alteration { variable: VariableId(1), new_value: 1 }],
            MoveSense::Binary,
        );
        model.apply_move(&mv);
        let x2 = VariableId(2);
        let mv2 = Move::new(
            &model,
            vec![Alteration { variable: x2, new_value: 1 }],
            MoveSense::Binary,
        );
        model.apply_move(&mv2);
        assert_eq!(
            model.current_violative_constraint_ids(),
            vec![ConstraintId(0)]
        );
    }
}
