//! The [`Constraint`] type: a signed linear constraint.

use super::expression::Expression;

/// The sense (direction) of a linear constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sense {
    /// `expression <= 0`.
    LessEqual,
    /// `expression == 0`.
    Equal,
    /// `expression >= 0`.
    GreaterEqual,
}

/// Classification tag used only by (external, out-of-scope) presolve. The
/// core never branches on it; it is carried purely for inspection/debugging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ConstraintTag {
    /// No special structure recognized.
    #[default]
    General,
    /// A constraint on a single variable.
    Singleton,
    /// An "exactly one" / "at most one" set-partitioning constraint.
    SetPartitioning,
    /// A knapsack-shaped constraint (all coefficients same sign).
    Knapsack,
}

/// A linear constraint `sense(expression)`, e.g. `expression <= 0`.
///
/// Violation is measured as the amount by which `expression` exceeds zero on
/// the forbidden side: for `LessEqual`, `max(0, expression)`; for
/// `GreaterEqual`, `max(0, -expression)`; for `Equal`, `|expression|`.
#[derive(Debug, Clone)]
pub struct Constraint {
    sense: Sense,
    expression: Expression,
    value: f64,
    violation: f64,
    enabled: bool,

    /// Local penalty coefficient applied when the constraint is violated on
    /// its `<=` side (i.e. `expression > 0`).
    local_penalty_coefficient_leq: f64,
    /// Local penalty coefficient applied when the constraint is violated on
    /// its `>=` side (i.e. `expression < 0`).
    local_penalty_coefficient_geq: f64,

    violation_count: u64,
    tag: ConstraintTag,
}

impl Constraint {
    pub(crate) fn new(
        sense: Sense,
        expression: Expression,
        initial_value: f64,
        initial_penalty_coefficient: f64,
        tag: ConstraintTag,
    ) -> Self {
        let mut constraint = Constraint {
            sense,
            expression,
            value: initial_value,
            violation: 0.0,
            enabled: true,
            local_penalty_coefficient_leq: initial_penalty_coefficient,
            local_penalty_coefficient_geq: initial_penalty_coefficient,
            violation_count: 0,
            tag,
        };
        constraint.violation = constraint.compute_violation(initial_value);
        constraint
    }

    /// The constraint's sense.
    pub fn sense(&self) -> Sense {
        self.sense
    }

    /// The constraint's linear expression.
    pub fn expression(&self) -> &Expression {
        &self.expression
    }

    /// The expression's value at the current variable assignment.
    pub fn value(&self) -> f64 {
        self.value
    }

    /// How much the constraint is currently violated (`0.0` if satisfied).
    pub fn violation(&self) -> f64 {
        self.violation
    }

    /// Computes the violation magnitude for a hypothetical expression value,
    /// without mutating the constraint.
    pub fn compute_violation(&self, value: f64) -> f64 {
        match self.sense {
            Sense::LessEqual => value.max(0.0),
            Sense::GreaterEqual => (-value).max(0.0),
            Sense::Equal => value.abs(),
        }
    }

    /// Sets the cached value and recomputes the cached violation from it.
    /// Called by [`Model::apply_move`][super::Model::apply_move] to keep the
    /// cached value and violation consistent with each other.
    pub(crate) fn set_value(&mut self, value: f64) {
        self.value = value;
        self.violation = self.compute_violation(value);
    }

    /// Whether the constraint currently participates in evaluation (a
    /// disabled constraint never contributes violation or penalty).
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub(crate) fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Local penalty coefficient for the side currently relevant
    /// (`<=`-side if `expression > 0`, `>=`-side if `expression < 0`).
    pub fn active_local_penalty_coefficient(&self) -> f64 {
        if self.value >= 0.0 {
            self.local_penalty_coefficient_leq
        } else {
            self.local_penalty_coefficient_geq
        }
    }

    /// Local penalty coefficient for the `<=` side.
    pub fn local_penalty_coefficient_leq(&self) -> f64 {
        self.local_penalty_coefficient_leq
    }

    /// Local penalty coefficient for the `>=` side.
    pub fn local_penalty_coefficient_geq(&self) -> f64 {
        self.local_penalty_coefficient_geq
    }

    pub(crate) fn set_local_penalty_coefficient_leq(&mut self, value: f64) {
        self.local_penalty_coefficient_leq = value;
    }

    pub(crate) fn set_local_penalty_coefficient_geq(&mut self, value: f64) {
        self.local_penalty_coefficient_geq = value;
    }

    pub(crate) fn scale_local_penalty_coefficients(&mut self, factor: f64) {
        self.local_penalty_coefficient_leq *= factor;
        self.local_penalty_coefficient_geq *= factor;
    }

    /// How many times this constraint has been violative right after a
    /// committed move. Feeds the dual-intensity scalar.
    pub fn violation_count(&self) -> u64 {
        self.violation_count
    }

    pub(crate) fn increment_violation_count(&mut self) {
        self.violation_count += 1;
    }

    pub(crate) fn reset_violation_count(&mut self) {
        self.violation_count = 0;
    }

    /// Presolve-only classification tag.
    pub fn tag(&self) -> ConstraintTag {
        self.tag
    }
}
