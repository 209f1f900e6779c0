//! Linear expressions shared by the objective and constraints.

use super::ids::VariableId;

/// A linear combination of variables plus a constant: `Σ coefficient_i * x_i + constant`.
#[derive(Debug, Clone, Default)]
pub struct Expression {
    terms: Vec<(VariableId, f64)>,
    constant: f64,
}

impl Expression {
    /// Creates a new expression from explicit terms and a constant.
    pub fn new(terms: Vec<(VariableId, f64)>, constant: f64) -> Self {
        Expression { terms, constant }
    }

    /// An expression that is just a constant.
    pub fn constant(constant: f64) -> Self {
        Expression {
            terms: Vec::new(),
            constant,
        }
    }

    /// The `(variable, sensitivity)` terms of the expression.
    pub fn terms(&self) -> &[(VariableId, f64)] {
        &self.terms
    }

    /// The constant summand.
    pub fn constant_value(&self) -> f64 {
        self.constant
    }

    /// The sensitivity (coefficient) of `variable` in this expression, or
    /// `0.0` if it does not appear.
    pub fn sensitivity_of(&self, variable: VariableId) -> f64 {
        self.terms
            .iter()
            .find(|(id, _)| *id == variable)
            .map(|(_, c)| *c)
            .unwrap_or(0.0)
    }

    /// Evaluates the expression against a full assignment of variable values.
    pub fn evaluate(&self, values: &[i64]) -> f64 {
        self.terms
            .iter()
            .map(|(id, coefficient)| coefficient * values[id.index()] as f64)
            .sum::<f64>()
            + self.constant
    }
}
