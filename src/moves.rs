//! [`Move`]: a candidate transition between solutions, as produced by a
//! [`Neighborhood`][crate::neighborhood::Neighborhood] and consumed by the
//! core for exactly one iteration.

use crate::model::{ConstraintId, Model, VariableId};

/// A single variable's new value within a [`Move`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Alteration {
    /// The variable to alter.
    pub variable: VariableId,
    /// Its value after the move.
    pub new_value: i64,
}

/// The kind of neighborhood a [`Move`] was produced by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveSense {
    /// A single 0/1 variable flip.
    Binary,
    /// A single integer variable step.
    Integer,
    /// A selection-group swap (one "1" bit moves to another member).
    Selection,
    /// A compound move fused from two recent moves on disjoint variables.
    Chain,
    /// Two ordinary binary flips bundled as one transition.
    TwoFlip,
    /// A move kind supplied entirely by an external, user-defined generator.
    UserDefined,
}

/// A candidate transition: an ordered list of variable-value alterations,
/// tagged with its originating neighborhood kind and the constraints it
/// touches.
#[derive(Debug, Clone)]
pub struct Move {
    alterations: Vec<Alteration>,
    sense: MoveSense,
    related_constraints: Vec<ConstraintId>,
    is_available: bool,
    overlap_rate: f64,
}

impl Move {
    /// Creates a move from its alterations and sense, computing its related
    /// constraints (the union of constraints touching any altered variable)
    /// from `model`.
    ///
    /// # Panics (debug only)
    /// Zero-alteration moves are illegal and must be rejected at
    /// enumeration, never constructed.
    pub fn new(model: &Model, alterations: Vec<Alteration>, sense: MoveSense) -> Self {
        debug_assert!(
            !alterations.is_empty(),
            "a move must alter at least one variable"
        );
        let mut related_constraints: Vec<ConstraintId> = Vec::new();
        for alteration in &alterations {
            for &(constraint_id, _) in model
                .variable(alteration.variable)
                .constraint_sensitivities()
            {
                related_constraints.push(constraint_id);
            }
        }
        related_constraints.sort_unstable_by_key(ConstraintId::index);
        related_constraints.dedup();
        Move {
            alterations,
            sense,
            related_constraints,
            is_available: true,
            overlap_rate: 0.0,
        }
    }

    /// Builds a move from already-known related constraints, skipping the
    /// lookup in `Move::new`. Used by chain-move synthesis, which already
    /// has both fused moves' related constraints on hand.
    pub fn with_related_constraints(
        alterations: Vec<Alteration>,
        sense: MoveSense,
        related_constraints: Vec<ConstraintId>,
    ) -> Self {
        debug_assert!(
            !alterations.is_empty(),
            "a move must alter at least one variable"
        );
        Move {
            alterations,
            sense,
            related_constraints,
            is_available: true,
            overlap_rate: 0.0,
        }
    }

    /// The ordered list of variable-value alterations.
    pub fn alterations(&self) -> &[Alteration] {
        &self.alterations
    }

    /// The move's originating neighborhood kind.
    pub fn sense(&self) -> MoveSense {
        self.sense
    }

    /// The union of constraints touching any altered variable.
    pub fn related_constraints(&self) -> &[ConstraintId] {
        &self.related_constraints
    }

    /// Whether the move alters exactly one variable.
    pub fn is_univariable_move(&self) -> bool {
        self.alterations.len() == 1
    }

    /// Whether the move is a selection-group swap.
    pub fn is_selection_move(&self) -> bool {
        matches!(self.sense, MoveSense::Selection)
    }

    /// Whether the move came from a special (non-Binary/Integer/Selection)
    /// neighborhood.
    pub fn is_special_neighborhood_move(&self) -> bool {
        matches!(
            self.sense,
            MoveSense::Chain | MoveSense::TwoFlip | MoveSense::UserDefined
        )
    }

    /// Whether the move may still be chosen this round. Special-neighborhood
    /// moves are marked unavailable once committed, to prevent reuse within
    /// the same round.
    pub fn is_available(&self) -> bool {
        self.is_available
    }

    pub(crate) fn set_is_available(&mut self, value: bool) {
        self.is_available = value;
    }

    /// Fraction of variables shared with the move it was fused from (chain
    /// moves only; `0.0` otherwise).
    pub fn overlap_rate(&self) -> f64 {
        self.overlap_rate
    }

    pub(crate) fn set_overlap_rate(&mut self, value: f64) {
        self.overlap_rate = value;
    }

    /// Whether `self` and `other` share no altered variable: a precondition
    /// for chain-move fusion.
    pub fn has_disjoint_variables(&self, other: &Move) -> bool {
        self.alterations
            .iter()
            .all(|a| other.alterations.iter().all(|b| a.variable != b.variable))
    }

    /// Fuses `self` (the previous move) and `next` (the current move) into
    /// a single chain move. Returns `None` if the two moves share a
    /// variable. Canonicalizes the fused alteration order by the smaller
    /// [`VariableId`] first.
    pub fn fuse_chain(&self, next: &Move, overlap_rate: f64) -> Option<Move> {
        if !self.has_disjoint_variables(next) {
            return None;
        }
        let mut alterations: Vec<Alteration> = self
            .alterations
            .iter()
            .chain(next.alterations.iter())
            .copied()
            .collect();
        alterations.sort_unstable_by_key(|a| a.variable);

        let mut related_constraints: Vec<ConstraintId> = self
            .related_constraints
            .iter()
            .chain(next.related_constraints.iter())
            .copied()
            .collect();
        related_constraints.sort_unstable_by_key(ConstraintId::index);
        related_constraints.dedup();

        let mut fused = Move::with_related_constraints(alterations, MoveSense::Chain, related_constraints);
        fused.overlap_rate = overlap_rate;
        Some(fused)
    }

    /// Builds the inverse of a chain move: the same altered variables
    /// restored to the values given in `previous_values` (one entry per
    /// altered variable, same order as `self.alterations()`). Registered
    /// alongside the forward fused move so the neighborhood can offer
    /// "undo the chain" as a candidate too.
    pub fn chain_inverse(&self, previous_values: &[i64]) -> Move {
        debug_assert_eq!(previous_values.len(), self.alterations.len());
        let alterations = self
            .alterations
            .iter()
            .zip(previous_values.iter())
            .map(|(alteration, &previous_value)| Alteration {
                variable: alteration.variable,
                new_value: previous_value,
            })
            .collect();
        let mut inverse = Move::with_related_constraints(
            alterations,
            self.sense,
            self.related_constraints.clone(),
        );
        inverse.overlap_rate = self.overlap_rate;
        inverse
    }
}
