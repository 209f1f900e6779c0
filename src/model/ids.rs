//! Stable integer indices into the [`Model`][super::Model]'s arenas.
//!
//! Variables and constraints reference each other only by index, never by
//! pointer or `Rc`: the graph between them is cyclic (a variable knows which
//! constraints it touches, a constraint knows which variables it contains),
//! which is naturally expressed with arenas plus indices.

use std::fmt;

/// Index of a [`Variable`][super::variable::Variable] in a [`Model`][super::Model].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VariableId(pub usize);

/// Index of a [`Constraint`][super::constraint::Constraint] in a [`Model`][super::Model].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ConstraintId(pub usize);

impl VariableId {
    /// The underlying arena index.
    pub fn index(self) -> usize {
        self.0
    }
}

impl ConstraintId {
    /// The underlying arena index.
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for VariableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

impl fmt::Display for ConstraintId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "c{}", self.0)
    }
}
