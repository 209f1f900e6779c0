//! Enumerated option values.

use serde::{Deserialize, Serialize};

/// Tabu permissibility mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TabuMode {
    /// A move is tabu only if *every* altered variable is still tagged.
    All,
    /// A move is tabu if *any* altered variable is still tagged.
    Any,
}

impl Default for TabuMode {
    fn default() -> Self {
        TabuMode::Any
    }
}

/// Improvability pre-filter applied before move evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImprovabilityScreeningMode {
    /// Generate all moves, no pre-filter.
    Off,
    /// Feasible: objective-improvable only. Infeasible: objective- or
    /// feasibility-improvable.
    Soft,
    /// Feasible: objective-improvable only. Infeasible: feasibility-improvable
    /// only.
    Aggressive,
    /// Like `Aggressive`, but feasibility improvability is only recomputed
    /// over the constraints touched by the previously committed move.
    Intensive,
    /// Controller picks among the above based on run state.
    Automatic,
}

impl Default for ImprovabilityScreeningMode {
    fn default() -> Self {
        ImprovabilityScreeningMode::Off
    }
}

/// How the chain-move pool is pruned down to `chain_move_capacity`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChainMoveReduceMode {
    /// Drop the highest-overlap moves first.
    OverlapRate,
    /// Drop a random subset.
    Shuffle,
}

impl Default for ChainMoveReduceMode {
    fn default() -> Self {
        ChainMoveReduceMode::OverlapRate
    }
}

/// Logging verbosity. Mapped onto
/// `log`-crate levels by [`crate::callback`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Verbosity {
    /// No solver logging at all.
    Off,
    /// Only warnings (e.g. penalty-coefficient-too-large resets).
    Warning,
    /// Once per controller (outer) iteration.
    Outer,
    /// Once per core (inner) iteration.
    Inner,
    /// Inner plus per-move evaluation detail.
    Full,
    /// Everything, including memory/intensity internals.
    Debug,
}

impl Default for Verbosity {
    fn default() -> Self {
        Verbosity::Warning
    }
}
