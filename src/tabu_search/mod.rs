//! Tabu search: the core inner loop ([`core`]) and the adaptive outer
//! controller that runs it round after round ([`controller`]).

pub mod controller;
pub mod core;

pub use controller::{NextRoundPlan, PenaltyAction, TabuSearchController};
pub use core::{RoundOutcome, TabuSearchCore};
