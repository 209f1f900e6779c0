#![warn(missing_docs)]
//! A tabu-search metaheuristic core for mixed-integer programs (MIP) with
//! integer and binary decision variables and linear constraints.
//!
//! # Overview
//!
//! Given a [`model::Model`] (objective + linear constraints) and a
//! [`neighborhood::Neighborhood`] of move generators, the [`solver::Solver`]
//! searches for a feasible solution minimizing (or maximizing) the objective
//! by running, in order:
//!
//! 1. an optional Lagrangian-dual warm start ([`lagrange_dual::LagrangeDualCore`]),
//! 2. an optional greedy local-search phase ([`local_search::LocalSearchCore`]),
//! 3. repeated rounds of tabu search ([`tabu_search::core::TabuSearchCore`]),
//!    coordinated by an adaptive outer controller
//!    ([`tabu_search::controller::TabuSearchController`]) that tunes tabu
//!    tenure, penalty coefficients, the initial solution of the next round,
//!    and which special neighborhoods are enabled.
//!
//! This crate implements the search engine only. Move *enumeration* for
//! concrete neighborhood kinds (binary flip, integer step, selection swap,
//! chain moves, ...), file-format readers/writers, a modeling DSL, presolve,
//! and an LP relaxation solver are external collaborators, reached only
//! through the [`neighborhood::Neighborhood`] and [`neighborhood::MoveGenerator`]
//! traits.
//!
//! # How to use this library
//!
//! 1. Build a [`model::Model`] (variables, linear constraints, a linear
//!    objective).
//! 2. Implement [`neighborhood::MoveGenerator`] for each move kind you need
//!    and assemble them into a [`neighborhood::Neighborhood`].
//! 3. Configure [`options::Options`] (or use [`options::Options::default`]).
//! 4. Build a [`solver::Solver`] and call [`solver::Solver::solve`].

pub mod archive;
pub mod callback;
pub mod error;
pub mod evaluator;
pub mod incumbent;
pub mod lagrange_dual;
pub mod local_search;
pub mod memory;
pub mod model;
pub mod moves;
pub mod neighborhood;
pub mod options;
pub mod parallel_tuning;
pub mod result;
pub mod score;
pub mod solver;
pub mod tabu_search;

pub use error::{Result, SolverError};
pub use model::Model;
pub use options::Options;
pub use result::{SolverResult, TerminationStatus};
pub use solver::Solver;
