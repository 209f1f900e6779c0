//! [`SolverResult`]: everything the caller gets back from
//! [`crate::solver::Solver::solve`].

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::{Result, SolverError};
use crate::model::Model;

/// Why a phase (or the whole solve) stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TerminationStatus {
    /// The phase's wall-clock budget ran out.
    TimeOver,
    /// The phase's iteration budget ran out.
    IterationOver,
    /// The neighborhood produced no candidate moves.
    NoMove,
    /// `general.target_objective_value` was reached or beaten.
    ReachTarget,
    /// The caller's interrupt callback requested an early stop.
    EarlyStop,
    /// No improving move exists and the incumbent is feasible: a local (or,
    /// for a convex-enough neighborhood, global) optimum.
    Optimal,
    /// Local penalty coefficients grew far past what any feasible
    /// improvement could justify.
    PenaltyCoefficientTooLarge,
}

/// Per-phase summary recorded into [`SolverResult::phases`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseStats {
    /// The phase's name (`"lagrange_dual"`, `"local_search"`, or
    /// `"tabu_search[n]"` for the n-th round).
    pub phase: String,
    /// Iterations the phase actually ran.
    pub iterations: u64,
    /// Wall-clock time the phase actually ran, in seconds.
    pub elapsed_seconds: f64,
    /// Why the phase stopped.
    pub termination_status: TerminationStatus,
    /// The objective value at the end of the phase.
    pub objective_value: f64,
    /// Whether the model was feasible at the end of the phase.
    pub is_feasible: bool,
}

/// A single row of the optional trend log: one snapshot per outer iteration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendRecord {
    /// The phase this row belongs to.
    pub phase: String,
    /// Iteration counter within the phase.
    pub iteration: u64,
    /// Objective value at this iteration.
    pub objective_value: f64,
    /// Global-augmented objective value at this iteration.
    pub global_augmented_objective: f64,
    /// Whether the model was feasible at this iteration.
    pub is_feasible: bool,
}

/// The final outcome of a solve: the incumbent solution, feasibility, and
/// enough metadata to reconstruct how the run went.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolverResult {
    /// The best feasible solution's variable values, if one was found
    /// (otherwise the best infeasible solution by global-augmented
    /// objective).
    pub values: Vec<i64>,
    /// That solution's objective value.
    pub objective_value: f64,
    /// That solution's total constraint violation (`0.0` if feasible).
    pub total_violation: f64,
    /// Whether `values` is feasible.
    pub is_feasible: bool,
    /// The best known dual bound, if the Lagrangian-dual phase ran.
    pub dual_bound: Option<f64>,
    /// Per-phase summaries, in the order the phases ran.
    pub phases: Vec<PhaseStats>,
    /// Total wall-clock time across every phase, in seconds.
    pub elapsed_seconds: f64,
    /// Why the solve as a whole stopped (the last phase's status).
    pub termination_status: TerminationStatus,
    /// Final `(leq, geq)` local penalty coefficients, indexed by constraint.
    pub final_penalty_coefficients: Vec<(f64, f64)>,
    /// Final update count, indexed by variable.
    pub variable_update_counts: Vec<u64>,
    /// Final violation count, indexed by constraint.
    pub constraint_violation_counts: Vec<u64>,
    /// Archived feasible solutions, if `output.is_enabled_store_feasible_solutions`.
    pub feasible_archive: Vec<Vec<i64>>,
}

impl SolverResult {
    /// Builds a result from the final model state plus the bookkeeping the
    /// solver accumulated along the way.
    pub fn from_model(
        model: &Model,
        values: Vec<i64>,
        dual_bound: Option<f64>,
        phases: Vec<PhaseStats>,
        elapsed: Duration,
        termination_status: TerminationStatus,
        feasible_archive: Vec<Vec<i64>>,
    ) -> Self {
        SolverResult {
            objective_value: model.reported_objective_value(),
            total_violation: model.total_violation(),
            is_feasible: model.is_feasible(),
            values,
            dual_bound,
            phases,
            elapsed_seconds: elapsed.as_secs_f64(),
            termination_status,
            final_penalty_coefficients: model
                .constraints()
                .iter()
                .map(|c| (c.local_penalty_coefficient_leq(), c.local_penalty_coefficient_geq()))
                .collect(),
            variable_update_counts: model.variables().iter().map(|v| v.update_count()).collect(),
            constraint_violation_counts: model
                .constraints()
                .iter()
                .map(|c| c.violation_count())
                .collect(),
            feasible_archive,
        }
    }

    /// Renders the result as a `serde_json::Value`, field by field, so the
    /// status file's shape stays stable even as internal types change.
    pub fn to_json(&self) -> serde_json::Value {
        json!({
            "values": self.values,
            "objective_value": self.objective_value,
            "total_violation": self.total_violation,
            "is_feasible": self.is_feasible,
            "dual_bound": self.dual_bound,
            "phases": self.phases,
            "elapsed_seconds": self.elapsed_seconds,
            "termination_status": self.termination_status,
            "final_penalty_coefficients": self.final_penalty_coefficients,
            "variable_update_counts": self.variable_update_counts,
            "constraint_violation_counts": self.constraint_violation_counts,
            "feasible_archive": self.feasible_archive,
        })
    }

    /// Writes the JSON status file described above to `path`.
    pub fn write_status_file(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.to_json())
            .map_err(|e| SolverError::Configuration(format!("failed to serialize status: {e}")))?;
        std::fs::write(path, json)
            .map_err(|e| SolverError::Configuration(format!("failed to write {}: {e}", path.display())))
    }
}

/// Writes a trend log (one JSON line per [`TrendRecord`]) to `path`.
pub fn write_trend_file(records: &[TrendRecord], path: &Path) -> Result<()> {
    let mut body = String::new();
    for record in records {
        let line = serde_json::to_string(record)
            .map_err(|e| SolverError::Configuration(format!("failed to serialize trend row: {e}")))?;
        body.push_str(&line);
        body.push('\n');
    }
    std::fs::write(path, body)
        .map_err(|e| SolverError::Configuration(format!("failed to write {}: {e}", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ConstraintTag, OptimizationSense, Sense, VariableKind};

    fn trivial_model() -> Model {
        let mut model = Model::new(OptimizationSense::Minimize);
        let x = model.add_variable(VariableKind::Binary, 1, 0, 1, 1.0);
        model.add_constraint(Sense::Equal, vec![(x, 1.0)], -1.0, ConstraintTag::Singleton);
        model
    }

    #[test]
    fn result_from_model_reflects_feasibility() {
        let model = trivial_model();
        let result = SolverResult::from_model(
            &model,
            model.values(),
            None,
            vec![],
            Duration::from_secs_f64(0.5),
            TerminationStatus::Optimal,
            vec![],
        );
        assert!(result.is_feasible);
        assert_eq!(result.objective_value, 1.0);
        assert_eq!(result.elapsed_seconds, 0.5);
    }

    #[test]
    fn json_round_trips_through_serde_value() {
        let model = trivial_model();
        let result = SolverResult::from_model(
            &model,
            model.values(),
            Some(0.5),
            vec![PhaseStats {
                phase: "tabu_search[0]".to_string(),
                iterations: 10,
                elapsed_seconds: 0.1,
                termination_status: TerminationStatus::NoMove,
                objective_value: 1.0,
                is_feasible: true,
            }],
            Duration::from_secs_f64(0.1),
            TerminationStatus::NoMove,
            vec![vec![1]],
        );
        let json = result.to_json();
        assert_eq!(json["is_feasible"], true);
        assert_eq!(json["phases"][0]["phase"], "tabu_search[0]");
    }
}
