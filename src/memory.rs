//! [`Memory`]: recency and frequency bookkeeping over the model's variables
//! and constraints.
//!
//! Update counts and tabu tags live on [`Variable`] itself (it is the
//! natural owner of its own history); `Memory` is the aggregate view plus
//! the incrementally-maintained intensity scalars, mirroring how the
//! original C++ `Memory` class wraps per-variable/per-constraint counters.

use rand::Rng;

use crate::model::{Model, VariableId};
use crate::moves::Move;

/// Recency/frequency memory plus the primal/dual intensity scalars.
#[derive(Debug, Clone)]
pub struct Memory {
    total_update_count: u64,
    sum_update_count_squared: u64,
    total_violation_count: u64,
    sum_violation_count_squared: u64,
}

impl Default for Memory {
    fn default() -> Self {
        Memory {
            total_update_count: 0,
            sum_update_count_squared: 0,
            total_violation_count: 0,
            sum_violation_count_squared: 0,
        }
    }
}

impl Memory {
    /// A fresh, empty memory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Primal intensity `I_p = Σ update_count² / (Σ update_count)²`, in
    /// `[0, 1]`. High values mean a few variables dominate the updates.
    pub fn primal_intensity(&self) -> f64 {
        let denominator = self.total_update_count.max(1) as f64;
        self.sum_update_count_squared as f64 / (denominator * denominator)
    }

    /// Dual intensity `I_d = Σ violation_count² / (Σ violation_count)²`, in
    /// `[0, 1]`.
    pub fn dual_intensity(&self) -> f64 {
        let denominator = self.total_violation_count.max(1) as f64;
        self.sum_violation_count_squared as f64 / (denominator * denominator)
    }

    /// Updates per-variable update counts and tabu tags for every variable
    /// altered by `mv`, and per-constraint violation counts for every
    /// currently-violative constraint in `model`. Tags are jittered:
    /// `local_last_update_iteration = iteration + uniform(-random_width, +random_width)`.
    pub fn update(
        &mut self,
        model: &mut Model,
        mv: &Move,
        iteration: i64,
        random_width: i64,
        rng: &mut impl Rng,
    ) {
        for alteration in mv.alterations() {
            self.bump_variable(model, alteration.variable, iteration, random_width, rng);
        }
        let violative: Vec<_> = model.current_violative_constraint_ids();
        for constraint_id in violative {
            let count = {
                let constraint = &mut model.constraints_mut()[constraint_id.index()];
                constraint.increment_violation_count();
                constraint.violation_count()
            };
            // Σx² → Σx² + 2x + 1 as x ticks from count-1 to count.
            self.sum_violation_count_squared += 2 * (count - 1) + 1;
            self.total_violation_count += 1;
        }
    }

    fn bump_variable(
        &mut self,
        model: &mut Model,
        variable_id: VariableId,
        iteration: i64,
        random_width: i64,
        rng: &mut impl Rng,
    ) {
        let jitter = if random_width > 0 {
            rng.gen_range(-random_width..=random_width)
        } else {
            0
        };
        let variable = &mut model.variables_mut()[variable_id.index()];
        let count = variable.update_count();
        self.sum_update_count_squared += 2 * count + 1;
        variable.increment_update_count();
        variable.set_local_last_update_iteration(iteration + jitter);
        variable.set_global_last_update_iteration(self.total_update_count as i64);
        self.total_update_count += 1;
    }

    /// Resets every variable's tabu tag to the initial sentinel so all moves
    /// are permissible again at the start of a fresh round. Update counts and intensity history are left untouched: they
    /// track the whole run, not a single round.
    pub fn reset_local_last_update_iterations(&self, model: &mut Model) {
        for variable in model.variables_mut() {
            variable.reset_local_last_update_iteration();
        }
    }
}
