//! [`Options`]: the solver's configuration record, grouped into one struct
//! per concern, and `serde`-serializable so it can round-trip through a
//! persisted JSON status file.

pub mod enums;

pub use enums::{ChainMoveReduceMode, ImprovabilityScreeningMode, TabuMode, Verbosity};

use serde::{Deserialize, Serialize};

/// Top-level solver options: one field per group.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Options {
    /// Cross-phase limits and the RNG seed.
    pub general: GeneralOptions,
    /// Tabu search inner-loop tuning.
    pub tabu_search: TabuSearchOptions,
    /// Lagrangian-dual warm-start phase tuning.
    pub lagrange_dual: LagrangeDualOptions,
    /// Greedy local-search phase tuning.
    pub local_search: LocalSearchOptions,
    /// Move-kind enablement and chain-move pool tuning.
    pub neighborhood: NeighborhoodOptions,
    /// Penalty-coefficient tuning.
    pub penalty: PenaltyOptions,
    /// Thread-count and parallelization tuning.
    pub parallel: ParallelOptions,
    /// Logging verbosity and persisted-archive tuning.
    pub output: OutputOptions,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            general: GeneralOptions::default(),
            tabu_search: TabuSearchOptions::default(),
            lagrange_dual: LagrangeDualOptions::default(),
            local_search: LocalSearchOptions::default(),
            neighborhood: NeighborhoodOptions::default(),
            penalty: PenaltyOptions::default(),
            parallel: ParallelOptions::default(),
            output: OutputOptions::default(),
        }
    }
}

/// General run controls: time and iteration budgets, logging.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralOptions {
    /// Overall wall-clock budget, in seconds.
    pub time_max: f64,
    /// Maximum outer (controller) iterations.
    pub iteration_max: u64,
    /// Stop once a solution at least this good is found.
    pub target_objective_value: Option<f64>,
    /// RNG seed for reproducible runs.
    pub seed: u64,
}

impl Default for GeneralOptions {
    fn default() -> Self {
        GeneralOptions {
            time_max: 120.0,
            iteration_max: u64::MAX,
            target_objective_value: None,
            seed: 1,
        }
    }
}

/// Tabu search phase options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TabuSearchOptions {
    /// Starting tabu tenure for the first round.
    pub initial_tabu_tenure: i64,
    /// Per-round iteration cap.
    pub iteration_max: u64,
    /// Per-round wall-clock cap, in seconds.
    pub time_max: f64,
    /// Offset subtracted from the wall-clock check (for resumed runs).
    pub time_offset: f64,
    /// `All` or `Any` permissibility rule.
    pub tabu_mode: TabuMode,
    /// Iterations at the start of a round picked uniformly at random.
    pub number_of_initial_modification: u64,
    /// Fixed multiplier used to derive the next round's
    /// `number_of_initial_modification` from its tabu tenure.
    pub initial_modification_fixed_rate: f64,
    /// Random jitter width applied to that derivation.
    pub initial_modification_randomize_rate: f64,
    /// Jitter width (as a fraction of tenure) for the tabu-tag randomization.
    pub tabu_tenure_randomize_rate: f64,
    /// Move-list pruning threshold.
    pub pruning_rate_threshold: f64,
    /// Fraction of generated moves kept after optional shuffling/truncation.
    pub move_preserve_rate: f64,
    /// Whether to shuffle move order before truncation.
    pub is_enabled_shuffle: bool,
    /// Whether to truncate the move list to `move_preserve_rate`.
    pub is_enabled_move_curtail: bool,
    /// Whether the tabu tenure self-adjusts from intensity trends.
    pub is_enabled_automatic_tabu_tenure_adjustment: bool,
    /// Whether the per-round iteration cap grows automatically.
    pub is_enabled_automatic_iteration_adjustment: bool,
    /// Whether to auto-break on `PENALTY_COEFFICIENT_TOO_LARGE`.
    pub is_enabled_automatic_break: bool,
    /// Whether the initial random-modification kick-start runs at all.
    pub is_enabled_initial_modification: bool,
    /// Whether a tabu move may still be selected via aspiration.
    pub ignore_tabu_if_global_incumbent: bool,
    /// Coefficient on the move-selection frequency penalty.
    pub frequency_penalty_coefficient: f64,
    /// Coefficient on the move-selection Lagrangian penalty.
    pub lagrangian_penalty_coefficient: f64,
    /// Consecutive rising-intensity samples before `tabu_tenure += 1`.
    pub intensity_increase_count_threshold: u32,
    /// Consecutive falling-intensity samples before `tabu_tenure -= 1`.
    pub intensity_decrease_count_threshold: u32,
    /// Iterations between progress log lines.
    pub log_interval: u64,
}

impl Default for TabuSearchOptions {
    fn default() -> Self {
        TabuSearchOptions {
            initial_tabu_tenure: 10,
            iteration_max: 100_000,
            time_max: 30.0,
            time_offset: 0.0,
            tabu_mode: TabuMode::Any,
            number_of_initial_modification: 0,
            initial_modification_fixed_rate: 1.0,
            initial_modification_randomize_rate: 0.5,
            tabu_tenure_randomize_rate: 0.5,
            pruning_rate_threshold: 0.0,
            move_preserve_rate: 1.0,
            is_enabled_shuffle: true,
            is_enabled_move_curtail: false,
            is_enabled_automatic_tabu_tenure_adjustment: true,
            is_enabled_automatic_iteration_adjustment: true,
            is_enabled_automatic_break: true,
            is_enabled_initial_modification: true,
            ignore_tabu_if_global_incumbent: true,
            frequency_penalty_coefficient: 0.0,
            lagrangian_penalty_coefficient: 0.0,
            intensity_increase_count_threshold: 4,
            intensity_decrease_count_threshold: 4,
            log_interval: 100,
        }
    }
}

/// Lagrangian-dual warm-start phase options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LagrangeDualOptions {
    /// Whether the Lagrangian warm-start phase runs at all.
    pub is_enabled: bool,
    /// Iteration cap for the subgradient ascent.
    pub iteration_max: u64,
    /// Wall-clock cap, in seconds.
    pub time_max: f64,
    /// Size of the past-lagrangian queue used for step-size adaptation.
    pub queue_size: usize,
    /// Relative convergence tolerance.
    pub tolerance: f64,
    /// Multiplier applied to the step size when the latest Lagrangian is
    /// above the queue average.
    pub step_size_extend_rate: f64,
    /// Multiplier applied to the step size when the latest Lagrangian is
    /// below the queue max.
    pub step_size_reduce_rate: f64,
}

impl Default for LagrangeDualOptions {
    fn default() -> Self {
        LagrangeDualOptions {
            is_enabled: false,
            iteration_max: 1000,
            time_max: 10.0,
            queue_size: 20,
            tolerance: 1e-4,
            step_size_extend_rate: 1.05,
            step_size_reduce_rate: 0.95,
        }
    }
}

/// Greedy local-search phase options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalSearchOptions {
    /// Whether the greedy local-search phase runs at all.
    pub is_enabled: bool,
    /// Iteration cap.
    pub iteration_max: u64,
    /// Wall-clock cap, in seconds.
    pub time_max: f64,
    /// RNG seed for move-order shuffling.
    pub seed: u64,
    /// Iterations between progress log lines.
    pub log_interval: u64,
}

impl Default for LocalSearchOptions {
    fn default() -> Self {
        LocalSearchOptions {
            is_enabled: true,
            iteration_max: 10_000,
            time_max: 10.0,
            seed: 1,
            log_interval: 100,
        }
    }
}

/// One enable flag per move kind, plus chain-move pool tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NeighborhoodOptions {
    /// Enable single 0/1 flips.
    pub is_enabled_binary: bool,
    /// Enable single integer ±k steps.
    pub is_enabled_integer: bool,
    /// Enable selection-group swaps.
    pub is_enabled_selection: bool,
    /// Enable chain-move synthesis and reuse.
    pub is_enabled_chain: bool,
    /// Enable exclusive-or pair moves.
    pub is_enabled_exclusive_or: bool,
    /// Enable exclusive-nor pair moves.
    pub is_enabled_exclusive_nor: bool,
    /// Enable inverted-pair integer moves.
    pub is_enabled_inverted_integers: bool,
    /// Enable balanced-pair integer moves.
    pub is_enabled_balanced_integers: bool,
    /// Enable constant-sum-pair integer moves.
    pub is_enabled_constant_sum_integers: bool,
    /// Enable fixed-ratio-pair integer moves.
    pub is_enabled_ratio_integers: bool,
    /// Enable fixed-difference-pair integer moves.
    pub is_enabled_difference_integers: bool,
    /// Enable aggregation moves.
    pub is_enabled_aggregation: bool,
    /// Enable precedence moves.
    pub is_enabled_precedence: bool,
    /// Enable variable-bound moves.
    pub is_enabled_variable_bound: bool,
    /// Enable trinomial exclusive-nor moves.
    pub is_enabled_trinomial_exclusive_nor: bool,
    /// Enable soft-selection moves.
    pub is_enabled_soft_selection: bool,
    /// Enable two-flip compound moves.
    pub is_enabled_two_flip: bool,
    /// Enable externally-supplied user-defined moves.
    pub is_enabled_user_defined: bool,
    /// Maximum number of chain moves retained between rounds.
    pub chain_move_capacity: usize,
    /// Minimum overlap rate for a fused pair to be registered as a chain
    /// move.
    pub chain_move_overlap_rate_threshold: f64,
    /// How the chain-move pool is pruned down to capacity.
    pub chain_move_reduce_mode: ChainMoveReduceMode,
    /// Pre-filter applied to generated moves before evaluation.
    pub improvability_screening_mode: ImprovabilityScreeningMode,
    /// Whether `IntegerStepSizeAdjuster` runs on improving integer moves.
    pub is_enabled_integer_step_size_adjuster: bool,
}

impl Default for NeighborhoodOptions {
    fn default() -> Self {
        NeighborhoodOptions {
            is_enabled_binary: true,
            is_enabled_integer: true,
            is_enabled_selection: true,
            is_enabled_chain: false,
            is_enabled_exclusive_or: false,
            is_enabled_exclusive_nor: false,
            is_enabled_inverted_integers: false,
            is_enabled_balanced_integers: false,
            is_enabled_constant_sum_integers: false,
            is_enabled_ratio_integers: false,
            is_enabled_difference_integers: false,
            is_enabled_aggregation: false,
            is_enabled_precedence: false,
            is_enabled_variable_bound: false,
            is_enabled_trinomial_exclusive_nor: false,
            is_enabled_soft_selection: false,
            is_enabled_two_flip: false,
            is_enabled_user_defined: false,
            chain_move_capacity: 100,
            chain_move_overlap_rate_threshold: 0.1,
            chain_move_reduce_mode: ChainMoveReduceMode::OverlapRate,
            improvability_screening_mode: ImprovabilityScreeningMode::Off,
            is_enabled_integer_step_size_adjuster: true,
        }
    }
}

/// Penalty-coefficient tuning options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PenaltyOptions {
    /// Starting (and ceiling) local penalty coefficient for every
    /// constraint.
    pub initial_penalty_coefficient: f64,
    /// Multiplicative shrink rate applied when relaxing.
    pub penalty_coefficient_relaxing_rate: f64,
    /// Rate controlling the additive tightening step.
    pub penalty_coefficient_tightening_rate: f64,
    /// Balance between GAP-relative and violation-relative tightening terms.
    pub penalty_coefficient_updating_balance: f64,
    /// Whether proxy-grouped constraints share a promoted coefficient.
    pub is_enabled_grouping_penalty_coefficient: bool,
    /// Whether relaxing is allowed to shrink coefficients below their
    /// initial value.
    pub is_enabled_shrink_penalty_coefficient: bool,
}

impl Default for PenaltyOptions {
    fn default() -> Self {
        PenaltyOptions {
            initial_penalty_coefficient: 1.0,
            penalty_coefficient_relaxing_rate: 0.9,
            penalty_coefficient_tightening_rate: 1.0,
            penalty_coefficient_updating_balance: 0.5,
            is_enabled_grouping_penalty_coefficient: false,
            is_enabled_shrink_penalty_coefficient: true,
        }
    }
}

/// Parallel evaluation tuning options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ParallelOptions {
    /// Whether move-list generation runs in parallel.
    pub is_enabled_move_update_parallelization: bool,
    /// Whether move evaluation runs in parallel.
    pub is_enabled_move_evaluation_parallelization: bool,
    /// Thread count used for move-list generation, when parallelized.
    pub number_of_threads_move_update: usize,
    /// Thread count used for move evaluation, when parallelized.
    pub number_of_threads_move_evaluation: usize,
    /// Whether the UCB1 thread-count tuner runs.
    pub is_enabled_thread_count_optimization: bool,
}

impl Default for ParallelOptions {
    fn default() -> Self {
        ParallelOptions {
            is_enabled_move_update_parallelization: false,
            is_enabled_move_evaluation_parallelization: true,
            number_of_threads_move_update: 1,
            number_of_threads_move_evaluation: num_cpus_fallback(),
            is_enabled_thread_count_optimization: false,
        }
    }
}

fn num_cpus_fallback() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// Output and logging options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputOptions {
    /// Logging verbosity.
    pub verbose: Verbosity,
    /// Whether feasible solutions are archived as they're found.
    pub is_enabled_store_feasible_solutions: bool,
    /// Maximum number of archived feasible solutions.
    pub feasible_solutions_capacity: usize,
    /// Whether to persist a trend log (one row per outer iteration).
    pub is_enabled_write_trend: bool,
}

impl Default for OutputOptions {
    fn default() -> Self {
        OutputOptions {
            verbose: Verbosity::Warning,
            is_enabled_store_feasible_solutions: true,
            feasible_solutions_capacity: 100,
            is_enabled_write_trend: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_options_round_trip_through_json() {
        let options = Options::default();
        let json = serde_json::to_string(&options).expect("serialize");
        let restored: Options = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(restored.tabu_search.initial_tabu_tenure, options.tabu_search.initial_tabu_tenure);
        assert_eq!(restored.penalty.initial_penalty_coefficient, options.penalty.initial_penalty_coefficient);
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let restored: Options = serde_json::from_str(r#"{"tabu_search": {"initial_tabu_tenure": 42}}"#)
            .expect("deserialize");
        assert_eq!(restored.tabu_search.initial_tabu_tenure, 42);
        assert_eq!(restored.tabu_search.tabu_mode, TabuMode::Any);
        assert_eq!(restored.general.seed, 1);
    }
}
