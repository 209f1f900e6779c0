//! [`IterationCallback`]: an optional hook invoked between search
//! iterations. The default implementation logs through the `log` crate
//! instead of printing, at a level chosen by [`crate::options::Verbosity`].

use std::time::{Duration, Instant};

use crate::model::OptimizationSense;
use crate::options::Verbosity;
use crate::score::SolutionScore;

/// Everything a callback might want to report about the current iteration.
#[derive(Debug, Clone, Copy)]
pub struct IterationContext<'a> {
    /// The phase this iteration belongs to (`"lagrange_dual"`,
    /// `"local_search"`, `"tabu_search"`).
    pub phase: &'a str,
    /// Iteration counter within the phase.
    pub iteration: u64,
    /// The current solution's score. `score.objective` is sign-adjusted so
    /// the core always minimizes; multiply by `sense.sign()` to recover the
    /// user-facing value, as [`default_callback`] does.
    pub score: &'a SolutionScore,
    /// The model's optimization sense, for un-adjusting `score.objective`.
    pub sense: OptimizationSense,
    /// The previous iteration's score, if any.
    pub previous_score: Option<&'a SolutionScore>,
    /// When the phase started, for elapsed-time reporting.
    pub start_time: Option<Instant>,
    /// The phase's wall-clock budget, if any.
    pub time_max: Option<Duration>,
    /// The phase's iteration budget, if any.
    pub iteration_max: Option<u64>,
}

/// A function invoked once per inner/outer iteration. Takes an
/// [`IterationContext`] by reference rather than a long positional-argument
/// list, since the context carries several fields (phase name,
/// feasibility) beyond a bare solution/objective pair.
pub type IterationCallback = Box<dyn Fn(&IterationContext) + Send + Sync>;

/// The default callback: logs at a level derived from `verbosity` and the
/// iteration's role (outer vs. inner), through `log::log!` instead of
/// `println!` so callers can route it through their own subscriber.
pub fn default_callback(verbosity: Verbosity) -> IterationCallback {
    Box::new(move |ctx: &IterationContext| {
        if verbosity < Verbosity::Outer {
            return;
        }
        let elapsed = ctx
            .start_time
            .map(|t| Instant::now().duration_since(t).as_secs_f64());
        let sign = ctx.sense.sign();
        match ctx.previous_score {
            Some(previous) => log::info!(
                "[{}] iteration {}: objective {:.6} -> {:.6} (feasible: {}){}",
                ctx.phase,
                ctx.iteration,
                sign * previous.objective,
                sign * ctx.score.objective,
                ctx.score.is_feasible,
                elapsed.map(|s| format!(", elapsed {s:.2}s")).unwrap_or_default(),
            ),
            None => log::info!(
                "[{}] iteration {}: objective {:.6} (feasible: {})",
                ctx.phase,
                ctx.iteration,
                sign * ctx.score.objective,
                ctx.score.is_feasible,
            ),
        }
        if verbosity >= Verbosity::Inner {
            log::debug!(
                "[{}] local_augmented={:.6} global_augmented={:.6}",
                ctx.phase,
                ctx.score.local_augmented_objective,
                ctx.score.global_augmented_objective,
            );
        }
        if let (Some(limit), Some(elapsed)) = (ctx.time_max, elapsed) {
            if elapsed > limit.as_secs_f64() * 0.9 {
                log::warn!("[{}] approaching time budget ({:.2}s / {:.2}s)", ctx.phase, elapsed, limit.as_secs_f64());
            }
        }
    })
}

/// A callback that reports nothing, for headless / latency-sensitive runs.
pub fn silent_callback() -> IterationCallback {
    Box::new(|_ctx: &IterationContext| {})
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dummy_score() -> SolutionScore {
        SolutionScore {
            objective: 1.0,
            objective_improvement: 0.0,
            total_violation: 0.0,
            local_penalty: 0.0,
            global_penalty: 0.0,
            local_augmented_objective: 1.0,
            global_augmented_objective: 1.0,
            is_feasible: true,
            is_objective_improvable: false,
            is_feasibility_improvable: false,
        }
    }

    #[test]
    fn silent_callback_does_not_panic() {
        let callback = silent_callback();
        let score = dummy_score();
        callback(&IterationContext {
            phase: "test",
            iteration: 0,
            score: &score,
            sense: crate::model::OptimizationSense::Minimize,
            previous_score: None,
            start_time: None,
            time_max: None,
            iteration_max: None,
        });
    }

    #[test]
    fn default_callback_handles_missing_previous_score() {
        let callback = default_callback(Verbosity::Debug);
        let score = dummy_score();
        callback(&IterationContext {
            phase: "tabu_search",
            iteration: 3,
            score: &score,
            sense: crate::model::OptimizationSense::Minimize,
            previous_score: None,
            start_time: Some(Instant::now()),
            time_max: Some(Duration::from_secs(10)),
            iteration_max: Some(100),
        });
    }
}
