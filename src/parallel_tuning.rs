//! A small UCB1 multi-armed bandit over `(threads_move_update,
//! threads_move_evaluation)` pairs, picking the pair that maximizes
//! observed iterations-per-second. No crate
//! in the retrieval pack offers a bandit; this is hand-rolled arithmetic,
//! not a stand-in for a missing dependency.

/// One candidate thread-count configuration and its running statistics.
#[derive(Debug, Clone, Copy)]
struct Arm {
    threads_move_update: usize,
    threads_move_evaluation: usize,
    pulls: u64,
    total_reward: f64,
}

impl Arm {
    fn mean_reward(&self) -> f64 {
        if self.pulls == 0 {
            0.0
        } else {
            self.total_reward / self.pulls as f64
        }
    }
}

/// UCB1 tuner over a small grid of thread-count pairs.
///
/// Call [`ThreadCountTuner::select`] once per outer iteration to get the
/// pair to use, run the iteration, time it, then report the observed
/// iterations-per-second back with [`ThreadCountTuner::record`].
pub struct ThreadCountTuner {
    arms: Vec<Arm>,
    total_pulls: u64,
    last_selected: usize,
}

impl ThreadCountTuner {
    /// Builds the grid from every combination in `update_candidates` ×
    /// `evaluation_candidates`. Each candidate list should include at
    /// least `1` and the machine's available parallelism.
    pub fn new(update_candidates: &[usize], evaluation_candidates: &[usize]) -> Self {
        let mut arms = Vec::new();
        for &update in update_candidates {
            for &evaluation in evaluation_candidates {
                arms.push(Arm {
                    threads_move_update: update.max(1),
                    threads_move_evaluation: evaluation.max(1),
                    pulls: 0,
                    total_reward: 0.0,
                });
            }
        }
        debug_assert!(!arms.is_empty(), "tuner needs at least one thread-count pair");
        ThreadCountTuner {
            arms,
            total_pulls: 0,
            last_selected: 0,
        }
    }

    /// Builds the standard grid: every arm pairs "1 thread" with "all
    /// available cores" for both axes (the four corners of the grid).
    pub fn with_default_grid(available_parallelism: usize) -> Self {
        let cores = available_parallelism.max(1);
        Self::new(&[1, cores], &[1, cores])
    }

    /// Selects the next arm to try: any never-pulled arm first, then the
    /// arm maximizing `mean_reward + sqrt(2 * ln(total_pulls) / pulls)`.
    pub fn select(&mut self) -> (usize, usize) {
        if let Some(index) = self.arms.iter().position(|arm| arm.pulls == 0) {
            self.last_selected = index;
            let arm = &self.arms[index];
            return (arm.threads_move_update, arm.threads_move_evaluation);
        }

        let total_pulls = self.total_pulls.max(1) as f64;
        let (index, _) = self
            .arms
            .iter()
            .enumerate()
            .map(|(index, arm)| {
                let exploration = (2.0 * total_pulls.ln() / arm.pulls as f64).sqrt();
                (index, arm.mean_reward() + exploration)
            })
            .fold((0, f64::NEG_INFINITY), |best, candidate| if candidate.1 > best.1 { candidate } else { best });

        self.last_selected = index;
        let arm = &self.arms[index];
        (arm.threads_move_update, arm.threads_move_evaluation)
    }

    /// Records the iterations-per-second observed while running with the
    /// pair last returned by [`ThreadCountTuner::select`].
    pub fn record(&mut self, iterations_per_second: f64) {
        let arm = &mut self.arms[self.last_selected];
        arm.pulls += 1;
        arm.total_reward += iterations_per_second;
        self.total_pulls += 1;
    }

    /// The best-performing pair found so far (highest mean reward among
    /// arms that have been pulled at least once), falling back to the
    /// first arm if nothing has been tried yet.
    pub fn best_known(&self) -> (usize, usize) {
        self.arms
            .iter()
            .filter(|arm| arm.pulls > 0)
            .max_by(|a, b| a.mean_reward().partial_cmp(&b.mean_reward()).unwrap())
            .or_else(|| self.arms.first())
            .map(|arm| (arm.threads_move_update, arm.threads_move_evaluation))
            .unwrap_or((1, 1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tries_every_arm_before_repeating() {
        let mut tuner = ThreadCountTuner::with_default_grid(4);
        let mut seen = std::collections::HashSet::new();
        for _ in 0..tuner.arms.len() {
            let pair = tuner.select();
            seen.insert(pair);
            tuner.record(10.0);
        }
        assert_eq!(seen.len(), tuner.arms.len());
    }

    #[test]
    fn converges_to_the_better_arm() {
        let mut tuner = ThreadCountTuner::new(&[1, 4], &[1, 4]);
        for _ in 0..4 {
            let (update, evaluation) = tuner.select();
            let reward = if update == 4 && evaluation == 4 { 100.0 } else { 1.0 };
            tuner.record(reward);
        }
        for _ in 0..50 {
            let (update, evaluation) = tuner.select();
            let reward = if update == 4 && evaluation == 4 { 100.0 } else { 1.0 };
            tuner.record(reward);
        }
        assert_eq!(tuner.best_known(), (4, 4));
    }
}
