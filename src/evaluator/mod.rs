//! The L1 evaluation layer: [`model_evaluator`] scores a candidate move's
//! effect on the solution, [`move_evaluator`] scores its tabu/penalty
//! standing, and [`step_size_adjuster`] widens an improving integer step.

pub mod model_evaluator;
pub mod move_evaluator;
pub mod step_size_adjuster;

pub use model_evaluator::ModelEvaluator;
pub use move_evaluator::{MoveEvaluator, MoveScore};
pub use step_size_adjuster::IntegerStepSizeAdjuster;
