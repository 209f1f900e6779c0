//! End-to-end scenarios against the public `Solver` API, covering the
//! literal inputs/outputs laid out for the search core as a whole, plus a
//! couple of property-style checks on the invariants every move and
//! incumbent update is supposed to hold.

use proptest::prelude::*;

use tabu_mip::callback::silent_callback;
use tabu_mip::incumbent::IncumbentHolder;
use tabu_mip::model::{ConstraintTag, Model, OptimizationSense, Sense, VariableId, VariableKind};
use tabu_mip::moves::{Alteration, Move, MoveSense};
use tabu_mip::neighborhood::{MoveGenerator, Neighborhood};
use tabu_mip::options::Options;
use tabu_mip::score::SolutionScore;
use tabu_mip::Solver;

/// Flips every non-fixed binary/integer variable by one unit in each
/// direction. Enough neighborhood coverage for the small fixtures below.
struct UnitStep;

impl MoveGenerator for UnitStep {
    fn name(&self) -> &str {
        "unit_step"
    }

    fn enumerate(&self, model: &Model, out: &mut Vec<Move>) {
        for (index, variable) in model.variables().iter().enumerate() {
            if variable.is_fixed() {
                continue;
            }
            let id = VariableId(index);
            let current = variable.value();
            if current + 1 <= variable.upper_bound() {
                out.push(Move::new(model, vec![Alteration { variable: id, new_value: current + 1 }], MoveSense::Integer));
            }
            if current - 1 >= variable.lower_bound() {
                out.push(Move::new(model, vec![Alteration { variable: id, new_value: current - 1 }], MoveSense::Integer));
            }
        }
    }
}

fn neighborhood_with_unit_step() -> Neighborhood {
    let mut neighborhood = Neighborhood::new();
    neighborhood.register(Box::new(UnitStep));
    neighborhood
}

fn fast_options() -> Options {
    let mut options = Options::default();
    options.general.time_max = 5.0;
    options.general.iteration_max = 50;
    options.tabu_search.iteration_max = 200;
    options.tabu_search.time_max = 5.0;
    options.lagrange_dual.is_enabled = false;
    options.local_search.iteration_max = 100;
    options
}

// Scenario 1: trivial feasibility, `min x` s.t. `x = 1`, starting at `x = 0`.
#[test]
fn trivial_feasibility_reaches_x_equals_one() {
    let mut model = Model::new(OptimizationSense::Minimize);
    let x = model.add_variable(VariableKind::Binary, 0, 0, 1, 1.0);
    model.add_constraint(Sense::Equal, vec![(x, 1.0)], -1.0, ConstraintTag::Singleton);

    let mut neighborhood = neighborhood_with_unit_step();
    let solver = Solver::new(fast_options()).unwrap().with_callback(silent_callback());
    let result = solver.solve(&mut model, &mut neighborhood);

    assert!(result.is_feasible);
    assert_eq!(result.values, vec![1]);
    assert_eq!(result.objective_value, 1.0);
}

// Scenario 2: maximize 3y1 + 2y2 + 4y3 s.t. 2y1 + y2 + 3y3 <= 4, starting at
// all zeros. Optimal is (0,1,1) with objective 6; the core must at least
// reach objective >= 5 within the options' budget.
#[test]
fn three_item_knapsack_reaches_a_good_incumbent() {
    let mut model = Model::new(OptimizationSense::Maximize);
    let y1 = model.add_variable(VariableKind::Binary, 0, 0, 1, 3.0);
    let y2 = model.add_variable(VariableKind::Binary, 0, 0, 1, 2.0);
    let y3 = model.add_variable(VariableKind::Binary, 0, 0, 1, 4.0);
    model.add_constraint(Sense::LessEqual, vec![(y1, 2.0), (y2, 1.0), (y3, 3.0)], -4.0, ConstraintTag::Knapsack);

    let mut neighborhood = neighborhood_with_unit_step();
    let solver = Solver::new(fast_options()).unwrap().with_callback(silent_callback());
    let result = solver.solve(&mut model, &mut neighborhood);

    assert!(result.is_feasible);
    assert!(result.objective_value >= 5.0, "expected objective >= 5, got {}", result.objective_value);
}

// Universal invariant: applying a move then its chain-inverse restores
// variable values exactly.
#[test]
fn chain_move_inverse_restores_values_exactly() {
    let mut model = Model::new(OptimizationSense::Minimize);
    let x0 = model.add_variable(VariableKind::Binary, 0, 0, 1, 1.0);
    let x1 = model.add_variable(VariableKind::Integer, 5, 0, 10, 1.0);
    model.add_constraint(Sense::LessEqual, vec![(x0, 1.0), (x1, 1.0)], -20.0, ConstraintTag::General);

    let before = model.values();
    let first = Move::new(&model, vec![Alteration { variable: x0, new_value: 1 }], MoveSense::Binary);
    let second = Move::new(&model, vec![Alteration { variable: x1, new_value: 8 }], MoveSense::Integer);
    let chained = first.fuse_chain(&second, 0.0).expect("disjoint variables must fuse");

    model.apply_move(&chained);
    assert_ne!(model.values(), before);

    let previous_values: Vec<i64> = chained.alterations().iter().map(|a| before[a.variable.index()]).collect();
    let inverse = chained.chain_inverse(&previous_values);
    model.apply_move(&inverse);

    assert_eq!(model.values(), before);
}

// Universal invariant: IncumbentHolder.try_update is idempotent against a
// full Model, not just the synthetic scores in incumbent.rs's own tests.
#[test]
fn incumbent_try_update_is_idempotent_against_a_real_model() {
    let mut model = Model::new(OptimizationSense::Minimize);
    let x = model.add_variable(VariableKind::Binary, 1, 0, 1, 1.0);
    model.add_constraint(Sense::Equal, vec![(x, 1.0)], -1.0, ConstraintTag::Singleton);
    model.recompute_caches_from_scratch();

    let mut incumbent = IncumbentHolder::new();
    let score = SolutionScore::from_model(&model);
    let first = incumbent.try_update(&model, score);
    let second = incumbent.try_update(&model, score);

    assert!(!first.is_none());
    assert!(second.is_none());
}

proptest! {
    // Universal invariant: I_p, I_d in [0, 1] after any number of memory
    // updates, for any sequence of single-variable flips.
    #[test]
    fn memory_intensities_stay_in_unit_interval(flips in proptest::collection::vec(0usize..4, 1..40)) {
        use rand::rngs::StdRng;
        use rand::SeedableRng;
        use tabu_mip::memory::Memory;

        let mut model = Model::new(OptimizationSense::Minimize);
        for _ in 0..4 {
            model.add_variable(VariableKind::Binary, 0, 0, 1, 1.0);
        }
        let mut memory = Memory::new();
        let mut rng = StdRng::seed_from_u64(11);

        for (iteration, &variable_index) in flips.iter().enumerate() {
            let id = VariableId(variable_index);
            let target = 1 - model.variable(id).value();
            let mv = Move::new(&model, vec![Alteration { variable: id, new_value: target }], MoveSense::Binary);
            model.apply_move(&mv);
            memory.update(&mut model, &mv, iteration as i64, 1, &mut rng);

            prop_assert!((0.0..=1.0).contains(&memory.primal_intensity()));
            prop_assert!((0.0..=1.0).contains(&memory.dual_intensity()));
        }
    }

    // Universal invariant (round-trip form): applying a single-variable
    // move then its own inverse alteration restores the model exactly.
    #[test]
    fn single_flip_inverse_round_trips(initial in 0i64..=1, flips in 1usize..10) {
        let mut model = Model::new(OptimizationSense::Minimize);
        let x = model.add_variable(VariableKind::Binary, initial, 0, 1, 1.0);
        model.add_constraint(Sense::LessEqual, vec![(x, 1.0)], 0.0, ConstraintTag::General);

        let before = model.values();
        for _ in 0..flips {
            let current = model.variable(x).value();
            let mv = Move::new(&model, vec![Alteration { variable: x, new_value: 1 - current }], MoveSense::Binary);
            model.apply_move(&mv);
        }
        if flips % 2 == 1 {
            let current = model.variable(x).value();
            let mv = Move::new(&model, vec![Alteration { variable: x, new_value: 1 - current }], MoveSense::Binary);
            model.apply_move(&mv);
        }
        prop_assert_eq!(model.values(), before);
    }
}
