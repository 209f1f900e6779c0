//! The [`Neighborhood`]/[`MoveGenerator`] seam: the core consumes candidate
//! moves through these traits without knowing how any particular move kind
//! is enumerated. Concrete move-kind enumeration (binary flip, integer step,
//! selection swap, chain moves, …) is a capability trait implemented by
//! callers.

use crate::model::Model;
use crate::moves::Move;

/// A single move-kind generator (binary flip, integer step, selection swap,
/// chain, …). Concrete move-kind enumeration lives entirely outside this
/// crate; it implements this trait and is registered into a
/// [`Neighborhood`].
pub trait MoveGenerator: Send + Sync {
    /// A short name for diagnostics (e.g. `"binary"`, `"chain"`).
    fn name(&self) -> &str;

    /// Appends this generator's candidate moves for the current model state
    /// to `out`. Called once per iteration, after [`MoveGenerator::update_structure`]
    /// if the structural set changed.
    fn enumerate(&self, model: &Model, out: &mut Vec<Move>);

    /// Refreshes any cached structural information this generator keeps
    /// (e.g. selection groups, chain-move candidates) after a structural
    /// model change. A no-op default for generators with no such cache.
    fn update_structure(&mut self, _model: &Model) {}

    /// Whether this generator is a "special" neighborhood (aggregation,
    /// precedence, chain, two-flip, …) subject to the controller's
    /// enable/disable and clearing rules. `false` for the ordinary Binary,
    /// Integer, and Selection generators.
    fn is_special(&self) -> bool {
        false
    }
}

/// The bag of move generators the core draws from each iteration, plus the
/// per-kind enable flags the controller flips between rounds.
pub struct Neighborhood {
    generators: Vec<Box<dyn MoveGenerator>>,
    enabled: Vec<bool>,
}

impl Neighborhood {
    /// An empty neighborhood with no generators registered.
    pub fn new() -> Self {
        Neighborhood {
            generators: Vec::new(),
            enabled: Vec::new(),
        }
    }

    /// Registers a move generator, enabled by default.
    pub fn register(&mut self, generator: Box<dyn MoveGenerator>) {
        self.generators.push(generator);
        self.enabled.push(true);
    }

    /// Enables or disables the generator named `name`, if registered.
    pub fn set_enabled(&mut self, name: &str, enabled: bool) {
        if let Some(index) = self.generators.iter().position(|g| g.name() == name) {
            self.enabled[index] = enabled;
        }
    }

    /// Enables or disables every *special* neighborhood.
    pub fn set_special_neighborhoods_enabled(&mut self, enabled: bool) {
        for (generator, flag) in self.generators.iter().zip(self.enabled.iter_mut()) {
            if generator.is_special() {
                *flag = enabled;
            }
        }
    }

    /// Notifies every generator of a structural model change.
    pub fn update_structure(&mut self, model: &Model) {
        for generator in &mut self.generators {
            generator.update_structure(model);
        }
    }

    /// Enumerates candidate moves from every enabled generator.
    pub fn enumerate(&self, model: &Model) -> Vec<Move> {
        let mut moves = Vec::new();
        for (generator, &enabled) in self.generators.iter().zip(self.enabled.iter()) {
            if enabled {
                generator.enumerate(model, &mut moves);
            }
        }
        moves
    }
}

impl Default for Neighborhood {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Neighborhood {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Neighborhood")
            .field("generators", &self.generators.iter().map(|g| g.name()).collect::<Vec<_>>())
            .field("enabled", &self.enabled)
            .finish()
    }
}
