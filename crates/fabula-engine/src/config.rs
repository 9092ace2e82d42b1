//! Engine configuration.

use fabula_mechanics::combat::DEFAULT_FLEE_BASE;

/// Tunables for one play session.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Seed for the injected random source; fixed seeds reproduce runs.
    pub seed: u64,
    /// Base percent chance that fleeing combat succeeds.
    pub flee_base_chance: i32,
    /// Cascade depth cap for script-raised events.
    pub max_cascade_depth: usize,
    /// Hunger lost per turn.
    pub hunger_decay: f32,
    /// Thirst lost per turn.
    pub thirst_decay: f32,
    /// Rest lost per turn.
    pub rest_decay: f32,
    /// Level at or below which a need is critical.
    pub need_critical_threshold: f32,
}

impl EngineConfig {
    /// Use a specific random seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            flee_base_chance: DEFAULT_FLEE_BASE,
            max_cascade_depth: 8,
            hunger_decay: 0.010,
            thirst_decay: 0.015,
            rest_decay: 0.008,
            need_critical_threshold: 0.2,
        }
    }
}
