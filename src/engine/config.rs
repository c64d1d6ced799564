//! Engine configuration options.

/// Engine configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Maximum number of events to retain in memory.
    pub max_events: usize,
    /// Enable verbose logging.
    pub verbose: bool,
    /// Maximum oracle print age in ticks.
    pub oracle_max_tick_age: i64,
    /// Capacity of each account's signed-order store.
    pub order_store_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_events: 100_000,
            verbose: false,
            oracle_max_tick_age: 100,
            order_store_capacity: 32,
        }
    }
}
