use crate::cost::CostTable;

/// Immutable engine-wide settings.
///
/// Baked into an [`crate::engine::Engine`] at construction and shared by every
/// store and call the engine drives; changing limits mid-flight means building a
/// new `Engine` around a cheaply-clonable engine handle and its frozen
/// configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub cost_table: CostTable,
    /// `None` means unmetered: instructions are never charged against a budget.
    pub default_budget: Option<u64>,
    pub max_call_stack_depth: u32,
    pub checkpoint_granularity: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cost_table: CostTable::default(),
            default_budget: None,
            max_call_stack_depth: 1024,
            checkpoint_granularity: 1024,
        }
    }
}

impl Config {
    pub fn with_default_budget(mut self, budget: Option<u64>) -> Self {
        self.default_budget = budget;
        self
    }

    pub fn with_max_call_stack_depth(mut self, depth: u32) -> Self {
        self.max_call_stack_depth = depth;
        self
    }

    pub fn with_cost_table(mut self, cost_table: CostTable) -> Self {
        self.cost_table = cost_table;
        self
    }
}
