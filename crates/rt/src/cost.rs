use crate::error::{Error, TrapCode};

/// The per-instruction cost weights used to meter execution.
///
/// The default table charges every instruction a single unit; hosts that need
/// finer-grained metering (e.g. charging more for memory or call instructions)
/// construct their own and install it on [`crate::engine::Config`].
#[derive(Debug, Clone, Copy)]
pub struct CostTable {
    pub default: u64,
    pub call: u64,
    pub memory_access: u64,
}

impl Default for CostTable {
    fn default() -> Self {
        Self {
            default: 1,
            call: 1,
            memory_access: 1,
        }
    }
}

/// A running execution budget, decremented by the call executor on every
/// instruction it retires. Exhausting it raises
/// [`TrapCode::CostLimitExceeded`] rather than letting a runaway guest loop spin
/// forever.
#[derive(Debug, Clone, Copy)]
pub struct Budget {
    remaining: Option<u64>,
    checkpoint_granularity: u64,
    since_checkpoint: u64,
}

impl Budget {
    pub fn new(limit: Option<u64>, checkpoint_granularity: u64) -> Self {
        Self {
            remaining: limit,
            checkpoint_granularity: checkpoint_granularity.max(1),
            since_checkpoint: 0,
        }
    }

    pub fn unlimited() -> Self {
        Self::new(None, 1024)
    }

    /// Charges `cost` units, returning a [`TrapCode::CostLimitExceeded`] error the
    /// instant the budget would go negative. `cancelled` is only actually
    /// consulted every `checkpoint_granularity` instructions, so a tight loop
    /// doesn't pay for a flag check on every single step.
    pub fn charge(&mut self, cost: u64, cancelled: bool) -> Result<(), Error> {
        if let Some(remaining) = &mut self.remaining {
            *remaining = remaining.checked_sub(cost).ok_or(TrapCode::CostLimitExceeded)?;
        }
        self.since_checkpoint += cost;
        if self.since_checkpoint >= self.checkpoint_granularity {
            self.since_checkpoint = 0;
            if cancelled {
                return Err(TrapCode::Interrupted.into());
            }
        }
        Ok(())
    }
}

/// Execution statistics accumulated over a single call, exposed for hosts that
/// want to log or export metering data.
#[derive(Debug, Clone, Copy, Default)]
pub struct Statistics {
    pub instructions_executed: u64,
    pub host_calls: u64,
}

impl Statistics {
    pub fn record_instruction(&mut self) {
        self.instructions_executed += 1;
    }

    pub fn record_host_call(&mut self) {
        self.host_calls += 1;
    }
}
