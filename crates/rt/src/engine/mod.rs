//! The call executor and its supporting compiled-code representation.

mod compile;
mod executor;
mod frame;
mod opcode;

pub use compile::{compile, CompiledFunc};
pub use executor::Executor;
pub use frame::CallingFrame;

use crate::config::Config;
use std::sync::Arc;

/// A cheaply-clonable handle to an immutable [`Config`].
///
/// Every [`crate::store::Store`] and [`Executor`] is driven by one `Engine`; the
/// `Arc` means cloning an `Engine` to stash alongside a store never copies the
/// configuration itself.
#[derive(Debug, Clone)]
pub struct Engine {
    config: Arc<Config>,
}

impl Engine {
    pub fn new(config: Config) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(Config::default())
    }
}
