//! A handle-based embedding surface over [`vorpal_rt`]: opaque 32-bit handles
//! standing in for store-resident objects across an FFI boundary, a capability
//! host trait standing in for a WASI-like implementation, and the host-function
//! ABI thunk that connects the two.
//!
//! This crate never reaches into [`vorpal_rt`]'s internals beyond its public
//! API — it is, deliberately, just another embedder.

mod abi;
mod capability;
mod exit;
mod frame;
mod handle;

pub use abi::{capability_thunk, random_get_func};
pub use capability::{CapabilityHost, FileStat, NullCapabilityHost, TestCapabilityHost};
pub use exit::{exit_code_for, proc_exit_func};
pub use frame::frame_memory_handle;
pub use handle::{ByReferenceHandleManager, Handle, HandleKind, RefCountedHandleManager, MAX_LIVE_HANDLES};
