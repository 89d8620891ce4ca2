//! The execution core: store, module instance, instantiation pipeline, call
//! executor, and the VM lifecycle wrapper that ties them together for a typical
//! embedder.
//!
//! This crate is always `std`; the numeric primitives and arena/slot-map data
//! structures it builds on ([`vorpal_core`], [`vorpal_collections`]) stay
//! `no_std`-capable on their own so a future host-side build can share them
//! without pulling this crate's `std::thread`-based async task wrapper along.

mod async_task;
mod config;
mod cost;
mod decode;
mod engine;
mod error;
mod instance;
mod instantiate;
mod module_instance;
mod store;
mod types;
mod value;
mod vm;

pub use async_task::AsyncTask;
pub use config::Config;
pub use cost::{Budget, CostTable, Statistics};
pub use decode::{
    decode, ConstExpr, DataDescription, ElementDescription, ExportDescription, ExternType, ImportDescription,
    ModuleDescription,
};
pub use engine::{CallingFrame, Engine, Executor};
pub use error::{
    DecodeError, Error, ErrorKind, GlobalError, HandleError, HostErrorCategory, InstantiationError,
    MemoryError, Result, StoreError, StructuralErrorCode, TableError, TrapCode,
};
pub use instance::{
    DataInstance, ElementInstance, ExternObject, FuncInstance, GlobalInstance, HostFuncEntity,
    HostOutcome, MemoryInstance, TableInstance, TagInstance, WasmFuncEntity,
};
pub use instantiate::instantiate;
pub use module_instance::{ExportItem, ModuleInstance, ModuleInstanceBuilder};
pub use store::{DataSegment, ElementSegment, Func, Global, Memory, Store, StoreId, Table, Tag};
pub use types::{
    FuncType, GlobalType, HeapType, Limits, MemoryType, RefType, TableType, ValType, MAX_MEMORY_BYTES,
    MAX_MEMORY_PAGES, PAGE_SIZE,
};
pub use value::Val;
pub use vm::Vm;
