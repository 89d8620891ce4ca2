use crate::{
    engine::{CallingFrame, CompiledFunc},
    error::HostErrorCategory,
    module_instance::ModuleInstance,
    types::FuncType,
    value::Val,
};
use std::sync::Arc;

/// The outcome of a host function thunk, per"Host function ABI (logical)":
/// `thunk(data, calling_frame, args[], results[]) -> (category, code)`.
#[derive(Debug)]
pub enum HostOutcome {
    /// `results` has been filled in and type-checked by the caller.
    Success,
    /// The host signalled an orderly stop (e.g. a WASI `proc_exit`).
    Terminated(i32),
    /// A non-success result whose `(category, code)` is preserved verbatim so that
    /// host-defined error spaces remain distinguishable.
    Error { category: HostErrorCategory, code: u32 },
}

type HostThunk = dyn Fn(&(dyn std::any::Any + Send + Sync), CallingFrame<'_>, &[Val], &mut [Val]) -> HostOutcome
    + Send
    + Sync;

/// A host function: `(function_type, data, thunk)`.
pub struct HostFuncEntity {
    ty: FuncType,
    data: Arc<dyn std::any::Any + Send + Sync>,
    thunk: Arc<HostThunk>,
}

impl HostFuncEntity {
    pub fn new<D, F>(ty: FuncType, data: D, thunk: F) -> Self
    where
        D: std::any::Any + Send + Sync + 'static,
        F: Fn(&D, CallingFrame<'_>, &[Val], &mut [Val]) -> HostOutcome + Send + Sync + 'static,
    {
        let data: Arc<dyn std::any::Any + Send + Sync> = Arc::new(data);
        let thunk: Arc<HostThunk> = Arc::new(move |data, frame, args, results| {
            let data = data
                .downcast_ref::<D>()
                .expect("host function data type is fixed at construction");
            thunk(data, frame, args, results)
        });
        Self { ty, data, thunk }
    }

    /// Adapts a statically-typed callable into the dynamic call path: the "wrapped"
    /// variant of, where a trampoline receives the underlying callable as its
    /// first argument rather than the host writing the dynamic thunk by hand.
    pub fn wrap<D, F>(ty: FuncType, data: D, bridge: F) -> Self
    where
        D: std::any::Any + Send + Sync + 'static,
        F: Fn(&D, CallingFrame<'_>, &[Val], &mut [Val]) -> HostOutcome + Send + Sync + 'static,
    {
        Self::new(ty, data, bridge)
    }

    pub fn ty(&self) -> &FuncType {
        &self.ty
    }

    pub(crate) fn call(
        &self,
        frame: CallingFrame<'_>,
        args: &[Val],
        results: &mut [Val],
    ) -> HostOutcome {
        (self.thunk)(self.data.as_ref(), frame, args, results)
    }
}

impl std::fmt::Debug for HostFuncEntity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostFuncEntity").field("ty", &self.ty).finish_non_exhaustive()
    }
}

/// A guest function: a reference into a module instance's code section plus its
/// enclosing module instance.
#[derive(Debug, Clone)]
pub struct WasmFuncEntity {
    ty: FuncType,
    instance: ModuleInstance,
    code: Arc<CompiledFunc>,
}

impl WasmFuncEntity {
    pub(crate) fn new(ty: FuncType, instance: ModuleInstance, code: Arc<CompiledFunc>) -> Self {
        Self { ty, instance, code }
    }

    pub fn ty(&self) -> &FuncType {
        &self.ty
    }

    pub(crate) fn instance(&self) -> &ModuleInstance {
        &self.instance
    }

    pub(crate) fn code(&self) -> &Arc<CompiledFunc> {
        &self.code
    }
}

/// A function instance: either a guest function or a host function.
///
/// Invariant: the declared function type is immutable once constructed.
#[derive(Debug, Clone)]
pub enum FuncInstance {
    Wasm(WasmFuncEntity),
    Host(Arc<HostFuncEntity>),
}

impl FuncInstance {
    pub fn ty(&self) -> &FuncType {
        match self {
            Self::Wasm(f) => f.ty(),
            Self::Host(f) => f.ty(),
        }
    }
}

