use crate::handle::{Handle, HandleKind, RefCountedHandleManager};
use vorpal_rt::{CallingFrame, Memory};

/// Resolves a host-visible [`Handle`] for "the calling module instance's memory
/// at index 0" out of a [`CallingFrame`] (calling-frame contract: a host
/// function sees the caller's memory-at-index-0 and nothing else of its
/// internals). Capability host functions use this to turn guest pointer
/// arguments into [`Memory`] reads/writes without reaching into the store by
/// hand.
pub fn frame_memory_handle(frame: &CallingFrame<'_>, memories: &mut RefCountedHandleManager<Memory>) -> Option<Handle> {
    let memory = frame.instance()?.memory(0)?;
    memories.register(memory).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};
    use vorpal_rt::{Engine, ExportItem, FuncInstance, FuncType, HostFuncEntity, HostOutcome, Vm};

    /// `CallingFrame` is only ever handed to a host function by the executor
    /// itself (its constructor is private to `vorpal_rt`), so exercising
    /// [`frame_memory_handle`] means actually calling through a module rather
    /// than constructing a frame by hand.
    #[test]
    fn frame_exposes_the_caller_memory_when_called_from_a_module() {
        let wat = r#"
            (module
                (import "env" "check" (func))
                (memory (export "mem") 1)
                (func (export "run")
                    call 0))
        "#;
        let bytes = wat::parse_str(wat).unwrap();
        let seen = Arc::new(Mutex::new(None));
        let seen_in_thunk = seen.clone();

        let mut vm = Vm::new(Engine::default());
        vm.load(bytes).unwrap();

        let host = HostFuncEntity::new(FuncType::new([], []), (), move |_: &(), frame, _args, _results| {
            let mut memories = RefCountedHandleManager::new(HandleKind::Memory);
            *seen_in_thunk.lock().unwrap() = frame_memory_handle(&frame, &mut memories);
            HostOutcome::Success
        });
        let func_handle = vm.store_mut().alloc_func(FuncInstance::Host(Arc::new(host)));
        let mut imports = HashMap::new();
        imports.insert(("env".to_string(), "check".to_string()), ExportItem::Func(func_handle));

        vm.instantiate(None, &imports).unwrap();
        vm.run("run", &[]).unwrap();
        assert!(seen.lock().unwrap().is_some());
    }

    #[test]
    fn top_level_invocation_has_no_calling_module_instance() {
        // A host function called directly via `Executor::invoke` (not reached
        // through a `call` instruction) sees no caller.
        let wat = r#"(module (func (export "noop") (result i32) i32.const 1))"#;
        let bytes = wat::parse_str(wat).unwrap();
        let mut vm = Vm::new(Engine::default());
        vm.load(bytes).unwrap();
        vm.instantiate(None, &HashMap::new()).unwrap();
        let results = vm.run("noop", &[]).unwrap();
        assert!(matches!(results.as_slice(), [vorpal_rt::Val::I32(1)]));
    }
}
