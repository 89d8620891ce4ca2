use crate::{
    decode::{self, ModuleDescription},
    engine::Engine,
    error::{Error, StructuralErrorCode},
    module_instance::{ExportItem, ModuleInstance},
    store::Store,
    value::Val,
};
use std::collections::HashMap;

/// The VM's lifecycle state, advanced strictly in order:
/// `Inited -> Loaded -> Validated -> Instantiated`. An operation attempted out of
/// its required state fails structurally with
/// [`StructuralErrorCode::WrongVmWorkflow`] rather than panicking, so a
/// misbehaving host integration gets a catchable error instead of aborting the
/// process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Inited,
    Loaded,
    Validated,
    Instantiated,
}

/// A first-class VM handle bundling an [`Engine`], its [`Store`], and the
/// decode/validate/instantiate workflow a typical embedder drives end to end.
/// Lower-level callers who want direct control over the store or the
/// instantiation pipeline can use [`crate::store::Store`] and
/// [`crate::instantiate::instantiate`] without going through a `Vm` at all.
pub struct Vm {
    engine: Engine,
    store: Store,
    stage: Stage,
    pending_module: Option<ModuleDescription>,
    pending_bytes: Vec<u8>,
    active_instance: Option<ModuleInstance>,
}

impl Vm {
    pub fn new(engine: Engine) -> Self {
        Self {
            engine,
            store: Store::new(),
            stage: Stage::Inited,
            pending_module: None,
            pending_bytes: Vec::new(),
            active_instance: None,
        }
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut Store {
        &mut self.store
    }

    /// Decodes and validates `bytes`, advancing `Inited -> Loaded -> Validated`
    /// in one step since `wasmparser` validates incrementally as it parses.
    /// Callable again to replace a still-uninstantiated pending module.
    pub fn load(&mut self, bytes: Vec<u8>) -> Result<(), Error> {
        if self.stage == Stage::Instantiated {
            return Err(StructuralErrorCode::WrongVmWorkflow.into());
        }
        let module = decode::decode(&bytes)?;
        self.pending_module = Some(module);
        self.pending_bytes = bytes;
        self.stage = Stage::Validated;
        Ok(())
    }

    /// Instantiates the pending module, binding `imports` by `(module, name)`.
    /// Requires `Validated`; advances to `Instantiated`.
    pub fn instantiate(
        &mut self,
        name: Option<String>,
        imports: &HashMap<(String, String), ExportItem>,
    ) -> Result<(), Error> {
        if self.stage != Stage::Validated {
            return Err(StructuralErrorCode::WrongVmWorkflow.into());
        }
        let module = self
            .pending_module
            .as_ref()
            .ok_or(StructuralErrorCode::WrongVmWorkflow)?;
        let code = decode::code_section(&self.pending_bytes)?;
        let instance = crate::instantiate::instantiate(&mut self.store, module, &code, name.clone(), imports)?;
        if let Some(name) = name {
            self.store.register_module(name, instance.clone())?;
        }
        self.active_instance = Some(instance);
        self.stage = Stage::Instantiated;
        Ok(())
    }

    pub fn active_instance(&self) -> Result<&ModuleInstance, Error> {
        self.active_instance
            .as_ref()
            .ok_or(Error::from(StructuralErrorCode::WrongVmWorkflow))
    }

    /// Looks up and calls an exported function on the active instance by name
    /// (common embedder path; lower-level callers go through
    /// [`crate::engine::Executor::invoke`] directly).
    pub fn run(&mut self, export_name: &str, args: &[Val]) -> Result<Vec<Val>, Error> {
        let instance = self.active_instance()?.clone();
        let func = match instance.find_export(export_name) {
            Some(ExportItem::Func(func)) => func,
            Some(_) => return Err(StructuralErrorCode::FuncNotFound.into()),
            None => return Err(StructuralErrorCode::FuncNotFound.into()),
        };
        let budget = crate::cost::Budget::new(
            self.engine.config().default_budget,
            self.engine.config().checkpoint_granularity,
        );
        let mut executor = crate::engine::Executor::new(&mut self.store, budget, self.engine.config().max_call_stack_depth);
        executor.invoke(func, args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operations_out_of_order_fail_structurally() {
        let mut vm = Vm::new(Engine::default());
        let err = vm.instantiate(None, &HashMap::new()).unwrap_err();
        assert_eq!(err.kind().to_string(), Error::from(StructuralErrorCode::WrongVmWorkflow).kind().to_string());
    }

    #[test]
    fn load_then_instantiate_then_run_a_trivial_module() {
        let wat = r#"
            (module
                (func (export "answer") (result i32)
                    i32.const 42))
        "#;
        let bytes = wat::parse_str(wat).unwrap();
        let mut vm = Vm::new(Engine::default());
        vm.load(bytes).unwrap();
        vm.instantiate(None, &HashMap::new()).unwrap();
        let results = vm.run("answer", &[]).unwrap();
        assert!(matches!(results.as_slice(), [Val::I32(42)]));
    }
}
