use crate::abi::capability_thunk;
use crate::capability::CapabilityHost;
use std::sync::Arc;
use vorpal_rt::{Error, ErrorKind, FuncType, HostFuncEntity, HostOutcome, TrapCode, Val, ValType};

/// `SIGABRT`, used by [`exit_code_for`] to match the host-process convention for
/// an uncaught signal: `128 + signal number`.
const SIGABRT: i32 = 6;

/// A generic failure exit code for structural errors, which by definition
/// never carry a guest-supplied or signal-derived number of their own.
const GENERIC_FAILURE_EXIT_CODE: i32 = 1;

/// `proc_exit(code: i32)`: the WASI-like exit channel. Rather than
/// returning normally, this stops the call tree with `HostOutcome::Terminated`,
/// which the executor turns into a `Trap::Terminated(code)` the embedder can
/// read back via [`exit_code_for`].
pub fn proc_exit_func(host: Arc<dyn CapabilityHost>) -> HostFuncEntity {
    let ty = FuncType::new([ValType::I32], []);
    capability_thunk(ty, host, |host, _frame, args, _results| {
        let code = match args.first() {
            Some(Val::I32(n)) => *n,
            _ => 0,
        };
        host.proc_exit(code);
        HostOutcome::Terminated(code)
    })
}

/// Theuser-visible exit-code mapping a frontend applies to the outcome of a
/// top-level call: success maps to `0`, an orderly `proc_exit` maps to the
/// guest-supplied code, any other trap maps to `128 + SIGABRT`, and a structural
/// failure (API misuse, not a guest fault) maps to a generic failure code.
pub fn exit_code_for(result: &Result<Vec<Val>, Error>) -> i32 {
    let Err(err) = result else {
        return 0;
    };
    match err.as_trap_code() {
        Some(TrapCode::Terminated(code)) => code,
        Some(_) => 128 + SIGABRT,
        None => match err.kind() {
            ErrorKind::HostError { .. } => 128 + SIGABRT,
            _ => GENERIC_FAILURE_EXIT_CODE,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::TestCapabilityHost;
    use std::collections::HashMap;
    use vorpal_rt::{Engine, ExportItem, FuncInstance, Vm};

    #[test]
    fn success_maps_to_zero() {
        assert_eq!(exit_code_for(&Ok(vec![])), 0);
    }

    #[test]
    fn a_non_terminated_trap_maps_to_128_plus_sigabrt() {
        let err: Result<Vec<Val>, Error> = Err(TrapCode::Unreachable.into());
        assert_eq!(exit_code_for(&err), 128 + SIGABRT);
    }

    #[test]
    fn terminated_maps_to_the_guest_supplied_code() {
        let err: Result<Vec<Val>, Error> = Err(TrapCode::Terminated(17).into());
        assert_eq!(exit_code_for(&err), 17);
    }

    #[test]
    fn structural_failure_maps_to_the_generic_failure_code() {
        let err: Result<Vec<Val>, Error> = Err(Error::structural("bad workflow"));
        assert_eq!(exit_code_for(&err), GENERIC_FAILURE_EXIT_CODE);
    }

    #[test]
    fn a_module_calling_proc_exit_terminates_with_its_code_and_records_it_on_the_host() {
        let wat = r#"
            (module
                (import "wasi_snapshot_preview1" "proc_exit" (func (param i32)))
                (func (export "run")
                    i32.const 7
                    call 0))
        "#;
        let bytes = wat::parse_str(wat).unwrap();
        let host: Arc<dyn CapabilityHost> = Arc::new(TestCapabilityHost::new());

        let mut vm = Vm::new(Engine::default());
        vm.load(bytes).unwrap();
        let func_handle = vm.store_mut().alloc_func(FuncInstance::Host(Arc::new(proc_exit_func(host.clone()))));
        let mut imports = HashMap::new();
        imports.insert(
            ("wasi_snapshot_preview1".to_string(), "proc_exit".to_string()),
            ExportItem::Func(func_handle),
        );
        vm.instantiate(None, &imports).unwrap();

        let result = vm.run("run", &[]);
        assert_eq!(exit_code_for(&result), 7);
    }
}
