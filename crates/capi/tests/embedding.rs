//! Exercises the embedding surface (handles, capability host, ABI thunk, exit
//! mapping) together through a real [`Vm`], the way a C-API-style embedder
//! would combine them.

use std::collections::HashMap;
use std::sync::Arc;
use vorpal_capi::{exit_code_for, proc_exit_func, random_get_func, CapabilityHost, TestCapabilityHost};
use vorpal_rt::{Engine, ExportItem, FuncInstance, HostFuncEntity, Vm};

fn wasi_module(bytes_to_read: &str) -> Vec<u8> {
    wat::parse_str(bytes_to_read).expect("fixture parses as valid WAT")
}

#[test]
fn random_get_and_proc_exit_wire_up_through_a_real_module() {
    let bytes = wasi_module(
        r#"
        (module
            (import "wasi_snapshot_preview1" "random_get" (func $random_get (param i32) (result i32)))
            (import "wasi_snapshot_preview1" "proc_exit" (func $proc_exit (param i32)))
            (func (export "run")
                (i32.const 4)
                call $random_get
                drop
                i32.const 3
                call $proc_exit))
        "#,
    );
    let host: Arc<dyn CapabilityHost> = Arc::new(TestCapabilityHost::new());

    let mut vm = Vm::new(Engine::default());
    vm.load(bytes).unwrap();

    let mut imports = HashMap::new();
    let random_handle = vm.store_mut().alloc_func(FuncInstance::Host(Arc::new(random_get_func(host.clone()))));
    imports.insert(
        ("wasi_snapshot_preview1".to_string(), "random_get".to_string()),
        ExportItem::Func(random_handle),
    );
    let exit_handle = vm.store_mut().alloc_func(FuncInstance::Host(Arc::new(proc_exit_func(host.clone()))));
    imports.insert(
        ("wasi_snapshot_preview1".to_string(), "proc_exit".to_string()),
        ExportItem::Func(exit_handle),
    );
    vm.instantiate(None, &imports).unwrap();

    let result = vm.run("run", &[]);
    assert_eq!(exit_code_for(&result), 3);
    assert_eq!(host.args(), Vec::<String>::new());
}

#[test]
fn null_host_traps_a_module_that_calls_fd_write() {
    use vorpal_capi::NullCapabilityHost;
    use vorpal_rt::{FuncType, HostOutcome, Val, ValType};

    let bytes = wasi_module(
        r#"
        (module
            (import "wasi_snapshot_preview1" "fd_write" (func $fd_write (param i32) (result i32)))
            (func (export "run") (result i32)
                i32.const 1
                call $fd_write))
        "#,
    );
    let host: Arc<dyn CapabilityHost> = Arc::new(NullCapabilityHost);

    let mut vm = Vm::new(Engine::default());
    vm.load(bytes).unwrap();

    let func = HostFuncEntity::wrap(
        FuncType::new([ValType::I32], [ValType::I32]),
        host,
        |host, _frame, args, results| {
            let Val::I32(fd) = args[0] else { unreachable!() };
            match host.fd_write(fd, b"x") {
                Ok(n) => {
                    results[0] = Val::I32(n as i32);
                    HostOutcome::Success
                }
                Err(_) => HostOutcome::Error {
                    category: vorpal_rt::HostErrorCategory::UserLevelError,
                    code: 1,
                },
            }
        },
    );
    let handle = vm.store_mut().alloc_func(FuncInstance::Host(Arc::new(func)));
    let mut imports = HashMap::new();
    imports.insert(("wasi_snapshot_preview1".to_string(), "fd_write".to_string()), ExportItem::Func(handle));
    vm.instantiate(None, &imports).unwrap();

    let err = vm.run("run", &[]).unwrap_err();
    assert!(matches!(err.kind(), vorpal_rt::ErrorKind::HostError { .. }));
}
