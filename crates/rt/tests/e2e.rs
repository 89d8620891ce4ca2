//! End-to-end scenarios exercising a [`Vm`] the way a real embedder would: load
//! a binary, wire up imports, instantiate, and run.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use vorpal_rt::{
    AsyncTask, Engine, Error, ExportItem, FuncInstance, FuncType, HostFuncEntity, HostOutcome, TrapCode, Val,
    ValType, Vm,
};

fn load(wat: &str) -> Vec<u8> {
    wat::parse_str(wat).expect("fixture parses as valid WAT")
}

#[test]
fn arithmetic_module_adds_two_operands() {
    let bytes = load(
        r#"
        (module
            (func (export "add") (param i32 i32) (result i32)
                local.get 0
                local.get 1
                i32.add))
        "#,
    );
    let mut vm = Vm::new(Engine::default());
    vm.load(bytes).unwrap();
    vm.instantiate(None, &HashMap::new()).unwrap();
    let results = vm.run("add", &[Val::I32(17), Val::I32(25)]).unwrap();
    assert!(matches!(results.as_slice(), [Val::I32(42)]));
}

#[test]
fn guest_function_calls_an_imported_host_function() {
    let bytes = load(
        r#"
        (module
            (import "env" "double" (func (param i32) (result i32)))
            (func (export "quadruple") (param i32) (result i32)
                local.get 0
                call 0
                call 0))
        "#,
    );
    let mut vm = Vm::new(Engine::default());
    vm.load(bytes).unwrap();

    let host = HostFuncEntity::new(
        FuncType::new([ValType::I32], [ValType::I32]),
        (),
        |_: &(), _frame, args, results| {
            let Val::I32(n) = args[0] else { unreachable!() };
            results[0] = Val::I32(n * 2);
            HostOutcome::Success
        },
    );
    let func_handle = vm.store_mut().alloc_func(FuncInstance::Host(Arc::new(host)));
    let mut imports = HashMap::new();
    imports.insert(("env".to_string(), "double".to_string()), ExportItem::Func(func_handle));
    vm.instantiate(None, &imports).unwrap();

    let results = vm.run("quadruple", &[Val::I32(5)]).unwrap();
    assert!(matches!(results.as_slice(), [Val::I32(20)]));
}

#[test]
fn division_by_zero_traps_instead_of_panicking() {
    let bytes = load(
        r#"
        (module
            (func (export "boom") (result i32)
                i32.const 1
                i32.const 0
                i32.div_s))
        "#,
    );
    let mut vm = Vm::new(Engine::default());
    vm.load(bytes).unwrap();
    vm.instantiate(None, &HashMap::new()).unwrap();
    let err = vm.run("boom", &[]).unwrap_err();
    assert_eq!(err.as_trap_code(), Some(TrapCode::DivideByZero));
}

#[test]
fn iterative_fibonacci_computes_the_tenth_term() {
    let bytes = load(
        r#"
        (module
            (func (export "fib") (param $n i32) (result i32)
                (local $a i32) (local $b i32) (local $i i32) (local $tmp i32)
                (local.set $a (i32.const 0))
                (local.set $b (i32.const 1))
                (local.set $i (i32.const 0))
                (block $done
                    (loop $loop
                        (br_if $done (i32.ge_s (local.get $i) (local.get $n)))
                        (local.set $tmp (i32.add (local.get $a) (local.get $b)))
                        (local.set $a (local.get $b))
                        (local.set $b (local.get $tmp))
                        (local.set $i (i32.add (local.get $i) (i32.const 1)))
                        (br $loop)))
                (local.get $a)))
        "#,
    );
    let mut vm = Vm::new(Engine::default());
    vm.load(bytes).unwrap();
    vm.instantiate(None, &HashMap::new()).unwrap();
    let results = vm.run("fib", &[Val::I32(10)]).unwrap();
    assert!(matches!(results.as_slice(), [Val::I32(55)]));
}

#[test]
fn async_task_cancellation_interrupts_a_spinning_worker() {
    let bytes = load(r#"(module (func (export "noop")))"#);
    let mut vm = Vm::new(Engine::default());
    vm.load(bytes).unwrap();
    vm.instantiate(None, &HashMap::new()).unwrap();
    let func = match vm.active_instance().unwrap().find_export("noop") {
        Some(ExportItem::Func(f)) => f,
        _ => panic!("missing export"),
    };

    let task = AsyncTask::spawn(func, move |is_cancelled| {
        while !is_cancelled() {
            std::thread::sleep(Duration::from_millis(1));
        }
        Err(Error::from(TrapCode::Interrupted))
    });
    task.cancel();
    let result = task.wait();
    assert_eq!(result.unwrap_err().as_trap_code(), Some(TrapCode::Interrupted));
}

#[test]
fn reactor_mode_preserves_state_across_repeated_calls() {
    // "Reactor" usage (§8): instantiate once, then call an exported function
    // repeatedly without re-instantiating, observing state that persists in a
    // mutable global between calls.
    let bytes = load(
        r#"
        (module
            (global $counter (mut i32) (i32.const 0))
            (func (export "bump") (result i32)
                (global.set $counter (i32.add (global.get $counter) (i32.const 1)))
                (global.get $counter)))
        "#,
    );
    let mut vm = Vm::new(Engine::default());
    vm.load(bytes).unwrap();
    vm.instantiate(None, &HashMap::new()).unwrap();

    let first = vm.run("bump", &[]).unwrap();
    let second = vm.run("bump", &[]).unwrap();
    let third = vm.run("bump", &[]).unwrap();
    assert!(matches!(first.as_slice(), [Val::I32(1)]));
    assert!(matches!(second.as_slice(), [Val::I32(2)]));
    assert!(matches!(third.as_slice(), [Val::I32(3)]));
}

#[test]
fn wait_for_times_out_while_a_worker_is_still_running() {
    let bytes = load(r#"(module (func (export "noop")))"#);
    let mut vm = Vm::new(Engine::default());
    vm.load(bytes).unwrap();
    vm.instantiate(None, &HashMap::new()).unwrap();
    let func = match vm.active_instance().unwrap().find_export("noop") {
        Some(ExportItem::Func(f)) => f,
        _ => panic!("missing export"),
    };

    let started = Arc::new(Mutex::new(()));
    let guard = started.lock().unwrap();
    let started_clone = started.clone();
    let mut task = AsyncTask::spawn(func, move |_is_cancelled| {
        drop(started_clone.lock().unwrap());
        Ok(vec![])
    });
    assert!(task.wait_for(Duration::from_millis(20)).is_none());
    drop(guard);
    assert!(task.wait().is_ok());
}
