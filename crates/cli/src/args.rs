use anyhow::{anyhow, bail, Context, Error, Result};
use clap::Parser;
use std::{fs, path::PathBuf, sync::Arc};
use vorpal_capi::{exit_code_for, proc_exit_func, random_get_func, CapabilityHost, TestCapabilityHost};
use vorpal_rt::{decode, Engine, ExportItem, ExternType, FuncInstance, ModuleDescription, Val, ValType, Vm};
use wasmparser::ExternalKind;

/// Runs a Wasm module against the in-memory capability host and prints the
/// result of an exported function call, then exits with themapping.
#[derive(Parser)]
pub struct RunArgs {
    /// Path to the `.wasm` or `.wat` module to run.
    #[clap(value_name = "MODULE")]
    wasm_file: PathBuf,

    /// The exported function to invoke.
    #[clap(long = "invoke", value_name = "FUNCTION")]
    invoke: Option<String>,

    /// Arguments passed to the invoked function, parsed against its declared
    /// parameter types.
    #[clap(value_name = "ARGS")]
    func_args: Vec<String>,
}

pub fn run(args: RunArgs) -> Result<i32> {
    let bytes = fs::read(&args.wasm_file)
        .with_context(|| format!("failed to read {}", args.wasm_file.display()))?;
    let bytes = if args.wasm_file.extension().is_some_and(|ext| ext == "wat") {
        wat::parse_bytes(&bytes).map_err(Error::from)?.into_owned()
    } else {
        bytes
    };

    let description = decode(&bytes)?;
    let host: Arc<dyn CapabilityHost> = Arc::new(TestCapabilityHost::new());

    let mut vm = Vm::new(Engine::default());
    vm.load(bytes)?;

    let mut imports = std::collections::HashMap::new();
    for import in &description.imports {
        let func = match (import.module.as_str(), import.name.as_str()) {
            ("wasi_snapshot_preview1", "proc_exit") => proc_exit_func(host.clone()),
            ("wasi_snapshot_preview1", "random_get") => random_get_func(host.clone()),
            (module, name) => bail!("unsupported import {module}.{name}: this CLI only wires up proc_exit and random_get"),
        };
        let handle = vm.store_mut().alloc_func(FuncInstance::Host(Arc::new(func)));
        imports.insert((import.module.clone(), import.name.clone()), ExportItem::Func(handle));
    }
    vm.instantiate(None, &imports)?;

    let export_name = args
        .invoke
        .as_deref()
        .or(description.exports.iter().find(|e| e.name == "_start").map(|_| "_start"))
        .ok_or_else(|| anyhow!("no --invoke function given and the module has no _start export"))?;

    let func_ty = export_func_type(&description, export_name)
        .ok_or_else(|| anyhow!("no exported function named {export_name}"))?;
    let call_args = decode_func_args(func_ty.params(), &args.func_args)?;

    let result = vm.run(export_name, &call_args);
    if let Ok(values) = &result {
        for value in values {
            println!("{value:?}");
        }
    }
    Ok(exit_code_for(&result))
}

fn export_func_type<'a>(description: &'a ModuleDescription, name: &str) -> Option<&'a vorpal_rt::FuncType> {
    let export = description.exports.iter().find(|e| e.name == name && e.kind == ExternalKind::Func)?;
    func_type_for_index(description, export.index)
}

fn func_type_for_index(description: &ModuleDescription, index: u32) -> Option<&vorpal_rt::FuncType> {
    let mut remaining = index;
    for import in &description.imports {
        if let ExternType::Func(ty) = &import.ty {
            if remaining == 0 {
                return Some(ty);
            }
            remaining -= 1;
        }
    }
    let defined_index = remaining as usize;
    let type_index = *description.func_type_indices.get(defined_index)?;
    description.types.get(type_index as usize)
}

fn decode_func_args(param_types: &[ValType], args: &[String]) -> Result<Vec<Val>> {
    if param_types.len() != args.len() {
        bail!("expected {} arguments, got {}", param_types.len(), args.len());
    }
    param_types
        .iter()
        .zip(args)
        .map(|(ty, arg)| decode_one(*ty, arg))
        .collect()
}

fn decode_one(ty: ValType, arg: &str) -> Result<Val> {
    let fail = |_| anyhow!("failed to parse {arg} as {ty}");
    if ty.is_ref() {
        bail!("this CLI cannot take reference-typed arguments ({ty})");
    }
    Ok(if ty == ValType::I32 {
        Val::I32(arg.parse().map_err(fail)?)
    } else if ty == ValType::I64 {
        Val::I64(arg.parse().map_err(fail)?)
    } else if ty == ValType::F32 {
        Val::F32(arg.parse().map_err(fail)?)
    } else if ty == ValType::F64 {
        Val::F64(arg.parse().map_err(fail)?)
    } else if ty == ValType::V128 {
        Val::V128(arg.parse().map_err(fail)?)
    } else {
        bail!("unsupported argument type {ty}")
    })
}
