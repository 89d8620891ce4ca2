use crate::{
    decode::{ConstExpr, ExternType, ModuleDescription},
    engine::compile,
    error::{Error, HostErrorCategory, InstantiationError},
    instance::{func::HostOutcome, DataInstance, FuncInstance, HostFuncEntity},
    module_instance::{ExportItem, ModuleInstance, ModuleInstanceBuilder},
    store::Store,
    types::{FuncType, ValType},
    value::Val,
};
use std::collections::HashMap;
use std::sync::Arc;
use wasmparser::{ExternalKind, FunctionBody};

/// Instantiates a decoded module against `store`, running the six-stage pipeline
/// of: import resolution, allocation, constant-expression evaluation,
/// element/data materialization, export binding, and the start function.
///
/// On any failure the store is left exactly as it was passed in — nothing
/// allocated by a failed instantiation attempt is linked into an export map or
/// registered by name, so a caller who discards the `Err` leaks only inert
/// arena slots, never a half-wired module instance.
pub fn instantiate(
    store: &mut Store,
    module: &ModuleDescription,
    code: &[FunctionBody<'_>],
    name: Option<String>,
    imports: &HashMap<(String, String), ExportItem>,
) -> Result<ModuleInstance, Error> {
    let mut builder = ModuleInstanceBuilder::new(name);

    // Stage 1: import resolution.
    for import in &module.imports {
        let key = (import.module.clone(), import.name.clone());
        let provided = imports.get(&key).ok_or_else(|| {
            Error::from(InstantiationError::UnknownImport {
                module: import.module.clone(),
                name: import.name.clone(),
            })
        })?;
        bind_import(store, &mut builder, import_mismatch(import), &import.ty, *provided)?;
    }

    // Stage 2: allocation of local definitions. Local functions get a reserved
    // handle now and their real code patched in once the module instance they
    // need to close over exists (stage "tying the knot", below) — the function
    // instance's back-reference to its own module instance is otherwise
    // impossible to construct in one pass.
    let mut local_func_handles = Vec::with_capacity(module.func_type_indices.len());
    for &type_index in &module.func_type_indices {
        let ty = module
            .types
            .get(type_index as usize)
            .cloned()
            .ok_or_else(|| Error::structural("function references an unknown type index"))?;
        let handle = store.alloc_func(placeholder(ty));
        local_func_handles.push(handle);
        builder.push_function(handle);
    }

    for table_ty in &module.tables {
        let init = Val::default_for(ValType::Ref(table_ty.element));
        let handle = store.alloc_table(*table_ty, init).map_err(Error::from)?;
        builder.push_table(handle);
    }
    for memory_ty in &module.memories {
        let handle = store.alloc_memory(*memory_ty).map_err(Error::from)?;
        builder.push_memory(handle);
    }

    // Stage 3: constant-expression evaluation, for globals (may reference an
    // already-bound imported global, never a local one — the MVP ordering
    // constraint).
    for (global_ty, init_expr) in &module.globals {
        let value = eval_const_expr(store, &builder, *init_expr, global_ty.content)?;
        let handle = store.alloc_global(*global_ty, value).map_err(Error::from)?;
        builder.push_global(handle);
    }

    // Stage 4: element and data segment materialization.
    for element in &module.elements {
        let values = element
            .function_indices
            .iter()
            .map(|index| match index {
                Some(i) => Val::FuncRef(resolve_local_or_imported_func(&builder, &local_func_handles, *i)),
                None => Val::FuncRef(None),
            })
            .collect::<Vec<_>>();
        let segment = store.alloc_element_segment(element.ty, values.clone());
        builder.push_element_segment(segment);
        if let Some((table_index, offset)) = &element.active {
            let offset = offset.as_i32_offset()? as u64;
            let table = builder
                .table_at(*table_index)
                .ok_or(InstantiationError::ElementsOutOfBounds)?;
            for (i, value) in values.into_iter().enumerate() {
                store
                    .resolve_table_mut(table)?
                    .set(offset + i as u64, value)
                    .map_err(|_| InstantiationError::ElementsOutOfBounds)?;
            }
            store.resolve_element_segment_mut(segment)?.drop_in_place();
        }
    }
    for data in &module.data {
        let instance = DataInstance::new(data.bytes.clone());
        let segment = store.alloc_data_segment(instance);
        builder.push_data_segment(segment);
        if let Some((memory_index, offset)) = &data.active {
            let offset = offset.as_i32_offset()? as u64;
            let memory = builder
                .memory_at(*memory_index)
                .ok_or(InstantiationError::DataOutOfBounds)?;
            store
                .resolve_memory_mut(memory)?
                .write(offset, &data.bytes)
                .map_err(|_| InstantiationError::DataOutOfBounds)?;
            store.resolve_data_segment_mut(segment)?.drop_in_place();
        }
    }

    // Stage 5: export binding.
    for export in &module.exports {
        let item = match export.kind {
            ExternalKind::Func => ExportItem::Func(
                resolve_local_or_imported_func(&builder, &local_func_handles, export.index)
                    .ok_or_else(|| Error::structural("export references an unknown function index"))?,
            ),
            ExternalKind::Table => ExportItem::Table(
                builder
                    .table_at(export.index)
                    .ok_or_else(|| Error::structural("export references an unknown table index"))?,
            ),
            ExternalKind::Memory => ExportItem::Memory(
                builder
                    .memory_at(export.index)
                    .ok_or_else(|| Error::structural("export references an unknown memory index"))?,
            ),
            ExternalKind::Global => ExportItem::Global(
                builder
                    .global_at(export.index)
                    .ok_or_else(|| Error::structural("export references an unknown global index"))?,
            ),
            ExternalKind::Tag => {
                return Err(Error::structural("tag exports are not supported"));
            }
        };
        builder.export(export.name.clone(), item);
    }

    let instance = builder.finish();

    // Tying the knot: every local function now gets its real body, closing over
    // the finished module instance.
    for (handle, (type_index, body)) in local_func_handles.iter().zip(module.func_type_indices.iter().zip(code)) {
        let ty = module.types[*type_index as usize].clone();
        let compiled = compile(body.clone(), ty.params())?;
        let entity = crate::instance::func::WasmFuncEntity::new(ty, instance.clone(), Arc::new(compiled));
        *store.resolve_func_mut(*handle)? = FuncInstance::Wasm(entity);
    }

    // Stage 6: the start function, if declared.
    if let Some(start_index) = module.start {
        let handle = instance
            .function(start_index)
            .ok_or_else(|| Error::structural("start function references an unknown function index"))?;
        let budget = crate::cost::Budget::unlimited();
        let mut executor = crate::engine::Executor::new(store, budget, 1024);
        executor
            .invoke(handle, &[])
            .map_err(|e| match e.as_trap_code() {
                Some(trap) => Error::from(InstantiationError::StartTrapped(trap)),
                None => e,
            })?;
    }

    Ok(instance)
}

fn placeholder(ty: FuncType) -> FuncInstance {
    FuncInstance::Host(Arc::new(HostFuncEntity::new(ty, (), |_: &(), _, _, _| HostOutcome::Error {
        category: HostErrorCategory::Wasm,
        code: 0,
    })))
}

fn resolve_local_or_imported_func(
    builder: &ModuleInstanceBuilder,
    _local: &[crate::store::Func],
    index: u32,
) -> Option<crate::store::Func> {
    builder.function_at(index)
}

fn eval_const_expr(
    store: &Store,
    builder: &ModuleInstanceBuilder,
    expr: ConstExpr,
    expected: ValType,
) -> Result<Val, Error> {
    Ok(match expr {
        ConstExpr::I32(v) => Val::I32(v),
        ConstExpr::I64(v) => Val::I64(v),
        ConstExpr::F32(v) => Val::F32(v),
        ConstExpr::F64(v) => Val::F64(v),
        ConstExpr::RefNull(ty) => Val::default_for(ValType::Ref(ty)),
        ConstExpr::RefFunc(index) => Val::FuncRef(builder.function_at(index)),
        ConstExpr::GlobalGet(index) => {
            let handle = builder
                .global_at(index)
                .ok_or_else(|| Error::structural("constant expression references an unknown global index"))?;
            store.resolve_global(handle)?.get()
        }
    })
    .map(|v| {
        debug_assert_eq!(v.ty(), expected, "validator guarantees constant expression type matches");
        v
    })
}

fn import_mismatch(import: &crate::decode::ImportDescription) -> impl Fn() -> Error + '_ {
    move || {
        Error::from(InstantiationError::IncompatibleImportType {
            module: import.module.clone(),
            name: import.name.clone(),
        })
    }
}

fn bind_import(
    store: &Store,
    builder: &mut ModuleInstanceBuilder,
    mismatch: impl Fn() -> Error,
    expected: &ExternType,
    provided: ExportItem,
) -> Result<(), Error> {
    match (expected, provided) {
        (ExternType::Func(expected), ExportItem::Func(handle)) => {
            if store.resolve_func(handle)?.ty() != expected {
                return Err(mismatch());
            }
            builder.push_function(handle);
        }
        (ExternType::Table(expected), ExportItem::Table(handle)) => {
            let actual = store.resolve_table(handle)?.ty();
            if actual.element != expected.element || !limits_subsume(&expected.limits, &actual.limits) {
                return Err(mismatch());
            }
            builder.push_table(handle);
        }
        (ExternType::Memory(expected), ExportItem::Memory(handle)) => {
            let actual = store.resolve_memory(handle)?.ty();
            if !limits_subsume(&expected.limits, &actual.limits) {
                return Err(mismatch());
            }
            builder.push_memory(handle);
        }
        (ExternType::Global(expected), ExportItem::Global(handle)) => {
            let actual = store.resolve_global(handle)?.ty();
            if actual.content != expected.content || actual.mutable != expected.mutable {
                return Err(mismatch());
            }
            builder.push_global(handle);
        }
        _ => return Err(mismatch()),
    }
    Ok(())
}

fn limits_subsume(expected: &crate::types::Limits, actual: &crate::types::Limits) -> bool {
    actual.min >= expected.min
        && match (expected.max, actual.max) {
            (None, _) => true,
            (Some(_), None) => false,
            (Some(e), Some(a)) => a <= e,
        }
}
