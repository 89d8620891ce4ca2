use crate::{
    error::{DecodeError, Error},
    types::{FuncType, GlobalType, HeapType, MemoryType, RefType, TableType, ValType},
};
use wasmparser::{ExternalKind, FunctionBody, Parser, Payload, TypeRef, ValType as WpValType, Validator, WasmFeatures};

/// A constant expression, evaluated enough to drive global initializers and
/// active segment offsets. Anything beyond this narrow set (arithmetic on
/// imported globals, `extern.convert_any`, ...) is rejected at decode time rather
/// than silently mis-evaluated.
#[derive(Debug, Clone, Copy)]
pub enum ConstExpr {
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
    RefNull(RefType),
    RefFunc(u32),
    GlobalGet(u32),
}

impl ConstExpr {
    pub fn as_i32_offset(self) -> Result<i32, Error> {
        match self {
            Self::I32(v) => Ok(v),
            _ => Err(DecodeError::Malformed("offset expression did not evaluate to i32".into()).into()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ImportDescription {
    pub module: String,
    pub name: String,
    pub ty: ExternType,
}

#[derive(Debug, Clone)]
pub struct ExportDescription {
    pub name: String,
    pub kind: ExternalKind,
    pub index: u32,
}

#[derive(Debug, Clone)]
pub enum ExternType {
    Func(FuncType),
    Table(TableType),
    Memory(MemoryType),
    Global(GlobalType),
}

#[derive(Debug, Clone)]
pub struct ElementDescription {
    pub ty: RefType,
    pub function_indices: Vec<Option<u32>>,
    pub active: Option<(u32, ConstExpr)>,
}

#[derive(Debug, Clone)]
pub struct DataDescription {
    pub bytes: Vec<u8>,
    pub active: Option<(u32, ConstExpr)>,
}

/// The fully-decoded, store-independent shape of a module, the input to
/// the instantiation pipeline. Function bodies are re-read separately via
/// [`code_section`] so their borrow of the original byte slice doesn't have to be
/// threaded through every other field here.
#[derive(Debug, Clone, Default)]
pub struct ModuleDescription {
    pub types: Vec<FuncType>,
    pub imports: Vec<ImportDescription>,
    pub func_type_indices: Vec<u32>,
    pub tables: Vec<TableType>,
    pub memories: Vec<MemoryType>,
    pub globals: Vec<(GlobalType, ConstExpr)>,
    pub exports: Vec<ExportDescription>,
    pub start: Option<u32>,
    pub elements: Vec<ElementDescription>,
    pub data: Vec<DataDescription>,
}

pub fn val_type_from_wasmparser(ty: WpValType) -> Result<ValType, Error> {
    Ok(match ty {
        WpValType::I32 => ValType::I32,
        WpValType::I64 => ValType::I64,
        WpValType::F32 => ValType::F32,
        WpValType::F64 => ValType::F64,
        WpValType::V128 => ValType::V128,
        WpValType::Ref(r) => ValType::Ref(ref_type(r)?),
    })
}

fn ref_type(ty: wasmparser::RefType) -> Result<RefType, Error> {
    Ok(RefType {
        nullable: ty.is_nullable(),
        heap: if ty.is_func_ref() {
            HeapType::AnyFunc
        } else if ty.is_extern_ref() {
            HeapType::Extern
        } else {
            return Err(DecodeError::Malformed("unsupported reference type".into()).into());
        },
    })
}

fn func_type_from_wasmparser(ty: &wasmparser::FuncType) -> Result<FuncType, Error> {
    let params = ty
        .params()
        .iter()
        .map(|t| val_type_from_wasmparser(*t))
        .collect::<Result<Vec<_>, _>>()?;
    let results = ty
        .results()
        .iter()
        .map(|t| val_type_from_wasmparser(*t))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(FuncType::new(params, results))
}

fn eval_const_expr(expr: &wasmparser::ConstExpr<'_>) -> Result<ConstExpr, Error> {
    let mut reader = expr.get_operators_reader();
    let op = reader
        .read()
        .map_err(|e| DecodeError::Malformed(e.to_string()))?;
    Ok(match op {
        wasmparser::Operator::I32Const { value } => ConstExpr::I32(value),
        wasmparser::Operator::I64Const { value } => ConstExpr::I64(value),
        wasmparser::Operator::F32Const { value } => ConstExpr::F32(f32::from_bits(value.bits())),
        wasmparser::Operator::F64Const { value } => ConstExpr::F64(f64::from_bits(value.bits())),
        wasmparser::Operator::RefNull { hty, .. } => ConstExpr::RefNull(RefType {
            nullable: true,
            heap: if matches!(hty, wasmparser::HeapType::Abstract { shared: _, ty: wasmparser::AbstractHeapType::Func }) {
                HeapType::AnyFunc
            } else {
                HeapType::Extern
            },
        }),
        wasmparser::Operator::RefFunc { function_index } => ConstExpr::RefFunc(function_index),
        wasmparser::Operator::GlobalGet { global_index } => ConstExpr::GlobalGet(global_index),
        other => {
            return Err(DecodeError::Malformed(format!("unsupported constant expression: {other:?}")).into())
        }
    })
}

/// Parses and validates a WASM binary, producing a store-independent description
/// of its declared shape. Validation runs with `wasmparser`'s default
/// feature set, matching what the instantiation pipeline and call executor below
/// assume is already enforced and therefore never re-check themselves.
pub fn decode(bytes: &[u8]) -> Result<ModuleDescription, Error> {
    let mut validator = Validator::new_with_features(WasmFeatures::default());
    let mut module = ModuleDescription::default();

    for payload in Parser::new(0).parse_all(bytes) {
        let payload = payload.map_err(|e| DecodeError::Malformed(e.to_string()))?;
        validator
            .payload(&payload)
            .map_err(|e| DecodeError::Malformed(e.to_string()))?;

        match payload {
            Payload::TypeSection(reader) => {
                for group in reader {
                    let group = group.map_err(|e| DecodeError::Malformed(e.to_string()))?;
                    for sub in group.into_types() {
                        if let wasmparser::CompositeInnerType::Func(f) = &sub.composite_type.inner {
                            module.types.push(func_type_from_wasmparser(f)?);
                        }
                    }
                }
            }
            Payload::ImportSection(reader) => {
                for import in reader {
                    let import = import.map_err(|e| DecodeError::Malformed(e.to_string()))?;
                    let ty = match import.ty {
                        TypeRef::Func(idx) => ExternType::Func(
                            module
                                .types
                                .get(idx as usize)
                                .cloned()
                                .ok_or_else(|| DecodeError::Malformed("unknown type index".into()))?,
                        ),
                        TypeRef::Table(t) => {
                            ExternType::Table(TableType::new(ref_type(t.element_type)?, t.initial, t.maximum))
                        }
                        TypeRef::Memory(m) => ExternType::Memory(MemoryType::new(m.initial, m.maximum)),
                        TypeRef::Global(g) => ExternType::Global(GlobalType::new(
                            val_type_from_wasmparser(g.content_type)?,
                            g.mutable,
                        )),
                        TypeRef::Tag(_) => {
                            return Err(DecodeError::Malformed("tag imports unsupported".into()).into())
                        }
                    };
                    module.imports.push(ImportDescription {
                        module: import.module.to_string(),
                        name: import.name.to_string(),
                        ty,
                    });
                }
            }
            Payload::FunctionSection(reader) => {
                for index in reader {
                    module
                        .func_type_indices
                        .push(index.map_err(|e| DecodeError::Malformed(e.to_string()))?);
                }
            }
            Payload::TableSection(reader) => {
                for table in reader {
                    let table = table.map_err(|e| DecodeError::Malformed(e.to_string()))?;
                    module
                        .tables
                        .push(TableType::new(ref_type(table.ty.element_type)?, table.ty.initial, table.ty.maximum));
                }
            }
            Payload::MemorySection(reader) => {
                for memory in reader {
                    let memory = memory.map_err(|e| DecodeError::Malformed(e.to_string()))?;
                    module.memories.push(MemoryType::new(memory.initial, memory.maximum));
                }
            }
            Payload::GlobalSection(reader) => {
                for global in reader {
                    let global = global.map_err(|e| DecodeError::Malformed(e.to_string()))?;
                    let ty = GlobalType::new(val_type_from_wasmparser(global.ty.content_type)?, global.ty.mutable);
                    module.globals.push((ty, eval_const_expr(&global.init_expr)?));
                }
            }
            Payload::ExportSection(reader) => {
                for export in reader {
                    let export = export.map_err(|e| DecodeError::Malformed(e.to_string()))?;
                    module.exports.push(ExportDescription {
                        name: export.name.to_string(),
                        kind: export.kind,
                        index: export.index,
                    });
                }
            }
            Payload::StartSection { func, .. } => module.start = Some(func),
            Payload::ElementSection(reader) => {
                for element in reader {
                    let element = element.map_err(|e| DecodeError::Malformed(e.to_string()))?;
                    let mut indices = Vec::new();
                    let ty = match element.items {
                        wasmparser::ElementItems::Functions(fns) => {
                            for f in fns {
                                indices.push(Some(f.map_err(|e| DecodeError::Malformed(e.to_string()))?));
                            }
                            ref_type(wasmparser::RefType::FUNCREF)?
                        }
                        wasmparser::ElementItems::Expressions(wp_ty, exprs) => {
                            for _ in exprs {
                                indices.push(None);
                            }
                            ref_type(wp_ty)?
                        }
                    };
                    let active = match element.kind {
                        wasmparser::ElementKind::Active { table_index, offset_expr } => {
                            Some((table_index.unwrap_or(0), eval_const_expr(&offset_expr)?))
                        }
                        _ => None,
                    };
                    module.elements.push(ElementDescription { ty, function_indices: indices, active });
                }
            }
            Payload::DataSection(reader) => {
                for data in reader {
                    let data = data.map_err(|e| DecodeError::Malformed(e.to_string()))?;
                    let active = match data.kind {
                        wasmparser::DataKind::Active { memory_index, offset_expr } => {
                            Some((memory_index, eval_const_expr(&offset_expr)?))
                        }
                        wasmparser::DataKind::Passive => None,
                    };
                    module.data.push(DataDescription { bytes: data.data.to_vec(), active });
                }
            }
            _ => {}
        }
    }

    Ok(module)
}

/// Re-walks the code section for its function bodies, borrowing directly from
/// `bytes` so each [`FunctionBody`] can be compiled without an intermediate copy.
pub fn code_section(bytes: &[u8]) -> Result<Vec<FunctionBody<'_>>, Error> {
    let mut bodies = Vec::new();
    for payload in Parser::new(0).parse_all(bytes) {
        let payload = payload.map_err(|e| DecodeError::Malformed(e.to_string()))?;
        if let Payload::CodeSectionEntry(body) = payload {
            bodies.push(body);
        }
    }
    Ok(bodies)
}
