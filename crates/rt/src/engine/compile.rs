use crate::{
    engine::opcode::Op,
    error::{DecodeError, Error},
    types::ValType,
};
use vorpal_core::UntypedVal;
use wasmparser::{FunctionBody, Operator};

/// A function body translated to a flat instruction stream with every branch
/// target resolved to an absolute offset, ready for the call executor's dispatch
/// loop to index directly rather than re-walk block structure.
#[derive(Debug)]
pub struct CompiledFunc {
    pub(crate) ops: Vec<Op>,
    pub(crate) br_tables: Vec<Vec<u32>>,
    pub(crate) locals: Vec<ValType>,
    pub(crate) num_params: u32,
}

impl CompiledFunc {
    pub fn num_locals(&self) -> u32 {
        self.locals.len() as u32
    }

    pub fn num_params(&self) -> u32 {
        self.num_params
    }
}

/// Which control construct a pending `end`/`else` will close, and where any
/// forward branches targeting it need their operand patched once its address is
/// known.
enum Kind {
    Block,
    Loop { start: usize },
    If { else_jump: usize },
}

struct Frame {
    kind: Kind,
    /// Indices into `ops` of `Br`/`BrIf` instructions (and `br_tables` slots, via
    /// `PendingTable`) whose target is "the address right after this frame's
    /// matching `end`" — unknown until we get there.
    forward_patches: Vec<Patch>,
}

enum Patch {
    Op(usize),
    TableSlot(usize, usize),
}

/// Translates one function body into a [`CompiledFunc`].
///
/// Grounded on the same single-pass, backpatching approach a stack-structured
/// control-flow IR needs when lowered to flat jumps: loop targets are known the
/// moment the loop is entered (the branch goes backward to its own start), while
/// block and if targets are only known once their matching `end` is reached (the
/// branch goes forward past the construct), so those are recorded and patched in
/// at that point.
pub fn compile(body: FunctionBody<'_>, param_types: &[ValType]) -> Result<CompiledFunc, Error> {
    let mut locals = param_types.to_vec();
    let mut locals_reader = body
        .get_locals_reader()
        .map_err(|e| DecodeError::Malformed(e.to_string()))?;
    for _ in 0..locals_reader.get_count() {
        let (count, ty) = locals_reader
            .read()
            .map_err(|e| DecodeError::Malformed(e.to_string()))?;
        let ty = crate::decode::val_type_from_wasmparser(ty)?;
        for _ in 0..count {
            locals.push(ty);
        }
    }

    let mut ops = Vec::new();
    let mut br_tables: Vec<Vec<u32>> = Vec::new();
    let mut control: Vec<Frame> = vec![Frame {
        kind: Kind::Block,
        forward_patches: Vec::new(),
    }];

    let operators = body
        .get_operators_reader()
        .map_err(|e| DecodeError::Malformed(e.to_string()))?;
    for operator in operators.into_iter() {
        let operator = operator.map_err(|e| DecodeError::Malformed(e.to_string()))?;
        translate_one(operator, &mut ops, &mut br_tables, &mut control)?;
    }

    Ok(CompiledFunc {
        ops,
        br_tables,
        locals,
        num_params: param_types.len() as u32,
    })
}

fn resolve_branch(control: &mut [Frame], relative_depth: u32, patch: Patch) -> Option<u32> {
    let target_frame = control.len().checked_sub(1 + relative_depth as usize)?;
    match control[target_frame].kind {
        Kind::Loop { start } => Some(start as u32),
        Kind::Block | Kind::If { .. } => {
            control[target_frame].forward_patches.push(patch);
            None
        }
    }
}

fn translate_one(
    operator: Operator<'_>,
    ops: &mut Vec<Op>,
    br_tables: &mut Vec<Vec<u32>>,
    control: &mut Vec<Frame>,
) -> Result<(), Error> {
    use Operator as W;
    let here = ops.len();
    match operator {
        W::Block { .. } => control.push(Frame {
            kind: Kind::Block,
            forward_patches: Vec::new(),
        }),
        W::Loop { .. } => control.push(Frame {
            kind: Kind::Loop { start: here },
            forward_patches: Vec::new(),
        }),
        W::If { .. } => {
            ops.push(Op::BrIfEqz(u32::MAX)); // jumps to else (or end) when condition is zero
            let jump_op = ops.len() - 1;
            control.push(Frame {
                kind: Kind::If { else_jump: jump_op },
                forward_patches: Vec::new(),
            });
        }
        W::Else => {
            let frame = control.last_mut().expect("else without matching if");
            if let Kind::If { else_jump } = frame.kind {
                ops.push(Op::Br(u32::MAX));
                frame.forward_patches.push(Patch::Op(ops.len() - 1));
                ops[else_jump] = Op::BrIfEqz(ops.len() as u32);
            }
        }
        W::End => {
            let frame = control.pop().expect("end without matching block");
            let end_addr = ops.len() as u32;
            if let Kind::If { else_jump } = frame.kind {
                if matches!(ops.get(else_jump), Some(Op::BrIfEqz(target)) if *target == u32::MAX) {
                    ops[else_jump] = Op::BrIfEqz(end_addr);
                }
            }
            for patch in frame.forward_patches {
                match patch {
                    Patch::Op(index) => match &mut ops[index] {
                        Op::Br(target) | Op::BrIf(target) | Op::BrIfEqz(target) => *target = end_addr,
                        _ => unreachable!(),
                    },
                    Patch::TableSlot(table, slot) => br_tables[table][slot] = end_addr,
                }
            }
        }
        W::Br { relative_depth } => {
            ops.push(Op::Br(u32::MAX));
            let index = ops.len() - 1;
            if let Some(target) = resolve_branch(control, relative_depth, Patch::Op(index)) {
                ops[index] = Op::Br(target);
            }
        }
        W::BrIf { relative_depth } => {
            ops.push(Op::BrIf(u32::MAX));
            let index = ops.len() - 1;
            if let Some(target) = resolve_branch(control, relative_depth, Patch::Op(index)) {
                ops[index] = Op::BrIf(target);
            }
        }
        W::BrTable { targets } => {
            let table_index = br_tables.len();
            let mut resolved = Vec::new();
            for (slot, depth) in targets.targets().chain(std::iter::once(Ok(targets.default()))).enumerate() {
                let depth = depth.map_err(|e| DecodeError::Malformed(e.to_string()))?;
                match resolve_branch(control, depth, Patch::TableSlot(table_index, slot)) {
                    Some(target) => resolved.push(target),
                    None => resolved.push(u32::MAX),
                }
            }
            br_tables.push(resolved);
            ops.push(Op::BrTable(table_index as u32));
        }
        W::Return => ops.push(Op::Return),
        W::Unreachable => ops.push(Op::Unreachable),
        W::Nop => ops.push(Op::Nop),
        W::Call { function_index } => ops.push(Op::Call(function_index)),
        W::CallIndirect { type_index, table_index, .. } => {
            ops.push(Op::CallIndirect { table: table_index, type_index });
        }
        W::Drop => ops.push(Op::Drop),
        W::Select | W::TypedSelect { .. } => ops.push(Op::Select),
        W::LocalGet { local_index } => ops.push(Op::LocalGet(local_index)),
        W::LocalSet { local_index } => ops.push(Op::LocalSet(local_index)),
        W::LocalTee { local_index } => ops.push(Op::LocalTee(local_index)),
        W::GlobalGet { global_index } => ops.push(Op::GlobalGet(global_index)),
        W::GlobalSet { global_index } => ops.push(Op::GlobalSet(global_index)),

        W::I32Load { memarg } => ops.push(Op::I32Load { offset: memarg.offset as u32 }),
        W::I64Load { memarg } => ops.push(Op::I64Load { offset: memarg.offset as u32 }),
        W::F32Load { memarg } => ops.push(Op::F32Load { offset: memarg.offset as u32 }),
        W::F64Load { memarg } => ops.push(Op::F64Load { offset: memarg.offset as u32 }),
        W::I32Load8S { memarg } => ops.push(Op::I32Load8S { offset: memarg.offset as u32 }),
        W::I32Load8U { memarg } => ops.push(Op::I32Load8U { offset: memarg.offset as u32 }),
        W::I32Load16S { memarg } => ops.push(Op::I32Load16S { offset: memarg.offset as u32 }),
        W::I32Load16U { memarg } => ops.push(Op::I32Load16U { offset: memarg.offset as u32 }),
        W::I32Store { memarg } => ops.push(Op::I32Store { offset: memarg.offset as u32 }),
        W::I64Store { memarg } => ops.push(Op::I64Store { offset: memarg.offset as u32 }),
        W::F32Store { memarg } => ops.push(Op::F32Store { offset: memarg.offset as u32 }),
        W::F64Store { memarg } => ops.push(Op::F64Store { offset: memarg.offset as u32 }),
        W::I32Store8 { memarg } => ops.push(Op::I32Store8 { offset: memarg.offset as u32 }),
        W::I32Store16 { memarg } => ops.push(Op::I32Store16 { offset: memarg.offset as u32 }),
        W::MemorySize { .. } => ops.push(Op::MemorySize),
        W::MemoryGrow { .. } => ops.push(Op::MemoryGrow),

        W::I32Const { value } => ops.push(Op::Const(UntypedVal::from(value))),
        W::I64Const { value } => ops.push(Op::Const(UntypedVal::from(value))),
        W::F32Const { value } => ops.push(Op::Const(UntypedVal::from(f32::from_bits(value.bits())))),
        W::F64Const { value } => ops.push(Op::Const(UntypedVal::from(f64::from_bits(value.bits())))),

        W::I32Eqz => ops.push(Op::I32Eqz),
        W::I32Eq => ops.push(Op::I32Eq),
        W::I32Ne => ops.push(Op::I32Ne),
        W::I32LtS => ops.push(Op::I32LtS),
        W::I32LtU => ops.push(Op::I32LtU),
        W::I32GtS => ops.push(Op::I32GtS),
        W::I32GtU => ops.push(Op::I32GtU),
        W::I32LeS => ops.push(Op::I32LeS),
        W::I32LeU => ops.push(Op::I32LeU),
        W::I32GeS => ops.push(Op::I32GeS),
        W::I32GeU => ops.push(Op::I32GeU),

        W::I64Eqz => ops.push(Op::I64Eqz),
        W::I64Eq => ops.push(Op::I64Eq),
        W::I64Ne => ops.push(Op::I64Ne),
        W::I64LtS => ops.push(Op::I64LtS),
        W::I64LtU => ops.push(Op::I64LtU),
        W::I64GtS => ops.push(Op::I64GtS),
        W::I64GtU => ops.push(Op::I64GtU),
        W::I64LeS => ops.push(Op::I64LeS),
        W::I64LeU => ops.push(Op::I64LeU),
        W::I64GeS => ops.push(Op::I64GeS),
        W::I64GeU => ops.push(Op::I64GeU),

        W::F64Eq => ops.push(Op::F64Eq),
        W::F64Ne => ops.push(Op::F64Ne),
        W::F64Lt => ops.push(Op::F64Lt),
        W::F64Gt => ops.push(Op::F64Gt),
        W::F64Le => ops.push(Op::F64Le),
        W::F64Ge => ops.push(Op::F64Ge),

        W::I32Add => ops.push(Op::I32Add),
        W::I32Sub => ops.push(Op::I32Sub),
        W::I32Mul => ops.push(Op::I32Mul),
        W::I32DivS => ops.push(Op::I32DivS),
        W::I32DivU => ops.push(Op::I32DivU),
        W::I32RemS => ops.push(Op::I32RemS),
        W::I32RemU => ops.push(Op::I32RemU),
        W::I32And => ops.push(Op::I32And),
        W::I32Or => ops.push(Op::I32Or),
        W::I32Xor => ops.push(Op::I32Xor),
        W::I32Shl => ops.push(Op::I32Shl),
        W::I32ShrS => ops.push(Op::I32ShrS),
        W::I32ShrU => ops.push(Op::I32ShrU),

        W::I64Add => ops.push(Op::I64Add),
        W::I64Sub => ops.push(Op::I64Sub),
        W::I64Mul => ops.push(Op::I64Mul),
        W::I64DivS => ops.push(Op::I64DivS),
        W::I64DivU => ops.push(Op::I64DivU),
        W::I64RemS => ops.push(Op::I64RemS),
        W::I64RemU => ops.push(Op::I64RemU),

        W::F64Add => ops.push(Op::F64Add),
        W::F64Sub => ops.push(Op::F64Sub),
        W::F64Mul => ops.push(Op::F64Mul),
        W::F64Div => ops.push(Op::F64Div),

        W::I32WrapI64 => ops.push(Op::I32WrapI64),
        W::I64ExtendI32S => ops.push(Op::I64ExtendI32S),
        W::I64ExtendI32U => ops.push(Op::I64ExtendI32U),
        W::F32DemoteF64 => ops.push(Op::F32DemoteF64),
        W::F64PromoteF32 => ops.push(Op::F64PromoteF32),
        W::I32TruncF64S => ops.push(Op::I32TruncF64S),
        W::I32TruncF64U => ops.push(Op::I32TruncF64U),
        W::I64TruncF64S => ops.push(Op::I64TruncF64S),
        W::I64TruncF64U => ops.push(Op::I64TruncF64U),
        W::I32TruncSatF64S => ops.push(Op::I32TruncSatF64S),
        W::I32TruncSatF64U => ops.push(Op::I32TruncSatF64U),
        W::I64TruncSatF64S => ops.push(Op::I64TruncSatF64S),
        W::I64TruncSatF64U => ops.push(Op::I64TruncSatF64U),

        W::RefNull { .. } => ops.push(Op::RefNull),
        W::RefIsNull => ops.push(Op::RefIsNull),
        W::RefFunc { function_index } => ops.push(Op::RefFunc(function_index)),

        other => {
            return Err(DecodeError::Malformed(format!("unsupported operator: {other:?}")).into());
        }
    }
    Ok(())
}
