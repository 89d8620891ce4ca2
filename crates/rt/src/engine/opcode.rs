use vorpal_core::UntypedVal;

/// A resolved instruction in a compiled function's flat instruction stream.
///
/// Control-flow targets are pre-resolved to absolute offsets into the owning
/// [`super::compile::CompiledFunc`]'s instruction vector at compile time, per the
/// design note that the call executor runs a flat switch over `Op` rather than
/// re-walking nested block structure on every iteration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Op {
    Unreachable,
    Nop,
    /// Unconditional jump to an absolute instruction offset.
    Br(u32),
    /// Pops an i32 condition; jumps if nonzero.
    BrIf(u32),
    /// Pops an i32 condition; jumps if zero. Used to skip an `if` construct's
    /// then-branch (`if`'s condition is consumed to *enter* the then-branch, so
    /// the fall-through case is the one that needs a jump).
    BrIfEqz(u32),
    /// Pops an i32 index; jumps to `targets[min(index, targets.len() - 1)]`. The
    /// table itself lives in [`super::compile::CompiledFunc::br_tables`], indexed
    /// by the `u32` stored here.
    BrTable(u32),
    Return,
    Call(u32),
    CallIndirect { table: u32, type_index: u32 },

    Drop,
    Select,

    LocalGet(u32),
    LocalSet(u32),
    LocalTee(u32),
    GlobalGet(u32),
    GlobalSet(u32),

    I32Load { offset: u32 },
    I64Load { offset: u32 },
    F32Load { offset: u32 },
    F64Load { offset: u32 },
    I32Load8S { offset: u32 },
    I32Load8U { offset: u32 },
    I32Load16S { offset: u32 },
    I32Load16U { offset: u32 },
    I32Store { offset: u32 },
    I64Store { offset: u32 },
    F32Store { offset: u32 },
    F64Store { offset: u32 },
    I32Store8 { offset: u32 },
    I32Store16 { offset: u32 },
    MemorySize,
    MemoryGrow,

    Const(UntypedVal),

    I32Eqz,
    I32Eq,
    I32Ne,
    I32LtS,
    I32LtU,
    I32GtS,
    I32GtU,
    I32LeS,
    I32LeU,
    I32GeS,
    I32GeU,

    I64Eqz,
    I64Eq,
    I64Ne,
    I64LtS,
    I64LtU,
    I64GtS,
    I64GtU,
    I64LeS,
    I64LeU,
    I64GeS,
    I64GeU,

    F64Eq,
    F64Ne,
    F64Lt,
    F64Gt,
    F64Le,
    F64Ge,

    I32Add,
    I32Sub,
    I32Mul,
    I32DivS,
    I32DivU,
    I32RemS,
    I32RemU,
    I32And,
    I32Or,
    I32Xor,
    I32Shl,
    I32ShrS,
    I32ShrU,

    I64Add,
    I64Sub,
    I64Mul,
    I64DivS,
    I64DivU,
    I64RemS,
    I64RemU,

    F64Add,
    F64Sub,
    F64Mul,
    F64Div,

    I32WrapI64,
    I64ExtendI32S,
    I64ExtendI32U,
    F32DemoteF64,
    F64PromoteF32,
    I32TruncF64S,
    I32TruncF64U,
    I64TruncF64S,
    I64TruncF64U,
    I32TruncSatF64S,
    I32TruncSatF64U,
    I64TruncSatF64S,
    I64TruncSatF64U,

    RefNull,
    RefIsNull,
    RefFunc(u32),
}
