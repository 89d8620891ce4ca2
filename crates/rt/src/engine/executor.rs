use crate::{
    cost::{Budget, Statistics},
    engine::{compile::CompiledFunc, frame::CallingFrame, opcode::Op},
    error::{Error, StructuralErrorCode, TableError},
    instance::{func::HostOutcome, FuncInstance, HostFuncEntity, WasmFuncEntity},
    module_instance::ModuleInstance,
    store::{Func, Store},
    types::ValType,
    value::Val,
};
use vorpal_core::{TrapCode, UntypedVal};

/// Drives calls into a [`Store`]: the flat-dispatch interpreter loop that runs
/// compiled function bodies.
///
/// Holds a [`Budget`] shared across the whole call tree rooted at the initial
/// [`Executor::invoke`], so a guest function that calls a host function that
/// calls back into the guest is metered as a single execution rather than reset
/// at every re-entry.
pub struct Executor<'s> {
    store: &'s mut Store,
    budget: Budget,
    stats: Statistics,
    call_depth: u32,
    max_call_depth: u32,
    cancelled: bool,
}

impl<'s> Executor<'s> {
    pub fn new(store: &'s mut Store, budget: Budget, max_call_depth: u32) -> Self {
        Self {
            store,
            budget,
            stats: Statistics::default(),
            call_depth: 0,
            max_call_depth,
            cancelled: false,
        }
    }

    pub fn statistics(&self) -> Statistics {
        self.stats
    }

    /// Requests cooperative cancellation; observed at the executor's next
    /// checkpoint, the same mechanism the async task wrapper's `cancel`
    /// operation relies on.
    pub fn cancel(&mut self) {
        self.cancelled = true;
    }

    pub fn store(&mut self) -> &mut Store {
        self.store
    }

    /// Invokes `func` with `args`: validates argument count, runs to completion
    /// or trap, and returns the declared result values.
    pub fn invoke(&mut self, func: Func, args: &[Val]) -> Result<Vec<Val>, Error> {
        let instance = self.store.resolve_func(func)?.clone();
        if args.len() != instance.ty().params().len() {
            return Err(StructuralErrorCode::FuncSigMismatch.into());
        }
        self.call(&instance, args)
    }

    fn call(&mut self, instance: &FuncInstance, args: &[Val]) -> Result<Vec<Val>, Error> {
        self.call_depth += 1;
        if self.call_depth > self.max_call_depth {
            self.call_depth -= 1;
            return Err(TrapCode::CallStackExhausted.into());
        }
        let result = match instance {
            FuncInstance::Wasm(wasm) => self.call_wasm(wasm, args),
            FuncInstance::Host(host) => self.call_host(host, None, args),
        };
        self.call_depth -= 1;
        result
    }

    fn call_host(
        &mut self,
        host: &HostFuncEntity,
        caller: Option<ModuleInstance>,
        args: &[Val],
    ) -> Result<Vec<Val>, Error> {
        self.stats.record_host_call();
        let mut results: Vec<Val> = host.ty().results().iter().map(|ty| Val::default_for(*ty)).collect();
        let frame = CallingFrame::new(&mut *self.store, caller);
        match host.call(frame, args, &mut results) {
            HostOutcome::Success => Ok(results),
            HostOutcome::Terminated(code) => Err(TrapCode::Terminated(code).into()),
            HostOutcome::Error { category, code } => Err(Error::from_host_error(category, code)),
        }
    }

    fn call_wasm(&mut self, wasm: &WasmFuncEntity, args: &[Val]) -> Result<Vec<Val>, Error> {
        let code = wasm.code().clone();
        let instance = wasm.instance().clone();

        let mut locals: Vec<UntypedVal> = Vec::with_capacity(code.num_locals() as usize);
        for (index, ty) in code.locals.iter().enumerate() {
            let value = args
                .get(index)
                .cloned()
                .unwrap_or_else(|| Val::default_for(*ty));
            locals.push(value.into_untyped());
        }

        let mut stack: Vec<UntypedVal> = Vec::new();
        let mut pc: usize = 0;

        while pc < code.ops.len() {
            self.budget.charge(1, self.cancelled)?;
            self.stats.record_instruction();

            let mut next_pc = pc + 1;
            match code.ops[pc] {
                Op::Unreachable => return Err(TrapCode::Unreachable.into()),
                Op::Nop => {}
                Op::Br(target) => next_pc = target as usize,
                Op::BrIf(target) => {
                    if pop_i32(&mut stack)? != 0 {
                        next_pc = target as usize;
                    }
                }
                Op::BrIfEqz(target) => {
                    if pop_i32(&mut stack)? == 0 {
                        next_pc = target as usize;
                    }
                }
                Op::BrTable(table_index) => {
                    let index = pop_i32(&mut stack)? as usize;
                    let targets = &code.br_tables[table_index as usize];
                    let slot = index.min(targets.len() - 1);
                    next_pc = targets[slot] as usize;
                }
                Op::Return => break,
                Op::Call(func_index) => {
                    let callee = instance
                        .function(func_index)
                        .ok_or(StructuralErrorCode::FuncNotFound)?;
                    let callee_instance = self.store.resolve_func(callee)?.clone();
                    let arg_vals = pop_args(&mut stack, callee_instance.ty().params())?;
                    let results = match &callee_instance {
                        FuncInstance::Wasm(wasm) => self.call_wasm_guarded(wasm, &arg_vals)?,
                        FuncInstance::Host(host) => {
                            self.call_depth += 1;
                            let out = self.call_host(host, Some(instance.clone()), &arg_vals);
                            self.call_depth -= 1;
                            out?
                        }
                    };
                    push_results(&mut stack, results);
                }
                Op::CallIndirect { table, type_index: _ } => {
                    // The declared type index is checked by the validator at
                    // decode time against every element the table can hold; at
                    // call time we only need the dynamic funcref/null/type check
                    // the validator cannot perform.
                    let table_handle = instance.table(table).ok_or(StructuralErrorCode::FuncNotFound)?;
                    let elem_index = pop_i32(&mut stack)? as u64;
                    let value = self
                        .store
                        .resolve_table(table_handle)?
                        .get(elem_index)
                        .map_err(|_: TableError| TrapCode::OutOfBounds)?;
                    let callee = match value {
                        Val::FuncRef(Some(func)) => func,
                        Val::FuncRef(None) => return Err(TrapCode::UninitializedElement.into()),
                        _ => return Err(TrapCode::IndirectCallTypeMismatch.into()),
                    };
                    let callee_instance = self.store.resolve_func(callee)?.clone();
                    let arg_vals = pop_args(&mut stack, callee_instance.ty().params())?;
                    let results = self.call(&callee_instance, &arg_vals)?;
                    push_results(&mut stack, results);
                }

                Op::Drop => {
                    stack.pop().ok_or(StructuralErrorCode::FuncSigMismatch)?;
                }
                Op::Select => {
                    let cond = pop_i32(&mut stack)?;
                    let b = stack.pop().ok_or(StructuralErrorCode::FuncSigMismatch)?;
                    let a = stack.pop().ok_or(StructuralErrorCode::FuncSigMismatch)?;
                    stack.push(if cond != 0 { a } else { b });
                }

                Op::LocalGet(index) => stack.push(locals[index as usize]),
                Op::LocalSet(index) => locals[index as usize] = stack.pop().ok_or(StructuralErrorCode::FuncSigMismatch)?,
                Op::LocalTee(index) => {
                    let value = *stack.last().ok_or(StructuralErrorCode::FuncSigMismatch)?;
                    locals[index as usize] = value;
                }
                Op::GlobalGet(index) => {
                    let handle = instance.global(index).ok_or(StructuralErrorCode::FuncNotFound)?;
                    stack.push(self.store.resolve_global(handle)?.get().into_untyped());
                }
                Op::GlobalSet(index) => {
                    let handle = instance.global(index).ok_or(StructuralErrorCode::FuncNotFound)?;
                    let raw = stack.pop().ok_or(StructuralErrorCode::FuncSigMismatch)?;
                    let ty = self.store.resolve_global(handle)?.ty().content;
                    self.store
                        .resolve_global_mut(handle)?
                        .set(Val::from_untyped(ty, raw))
                        .map_err(|_| TrapCode::InvalidConversion)?;
                }

                Op::I32Load { offset } => load(self, &instance, &mut stack, offset, 4, |b| i32::from_le_bytes(b.try_into().unwrap()) as i64)?,
                Op::I64Load { offset } => load(self, &instance, &mut stack, offset, 8, |b| i64::from_le_bytes(b.try_into().unwrap()))?,
                Op::F32Load { offset } => load_f32(self, &instance, &mut stack, offset)?,
                Op::F64Load { offset } => load_f64(self, &instance, &mut stack, offset)?,
                Op::I32Load8S { offset } => load(self, &instance, &mut stack, offset, 1, |b| b[0] as i8 as i64)?,
                Op::I32Load8U { offset } => load(self, &instance, &mut stack, offset, 1, |b| b[0] as i64)?,
                Op::I32Load16S { offset } => load(self, &instance, &mut stack, offset, 2, |b| i16::from_le_bytes(b.try_into().unwrap()) as i64)?,
                Op::I32Load16U { offset } => load(self, &instance, &mut stack, offset, 2, |b| u16::from_le_bytes(b.try_into().unwrap()) as i64)?,

                Op::I32Store { offset } => store_bytes(self, &instance, &mut stack, offset, 4, |v: i64| (v as i32).to_le_bytes().to_vec())?,
                Op::I64Store { offset } => store_bytes(self, &instance, &mut stack, offset, 8, |v: i64| v.to_le_bytes().to_vec())?,
                Op::F32Store { offset } => store_f32(self, &instance, &mut stack, offset)?,
                Op::F64Store { offset } => store_f64(self, &instance, &mut stack, offset)?,
                Op::I32Store8 { offset } => store_bytes(self, &instance, &mut stack, offset, 1, |v: i64| vec![v as u8])?,
                Op::I32Store16 { offset } => store_bytes(self, &instance, &mut stack, offset, 2, |v: i64| (v as u16).to_le_bytes().to_vec())?,

                Op::MemorySize => {
                    let handle = instance.memory(0).ok_or(StructuralErrorCode::FuncNotFound)?;
                    stack.push(UntypedVal::from(self.store.resolve_memory(handle)?.size_pages() as i32));
                }
                Op::MemoryGrow => {
                    let handle = instance.memory(0).ok_or(StructuralErrorCode::FuncNotFound)?;
                    let delta = pop_i32(&mut stack)? as u64;
                    let result = self
                        .store
                        .resolve_memory_mut(handle)?
                        .grow(delta)
                        .map(|old| old as i32)
                        .unwrap_or(-1);
                    stack.push(UntypedVal::from(result));
                }

                Op::Const(value) => stack.push(value),

                Op::I32Eqz => unary_i32(&mut stack, |a| (a == 0) as i32)?,
                Op::I32Eq => binary_i32(&mut stack, |a, b| (a == b) as i32)?,
                Op::I32Ne => binary_i32(&mut stack, |a, b| (a != b) as i32)?,
                Op::I32LtS => binary_i32(&mut stack, |a, b| (a < b) as i32)?,
                Op::I32LtU => binary_u32(&mut stack, |a, b| (a < b) as i32)?,
                Op::I32GtS => binary_i32(&mut stack, |a, b| (a > b) as i32)?,
                Op::I32GtU => binary_u32(&mut stack, |a, b| (a > b) as i32)?,
                Op::I32LeS => binary_i32(&mut stack, |a, b| (a <= b) as i32)?,
                Op::I32LeU => binary_u32(&mut stack, |a, b| (a <= b) as i32)?,
                Op::I32GeS => binary_i32(&mut stack, |a, b| (a >= b) as i32)?,
                Op::I32GeU => binary_u32(&mut stack, |a, b| (a >= b) as i32)?,

                Op::I64Eqz => unary_i64(&mut stack, |a| (a == 0) as i32)?,
                Op::I64Eq => binary_i64_cmp(&mut stack, |a, b| (a == b) as i32)?,
                Op::I64Ne => binary_i64_cmp(&mut stack, |a, b| (a != b) as i32)?,
                Op::I64LtS => binary_i64_cmp(&mut stack, |a, b| (a < b) as i32)?,
                Op::I64LtU => binary_u64_cmp(&mut stack, |a, b| (a < b) as i32)?,
                Op::I64GtS => binary_i64_cmp(&mut stack, |a, b| (a > b) as i32)?,
                Op::I64GtU => binary_u64_cmp(&mut stack, |a, b| (a > b) as i32)?,
                Op::I64LeS => binary_i64_cmp(&mut stack, |a, b| (a <= b) as i32)?,
                Op::I64LeU => binary_u64_cmp(&mut stack, |a, b| (a <= b) as i32)?,
                Op::I64GeS => binary_i64_cmp(&mut stack, |a, b| (a >= b) as i32)?,
                Op::I64GeU => binary_u64_cmp(&mut stack, |a, b| (a >= b) as i32)?,

                Op::F64Eq => binary_f64_cmp(&mut stack, |a, b| (a == b) as i32)?,
                Op::F64Ne => binary_f64_cmp(&mut stack, |a, b| (a != b) as i32)?,
                Op::F64Lt => binary_f64_cmp(&mut stack, |a, b| (a < b) as i32)?,
                Op::F64Gt => binary_f64_cmp(&mut stack, |a, b| (a > b) as i32)?,
                Op::F64Le => binary_f64_cmp(&mut stack, |a, b| (a <= b) as i32)?,
                Op::F64Ge => binary_f64_cmp(&mut stack, |a, b| (a >= b) as i32)?,

                Op::I32Add => binary_i32_arith(&mut stack, i32::wrapping_add)?,
                Op::I32Sub => binary_i32_arith(&mut stack, i32::wrapping_sub)?,
                Op::I32Mul => binary_i32_arith(&mut stack, i32::wrapping_mul)?,
                Op::I32DivS => checked_binary_i32(&mut stack, |a, b| a.checked_div(b).ok_or(TrapCode::DivideByZero))?,
                Op::I32DivU => checked_binary_u32(&mut stack, |a, b| a.checked_div(b).ok_or(TrapCode::DivideByZero))?,
                Op::I32RemS => checked_binary_i32(&mut stack, |a, b| {
                    if b == 0 {
                        Err(TrapCode::DivideByZero)
                    } else {
                        Ok(a.wrapping_rem(b))
                    }
                })?,
                Op::I32RemU => checked_binary_u32(&mut stack, |a, b| a.checked_rem(b).ok_or(TrapCode::DivideByZero))?,
                Op::I32And => binary_i32_arith(&mut stack, |a, b| a & b)?,
                Op::I32Or => binary_i32_arith(&mut stack, |a, b| a | b)?,
                Op::I32Xor => binary_i32_arith(&mut stack, |a, b| a ^ b)?,
                Op::I32Shl => binary_i32_arith(&mut stack, |a, b| a.wrapping_shl(b as u32))?,
                Op::I32ShrS => binary_i32_arith(&mut stack, |a, b| a.wrapping_shr(b as u32))?,
                Op::I32ShrU => binary_u32_arith(&mut stack, |a, b| a.wrapping_shr(b))?,

                Op::I64Add => binary_i64_arith(&mut stack, i64::wrapping_add)?,
                Op::I64Sub => binary_i64_arith(&mut stack, i64::wrapping_sub)?,
                Op::I64Mul => binary_i64_arith(&mut stack, i64::wrapping_mul)?,
                Op::I64DivS => checked_binary_i64(&mut stack, |a, b| a.checked_div(b).ok_or(TrapCode::DivideByZero))?,
                Op::I64DivU => checked_binary_u64(&mut stack, |a, b| a.checked_div(b).ok_or(TrapCode::DivideByZero))?,
                Op::I64RemS => checked_binary_i64(&mut stack, |a, b| {
                    if b == 0 {
                        Err(TrapCode::DivideByZero)
                    } else {
                        Ok(a.wrapping_rem(b))
                    }
                })?,
                Op::I64RemU => checked_binary_u64(&mut stack, |a, b| a.checked_rem(b).ok_or(TrapCode::DivideByZero))?,

                Op::F64Add => binary_f64_arith(&mut stack, |a, b| a + b)?,
                Op::F64Sub => binary_f64_arith(&mut stack, |a, b| a - b)?,
                Op::F64Mul => binary_f64_arith(&mut stack, |a, b| a * b)?,
                Op::F64Div => binary_f64_arith(&mut stack, |a, b| a / b)?,

                Op::I32WrapI64 => unary_i64_to_i32(&mut stack, |a| a as i32)?,
                Op::I64ExtendI32S => unary_i32_to_i64(&mut stack, |a| a as i64)?,
                Op::I64ExtendI32U => unary_i32_to_i64(&mut stack, |a| (a as u32) as i64)?,
                Op::F32DemoteF64 => unary_f64_to_f32(&mut stack, |a| a as f32)?,
                Op::F64PromoteF32 => unary_f32_to_f64(&mut stack, |a| a as f64)?,
                Op::I32TruncF64S => trunc::<i32>(&mut stack)?,
                Op::I32TruncF64U => trunc::<u32>(&mut stack)?,
                Op::I64TruncF64S => trunc::<i64>(&mut stack)?,
                Op::I64TruncF64U => trunc::<u64>(&mut stack)?,
                Op::I32TruncSatF64S => sat_f64(&mut stack, vorpal_core::wasm_f64_to_i32_sat),
                Op::I32TruncSatF64U => sat_f64_u32(&mut stack),
                Op::I64TruncSatF64S => sat_f64_wide(&mut stack, vorpal_core::wasm_f64_to_i64_sat),
                Op::I64TruncSatF64U => sat_f64_wide_u64(&mut stack),

                // Reference values never cross this stack (see `Val::into_untyped`):
                // a real `funcref`/`externref` carries a store handle or host object
                // identity that no `UntypedVal` bit pattern can stand in for. Until
                // the stack grows a typed side-channel for them, reference
                // instructions fail structurally rather than fabricate a value that
                // could never be reconstituted by a later `table.set` or `call`.
                Op::RefNull | Op::RefIsNull | Op::RefFunc(_) => {
                    return Err(Error::structural(
                        "reference instructions are not supported on the interpreter's untyped operand stack",
                    ));
                }
            }
            pc = next_pc;
        }

        let ty = wasm.ty();
        let mut results = Vec::with_capacity(ty.results().len());
        for rty in ty.results().iter().rev() {
            let raw = stack.pop().ok_or(StructuralErrorCode::FuncSigMismatch)?;
            results.push(Val::from_untyped(*rty, raw));
        }
        results.reverse();
        Ok(results)
    }

    fn call_wasm_guarded(&mut self, wasm: &WasmFuncEntity, args: &[Val]) -> Result<Vec<Val>, Error> {
        self.call_depth += 1;
        if self.call_depth > self.max_call_depth {
            self.call_depth -= 1;
            return Err(TrapCode::CallStackExhausted.into());
        }
        let result = self.call_wasm(wasm, args);
        self.call_depth -= 1;
        result
    }
}

fn pop_i32(stack: &mut Vec<UntypedVal>) -> Result<i32, Error> {
    stack
        .pop()
        .map(i32::from)
        .ok_or(Error::from(StructuralErrorCode::FuncSigMismatch))
}

fn pop_args(stack: &mut Vec<UntypedVal>, params: &[ValType]) -> Result<Vec<Val>, Error> {
    let mut args = Vec::with_capacity(params.len());
    for ty in params.iter().rev() {
        let raw = stack.pop().ok_or(StructuralErrorCode::FuncSigMismatch)?;
        args.push(Val::from_untyped(*ty, raw));
    }
    args.reverse();
    Ok(args)
}

fn push_results(stack: &mut Vec<UntypedVal>, results: Vec<Val>) {
    for value in results {
        stack.push(value.into_untyped());
    }
}

fn load(
    executor: &mut Executor<'_>,
    instance: &ModuleInstance,
    stack: &mut Vec<UntypedVal>,
    offset: u32,
    width: u64,
    decode: impl Fn(&[u8]) -> i64,
) -> Result<(), Error> {
    let addr = pop_i32(stack)? as u32 as u64;
    let handle = instance.memory(0).ok_or(StructuralErrorCode::FuncNotFound)?;
    let bytes = executor
        .store
        .resolve_memory(handle)?
        .read(addr + offset as u64, width)
        .map_err(|_| TrapCode::OutOfBounds)?;
    stack.push(UntypedVal::from(decode(bytes)));
    Ok(())
}

fn load_f32(executor: &mut Executor<'_>, instance: &ModuleInstance, stack: &mut Vec<UntypedVal>, offset: u32) -> Result<(), Error> {
    let addr = pop_i32(stack)? as u32 as u64;
    let handle = instance.memory(0).ok_or(StructuralErrorCode::FuncNotFound)?;
    let bytes = executor
        .store
        .resolve_memory(handle)?
        .read(addr + offset as u64, 4)
        .map_err(|_| TrapCode::OutOfBounds)?;
    let value = f32::from_le_bytes(bytes.try_into().unwrap());
    stack.push(UntypedVal::from(value));
    Ok(())
}

fn load_f64(executor: &mut Executor<'_>, instance: &ModuleInstance, stack: &mut Vec<UntypedVal>, offset: u32) -> Result<(), Error> {
    let addr = pop_i32(stack)? as u32 as u64;
    let handle = instance.memory(0).ok_or(StructuralErrorCode::FuncNotFound)?;
    let bytes = executor
        .store
        .resolve_memory(handle)?
        .read(addr + offset as u64, 8)
        .map_err(|_| TrapCode::OutOfBounds)?;
    let value = f64::from_le_bytes(bytes.try_into().unwrap());
    stack.push(UntypedVal::from(value));
    Ok(())
}

fn store_bytes(
    executor: &mut Executor<'_>,
    instance: &ModuleInstance,
    stack: &mut Vec<UntypedVal>,
    offset: u32,
    width: u64,
    encode: impl Fn(i64) -> Vec<u8>,
) -> Result<(), Error> {
    let value = i64::from(stack.pop().ok_or(StructuralErrorCode::FuncSigMismatch)?);
    let addr = pop_i32(stack)? as u32 as u64;
    let handle = instance.memory(0).ok_or(StructuralErrorCode::FuncNotFound)?;
    let bytes = encode(value);
    debug_assert_eq!(bytes.len() as u64, width);
    executor
        .store
        .resolve_memory_mut(handle)?
        .write(addr + offset as u64, &bytes)
        .map_err(|_| TrapCode::OutOfBounds)?;
    Ok(())
}

fn store_f32(executor: &mut Executor<'_>, instance: &ModuleInstance, stack: &mut Vec<UntypedVal>, offset: u32) -> Result<(), Error> {
    let value: f32 = stack.pop().ok_or(StructuralErrorCode::FuncSigMismatch)?.into();
    let addr = pop_i32(stack)? as u32 as u64;
    let handle = instance.memory(0).ok_or(StructuralErrorCode::FuncNotFound)?;
    executor
        .store
        .resolve_memory_mut(handle)?
        .write(addr + offset as u64, &value.to_le_bytes())
        .map_err(|_| TrapCode::OutOfBounds)?;
    Ok(())
}

fn store_f64(executor: &mut Executor<'_>, instance: &ModuleInstance, stack: &mut Vec<UntypedVal>, offset: u32) -> Result<(), Error> {
    let value: f64 = stack.pop().ok_or(StructuralErrorCode::FuncSigMismatch)?.into();
    let addr = pop_i32(stack)? as u32 as u64;
    let handle = instance.memory(0).ok_or(StructuralErrorCode::FuncNotFound)?;
    executor
        .store
        .resolve_memory_mut(handle)?
        .write(addr + offset as u64, &value.to_le_bytes())
        .map_err(|_| TrapCode::OutOfBounds)?;
    Ok(())
}

fn unary_i32(stack: &mut Vec<UntypedVal>, f: impl Fn(i32) -> i32) -> Result<(), Error> {
    let a = pop_i32(stack)?;
    stack.push(UntypedVal::from(f(a)));
    Ok(())
}
fn unary_i64(stack: &mut Vec<UntypedVal>, f: impl Fn(i64) -> i32) -> Result<(), Error> {
    let a: i64 = stack.pop().ok_or(StructuralErrorCode::FuncSigMismatch)?.into();
    stack.push(UntypedVal::from(f(a)));
    Ok(())
}
fn binary_i32(stack: &mut Vec<UntypedVal>, f: impl Fn(i32, i32) -> i32) -> Result<(), Error> {
    let b = pop_i32(stack)?;
    let a = pop_i32(stack)?;
    stack.push(UntypedVal::from(f(a, b)));
    Ok(())
}
fn binary_u32(stack: &mut Vec<UntypedVal>, f: impl Fn(u32, u32) -> i32) -> Result<(), Error> {
    let b = pop_i32(stack)? as u32;
    let a = pop_i32(stack)? as u32;
    stack.push(UntypedVal::from(f(a, b)));
    Ok(())
}
fn binary_i32_arith(stack: &mut Vec<UntypedVal>, f: impl Fn(i32, i32) -> i32) -> Result<(), Error> {
    binary_i32(stack, f)
}
fn binary_u32_arith(stack: &mut Vec<UntypedVal>, f: impl Fn(u32, u32) -> u32) -> Result<(), Error> {
    let b = pop_i32(stack)? as u32;
    let a = pop_i32(stack)? as u32;
    stack.push(UntypedVal::from(f(a, b) as i32));
    Ok(())
}
fn checked_binary_i32(stack: &mut Vec<UntypedVal>, f: impl Fn(i32, i32) -> Result<i32, TrapCode>) -> Result<(), Error> {
    let b = pop_i32(stack)?;
    let a = pop_i32(stack)?;
    stack.push(UntypedVal::from(f(a, b)?));
    Ok(())
}
fn checked_binary_u32(stack: &mut Vec<UntypedVal>, f: impl Fn(u32, u32) -> Result<u32, TrapCode>) -> Result<(), Error> {
    let b = pop_i32(stack)? as u32;
    let a = pop_i32(stack)? as u32;
    stack.push(UntypedVal::from(f(a, b)? as i32));
    Ok(())
}
fn binary_i64_arith(stack: &mut Vec<UntypedVal>, f: impl Fn(i64, i64) -> i64) -> Result<(), Error> {
    let b: i64 = stack.pop().ok_or(StructuralErrorCode::FuncSigMismatch)?.into();
    let a: i64 = stack.pop().ok_or(StructuralErrorCode::FuncSigMismatch)?.into();
    stack.push(UntypedVal::from(f(a, b)));
    Ok(())
}
fn checked_binary_i64(stack: &mut Vec<UntypedVal>, f: impl Fn(i64, i64) -> Result<i64, TrapCode>) -> Result<(), Error> {
    let b: i64 = stack.pop().ok_or(StructuralErrorCode::FuncSigMismatch)?.into();
    let a: i64 = stack.pop().ok_or(StructuralErrorCode::FuncSigMismatch)?.into();
    stack.push(UntypedVal::from(f(a, b)?));
    Ok(())
}
fn checked_binary_u64(stack: &mut Vec<UntypedVal>, f: impl Fn(u64, u64) -> Result<u64, TrapCode>) -> Result<(), Error> {
    let b: u64 = stack.pop().ok_or(StructuralErrorCode::FuncSigMismatch)?.into();
    let a: u64 = stack.pop().ok_or(StructuralErrorCode::FuncSigMismatch)?.into();
    stack.push(UntypedVal::from(f(a, b)?));
    Ok(())
}
fn binary_i64_cmp(stack: &mut Vec<UntypedVal>, f: impl Fn(i64, i64) -> i32) -> Result<(), Error> {
    let b: i64 = stack.pop().ok_or(StructuralErrorCode::FuncSigMismatch)?.into();
    let a: i64 = stack.pop().ok_or(StructuralErrorCode::FuncSigMismatch)?.into();
    stack.push(UntypedVal::from(f(a, b)));
    Ok(())
}
fn binary_u64_cmp(stack: &mut Vec<UntypedVal>, f: impl Fn(u64, u64) -> i32) -> Result<(), Error> {
    let b: u64 = stack.pop().ok_or(StructuralErrorCode::FuncSigMismatch)?.into();
    let a: u64 = stack.pop().ok_or(StructuralErrorCode::FuncSigMismatch)?.into();
    stack.push(UntypedVal::from(f(a, b)));
    Ok(())
}
fn binary_f64_cmp(stack: &mut Vec<UntypedVal>, f: impl Fn(f64, f64) -> i32) -> Result<(), Error> {
    let b: f64 = stack.pop().ok_or(StructuralErrorCode::FuncSigMismatch)?.into();
    let a: f64 = stack.pop().ok_or(StructuralErrorCode::FuncSigMismatch)?.into();
    stack.push(UntypedVal::from(f(a, b)));
    Ok(())
}
fn binary_f64_arith(stack: &mut Vec<UntypedVal>, f: impl Fn(f64, f64) -> f64) -> Result<(), Error> {
    let b: f64 = stack.pop().ok_or(StructuralErrorCode::FuncSigMismatch)?.into();
    let a: f64 = stack.pop().ok_or(StructuralErrorCode::FuncSigMismatch)?.into();
    stack.push(UntypedVal::from(f(a, b)));
    Ok(())
}
fn unary_i64_to_i32(stack: &mut Vec<UntypedVal>, f: impl Fn(i64) -> i32) -> Result<(), Error> {
    let a: i64 = stack.pop().ok_or(StructuralErrorCode::FuncSigMismatch)?.into();
    stack.push(UntypedVal::from(f(a)));
    Ok(())
}
fn unary_i32_to_i64(stack: &mut Vec<UntypedVal>, f: impl Fn(i32) -> i64) -> Result<(), Error> {
    let a = pop_i32(stack)?;
    stack.push(UntypedVal::from(f(a)));
    Ok(())
}
fn unary_f64_to_f32(stack: &mut Vec<UntypedVal>, f: impl Fn(f64) -> f32) -> Result<(), Error> {
    let a: f64 = stack.pop().ok_or(StructuralErrorCode::FuncSigMismatch)?.into();
    stack.push(UntypedVal::from(f(a)));
    Ok(())
}
fn unary_f32_to_f64(stack: &mut Vec<UntypedVal>, f: impl Fn(f32) -> f64) -> Result<(), Error> {
    let a: f32 = stack.pop().ok_or(StructuralErrorCode::FuncSigMismatch)?.into();
    stack.push(UntypedVal::from(f(a)));
    Ok(())
}
fn trunc<T>(stack: &mut Vec<UntypedVal>) -> Result<(), Error>
where
    f64: vorpal_core::TryTruncateInto<T>,
    UntypedVal: From<T>,
{
    let a: f64 = stack.pop().ok_or(StructuralErrorCode::FuncSigMismatch)?.into();
    let v = vorpal_core::TryTruncateInto::<T>::try_truncate_into(a)?;
    stack.push(UntypedVal::from(v));
    Ok(())
}
fn sat_f64(stack: &mut Vec<UntypedVal>, f: impl Fn(f64) -> i32) {
    let a: f64 = stack.pop().unwrap_or_default().into();
    stack.push(UntypedVal::from(f(a)));
}
fn sat_f64_u32(stack: &mut Vec<UntypedVal>) {
    let a: f64 = stack.pop().unwrap_or_default().into();
    let v = if a.is_nan() || a < 0.0 {
        0u32
    } else if a >= u32::MAX as f64 {
        u32::MAX
    } else {
        a as u32
    };
    stack.push(UntypedVal::from(v as i32));
}
fn sat_f64_wide(stack: &mut Vec<UntypedVal>, f: impl Fn(f64) -> i64) {
    let a: f64 = stack.pop().unwrap_or_default().into();
    stack.push(UntypedVal::from(f(a)));
}
fn sat_f64_wide_u64(stack: &mut Vec<UntypedVal>) {
    let a: f64 = stack.pop().unwrap_or_default().into();
    let v = if a.is_nan() || a < 0.0 {
        0u64
    } else if a >= u64::MAX as f64 {
        u64::MAX
    } else {
        a as u64
    };
    stack.push(UntypedVal::from(v));
}
