//! Core numeric primitives shared by the execution engine and its embedding APIs.
//!
//! This crate knows nothing about modules, stores, or instances. It defines the
//! tagged-union-free building blocks (`NumType`, `UntypedVal`, `TrapCode`) that the
//! interpreter's hot loop and the embedding surface both rely on. Keeping this
//! separate from the engine crate mirrors the split between a numeric core and the
//! rest of an embedding API: the numeric rules of the WebAssembly spec (wraparound,
//! saturation, trapping conversions) are stable and independently testable.

#![cfg_attr(not(feature = "std"), no_std)]

mod convert;
mod trap;
mod untyped;

pub use self::{
    convert::{TryTruncateInto, wasm_f32_to_i32_sat, wasm_f32_to_i64_sat, wasm_f64_to_i32_sat, wasm_f64_to_i64_sat},
    trap::TrapCode,
    untyped::UntypedVal,
};

/// The scalar (non-reference) value kinds defined by the WebAssembly core spec.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum NumType {
    I32,
    I64,
    F32,
    F64,
    V128,
}

impl NumType {
    /// Size in bytes of a value of this type when stored in an operand slot.
    pub const fn size(self) -> usize {
        match self {
            Self::I32 | Self::F32 => 4,
            Self::I64 | Self::F64 => 8,
            Self::V128 => 16,
        }
    }
}

impl core::fmt::Display for NumType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let s = match self {
            Self::I32 => "i32",
            Self::I64 => "i64",
            Self::F32 => "f32",
            Self::F64 => "f64",
            Self::V128 => "v128",
        };
        f.write_str(s)
    }
}
