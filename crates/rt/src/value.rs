use crate::{
    instance::ExternObject,
    store::Func,
    types::{HeapType, RefType, ValType},
};
use vorpal_core::{NumType, UntypedVal};

/// A reference to a host-supplied object, opaque to the runtime.
///
/// Ownership of the referent lives entirely on the host side; the runtime only
/// ever clones this handle around.
#[derive(Debug, Clone)]
pub struct ExternRef(ExternObject);

impl ExternRef {
    pub fn new<T: core::any::Any + Send + Sync + 'static>(value: T) -> Self {
        Self(ExternObject::new(value))
    }

    pub fn downcast_ref<T: core::any::Any>(&self) -> Option<&T> {
        self.0.downcast_ref()
    }
}

/// A runtime value: the tagged union every guest-visible value is represented as.
#[derive(Debug, Clone)]
pub enum Val {
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
    V128(u128),
    FuncRef(Option<Func>),
    ExternRef(Option<ExternRef>),
}

impl Val {
    /// The [`ValType`] discriminant of this value.
    pub fn ty(&self) -> ValType {
        match self {
            Self::I32(_) => ValType::I32,
            Self::I64(_) => ValType::I64,
            Self::F32(_) => ValType::F32,
            Self::F64(_) => ValType::F64,
            Self::V128(_) => ValType::V128,
            Self::FuncRef(_) => ValType::FUNCREF,
            Self::ExternRef(_) => ValType::EXTERNREF,
        }
    }

    /// Returns `true` if this value is a null reference.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::FuncRef(None) | Self::ExternRef(None))
    }

    /// Returns the [`RefType`] of this value if it is a reference, `None` otherwise.
    pub fn as_ref_type(&self) -> Option<RefType> {
        self.ty().as_ref_type()
    }

    /// The default (zero / null) value for a [`ValType`], used to initialize
    /// globals, table slots and locals.
    pub fn default_for(ty: ValType) -> Self {
        match ty {
            ValType::Num(NumType::I32) => Self::I32(0),
            ValType::Num(NumType::I64) => Self::I64(0),
            ValType::Num(NumType::F32) => Self::F32(0.0),
            ValType::Num(NumType::F64) => Self::F64(0.0),
            ValType::Num(NumType::V128) => Self::V128(0),
            ValType::Ref(RefType {
                heap: HeapType::Extern,
                ..
            }) => Self::ExternRef(None),
            ValType::Ref(_) => Self::FuncRef(None),
        }
    }

    /// Reconstitutes a tagged [`Val`] from a raw stack slot given its declared
    /// type. Reference types never reach the untyped stack (see
    /// [`Val::into_untyped`]), so only the scalar arms are meaningful here.
    pub(crate) fn from_untyped(ty: ValType, raw: UntypedVal) -> Self {
        match ty {
            ValType::Num(NumType::I32) => Self::I32(raw.into()),
            ValType::Num(NumType::I64) => Self::I64(raw.into()),
            ValType::Num(NumType::F32) => Self::F32(raw.into()),
            ValType::Num(NumType::F64) => Self::F64(raw.into()),
            ValType::Num(NumType::V128) => Self::V128(raw.to_bits()),
            ValType::Ref(_) => {
                unreachable!("reference values never cross the untyped operand stack")
            }
        }
    }

    pub(crate) fn into_untyped(self) -> UntypedVal {
        match self {
            Self::I32(v) => v.into(),
            Self::I64(v) => v.into(),
            Self::F32(v) => v.into(),
            Self::F64(v) => v.into(),
            Self::V128(v) => v.into(),
            Self::FuncRef(_) | Self::ExternRef(_) => {
                unreachable!("reference values never cross the untyped operand stack")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_value_for_non_nullable_reference_is_still_null() {
        // Construction-time defaults are always the nullable form; callers enforcing
        // non-nullability validate separately.
        assert!(Val::default_for(ValType::FUNCREF).is_null());
    }
}
