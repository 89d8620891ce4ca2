use crate::{error::GlobalError, types::GlobalType, value::Val};

/// A single mutable or constant global value cell.
#[derive(Debug)]
pub struct GlobalInstance {
    ty: GlobalType,
    value: Val,
}

impl GlobalInstance {
    pub fn new(ty: GlobalType, value: Val) -> Result<Self, GlobalError> {
        let global = Self { ty, value };
        global.check_value(&global.value)?;
        Ok(global)
    }

    pub fn ty(&self) -> GlobalType {
        self.ty
    }

    pub fn get(&self) -> Val {
        self.value.clone()
    }

    pub fn set(&mut self, value: Val) -> Result<(), GlobalError> {
        if !self.ty.mutable {
            return Err(GlobalError::SetConstant);
        }
        self.check_value(&value)?;
        self.value = value;
        Ok(())
    }

    fn check_value(&self, value: &Val) -> Result<(), GlobalError> {
        if value.ty() != self.ty.content {
            return Err(GlobalError::TypeMismatch);
        }
        if let Some(ref_ty) = value.as_ref_type() {
            if !ref_ty.nullable && value.is_null() {
                return Err(GlobalError::NonNullRequired);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ValType;

    #[test]
    fn constant_global_rejects_set() {
        let mut g = GlobalInstance::new(GlobalType::new(ValType::I32, false), Val::I32(1)).unwrap();
        assert_eq!(g.set(Val::I32(2)), Err(GlobalError::SetConstant));
    }

    #[test]
    fn mutable_global_rejects_type_mismatch() {
        let mut g = GlobalInstance::new(GlobalType::new(ValType::I32, true), Val::I32(1)).unwrap();
        assert_eq!(g.set(Val::I64(2)), Err(GlobalError::TypeMismatch));
    }

    #[test]
    fn mutable_global_set_get_round_trips() {
        let mut g = GlobalInstance::new(GlobalType::new(ValType::I32, true), Val::I32(1)).unwrap();
        g.set(Val::I32(9)).unwrap();
        assert!(matches!(g.get(), Val::I32(9)));
    }
}
