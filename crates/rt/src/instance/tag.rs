use crate::types::FuncType;

/// A tag instance identifies the payload type of an exception.
/// It carries no storage of its own beyond the declared signature.
#[derive(Debug, Clone)]
pub struct TagInstance {
    ty: FuncType,
}

impl TagInstance {
    pub fn new(ty: FuncType) -> Self {
        Self { ty }
    }

    pub fn ty(&self) -> &FuncType {
        &self.ty
    }
}
