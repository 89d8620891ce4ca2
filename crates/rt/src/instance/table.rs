use crate::{
    error::TableError,
    types::{RefType, TableType},
    value::Val,
};

/// A contiguous, growable sequence of reference values of a single reference type
///.
#[derive(Debug)]
pub struct TableInstance {
    element: RefType,
    ty: TableType,
    elements: Vec<Val>,
}

impl TableInstance {
    pub fn new(ty: TableType, init: Val) -> Result<Self, TableError> {
        let mut table = Self {
            element: ty.element,
            ty,
            elements: Vec::new(),
        };
        table.check_value(&init)?;
        let len = ty.limits.min as usize;
        table.elements = (0..len).map(|_| init.clone()).collect();
        Ok(table)
    }

    pub fn ty(&self) -> TableType {
        self.ty
    }

    pub fn size(&self) -> u64 {
        self.elements.len() as u64
    }

    pub fn get(&self, index: u64) -> Result<Val, TableError> {
        self.elements
            .get(index as usize)
            .cloned()
            .ok_or(TableError::OutOfBounds)
    }

    pub fn set(&mut self, index: u64, value: Val) -> Result<(), TableError> {
        self.check_value(&value)?;
        let slot = self
            .elements
            .get_mut(index as usize)
            .ok_or(TableError::OutOfBounds)?;
        *slot = value;
        Ok(())
    }

    /// Grows the table by `delta` elements initialized to `init`.
    ///
    /// Returns the old size on success. Returns [`TableError::GrowOutOfBounds`]
    /// when `size + delta` would exceed the declared maximum.
    pub fn grow(&mut self, delta: u64, init: Val) -> Result<u64, TableError> {
        self.check_value(&init)?;
        let old_size = self.size();
        if delta == 0 {
            //law: `grow(0)` is a no-op returning the current size.
            return Ok(old_size);
        }
        let new_size = old_size
            .checked_add(delta)
            .ok_or(TableError::GrowOutOfBounds)?;
        if !self.ty.limits.allows(new_size) {
            return Err(TableError::GrowOutOfBounds);
        }
        self.elements
            .resize(new_size as usize, init);
        Ok(old_size)
    }

    pub fn fill(&mut self, dst: u64, val: Val, len: u64) -> Result<(), TableError> {
        self.check_value(&val)?;
        let end = dst.checked_add(len).ok_or(TableError::OutOfBounds)?;
        if end > self.size() {
            return Err(TableError::OutOfBounds);
        }
        for i in dst..end {
            self.elements[i as usize] = val.clone();
        }
        Ok(())
    }

    pub fn copy_within(&mut self, dst: u64, src: u64, len: u64) -> Result<(), TableError> {
        let src_end = src.checked_add(len).ok_or(TableError::OutOfBounds)?;
        let dst_end = dst.checked_add(len).ok_or(TableError::OutOfBounds)?;
        if src_end > self.size() || dst_end > self.size() {
            return Err(TableError::OutOfBounds);
        }
        // Overlap-safe: use a temporary copy, tables are rarely large enough for this
        // to matter and it keeps the bulk-copy semantics obviously correct.
        let segment: Vec<Val> = self.elements[src as usize..src_end as usize].to_vec();
        self.elements[dst as usize..dst_end as usize].clone_from_slice(&segment);
        Ok(())
    }

    fn check_value(&self, value: &Val) -> Result<(), TableError> {
        let ty = value.as_ref_type().ok_or(TableError::TypeMismatch)?;
        if ty.heap != self.element.heap {
            return Err(TableError::TypeMismatch);
        }
        if !self.element.nullable && value.is_null() {
            return Err(TableError::NonNullRequired);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fresh() -> TableInstance {
        TableInstance::new(
            TableType::new(RefType::FUNCREF, 2, Some(4)),
            Val::FuncRef(None),
        )
        .unwrap()
    }

    #[test]
    fn grow_zero_is_a_noop() {
        let mut table = fresh();
        assert_eq!(table.grow(0, Val::FuncRef(None)).unwrap(), 2);
        assert_eq!(table.size(), 2);
    }

    #[test]
    fn grow_beyond_max_fails() {
        let mut table = fresh();
        assert_eq!(table.grow(3, Val::FuncRef(None)), Err(TableError::GrowOutOfBounds));
    }

    #[test]
    fn set_get_is_noop() {
        let mut table = fresh();
        let v = table.get(0).unwrap();
        table.set(0, v.clone()).unwrap();
        assert!(matches!(table.get(0).unwrap(), Val::FuncRef(None)));
    }

    #[test]
    fn set_rejects_scalar_value() {
        let mut table = fresh();
        assert_eq!(table.set(0, Val::I32(1)), Err(TableError::TypeMismatch));
    }

    #[test]
    fn out_of_bounds_boundary() {
        let table = fresh();
        assert!(table.get(1).is_ok());
        assert_eq!(table.get(2), Err(TableError::OutOfBounds));
    }
}
