use std::sync::{Arc, Weak};
use vorpal_collections::{SlotMap, SlotMapError};
use vorpal_rt::{Error, StructuralErrorCode};

/// Number of sequence bits packed into a handle — a handle manager can hold at
/// most `2^24` live registrations at once before registration starts failing.
pub const SEQUENCE_BITS: u32 = 24;
pub const MAX_LIVE_HANDLES: u32 = 1 << SEQUENCE_BITS;
const SEQUENCE_MASK: u32 = MAX_LIVE_HANDLES - 1;

/// The kind tag packed into a handle's top 8 bits: every
/// externally visible object the core exposes gets its own tag so a handle
/// cannot be mistaken for one of a different kind even if the numeric sequence
/// collides.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum HandleKind {
    Store = 0,
    ModuleInstance = 1,
    Func = 2,
    Table = 3,
    Memory = 4,
    Global = 5,
    AsyncTask = 6,
    Executor = 7,
    Config = 8,
    Statistics = 9,
}

/// An opaque 32-bit handle: an 8-bit [`HandleKind`] tag over a 24-bit sequence
/// number. Stable for the life of the process; never persistence-safe
/// across processes, since the sequence numbering restarts every run.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Handle(u32);

impl Handle {
    fn new(kind: HandleKind, sequence: u32) -> Self {
        debug_assert!(sequence <= SEQUENCE_MASK, "sequence exceeds the 24-bit handle field");
        Self(((kind as u32) << SEQUENCE_BITS) | (sequence & SEQUENCE_MASK))
    }

    pub fn kind(self) -> u8 {
        (self.0 >> SEQUENCE_BITS) as u8
    }

    fn sequence(self) -> u32 {
        self.0 & SEQUENCE_MASK
    }

    pub fn as_raw(self) -> u32 {
        self.0
    }

    pub fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    fn check_kind(self, expected: HandleKind) -> Result<(), Error> {
        if self.kind() != expected as u8 {
            return Err(StructuralErrorCode::WrongInstanceAddress());
        }
        Ok(())
    }
}

/// Ref-counted handle manager: the manager shares ownership
/// of `T` through an [`Arc`], so a lookup clones a new owning handle and may
/// extend the object's lifetime past a concurrent `close`.
pub struct RefCountedHandleManager<T> {
    kind: HandleKind,
    slots: SlotMap<Arc<T>>,
}

impl<T> RefCountedHandleManager<T> {
    pub fn new(kind: HandleKind) -> Self {
        Self {
            kind,
            slots: SlotMap::with_capacity(MAX_LIVE_HANDLES),
        }
    }

    pub fn register(&mut self, value: T) -> Result<Handle, Error> {
        let sequence = self
            .slots
            .insert(Arc::new(value))
            .map_err(|SlotMapError::Full| Error::structural("handle manager has no free slots"))?;
        Ok(Handle::new(self.kind, sequence))
    }

    pub fn get(&self, handle: Handle) -> Result<Arc<T>, Error> {
        handle.check_kind(self.kind)?;
        self.slots.get(handle.sequence()).cloned().ok_or_else(StructuralErrorCode::Closed)
    }

    /// Removes the mapping and frees its slot for reuse. Returns `Closed` if
    /// `handle` is no longer present — it was either never registered here or
    /// already closed.
    pub fn close(&mut self, handle: Handle) -> Result<Arc<T>, Error> {
        handle.check_kind(self.kind)?;
        self.slots.remove(handle.sequence()).ok_or_else(StructuralErrorCode::Closed)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

/// By-reference handle manager: the manager holds a
/// non-owning [`Weak`] pointer, so a lookup fails once every strong owner has
/// dropped the backing object, even if the handle itself was never closed.
pub struct ByReferenceHandleManager<T> {
    kind: HandleKind,
    slots: SlotMap<Weak<T>>,
}

impl<T> ByReferenceHandleManager<T> {
    pub fn new(kind: HandleKind) -> Self {
        Self {
            kind,
            slots: SlotMap::with_capacity(MAX_LIVE_HANDLES),
        }
    }

    pub fn register(&mut self, value: &Arc<T>) -> Result<Handle, Error> {
        let sequence = self
            .slots
            .insert(Arc::downgrade(value))
            .map_err(|SlotMapError::Full| Error::structural("handle manager has no free slots"))?;
        Ok(Handle::new(self.kind, sequence))
    }

    pub fn get(&self, handle: Handle) -> Result<Arc<T>, Error> {
        handle.check_kind(self.kind)?;
        self.slots
            .get(handle.sequence())
            .and_then(Weak::upgrade)
            .ok_or_else(StructuralErrorCode::Closed)
    }

    pub fn close(&mut self, handle: Handle) -> Result<(), Error> {
        handle.check_kind(self.kind)?;
        self.slots.remove(handle.sequence()).map(drop).ok_or_else(StructuralErrorCode::Closed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closed_handle_is_rejected() {
        let mut manager = RefCountedHandleManager::<i32>::new(HandleKind::Func);
        let handle = manager.register(42).unwrap();
        manager.close(handle).unwrap();
        assert!(manager.get(handle).is_err());
    }

    #[test]
    fn handle_from_a_different_kind_is_rejected() {
        let mut funcs = RefCountedHandleManager::<i32>::new(HandleKind::Func);
        let tables = RefCountedHandleManager::<i32>::new(HandleKind::Table);
        let handle = funcs.register(7).unwrap();
        assert!(tables.get(handle).is_err());
    }

    #[test]
    fn by_reference_lookup_fails_once_every_owner_drops() {
        let mut manager = ByReferenceHandleManager::<i32>::new(HandleKind::Memory);
        let owner = Arc::new(99);
        let handle = manager.register(&owner).unwrap();
        assert_eq!(*manager.get(handle).unwrap(), 99);
        drop(owner);
        assert!(manager.get(handle).is_err());
    }

    #[test]
    fn registration_recycles_closed_slots() {
        let mut manager = RefCountedHandleManager::<i32>::new(HandleKind::Global);
        let first = manager.register(1).unwrap();
        manager.close(first).unwrap();
        let second = manager.register(2).unwrap();
        assert_eq!(manager.len(), 1);
        assert!(manager.get(second).is_ok());
    }
}
