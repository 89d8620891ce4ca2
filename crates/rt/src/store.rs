use crate::{
    error::{Error, GlobalError, MemoryError, StoreError, StructuralErrorCode, TableError},
    instance::{
        data::DataInstance, element::ElementInstance, func::FuncInstance, global::GlobalInstance,
        memory::MemoryInstance, table::TableInstance, tag::TagInstance,
    },
    module_instance::ModuleInstance,
    types::{GlobalType, MemoryType, RefType, TableType},
    value::Val,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use vorpal_collections::{Arena, ArenaIndex};

/// A process-wide unique identifier stamped on every handle minted by a [`Store`],
/// so a handle from one store used against another is rejected at resolution time
/// instead of silently indexing an unrelated arena.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct StoreId(u64);

impl StoreId {
    fn fresh() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

macro_rules! define_handle {
    ($name:ident, $idx:ident, $arena:ident, $inst:ty, $resolve:ident, $resolve_mut:ident) => {
        #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
        pub struct $idx(usize);

        impl ArenaIndex for $idx {
            fn into_usize(self) -> usize {
                self.0
            }
            fn from_usize(value: usize) -> Self {
                Self(value)
            }
        }

        /// An owning handle into a [`Store`]'s arena of
        #[doc = stringify!($inst)]
        /// entries.
        #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
        pub struct $name {
            store: StoreId,
            index: $idx,
        }

        impl Store {
            /// Resolves `handle` to a shared reference, failing structurally if it
            /// was minted by a different store.
            pub fn $resolve(&self, handle: $name) -> Result<&$inst, Error> {
                if handle.store != self.id {
                    return Err(StructuralErrorCode::WrongInstanceAddress.into());
                }
                self.$arena
                    .get(handle.index)
                    .ok_or(Error::from(StructuralErrorCode::WrongInstanceAddress))
            }

            /// Resolves `handle` to an exclusive reference, failing structurally if
            /// it was minted by a different store.
            pub fn $resolve_mut(&mut self, handle: $name) -> Result<&mut $inst, Error> {
                if handle.store != self.id {
                    return Err(StructuralErrorCode::WrongInstanceAddress.into());
                }
                self.$arena
                    .get_mut(handle.index)
                    .ok_or(Error::from(StructuralErrorCode::WrongInstanceAddress))
            }
        }
    };
}

define_handle!(Func, FuncIdx, funcs, FuncInstance, resolve_func, resolve_func_mut);
define_handle!(Table, TableIdx, tables, TableInstance, resolve_table, resolve_table_mut);
define_handle!(Memory, MemoryIdx, memories, MemoryInstance, resolve_memory, resolve_memory_mut);
define_handle!(Global, GlobalIdx, globals, GlobalInstance, resolve_global, resolve_global_mut);
define_handle!(Tag, TagIdx, tags, TagInstance, resolve_tag, resolve_tag_mut);
define_handle!(
    DataSegment,
    DataIdx,
    data_segments,
    DataInstance,
    resolve_data_segment,
    resolve_data_segment_mut
);
define_handle!(
    ElementSegment,
    ElementIdx,
    element_segments,
    ElementInstance,
    resolve_element_segment,
    resolve_element_segment_mut
);

/// The registry of named module instances, insertion-order-preserving even across
/// removals so re-listing names after an `unregister` never reshuffles the
/// surviving entries.
#[derive(Debug, Default)]
struct ModuleRegistry {
    slots: Vec<Option<(String, ModuleInstance)>>,
    by_name: HashMap<String, usize>,
}

impl ModuleRegistry {
    fn register(&mut self, name: String, instance: ModuleInstance) -> Result<(), StoreError> {
        if self.by_name.contains_key(&name) {
            return Err(StoreError::NameConflict);
        }
        let slot = self.slots.len();
        self.by_name.insert(name.clone(), slot);
        self.slots.push(Some((name, instance)));
        Ok(())
    }

    fn unregister(&mut self, name: &str) -> Result<ModuleInstance, StoreError> {
        let slot = self.by_name.remove(name).ok_or(StoreError::NotFound)?;
        let (_, instance) = self.slots[slot].take().expect("slot index is always valid");
        Ok(instance)
    }

    fn find(&self, name: &str) -> Option<&ModuleInstance> {
        let slot = *self.by_name.get(name)?;
        self.slots[slot].as_ref().map(|(_, instance)| instance)
    }

    fn names(&self) -> impl Iterator<Item = &str> {
        self.slots
            .iter()
            .filter_map(|slot| slot.as_ref().map(|(name, _)| name.as_str()))
    }
}

/// The runtime's allocation universe: every function, table, memory, global, tag
/// and segment instance lives in exactly one store's arenas.
#[derive(Debug)]
pub struct Store {
    id: StoreId,
    funcs: Arena<FuncIdx, FuncInstance>,
    tables: Arena<TableIdx, TableInstance>,
    memories: Arena<MemoryIdx, MemoryInstance>,
    globals: Arena<GlobalIdx, GlobalInstance>,
    tags: Arena<TagIdx, TagInstance>,
    data_segments: Arena<DataIdx, DataInstance>,
    element_segments: Arena<ElementIdx, ElementInstance>,
    modules: ModuleRegistry,
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

impl Store {
    pub fn new() -> Self {
        Self {
            id: StoreId::fresh(),
            funcs: Arena::new(),
            tables: Arena::new(),
            memories: Arena::new(),
            globals: Arena::new(),
            tags: Arena::new(),
            data_segments: Arena::new(),
            element_segments: Arena::new(),
            modules: ModuleRegistry::default(),
        }
    }

    pub fn id(&self) -> StoreId {
        self.id
    }

    pub fn alloc_func(&mut self, instance: FuncInstance) -> Func {
        Func {
            store: self.id,
            index: self.funcs.alloc(instance),
        }
    }

    pub fn alloc_table(&mut self, ty: TableType, init: Val) -> Result<Table, TableError> {
        let instance = TableInstance::new(ty, init)?;
        Ok(Table {
            store: self.id,
            index: self.tables.alloc(instance),
        })
    }

    pub fn alloc_memory(&mut self, ty: MemoryType) -> Result<Memory, MemoryError> {
        let instance = MemoryInstance::new(ty)?;
        Ok(Memory {
            store: self.id,
            index: self.memories.alloc(instance),
        })
    }

    pub fn alloc_global(&mut self, ty: GlobalType, value: Val) -> Result<Global, GlobalError> {
        let instance = GlobalInstance::new(ty, value)?;
        Ok(Global {
            store: self.id,
            index: self.globals.alloc(instance),
        })
    }

    pub fn alloc_tag(&mut self, instance: TagInstance) -> Tag {
        Tag {
            store: self.id,
            index: self.tags.alloc(instance),
        }
    }

    pub fn alloc_data_segment(&mut self, instance: DataInstance) -> DataSegment {
        DataSegment {
            store: self.id,
            index: self.data_segments.alloc(instance),
        }
    }

    pub fn alloc_element_segment(&mut self, ty: RefType, elements: Vec<Val>) -> ElementSegment {
        ElementSegment {
            store: self.id,
            index: self.element_segments.alloc(ElementInstance::new(ty, elements)),
        }
    }

    pub fn register_module(&mut self, name: impl Into<String>, instance: ModuleInstance) -> Result<(), Error> {
        self.modules.register(name.into(), instance).map_err(Error::from)
    }

    pub fn unregister_module(&mut self, name: &str) -> Result<ModuleInstance, Error> {
        self.modules.unregister(name).map_err(Error::from)
    }

    pub fn find_module(&self, name: &str) -> Option<&ModuleInstance> {
        self.modules.find(name)
    }

    pub fn module_names(&self) -> impl Iterator<Item = &str> {
        self.modules.names()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module_instance::ModuleInstanceBuilder;

    #[test]
    fn handle_from_foreign_store_is_rejected() {
        let mut a = Store::new();
        let mut b = Store::new();
        let handle = a
            .alloc_global(GlobalType::new(crate::types::ValType::I32, false), Val::I32(1))
            .unwrap();
        assert!(b.resolve_global(handle).is_err());
    }

    #[test]
    fn module_registry_preserves_insertion_order_across_removal() {
        let mut store = Store::new();
        store.register_module("a", ModuleInstanceBuilder::new(None).finish()).unwrap();
        store.register_module("b", ModuleInstanceBuilder::new(None).finish()).unwrap();
        store.register_module("c", ModuleInstanceBuilder::new(None).finish()).unwrap();
        store.unregister_module("b").unwrap();
        assert_eq!(store.module_names().collect::<Vec<_>>(), vec!["a", "c"]);
    }

    #[test]
    fn registering_a_duplicate_name_is_a_conflict() {
        let mut store = Store::new();
        store.register_module("a", ModuleInstanceBuilder::new(None).finish()).unwrap();
        let err = store
            .register_module("a", ModuleInstanceBuilder::new(None).finish())
            .unwrap_err();
        assert_eq!(err.kind().to_string(), StoreError::NameConflict.to_string());
    }
}
