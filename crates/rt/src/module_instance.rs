use crate::store::{DataSegment, ElementSegment, Func, Global, Memory, Table, Tag};
use std::collections::BTreeMap;
use std::sync::Arc;

/// One of a module instance's exported items, already resolved to a concrete
/// handle.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ExportItem {
    Func(Func),
    Table(Table),
    Memory(Memory),
    Global(Global),
    Tag(Tag),
}

#[derive(Debug)]
struct ModuleInstanceData {
    name: Option<String>,
    functions: Vec<Func>,
    tables: Vec<Table>,
    memories: Vec<Memory>,
    globals: Vec<Global>,
    tags: Vec<Tag>,
    data_segments: Vec<DataSegment>,
    element_segments: Vec<ElementSegment>,
    /// Lexicographic by construction: the instantiation pipeline inserts exports in
    /// the order the module section lists them, but enumeration must be
    /// name-sorted regardless of declaration order.
    exports: BTreeMap<String, ExportItem>,
}

/// A module instance: the runtime image produced by instantiating a decoded
/// module.
///
/// Cheaply clonable: every clone shares the same backing data through an [`Arc`].
/// A function instance holds its enclosing module instance by value (a clone of
/// this handle) so that re-entrant host calls can resolve table/memory/global
/// exports without a back-pointer into the store; the module instance itself only
/// ever holds lightweight index handles into the store's arenas, so no reference
/// cycle through `Arc` is possible.
#[derive(Debug, Clone)]
pub struct ModuleInstance(Arc<ModuleInstanceData>);

impl ModuleInstance {
    pub fn name(&self) -> Option<&str> {
        self.0.name.as_deref()
    }

    pub fn function(&self, index: u32) -> Option<Func> {
        self.0.functions.get(index as usize).copied()
    }

    pub fn table(&self, index: u32) -> Option<Table> {
        self.0.tables.get(index as usize).copied()
    }

    pub fn memory(&self, index: u32) -> Option<Memory> {
        self.0.memories.get(index as usize).copied()
    }

    pub fn global(&self, index: u32) -> Option<Global> {
        self.0.globals.get(index as usize).copied()
    }

    pub fn tag(&self, index: u32) -> Option<Tag> {
        self.0.tags.get(index as usize).copied()
    }

    pub fn data_segment(&self, index: u32) -> Option<DataSegment> {
        self.0.data_segments.get(index as usize).copied()
    }

    pub fn element_segment(&self, index: u32) -> Option<ElementSegment> {
        self.0.element_segments.get(index as usize).copied()
    }

    /// Looks up an export by name.
    pub fn find_export(&self, name: &str) -> Option<ExportItem> {
        self.0.exports.get(name).copied()
    }

    /// Enumerates exports in lexicographic name order.
    pub fn exports(&self) -> impl Iterator<Item = (&str, ExportItem)> {
        self.0.exports.iter().map(|(name, item)| (name.as_str(), *item))
    }
}

/// Accumulates a module instance's tables of allocated definitions and its export
/// map during instantiation, then freezes the result.
#[derive(Debug, Default)]
pub struct ModuleInstanceBuilder {
    name: Option<String>,
    functions: Vec<Func>,
    tables: Vec<Table>,
    memories: Vec<Memory>,
    globals: Vec<Global>,
    tags: Vec<Tag>,
    data_segments: Vec<DataSegment>,
    element_segments: Vec<ElementSegment>,
    exports: BTreeMap<String, ExportItem>,
}

impl ModuleInstanceBuilder {
    pub fn new(name: Option<String>) -> Self {
        Self {
            name,
            ..Self::default()
        }
    }

    pub fn push_function(&mut self, handle: Func) -> u32 {
        push(&mut self.functions, handle)
    }

    pub fn push_table(&mut self, handle: Table) -> u32 {
        push(&mut self.tables, handle)
    }

    pub fn push_memory(&mut self, handle: Memory) -> u32 {
        push(&mut self.memories, handle)
    }

    pub fn push_global(&mut self, handle: Global) -> u32 {
        push(&mut self.globals, handle)
    }

    pub fn push_tag(&mut self, handle: Tag) -> u32 {
        push(&mut self.tags, handle)
    }

    pub fn push_data_segment(&mut self, handle: DataSegment) -> u32 {
        push(&mut self.data_segments, handle)
    }

    pub fn push_element_segment(&mut self, handle: ElementSegment) -> u32 {
        push(&mut self.element_segments, handle)
    }

    pub fn export(&mut self, name: impl Into<String>, item: ExportItem) {
        self.exports.insert(name.into(), item);
    }

    pub fn function_at(&self, index: u32) -> Option<Func> {
        self.functions.get(index as usize).copied()
    }

    pub fn table_at(&self, index: u32) -> Option<Table> {
        self.tables.get(index as usize).copied()
    }

    pub fn memory_at(&self, index: u32) -> Option<Memory> {
        self.memories.get(index as usize).copied()
    }

    pub fn global_at(&self, index: u32) -> Option<Global> {
        self.globals.get(index as usize).copied()
    }

    pub fn finish(self) -> ModuleInstance {
        ModuleInstance(Arc::new(ModuleInstanceData {
            name: self.name,
            functions: self.functions,
            tables: self.tables,
            memories: self.memories,
            globals: self.globals,
            tags: self.tags,
            data_segments: self.data_segments,
            element_segments: self.element_segments,
            exports: self.exports,
        }))
    }
}

fn push<T: Copy>(vec: &mut Vec<T>, value: T) -> u32 {
    let index = vec.len() as u32;
    vec.push(value);
    index
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Store;
    use crate::types::{GlobalType, ValType};
    use crate::value::Val;

    #[test]
    fn exports_enumerate_in_lexicographic_order() {
        let mut store = Store::new();
        let a = store.alloc_global(GlobalType::new(ValType::I32, false), Val::I32(1)).unwrap();
        let b = store.alloc_global(GlobalType::new(ValType::I32, false), Val::I32(2)).unwrap();
        let mut builder = ModuleInstanceBuilder::new(None);
        builder.push_global(a);
        builder.push_global(b);
        builder.export("zeta", ExportItem::Global(a));
        builder.export("alpha", ExportItem::Global(b));
        let instance = builder.finish();
        let names: Vec<&str> = instance.exports().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["alpha", "zeta"]);
    }
}
