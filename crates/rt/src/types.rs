use vorpal_core::NumType;

/// The referent kind of a reference type: what a `funcref` or `externref` may point at.
///
/// Corresponds to"referent-kind ∈ {any-func, specific-type-index, extern}".
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum HeapType {
    /// Any function, regardless of its declared type (`funcref`).
    AnyFunc,
    /// A function of exactly the declared type index (used by typed function references).
    Concrete(u32),
    /// An opaque host-owned object (`externref`).
    Extern,
}

/// A reference type: `(nullable?, referent-kind)`, compared structurally on the
/// full tuple.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct RefType {
    pub nullable: bool,
    pub heap: HeapType,
}

impl RefType {
    pub const FUNCREF: Self = Self {
        nullable: true,
        heap: HeapType::AnyFunc,
    };
    pub const EXTERNREF: Self = Self {
        nullable: true,
        heap: HeapType::Extern,
    };

    pub const fn non_nullable(heap: HeapType) -> Self {
        Self {
            nullable: false,
            heap,
        }
    }

    /// Returns `true` if a reference of type `other` may be stored where `self` is
    /// expected (covariant only on nullability for the `AnyFunc`/`Extern` top types).
    pub fn is_compatible_with(self, other: RefType) -> bool {
        self.heap == other.heap && (self.nullable || !other.nullable)
    }
}

/// The full value-type discriminant used at API boundaries and on the operand stack.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ValType {
    Num(NumType),
    Ref(RefType),
}

impl ValType {
    pub const I32: Self = Self::Num(NumType::I32);
    pub const I64: Self = Self::Num(NumType::I64);
    pub const F32: Self = Self::Num(NumType::F32);
    pub const F64: Self = Self::Num(NumType::F64);
    pub const V128: Self = Self::Num(NumType::V128);
    pub const FUNCREF: Self = Self::Ref(RefType::FUNCREF);
    pub const EXTERNREF: Self = Self::Ref(RefType::EXTERNREF);

    pub const fn is_ref(self) -> bool {
        matches!(self, Self::Ref(_))
    }

    pub const fn is_nullable_ref(self) -> bool {
        matches!(self, Self::Ref(r) if r.nullable)
    }

    pub const fn as_ref_type(self) -> Option<RefType> {
        match self {
            Self::Ref(r) => Some(r),
            Self::Num(_) => None,
        }
    }
}

impl core::fmt::Display for ValType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Num(n) => write!(f, "{n}"),
            Self::Ref(r) if r.heap == HeapType::AnyFunc => {
                write!(f, "{}funcref", if r.nullable { "" } else { "non-null " })
            }
            Self::Ref(r) if r.heap == HeapType::Extern => {
                write!(f, "{}externref", if r.nullable { "" } else { "non-null " })
            }
            Self::Ref(r) => write!(f, "(ref {} {:?})", if r.nullable { "null" } else { "" }, r.heap),
        }
    }
}

/// A resizable limit pair `{min, max?}` shared by tables and memories.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Limits {
    pub min: u64,
    pub max: Option<u64>,
}

impl Limits {
    pub const fn new(min: u64, max: Option<u64>) -> Self {
        Self { min, max }
    }

    /// Returns `true` if `size` fits within these limits.
    pub fn allows(&self, size: u64) -> bool {
        match self.max {
            Some(max) => size <= max,
            None => true,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct TableType {
    pub element: RefType,
    pub limits: Limits,
}

impl TableType {
    pub fn new(element: RefType, min: u64, max: Option<u64>) -> Self {
        Self {
            element,
            limits: Limits::new(min, max),
        }
    }
}

/// The address-model ceiling for linear memory (4 GiB of byte-addressable space,
/// per"the addressable limit (4 GiB under the baseline address model)").
pub const MAX_MEMORY_BYTES: u64 = 1 << 32;
pub const PAGE_SIZE: u64 = 64 * 1024;
pub const MAX_MEMORY_PAGES: u64 = MAX_MEMORY_BYTES / PAGE_SIZE;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct MemoryType {
    pub limits: Limits,
}

impl MemoryType {
    pub fn new(min_pages: u64, max_pages: Option<u64>) -> Self {
        Self {
            limits: Limits::new(min_pages, max_pages),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct GlobalType {
    pub content: ValType,
    pub mutable: bool,
}

impl GlobalType {
    pub const fn new(content: ValType, mutable: bool) -> Self {
        Self { content, mutable }
    }
}

/// A WASM function type: parameter and result value types.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FuncType {
    params: alloc_vec::Vec<ValType>,
    results: alloc_vec::Vec<ValType>,
}

impl FuncType {
    pub fn new(
        params: impl IntoIterator<Item = ValType>,
        results: impl IntoIterator<Item = ValType>,
    ) -> Self {
        Self {
            params: params.into_iter().collect(),
            results: results.into_iter().collect(),
        }
    }

    pub fn params(&self) -> &[ValType] {
        &self.params
    }

    pub fn results(&self) -> &[ValType] {
        &self.results
    }
}

/// Tiny indirection so this module reads the same whether or not `alloc` is the
/// only source of `Vec` in scope; kept local to avoid a top-level `extern crate
/// alloc` re-export leaking unrelated names into every module.
extern crate alloc;

mod alloc_vec {
    pub use super::alloc::vec::Vec;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_nullable_ref_is_not_compatible_with_nullable() {
        let non_null = RefType::non_nullable(HeapType::AnyFunc);
        assert!(!non_null.is_compatible_with(RefType::FUNCREF));
        assert!(RefType::FUNCREF.is_compatible_with(non_null));
    }

    #[test]
    fn limits_allow_unbounded_growth_without_max() {
        let limits = Limits::new(1, None);
        assert!(limits.allows(u64::MAX));
    }
}
