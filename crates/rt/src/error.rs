use core::fmt::{self, Display};
pub use vorpal_core::TrapCode;

/// The root error type of the execution core.
///
/// A boxed, `#[non_exhaustive]` kind enum behind a thin newtype, so that `Error`
/// itself stays small and cheap to move around call signatures while still
/// carrying arbitrarily detailed payloads.
#[derive(Debug)]
pub struct Error {
    kind: Box<ErrorKind>,
}

impl Error {
    fn from_kind(kind: ErrorKind) -> Self {
        Self {
            kind: Box::new(kind),
        }
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    /// Returns the [`TrapCode`] carried by this error, if it is a trap rather than
    /// a structural error (distinguishes the two bands).
    pub fn as_trap_code(&self) -> Option<TrapCode> {
        match &*self.kind {
            ErrorKind::Trap(code) => Some(*code),
            _ => None,
        }
    }

    pub fn structural(message: impl Into<String>) -> Self {
        Self::from_kind(ErrorKind::Structural(Structural::Message(
            message.into().into_boxed_str(),
        )))
    }

    pub fn from_host_error(category: HostErrorCategory, code: u32) -> Self {
        Self::from_kind(ErrorKind::HostError { category, code })
    }
}

impl std::error::Error for Error {}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.kind, f)
    }
}

/// The two error bands of: structural errors (API misuse) and traps.
#[derive(Debug)]
#[non_exhaustive]
pub enum ErrorKind {
    Trap(TrapCode),
    Structural(Structural),
    Table(TableError),
    Memory(MemoryError),
    Global(GlobalError),
    Instantiation(InstantiationError),
    Store(StoreError),
    Handle(HandleError),
    Decode(DecodeError),
    /// A non-success host-function result, preserved verbatim so user-level error
    /// taxonomies remain legible to their own consumers instead of being collapsed
    /// into `TrapCode`.
    HostError { category: HostErrorCategory, code: u32 },
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Trap(t) => Display::fmt(t, f),
            Self::Structural(s) => Display::fmt(s, f),
            Self::Table(e) => Display::fmt(e, f),
            Self::Memory(e) => Display::fmt(e, f),
            Self::Global(e) => Display::fmt(e, f),
            Self::Instantiation(e) => Display::fmt(e, f),
            Self::Store(e) => Display::fmt(e, f),
            Self::Handle(e) => Display::fmt(e, f),
            Self::Decode(e) => Display::fmt(e, f),
            Self::HostError { category, code } => {
                write!(f, "host error: category={category:?} code=0x{code:x}")
            }
        }
    }
}

/// The category byte of a host function's non-success return.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum HostErrorCategory {
    Success,
    Wasm,
    UserLevelError,
}

/// Structural errors: API misuse or impossible states. Never raised as traps.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum StructuralErrorCode {
    WrongVmWorkflow,
    IllegalPath,
    UnexpectedEnd,
    MalformedMagic,
    ModuleNameConflict,
    WrongInstanceAddress,
    FuncNotFound,
    FuncSigMismatch,
    NotValidated,
    Closed,
    NonNullRequired,
    UnknownImport,
    IncompatibleImportType,
}

impl Display for StructuralErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::WrongVmWorkflow => "operation invalid in the VM's current lifecycle state",
            Self::IllegalPath => "illegal path",
            Self::UnexpectedEnd => "unexpected end of input",
            Self::MalformedMagic => "malformed module magic/version",
            Self::ModuleNameConflict => "a module instance is already registered under this name",
            Self::WrongInstanceAddress => "handle does not refer to an instance owned by this store",
            Self::FuncNotFound => "function not found",
            Self::FuncSigMismatch => "function signature mismatch",
            Self::NotValidated => "module has not been validated",
            Self::Closed => "handle has already been closed",
            Self::NonNullRequired => "null value not allowed for non-nullable reference type",
            Self::UnknownImport => "unknown import",
            Self::IncompatibleImportType => "import type incompatible with provided definition",
        };
        f.write_str(s)
    }
}

#[derive(Debug)]
pub enum Structural {
    Code(StructuralErrorCode),
    Message(Box<str>),
}

impl Display for Structural {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Code(code) => Display::fmt(code, f),
            Self::Message(msg) => f.write_str(msg),
        }
    }
}

impl From<StructuralErrorCode> for Error {
    fn from(code: StructuralErrorCode) -> Self {
        Error::from_kind(ErrorKind::Structural(Structural::Code(code)))
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum TableError {
    OutOfBounds,
    TypeMismatch,
    NonNullRequired,
    GrowOutOfBounds,
}

impl Display for TableError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::OutOfBounds => "table access out of bounds",
            Self::TypeMismatch => "table element type mismatch",
            Self::NonNullRequired => "non-nullable table element type rejects null",
            Self::GrowOutOfBounds => "table grow would exceed its maximum",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum MemoryError {
    OutOfBounds,
    GrowOutOfBounds,
}

impl Display for MemoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::OutOfBounds => "memory access out of bounds",
            Self::GrowOutOfBounds => "memory grow would exceed its maximum or the address limit",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum GlobalError {
    SetConstant,
    TypeMismatch,
    NonNullRequired,
}

impl Display for GlobalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::SetConstant => "cannot write to a constant (immutable) global",
            Self::TypeMismatch => "global value type mismatch",
            Self::NonNullRequired => "non-nullable global rejects null",
        };
        f.write_str(s)
    }
}

#[derive(Debug)]
#[non_exhaustive]
pub enum InstantiationError {
    UnknownImport { module: String, name: String },
    IncompatibleImportType { module: String, name: String },
    ElementsOutOfBounds,
    DataOutOfBounds,
    StartTrapped(TrapCode),
}

impl Display for InstantiationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownImport { module, name } => {
                write!(f, "unknown import {module}.{name}")
            }
            Self::IncompatibleImportType { module, name } => {
                write!(f, "import {module}.{name} has an incompatible type")
            }
            Self::ElementsOutOfBounds => write!(f, "active element segment out of bounds"),
            Self::DataOutOfBounds => write!(f, "active data segment out of bounds"),
            Self::StartTrapped(trap) => write!(f, "start function trapped: {trap}"),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum StoreError {
    NameConflict,
    NotFound,
}

impl Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::NameConflict => "a module instance with this name is already registered",
            Self::NotFound => "no module instance registered under this name",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum HandleError {
    Closed,
    WrongKind,
}

impl Display for HandleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Closed => "handle has been closed",
            Self::WrongKind => "handle type tag does not match the requested kind",
        };
        f.write_str(s)
    }
}

#[derive(Debug)]
#[non_exhaustive]
pub enum DecodeError {
    Malformed(String),
}

impl Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Malformed(msg) => write!(f, "malformed module: {msg}"),
        }
    }
}

macro_rules! impl_from {
    ( $( impl From<$from:ty> for Error::$variant:ident );* $(;)? ) => {
        $(
            impl From<$from> for Error {
                fn from(value: $from) -> Self {
                    Self::from_kind(ErrorKind::$variant(value))
                }
            }
        )*
    };
}
impl_from! {
    impl From<TrapCode> for Error::Trap;
    impl From<TableError> for Error::Table;
    impl From<MemoryError> for Error::Memory;
    impl From<GlobalError> for Error::Global;
    impl From<InstantiationError> for Error::Instantiation;
    impl From<StoreError> for Error::Store;
    impl From<HandleError> for Error::Handle;
    impl From<DecodeError> for Error::Decode;
}

pub type Result<T> = core::result::Result<T, Error>;
