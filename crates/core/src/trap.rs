use core::fmt;

/// A runtime failure that unwinds the current invocation but leaves the store valid.
///
/// Traps are fatal to the call that raised them and never to the store: a trap
/// surfaces from the deepest `invoke` to the nearest caller without invalidating
/// any other module instance, table, memory, or global reachable through the
/// store.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum TrapCode {
    /// A table or memory access fell outside the bounds of the accessed instance.
    OutOfBounds,
    /// An integer division or remainder by zero was attempted.
    DivideByZero,
    /// An integer operation overflowed (e.g. `i32::MIN / -1`).
    IntegerOverflow,
    /// A non-saturating float-to-integer conversion encountered NaN or an out-of-range value.
    InvalidConversion,
    /// The `unreachable` instruction was executed.
    Unreachable,
    /// `call_indirect` found a table element whose type does not match the call site.
    IndirectCallTypeMismatch,
    /// `call_indirect` found a null or not-yet-initialized table element.
    UninitializedElement,
    /// The interpreter's call stack depth limit was exceeded.
    CallStackExhausted,
    /// The configured cost budget was exceeded at a check point.
    CostLimitExceeded,
    /// An async task was cancelled at a cooperative check point.
    Interrupted,
    /// A host function signalled an orderly stop (e.g. `proc_exit`).
    ///
    /// This is propagated like a trap but is never classified as a failure.
    Terminated(i32),
}

impl TrapCode {
    /// Returns `true` for the variant that represents an orderly, non-failing stop.
    pub const fn is_terminated(self) -> bool {
        matches!(self, Self::Terminated(_))
    }
}

impl fmt::Display for TrapCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfBounds => write!(f, "out of bounds memory or table access"),
            Self::DivideByZero => write!(f, "integer divide by zero"),
            Self::IntegerOverflow => write!(f, "integer overflow"),
            Self::InvalidConversion => write!(f, "invalid conversion to integer"),
            Self::Unreachable => write!(f, "unreachable executed"),
            Self::IndirectCallTypeMismatch => write!(f, "indirect call type mismatch"),
            Self::UninitializedElement => write!(f, "uninitialized element"),
            Self::CallStackExhausted => write!(f, "call stack exhausted"),
            Self::CostLimitExceeded => write!(f, "cost limit exceeded"),
            Self::Interrupted => write!(f, "interrupted"),
            Self::Terminated(code) => write!(f, "terminated with exit code {code}"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for TrapCode {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminated_is_not_a_generic_trap() {
        assert!(TrapCode::Terminated(0).is_terminated());
        assert!(!TrapCode::Unreachable.is_terminated());
    }
}
