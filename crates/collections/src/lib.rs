//! Specialized data structures shared by the store and the handle manager.
//!
//! [`Arena`] is the allocation backbone for every instance kind the store owns:
//! functions, tables, memories, globals, tags, data segments and element segments
//! are all arena-allocated rather than individually heap-allocated and reference
//! counted.
//!
//! [`SlotMap`] generalizes the same idea to the externally-visible handle manager,
//! which additionally needs wraparound-safe sequence recycling.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod arena;
mod slotmap;

pub use self::{
    arena::{Arena, ArenaIndex},
    slotmap::{SlotMap, SlotMapError},
};
