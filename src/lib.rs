//! Hardware breakpoint and watchpoint slot management for debugger backends.
//!
//! A debuggee owns a small, fixed set of debug-register slots. This crate keeps
//! track of which slots are programmed for every attached process, attributes
//! data traps back to the watchpoint that raised them and releases the slots
//! once the process goes away.

mod error;

pub use error::{HostError, SlotError};

pub type SlotResult<T> = Result<T, SlotError>;

/// Per-process slot registries, the allocator working on them and the
/// breakpoint/watchpoint operations exposed to the process-control layer.
#[cfg(unix)]
pub mod target;
