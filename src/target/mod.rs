pub mod allocator;
mod breakpoints;
mod fault;
mod hardware_breakpoint;
mod host;
mod registry;
mod teardown;

#[cfg(target_os = "linux")]
mod linux;

pub use breakpoints::HardwareBreakpoints;
pub use fault::resolve_fault;
pub use hardware_breakpoint::{
    normalize, Config, HardwareBreakpoint, HardwareBreakpointSize, HardwareBreakpointType,
    SlotKey, WatchKind, MAX_HW_SLOTS, WORD_SIZE,
};
pub use host::{DebugRegisters, HostOp, ProcessControl};
#[cfg(target_os = "linux")]
pub use linux::*;
pub use registry::{lock, Registry, RegistryHandle, RegistryTable};
pub use teardown::{teardown, TeardownReport};
