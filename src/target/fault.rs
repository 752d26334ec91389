//! Attributes data traps to the watchpoint that raised them.

use crate::target::{allocator, lock, HardwareBreakpointType, RegistryTable};
use nix::unistd::Pid;

/// Matches `fault_addr` against the watchpoints installed for `pid`.
///
/// Data traps are resolved as writes: a read or access watchpoint at the same
/// address does not match. A process without a registry never matches, and
/// resolving doesn't create one.
pub fn resolve_fault(table: &RegistryTable, pid: Pid, fault_addr: u64) -> Option<u64> {
    let registry = table.get(pid)?;
    let registry = lock(&registry);
    let hit =
        allocator::find(&registry, fault_addr, HardwareBreakpointType::Write).map(|bp| bp.addr);
    log::trace!(
        "fault at {:#x} in {} resolved to {:x?}",
        fault_addr,
        pid,
        hit
    );
    hit
}
