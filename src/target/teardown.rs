//! Releases every slot of a process that exited or was detached.

use crate::target::{lock, DebugRegisters, HostOp, ProcessControl, RegistryTable};
use crate::SlotError;
use nix::unistd::Pid;

/// Outcome of tearing down one process registry.
#[derive(Debug, Default)]
pub struct TeardownReport {
    /// Number of slots the host released.
    pub released: usize,
    /// Slots the host failed to release, by address.
    pub failures: Vec<(u64, SlotError)>,
}

impl TeardownReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Releases the slots of `pid` and drops its registry.
///
/// Unknown processes are a no-op. Slots of a process that is already gone are
/// released through the controlling process. Release failures are collected in
/// the report and never stop the remaining slots or the registry from being
/// removed.
pub fn teardown<R, P>(table: &RegistryTable, regs: &mut R, ctl: &P, pid: Pid) -> TeardownReport
where
    R: DebugRegisters,
    P: ProcessControl,
{
    let mut report = TeardownReport::default();

    // Unlink first so no new handle reaches the registry while it drains.
    let registry = match table.remove(pid) {
        Some(registry) => registry,
        None => {
            log::trace!("{}", SlotError::RegistryAbsent(pid));
            return report;
        }
    };

    let target = if ctl.is_alive(pid) {
        pid
    } else {
        ctl.controller()
    };

    let mut registry = lock(&registry);
    for bp in registry.drain() {
        match regs.program(target, bp.slot as u64, HostOp::Clear, bp.typ) {
            Ok(_) => report.released += 1,
            Err(source) => {
                log::warn!("failed to release slot {} of {}: {}", bp.slot, pid, source);
                report.failures.push((
                    bp.addr,
                    SlotError::HardwareRejected {
                        addr: bp.addr,
                        source,
                    },
                ));
            }
        }
    }

    log::debug!(
        "dropped slot registry of {} ({} released, {} failed)",
        pid,
        report.released,
        report.failures.len()
    );
    report
}
