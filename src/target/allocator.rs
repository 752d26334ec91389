//! Installs and removes hardware slots within one process registry.

use crate::target::{
    DebugRegisters, HardwareBreakpoint, HardwareBreakpointType, HostOp, Registry, SlotKey,
};
use crate::{SlotError, SlotResult};

/// Looks up the installed slot matching both `addr` and `typ`.
pub fn find(
    registry: &Registry,
    addr: u64,
    typ: HardwareBreakpointType,
) -> Option<&HardwareBreakpoint> {
    registry.get(&SlotKey { addr, typ })
}

/// Programs a slot for `addr` and records it in `registry`.
///
/// `addr` must already be normalized. Inserting an `(addr, typ)` pair that is
/// already installed succeeds without touching the hardware. A non-zero `mask`
/// is applied with a second request; if the host refuses it the slot stays
/// installed as an exact-address watch.
pub fn insert<R: DebugRegisters>(
    registry: &mut Registry,
    regs: &mut R,
    addr: u64,
    typ: HardwareBreakpointType,
    mask: u64,
) -> SlotResult<()> {
    if find(registry, addr, typ).is_some() {
        log::trace!(
            "{:?} slot at {:#x} already installed for {}",
            typ,
            addr,
            registry.pid()
        );
        return Ok(());
    }

    if registry.is_full() {
        return Err(SlotError::CapacityExceeded {
            addr,
            capacity: registry.capacity(),
        });
    }

    let pid = registry.pid();
    let slot = regs
        .program(pid, addr, HostOp::Install, typ)
        .map_err(|source| SlotError::HardwareRejected { addr, source })?;
    log::debug!(
        "installed {:?} slot {} at {:#x} for {}",
        typ,
        slot,
        addr,
        pid
    );

    let mask = if mask == 0 {
        None
    } else {
        match regs.program(pid, mask, HostOp::SetMask { index: slot }, typ) {
            Ok(_) => Some(mask),
            Err(err) => {
                log::warn!(
                    "mask {:#x} rejected for slot {} at {:#x}, watching exact address: {}",
                    mask,
                    slot,
                    addr,
                    err
                );
                None
            }
        }
    };

    registry.insert(HardwareBreakpoint {
        addr,
        typ,
        mask,
        enabled: true,
        slot,
    });
    Ok(())
}

/// Clears the slot matching `addr` and `typ` and forgets it.
///
/// The descriptor is dropped even if the host fails to clear the register, so
/// a removed slot is never reported as installed.
pub fn remove<R: DebugRegisters>(
    registry: &mut Registry,
    regs: &mut R,
    addr: u64,
    typ: HardwareBreakpointType,
) -> SlotResult<()> {
    let bp = registry
        .remove(&SlotKey { addr, typ })
        .ok_or(SlotError::NotFound { addr, typ })?;

    match regs.program(registry.pid(), bp.slot as u64, HostOp::Clear, typ) {
        Ok(_) => log::debug!(
            "cleared {:?} slot {} at {:#x} for {}",
            typ,
            bp.slot,
            addr,
            registry.pid()
        ),
        Err(err) => log::warn!(
            "failed to clear slot {} at {:#x} for {}: {}",
            bp.slot,
            addr,
            registry.pid(),
            err
        ),
    }
    Ok(())
}
