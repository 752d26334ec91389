//! Seams to the host: the primitive that programs debug registers and the
//! process-control layer that knows about stops and process liveness.

use crate::target::HardwareBreakpointType;
use crate::{HostError, SlotResult};
use nix::unistd::Pid;

/// What a call to [`DebugRegisters::program`] should do with a slot.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum HostOp {
    /// Program a free slot to watch an address. Returns the slot index.
    Install,
    /// Release a previously installed slot, given its index.
    Clear,
    /// Apply a range mask to the slot at `index`.
    SetMask { index: usize },
}

/// Programs and clears the debug registers of a process.
pub trait DebugRegisters {
    /// Issues one debug-register request for `pid`.
    ///
    /// `value` is the address for [`HostOp::Install`], the slot index for
    /// [`HostOp::Clear`] and the mask for [`HostOp::SetMask`].
    fn program(
        &mut self,
        pid: Pid,
        value: u64,
        op: HostOp,
        typ: HardwareBreakpointType,
    ) -> Result<usize, HostError>;
}

impl<D: DebugRegisters + ?Sized> DebugRegisters for &mut D {
    fn program(
        &mut self,
        pid: Pid,
        value: u64,
        op: HostOp,
        typ: HardwareBreakpointType,
    ) -> Result<usize, HostError> {
        (**self).program(pid, value, op, typ)
    }
}

/// What the process-control layer tells us about debuggees.
pub trait ProcessControl {
    /// Faulting address of the most recent trap of `pid`, if it stopped on one.
    fn fault_address(&self, pid: Pid) -> SlotResult<Option<u64>>;

    /// Whether `pid` still exists and can have its registers programmed.
    fn is_alive(&self, pid: Pid) -> bool;

    /// The controlling (debugger) process. Slots of a debuggee that already
    /// exited are released through it.
    fn controller(&self) -> Pid;
}
