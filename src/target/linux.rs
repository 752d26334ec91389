use nix::{
    sys::{ptrace, signal::Signal},
    unistd::{getpid, Pid},
};
use procfs::process::Process;
use std::convert::TryFrom;

use crate::target::{DebugRegisters, HardwareBreakpointType, HostOp, ProcessControl};
use crate::{HostError, SlotResult};

/// ptrace request that programs the hardware breakpoint registers.
const PTRACE_SETHBREGS: libc::c_uint = 27;

/// Operation codes passed in the data word next to the breakpoint type.
const SETHBREGS_CLEAR: u64 = 0x10;
const SETHBREGS_SETMASK: u64 = 0x20;

/// Programs debug registers through the `PTRACE_SETHBREGS` request.
///
/// The debuggee has to be stopped under ptrace for the request to succeed.
#[derive(Debug, Default)]
pub struct PtraceDebugRegisters;

impl PtraceDebugRegisters {
    pub fn new() -> Self {
        PtraceDebugRegisters
    }

    /// Encoding of the breakpoint type, in `target_hw_bp_type` order.
    fn type_code(typ: HardwareBreakpointType) -> u64 {
        match typ {
            HardwareBreakpointType::Write => 0,
            HardwareBreakpointType::Read => 1,
            HardwareBreakpointType::Access => 2,
            HardwareBreakpointType::Execute => 3,
        }
    }
}

impl DebugRegisters for PtraceDebugRegisters {
    fn program(
        &mut self,
        pid: Pid,
        value: u64,
        op: HostOp,
        typ: HardwareBreakpointType,
    ) -> Result<usize, HostError> {
        let data = match op {
            HostOp::Install => Self::type_code(typ),
            HostOp::Clear => SETHBREGS_CLEAR | Self::type_code(typ),
            HostOp::SetMask { index } => SETHBREGS_SETMASK | ((index as u64) << 8),
        };
        let (value, data) = (word(value)?, word(data)?);

        let res = unsafe {
            // The request only reads its integer arguments; nothing is dereferenced.
            libc::ptrace(
                PTRACE_SETHBREGS as _,
                pid.as_raw(),
                value as *mut libc::c_void,
                data as *mut libc::c_void,
            )
        };

        if res == -1 {
            return Err(HostError::Os(nix::Error::last()));
        }
        if res < 0 {
            return Err(HostError::Refused(res as i64));
        }
        Ok(res as usize)
    }
}

/// Request arguments travel in pointer-sized words.
fn word(value: u64) -> Result<usize, HostError> {
    usize::try_from(value).map_err(|_| HostError::WordOverflow(value))
}

/// Process-control queries answered from ptrace and `/proc`.
#[derive(Debug, Default)]
pub struct PtraceControl;

impl PtraceControl {
    pub fn new() -> Self {
        PtraceControl
    }
}

impl ProcessControl for PtraceControl {
    fn fault_address(&self, pid: Pid) -> SlotResult<Option<u64>> {
        let info = ptrace::getsiginfo(pid)?;
        if info.si_signo != Signal::SIGTRAP as libc::c_int {
            return Ok(None);
        }
        // si_addr is filled in by the kernel for hardware breakpoint traps.
        let addr = unsafe { info.si_addr() } as usize as u64;
        Ok(Some(addr))
    }

    fn is_alive(&self, pid: Pid) -> bool {
        match Process::new(pid.as_raw()) {
            Ok(process) => process.stat.state != 'Z' && process.stat.state != 'X',
            Err(_) => false,
        }
    }

    fn controller(&self) -> Pid {
        getpid()
    }
}
