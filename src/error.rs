use thiserror::Error;

#[cfg(unix)]
use crate::target::HardwareBreakpointType;
#[cfg(unix)]
use nix::unistd::Pid;

#[derive(Error, Debug)]
pub enum SlotError {
    #[error("No unused hardware slot left for {addr:#x} ({capacity} in use)")]
    CapacityExceeded { addr: u64, capacity: usize },

    #[error("Host refused to program hardware slot for {addr:#x}: {source}")]
    HardwareRejected {
        addr: u64,
        #[source]
        source: HostError,
    },

    #[cfg(unix)]
    #[error("No {typ:?} hardware breakpoint installed at {addr:#x}")]
    NotFound {
        addr: u64,
        typ: HardwareBreakpointType,
    },

    #[cfg(unix)]
    #[error("No slot registry for process {0}")]
    RegistryAbsent(Pid),

    #[error("Hardware watchpoint length of {0} is not supported")]
    UnsupportedWatchSize(usize),

    #[error("Watched region {addr:#x}+{len} crosses a word boundary")]
    UnalignedRegion { addr: u64, len: usize },

    #[error("No inferior process is selected")]
    NoInferior,

    #[cfg(unix)]
    #[error("Error occurred while inspecting the debuggee: {0}")]
    Os(#[from] nix::Error),

    #[cfg(target_os = "linux")]
    #[error("Error occurred while reading /proc: {0}")]
    Proc(#[from] procfs::ProcError),
}

/// Failure reported by the host debug-register primitive.
#[derive(Error, Debug)]
pub enum HostError {
    #[cfg(unix)]
    #[error("{0}")]
    Os(#[from] nix::Error),

    #[error("request returned {0}")]
    Refused(i64),

    #[error("argument {0:#x} does not fit in a machine word")]
    WordOverflow(u64),
}
