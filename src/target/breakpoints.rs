//! Breakpoint and watchpoint operations offered to the process-control layer.

use crate::target::{
    allocator, fault, lock, teardown, Config, DebugRegisters, HardwareBreakpoint,
    HardwareBreakpointType, ProcessControl, RegistryTable, TeardownReport, WatchKind,
};
use crate::{SlotError, SlotResult};
use nix::{sys::wait::WaitStatus, unistd::Pid};
use std::sync::Arc;

/// Hardware breakpoints and watchpoints of the debuggees a controller drives.
///
/// Operations apply to the selected inferior, see [`select_inferior`].
///
/// [`select_inferior`]: HardwareBreakpoints::select_inferior
pub struct HardwareBreakpoints<R, P> {
    config: Config,
    table: Arc<RegistryTable>,
    regs: R,
    ctl: P,
    inferior: Option<Pid>,
}

impl<R: DebugRegisters, P: ProcessControl> HardwareBreakpoints<R, P> {
    /// Creates a manager with a private registry table and default settings.
    pub fn new(regs: R, ctl: P) -> Self {
        Self::with_config(Config::default(), regs, ctl)
    }

    pub fn with_config(config: Config, regs: R, ctl: P) -> Self {
        let table = Arc::new(RegistryTable::new(config.max_slots));
        Self::with_table(config, table, regs, ctl)
    }

    /// Creates a manager working on an existing table, e.g. [`RegistryTable::shared`].
    /// The table's capacity takes precedence over `config.max_slots`.
    pub fn with_table(config: Config, table: Arc<RegistryTable>, regs: R, ctl: P) -> Self {
        let config = config.with_max_slots(table.capacity());
        HardwareBreakpoints {
            config,
            table,
            regs,
            ctl,
            inferior: None,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn table(&self) -> &Arc<RegistryTable> {
        &self.table
    }

    /// Makes `pid` the target of subsequent operations.
    pub fn select_inferior(&mut self, pid: Pid) {
        self.inferior = Some(pid);
    }

    pub fn inferior(&self) -> Option<Pid> {
        self.inferior
    }

    fn current(&self) -> SlotResult<Pid> {
        self.inferior.ok_or(SlotError::NoInferior)
    }

    /// Whether another slot can be allocated next to `existing_count`
    /// installed ones.
    pub fn can_allocate(&self, existing_count: usize) -> bool {
        existing_count < self.config.max_slots
    }

    /// Whether `len` bytes at `addr` can be watched by a single slot.
    pub fn region_ok_for_watchpoint(&self, addr: u64, len: usize) -> bool {
        self.config.check_region(addr, len).is_ok()
    }

    fn insert(&mut self, addr: u64, typ: HardwareBreakpointType, mask: u64) -> SlotResult<u64> {
        let pid = self.current()?;
        let addr = self.config.normalize(addr);
        let registry = self.table.get_or_create(pid);
        let mut registry = lock(&registry);
        allocator::insert(&mut registry, &mut self.regs, addr, typ, mask)?;
        Ok(addr)
    }

    fn remove(&mut self, addr: u64, typ: HardwareBreakpointType) -> SlotResult<()> {
        let pid = self.current()?;
        let addr = self.config.normalize(addr);
        let registry = self.table.get(pid).ok_or(SlotError::NotFound { addr, typ })?;
        let mut registry = lock(&registry);
        allocator::remove(&mut registry, &mut self.regs, addr, typ)
    }

    /// Sets a hardware execution breakpoint. Returns the address it was
    /// actually placed at.
    pub fn insert_breakpoint(&mut self, addr: u64) -> SlotResult<u64> {
        self.insert(addr, HardwareBreakpointType::Execute, 0)
    }

    pub fn remove_breakpoint(&mut self, addr: u64) -> SlotResult<()> {
        self.remove(addr, HardwareBreakpointType::Execute)
    }

    /// Watches `len` bytes at `addr` for accesses of `kind`.
    pub fn insert_watchpoint(&mut self, addr: u64, len: usize, kind: WatchKind) -> SlotResult<()> {
        self.config.check_region(addr, len)?;
        self.insert(addr, kind.into(), 0).map(|_| ())
    }

    pub fn remove_watchpoint(&mut self, addr: u64, len: usize, kind: WatchKind) -> SlotResult<()> {
        self.config.check_region(addr, len)?;
        self.remove(addr, kind.into())
    }

    /// Watches every address that agrees with `addr` under `mask`.
    pub fn insert_masked_watchpoint(
        &mut self,
        addr: u64,
        mask: u64,
        kind: WatchKind,
    ) -> SlotResult<()> {
        self.insert(addr, kind.into(), mask).map(|_| ())
    }

    /// Removes a masked watchpoint. Slots are matched on address and kind only,
    /// `mask` is not compared.
    pub fn remove_masked_watchpoint(
        &mut self,
        addr: u64,
        _mask: u64,
        kind: WatchKind,
    ) -> SlotResult<()> {
        self.remove(addr, kind.into())
    }

    /// Data address of the watchpoint the inferior last stopped on.
    pub fn stopped_data_address(&self) -> SlotResult<Option<u64>> {
        let pid = self.current()?;
        Ok(match self.ctl.fault_address(pid)? {
            Some(fault_addr) => fault::resolve_fault(&self.table, pid, fault_addr),
            None => None,
        })
    }

    /// Whether the inferior last stopped because one of our watchpoints fired.
    pub fn stopped_by_watchpoint(&self) -> bool {
        match self.stopped_data_address() {
            Ok(addr) => addr.is_some(),
            Err(err) => {
                log::debug!("no watchpoint stop: {}", err);
                false
            }
        }
    }

    /// Releases every slot of `pid` after it exited or was detached.
    pub fn on_process_exit(&mut self, pid: Pid) -> TeardownReport {
        if self.inferior == Some(pid) {
            self.inferior = None;
        }
        teardown::teardown(&self.table, &mut self.regs, &self.ctl, pid)
    }

    /// Tears down the process a wait status reports as gone. Returns whether
    /// a teardown ran.
    pub fn handle_wait_status(&mut self, status: &WaitStatus) -> bool {
        match *status {
            WaitStatus::Exited(pid, _) | WaitStatus::Signaled(pid, _, _) => {
                let report = self.on_process_exit(pid);
                if !report.is_clean() {
                    log::warn!(
                        "{} of the slots of {} could not be released",
                        report.failures.len(),
                        pid
                    );
                }
                true
            }
            _ => false,
        }
    }

    /// Slots currently installed for `pid`.
    pub fn slots(&self, pid: Pid) -> Vec<HardwareBreakpoint> {
        match self.table.get(pid) {
            Some(registry) => lock(&registry).iter().cloned().collect(),
            None => Vec::new(),
        }
    }

    /// Number of slots in use by `pid`.
    pub fn installed(&self, pid: Pid) -> usize {
        self.table
            .get(pid)
            .map_or(0, |registry| lock(&registry).len())
    }
}
