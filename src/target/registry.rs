//! Per-process slot registries and the table that owns them.

use crate::target::{HardwareBreakpoint, SlotKey, MAX_HW_SLOTS};
use nix::unistd::Pid;
use std::{
    collections::{BTreeMap, HashMap},
    sync::{Arc, Mutex, MutexGuard},
};

/// Hardware slots currently installed for one debuggee.
#[derive(Debug)]
pub struct Registry {
    pid: Pid,
    capacity: usize,
    slots: BTreeMap<SlotKey, HardwareBreakpoint>,
}

impl Registry {
    pub fn new(pid: Pid, capacity: usize) -> Self {
        Registry {
            pid,
            capacity,
            slots: BTreeMap::new(),
        }
    }

    pub fn pid(&self) -> Pid {
        self.pid
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.slots.len() >= self.capacity
    }

    pub fn get(&self, key: &SlotKey) -> Option<&HardwareBreakpoint> {
        self.slots.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &HardwareBreakpoint> {
        self.slots.values()
    }

    /// Records an installed slot. Callers check capacity and duplicates first.
    pub(super) fn insert(&mut self, bp: HardwareBreakpoint) {
        debug_assert!(!self.is_full());
        self.slots.insert(bp.key(), bp);
    }

    pub(super) fn remove(&mut self, key: &SlotKey) -> Option<HardwareBreakpoint> {
        self.slots.remove(key)
    }

    /// Takes every descriptor out of the registry, leaving it empty.
    pub(super) fn drain(&mut self) -> Vec<HardwareBreakpoint> {
        std::mem::take(&mut self.slots).into_iter().map(|(_, bp)| bp).collect()
    }
}

/// Shared handle to one process registry.
pub type RegistryHandle = Arc<Mutex<Registry>>;

/// Locks a process registry. A poisoned lock is taken over: registry updates
/// never leave a half-written entry behind.
pub fn lock(registry: &RegistryHandle) -> MutexGuard<'_, Registry> {
    registry
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
}

lazy_static::lazy_static! {
    /// Process-wide table, created on first use.
    static ref SHARED: Arc<RegistryTable> = Arc::new(RegistryTable::default());
}

/// Maps every attached debuggee to its registry.
///
/// The table lock only guards membership; work on a registry takes that
/// registry's own lock so unrelated debuggees never wait on each other.
#[derive(Debug)]
pub struct RegistryTable {
    capacity: usize,
    entries: Mutex<HashMap<Pid, RegistryHandle>>,
}

impl Default for RegistryTable {
    fn default() -> Self {
        RegistryTable::new(MAX_HW_SLOTS)
    }
}

impl RegistryTable {
    /// Creates a table whose registries hold up to `capacity` slots each.
    pub fn new(capacity: usize) -> Self {
        RegistryTable {
            capacity,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// The process-wide table.
    pub fn shared() -> Arc<RegistryTable> {
        Arc::clone(&SHARED)
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<Pid, RegistryHandle>> {
        self.entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the registry of `pid`, creating an empty one if needed.
    pub fn get_or_create(&self, pid: Pid) -> RegistryHandle {
        let capacity = self.capacity;
        Arc::clone(
            self.entries()
                .entry(pid)
                .or_insert_with(|| Arc::new(Mutex::new(Registry::new(pid, capacity)))),
        )
    }

    /// Returns the registry of `pid` without creating one.
    pub fn get(&self, pid: Pid) -> Option<RegistryHandle> {
        self.entries().get(&pid).map(Arc::clone)
    }

    /// Drops the registry of `pid`. Unknown pids are ignored.
    pub fn remove(&self, pid: Pid) -> Option<RegistryHandle> {
        self.entries().remove(&pid)
    }

    pub fn contains(&self, pid: Pid) -> bool {
        self.entries().contains_key(&pid)
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    pub fn pids(&self) -> Vec<Pid> {
        self.entries().keys().copied().collect()
    }
}
