//! Descriptors for hardware breakpoints and watchpoints.

use crate::{SlotError, SlotResult};

/// Number of debug-register slots a single debuggee can use.
pub const MAX_HW_SLOTS: usize = 4;

/// Granularity of a debug-register address, in bytes.
pub const WORD_SIZE: u64 = 4;

/// Tunables for the slot allocator.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Config {
    /// How many slots a process registry may hold.
    pub max_slots: usize,
    /// Alignment required by the debug registers. Must be a power of two.
    pub word_size: u64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            max_slots: MAX_HW_SLOTS,
            word_size: WORD_SIZE,
        }
    }
}

impl Config {
    pub fn with_max_slots(mut self, max_slots: usize) -> Self {
        self.max_slots = max_slots;
        self
    }

    /// Sets the register alignment. Values that aren't a power of two are
    /// rounded up to the next one.
    pub fn with_word_size(mut self, word_size: u64) -> Self {
        self.word_size = word_size.max(1).next_power_of_two();
        self
    }

    /// Clears the low address bits the debug registers ignore.
    pub fn normalize(&self, addr: u64) -> u64 {
        addr & !(self.word_size - 1)
    }

    /// Checks that `len` bytes at `addr` can be covered by one slot.
    pub fn check_region(&self, addr: u64, len: usize) -> SlotResult<HardwareBreakpointSize> {
        let size = HardwareBreakpointSize::from_usize(len)?;
        if size.bytes() > self.word_size {
            return Err(SlotError::UnsupportedWatchSize(len));
        }
        if addr - self.normalize(addr) + size.bytes() > self.word_size {
            return Err(SlotError::UnalignedRegion { addr, len });
        }
        Ok(size)
    }
}

/// Clears the two low-order address bits, as required for 4-byte debug registers.
pub fn normalize(addr: u64) -> u64 {
    Config::default().normalize(addr)
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum HardwareBreakpointType {
    Execute,
    Read,
    Write,
    Access,
}

/// Data access kinds a watchpoint can be set for.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum WatchKind {
    /// Fire when the memory location is written to.
    Write,
    /// Fire when the memory location is read from.
    Read,
    /// Fire on both reads and writes.
    Access,
}

impl From<WatchKind> for HardwareBreakpointType {
    fn from(kind: WatchKind) -> Self {
        match kind {
            WatchKind::Write => HardwareBreakpointType::Write,
            WatchKind::Read => HardwareBreakpointType::Read,
            WatchKind::Access => HardwareBreakpointType::Access,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum HardwareBreakpointSize {
    _1 = 1,
    _2 = 2,
    _4 = 4,
    _8 = 8,
}

impl HardwareBreakpointSize {
    pub fn from_usize(size: usize) -> SlotResult<Self> {
        match size {
            1 => Ok(Self::_1),
            2 => Ok(Self::_2),
            4 => Ok(Self::_4),
            8 => Ok(Self::_8),
            x => Err(SlotError::UnsupportedWatchSize(x)),
        }
    }

    pub fn bytes(self) -> u64 {
        self as u64
    }
}

/// Equality key of an installed slot. The mask is deliberately not part of it.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SlotKey {
    pub addr: u64,
    pub typ: HardwareBreakpointType,
}

/// A hardware breakpoint or watchpoint programmed into one debug-register slot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HardwareBreakpoint {
    /// Aligned address the slot watches.
    pub addr: u64,
    pub typ: HardwareBreakpointType,
    /// Range mask for masked watchpoints, `None` for an exact-address match.
    pub mask: Option<u64>,
    pub enabled: bool,
    /// Index handed out by the host. Only valid while the slot stays installed.
    pub slot: usize,
}

impl HardwareBreakpoint {
    pub fn key(&self) -> SlotKey {
        SlotKey {
            addr: self.addr,
            typ: self.typ,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_clears_low_bits() {
        assert_eq!(normalize(0x1003), 0x1000);
        assert_eq!(normalize(0x1004), 0x1004);
        assert_eq!(normalize(0xdead_0007), 0xdead_0004);
    }

    #[test]
    fn normalize_is_idempotent() {
        for addr in [0u64, 1, 2, 3, 0x1003, 0xffff_ffff, u64::MAX].iter() {
            assert_eq!(normalize(normalize(*addr)), normalize(*addr));
        }
    }

    #[test]
    fn wide_words() {
        let config = Config::default().with_word_size(8);
        assert_eq!(config.normalize(0x100f), 0x1008);
        assert_eq!(Config::default().with_word_size(6).word_size, 8);
    }

    #[test]
    fn region_checks() {
        let config = Config::default();
        assert_eq!(
            config.check_region(0x1000, 4).unwrap(),
            HardwareBreakpointSize::_4
        );
        assert_eq!(
            config.check_region(0x1002, 2).unwrap(),
            HardwareBreakpointSize::_2
        );
        assert!(matches!(
            config.check_region(0x1002, 4),
            Err(SlotError::UnalignedRegion {
                addr: 0x1002,
                len: 4
            })
        ));
        assert!(matches!(
            config.check_region(0x1000, 8),
            Err(SlotError::UnsupportedWatchSize(8))
        ));
        assert!(matches!(
            config.check_region(0x1000, 3),
            Err(SlotError::UnsupportedWatchSize(3))
        ));
        assert!(Config::default()
            .with_word_size(8)
            .check_region(0x1000, 8)
            .is_ok());
    }
}
