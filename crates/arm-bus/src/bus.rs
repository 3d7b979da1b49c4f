//! The pair of address maps (`read_map`, `write_map`) presented to the CPU,
//! plus the bus-fault outcome the CPU turns into a `RuntimeAbort`.

use std::fmt;

use crate::device::Width;
use crate::map::AddressMap;

/// A failed bus transaction: either no device is mapped at the address
/// (bus error) or the CPU handed down a misaligned offset that the
/// configured strictness rejects (alignment fault). The bus itself never
/// raises this as a Rust `Err` that unwinds the run loop — it is handed
/// back to the CPU core, which is the thing that knows how to turn it into
/// a simulated exception.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusFault {
    /// No device is mapped at this address in the requested map.
    Unmapped { addr: u32 },
    /// The offset was not aligned for the requested width.
    Misaligned { addr: u32, width_bytes: u32 },
}

impl fmt::Display for BusFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unmapped { addr } => write!(f, "bus error: no device mapped at {addr:#010x}"),
            Self::Misaligned { addr, width_bytes } => {
                write!(f, "alignment fault: {addr:#010x} is not {width_bytes}-byte aligned")
            }
        }
    }
}

impl std::error::Error for BusFault {}

/// The two disjoint sorted maps (readable, writable) a system presents to
/// its CPU core.
#[derive(Default)]
pub struct SystemBus {
    pub read_map: AddressMap,
    pub write_map: AddressMap,
}

impl SystemBus {
    #[must_use]
    pub fn new() -> Self {
        Self { read_map: AddressMap::new(), write_map: AddressMap::new() }
    }

    /// Read `width` bytes at `addr` through `read_map`. Always sees an
    /// aligned offset once dispatched to the device; alignment handling
    /// for CPU-visible unaligned accesses happens in the CPU core before
    /// this is called.
    pub fn read(&self, addr: u32, width: Width) -> Result<u32, BusFault> {
        let entry = self.read_map.find(addr).ok_or(BusFault::Unmapped { addr })?;
        let offset = addr - entry.base_addr;
        Ok(entry.device.borrow_mut().read(offset, width))
    }

    pub fn write(&self, addr: u32, width: Width, value: u32) -> Result<(), BusFault> {
        let entry = self.write_map.find(addr).ok_or(BusFault::Unmapped { addr })?;
        let offset = addr - entry.base_addr;
        entry.device.borrow_mut().write(offset, width, value);
        Ok(())
    }

    /// Debug-side read that never panics on an unmapped address; returns 0
    /// instead, matching the host's side-effect-bypassing debug accessors.
    #[must_use]
    pub fn debug_read(&self, addr: u32, width: Width) -> u32 {
        self.read(addr, width).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::device_ref;
    use crate::ram::Ram;

    #[test]
    fn read_and_write_route_to_the_same_ram_through_both_maps() {
        let mut bus = SystemBus::new();
        let ram = device_ref(Ram::new(0x1000));
        assert!(bus.read_map.try_insert(0, 0x1000, ram.clone()));
        assert!(bus.write_map.try_insert(0, 0x1000, ram));
        bus.write(0x10, Width::Word, 0x1234_5678).unwrap();
        assert_eq!(bus.read(0x10, Width::Word).unwrap(), 0x1234_5678);
    }

    #[test]
    fn unmapped_read_is_a_bus_fault() {
        let bus = SystemBus::new();
        assert_eq!(bus.read(0x1000, Width::Word), Err(BusFault::Unmapped { addr: 0x1000 }));
    }
}
