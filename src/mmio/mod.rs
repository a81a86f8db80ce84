//! Address-range dispatch for the firmware's single MMIO address space:
//! DRAM, the SPM byte window, and each accelerator's control registers all
//! answer 64-bit reads and writes at a fixed base address.

use crate::error::Result;

/// A byte-addressable region that answers plain 64-bit loads and stores.
/// Implemented by [`crate::device::dram::Dram`] and
/// [`crate::device::spm::Spm`] — the two pieces of state with no
/// side effects beyond storage.
pub trait Device {
    fn read64(&self, offset: u64) -> Result<u64>;
    fn write64(&mut self, offset: u64, value: u64) -> Result<()>;
}

/// Polls `read` until it returns a value whose `bit` is clear. Every
/// accelerator handshake in this core is a tight busy-wait of this shape;
/// factoring it out keeps the driver code declarative.
pub fn poll_until_clear<F: FnMut() -> u64>(bit: u64, mut read: F) {
    while read() & bit != 0 {
        core::hint::spin_loop();
    }
}
