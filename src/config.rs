//! Fixed memory layout and MMIO base addresses for the protection core.
//!
//! There is no filesystem on this target, so configuration is a set of
//! `const` values rather than a parsed file — the same shape the rest of
//! this codebase's host configuration takes.

/// Bytes covered by one protected cache line and one tree/SPM slot.
pub const LINE_SIZE: u64 = 64;
/// Fan-out of the counter tree: entries per node, lines per counter block.
pub const FANOUT: u64 = 32;
/// Height of the counter tree, root excluded (levels 0..TREE_HEIGHT live in
/// DRAM; the root itself lives only in SPM slot 0).
pub const TREE_HEIGHT: usize = 4;
/// Data-MAC entries packed into one 64-byte data-MAC block.
pub const MACS_PER_BLOCK: u64 = 8;

/// MMIO base addresses, matching the platform's register map. Chosen well
/// above `DRAM_TOTAL_SIZE` so the DRAM and MMIO address ranges never alias.
pub mod mmio {
    pub const SPM_DMA_BASE: u64 = 0x1000_0000;
    pub const SPM_DMA_WINDOW: u64 = SPM_DMA_BASE + 0x1000;
    pub const SPM_DMA_WINDOW_SIZE: u64 = 0x1000; // 64 SPM lines

    pub const MAC_BASE: u64 = 0x1001_0000;
    pub const AES_BASE: u64 = MAC_BASE + 0x1000;
    pub const AXIM_BASE: u64 = AES_BASE + 0x1000;
    pub const MEMREQ_BASE: u64 = AXIM_BASE + 0x1000;
}

/// Byte-addressed layout of the DRAM address space this core protects.
#[derive(Debug, Clone, Copy)]
pub struct MemoryMapConfig {
    /// Base of the protected line region (`P`).
    pub protection_base: u64,
    /// Size of the protected line region in bytes (`Pₛ`).
    pub protection_size: u64,
    /// Base of the counter tree region.
    pub counter_base: u64,
    /// Base of the data-MAC region.
    pub data_mac_base: u64,
    /// Per-level byte offset of level `i`'s nodes within the counter region,
    /// indexed `0..TREE_HEIGHT`, `0` being the level closest to the root.
    pub level_base: [u64; TREE_HEIGHT],
    /// Total addressable DRAM size; everything above must fit inside it.
    pub dram_size: u64,
}

impl MemoryMapConfig {
    /// The layout used by the in-tree functional simulator: regions are
    /// packed tightly enough to keep the backing store a few hundred KiB,
    /// while still large enough to exercise minor-counter overflow.
    pub const fn simulator() -> Self {
        let protection_base = 0x0;
        let protection_size = 0x1_0000; // 64 KiB -> 1024 lines
        let counter_base = protection_base + protection_size;
        let counter_region_size = 0x8000; // 4 levels x 8 KiB
        let data_mac_base = counter_base + counter_region_size;
        let data_mac_size = 0x2000;
        MemoryMapConfig {
            protection_base,
            protection_size,
            counter_base,
            data_mac_base,
            // level_base[TREE_HEIGHT - 1] must be 0: the deepest tree level
            // aliases the leaf counter block (`CB` in §4.2), whose DRAM
            // address has no level_base term of its own. See DESIGN.md.
            level_base: [0x6000, 0x4000, 0x2000, 0x0],
            dram_size: data_mac_base + data_mac_size,
        }
    }

    /// Number of protected 64-byte lines.
    pub const fn line_count(&self) -> u64 {
        self.protection_size / LINE_SIZE
    }
}

static_assertions::const_assert!(LINE_SIZE == 64);
static_assertions::const_assert!(FANOUT == 32);

const SIM_CONFIG: MemoryMapConfig = MemoryMapConfig::simulator();
static_assertions::const_assert!(SIM_CONFIG.protection_size % LINE_SIZE == 0);
static_assertions::const_assert!(SIM_CONFIG.counter_base >= SIM_CONFIG.protection_base + SIM_CONFIG.protection_size);
static_assertions::const_assert!(SIM_CONFIG.data_mac_base >= SIM_CONFIG.counter_base);
static_assertions::const_assert!(SIM_CONFIG.dram_size > SIM_CONFIG.data_mac_base);
static_assertions::const_assert!(mmio::SPM_DMA_BASE as u128 > SIM_CONFIG.dram_size as u128);

/// The memory map active on this build. Only one target is wired up today;
/// picking a different board means providing another `MemoryMapConfig` and
/// swapping this constant.
pub static MEMORY_MAP: MemoryMapConfig = MemoryMapConfig::simulator();
