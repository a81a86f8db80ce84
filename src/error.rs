//! Failure modes of the protection core, per the error handling design.

use derive_more::Display;

/// Every way a single request can fail. None of these are recoverable mid
/// request: a caught error aborts before any counter, tree-node or data-MAC
/// mutation lands, so the invariants the tree relies on stay intact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum FirmwareError {
    #[display(fmt = "tree MAC mismatch at level {level}")]
    TreeMacMismatch { level: u8 },
    #[display(fmt = "data MAC mismatch")]
    DataMacMismatch,
    #[display(fmt = "request address {addr:#x} outside protected region")]
    RequestOutOfRange { addr: u64 },
    #[display(fmt = "SPM offset {offset:#x} out of bounds")]
    SpmOutOfBounds { offset: u64 },
    #[display(fmt = "DRAM address {addr:#x} out of bounds")]
    DramOutOfBounds { addr: u64 },
}

pub type Result<T> = core::result::Result<T, FirmwareError>;
