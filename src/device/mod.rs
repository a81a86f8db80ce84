//! The protection core's four hardware accelerators plus the two byte
//! stores they move data between. Each module here is a self-contained
//! register-level model: the "sim" build (see the crate-level feature
//! docs in `Cargo.toml`) backs them with plain Rust state instead of real
//! silicon, but the register protocol firmware drives is identical either
//! way.

pub mod aes;
pub mod axim;
pub mod dram;
pub mod mac;
pub mod spm;
pub mod spm_dma;
