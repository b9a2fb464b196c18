//! Low-level file storage primitives.

pub mod atomic_toml;

pub use atomic_toml::{AtomicTomlError, AtomicTomlFile};
