//! Filesystem utilities.
//!
//! Atomic writes for files that carry credentials in cleartext.

pub mod atomic;

pub use atomic::atomic_write_private;
