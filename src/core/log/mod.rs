//! The block log.
mod slot;

pub use slot::*;
