//! Shared vocabulary for the battery simulation crates.

mod traits;

pub use traits::*;
