//! Employee actions

mod mutations;

pub use mutations::*;
