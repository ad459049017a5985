//! Permissions actions - guarded reads and writes of the policy set

mod mutations;
mod queries;

pub use mutations::*;
pub use queries::*;
