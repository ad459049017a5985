//! Kernel module - server infrastructure and dependencies.

pub mod deps;
pub mod policy_store;
pub mod supabase;
pub mod test_dependencies;
pub mod traits;

pub use deps::ServerDeps;
pub use policy_store::PgPolicyStore;
pub use supabase::{SupabaseAdmin, SupabaseAuth};
pub use test_dependencies::{MemoryPolicyStore, MockAuthAdmin, MockAuthProvider};
pub use traits::*;
