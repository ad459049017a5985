// HTTP middleware
pub mod route_table;
pub mod session_gate;

pub use route_table::*;
pub use session_gate::*;
