// HTTP routes
pub mod employees;
pub mod health;
pub mod permissions;
pub mod session;

pub use employees::*;
pub use health::*;
pub use permissions::*;
pub use session::*;
