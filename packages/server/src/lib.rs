// Gestão Municipal - access-control core
//
// Provides the policy enforcer, the session gate in front of every route,
// and the permission guard that every mutating action calls first.
//
// Domains are organized in domains/*; external services sit behind the
// traits in kernel/.

pub mod common;
pub mod config;
pub mod domains;
pub mod kernel;
pub mod server;

pub use config::*;
