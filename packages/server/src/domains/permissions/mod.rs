//! Permissions domain - administration of the policy set
//!
//! Responsibilities:
//! - Listing, granting and revoking policy rules
//! - Assigning and removing subject roles
//!
//! Every mutation writes through the policy store and then reloads the shared
//! enforcer, so the change applies to the next request.

pub mod actions;
pub mod data;

pub use data::RESOURCE;
