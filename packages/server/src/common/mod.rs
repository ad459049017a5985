// Common types and utilities shared across the application

pub mod auth;
pub mod errors;

pub use auth::{check_permission, Actor, AuthError, CurrentSubject, Permit, Role, Subject};
pub use errors::ActionError;
