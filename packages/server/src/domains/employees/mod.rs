//! Employees domain - onboarding staff into the identity provider
//!
//! Creating an employee invites the user through the admin auth client and
//! records the requested role as a policy assignment for the new subject.

pub mod actions;
pub mod data;

pub use data::{NewEmployee, RESOURCE};
