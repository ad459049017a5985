/// Authentication and authorization primitives
///
/// Provides the permission guard used at the top of every mutating action:
///
/// ```ignore
/// use crate::common::auth::{check_permission, CurrentSubject};
///
/// let permit = check_permission(&session, deps, "employees", "create")?;
/// // mutation runs only after the check succeeded
/// ```
///
/// The request gate resolves the session and stores `CurrentSubject` in the
/// request extensions; the guard reads it back and asks the policy enforcer.

mod errors;
mod guard;
mod session;
mod subject;

pub use errors::AuthError;
pub use guard::{check_permission, Actor, CurrentSubject, HasEnforcer, PermissionCheck, Permit};
pub use session::{
    SessionCookies, SessionResolution, SessionTokens, ACCESS_TOKEN_COOKIE, REFRESH_TOKEN_COOKIE,
};
pub use subject::{Role, Subject};
