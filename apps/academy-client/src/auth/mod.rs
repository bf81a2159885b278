pub mod guard;
pub mod status;
pub mod verifier;

pub use guard::{decide, Access, Decision, GuardState, Navigation, Route, RouteGuard};
pub use status::{AuthEvent, AuthEventKind, AuthStatus, AuthStatusStore};
pub use verifier::SessionVerifier;
