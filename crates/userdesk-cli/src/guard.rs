//! Gate for the authenticated layout.

use crate::{
  router::{LOGIN, Location},
  session::Session,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardOutcome {
  /// A session check is in flight; show an interim screen.
  Checking,
  /// Show the protected content.
  Render,
  /// Go to the login view. `from` is the location that was refused.
  Redirect { to: &'static str, from: Location },
}

/// Decide what the protected route at `location` shows, from the session
/// snapshot alone.
pub fn guard(session: &Session, location: &Location) -> GuardOutcome {
  if session.loading {
    GuardOutcome::Checking
  } else if session.identity.is_some() {
    GuardOutcome::Render
  } else {
    GuardOutcome::Redirect { to: LOGIN, from: location.clone() }
  }
}
