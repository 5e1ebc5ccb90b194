//! The session store: who is logged in, and whether we are finding out.
//!
//! State lives in a [`watch`] channel; every mutation notifies subscribers.
//! Operations take `&self` and never exclude each other, so when two of them
//! overlap the last write to each field wins.

use std::sync::Arc;

use tokio::sync::watch;
use userdesk_core::Identity;

use crate::client::{Backend, Error};

pub const LOGIN_FAILED: &str = "login failed";
pub const UNAUTHENTICATED: &str = "unauthenticated";
pub const LOGOUT_FAILED: &str = "logout failed";

/// Snapshot of the session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
  /// Set only by a successful [`SessionStore::check_auth`].
  pub identity: Option<Identity>,
  /// True while a check, login or logout is in flight.
  pub loading:  bool,
  pub error:    Option<String>,
}

pub struct SessionStore<B> {
  backend: Arc<B>,
  state:   watch::Sender<Session>,
}

impl<B: Backend> SessionStore<B> {
  pub fn new(backend: Arc<B>) -> Self {
    let (state, _) = watch::channel(Session::default());
    Self { backend, state }
  }

  pub fn snapshot(&self) -> Session { self.state.borrow().clone() }

  pub fn subscribe(&self) -> watch::Receiver<Session> { self.state.subscribe() }

  fn begin(&self) {
    self.state.send_modify(|s| {
      s.loading = true;
      s.error = None;
    });
  }

  fn finish(&self) { self.state.send_modify(|s| s.loading = false); }

  /// Authenticate, then learn the identity through [`Self::check_auth`].
  /// On failure the identity is left as it was.
  pub async fn login(&self, email: &str, password: &str) {
    self.begin();
    match self.backend.login(email, password).await {
      Ok(()) => {
        tracing::info!(%email, "logged in");
        self.check_auth().await;
      }
      Err(e) => {
        let message = e.message_or(LOGIN_FAILED);
        tracing::warn!(%email, %message, "login failed");
        self.state.send_modify(|s| s.error = Some(message));
      }
    }
    self.finish();
  }

  /// Ask the server who we are.
  pub async fn check_auth(&self) {
    self.begin();
    match self.backend.me().await {
      Ok(identity) => self.state.send_modify(|s| s.identity = Some(identity)),
      Err(e) => {
        // Any refusal reads as "unauthenticated"; transport errors say why.
        let message = match &e {
          Error::Status { .. } => UNAUTHENTICATED.to_owned(),
          Error::Http(_) => e.to_string(),
        };
        tracing::debug!(%message, "session check failed");
        self.state.send_modify(|s| {
          s.identity = None;
          s.error = Some(message);
        });
      }
    }
    self.finish();
  }

  /// End the session. On failure the identity is left as it was.
  pub async fn logout(&self) {
    self.begin();
    match self.backend.logout().await {
      Ok(()) => {
        tracing::info!("logged out");
        self.state.send_modify(|s| s.identity = None);
      }
      Err(e) => {
        let message = e.message_or(LOGOUT_FAILED);
        self.state.send_modify(|s| s.error = Some(message));
      }
    }
    self.finish();
  }
}
