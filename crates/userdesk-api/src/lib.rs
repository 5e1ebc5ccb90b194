//! JSON REST API for userdesk.
//!
//! Exposes an axum [`Router`] backed by any [`userdesk_core::store::UserStore`].
//! Authentication is a server-side session carried in an HTTP-only cookie;
//! TLS and listener concerns are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api/v1", userdesk_api::api_router(state))
//! ```

pub mod auth;
pub mod error;
pub mod session;
pub mod users;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, patch, post},
};
use userdesk_core::store::UserStore;

pub use error::ApiError;

// ─── Configuration ────────────────────────────────────────────────────────────

/// How sessions are issued.
#[derive(Debug, Clone)]
pub struct SessionConfig {
  /// Lifetime of a session, also sent as the cookie `Max-Age`.
  pub ttl:            chrono::Duration,
  /// Add the `Secure` attribute to the session cookie.
  pub secure_cookies: bool,
}

impl Default for SessionConfig {
  fn default() -> Self {
    Self {
      ttl:            chrono::Duration::hours(24),
      secure_cookies: false,
    }
  }
}

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
pub struct AppState<S> {
  pub store:    Arc<S>,
  pub sessions: Arc<SessionConfig>,
}

impl<S> AppState<S> {
  pub fn new(store: Arc<S>, sessions: SessionConfig) -> Self {
    Self { store, sessions: Arc::new(sessions) }
  }
}

// Manual impl: `S` itself need not be `Clone`.
impl<S> Clone for AppState<S> {
  fn clone(&self) -> Self {
    Self {
      store:    Arc::clone(&self.store),
      sessions: Arc::clone(&self.sessions),
    }
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build a fully-materialised API router for `state`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(state: AppState<S>) -> Router<()>
where
  S: UserStore + 'static,
{
  Router::new()
    // Auth
    .route("/auth/login", post(session::login::<S>))
    .route("/auth/me", get(session::me))
    .route("/auth/logout", post(session::logout::<S>))
    // Users
    .route("/users", get(users::list::<S>).post(users::create::<S>))
    .route(
      "/users/{id}",
      patch(users::update::<S>).delete(users::delete_one::<S>),
    )
    .with_state(state)
}
