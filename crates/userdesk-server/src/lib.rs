//! Wiring for the userdesk server binary: configuration, system-account
//! bootstrap and the top-level router.

use std::path::{Path, PathBuf};

use axum::Router;
use serde::Deserialize;
use tower_http::trace::TraceLayer;
use userdesk_api::{AppState, SessionConfig};
use userdesk_core::{
  SYSTEM_ACCOUNT_EMAIL,
  store::{UserInsert, UserStore},
};

/// Prefix under which the JSON API is mounted.
pub const API_PREFIX: &str = "/api/v1";

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `USERDESK_*` environment variables.
#[derive(Deserialize, Clone, Debug)]
#[serde(default)]
pub struct ServerConfig {
  pub host:                String,
  pub port:                u16,
  pub store_path:          PathBuf,
  pub session_ttl_hours:   i64,
  pub secure_cookies:      bool,
  pub admin_email:         String,
  /// Argon2 PHC string; generate with `--hash-password`. Without it the
  /// system account is not created.
  pub admin_password_hash: Option<String>,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host:                "127.0.0.1".into(),
      port:                8080,
      store_path:          PathBuf::from("userdesk.db"),
      session_ttl_hours:   24,
      secure_cookies:      false,
      admin_email:         SYSTEM_ACCOUNT_EMAIL.into(),
      admin_password_hash: None,
    }
  }
}

impl ServerConfig {
  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }

  pub fn session_config(&self) -> SessionConfig {
    SessionConfig {
      ttl:            chrono::Duration::hours(self.session_ttl_hours.max(1)),
      secure_cookies: self.secure_cookies,
    }
  }
}

// ─── Bootstrap ────────────────────────────────────────────────────────────────

/// Create the operator account if no user has `admin_email` yet.
///
/// Returns `true` when an account was created.
pub async fn bootstrap_admin<S: UserStore>(
  store: &S,
  config: &ServerConfig,
) -> Result<bool, S::Error> {
  if store.find_credentials(&config.admin_email).await?.is_some() {
    return Ok(false);
  }
  let Some(password_hash) = config.admin_password_hash.clone() else {
    tracing::warn!(
      email = %config.admin_email,
      "no admin_password_hash configured; system account not created"
    );
    return Ok(false);
  };

  let created = store
    .insert_user(UserInsert {
      name: "System".into(),
      sur_name: "Administrator".into(),
      full_name: "System Administrator".into(),
      email: config.admin_email.clone(),
      password_hash,
      birth_date: None,
      telephone: None,
      employment: String::new(),
      user_agreement: true,
    })
    .await?
    .is_some();

  if created {
    tracing::info!(email = %config.admin_email, "system account created");
  }
  Ok(created)
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// The full application: the API under [`API_PREFIX`], with request tracing.
pub fn app<S>(state: AppState<S>) -> Router
where
  S: UserStore + 'static,
{
  Router::new()
    .nest(API_PREFIX, userdesk_api::api_router(state))
    .layer(TraceLayer::new_for_http())
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
