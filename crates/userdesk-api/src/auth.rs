//! Cookie-session extractor, password hashing and session tokens.

use argon2::{
  Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
  password_hash::SaltString,
};
use axum::extract::FromRequestParts;
use axum::http::{HeaderMap, HeaderValue, header, request::Parts};
use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD as B64;
use chrono::Utc;
use rand_core::{OsRng, RngCore};
use sha2::{Digest, Sha256};
use userdesk_core::{UserRecord, store::UserStore};

use crate::{AppState, SessionConfig, error::ApiError};

/// Name of the session cookie.
pub const COOKIE_NAME: &str = "userdesk_session";

// ─── Passwords ────────────────────────────────────────────────────────────────

/// Hash `password` into an argon2 PHC string.
pub fn hash_password(password: &str) -> Result<String, ApiError> {
  let salt = SaltString::generate(&mut OsRng);
  Argon2::default()
    .hash_password(password.as_bytes(), &salt)
    .map(|hash| hash.to_string())
    .map_err(|e| ApiError::PasswordHash(e.to_string()))
}

/// Check `password` against a stored PHC string. A malformed hash never
/// verifies.
pub fn verify_password(password: &str, phc: &str) -> bool {
  PasswordHash::new(phc)
    .map(|parsed| {
      Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
    })
    .unwrap_or(false)
}

/// Run [`hash_password`] off the async runtime; argon2 is deliberately slow.
pub async fn hash_password_blocking(password: String) -> Result<String, ApiError> {
  tokio::task::spawn_blocking(move || hash_password(&password))
    .await
    .map_err(|e| ApiError::PasswordHash(e.to_string()))?
}

/// Run [`verify_password`] off the async runtime.
pub async fn verify_password_blocking(password: String, phc: String) -> bool {
  tokio::task::spawn_blocking(move || verify_password(&password, &phc))
    .await
    .unwrap_or(false)
}

// ─── Session tokens ───────────────────────────────────────────────────────────

/// A fresh 256-bit session token, base64url without padding.
pub fn new_token() -> String {
  let mut bytes = [0u8; 32];
  OsRng.fill_bytes(&mut bytes);
  B64.encode(bytes)
}

/// The digest under which a token is stored. Raw tokens never reach the store.
pub fn token_digest(token: &str) -> String {
  hex::encode(Sha256::digest(token.as_bytes()))
}

// ─── Cookies ──────────────────────────────────────────────────────────────────

/// Extract the session token from the `Cookie` request headers.
pub fn session_token(headers: &HeaderMap) -> Option<&str> {
  headers
    .get_all(header::COOKIE)
    .iter()
    .filter_map(|v| v.to_str().ok())
    .flat_map(|v| v.split(';'))
    .filter_map(|pair| pair.trim().split_once('='))
    .find(|(name, _)| *name == COOKIE_NAME)
    .map(|(_, value)| value)
    .filter(|value| !value.is_empty())
}

/// `Set-Cookie` value that installs `token` for the configured lifetime.
pub fn session_cookie(token: &str, config: &SessionConfig) -> HeaderValue {
  cookie_header(token, config.ttl.num_seconds(), config.secure_cookies)
}

/// `Set-Cookie` value that makes the browser drop the session cookie.
pub fn expired_cookie(config: &SessionConfig) -> HeaderValue {
  cookie_header("", 0, config.secure_cookies)
}

fn cookie_header(value: &str, max_age: i64, secure: bool) -> HeaderValue {
  let secure = if secure { "; Secure" } else { "" };
  let raw = format!(
    "{COOKIE_NAME}={value}; Path=/; HttpOnly; SameSite=Lax; Max-Age={max_age}{secure}"
  );
  // Tokens are base64url, so the header is always visible ASCII.
  HeaderValue::from_str(&raw).unwrap_or_else(|_| HeaderValue::from_static(""))
}

// ─── Extractor ────────────────────────────────────────────────────────────────

/// Present in a handler means the request carried a live session cookie.
#[derive(Debug, Clone)]
pub struct Authenticated {
  pub user:       UserRecord,
  /// Digest of the presented token; used by logout.
  pub token_hash: String,
}

impl<S> FromRequestParts<AppState<S>> for Authenticated
where
  S: UserStore + 'static,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S>,
  ) -> Result<Self, Self::Rejection> {
    let token = session_token(&parts.headers).ok_or_else(ApiError::unauthenticated)?;
    let token_hash = token_digest(token);

    let user = state
      .store
      .session_user(&token_hash, Utc::now())
      .await
      .map_err(ApiError::store)?
      .ok_or_else(ApiError::unauthenticated)?;

    Ok(Authenticated { user, token_hash })
  }
}
