//! The `UserStore` trait and its input types.
//!
//! The trait is implemented by storage backends (e.g. `userdesk-store-sqlite`).
//! The API crate depends on this abstraction, not on any concrete backend.

use std::future::Future;

use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::{NewUser, Result, UserPatch, UserRecord, validate::parse_birth_date};

// ─── Inputs ──────────────────────────────────────────────────────────────────

/// Input to [`UserStore::insert_user`]: a validated [`NewUser`] with the
/// plaintext password replaced by its hash. The id is always assigned by the
/// store.
#[derive(Debug, Clone)]
pub struct UserInsert {
  pub name:           String,
  pub sur_name:       String,
  pub full_name:      String,
  pub email:          String,
  /// PHC string produced by the password hasher.
  pub password_hash:  String,
  pub birth_date:     Option<NaiveDate>,
  pub telephone:      Option<String>,
  pub employment:     String,
  pub user_agreement: bool,
}

impl UserInsert {
  /// Consume a validated [`NewUser`]. Fails only if the birth date does not
  /// parse, which validation has already ruled out.
  pub fn new(user: NewUser, password_hash: String) -> Result<Self> {
    let birth_date = user.birth_date.as_deref().map(parse_birth_date).transpose()?;
    Ok(Self {
      name: user.name,
      sur_name: user.sur_name,
      full_name: user.full_name,
      email: user.email,
      password_hash,
      birth_date,
      telephone: user.telephone,
      employment: user.employment.unwrap_or_default(),
      user_agreement: user.user_agreement,
    })
  }
}

/// Input to [`UserStore::update_user`]. `None` leaves a column untouched.
#[derive(Debug, Clone, Default)]
pub struct UserUpdate {
  pub name:           Option<String>,
  pub sur_name:       Option<String>,
  pub full_name:      Option<String>,
  pub birth_date:     Option<NaiveDate>,
  pub telephone:      Option<String>,
  pub employment:     Option<String>,
  pub user_agreement: Option<bool>,
}

impl TryFrom<UserPatch> for UserUpdate {
  type Error = crate::Error;

  fn try_from(patch: UserPatch) -> Result<Self> {
    Ok(Self {
      name:           patch.name,
      sur_name:       patch.sur_name,
      full_name:      patch.full_name,
      birth_date:     patch.birth_date.as_deref().map(parse_birth_date).transpose()?,
      telephone:      patch.telephone,
      employment:     patch.employment,
      user_agreement: patch.user_agreement,
    })
  }
}

/// Stored login material for one account.
#[derive(Debug, Clone)]
pub struct Credentials {
  pub user:          UserRecord,
  pub password_hash: String,
}

/// Input to [`UserStore::create_session`]. Only the digest of the session
/// token is ever handed to the store.
#[derive(Debug, Clone)]
pub struct NewSession {
  pub token_hash: String,
  pub user_id:    Uuid,
  pub expires_at: DateTime<Utc>,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a userdesk storage backend.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes (e.g. tokio with `axum`).
pub trait UserStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Users ─────────────────────────────────────────────────────────────

  /// All users in insertion order.
  fn list_users(
    &self,
  ) -> impl Future<Output = Result<Vec<UserRecord>, Self::Error>> + Send + '_;

  /// Look up login material by exact email. Returns `None` if not found.
  fn find_credentials<'a>(
    &'a self,
    email: &'a str,
  ) -> impl Future<Output = Result<Option<Credentials>, Self::Error>> + Send + 'a;

  /// Persist a new user and return it. Returns `None` when the email is
  /// already registered; emails are unique.
  fn insert_user(
    &self,
    input: UserInsert,
  ) -> impl Future<Output = Result<Option<UserRecord>, Self::Error>> + Send + '_;

  /// Apply `changes` to an existing user. Returns `None` if not found.
  fn update_user(
    &self,
    id: Uuid,
    changes: UserUpdate,
  ) -> impl Future<Output = Result<Option<UserRecord>, Self::Error>> + Send + '_;

  /// Delete a user and its sessions. Returns `false` if not found.
  fn delete_user(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Sessions ──────────────────────────────────────────────────────────

  fn create_session(
    &self,
    session: NewSession,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// The user owning the session with this token digest, if the session
  /// exists and has not expired at `now`.
  fn session_user<'a>(
    &'a self,
    token_hash: &'a str,
    now: DateTime<Utc>,
  ) -> impl Future<Output = Result<Option<UserRecord>, Self::Error>> + Send + 'a;

  /// Remove a session. Returns `false` if it did not exist.
  fn delete_session<'a>(
    &'a self,
    token_hash: &'a str,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;
}
