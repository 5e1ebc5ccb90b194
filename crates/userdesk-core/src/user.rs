//! User records and the payloads that create or modify them.
//!
//! Every type here is a wire type: field names are camelCase on the wire and
//! the same structs are used by the API handlers and the client.

use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

use crate::{Error, Result};

/// The operator account the server bootstraps on start. It is never shown in
/// the user-facing list.
pub const SYSTEM_ACCOUNT_EMAIL: &str = "admin@inno.tech";

// ─── Employment ──────────────────────────────────────────────────────────────

/// Employment status offered by the user form. The server stores the raw
/// string, so records carry `employment: String` and convert on demand.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString, AsRefStr,
)]
#[strum(serialize_all = "lowercase")]
pub enum Employment {
  Employed,
  Unemployed,
  #[default]
  #[strum(serialize = "")]
  Unspecified,
}

impl Employment {
  /// Strict parse; anything outside the three known values is an error.
  pub fn parse(raw: &str) -> Result<Self> {
    Self::from_str(raw).map_err(|_| Error::UnknownEmployment(raw.to_owned()))
  }

  /// The next option in select order, wrapping around.
  pub fn next(self) -> Self {
    match self {
      Self::Unspecified => Self::Employed,
      Self::Employed => Self::Unemployed,
      Self::Unemployed => Self::Unspecified,
    }
  }

  /// The previous option in select order, wrapping around.
  pub fn prev(self) -> Self { self.next().next() }
}

// ─── Names ───────────────────────────────────────────────────────────────────

/// `trim(name + " " + sur_name)`, the derived display name.
pub fn full_name(name: &str, sur_name: &str) -> String {
  format!("{name} {sur_name}").trim().to_owned()
}

// ─── Lenient booleans ────────────────────────────────────────────────────────

/// Decode a flag with JavaScript truthiness: `null`/missing → false, numbers
/// → non-zero, strings → non-empty, arrays and objects → true.
pub fn deserialize_truthy<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
  D: Deserializer<'de>,
{
  use serde_json::Value;

  let value = Option::<Value>::deserialize(deserializer)?;
  Ok(match value {
    None | Some(Value::Null) => false,
    Some(Value::Bool(b)) => b,
    Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
    Some(Value::String(s)) => !s.is_empty(),
    Some(Value::Array(_) | Value::Object(_)) => true,
  })
}

// ─── UserRecord ──────────────────────────────────────────────────────────────

/// A user as returned by `GET /users`. The password is write-only and never
/// appears here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
  pub id:             Uuid,
  pub name:           String,
  pub sur_name:       String,
  pub full_name:      String,
  pub email:          String,
  #[serde(default)]
  pub birth_date:     Option<NaiveDate>,
  #[serde(default)]
  pub telephone:      Option<String>,
  #[serde(default)]
  pub employment:     String,
  #[serde(default, deserialize_with = "deserialize_truthy")]
  pub user_agreement: bool,
}

impl UserRecord {
  pub fn is_system_account(&self) -> bool {
    self.email == SYSTEM_ACCOUNT_EMAIL
  }
}

// ─── Identity ────────────────────────────────────────────────────────────────

/// The minimal profile returned by `GET /auth/me`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
  pub email: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub name:  Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub id:    Option<Uuid>,
}

impl From<&UserRecord> for Identity {
  fn from(user: &UserRecord) -> Self {
    Self {
      email: user.email.clone(),
      name:  Some(user.full_name.clone()),
      id:    Some(user.id),
    }
  }
}

// ─── NewUser ─────────────────────────────────────────────────────────────────

/// Body of `POST /users`. Missing text fields decode as empty strings so the
/// validator can report them as field violations instead of a parse error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NewUser {
  pub name:           String,
  pub sur_name:       String,
  pub full_name:      String,
  pub email:          String,
  pub password:       String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub birth_date:     Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub telephone:      Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub employment:     Option<String>,
  pub user_agreement: bool,
}

// ─── UserPatch ───────────────────────────────────────────────────────────────

/// Body of `PATCH /users/{id}`.
///
/// There is no `id`, `email` or `password` field: email is immutable after
/// creation and the password is never updated. Unknown keys in an incoming
/// body are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserPatch {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub name:           Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub sur_name:       Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub full_name:      Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub birth_date:     Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub telephone:      Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub employment:     Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub user_agreement: Option<bool>,
}

impl UserPatch {
  pub fn is_empty(&self) -> bool { self == &Self::default() }
}
