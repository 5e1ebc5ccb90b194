//! In-memory [`Backend`] for store and app tests.
//!
//! Behaves like the real server for the happy paths, records every call and
//! every outbound body, and can be told to fail or hold the next call of a
//! kind.

use std::{
  collections::HashMap,
  sync::{Arc, Mutex, MutexGuard},
};

use serde_json::Value;
use tokio::sync::Notify;
use userdesk_core::{
  Identity, NewUser, SYSTEM_ACCOUNT_EMAIL, UserPatch, UserRecord, user::full_name,
};
use uuid::Uuid;

use crate::client::{Backend, Error, Result};

#[derive(Default)]
struct Inner {
  users:     Vec<UserRecord>,
  passwords: HashMap<String, String>,
  logged_in: Option<Uuid>,
  calls:     Vec<&'static str>,
  payloads:  Vec<(&'static str, Value)>,
  failures:  HashMap<&'static str, (u16, Option<String>)>,
  holds:     HashMap<&'static str, Arc<Notify>>,
}

pub struct FakeBackend {
  inner: Mutex<Inner>,
}

pub fn record(email: &str, name: &str, sur_name: &str) -> UserRecord {
  UserRecord {
    id:             Uuid::new_v4(),
    name:           name.into(),
    sur_name:       sur_name.into(),
    full_name:      full_name(name, sur_name),
    email:          email.into(),
    birth_date:     chrono::NaiveDate::from_ymd_opt(1990, 12, 10),
    telephone:      Some("+79161234567".into()),
    employment:     "employed".into(),
    user_agreement: true,
  }
}

fn status(code: u16, message: &str) -> Error {
  Error::Status { status: code, message: Some(message.to_owned()) }
}

impl FakeBackend {
  pub const ADMIN_EMAIL: &'static str = SYSTEM_ACCOUNT_EMAIL;
  pub const ADMIN_PASSWORD: &'static str = "admin";

  /// A backend holding only the system account.
  pub fn new() -> Self {
    let mut inner = Inner::default();
    inner.users.push(record(SYSTEM_ACCOUNT_EMAIL, "System", "Administrator"));
    inner
      .passwords
      .insert(SYSTEM_ACCOUNT_EMAIL.into(), Self::ADMIN_PASSWORD.into());
    Self { inner: Mutex::new(inner) }
  }

  fn lock(&self) -> MutexGuard<'_, Inner> {
    self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
  }

  /// Append users to the server-side collection.
  pub fn seed(&self, users: impl IntoIterator<Item = UserRecord>) {
    self.lock().users.extend(users);
  }

  /// Make the next `op` call answer with `code` and `message`.
  pub fn fail_next(&self, op: &'static str, code: u16, message: Option<&str>) {
    self
      .lock()
      .failures
      .insert(op, (code, message.map(str::to_owned)));
  }

  /// Park the next `op` call until the returned gate is notified.
  pub fn hold(&self, op: &'static str) -> Arc<Notify> {
    let gate = Arc::new(Notify::new());
    self.lock().holds.insert(op, Arc::clone(&gate));
    gate
  }

  pub fn calls(&self) -> Vec<&'static str> { self.lock().calls.clone() }

  /// Bodies sent with `op`, as JSON.
  pub fn payloads(&self, op: &str) -> Vec<Value> {
    self
      .lock()
      .payloads
      .iter()
      .filter(|(o, _)| *o == op)
      .map(|(_, v)| v.clone())
      .collect()
  }

  /// Wait out any hold, record the call and return the scripted failure
  /// for it, if any.
  async fn enter(&self, op: &'static str) -> Result<MutexGuard<'_, Inner>> {
    let gate = self.lock().holds.remove(op);
    if let Some(gate) = gate {
      gate.notified().await;
    }
    let mut inner = self.lock();
    inner.calls.push(op);
    match inner.failures.remove(op) {
      Some((status, message)) => Err(Error::Status { status, message }),
      None => Ok(inner),
    }
  }
}

impl Backend for FakeBackend {
  async fn login(&self, email: &str, password: &str) -> Result<()> {
    let mut inner = self.enter("login").await?;
    if inner.passwords.get(email).map(String::as_str) != Some(password) {
      return Err(status(401, "invalid email or password"));
    }
    inner.logged_in = inner.users.iter().find(|u| u.email == email).map(|u| u.id);
    Ok(())
  }

  async fn me(&self) -> Result<Identity> {
    let inner = self.enter("me").await?;
    inner
      .logged_in
      .and_then(|id| inner.users.iter().find(|u| u.id == id))
      .map(Identity::from)
      .ok_or_else(|| status(401, "unauthenticated"))
  }

  async fn logout(&self) -> Result<()> {
    let mut inner = self.enter("logout").await?;
    inner.logged_in = None;
    Ok(())
  }

  async fn list_users(&self) -> Result<Vec<UserRecord>> {
    Ok(self.enter("list").await?.users.clone())
  }

  async fn create_user(&self, user: &NewUser) -> Result<UserRecord> {
    let mut inner = self.enter("create").await?;
    inner
      .payloads
      .push(("create", serde_json::to_value(user).unwrap_or_default()));
    if inner.users.iter().any(|u| u.email == user.email) {
      return Err(status(
        409,
        &format!("user with email {} already exists", user.email),
      ));
    }
    let created = UserRecord {
      id:             Uuid::new_v4(),
      name:           user.name.clone(),
      sur_name:       user.sur_name.clone(),
      full_name:      user.full_name.clone(),
      email:          user.email.clone(),
      birth_date:     user
        .birth_date
        .as_deref()
        .and_then(|d| d.parse().ok()),
      telephone:      user.telephone.clone(),
      employment:     user.employment.clone().unwrap_or_default(),
      user_agreement: user.user_agreement,
    };
    inner.passwords.insert(user.email.clone(), user.password.clone());
    inner.users.push(created.clone());
    Ok(created)
  }

  async fn update_user(&self, id: Uuid, patch: &UserPatch) -> Result<UserRecord> {
    let mut inner = self.enter("update").await?;
    inner
      .payloads
      .push(("update", serde_json::to_value(patch).unwrap_or_default()));
    let user = inner
      .users
      .iter_mut()
      .find(|u| u.id == id)
      .ok_or_else(|| status(404, &format!("user {id} not found")))?;
    if let Some(v) = &patch.name {
      user.name = v.clone();
    }
    if let Some(v) = &patch.sur_name {
      user.sur_name = v.clone();
    }
    if let Some(v) = &patch.full_name {
      user.full_name = v.clone();
    }
    if let Some(v) = &patch.telephone {
      user.telephone = Some(v.clone());
    }
    if let Some(v) = &patch.employment {
      user.employment = v.clone();
    }
    if let Some(v) = patch.user_agreement {
      user.user_agreement = v;
    }
    Ok(user.clone())
  }

  async fn delete_user(&self, id: Uuid) -> Result<()> {
    let mut inner = self.enter("delete").await?;
    let before = inner.users.len();
    inner.users.retain(|u| u.id != id);
    if inner.users.len() == before {
      return Err(status(404, &format!("user {id} not found")));
    }
    Ok(())
  }
}
