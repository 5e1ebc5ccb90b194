//! The collection store: the user list as last fetched from the server.
//!
//! Mutations never patch the local copy; each successful one refetches the
//! whole collection. Like the session store, overlapping operations are not
//! sequenced, so whichever response lands last is what the store holds.

use std::sync::Arc;

use tokio::sync::watch;
use userdesk_core::{NewUser, UserPatch, UserRecord};
use uuid::Uuid;

use crate::client::{Backend, Result};

pub const LOAD_FAILED: &str = "failed to load users";
pub const ADD_FAILED: &str = "failed to add user";
pub const UPDATE_FAILED: &str = "failed to update user";
pub const DELETE_FAILED: &str = "failed to delete user";

/// Snapshot of the collection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Collection {
  /// Server order.
  pub users:   Vec<UserRecord>,
  pub loading: bool,
  pub error:   Option<String>,
}

impl Collection {
  /// Every user except the reserved system account, in collection order.
  pub fn visible(&self) -> Vec<UserRecord> {
    self
      .users
      .iter()
      .filter(|u| !u.is_system_account())
      .cloned()
      .collect()
  }
}

pub struct CollectionStore<B> {
  backend: Arc<B>,
  state:   watch::Sender<Collection>,
}

impl<B: Backend> CollectionStore<B> {
  pub fn new(backend: Arc<B>) -> Self {
    let (state, _) = watch::channel(Collection::default());
    Self { backend, state }
  }

  pub fn snapshot(&self) -> Collection { self.state.borrow().clone() }

  pub fn subscribe(&self) -> watch::Receiver<Collection> { self.state.subscribe() }

  /// The list as shown to the operator. Computed from the current snapshot on
  /// every call.
  pub fn derived_view(&self) -> Vec<UserRecord> { self.state.borrow().visible() }

  fn record_error(&self, message: String) {
    self.state.send_modify(|c| c.error = Some(message));
  }

  /// Replace the collection with the server's. On failure the previous
  /// collection stays.
  pub async fn fetch_users(&self) {
    self.state.send_modify(|c| {
      c.loading = true;
      c.error = None;
    });
    match self.backend.list_users().await {
      Ok(users) => {
        tracing::debug!(count = users.len(), "users loaded");
        self.state.send_modify(|c| c.users = users);
      }
      Err(e) => self.record_error(e.message_or(LOAD_FAILED)),
    }
    self.state.send_modify(|c| c.loading = false);
  }

  /// Create a user, then refetch. Failures are recorded and returned.
  pub async fn add_user(&self, user: NewUser) -> Result<()> {
    self.state.send_modify(|c| c.error = None);
    match self.backend.create_user(&user).await {
      Ok(created) => {
        tracing::info!(user_id = %created.id, "user added");
        self.fetch_users().await;
        Ok(())
      }
      Err(e) => {
        self.record_error(e.message_or(ADD_FAILED));
        Err(e)
      }
    }
  }

  /// Apply `changes` to user `id`, then refetch. The transmitted
  /// [`UserPatch`] has no email or id, so neither can ever be sent.
  pub async fn update_user(&self, id: Uuid, changes: impl Into<UserPatch>) -> Result<()> {
    let patch = changes.into();
    self.state.send_modify(|c| c.error = None);
    match self.backend.update_user(id, &patch).await {
      Ok(_) => {
        tracing::info!(user_id = %id, "user updated");
        self.fetch_users().await;
        Ok(())
      }
      Err(e) => {
        self.record_error(e.message_or(UPDATE_FAILED));
        Err(e)
      }
    }
  }

  /// Delete user `id`, then refetch. A failure is only recorded in the
  /// store; the caller is not told.
  pub async fn remove_user(&self, id: Uuid) {
    self.state.send_modify(|c| c.error = None);
    match self.backend.delete_user(id).await {
      Ok(()) => {
        tracing::info!(user_id = %id, "user removed");
        self.fetch_users().await;
      }
      Err(e) => {
        tracing::warn!(user_id = %id, error = %e, "delete failed");
        self.record_error(e.message_or(DELETE_FAILED));
      }
    }
  }
}
