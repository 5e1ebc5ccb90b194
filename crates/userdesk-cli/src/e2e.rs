//! The stores driven through [`ApiClient`] against a real server on a
//! loopback port.

use std::{sync::Arc, time::Duration};

use tokio::net::TcpListener;
use userdesk_api::{AppState, SessionConfig, auth::hash_password};
use userdesk_core::{NewUser, SYSTEM_ACCOUNT_EMAIL, UserPatch};
use userdesk_server::{ServerConfig, app, bootstrap_admin};
use userdesk_store_sqlite::SqliteStore;

use crate::{
  client::{ApiClient, ApiConfig, Backend, Error},
  session::{SessionStore, UNAUTHENTICATED},
  users::CollectionStore,
};

const ADMIN_PASSWORD: &str = "admin";

/// Start a server with a bootstrapped system account; returns its base URL.
async fn spawn_server() -> String {
  let store = SqliteStore::open_in_memory().await.unwrap();
  let config = ServerConfig {
    admin_password_hash: Some(hash_password(ADMIN_PASSWORD).unwrap()),
    ..ServerConfig::default()
  };
  assert!(bootstrap_admin(&store, &config).await.unwrap());

  let state = AppState::new(Arc::new(store), SessionConfig::default());
  let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
  let addr = listener.local_addr().unwrap();
  tokio::spawn(async move {
    axum::serve(listener, app(state)).await.unwrap();
  });
  format!("http://{addr}")
}

fn client(base_url: String) -> Arc<ApiClient> {
  Arc::new(ApiClient::new(ApiConfig { base_url }).unwrap())
}

fn new_user(email: &str) -> NewUser {
  NewUser {
    name:           "Ivan".into(),
    sur_name:       "Petrov".into(),
    full_name:      "Ivan Petrov".into(),
    email:          email.into(),
    password:       "secret".into(),
    birth_date:     Some("1990-12-10".into()),
    telephone:      Some("+79161234567".into()),
    employment:     Some("employed".into()),
    user_agreement: true,
  }
}

#[tokio::test]
async fn login_sets_identity_and_logout_clears_it() {
  let base = spawn_server().await;
  let sessions = SessionStore::new(client(base));

  sessions.check_auth().await;
  let s = sessions.snapshot();
  assert!(s.identity.is_none());
  assert_eq!(s.error.as_deref(), Some(UNAUTHENTICATED));

  sessions.login(SYSTEM_ACCOUNT_EMAIL, ADMIN_PASSWORD).await;
  let s = sessions.snapshot();
  assert_eq!(s.identity.map(|i| i.email).as_deref(), Some(SYSTEM_ACCOUNT_EMAIL));
  assert_eq!(s.error, None);
  assert!(!s.loading);

  sessions.logout().await;
  assert!(sessions.snapshot().identity.is_none());

  // The cookie is gone, so the server no longer recognises us.
  sessions.check_auth().await;
  assert!(sessions.snapshot().identity.is_none());
}

#[tokio::test]
async fn wrong_password_surfaces_server_message() {
  let base = spawn_server().await;
  let sessions = SessionStore::new(client(base));

  sessions.login(SYSTEM_ACCOUNT_EMAIL, "nope").await;
  let s = sessions.snapshot();
  assert!(s.identity.is_none());
  assert_eq!(s.error.as_deref(), Some("invalid email or password"));
}

#[tokio::test]
async fn collection_follows_server_through_crud() {
  let base = spawn_server().await;
  let backend = client(base);
  let sessions = SessionStore::new(Arc::clone(&backend));
  let users = CollectionStore::new(backend);

  sessions.login(SYSTEM_ACCOUNT_EMAIL, ADMIN_PASSWORD).await;
  users.fetch_users().await;
  let c = users.snapshot();
  assert_eq!(c.users.len(), 1);
  // The system account is held but never shown.
  assert!(users.derived_view().is_empty());

  users.add_user(new_user("ivan@example.com")).await.unwrap();
  let view = users.derived_view();
  assert_eq!(view.len(), 1);
  assert_eq!(view[0].email, "ivan@example.com");
  let id = view[0].id;

  let patch = UserPatch { name: Some("Pyotr".into()), ..UserPatch::default() };
  users.update_user(id, patch).await.unwrap();
  assert_eq!(users.derived_view()[0].name, "Pyotr");
  assert_eq!(users.derived_view()[0].email, "ivan@example.com");

  users.remove_user(id).await;
  assert!(users.derived_view().is_empty());
  assert_eq!(users.snapshot().error, None);
}

#[tokio::test]
async fn server_rejections_reach_the_store() {
  let base = spawn_server().await;
  let backend = client(base);
  let sessions = SessionStore::new(Arc::clone(&backend));
  let users = CollectionStore::new(Arc::clone(&backend));

  sessions.login(SYSTEM_ACCOUNT_EMAIL, ADMIN_PASSWORD).await;
  users.add_user(new_user("dup@example.com")).await.unwrap();

  let err = users.add_user(new_user("dup@example.com")).await.unwrap_err();
  assert!(matches!(err, Error::Status { status: 409, .. }));
  assert_eq!(
    users.snapshot().error.as_deref(),
    Some("user with email dup@example.com already exists")
  );

  // Deleting an unknown id only records the error.
  users.remove_user(uuid::Uuid::new_v4()).await;
  assert!(users.snapshot().error.is_some());
  assert_eq!(users.derived_view().len(), 1);
}

#[tokio::test]
async fn users_require_a_session() {
  let base = spawn_server().await;
  let backend = client(base);

  let err = backend.list_users().await.unwrap_err();
  assert!(matches!(err, Error::Status { status: 401, .. }));
}

#[tokio::test(start_paused = true)]
async fn hung_request_stays_loading() {
  let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
  let addr = listener.local_addr().unwrap();
  // Accept and then never answer.
  tokio::spawn(async move {
    let _held = listener.accept().await;
    std::future::pending::<()>().await;
  });
  let sessions = SessionStore::new(client(format!("http://{addr}")));

  let waited = tokio::time::timeout(Duration::from_secs(600), sessions.check_auth()).await;

  assert!(waited.is_err());
  let s = sessions.snapshot();
  assert!(s.loading);
  assert_eq!(s.error, None);
}
