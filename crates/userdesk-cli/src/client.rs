//! Async HTTP client wrapping the userdesk JSON API, and the [`Backend`]
//! trait the stores are written against.

use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use userdesk_core::{Identity, NewUser, UserPatch, UserRecord};
use uuid::Uuid;

// ─── Errors ───────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum Error {
  /// The request never produced a response, or its body did not decode.
  #[error(transparent)]
  Http(#[from] reqwest::Error),

  /// The server answered with a non-success status.
  #[error("server returned {status}")]
  Status {
    status:  u16,
    /// The `message` field of the error body, if there was one.
    message: Option<String>,
  },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
  /// Text to show the operator. Server messages win; a status without one
  /// falls back to `fallback`; transport failures keep their own text.
  pub fn message_or(&self, fallback: &str) -> String {
    match self {
      Error::Http(e) => e.to_string(),
      Error::Status { message: Some(m), .. } => m.clone(),
      Error::Status { message: None, .. } => fallback.to_owned(),
    }
  }
}

// ─── Backend seam ─────────────────────────────────────────────────────────────

/// Everything the stores need from the server. [`ApiClient`] is the real
/// implementation; tests substitute an in-memory one.
pub trait Backend: Send + Sync {
  /// `POST /auth/login`. Success carries no identity.
  async fn login(&self, email: &str, password: &str) -> Result<()>;

  /// `GET /auth/me`
  async fn me(&self) -> Result<Identity>;

  /// `POST /auth/logout`
  async fn logout(&self) -> Result<()>;

  /// `GET /users`
  async fn list_users(&self) -> Result<Vec<UserRecord>>;

  /// `POST /users`
  async fn create_user(&self, user: &NewUser) -> Result<UserRecord>;

  /// `PATCH /users/{id}`
  async fn update_user(&self, id: Uuid, patch: &UserPatch) -> Result<UserRecord>;

  /// `DELETE /users/{id}`
  async fn delete_user(&self, id: Uuid) -> Result<()>;
}

// ─── HTTP client ──────────────────────────────────────────────────────────────

/// Connection settings for the userdesk API.
#[derive(Debug, Clone)]
pub struct ApiConfig {
  pub base_url: String,
}

/// Async HTTP client for the userdesk JSON REST API.
///
/// The session cookie lives in the client's cookie jar, so every request
/// after a successful login carries it. Requests carry no timeout of their
/// own. Cheap to clone; the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct ApiClient {
  client: Client,
  config: ApiConfig,
}

#[derive(Serialize)]
struct LoginBody<'a> {
  email:    &'a str,
  password: &'a str,
}

#[derive(Deserialize)]
struct ErrorBody {
  #[serde(default)]
  message: Option<Value>,
}

impl ApiClient {
  pub fn new(config: ApiConfig) -> Result<Self> {
    let client = Client::builder().cookie_store(true).build()?;
    Ok(Self { client, config })
  }

  fn url(&self, path: &str) -> String {
    format!(
      "{}/api/v1{}",
      self.config.base_url.trim_end_matches('/'),
      path
    )
  }

  /// Pass successful responses through; turn the rest into [`Error::Status`].
  async fn check(resp: Response) -> Result<Response> {
    let status = resp.status();
    if status.is_success() {
      return Ok(resp);
    }
    let message = resp
      .json::<ErrorBody>()
      .await
      .ok()
      .and_then(|body| body.message)
      .and_then(|m| match m {
        Value::String(s) => Some(s),
        // Some servers send one message per violated constraint.
        Value::Array(items) => Some(
          items
            .iter()
            .filter_map(Value::as_str)
            .collect::<Vec<_>>()
            .join("; "),
        ),
        _ => None,
      })
      .filter(|m| !m.is_empty());
    tracing::debug!(status = status.as_u16(), ?message, "request failed");
    Err(Error::Status { status: status.as_u16(), message })
  }
}

impl Backend for ApiClient {
  async fn login(&self, email: &str, password: &str) -> Result<()> {
    let resp = self
      .client
      .post(self.url("/auth/login"))
      .json(&LoginBody { email, password })
      .send()
      .await?;
    Self::check(resp).await?;
    Ok(())
  }

  async fn me(&self) -> Result<Identity> {
    let resp = self.client.get(self.url("/auth/me")).send().await?;
    Ok(Self::check(resp).await?.json().await?)
  }

  async fn logout(&self) -> Result<()> {
    let resp = self.client.post(self.url("/auth/logout")).send().await?;
    Self::check(resp).await?;
    Ok(())
  }

  async fn list_users(&self) -> Result<Vec<UserRecord>> {
    let resp = self.client.get(self.url("/users")).send().await?;
    Ok(Self::check(resp).await?.json().await?)
  }

  async fn create_user(&self, user: &NewUser) -> Result<UserRecord> {
    let resp = self.client.post(self.url("/users")).json(user).send().await?;
    Ok(Self::check(resp).await?.json().await?)
  }

  async fn update_user(&self, id: Uuid, patch: &UserPatch) -> Result<UserRecord> {
    let resp = self
      .client
      .patch(self.url(&format!("/users/{id}")))
      .json(patch)
      .send()
      .await?;
    Ok(Self::check(resp).await?.json().await?)
  }

  async fn delete_user(&self, id: Uuid) -> Result<()> {
    let resp = self
      .client
      .delete(self.url(&format!("/users/{id}")))
      .send()
      .await?;
    Self::check(resp).await?;
    Ok(())
  }
}
