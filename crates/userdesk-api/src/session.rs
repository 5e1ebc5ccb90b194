//! Handlers for `/auth` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/auth/login` | Body: `{"email":"...","password":"..."}`; 204 + session cookie |
//! | `GET`  | `/auth/me` | The caller's [`Identity`]; 401 without a live session |
//! | `POST` | `/auth/logout` | 204; drops the session and expires the cookie |

use axum::{
  Json,
  extract::{State, rejection::JsonRejection},
  http::{StatusCode, header},
  response::IntoResponse,
};
use chrono::Utc;
use serde::Deserialize;
use userdesk_core::{
  Identity,
  store::{NewSession, UserStore},
};

use crate::{
  AppState,
  auth::{
    Authenticated, expired_cookie, new_token, session_cookie, token_digest,
    verify_password_blocking,
  },
  error::ApiError,
};

// ─── Login ────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginBody {
  pub email:    String,
  pub password: String,
}

/// `POST /auth/login`. The identity is not returned; clients follow up with
/// `GET /auth/me`.
pub async fn login<S>(
  State(state): State<AppState<S>>,
  body: Result<Json<LoginBody>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError>
where
  S: UserStore + 'static,
{
  let Json(body) = body?;
  let rejected = || ApiError::Unauthorized("invalid email or password".into());

  let credentials = state
    .store
    .find_credentials(&body.email)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(rejected)?;

  if !verify_password_blocking(body.password, credentials.password_hash).await {
    tracing::info!(email = %body.email, "login rejected");
    return Err(rejected());
  }

  let token = new_token();
  state
    .store
    .create_session(NewSession {
      token_hash: token_digest(&token),
      user_id:    credentials.user.id,
      expires_at: Utc::now() + state.sessions.ttl,
    })
    .await
    .map_err(ApiError::store)?;

  tracing::info!(user_id = %credentials.user.id, "session opened");
  Ok((
    StatusCode::NO_CONTENT,
    [(header::SET_COOKIE, session_cookie(&token, &state.sessions))],
  ))
}

// ─── Me ───────────────────────────────────────────────────────────────────────

/// `GET /auth/me`
pub async fn me(auth: Authenticated) -> Json<Identity> {
  Json(Identity::from(&auth.user))
}

// ─── Logout ───────────────────────────────────────────────────────────────────

/// `POST /auth/logout`
pub async fn logout<S>(
  State(state): State<AppState<S>>,
  auth: Authenticated,
) -> Result<impl IntoResponse, ApiError>
where
  S: UserStore + 'static,
{
  state
    .store
    .delete_session(&auth.token_hash)
    .await
    .map_err(ApiError::store)?;

  tracing::info!(user_id = %auth.user.id, "session closed");
  Ok((
    StatusCode::NO_CONTENT,
    [(header::SET_COOKIE, expired_cookie(&state.sessions))],
  ))
}
