//! Handlers for `/users` endpoints. All of them require a session.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/users` | All users, insertion order |
//! | `POST`   | `/users` | Body: [`NewUser`]; 201 + stored user; 409 on duplicate email |
//! | `PATCH`  | `/users/{id}` | Body: [`UserPatch`]; `email` and `id` keys are ignored |
//! | `DELETE` | `/users/{id}` | 204; 404 if not found |

use axum::{
  Json,
  extract::{Path, State, rejection::JsonRejection},
  http::StatusCode,
  response::IntoResponse,
};
use userdesk_core::{
  NewUser, UserPatch, UserRecord,
  store::{UserInsert, UserStore, UserUpdate},
  validate,
};
use uuid::Uuid;

use crate::{
  AppState,
  auth::{Authenticated, hash_password_blocking},
  error::ApiError,
};

// ─── List ─────────────────────────────────────────────────────────────────────

/// `GET /users`
pub async fn list<S>(
  State(state): State<AppState<S>>,
  _auth: Authenticated,
) -> Result<Json<Vec<UserRecord>>, ApiError>
where
  S: UserStore + 'static,
{
  let users = state.store.list_users().await.map_err(ApiError::store)?;
  Ok(Json(users))
}

// ─── Create ───────────────────────────────────────────────────────────────────

/// `POST /users`: 201 and the stored [`UserRecord`].
pub async fn create<S>(
  State(state): State<AppState<S>>,
  auth: Authenticated,
  body: Result<Json<NewUser>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError>
where
  S: UserStore + 'static,
{
  let Json(mut body) = body?;
  validate::new_user(&body).map_err(ApiError::Validation)?;

  let password = std::mem::take(&mut body.password);
  let password_hash = hash_password_blocking(password).await?;
  let email = body.email.clone();
  let input = UserInsert::new(body, password_hash)?;

  let user = state
    .store
    .insert_user(input)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| {
      ApiError::Conflict(format!("user with email {email} already exists"))
    })?;

  tracing::info!(user_id = %user.id, by = %auth.user.id, "user created");
  Ok((StatusCode::CREATED, Json(user)))
}

// ─── Update ───────────────────────────────────────────────────────────────────

/// `PATCH /users/{id}`: the updated [`UserRecord`].
pub async fn update<S>(
  State(state): State<AppState<S>>,
  auth: Authenticated,
  Path(id): Path<Uuid>,
  body: Result<Json<UserPatch>, JsonRejection>,
) -> Result<Json<UserRecord>, ApiError>
where
  S: UserStore + 'static,
{
  let Json(patch) = body?;
  validate::patch(&patch).map_err(ApiError::Validation)?;

  let user = state
    .store
    .update_user(id, UserUpdate::try_from(patch)?)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("user {id} not found")))?;

  tracing::info!(user_id = %id, by = %auth.user.id, "user updated");
  Ok(Json(user))
}

// ─── Delete ───────────────────────────────────────────────────────────────────

/// `DELETE /users/{id}`
pub async fn delete_one<S>(
  State(state): State<AppState<S>>,
  auth: Authenticated,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError>
where
  S: UserStore + 'static,
{
  let deleted = state.store.delete_user(id).await.map_err(ApiError::store)?;
  if !deleted {
    return Err(ApiError::NotFound(format!("user {id} not found")));
  }

  tracing::info!(user_id = %id, by = %auth.user.id, "user deleted");
  Ok(StatusCode::NO_CONTENT)
}
