//! [`SqliteStore`], the SQLite implementation of [`UserStore`].

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use userdesk_core::{
  UserRecord,
  store::{Credentials, NewSession, UserInsert, UserStore, UserUpdate},
};

use crate::{
  Result,
  encode::{RawUser, USER_COLUMNS, encode_date, encode_dt, encode_uuid},
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A user store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── UserStore impl ──────────────────────────────────────────────────────────

impl UserStore for SqliteStore {
  type Error = crate::Error;

  // ── Users ─────────────────────────────────────────────────────────────────

  async fn list_users(&self) -> Result<Vec<UserRecord>> {
    let raws: Vec<RawUser> = self
      .conn
      .call(|conn| {
        let mut stmt = conn
          .prepare(&format!("SELECT {USER_COLUMNS} FROM users ORDER BY rowid"))?;
        let rows = stmt
          .query_map([], |row| RawUser::from_row(row, 0))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawUser::into_user).collect()
  }

  async fn find_credentials(&self, email: &str) -> Result<Option<Credentials>> {
    let email = email.to_owned();

    let raw: Option<(RawUser, String)> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!(
              "SELECT {USER_COLUMNS}, password_hash FROM users WHERE email = ?1"
            ),
            rusqlite::params![email],
            |row| Ok((RawUser::from_row(row, 0)?, row.get(9)?)),
          )
          .optional()?)
      })
      .await?;

    raw
      .map(|(user, password_hash)| {
        Ok(Credentials {
          user: user.into_user()?,
          password_hash,
        })
      })
      .transpose()
  }

  async fn insert_user(&self, input: UserInsert) -> Result<Option<UserRecord>> {
    let user = UserRecord {
      id:             Uuid::new_v4(),
      name:           input.name,
      sur_name:       input.sur_name,
      full_name:      input.full_name,
      email:          input.email,
      birth_date:     input.birth_date,
      telephone:      input.telephone,
      employment:     input.employment,
      user_agreement: input.user_agreement,
    };

    let id_str         = encode_uuid(user.id);
    let name           = user.name.clone();
    let sur_name       = user.sur_name.clone();
    let full_name      = user.full_name.clone();
    let email          = user.email.clone();
    let password_hash  = input.password_hash;
    let birth_date_str = user.birth_date.map(encode_date);
    let telephone      = user.telephone.clone();
    let employment     = user.employment.clone();
    let agreement      = user.user_agreement;
    let at_str         = encode_dt(Utc::now());

    let inserted: bool = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let taken: bool = tx
          .query_row(
            "SELECT 1 FROM users WHERE email = ?1",
            rusqlite::params![email],
            |_| Ok(true),
          )
          .optional()?
          .unwrap_or(false);
        if taken {
          return Ok(false);
        }
        tx.execute(
          "INSERT INTO users (
             user_id, name, sur_name, full_name, email, password_hash,
             birth_date, telephone, employment, user_agreement, created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
          rusqlite::params![
            id_str,
            name,
            sur_name,
            full_name,
            email,
            password_hash,
            birth_date_str,
            telephone,
            employment,
            agreement,
            at_str,
          ],
        )?;
        tx.commit()?;
        Ok(true)
      })
      .await?;

    if inserted {
      tracing::debug!(user_id = %user.id, "user inserted");
      Ok(Some(user))
    } else {
      Ok(None)
    }
  }

  async fn update_user(
    &self,
    id: Uuid,
    changes: UserUpdate,
  ) -> Result<Option<UserRecord>> {
    let id_str         = encode_uuid(id);
    let birth_date_str = changes.birth_date.map(encode_date);

    let raw: Option<RawUser> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let affected = tx.execute(
          "UPDATE users SET
             name           = COALESCE(?2, name),
             sur_name       = COALESCE(?3, sur_name),
             full_name      = COALESCE(?4, full_name),
             birth_date     = COALESCE(?5, birth_date),
             telephone      = COALESCE(?6, telephone),
             employment     = COALESCE(?7, employment),
             user_agreement = COALESCE(?8, user_agreement)
           WHERE user_id = ?1",
          rusqlite::params![
            id_str,
            changes.name,
            changes.sur_name,
            changes.full_name,
            birth_date_str,
            changes.telephone,
            changes.employment,
            changes.user_agreement,
          ],
        )?;
        if affected == 0 {
          return Ok(None);
        }
        let raw = tx.query_row(
          &format!("SELECT {USER_COLUMNS} FROM users WHERE user_id = ?1"),
          rusqlite::params![id_str],
          |row| RawUser::from_row(row, 0),
        )?;
        tx.commit()?;
        Ok(Some(raw))
      })
      .await?;

    raw.map(RawUser::into_user).transpose()
  }

  async fn delete_user(&self, id: Uuid) -> Result<bool> {
    let id_str = encode_uuid(id);

    let affected = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM users WHERE user_id = ?1",
          rusqlite::params![id_str],
        )?)
      })
      .await?;

    Ok(affected > 0)
  }

  // ── Sessions ──────────────────────────────────────────────────────────────

  async fn create_session(&self, session: NewSession) -> Result<()> {
    let now_str     = encode_dt(Utc::now());
    let user_id_str = encode_uuid(session.user_id);
    let expires_str = encode_dt(session.expires_at);
    let token_hash  = session.token_hash;

    self
      .conn
      .call(move |conn| {
        // Expired rows are swept whenever a new session is issued.
        conn.execute(
          "DELETE FROM sessions WHERE expires_at <= ?1",
          rusqlite::params![now_str],
        )?;
        conn.execute(
          "INSERT INTO sessions (token_hash, user_id, created_at, expires_at)
           VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![token_hash, user_id_str, now_str, expires_str],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn session_user(
    &self,
    token_hash: &str,
    now: DateTime<Utc>,
  ) -> Result<Option<UserRecord>> {
    let token_hash = token_hash.to_owned();
    let now_str    = encode_dt(now);

    let raw: Option<RawUser> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!(
              "SELECT {USER_COLUMNS} FROM users WHERE user_id = (
                 SELECT user_id FROM sessions
                 WHERE token_hash = ?1 AND expires_at > ?2
               )"
            ),
            rusqlite::params![token_hash, now_str],
            |row| RawUser::from_row(row, 0),
          )
          .optional()?)
      })
      .await?;

    raw.map(RawUser::into_user).transpose()
  }

  async fn delete_session(&self, token_hash: &str) -> Result<bool> {
    let token_hash = token_hash.to_owned();

    let affected = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM sessions WHERE token_hash = ?1",
          rusqlite::params![token_hash],
        )?)
      })
      .await?;

    Ok(affected > 0)
  }
}
