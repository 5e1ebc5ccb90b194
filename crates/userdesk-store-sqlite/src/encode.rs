//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings, calendar dates as `YYYY-MM-DD`
//! and UUIDs as hyphenated lowercase strings.

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use userdesk_core::UserRecord;
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ────────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── NaiveDate ────────────────────────────────────────────────────────────────

pub fn encode_date(date: NaiveDate) -> String {
  date.format("%Y-%m-%d").to_string()
}

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, "%Y-%m-%d")
    .map_err(|e| Error::DateParse(format!("{s:?}: {e}")))
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Column list matching [`RawUser::from_row`].
pub const USER_COLUMNS: &str = "user_id, name, sur_name, full_name, email, \
                                birth_date, telephone, employment, user_agreement";

/// Raw values read directly from a `users` row.
pub struct RawUser {
  pub user_id:        String,
  pub name:           String,
  pub sur_name:       String,
  pub full_name:      String,
  pub email:          String,
  pub birth_date:     Option<String>,
  pub telephone:      Option<String>,
  pub employment:     String,
  pub user_agreement: bool,
}

impl RawUser {
  /// Read the columns of [`USER_COLUMNS`], starting at index `offset`.
  pub fn from_row(row: &rusqlite::Row<'_>, offset: usize) -> rusqlite::Result<Self> {
    Ok(Self {
      user_id:        row.get(offset)?,
      name:           row.get(offset + 1)?,
      sur_name:       row.get(offset + 2)?,
      full_name:      row.get(offset + 3)?,
      email:          row.get(offset + 4)?,
      birth_date:     row.get(offset + 5)?,
      telephone:      row.get(offset + 6)?,
      employment:     row.get(offset + 7)?,
      user_agreement: row.get(offset + 8)?,
    })
  }

  pub fn into_user(self) -> Result<UserRecord> {
    Ok(UserRecord {
      id:             decode_uuid(&self.user_id)?,
      name:           self.name,
      sur_name:       self.sur_name,
      full_name:      self.full_name,
      email:          self.email,
      birth_date:     self.birth_date.as_deref().map(decode_date).transpose()?,
      telephone:      self.telephone,
      employment:     self.employment,
      user_agreement: self.user_agreement,
    })
  }
}
