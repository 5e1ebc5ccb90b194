//! DTO validation for the user endpoints.
//!
//! Each check is an explicit function that collects field-level violations
//! into a [`ValidationErrors`] rather than failing on the first one. Handlers
//! call these before any record is constructed.

use std::borrow::Cow;

use chrono::{DateTime, NaiveDate};
use validator::{ValidationError, ValidationErrors};

use crate::{Error, NewUser, Result, UserPatch};

/// Upper bound on `name` and `surName`, in characters.
pub const NAME_MAX: usize = 64;
/// Upper bound on `fullName`, in characters.
pub const FULL_NAME_MAX: usize = 130;

// ─── Building blocks ─────────────────────────────────────────────────────────

/// A violation with a stable `code` and a human-readable message.
pub fn violation(code: &'static str, message: impl Into<Cow<'static, str>>) -> ValidationError {
  let mut error = ValidationError::new(code);
  error.message = Some(message.into());
  error
}

/// Flatten violations into `field: message` pairs, sorted by field name.
pub fn messages(errors: &ValidationErrors) -> Vec<(&'static str, String)> {
  let mut out: Vec<_> = errors
    .field_errors()
    .into_iter()
    .flat_map(|(field, list)| {
      list.iter().map(move |e| {
        let message = e
          .message
          .as_ref()
          .map(|m| m.to_string())
          .unwrap_or_else(|| e.code.to_string());
        (field, message)
      })
    })
    .collect();
  out.sort_by(|a, b| a.0.cmp(b.0));
  out
}

/// Required (non-empty) and at most `max` characters.
pub fn required_max(
  errors: &mut ValidationErrors,
  field: &'static str,
  value: &str,
  max: usize,
) {
  if value.is_empty() {
    errors.add(field, violation("required", format!("{field} should not be empty")));
  } else if value.chars().count() > max {
    errors.add(
      field,
      violation(
        "length",
        format!("{field} must be shorter than or equal to {max} characters"),
      ),
    );
  }
}

pub fn is_email(value: &str) -> bool { validator::validate_email(value) }

/// True when `value` is a valid number in the Russian numbering plan.
/// National (`8…`) and international (`+7…`) forms are both accepted.
pub fn is_ru_phone(value: &str) -> bool {
  let international = match value.strip_prefix('8') {
    Some(rest) if value.len() == 11 => format!("+7{rest}"),
    _ => value.to_owned(),
  };
  international.starts_with("+7") && validator::validate_phone(international.as_str())
}

/// Accepts a calendar date (`YYYY-MM-DD`) or a full RFC 3339 timestamp, in
/// which case only the date part is kept.
pub fn parse_birth_date(value: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(value, "%Y-%m-%d")
    .or_else(|_| DateTime::parse_from_rfc3339(value).map(|dt| dt.date_naive()))
    .map_err(|_| Error::InvalidBirthDate(value.to_owned()))
}

fn check_optional_fields(
  errors: &mut ValidationErrors,
  birth_date: Option<&str>,
  telephone: Option<&str>,
) {
  if let Some(date) = birth_date
    && parse_birth_date(date).is_err()
  {
    errors.add(
      "birthDate",
      violation("date", "birthDate must be a valid ISO 8601 date string"),
    );
  }
  if let Some(phone) = telephone
    && !is_ru_phone(phone)
  {
    errors.add(
      "telephone",
      violation("phone", "telephone must be a valid phone number"),
    );
  }
}

fn finish(errors: ValidationErrors) -> Result<(), ValidationErrors> {
  if errors.is_empty() { Ok(()) } else { Err(errors) }
}

// ─── DTOs ────────────────────────────────────────────────────────────────────

/// Rules for `POST /users`.
pub fn new_user(user: &NewUser) -> Result<(), ValidationErrors> {
  let mut errors = ValidationErrors::new();

  required_max(&mut errors, "name", &user.name, NAME_MAX);
  required_max(&mut errors, "surName", &user.sur_name, NAME_MAX);
  required_max(&mut errors, "fullName", &user.full_name, FULL_NAME_MAX);

  if !is_email(&user.email) {
    errors.add("email", violation("email", "email must be an email"));
  }
  if user.password.is_empty() {
    errors.add("password", violation("required", "password should not be empty"));
  }

  check_optional_fields(
    &mut errors,
    user.birth_date.as_deref(),
    user.telephone.as_deref(),
  );

  finish(errors)
}

/// Rules for `PATCH /users/{id}`: the create rules, applied only to the
/// fields that are present.
pub fn patch(patch: &UserPatch) -> Result<(), ValidationErrors> {
  let mut errors = ValidationErrors::new();

  if let Some(name) = &patch.name {
    required_max(&mut errors, "name", name, NAME_MAX);
  }
  if let Some(sur_name) = &patch.sur_name {
    required_max(&mut errors, "surName", sur_name, NAME_MAX);
  }
  if let Some(full_name) = &patch.full_name {
    required_max(&mut errors, "fullName", full_name, FULL_NAME_MAX);
  }

  check_optional_fields(
    &mut errors,
    patch.birth_date.as_deref(),
    patch.telephone.as_deref(),
  );

  finish(errors)
}
