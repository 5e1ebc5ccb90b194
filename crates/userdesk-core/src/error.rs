//! Error types for `userdesk-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("unknown employment status: {0:?}")]
  UnknownEmployment(String),

  #[error("invalid birth date: {0:?}")]
  InvalidBirthDate(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
