//! Error type for `arsenal-store-sqlite`.

use arsenal_core::store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] arsenal_core::Error),

  #[error("database error: {0}")]
  Database(tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Domain errors raised inside a connection closure travel out as
/// `tokio_rusqlite::Error::Other` and are unwrapped again here.
impl From<tokio_rusqlite::Error> for Error {
  fn from(e: tokio_rusqlite::Error) -> Self {
    match e {
      tokio_rusqlite::Error::Other(boxed) => match boxed.downcast::<arsenal_core::Error>() {
        Ok(core) => Self::Core(*core),
        Err(other) => Self::Database(tokio_rusqlite::Error::Other(other)),
      },
      other => Self::Database(other),
    }
  }
}

impl From<rusqlite::Error> for Error {
  fn from(e: rusqlite::Error) -> Self { Self::Database(tokio_rusqlite::Error::Rusqlite(e)) }
}

/// Wrap a domain error for return from inside `Connection::call`.
pub(crate) fn domain(e: arsenal_core::Error) -> tokio_rusqlite::Error {
  tokio_rusqlite::Error::Other(Box::new(e))
}

impl StoreError for Error {
  fn domain(&self) -> Option<&arsenal_core::Error> {
    match self {
      Self::Core(e) => Some(e),
      _ => None,
    }
  }

  fn is_database(&self) -> bool { matches!(self, Self::Database(_)) }
}
