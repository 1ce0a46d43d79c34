//! Error type for `claimdesk-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  /// A stored enum discriminant did not match any known variant.
  #[error("unknown discriminant in column {column}: {value:?}")]
  Decode { column: &'static str, value: String },
}

/// Everything a backend can fail with is fatal at the engine boundary; the
/// typed domain rejections never originate here.
impl From<Error> for claimdesk_core::Error {
  fn from(err: Error) -> Self { claimdesk_core::Error::storage(err) }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
