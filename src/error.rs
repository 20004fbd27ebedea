use thiserror::Error;

/// Failures surfaced by the library.
#[derive(Debug, Error)]
pub enum Error {
    /// An operation needed a credential and none was attached.
    #[error("not authenticated, please log in again")]
    NotAuthenticated,

    /// Network, HTTP or decode failure talking to the mail provider.
    #[error("mail provider call failed: {0}")]
    Provider(String),

    /// The local key-value store could not be read or written.
    #[error("storage failure: {0}")]
    Storage(String),

    /// The provider redirected back with an error, or without a token.
    #[error("authorization failed: {0}")]
    Authorization(String),

    #[error("OAuth client id is not configured (set client_id in config.toml or MAILHUB_CLIENT_ID)")]
    MissingClientId,

    #[error("configuration error: {0}")]
    Config(String),
}

impl From<rusqlite::Error> for Error {
    fn from(e: rusqlite::Error) -> Self {
        Self::Storage(e.to_string())
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
