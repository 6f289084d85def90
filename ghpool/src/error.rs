//! Library-boundary error types.
//!
//! `Client`/`Queue` are reusable library surface, so configuration failures
//! get a dedicated `thiserror` enum rather than `anyhow::Error` — grounded on
//! the `ApiError`/`ClientError` split in `szmorocz-B2BHolidays`'s
//! `part3_api.rs`. Transport failures already have a purpose-built carrier,
//! [`TransportFailure`](crate::transport::TransportFailure) (it doubles as
//! the header-bearing value the rate-limit refresh routine reads on failure,
//! so folding it into this enum would lose that shape). The CLI glue in
//! `main.rs` still collects everything into `anyhow::Result`, exactly as the
//! teacher's `main.rs` does.

use thiserror::Error;

/// A CLI/configuration failure: bad arguments, no usable credential, an
/// unreadable token file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no GitHub token available: pass --token, set GITHUB_TOKEN, or run `gh auth login`")]
    NoCredential,

    #[error("token file {path} could not be read: {source}")]
    TokenFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("token file {path} contained no usable tokens")]
    EmptyTokenFile { path: String },

    #[error("at least one --query must be supplied")]
    NoQueries,

    #[error("failed to create log directory {path}: {source}")]
    LogDir {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
