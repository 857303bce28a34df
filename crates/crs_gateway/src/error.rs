use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("no enabled remote advertises package '{0}'")]
    NoSuchPackage(String),

    #[error("'{0}' is not a known remote (sync or enable it first)")]
    NoSuchRemote(String),

    #[error("'{0}' is not a valid remote url: {1}")]
    InvalidUrl(String, url::ParseError),

    #[error("fetching '{url}' failed: {source}")]
    FetchFailed {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error(transparent)]
    Db(#[from] crs_db::DbError),

    #[error(transparent)]
    Meta(#[from] crs_types::MetaError),

    #[error(transparent)]
    Io(#[from] io::Error),
}
