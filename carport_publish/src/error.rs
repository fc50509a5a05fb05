use std::convert::Infallible;
use std::time::Duration;

use carport_core::{ContentIdError, StoreError};

pub type PublishResult<T> = std::result::Result<T, PublishError>;

#[derive(thiserror::Error, Debug)]
pub enum PublishError {
    #[error("invalid content identifier: {0}")]
    InvalidIdentifier(#[from] ContentIdError),
    #[error("content store: {0}")]
    Store(#[from] StoreError),
    #[error("remote store: {0}")]
    Remote(#[source] anyhow::Error),
    #[error("cbor encode failed: {0}")]
    Encode(String),
    #[error("cbor decode failed: {0}")]
    Decode(#[from] minicbor::decode::Error),
    #[error("archive block {0} does not match its hash")]
    CorruptArchive(String),
    #[error("session '{0}' is already finalized")]
    SessionFinalizing(String),
    #[error("operation timed out after {0:?}")]
    Timeout(Duration),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<minicbor::encode::Error<Infallible>> for PublishError {
    fn from(err: minicbor::encode::Error<Infallible>) -> Self {
        PublishError::Encode(err.to_string())
    }
}
