use std::io;
use std::path::PathBuf;
use thiserror::Error;

use crate::packet::{DecodeError, ErrorCode};
use crate::state::Failure;

/// Why a transfer did not complete.
#[derive(Debug, Error)]
pub enum TransferError {
    /// The peer sent an ERROR packet. Displays the fixed RFC message for `code`.
    #[error("{code}")]
    Peer { code: ErrorCode, message: String },

    #[error("timed out waiting for block #{block} after {attempts} attempt(s)")]
    Timeout { block: u16, attempts: u32 },

    #[error("malformed datagram: {0}")]
    Malformed(#[from] DecodeError),

    #[error("illegal TFTP operation: {0}")]
    IllegalOperation(String),

    #[error("{}: {source}", .path.display())]
    LocalFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl From<Failure> for TransferError {
    fn from(failure: Failure) -> Self {
        match failure {
            Failure::Peer { code, message } => TransferError::Peer { code, message },
            Failure::IllegalOperation(reason) => TransferError::IllegalOperation(reason),
            Failure::Timeout { block, attempts } => TransferError::Timeout { block, attempts },
            Failure::Malformed(err) => TransferError::Malformed(err),
        }
    }
}
