mod cli;
mod client;
mod error;
mod packet;
mod retry;
mod session;
mod state;

pub use crate::cli::Cli;
pub use crate::client::{resolve, Client, Operation};
pub use crate::error::TransferError;
pub use crate::packet::{DecodeError, ErrorCode, TftpPacket};
pub use crate::retry::RetryPolicy;
pub use crate::session::{TransferReport, TransferSession};
pub use crate::state::{Action, Direction, Failure, Status, TransferState};

pub const DEF_PORT: u16 = 69;
pub const BLOCK_SIZE: u16 = 512; // RFC 1350
pub const DEF_MODE: &str = "octet";

pub const DEF_TIMEOUT_MS: u64 = 1000;
pub const DEF_RETRY_COUNT: u8 = 3;
