use std::net::SocketAddr;
use tracing::warn;

use crate::packet::{DecodeError, ErrorCode, TftpPacket};
use crate::BLOCK_SIZE;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Download,
    Upload,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Failure {
    Peer { code: ErrorCode, message: String },
    IllegalOperation(String),
    Timeout { block: u16, attempts: u32 },
    Malformed(DecodeError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    Active,
    Completed,
    Failed(Failure),
}

/// What the session has to do after a packet was applied.
#[derive(Debug, PartialEq, Eq)]
pub enum Action {
    /// Accepted payload: write it to the sink, then acknowledge `block`.
    Deliver { block: u16, data: Vec<u8> },
    /// Acknowledge `block` without accepting anything.
    Acknowledge(u16),
    /// The last block was acknowledged; send the next one.
    Proceed,
    /// Keep waiting for the expected reply.
    Ignore,
    /// Terminal state reached, nothing more to send.
    Halt,
}

/// Sequencing state of a single transfer.
///
/// For a download `block` is the next expected block and starts at 1. For an
/// upload it is the last block sent; the WRQ counts as block 0 so that the
/// peer's `ACK(0)` releases block 1.
#[derive(Debug)]
pub struct TransferState {
    direction: Direction,
    block: u16,
    last_len: usize,
    peer: Option<SocketAddr>,
    status: Status,
    bytes: u64,
    blocks: u32,
}

impl TransferState {
    pub fn new(direction: Direction) -> Self {
        let block = match direction {
            Direction::Download => 1,
            Direction::Upload => 0,
        };
        Self {
            direction,
            block,
            last_len: usize::from(BLOCK_SIZE),
            peer: None,
            status: Status::Active,
            bytes: 0,
            blocks: 0,
        }
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn block(&self) -> u16 {
        self.block
    }

    pub fn peer(&self) -> Option<SocketAddr> {
        self.peer
    }

    pub fn status(&self) -> &Status {
        &self.status
    }

    pub fn is_active(&self) -> bool {
        self.status == Status::Active
    }

    /// Payload bytes accepted (download) or sent (upload) so far.
    pub fn bytes(&self) -> u64 {
        self.bytes
    }

    pub fn blocks(&self) -> u32 {
        self.blocks
    }

    /// Returns whether a datagram from `addr` belongs to this transfer. The
    /// first reply fixes the peer for the rest of the session.
    pub fn accepts_from(&mut self, addr: SocketAddr) -> bool {
        match self.peer {
            Some(peer) => peer == addr,
            None => {
                self.peer = Some(addr);
                true
            }
        }
    }

    /// Records the next outgoing upload chunk of `len` bytes and returns its block number.
    pub fn next_block(&mut self, len: usize) -> u16 {
        self.block = self.block.wrapping_add(1);
        self.last_len = len;
        self.bytes += len as u64;
        self.blocks += 1;
        self.block
    }

    pub fn fail(&mut self, failure: Failure) {
        if self.is_active() {
            self.status = Status::Failed(failure);
        }
    }

    pub fn apply(&mut self, pkt: TftpPacket) -> Action {
        if !self.is_active() {
            return Action::Halt;
        }

        match (self.direction, pkt) {
            (_, TftpPacket::ERROR { code, msg }) => {
                self.status = Status::Failed(Failure::Peer {
                    code: ErrorCode::from(code),
                    message: msg,
                });
                Action::Halt
            }
            (Direction::Download, TftpPacket::DATA { block, data }) => {
                if data.len() > usize::from(BLOCK_SIZE) {
                    return self.illegal(format!("data block of {} bytes", data.len()));
                }
                if block != self.block {
                    warn!("expect block #{}, but #{block}", self.block);
                    return Action::Acknowledge(block);
                }
                self.block = self.block.wrapping_add(1);
                self.bytes += data.len() as u64;
                self.blocks += 1;
                if data.len() < usize::from(BLOCK_SIZE) {
                    self.status = Status::Completed;
                }
                Action::Deliver { block, data }
            }
            (Direction::Upload, TftpPacket::ACK(block)) => {
                if block != self.block {
                    warn!("expect ack #{}, but #{block}", self.block);
                    return Action::Ignore;
                }
                if self.last_len < usize::from(BLOCK_SIZE) {
                    self.status = Status::Completed;
                    Action::Halt
                } else {
                    Action::Proceed
                }
            }
            (_, other) => self.illegal(format!("unexpected {other}")),
        }
    }

    fn illegal(&mut self, reason: String) -> Action {
        self.status = Status::Failed(Failure::IllegalOperation(reason));
        Action::Halt
    }
}
