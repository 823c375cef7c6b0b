use std::io;
use std::net::SocketAddr;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::UdpSocket;
use tokio::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::error::TransferError;
use crate::packet::{DecodeError, ErrorCode, TftpPacket};
use crate::retry::RetryPolicy;
use crate::state::{Action, Direction, Failure, Status, TransferState};
use crate::BLOCK_SIZE;

// Larger than any legal packet so an oversized DATA is seen as such.
const RECV_BUF_SIZE: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferReport {
    pub bytes: u64,
    pub blocks: u32,
    pub elapsed: Duration,
}

impl TransferReport {
    /// Throughput in MB/s.
    pub fn speed(&self) -> f64 {
        self.bytes as f64 / self.elapsed.as_secs_f64().max(f64::EPSILON) / 1024.0 / 1024.0
    }
}

/// Drives one lockstep transfer over an owned socket.
///
/// The request goes to `server`; everything after the first reply goes to the
/// address that reply came from. Both `run_*` methods consume the session, so
/// the socket is closed however the transfer ends.
pub struct TransferSession {
    socket: UdpSocket,
    server: SocketAddr,
    policy: RetryPolicy,
    // Last packet that expects a reply, resent on timeout.
    last: Vec<u8>,
    buf: Vec<u8>,
}

impl TransferSession {
    pub fn new(socket: UdpSocket, server: SocketAddr, policy: RetryPolicy) -> Self {
        Self {
            socket,
            server,
            policy,
            last: Vec::new(),
            buf: vec![0; RECV_BUF_SIZE],
        }
    }

    pub async fn run_download<W>(
        mut self,
        filename: &str,
        mode: &str,
        sink: &mut W,
    ) -> Result<TransferReport, TransferError>
    where
        W: AsyncWrite + Unpin,
    {
        let start = Instant::now();
        let mut state = TransferState::new(Direction::Download);
        let rrq = TftpPacket::RRQ {
            filename: filename.to_string(),
            mode: mode.to_string(),
        };
        self.send(&state, rrq).await?;

        while state.is_active() {
            let Some(pkt) = self.recv(&mut state).await? else {
                break;
            };
            match state.apply(pkt) {
                Action::Deliver { block, data } => {
                    sink.write_all(&data).await?;
                    self.send(&state, TftpPacket::ACK(block)).await?;
                }
                Action::Acknowledge(block) => {
                    // Out-of-order acks are not worth resending on timeout.
                    self.send_once(&state, TftpPacket::ACK(block)).await?;
                }
                _ => (),
            }
        }
        sink.flush().await?;

        self.finish(state, start).await
    }

    pub async fn run_upload<R>(
        mut self,
        filename: &str,
        mode: &str,
        source: &mut R,
    ) -> Result<TransferReport, TransferError>
    where
        R: AsyncRead + Unpin,
    {
        let start = Instant::now();
        let mut state = TransferState::new(Direction::Upload);
        let mut chunk: Vec<u8> = vec![0; usize::from(BLOCK_SIZE)];
        let wrq = TftpPacket::WRQ {
            filename: filename.to_string(),
            mode: mode.to_string(),
        };
        self.send(&state, wrq).await?;

        while state.is_active() {
            let Some(pkt) = self.recv(&mut state).await? else {
                break;
            };
            if state.apply(pkt) == Action::Proceed {
                let size = read_block(source, &mut chunk).await?;
                let block = state.next_block(size);
                let data = TftpPacket::DATA {
                    block,
                    data: chunk[..size].to_vec(),
                };
                self.send(&state, data).await?;
            }
        }

        self.finish(state, start).await
    }

    fn dest(&self, state: &TransferState) -> SocketAddr {
        state.peer().unwrap_or(self.server)
    }

    async fn send(&mut self, state: &TransferState, pkt: TftpPacket) -> io::Result<()> {
        let dest = self.dest(state);
        debug!("{dest} <- {pkt}");
        self.last = pkt.serialize();
        self.socket.send_to(&self.last, dest).await?;
        Ok(())
    }

    async fn send_once(&self, state: &TransferState, pkt: TftpPacket) -> io::Result<()> {
        let dest = self.dest(state);
        debug!("{dest} <- {pkt}");
        self.socket.send_to(&pkt.serialize(), dest).await?;
        Ok(())
    }

    /// Waits for the next packet of this transfer, resending the last packet
    /// on every timeout the policy allows. Returns `None` once the state has
    /// failed on a timeout or an undecodable reply.
    async fn recv(&mut self, state: &mut TransferState) -> io::Result<Option<TftpPacket>> {
        let policy = self.policy;
        let mut timeouts: u32 = 0;
        loop {
            match policy.wait(self.recv_from_peer(state)).await {
                Some(res) => {
                    return match res? {
                        Ok(pkt) => Ok(Some(pkt)),
                        Err(e) => {
                            state.fail(Failure::Malformed(e));
                            Ok(None)
                        }
                    };
                }
                None => {
                    timeouts += 1;
                    if !policy.should_retry(timeouts) {
                        warn!("timeout, giving up after {timeouts} attempt(s)");
                        state.fail(Failure::Timeout {
                            block: state.block(),
                            attempts: timeouts,
                        });
                        return Ok(None);
                    }
                    let dest = self.dest(state);
                    warn!("timeout, retrans to {dest} ({timeouts}/{})", policy.retries);
                    self.socket.send_to(&self.last, dest).await?;
                }
            }
        }
    }

    async fn recv_from_peer(
        &mut self,
        state: &mut TransferState,
    ) -> io::Result<Result<TftpPacket, DecodeError>> {
        loop {
            let (num, addr) = self.socket.recv_from(&mut self.buf).await?;
            if !state.accepts_from(addr) {
                warn!("{addr} is not the transfer peer, rejecting");
                let error = TftpPacket::error(ErrorCode::UnknownTransferId);
                self.socket.send_to(&error.serialize(), addr).await?;
                continue;
            }

            let pkt = TftpPacket::deserialize(&self.buf[..num]);
            match &pkt {
                Ok(pkt) => debug!("{addr} -> {pkt}"),
                Err(e) => warn!("{addr} sent a malformed datagram: {e}"),
            }
            return Ok(pkt);
        }
    }

    async fn finish(
        self,
        state: TransferState,
        start: Instant,
    ) -> Result<TransferReport, TransferError> {
        match state.status().clone() {
            Status::Completed => {
                let report = TransferReport {
                    bytes: state.bytes(),
                    blocks: state.blocks(),
                    elapsed: start.elapsed(),
                };
                info!(
                    "{:?} completed: {} bytes in {} blocks",
                    state.direction(),
                    report.bytes,
                    report.blocks
                );
                Ok(report)
            }
            Status::Failed(failure) => {
                warn!("{:?} failed: {failure:?}", state.direction());
                if matches!(
                    failure,
                    Failure::IllegalOperation(_) | Failure::Malformed(_)
                ) {
                    self.abort(&state).await;
                }
                Err(failure.into())
            }
            Status::Active => Err(TransferError::IllegalOperation(
                "transfer stopped while active".to_string(),
            )),
        }
    }

    // Best effort: the transfer has already failed.
    async fn abort(&self, state: &TransferState) {
        let error = TftpPacket::error(ErrorCode::IllegalOperation);
        if let Err(e) = self.send_once(state, error).await {
            warn!("failed to notify peer: {e}");
        }
    }
}

// Fills `buf` unless the source runs dry first.
async fn read_block<R>(source: &mut R, buf: &mut [u8]) -> io::Result<usize>
where
    R: AsyncRead + Unpin,
{
    let mut filled = 0;
    while filled < buf.len() {
        let n = source.read(&mut buf[filled..]).await?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}
