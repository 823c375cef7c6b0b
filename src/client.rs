use anyhow::{anyhow, Context};
use std::fmt;
use std::net::SocketAddr;
use std::path::Path;
use std::str::FromStr;
use tokio::fs::{self, File};
use tokio::net::{lookup_host, UdpSocket};
use tracing::{info, warn};

use crate::error::TransferError;
use crate::retry::RetryPolicy;
use crate::session::{TransferReport, TransferSession};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Get,
    Put,
}

impl FromStr for Operation {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "get" => Ok(Operation::Get),
            "put" => Ok(Operation::Put),
            _ => Err(anyhow!("Invalid operation '{s}'. Use 'get' or 'put'.")),
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Get => f.write_str("get"),
            Operation::Put => f.write_str("put"),
        }
    }
}

/// Resolves `host` (name or literal address) to the server's request endpoint.
pub async fn resolve(host: &str, port: u16) -> anyhow::Result<SocketAddr> {
    lookup_host((host, port))
        .await
        .with_context(|| format!("failed to resolve {host}"))?
        .next()
        .ok_or(anyhow!("no address for {host}"))
}

/// Runs one transfer per call against a fixed server.
#[derive(Debug, Clone)]
pub struct Client {
    server: SocketAddr,
    policy: RetryPolicy,
    mode: String,
}

impl Client {
    pub fn new(server: SocketAddr, policy: RetryPolicy) -> Self {
        Self {
            server,
            policy,
            mode: crate::DEF_MODE.to_string(),
        }
    }

    pub fn with_mode(mut self, mode: impl Into<String>) -> Self {
        self.mode = mode.into();
        self
    }

    pub async fn run(
        &self,
        op: Operation,
        remote: &str,
        local: &Path,
    ) -> Result<TransferReport, TransferError> {
        match op {
            Operation::Get => self.get(remote, local).await,
            Operation::Put => self.put(local, remote).await,
        }
    }

    /// Downloads `remote` into `local`. A failed download never leaves a
    /// partial `local` behind.
    pub async fn get(&self, remote: &str, local: &Path) -> Result<TransferReport, TransferError> {
        let mut file = File::create(local)
            .await
            .map_err(|source| TransferError::LocalFile {
                path: local.to_path_buf(),
                source,
            })?;

        let result = match self.session().await {
            Ok(session) => session.run_download(remote, &self.mode, &mut file).await,
            Err(e) => Err(e),
        };
        drop(file);

        if result.is_err() {
            info!("removing partial download {}", local.display());
            if let Err(e) = fs::remove_file(local).await {
                warn!("failed to remove {}: {e}", local.display());
            }
        }
        result
    }

    /// Uploads `local` as `remote`. The local file is opened before any
    /// packet is sent.
    pub async fn put(&self, local: &Path, remote: &str) -> Result<TransferReport, TransferError> {
        let mut file = File::open(local)
            .await
            .map_err(|source| TransferError::LocalFile {
                path: local.to_path_buf(),
                source,
            })?;

        self.session()
            .await?
            .run_upload(remote, &self.mode, &mut file)
            .await
    }

    async fn session(&self) -> Result<TransferSession, TransferError> {
        let bind = if self.server.is_ipv4() {
            "0.0.0.0:0"
        } else {
            "[::]:0"
        };
        let socket = UdpSocket::bind(bind).await?;
        Ok(TransferSession::new(socket, self.server, self.policy))
    }
}
