use std::fmt;
use std::str;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("packet length too short: {0} bytes")]
    TooShort(usize),
    #[error("invalid opcode: {0}")]
    InvalidOpcode(u16),
    #[error("missing cstr terminator")]
    MissingTerminator,
    #[error("invalid cstr encoding")]
    InvalidEncoding,
}

/// Error codes defined by RFC 1350, with their fixed messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    NotDefined,
    FileNotFound,
    AccessViolation,
    DiskFull,
    IllegalOperation,
    UnknownTransferId,
    FileExists,
    NoSuchUser,
    Unknown(u16),
}

impl ErrorCode {
    pub fn message(&self) -> &'static str {
        match self {
            ErrorCode::NotDefined => "Not defined, see error message (if any).",
            ErrorCode::FileNotFound => "File not found.",
            ErrorCode::AccessViolation => "Access violation.",
            ErrorCode::DiskFull => "Disk full or allocation exceeded.",
            ErrorCode::IllegalOperation => "Illegal TFTP operation.",
            ErrorCode::UnknownTransferId => "Unknown transfer ID.",
            ErrorCode::FileExists => "File already exists.",
            ErrorCode::NoSuchUser => "No such user.",
            ErrorCode::Unknown(_) => "Unknown error code.",
        }
    }
}

impl From<u16> for ErrorCode {
    fn from(code: u16) -> Self {
        match code {
            0 => ErrorCode::NotDefined,
            1 => ErrorCode::FileNotFound,
            2 => ErrorCode::AccessViolation,
            3 => ErrorCode::DiskFull,
            4 => ErrorCode::IllegalOperation,
            5 => ErrorCode::UnknownTransferId,
            6 => ErrorCode::FileExists,
            7 => ErrorCode::NoSuchUser,
            n => ErrorCode::Unknown(n),
        }
    }
}

impl From<ErrorCode> for u16 {
    fn from(code: ErrorCode) -> Self {
        match code {
            ErrorCode::NotDefined => 0,
            ErrorCode::FileNotFound => 1,
            ErrorCode::AccessViolation => 2,
            ErrorCode::DiskFull => 3,
            ErrorCode::IllegalOperation => 4,
            ErrorCode::UnknownTransferId => 5,
            ErrorCode::FileExists => 6,
            ErrorCode::NoSuchUser => 7,
            ErrorCode::Unknown(n) => n,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TftpPacket {
    RRQ { filename: String, mode: String },
    WRQ { filename: String, mode: String },
    DATA { block: u16, data: Vec<u8> },
    ACK(u16),
    ERROR { code: u16, msg: String },
}

impl TftpPacket {
    /// Error packet carrying the fixed message for `code`.
    pub fn error(code: ErrorCode) -> Self {
        TftpPacket::ERROR {
            code: code.into(),
            msg: code.message().to_string(),
        }
    }

    pub fn serialize(&self) -> Vec<u8> {
        let mut bytes: Vec<u8> = vec![0];

        match self {
            TftpPacket::RRQ { filename, mode } | TftpPacket::WRQ { filename, mode } => {
                if let TftpPacket::RRQ { .. } = self {
                    bytes.push(1);
                } else {
                    bytes.push(2);
                }
                bytes.extend(filename.as_bytes());
                bytes.push(0);
                bytes.extend(mode.as_bytes());
                bytes.push(0);
            }
            TftpPacket::DATA { block, data } => {
                bytes.push(3);
                bytes.extend_from_slice(&block.to_be_bytes());
                bytes.extend_from_slice(data);
            }
            TftpPacket::ACK(block) => {
                bytes.push(4);
                bytes.extend_from_slice(&block.to_be_bytes());
            }
            TftpPacket::ERROR { code, msg } => {
                bytes.push(5);
                bytes.extend_from_slice(&code.to_be_bytes());
                bytes.extend_from_slice(msg.as_bytes());
                bytes.push(0);
            }
        }
        bytes
    }

    pub fn deserialize(buf: &[u8]) -> Result<Self, DecodeError> {
        // The shortest valid packet is an ACK or an empty DATA: opcode + block.
        if buf.len() < 4 {
            return Err(DecodeError::TooShort(buf.len()));
        }

        let opcode = u16::from_be_bytes([buf[0], buf[1]]);
        let pkt = match opcode {
            1 | 2 => {
                let filename = read_cstr(&buf[2..])?;
                let mode = read_cstr(&buf[2 + filename.len() + 1..])?;
                if opcode == 1 {
                    TftpPacket::RRQ { filename, mode }
                } else {
                    TftpPacket::WRQ { filename, mode }
                }
            }
            3 => {
                let block = u16::from_be_bytes([buf[2], buf[3]]);
                let data = buf[4..].to_vec();

                TftpPacket::DATA { block, data }
            }
            4 => TftpPacket::ACK(u16::from_be_bytes([buf[2], buf[3]])),
            5 => {
                let code = u16::from_be_bytes([buf[2], buf[3]]);
                let msg = read_cstr(&buf[4..])?;

                TftpPacket::ERROR { code, msg }
            }
            _ => {
                return Err(DecodeError::InvalidOpcode(opcode));
            }
        };

        Ok(pkt)
    }
}

// Keeps DATA payloads out of the logs.
impl fmt::Display for TftpPacket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TftpPacket::RRQ { filename, mode } => write!(f, "RRQ {filename} ({mode})"),
            TftpPacket::WRQ { filename, mode } => write!(f, "WRQ {filename} ({mode})"),
            TftpPacket::DATA { block, data } => write!(f, "DATA #{block} ({} bytes)", data.len()),
            TftpPacket::ACK(block) => write!(f, "ACK #{block}"),
            TftpPacket::ERROR { code, msg } => write!(f, "ERROR {code}: {msg}"),
        }
    }
}

// Reads a NUL-terminated string.
fn read_cstr(buf: &[u8]) -> Result<String, DecodeError> {
    let pos = buf
        .iter()
        .position(|&b| b == 0)
        .ok_or(DecodeError::MissingTerminator)?;
    let s = str::from_utf8(&buf[..pos])
        .map_err(|_| DecodeError::InvalidEncoding)?
        .to_string();
    Ok(s)
}
