use anstyle::AnsiColor;
use clap::builder::styling::Styles;
use clap::Parser;
use std::path::PathBuf;

use crate::client::Operation;

const STYLES: Styles = Styles::styled()
    .header(AnsiColor::Green.on_default())
    .usage(AnsiColor::Green.on_default())
    .literal(AnsiColor::Cyan.on_default())
    .placeholder(AnsiColor::Red.on_default());

#[derive(Parser, Debug)]
#[command(name = "tftp")]
#[command(about = "A simple TFTP client", long_about = None)]
#[command(styles = STYLES)]
pub struct Cli {
    /// Server host name or ip
    pub host: String,

    /// Operation: get or put
    pub operation: Operation,

    /// Remote file name
    pub filename: String,

    /// Server Port
    #[arg(short, long, default_value_t = crate::DEF_PORT)]
    pub port: u16,

    /// Local file (defaults to the remote file name)
    #[arg(short, long)]
    pub local: Option<PathBuf>,

    /// Timeout (ms)
    #[arg(short, long, default_value_t = crate::DEF_TIMEOUT_MS)]
    pub timeout: u64,

    /// Max retries, 0 fails on the first timeout
    #[arg(short, long, default_value_t = crate::DEF_RETRY_COUNT)]
    pub retry: u8,

    /// Log every packet
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    pub fn local_path(&self) -> PathBuf {
        self.local
            .clone()
            .unwrap_or_else(|| PathBuf::from(&self.filename))
    }
}
