//! Command-line and environment configuration

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;

/// 20 MiB
const DEFAULT_SIZE_LIMIT: usize = 20 * 1024 * 1024;

/// Runtime configuration; every flag can also come from the environment
#[derive(Parser, Debug, Clone)]
#[command(name = "signinjector-api")]
#[command(about = "Burn drawn signatures into stored PDF documents")]
pub struct Config {
    /// Host address to bind to
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on
    #[arg(short, long, env = "PORT", default_value_t = 4000)]
    pub port: u16,

    /// Directory holding uploaded originals and signed outputs
    #[arg(long, env = "UPLOAD_DIR", default_value = "./uploads")]
    pub upload_dir: PathBuf,

    /// SQLite connection string for the audit trail
    #[arg(long, env = "DATABASE_URL", default_value = "sqlite:signinjector.db?mode=rwc")]
    pub database_url: String,

    /// Largest source document accepted for upload or signing, in bytes
    #[arg(long, env = "MAX_PDF_BYTES", default_value_t = DEFAULT_SIZE_LIMIT)]
    pub max_pdf_bytes: usize,

    /// Request body limit, in bytes
    #[arg(long, env = "BODY_LIMIT_BYTES", default_value_t = DEFAULT_SIZE_LIMIT)]
    pub body_limit_bytes: usize,

    /// Allowed CORS origin, `*` for any
    #[arg(long, env = "CORS_ORIGIN", default_value = "*")]
    pub cors_origin: String,

    /// Skip writing the sample document at startup
    #[arg(long, env = "NO_SAMPLE")]
    pub no_sample: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Config {
    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(format!("{}:{}", self.host, self.port).parse()?)
    }
}
