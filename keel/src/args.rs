use std::path::PathBuf;

use clap::Parser;

/// Keel chat-completion gateway
#[derive(Debug, Parser)]
#[command(name = "keel", about = "OpenAI-compatible chat gateway for AWS Bedrock")]
pub struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "keel.toml", env = "KEEL_CONFIG")]
    pub config: PathBuf,

    /// Override the listen address
    #[arg(long, env = "KEEL_LISTEN")]
    pub listen: Option<std::net::SocketAddr>,

    /// Log filter directive, e.g. `info` or `keel_llm=debug,info`
    #[arg(long, default_value = "info", env = "KEEL_LOG")]
    pub log_filter: String,
}
