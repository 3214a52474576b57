use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(version, name = "homeblocker", about = "A DNS forwarder that blocks domains on a schedule")]
pub struct Args {
    #[arg(short('c'), long, value_name = "PATH", default_value = "homeblocker.yml")]
    pub config: PathBuf,
    #[arg(long, value_name = "WORKERS", default_value_t = 5, value_parser = clap::value_parser!(u8).range(1..=10))]
    pub workers: u8,
    /// Additionally write logs to this file, filtered by `HOMEBLOCKER_LOG_FILE`
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<PathBuf>,
    /// Validate the configuration and exit
    #[arg(long, default_value_t = false)]
    pub check: bool,
}
