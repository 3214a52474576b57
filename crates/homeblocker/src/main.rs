use clap::Parser as _;
use homeblocker::{setup_logging, App, Args};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    setup_logging(args.log_file.as_deref())?;

    if let Err(e) = App::run_until_completion(args).await {
        tracing::error!("{:#}", e);
        return Err(e);
    }

    Ok(())
}
