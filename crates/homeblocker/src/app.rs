use anyhow::Context as _;

use crate::{Args, Config, DnsServer, State};

pub struct App;

impl App {
    pub async fn run_until_completion(args: Args) -> anyhow::Result<()> {
        let config = Config::load(&args.config).await?;

        // A malformed schedule must never turn into "always allow" or "always block"
        let registry = config.build_registry()?;

        let upstream_resolver = config
            .resolve_upstream()
            .await
            .context("failed to resolve the upstream resolver")?;

        tracing::info!(
            blocks = registry.len(),
            upstream = %upstream_resolver,
            "Loaded configuration from {:?}",
            args.config
        );
        tracing::debug!(blocks = ?registry.names().collect::<Vec<_>>(), "Active blocks");

        if args.check {
            println!(
                "{:?}: {} block(s) OK, upstream {}",
                args.config,
                registry.len(),
                upstream_resolver
            );
            return Ok(());
        }

        let bind_addr = config.bind_addr();
        let mut server = DnsServer::new(bind_addr, State::new(upstream_resolver, registry))
            .await
            .context("failed to instantiate the DNS server")?;

        tracing::info!(addr = %bind_addr, workers = args.workers, "Listening for DNS queries");
        server.add_workers(args.workers);

        server.block_until_completion().await
    }
}
