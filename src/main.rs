mod cli;

use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use annogen::cache::Caches;
use annogen::config::Config;
use annogen::engine::Engine;
use annogen::plugin::PluginRegistry;

use crate::cli::{Cli, Commands};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "annogen=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let cli = Cli::parse();

    let mut config = Config::load(&cli.config)?;
    config.offline |= cli.offline;
    let prefix = config.prefix(cli.prefix.as_deref());
    let cache_file = config.cache_file(cli.cache_file.as_deref());

    let caches = Arc::new(Caches::load(&cache_file)?);
    let engine = Engine::new(Arc::clone(&caches), &config);
    let registry = PluginRegistry::new();

    let result = match cli.command {
        Commands::Run { path, plugins } => {
            cli::run_plugins(&engine, &registry, &config, &path, &plugins, &prefix)
        }
        Commands::Scan { path, format } => cli::scan(&engine, &path, &prefix, &format),
        Commands::List => cli::list_plugins(&registry),
        Commands::Lookup {
            name,
            import_path,
            dir,
        } => cli::lookup(&engine, &name, &import_path, &dir),
    };

    // Flushed even when the command failed.
    if let Err(e) = caches.flush(&cache_file) {
        tracing::warn!("failed to write cache {}: {}", cache_file.display(), e);
    }

    result?;
    Ok(())
}
