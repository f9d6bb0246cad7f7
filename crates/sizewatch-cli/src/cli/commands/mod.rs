use anyhow::Context;
use sizewatch_core::{open_store, ArtifactStore, ServiceConfig, StoreSpec};

use super::args::*;

pub mod compare;
pub mod event;
pub mod projects;
pub mod show;

pub async fn dispatch(cli: Cli) -> anyhow::Result<i32> {
    let config = service_config(cli.store.as_deref());
    match cli.cmd {
        Command::Event(args) => event::run(args, &config).await,
        Command::Projects => projects::run(&config).await,
        Command::Show(args) => show::run(args, &config).await,
        Command::Compare(args) => compare::run(args, &config).await,
    }
}

/// Environment configuration with the `--store` override applied.
fn service_config(store: Option<&str>) -> ServiceConfig {
    let config = ServiceConfig::from_env();
    match store {
        Some(store) => config.with_store(store),
        None => config,
    }
}

pub(crate) async fn open_artifact_store(config: &ServiceConfig) -> anyhow::Result<ArtifactStore> {
    let spec = StoreSpec::parse(&config.store)?;
    let backend = open_store(&spec, config.store_token.clone(), config.timeout_secs)
        .await
        .with_context(|| format!("failed to open store {}", config.store))?;
    Ok(ArtifactStore::new(backend))
}
