// Fixture seeding tool
//
// Loads, unloads or reinitialises the data-backed fixtures described by a
// JSON manifest against the database named by DATABASE_URL.
//
// Usage: seed_fixtures <manifest.json> [load|unload|reinit]

use anyhow::{bail, Context, Result};
use pg_fixtures::{DataSource, FixtureConfig, FixtureManager, FixtureManifest, PgStorage, Storage};
use std::env;
use std::rc::Rc;

#[derive(Debug, Clone, Copy)]
enum Command {
    Load,
    Unload,
    Reinit,
}

impl Command {
    fn parse(arg: Option<&str>) -> Result<Self> {
        match arg.unwrap_or("load") {
            "load" => Ok(Command::Load),
            "unload" => Ok(Command::Unload),
            "reinit" => Ok(Command::Reinit),
            other => bail!("unknown command '{}', expected load, unload or reinit", other),
        }
    }
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_target(false)
        .with_thread_ids(false)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = env::args().skip(1).collect();
    let Some(manifest_path) = args.first() else {
        bail!("usage: seed_fixtures <manifest.json> [load|unload|reinit]");
    };
    let command = Command::parse(args.get(1).map(String::as_str))?;

    let config = FixtureConfig::from_env();
    let database_url = config
        .database_url
        .clone()
        .context("DATABASE_URL must be set in environment")?;

    let manifest = FixtureManifest::from_path(manifest_path)
        .with_context(|| format!("failed to read manifest {}", manifest_path))?;

    let storage: Rc<dyn Storage> = Rc::new(PgStorage::connect(&database_url)?);
    let source: Rc<dyn DataSource> = Rc::new(manifest.data_source(&config.data_dir));

    let declarations = manifest.declarations();
    let mut manager = FixtureManager::new(manifest.registry(storage, source));
    manager.resolve(declarations)?;

    match command {
        Command::Load => manager.load_all()?,
        Command::Unload => manager.unload_all()?,
        Command::Reinit => manager.reinit()?,
    }

    if let Some(set) = manager.resolved() {
        for (name, _) in set.iter() {
            tracing::info!("{}: {}", name, set.state(name).unwrap_or_default());
        }
    }
    tracing::info!(?command, fixtures = manifest.fixtures.len(), "done");
    Ok(())
}
