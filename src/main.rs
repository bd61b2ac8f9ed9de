use std::{process, sync::Arc};

use clap::Parser;
use log::{error, info, LevelFilter};
use tokio::sync::Mutex;

use prompthub::{
    default_config_path, App, Cli, Config, FileStore, LibraryStorage, PromptLibrary, Result,
};

pub fn initialize_logger(verbose: bool) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    builder.format_timestamp_secs().format_module_path(true);
    if verbose {
        builder.filter_level(LevelFilter::Debug);
    }
    builder.init();

    info!("Logger initialized");
}

async fn run(cli: Cli) -> Result<()> {
    let config_path = match cli.config {
        Some(path) => path,
        None => default_config_path()?,
    };
    let mut config = Config::load(&config_path)?;

    if let Some(data_dir) = cli.data_dir {
        config.data_dir = data_dir;
    }
    if let Some(export_dir) = cli.export_dir {
        config.export_dir = export_dir;
    }

    let store = FileStore::new(&config.data_dir)?;
    let storage = LibraryStorage::new(store, config.key_prefix.clone());
    let library = PromptLibrary::load(storage, config.seed_samples)?;

    let app = App::new(
        Arc::new(Mutex::new(library)),
        config,
        config_path,
        cli.verbose,
    );
    app.run(cli.command).await
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    initialize_logger(cli.verbose);

    info!("Application starting up");

    if let Err(e) = run(cli).await {
        error!("{}", e);
        eprintln!("{}", console::style(e.user_message()).red());
        process::exit(1);
    }

    info!("Application shutting down");
}
