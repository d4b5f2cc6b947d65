use std::process;
use std::sync::Arc;

use clap::Parser;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use dockhand::cli::{Cli, Commands};
use dockhand::controller::LifecycleController;
use dockhand::env_store::EnvStore;
use dockhand::observer::CliObserver;
use dockhand::runner::ProcessRunner;
use dockhand::{DeploymentMode, Error, LauncherConfig};

#[tokio::main]
async fn main() {
    init_tracing();

    if let Err(e) = run().await {
        match e.downcast_ref::<Error>() {
            Some(err) => eprintln!("Error: {}", err.with_suggestion()),
            None => eprintln!("Error: {}", e),
        }
        process::exit(1);
    }
}

fn init_tracing() {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => LauncherConfig::load(path)?,
        None => LauncherConfig::default(),
    };
    if let Some(workdir) = &cli.workdir {
        config.work_dir = workdir.clone();
    }
    config.validate()?;

    match cli.command {
        Commands::Start { mode, rebuild } => {
            let mode: DeploymentMode = mode.parse()?;
            let controller = build_controller(config);
            let url = tokio::select! {
                result = controller.start(mode, rebuild) => result?,
                _ = tokio::signal::ctrl_c() => {
                    controller.shutdown();
                    anyhow::bail!("Interrupted; containers were left as they are");
                }
            };
            println!("Deployment is up at {}", url);
        }
        Commands::Stop => {
            let controller = build_controller(config);
            controller.stop().await?;
            println!("Deployment stopped");
        }
        Commands::SaveKey { value } => {
            let controller = build_controller(config);
            controller.save_credential(&value)?;
            println!("Auth key saved");
        }
        Commands::Status => {
            print_status(&config)?;
        }
    }

    Ok(())
}

fn build_controller(config: LauncherConfig) -> LifecycleController {
    LifecycleController::new(config, Arc::new(ProcessRunner::new()), Arc::new(CliObserver))
}

fn print_status(config: &LauncherConfig) -> anyhow::Result<()> {
    let store = EnvStore::new(config.env_file_path());
    let address = store.get(&config.address_key)?;
    let has_key = store
        .get(&config.auth_key_name)?
        .is_some_and(|k| !k.trim().is_empty());

    println!("work dir:   {}", config.work_dir.display());
    println!("env file:   {}", store.path().display());
    println!(
        "address:    {}",
        address.filter(|a| !a.is_empty()).as_deref().unwrap_or("(unset)")
    );
    println!("auth key:   {}", if has_key { "saved" } else { "not saved" });
    println!("port:       {}", config.port);
    Ok(())
}
