use clap::Parser;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use renv::{Cli, EnvAction, EtcdStore, Renv, RenvError};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.global.verbose);

    if let Err(e) = run(cli).await {
        match &e {
            RenvError::UnknownKeys(errors) => {
                for err in errors {
                    eprintln!("Error: {err}");
                }
            }
            other => eprintln!("Error: {other}"),
        }
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let fallback = if verbose { "renv=debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_env("RENV_LOG").unwrap_or_else(|_| fallback.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

async fn run(cli: Cli) -> Result<(), RenvError> {
    let cwd = std::env::current_dir().map_err(|e| RenvError::IoError {
        path: ".".into(),
        source: e,
    })?;
    let id = cli.global.environment_id(&cwd)?;
    let settings = cli.global.settings_loader().load()?;
    let store = EtcdStore::from_settings(&settings)?;
    let renv = Renv::new(store, id);

    let mut action = cli.command.into_action();
    if let EnvAction::Nuke { confirmed: false } = action {
        action = EnvAction::Nuke {
            confirmed: confirm(&format!("Delete every key under /{}? [y/N] ", renv.id())).await?,
        };
    }

    let result = renv.handle(&action).await?;
    println!("{result}");
    Ok(())
}

async fn confirm(prompt: &str) -> Result<bool, RenvError> {
    let io_error = |e: std::io::Error| RenvError::IoError {
        path: "<stdin>".into(),
        source: e,
    };
    let mut stderr = tokio::io::stderr();
    stderr.write_all(prompt.as_bytes()).await.map_err(io_error)?;
    stderr.flush().await.map_err(io_error)?;

    let mut answer = String::new();
    BufReader::new(tokio::io::stdin())
        .read_line(&mut answer)
        .await
        .map_err(io_error)?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}
