//! opcm deploys the OP Contracts Manager implementations to an L1 chain in one shot.

mod cli;

use std::{fs::File, io::Write, time::Duration};

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{Dispatch, dispatcher};

use cli::{Cli, OutFile};
use opcm_deploy::{
    ArtifactFetcher, Bootstrap, BootstrapError, CommandEngine, RemoteArtifacts, RpcConnector,
    RunOptions, Standard, default_explorers, explorer_links_table,
};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so the output document can be piped from stdout.
    let dispatch = Dispatch::new(
        tracing_subscriber::fmt()
            .with_max_level(cli.verbosity)
            .with_writer(std::io::stderr)
            .finish(),
    );

    let raw = cli.load_config()?;

    let engine = cli
        .engine_args
        .iter()
        .fold(CommandEngine::new(&cli.engine), |engine, arg| {
            engine.arg(arg.clone())
        })
        .receipt_timeout(Duration::from_secs(cli.receipt_timeout));

    let bootstrap = Bootstrap {
        connector: RpcConnector,
        registry: Standard,
        artifacts: ArtifactFetcher::new(RemoteArtifacts::new(cli.artifacts_base_url.clone())?),
        engine,
    };

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        }
    });

    let options = RunOptions {
        salt: cli.salt,
        format: cli.format,
    };

    // The outfile is opened before anything is sent to L1.
    let result = match &cli.outfile {
        OutFile::Stdout => {
            let mut stdout = std::io::stdout().lock();
            bootstrap
                .run(&raw, options, &mut stdout, &cancel, &dispatch)
                .await
        }
        OutFile::Path(path) => {
            let mut file = File::create(path)
                .with_context(|| format!("Failed to create output file {path}"))?;
            bootstrap
                .run(&raw, options, &mut file, &cancel, &dispatch)
                .await
        }
    };

    let report = match result {
        Ok(report) => report,
        Err(err) => {
            let hint = rerun_hint(&err);
            dispatcher::with_default(&dispatch, || {
                tracing::error!(stage = %err.stage(), kind = %err.kind(), "OPCM deployment failed");
            });
            return Err(anyhow::Error::new(err).context(hint));
        }
    };

    if let Some(path) = &cli.explorer_links {
        let table = explorer_links_table(&report.output, &default_explorers());
        File::create(path)
            .and_then(|mut file| writeln!(file, "{table}"))
            .with_context(|| format!("Failed to write explorer links to {}", path.display()))?;

        dispatcher::with_default(&dispatch, || {
            tracing::info!(path = %path.display(), "Explorer links written");
        });
    }

    Ok(())
}

/// What the operator may do after a failed run.
fn rerun_hint(err: &BootstrapError) -> String {
    if err.is_safe_to_rerun() {
        return "No transactions were sent, it is safe to re-run this command".to_string();
    }

    match err.recovery_salt() {
        Some(salt) => format!(
            "Some transactions may already be on chain. Re-run with --salt {salt} to target the same addresses"
        ),
        None => "Transactions were sent. Do not re-run before inspecting the deployer account"
            .to_string(),
    }
}
