//! The one-shot OPCM bootstrap run.

use std::io::Write;

use alloy_core::primitives::Address;
use tokio_util::sync::CancellationToken;
use tracing::{Dispatch, instrument::WithSubscriber};

use crate::{
    ArtifactProvider, ArtifactSession, BootstrapError, BroadcastResult, ChainContext,
    ConfigResolver, Connector, DeploymentCoordinator, DeploymentOutput, DeploymentSalt,
    EngineContext, EngineFactory, OutputFormat, RawOpcmConfig, ResultEmitter, ScriptHost,
    StandardRegistry,
};

/// Per-run options not part of the operator config.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Salt to reuse instead of drawing a fresh one.
    pub salt: Option<DeploymentSalt>,
    pub format: OutputFormat,
}

/// What a successful run deployed.
///
/// Only `output` is written to the sink. The rest is logged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapReport {
    pub chain_id: u64,
    pub deployer: Address,
    pub l1_contracts_release: String,
    pub salt: DeploymentSalt,
    pub output: DeploymentOutput,
    pub broadcasts: Vec<BroadcastResult>,
}

/// The collaborators of a bootstrap run.
#[derive(Debug, Clone)]
pub struct Bootstrap<C, R, A, E> {
    pub connector: C,
    pub registry: R,
    pub artifacts: A,
    pub engine: E,
}

impl<C, R, A, E> Bootstrap<C, R, A, E>
where
    C: Connector,
    R: StandardRegistry,
    A: ArtifactProvider,
    E: EngineFactory,
{
    /// Resolve `raw`, deploy the implementations, broadcast them and write the
    /// deployment output to `sink`.
    ///
    /// Every event of the run is recorded on `dispatch`. Acquired artifacts are
    /// released exactly once whichever way the run ends.
    pub async fn run<W: Write + ?Sized>(
        &self,
        raw: &RawOpcmConfig,
        options: RunOptions,
        sink: &mut W,
        cancel: &CancellationToken,
        dispatch: &Dispatch,
    ) -> Result<BootstrapReport, BootstrapError> {
        self.run_inner(raw, options, sink, cancel)
            .with_subscriber(dispatch.clone())
            .await
    }

    async fn run_inner<W: Write + ?Sized>(
        &self,
        raw: &RawOpcmConfig,
        options: RunOptions,
        sink: &mut W,
        cancel: &CancellationToken,
    ) -> Result<BootstrapReport, BootstrapError> {
        let config = ConfigResolver::resolve(raw, &self.registry)?;
        tracing::info!(
            deployer = %config.deployer,
            l1_rpc_url = %config.l1_rpc_url,
            artifacts_locator = %config.artifacts_locator,
            "Resolved OPCM config"
        );

        let chain = ChainContext::resolve(
            &self.connector,
            &self.registry,
            &config.l1_rpc_url,
            config.deployer,
            cancel,
        )
        .await?;

        let progress = |current: u64, total: u64| {
            tracing::info!(current, total, "Artifacts download progress");
        };
        let session =
            ArtifactSession::acquire(&self.artifacts, &config.artifacts_locator, &progress, cancel)
                .await?;

        let (mut host, broadcaster) = self
            .engine
            .build(EngineContext {
                artifacts: session.fs(),
                chain: &chain,
                credential: &config.credential,
                endpoint: &config.l1_rpc_url,
            })
            .map_err(BootstrapError::Engine)?;
        host.set_nonce(chain.deployer, chain.starting_nonce);

        let deployment = DeploymentCoordinator::new(&chain, &config)
            .deploy(&mut host, &broadcaster, options.salt, cancel)
            .await?;

        session.release();

        let report = BootstrapReport {
            chain_id: chain.chain_id,
            deployer: chain.deployer,
            l1_contracts_release: deployment.l1_contracts_release,
            salt: deployment.salt,
            output: deployment.output,
            broadcasts: deployment.broadcasts,
        };
        tracing::info!(
            l1_chain_id = report.chain_id,
            deployer = %report.deployer,
            l1_contracts_release = %report.l1_contracts_release,
            salt = %report.salt,
            transactions = report.broadcasts.len(),
            "OPCM deployment complete"
        );
        ResultEmitter::new(options.format).emit(&report.output, sink)?;

        Ok(report)
    }
}
