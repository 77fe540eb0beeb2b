//! Implementation deployment and broadcast.

use tokio_util::sync::CancellationToken;

use crate::{
    BootstrapError, BroadcastResult, Broadcaster, ChainContext, DeploymentInput, DeploymentOutput,
    DeploymentSalt, ResolvedConfig, ScriptHost, Stage, StatePrimer, cancel::or_cancelled,
};

/// A completed deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deployment {
    pub salt: DeploymentSalt,
    pub l1_contracts_release: String,
    pub output: DeploymentOutput,
    pub broadcasts: Vec<BroadcastResult>,
}

/// Runs the implementation deployment for one resolved chain and config.
#[derive(Debug, Clone, Copy)]
pub struct DeploymentCoordinator<'a> {
    pub chain: &'a ChainContext,
    pub config: &'a ResolvedConfig,
}

impl<'a> DeploymentCoordinator<'a> {
    pub const fn new(chain: &'a ChainContext, config: &'a ResolvedConfig) -> Self {
        Self { chain, config }
    }

    /// The contracts release the artifacts belong to: the locator's tag, or
    /// [`DEV_RELEASE`](crate::DEV_RELEASE) for anything not fetched by tag.
    pub fn l1_contracts_release(&self) -> String {
        self.config.artifacts_locator.release_tag().to_string()
    }

    /// Etch the superchain contracts, run the engine once and broadcast.
    ///
    /// A fresh salt is drawn unless `salt` is given. Reusing the salt of a
    /// failed broadcast reproduces the same implementation addresses.
    pub async fn deploy<H, B>(
        &self,
        host: &mut H,
        broadcaster: &B,
        salt: Option<DeploymentSalt>,
        cancel: &CancellationToken,
    ) -> Result<Deployment, BootstrapError>
    where
        H: ScriptHost,
        B: Broadcaster + ?Sized,
    {
        StatePrimer::etch(host, &self.chain.superchain.etched_addresses());

        let salt = match salt {
            Some(salt) => {
                tracing::info!(%salt, "Reusing deployment salt");
                salt
            }
            None => DeploymentSalt::random()?,
        };

        let l1_contracts_release = self.l1_contracts_release();
        tracing::info!(%l1_contracts_release, %salt, "Deploying OPCM");

        let input = DeploymentInput::new(
            salt,
            &self.config.proof_params,
            l1_contracts_release.clone(),
            self.chain,
        );

        // Dropping the engine future on cancellation stops the engine.
        let output = or_cancelled(cancel, Stage::Deployment, async {
            host.deploy_implementations(&input)
                .await
                .map_err(BootstrapError::Deployment)
        })
        .await?;

        let broadcasts = or_cancelled(cancel, Stage::Broadcast, async {
            broadcaster
                .broadcast()
                .await
                .map_err(|source| BootstrapError::Broadcast { salt, source })
        })
        .await?;

        tracing::info!(
            %salt,
            transactions = broadcasts.len(),
            "Deployed implementations"
        );
        for (contract, address) in output.addresses() {
            tracing::info!(contract = %contract, %address, "Implementation address");
        }

        Ok(Deployment {
            salt,
            l1_contracts_release,
            output,
            broadcasts,
        })
    }
}
