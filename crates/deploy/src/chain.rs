//! L1 chain context discovery.

use std::future::Future;

use alloy_core::primitives::Address;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::{BootstrapError, Stage, StandardRegistry, SuperchainConfig, cancel::or_cancelled};

/// The subset of an L1 client the bootstrap run needs.
pub trait NetworkClient: Send + Sync {
    fn chain_id(&self) -> impl Future<Output = anyhow::Result<u64>> + Send;

    /// Nonce of `address` at the latest block.
    fn nonce_at(&self, address: Address) -> impl Future<Output = anyhow::Result<u64>> + Send;
}

/// Opens [`NetworkClient`]s.
pub trait Connector: Send + Sync {
    type Client: NetworkClient;

    fn connect(&self, endpoint: &Url) -> impl Future<Output = anyhow::Result<Self::Client>> + Send;
}

/// Facts about the target L1, resolved once per run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainContext {
    pub chain_id: u64,
    pub superchain: SuperchainConfig,
    /// The standard versions manifest (TOML) for this chain.
    pub standard_versions_toml: String,
    pub deployer: Address,
    /// The deployer's nonce when the run started. Seeds all transaction sequencing.
    pub starting_nonce: u64,
}

impl ChainContext {
    /// Connect to `endpoint` and resolve the chain identity, its standard
    /// parameters and the deployer's starting nonce, in that order.
    ///
    /// An unknown chain stops the run before the nonce is queried.
    pub async fn resolve<C, R>(
        connector: &C,
        registry: &R,
        endpoint: &Url,
        deployer: Address,
        cancel: &CancellationToken,
    ) -> Result<Self, BootstrapError>
    where
        C: Connector + ?Sized,
        R: StandardRegistry + ?Sized,
    {
        or_cancelled(cancel, Stage::ChainContext, async {
            let client =
                connector
                    .connect(endpoint)
                    .await
                    .map_err(|source| BootstrapError::Connection {
                        endpoint: endpoint.to_string(),
                        source,
                    })?;

            let chain_id = client
                .chain_id()
                .await
                .map_err(BootstrapError::ChainIdentity)?;

            let (superchain, standard_versions_toml) =
                Self::standard_params_for(registry, chain_id)?;

            let starting_nonce = client
                .nonce_at(deployer)
                .await
                .map_err(|source| BootstrapError::Nonce { deployer, source })?;

            tracing::info!(
                chain_id,
                %deployer,
                starting_nonce,
                superchain_config_proxy = %superchain.superchain_config_proxy,
                protocol_versions_proxy = %superchain.protocol_versions_proxy,
                "Resolved L1 chain context"
            );

            Ok(Self {
                chain_id,
                superchain,
                standard_versions_toml,
                deployer,
                starting_nonce,
            })
        })
        .await
    }

    /// The superchain contracts and standard versions manifest for `chain_id`.
    pub fn standard_params_for<R: StandardRegistry + ?Sized>(
        registry: &R,
        chain_id: u64,
    ) -> Result<(SuperchainConfig, String), BootstrapError> {
        let superchain = registry
            .superchain_for(chain_id)
            .ok_or(BootstrapError::UnsupportedChain { chain_id })?;
        let versions = registry
            .l1_versions_for(chain_id)
            .ok_or(BootstrapError::UnsupportedChain { chain_id })?;
        Ok((superchain, versions))
    }
}
