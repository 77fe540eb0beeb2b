//! Error types for the OPCM bootstrap run.

use alloy_core::primitives::Address;
use thiserror::Error;

use crate::{DeploymentSalt, LocatorError};

/// The stage of a bootstrap run an error was raised in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "kebab-case")]
pub enum Stage {
    /// Validating and defaulting the operator config.
    Config,
    /// Connecting to L1 and resolving chain identity, standard params and nonce.
    ChainContext,
    /// Acquiring the contract artifacts.
    Artifacts,
    /// Building the script host and broadcaster.
    Engine,
    /// Etching, salting and running the deployment engine.
    Deployment,
    /// Submitting the accumulated transactions.
    Broadcast,
    /// Writing the deployment output.
    Emit,
}

/// Coarse error classes used to decide what an operator should do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "kebab-case")]
pub enum ErrorKind {
    Config,
    Network,
    UnsupportedChain,
    Artifacts,
    Entropy,
    Deployment,
    Broadcast,
    Cancelled,
    Emit,
}

/// Errors raised while validating the operator config.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be specified")]
    MissingField(&'static str),
    #[error("failed to parse private key: {0}")]
    InvalidCredential(String),
    #[error("invalid L1 RPC URL {value:?}")]
    InvalidEndpoint {
        value: String,
        #[source]
        source: url::ParseError,
    },
    #[error("invalid artifacts locator {value:?}")]
    InvalidLocator {
        value: String,
        #[source]
        source: LocatorError,
    },
}

/// Errors raised while writing the deployment output.
#[derive(Debug, Error)]
pub enum EmitError {
    #[error("failed to serialize output as JSON")]
    Json(#[from] serde_json::Error),
    #[error("failed to serialize output as TOML")]
    Toml(#[from] toml::ser::Error),
    #[error("failed to write output")]
    Write(#[from] std::io::Error),
}

/// Error returned by a bootstrap run.
#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("invalid config for OPCM")]
    Config(#[from] ConfigError),
    #[error("failed to connect to L1 RPC at {endpoint}")]
    Connection {
        endpoint: String,
        #[source]
        source: anyhow::Error,
    },
    #[error("failed to get chain ID")]
    ChainIdentity(#[source] anyhow::Error),
    #[error("chain {chain_id} has no standard superchain entry")]
    UnsupportedChain { chain_id: u64 },
    #[error("failed to get starting nonce for {deployer}")]
    Nonce {
        deployer: Address,
        #[source]
        source: anyhow::Error,
    },
    #[error("failed to acquire artifacts from {locator}")]
    Artifacts {
        locator: String,
        #[source]
        source: anyhow::Error,
    },
    #[error("failed to create script host")]
    Engine(#[source] anyhow::Error),
    #[error("failed to generate CREATE2 salt")]
    Entropy(#[source] anyhow::Error),
    #[error("error deploying implementations")]
    Deployment(#[source] anyhow::Error),
    #[error("failed to broadcast deployment with salt {salt}")]
    Broadcast {
        salt: DeploymentSalt,
        #[source]
        source: anyhow::Error,
    },
    #[error("{stage} stage cancelled")]
    Cancelled { stage: Stage },
    #[error("failed to emit deployment output")]
    Emit(#[from] EmitError),
}

impl BootstrapError {
    /// The stage this error was raised in.
    pub const fn stage(&self) -> Stage {
        match self {
            Self::Config(_) => Stage::Config,
            Self::Connection { .. }
            | Self::ChainIdentity(_)
            | Self::UnsupportedChain { .. }
            | Self::Nonce { .. } => Stage::ChainContext,
            Self::Artifacts { .. } => Stage::Artifacts,
            Self::Engine(_) => Stage::Engine,
            Self::Entropy(_) | Self::Deployment(_) => Stage::Deployment,
            Self::Broadcast { .. } => Stage::Broadcast,
            Self::Cancelled { stage } => *stage,
            Self::Emit(_) => Stage::Emit,
        }
    }

    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Config(_) => ErrorKind::Config,
            Self::Connection { .. } | Self::ChainIdentity(_) | Self::Nonce { .. } => {
                ErrorKind::Network
            }
            Self::UnsupportedChain { .. } => ErrorKind::UnsupportedChain,
            Self::Artifacts { .. } => ErrorKind::Artifacts,
            Self::Entropy(_) => ErrorKind::Entropy,
            Self::Engine(_) | Self::Deployment(_) => ErrorKind::Deployment,
            Self::Broadcast { .. } => ErrorKind::Broadcast,
            Self::Cancelled { .. } => ErrorKind::Cancelled,
            Self::Emit(_) => ErrorKind::Emit,
        }
    }

    /// Whether re-running the same command cannot double-submit transactions.
    ///
    /// Only failures at or after the broadcast stage may have left transactions
    /// on chain. An emit failure happens after a successful broadcast, so a
    /// blind re-run would deploy a second implementation set.
    pub const fn is_safe_to_rerun(&self) -> bool {
        !matches!(self.stage(), Stage::Broadcast | Stage::Emit)
    }

    /// The salt to reuse when recovering from a partial broadcast.
    pub const fn recovery_salt(&self) -> Option<&DeploymentSalt> {
        match self {
            Self::Broadcast { salt, .. } => Some(salt),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_display() {
        assert_eq!(Stage::ChainContext.to_string(), "chain-context");
        assert_eq!(Stage::Broadcast.to_string(), "broadcast");
    }

    #[test]
    fn test_rerun_policy() {
        let unsupported = BootstrapError::UnsupportedChain { chain_id: 999999 };
        assert!(unsupported.is_safe_to_rerun());
        assert_eq!(unsupported.stage(), Stage::ChainContext);

        let deployment = BootstrapError::Deployment(anyhow::anyhow!("revert"));
        assert!(deployment.is_safe_to_rerun());
        assert_eq!(deployment.kind(), ErrorKind::Deployment);

        let broadcast = BootstrapError::Broadcast {
            salt: DeploymentSalt::default(),
            source: anyhow::anyhow!("nonce too low"),
        };
        assert!(!broadcast.is_safe_to_rerun());
        assert!(broadcast.recovery_salt().is_some());

        let cancelled = BootstrapError::Cancelled {
            stage: Stage::Broadcast,
        };
        assert!(!cancelled.is_safe_to_rerun());
        assert_eq!(cancelled.kind(), ErrorKind::Cancelled);
    }
}
