//! opcm-deploy - One-shot deployment of the OP Contracts Manager implementations.
//!
//! A [`Bootstrap`] run validates the operator config, resolves the target L1,
//! acquires the contract artifacts, primes the script host, runs the
//! deployment engine once and broadcasts the resulting transactions.

mod artifacts;
pub use artifacts::{
    AcquiredArtifacts, ArtifactFetcher, ArtifactProvider, ArtifactSession, ArtifactsFs,
    DEFAULT_ARTIFACTS_BASE_URL, LocalArtifacts, Progress, ReleaseHandle, RemoteArtifacts,
};

mod bootstrap;
pub use bootstrap::{Bootstrap, BootstrapReport, RunOptions};

mod broadcast;
pub use broadcast::{
    BroadcastResult, Broadcaster, DEFAULT_RECEIPT_TIMEOUT, RpcBroadcaster, TxQueue,
};

mod cancel;

mod chain;
pub use chain::{ChainContext, Connector, NetworkClient};

mod config;
pub use config::{ConfigResolver, Credential, ProofParams, RawOpcmConfig, ResolvedConfig};

mod coordinator;
pub use coordinator::{Deployment, DeploymentCoordinator};

mod emit;
pub use emit::{Explorer, OutputFormat, ResultEmitter, default_explorers, explorer_links_table};

mod engine;
pub use engine::{
    Account, CommandEngine, CommandScriptHost, DeploymentInput, DeploymentOutput, EngineContext,
    EngineFactory, PRIVATE_KEY_ENV, ScriptHost,
};

mod error;
pub use error::{BootstrapError, ConfigError, EmitError, ErrorKind, Stage};

mod locator;
pub use locator::{ArtifactsLocator, DEV_RELEASE, LocatorError};

mod primer;
pub use primer::{ETCHED_CODE, StatePrimer};

pub mod rpc;
pub use rpc::{RpcClient, RpcConnector};

mod salt;
pub use salt::DeploymentSalt;

pub mod standard;
pub use standard::{
    MAINNET_CHAIN_ID, SEPOLIA_CHAIN_ID, Standard, StandardRegistry, SuperchainConfig,
};
