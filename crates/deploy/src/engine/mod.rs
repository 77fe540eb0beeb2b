//! The deployment engine seam.
//!
//! A [`ScriptHost`] is the execution context the implementation deployment
//! runs in: it can be primed with account state before the deployment and
//! records the transactions it produces on the paired [`Broadcaster`].

mod command;

use std::future::Future;

use alloy_core::primitives::{Address, Bytes, U256};
use derive_more::{Deref, From};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use url::Url;

pub use command::{CommandEngine, CommandScriptHost, PRIVATE_KEY_ENV};

use crate::{ArtifactsFs, Broadcaster, ChainContext, Credential, DeploymentSalt, ProofParams};

/// Account state imported into a script host.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub code: Bytes,
    pub balance: U256,
}

/// Execution context for the deployment script.
pub trait ScriptHost: Send {
    /// Set the deployer's nonce. All transactions are sequenced from it.
    fn set_nonce(&mut self, address: Address, nonce: u64);

    /// Overwrite the state of `address`.
    fn import_account(&mut self, address: Address, account: Account);

    /// The code at `address`, empty if none.
    fn code_at(&self, address: Address) -> Bytes;

    /// Run the implementation deployment once.
    fn deploy_implementations(
        &mut self,
        input: &DeploymentInput,
    ) -> impl Future<Output = anyhow::Result<DeploymentOutput>> + Send;
}

/// What a factory needs to build a host and broadcaster for one run.
#[derive(Debug, Clone, Copy)]
pub struct EngineContext<'a> {
    pub artifacts: &'a ArtifactsFs,
    pub chain: &'a ChainContext,
    pub credential: &'a Credential,
    pub endpoint: &'a Url,
}

/// Builds the script host and its paired broadcaster.
pub trait EngineFactory: Send + Sync {
    type Host: ScriptHost;
    type Broadcaster: Broadcaster;

    fn build(&self, ctx: EngineContext<'_>) -> anyhow::Result<(Self::Host, Self::Broadcaster)>;
}

/// Input of the implementation deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentInput {
    pub salt: DeploymentSalt,
    pub withdrawal_delay_seconds: U256,
    pub min_proposal_size_bytes: U256,
    pub challenge_period_seconds: U256,
    pub proof_maturity_delay_seconds: U256,
    pub dispute_game_finality_delay_seconds: U256,
    pub mips_version: U256,
    pub l1_contracts_release: String,
    pub superchain_config_proxy: Address,
    pub protocol_versions_proxy: Address,
    pub standard_versions_toml: String,
    pub use_interop: bool,
}

impl DeploymentInput {
    pub fn new(
        salt: DeploymentSalt,
        params: &ProofParams,
        l1_contracts_release: impl Into<String>,
        chain: &ChainContext,
    ) -> Self {
        Self {
            salt,
            withdrawal_delay_seconds: U256::from(params.withdrawal_delay_seconds),
            min_proposal_size_bytes: U256::from(params.min_proposal_size_bytes),
            challenge_period_seconds: U256::from(params.challenge_period_seconds),
            proof_maturity_delay_seconds: U256::from(params.proof_maturity_delay_seconds),
            dispute_game_finality_delay_seconds: U256::from(
                params.dispute_game_finality_delay_seconds,
            ),
            mips_version: U256::from(params.mips_version),
            l1_contracts_release: l1_contracts_release.into(),
            superchain_config_proxy: chain.superchain.superchain_config_proxy,
            protocol_versions_proxy: chain.superchain.protocol_versions_proxy,
            standard_versions_toml: chain.standard_versions_toml.clone(),
            use_interop: false,
        }
    }
}

/// The engine's result document. Opaque apart from the addresses it names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Deref, From)]
#[serde(transparent)]
pub struct DeploymentOutput(Map<String, Value>);

impl DeploymentOutput {
    /// Every top-level field whose value is an address, sorted by field name.
    pub fn addresses(&self) -> impl Iterator<Item = (&str, Address)> {
        self.0.iter().filter_map(|(name, value)| {
            let address = value.as_str()?.parse::<Address>().ok()?;
            Some((name.as_str(), address))
        })
    }
}

#[cfg(test)]
mod tests {
    use alloy_core::primitives::B256;
    use serde_json::json;

    use super::*;
    use crate::{SEPOLIA_CHAIN_ID, Standard, StandardRegistry};

    fn chain() -> ChainContext {
        ChainContext {
            chain_id: SEPOLIA_CHAIN_ID,
            superchain: Standard.superchain_for(SEPOLIA_CHAIN_ID).unwrap(),
            standard_versions_toml: "[releases]".to_string(),
            deployer: Address::repeat_byte(0x01),
            starting_nonce: 0,
        }
    }

    #[test]
    fn test_input_serializes_camel_case() {
        let input = DeploymentInput::new(
            DeploymentSalt::from(B256::repeat_byte(0xab)),
            &Standard::PROOF_PARAMS,
            "op-contracts/v1.6.0",
            &chain(),
        );
        let value = serde_json::to_value(&input).unwrap();

        assert_eq!(value["l1ContractsRelease"], "op-contracts/v1.6.0");
        assert_eq!(value["useInterop"], false);
        assert_eq!(value["challengePeriodSeconds"], "0x15180");
        assert_eq!(
            value["salt"],
            "0xabababababababababababababababababababababababababababababababab"
        );
        assert_eq!(input.mips_version, U256::from(1));
    }

    #[test]
    fn test_output_addresses() {
        let output: DeploymentOutput = serde_json::from_value(json!({
            "opcm": "0x1111111111111111111111111111111111111111",
            "mipsSingleton": "0x2222222222222222222222222222222222222222",
            "release": "op-contracts/v1.6.0",
            "count": 2
        }))
        .unwrap();

        let addresses: Vec<_> = output.addresses().collect();
        assert_eq!(
            addresses,
            vec![
                ("mipsSingleton", Address::repeat_byte(0x22)),
                ("opcm", Address::repeat_byte(0x11)),
            ]
        );
    }
}
