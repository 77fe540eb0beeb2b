//! Standard superchain parameters, keyed by L1 chain ID.

use alloy_core::primitives::{Address, address};
use serde::{Deserialize, Serialize};

use crate::ProofParams;

/// Ethereum mainnet chain ID.
pub const MAINNET_CHAIN_ID: u64 = 1;
/// Sepolia chain ID.
pub const SEPOLIA_CHAIN_ID: u64 = 11155111;

pub const WITHDRAWAL_DELAY_SECONDS: u64 = 302400;
pub const MIN_PROPOSAL_SIZE_BYTES: u64 = 126000;
pub const CHALLENGE_PERIOD_SECONDS: u64 = 86400;
pub const PROOF_MATURITY_DELAY_SECONDS: u64 = 604800;
pub const DISPUTE_GAME_FINALITY_DELAY_SECONDS: u64 = 302400;
pub const MIPS_VERSION: u64 = 1;

const MAINNET_VERSIONS_TOML: &str = include_str!("standard-versions-mainnet.toml");
const SEPOLIA_VERSIONS_TOML: &str = include_str!("standard-versions-sepolia.toml");

/// The superchain-wide contracts a chain's OPCM is wired to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuperchainConfig {
    pub superchain_config_proxy: Address,
    pub protocol_versions_proxy: Address,
}

impl SuperchainConfig {
    /// Addresses that must hold code before the OPCM constructor runs.
    pub const fn etched_addresses(&self) -> [Address; 2] {
        [self.superchain_config_proxy, self.protocol_versions_proxy]
    }
}

/// Source of standard parameters and system addresses.
pub trait StandardRegistry: Send + Sync {
    /// Default proof parameters applied to unset config fields.
    fn proof_params(&self) -> ProofParams;

    /// The superchain contracts for `chain_id`, if the chain is known.
    fn superchain_for(&self, chain_id: u64) -> Option<SuperchainConfig>;

    /// The standard versions manifest (TOML) for `chain_id`, if the chain is known.
    fn l1_versions_for(&self, chain_id: u64) -> Option<String>;
}

/// The built-in registry for Ethereum mainnet and Sepolia.
#[derive(Debug, Clone, Copy, Default)]
pub struct Standard;

impl Standard {
    pub const PROOF_PARAMS: ProofParams = ProofParams {
        withdrawal_delay_seconds: WITHDRAWAL_DELAY_SECONDS,
        min_proposal_size_bytes: MIN_PROPOSAL_SIZE_BYTES,
        challenge_period_seconds: CHALLENGE_PERIOD_SECONDS,
        proof_maturity_delay_seconds: PROOF_MATURITY_DELAY_SECONDS,
        dispute_game_finality_delay_seconds: DISPUTE_GAME_FINALITY_DELAY_SECONDS,
        mips_version: MIPS_VERSION,
    };
}

impl StandardRegistry for Standard {
    fn proof_params(&self) -> ProofParams {
        Self::PROOF_PARAMS
    }

    fn superchain_for(&self, chain_id: u64) -> Option<SuperchainConfig> {
        match chain_id {
            MAINNET_CHAIN_ID => Some(SuperchainConfig {
                superchain_config_proxy: address!("0x95703e0982140D16f8ebA6d158FccEde42f04a4C"),
                protocol_versions_proxy: address!("0x8062AbC286f5e7D9428a0Ccb9AbD71e50d93b935"),
            }),
            SEPOLIA_CHAIN_ID => Some(SuperchainConfig {
                superchain_config_proxy: address!("0xC2Be75506d5724086DEB7245bd260Cc9753911Be"),
                protocol_versions_proxy: address!("0x79ADD5713B383DAa0a138d3C4780C7A1804a8090"),
            }),
            _ => None,
        }
    }

    fn l1_versions_for(&self, chain_id: u64) -> Option<String> {
        match chain_id {
            MAINNET_CHAIN_ID => Some(MAINNET_VERSIONS_TOML.to_string()),
            SEPOLIA_CHAIN_ID => Some(SEPOLIA_VERSIONS_TOML.to_string()),
            _ => None,
        }
    }
}
