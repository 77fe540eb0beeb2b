//! Operator config validation and defaulting.

use std::fmt;

use alloy_core::primitives::Address;
use alloy_signer_local::PrivateKeySigner;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::{ArtifactsLocator, ConfigError, StandardRegistry};

/// Fault proof parameters of the implementation set.
///
/// A zero value means "unset" and is replaced by the registry default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct ProofParams {
    pub withdrawal_delay_seconds: u64,
    pub min_proposal_size_bytes: u64,
    pub challenge_period_seconds: u64,
    pub proof_maturity_delay_seconds: u64,
    pub dispute_game_finality_delay_seconds: u64,
    pub mips_version: u64,
}

impl ProofParams {
    /// Fill every zero field from `defaults`.
    pub const fn with_defaults(self, defaults: &Self) -> Self {
        const fn or(value: u64, default: u64) -> u64 {
            if value == 0 { default } else { value }
        }

        Self {
            withdrawal_delay_seconds: or(
                self.withdrawal_delay_seconds,
                defaults.withdrawal_delay_seconds,
            ),
            min_proposal_size_bytes: or(
                self.min_proposal_size_bytes,
                defaults.min_proposal_size_bytes,
            ),
            challenge_period_seconds: or(
                self.challenge_period_seconds,
                defaults.challenge_period_seconds,
            ),
            proof_maturity_delay_seconds: or(
                self.proof_maturity_delay_seconds,
                defaults.proof_maturity_delay_seconds,
            ),
            dispute_game_finality_delay_seconds: or(
                self.dispute_game_finality_delay_seconds,
                defaults.dispute_game_finality_delay_seconds,
            ),
            mips_version: or(self.mips_version, defaults.mips_version),
        }
    }
}

/// Operator-supplied configuration, as read from flags, env or a TOML file.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawOpcmConfig {
    pub l1_rpc_url: String,
    pub private_key: String,
    pub artifacts_locator: String,
    #[serde(flatten)]
    pub proof_params: ProofParams,
}

impl fmt::Debug for RawOpcmConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawOpcmConfig")
            .field("l1_rpc_url", &self.l1_rpc_url)
            .field("private_key", &"<redacted>")
            .field("artifacts_locator", &self.artifacts_locator)
            .field("proof_params", &self.proof_params)
            .finish()
    }
}

/// A parsed deployer private key.
#[derive(Clone)]
pub struct Credential(PrivateKeySigner);

impl Credential {
    /// Parse a hex-encoded secp256k1 private key, with or without `0x`.
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let raw = raw.trim();
        let hex = raw
            .strip_prefix("0x")
            .or_else(|| raw.strip_prefix("0X"))
            .unwrap_or(raw);
        hex.parse::<PrivateKeySigner>()
            .map(Self)
            .map_err(|e| ConfigError::InvalidCredential(e.to_string()))
    }

    pub fn address(&self) -> Address {
        self.0.address()
    }

    /// The key as a `0x`-prefixed hex string, for handing to the deployment engine.
    pub fn expose_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0.to_bytes()))
    }
}

impl PartialEq for Credential {
    fn eq(&self, other: &Self) -> bool {
        self.0.to_bytes() == other.0.to_bytes()
    }
}

impl Eq for Credential {}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Credential").field(&self.address()).finish()
    }
}

/// A validated config. Every proof parameter is set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedConfig {
    pub l1_rpc_url: Url,
    pub artifacts_locator: ArtifactsLocator,
    pub proof_params: ProofParams,
    pub credential: Credential,
    /// The account derived from `credential` that sends every transaction.
    pub deployer: Address,
}

/// Validates a [`RawOpcmConfig`] into a [`ResolvedConfig`].
#[derive(Debug, Clone, Copy)]
pub struct ConfigResolver;

impl ConfigResolver {
    /// Validate `raw` and fill unset proof parameters from `registry`.
    ///
    /// Pure: the same input always yields the same output.
    pub fn resolve<R: StandardRegistry + ?Sized>(
        raw: &RawOpcmConfig,
        registry: &R,
    ) -> Result<ResolvedConfig, ConfigError> {
        let l1_rpc_url = required("l1RPCUrl", &raw.l1_rpc_url)?;
        let private_key = required("private key", &raw.private_key)?;
        let artifacts_locator = required("artifacts locator", &raw.artifacts_locator)?;

        let credential = Credential::parse(private_key)?;

        let l1_rpc_url = Url::parse(l1_rpc_url).map_err(|source| ConfigError::InvalidEndpoint {
            value: l1_rpc_url.to_string(),
            source,
        })?;

        let artifacts_locator =
            artifacts_locator
                .parse()
                .map_err(|source| ConfigError::InvalidLocator {
                    value: artifacts_locator.to_string(),
                    source,
                })?;

        Ok(ResolvedConfig {
            l1_rpc_url,
            artifacts_locator,
            proof_params: raw.proof_params.with_defaults(&registry.proof_params()),
            deployer: credential.address(),
            credential,
        })
    }
}

fn required<'a>(field: &'static str, value: &'a str) -> Result<&'a str, ConfigError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ConfigError::MissingField(field));
    }
    Ok(value)
}
