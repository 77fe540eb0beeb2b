//! CREATE2 salt generation.

use std::str::FromStr;

use alloy_core::primitives::B256;
use derive_more::{Deref, Display};
use rand::{TryRngCore, rngs::OsRng};
use serde::{Deserialize, Serialize};

use crate::BootstrapError;

/// The CREATE2 salt of one deployment run.
///
/// Implementation addresses are a function of (salt, deployer, bytecode), so a
/// fresh salt per run keeps runs from colliding, and reusing a salt reproduces
/// the same addresses.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deref, Display, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct DeploymentSalt(B256);

impl DeploymentSalt {
    /// Draw a salt from the operating system's CSPRNG.
    pub fn random() -> Result<Self, BootstrapError> {
        Self::from_rng(&mut OsRng)
    }

    pub fn from_rng<R: TryRngCore + ?Sized>(rng: &mut R) -> Result<Self, BootstrapError> {
        let mut bytes = [0u8; 32];
        rng.try_fill_bytes(&mut bytes)
            .map_err(|e| BootstrapError::Entropy(anyhow::anyhow!("{e}")))?;
        Ok(Self(B256::from(bytes)))
    }
}

impl From<B256> for DeploymentSalt {
    fn from(value: B256) -> Self {
        Self(value)
    }
}

impl FromStr for DeploymentSalt {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let salt = B256::from_str(s.trim())
            .map_err(|e| anyhow::anyhow!("salt must be 32 hex-encoded bytes: {e}"))?;
        Ok(Self(salt))
    }
}
