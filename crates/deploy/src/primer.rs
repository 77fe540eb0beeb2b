//! State priming ahead of the implementation deployment.

use alloy_core::primitives::{Address, Bytes};

use crate::{Account, ScriptHost};

/// Placeholder code etched at primed addresses: a single `STOP`.
pub const ETCHED_CODE: Bytes = Bytes::from_static(&[0x00]);

/// Etches placeholder code so contract-existence checks in constructors pass.
#[derive(Debug, Clone, Copy, Default)]
pub struct StatePrimer;

impl StatePrimer {
    /// Import an account holding [`ETCHED_CODE`] at each of `addresses`.
    ///
    /// Only the host's view of state changes; nothing is sent to the network.
    pub fn etch<H: ScriptHost>(host: &mut H, addresses: &[Address]) {
        for &address in addresses {
            host.import_account(
                address,
                Account {
                    code: ETCHED_CODE,
                    ..Default::default()
                },
            );
            tracing::debug!(%address, "Etched placeholder code");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::{DeploymentInput, DeploymentOutput};

    #[derive(Default)]
    struct MemoryHost {
        accounts: HashMap<Address, Account>,
    }

    impl ScriptHost for MemoryHost {
        fn set_nonce(&mut self, _address: Address, _nonce: u64) {}

        fn import_account(&mut self, address: Address, account: Account) {
            self.accounts.insert(address, account);
        }

        fn code_at(&self, address: Address) -> Bytes {
            self.accounts
                .get(&address)
                .map(|a| a.code.clone())
                .unwrap_or_default()
        }

        async fn deploy_implementations(
            &mut self,
            _input: &DeploymentInput,
        ) -> anyhow::Result<DeploymentOutput> {
            Ok(DeploymentOutput::default())
        }
    }

    #[test]
    fn test_etched_addresses_have_code() {
        let mut host = MemoryHost::default();
        let addresses = [Address::repeat_byte(0x01), Address::repeat_byte(0x02)];

        StatePrimer::etch(&mut host, &addresses);

        for address in addresses {
            assert!(!host.code_at(address).is_empty());
        }
        assert!(host.code_at(Address::repeat_byte(0x03)).is_empty());
    }

    #[test]
    fn test_etch_is_idempotent_and_order_independent() {
        let a = Address::repeat_byte(0x01);
        let b = Address::repeat_byte(0x02);

        let mut once = MemoryHost::default();
        StatePrimer::etch(&mut once, &[a, b]);

        let mut twice = MemoryHost::default();
        StatePrimer::etch(&mut twice, &[b, a]);
        StatePrimer::etch(&mut twice, &[a, b]);

        assert_eq!(once.accounts, twice.accounts);
    }
}
