//! Deployment engine run as an external process.
//!
//! The process receives one JSON request on stdin and answers with one JSON
//! response on stdout:
//!
//! ```json
//! // request
//! { "l1RpcUrl": "...", "artifactsDir": "...", "chainId": 1, "deployer": "0x..",
//!   "nonce": 7, "accounts": { "0x..": { "code": "0x00", "balance": "0x0" } },
//!   "input": { "salt": "0x..", ... } }
//! // response
//! { "output": { "opcm": "0x..", ... }, "transactions": ["0x02f8..", ...] }
//! ```
//!
//! The deployer key is handed over in the `OPCM_ENGINE_PRIVATE_KEY`
//! environment variable, never on the command line.

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
    process::Stdio,
    time::Duration,
};

use alloy_core::primitives::{Address, Bytes};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use url::Url;

use super::{Account, DeploymentInput, DeploymentOutput, EngineContext, EngineFactory, ScriptHost};
use crate::{
    Credential,
    broadcast::{DEFAULT_RECEIPT_TIMEOUT, RpcBroadcaster, TxQueue},
    rpc::RpcClient,
};

/// Environment variable the deployer key is passed in.
pub const PRIVATE_KEY_ENV: &str = "OPCM_ENGINE_PRIVATE_KEY";

/// Contract whose artifact must be present for the engine to run.
const OPCM_CONTRACT: &str = "OPContractsManager";

/// Builds [`CommandScriptHost`]s that shell out to `program`.
#[derive(Debug, Clone)]
pub struct CommandEngine {
    program: PathBuf,
    args: Vec<String>,
    receipt_timeout: Duration,
}

impl CommandEngine {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            receipt_timeout: DEFAULT_RECEIPT_TIMEOUT,
        }
    }

    /// Add an argument passed to every invocation.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Set how long the broadcaster waits for each receipt.
    pub fn receipt_timeout(mut self, timeout: Duration) -> Self {
        self.receipt_timeout = timeout;
        self
    }
}

impl EngineFactory for CommandEngine {
    type Host = CommandScriptHost;
    type Broadcaster = RpcBroadcaster;

    fn build(&self, ctx: EngineContext<'_>) -> anyhow::Result<(Self::Host, Self::Broadcaster)> {
        if !ctx.artifacts.has_artifact(OPCM_CONTRACT) {
            anyhow::bail!(
                "Artifacts at {} do not contain {OPCM_CONTRACT}",
                ctx.artifacts.root().display()
            );
        }

        let broadcaster =
            RpcBroadcaster::new(RpcClient::new(ctx.endpoint.clone())?, self.receipt_timeout);

        let host = CommandScriptHost {
            program: self.program.clone(),
            args: self.args.clone(),
            endpoint: ctx.endpoint.clone(),
            artifacts_dir: ctx.artifacts.root().to_path_buf(),
            chain_id: ctx.chain.chain_id,
            deployer: ctx.chain.deployer,
            credential: ctx.credential.clone(),
            nonces: BTreeMap::new(),
            accounts: BTreeMap::new(),
            queue: broadcaster.queue(),
        };

        Ok((host, broadcaster))
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EngineRequest<'a> {
    l1_rpc_url: &'a Url,
    artifacts_dir: &'a Path,
    chain_id: u64,
    deployer: Address,
    nonce: Option<u64>,
    accounts: &'a BTreeMap<Address, Account>,
    input: &'a DeploymentInput,
}

#[derive(Debug, Deserialize)]
struct EngineResponse {
    output: DeploymentOutput,
    #[serde(default)]
    transactions: Vec<Bytes>,
}

/// Script host backed by an external engine process.
#[derive(Debug)]
pub struct CommandScriptHost {
    program: PathBuf,
    args: Vec<String>,
    endpoint: Url,
    artifacts_dir: PathBuf,
    chain_id: u64,
    deployer: Address,
    credential: Credential,
    nonces: BTreeMap<Address, u64>,
    accounts: BTreeMap<Address, Account>,
    queue: TxQueue,
}

impl CommandScriptHost {
    async fn invoke(&self, request: &[u8]) -> anyhow::Result<Vec<u8>> {
        let mut child = tokio::process::Command::new(&self.program)
            .args(&self.args)
            .env(PRIVATE_KEY_ENV, self.credential.expose_hex())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("Failed to start engine {}", self.program.display()))?;

        let mut stdin = child.stdin.take().context("Engine stdin is not piped")?;
        stdin
            .write_all(request)
            .await
            .context("Failed to write engine request")?;
        drop(stdin);

        let output = child
            .wait_with_output()
            .await
            .context("Failed to wait for engine")?;

        if !output.status.success() {
            anyhow::bail!(
                "Engine {} exited with {}",
                self.program.display(),
                output.status
            );
        }

        Ok(output.stdout)
    }
}

impl ScriptHost for CommandScriptHost {
    fn set_nonce(&mut self, address: Address, nonce: u64) {
        self.nonces.insert(address, nonce);
    }

    fn import_account(&mut self, address: Address, account: Account) {
        self.accounts.insert(address, account);
    }

    fn code_at(&self, address: Address) -> Bytes {
        self.accounts
            .get(&address)
            .map(|account| account.code.clone())
            .unwrap_or_default()
    }

    async fn deploy_implementations(
        &mut self,
        input: &DeploymentInput,
    ) -> anyhow::Result<DeploymentOutput> {
        let request = serde_json::to_vec(&EngineRequest {
            l1_rpc_url: &self.endpoint,
            artifacts_dir: &self.artifacts_dir,
            chain_id: self.chain_id,
            deployer: self.deployer,
            nonce: self.nonces.get(&self.deployer).copied(),
            accounts: &self.accounts,
            input,
        })
        .context("Failed to encode engine request")?;

        tracing::debug!(program = %self.program.display(), "Running deployment engine");
        let stdout = self.invoke(&request).await?;

        let response: EngineResponse =
            serde_json::from_slice(&stdout).context("Failed to decode engine response")?;

        tracing::debug!(
            transactions = response.transactions.len(),
            "Deployment engine finished"
        );
        for tx in response.transactions {
            self.queue.push(tx);
        }

        Ok(response.output)
    }
}
