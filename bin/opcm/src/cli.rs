use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Parser;
use figment::{
    Figment,
    providers::{Format, Serialized, Toml},
};
use opcm_deploy::{DEFAULT_ARTIFACTS_BASE_URL, DeploymentSalt, OutputFormat, RawOpcmConfig};
use serde::Serialize;
use tracing::level_filters::LevelFilter;
use url::Url;

/// The default deployment engine executable, looked up on `PATH`.
const DEFAULT_ENGINE: &str = "opcm-engine";

/// Where the deployment output is written.
#[derive(Debug, Clone, PartialEq, Eq, Hash, strum::EnumString)]
pub enum OutFile {
    #[strum(serialize = "-")]
    Stdout,
    #[strum(default)]
    Path(String),
}

#[derive(Parser)]
#[command(name = "opcm")]
#[command(
    author,
    version,
    about = "Deploy the OP Contracts Manager implementations to an L1 chain"
)]
pub struct Cli {
    /// The verbosity level.
    #[arg(short, long, env = "OPCM_VERBOSITY", default_value_t = LevelFilter::INFO)]
    pub verbosity: LevelFilter,

    /// Path to a TOML file with the deployment config.
    ///
    /// Flags and environment variables take precedence over the file.
    #[arg(long, alias = "conf", env = "OPCM_CONFIG")]
    pub config: Option<PathBuf>,

    #[clap(flatten)]
    pub params: ConfigArgs,

    /// Where to write the deployment output. `-` writes to stdout.
    #[arg(long, short, env = "OPCM_OUTFILE", default_value = "-")]
    pub outfile: OutFile,

    /// Format of the deployment output (json or toml).
    #[arg(long, env = "OPCM_FORMAT", default_value_t = OutputFormat::Json)]
    pub format: OutputFormat,

    /// Reuse the CREATE2 salt of a previous run instead of drawing a fresh one.
    ///
    /// Use the salt printed by a failed broadcast to reproduce the same
    /// implementation addresses.
    #[arg(long, env = "OPCM_SALT")]
    pub salt: Option<DeploymentSalt>,

    /// The deployment engine executable.
    #[arg(long, env = "OPCM_ENGINE", default_value = DEFAULT_ENGINE)]
    pub engine: PathBuf,

    /// Extra argument passed to the deployment engine. Can be repeated.
    #[arg(long = "engine-arg", allow_hyphen_values = true)]
    pub engine_args: Vec<String>,

    /// Seconds to wait for each transaction receipt.
    #[arg(long, env = "OPCM_RECEIPT_TIMEOUT", default_value_t = 300)]
    pub receipt_timeout: u64,

    /// Base URL `tag://` artifact locators are resolved against.
    #[arg(long, env = "OPCM_ARTIFACTS_BASE_URL", default_value = DEFAULT_ARTIFACTS_BASE_URL)]
    pub artifacts_base_url: Url,

    /// Also write a markdown table of block explorer links for the deployed
    /// addresses to this file.
    #[arg(long, env = "OPCM_EXPLORER_LINKS")]
    pub explorer_links: Option<PathBuf>,
}

/// Deployment config settable from flags and environment variables.
///
/// Unset fields fall back to the config file, then to the defaults.
#[derive(Clone, Default, Parser, Serialize)]
pub struct ConfigArgs {
    /// The URL of the L1 RPC endpoint.
    #[arg(long, alias = "l1-rpc", env = "OPCM_L1_RPC_URL")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub l1_rpc_url: Option<String>,

    /// Hex-encoded private key of the deployer.
    #[arg(long, env = "OPCM_PRIVATE_KEY", hide_env_values = true)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub private_key: Option<String>,

    /// Locator of the contract artifacts: tag://<release>, file://<dir> or an
    /// http(s) URL of a .tar.gz archive.
    #[arg(long, env = "OPCM_ARTIFACTS_LOCATOR")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifacts_locator: Option<String>,

    /// Withdrawal delay in seconds. Zero selects the standard value.
    #[arg(long, env = "OPCM_WITHDRAWAL_DELAY_SECONDS")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub withdrawal_delay_seconds: Option<u64>,

    /// Minimum proposal size in bytes. Zero selects the standard value.
    #[arg(long, env = "OPCM_MIN_PROPOSAL_SIZE_BYTES")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_proposal_size_bytes: Option<u64>,

    /// Challenge period in seconds. Zero selects the standard value.
    #[arg(long, env = "OPCM_CHALLENGE_PERIOD_SECONDS")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub challenge_period_seconds: Option<u64>,

    /// Proof maturity delay in seconds. Zero selects the standard value.
    #[arg(long, env = "OPCM_PROOF_MATURITY_DELAY_SECONDS")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proof_maturity_delay_seconds: Option<u64>,

    /// Dispute game finality delay in seconds. Zero selects the standard value.
    #[arg(long, env = "OPCM_DISPUTE_GAME_FINALITY_DELAY_SECONDS")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dispute_game_finality_delay_seconds: Option<u64>,

    /// MIPS version. Zero selects the standard value.
    #[arg(long, env = "OPCM_MIPS_VERSION")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mips_version: Option<u64>,
}

impl Cli {
    /// Merge the defaults, the config file and the flags, in increasing precedence.
    pub fn load_config(&self) -> anyhow::Result<RawOpcmConfig> {
        load_config(self.config.as_deref(), &self.params)
    }
}

fn load_config(path: Option<&Path>, args: &ConfigArgs) -> anyhow::Result<RawOpcmConfig> {
    let mut figment = Figment::from(Serialized::defaults(RawOpcmConfig::default()));

    if let Some(path) = path {
        if !path.is_file() {
            anyhow::bail!("Configuration file not found: {}", path.display());
        }
        figment = figment.merge(Toml::file(path));
    }

    figment
        .merge(Serialized::defaults(args))
        .extract()
        .context("Failed to load OPCM config")
}

#[cfg(test)]
mod tests {
    use tempdir::TempDir;

    use super::*;

    const DEV_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    #[test]
    fn test_parse_outfile() {
        assert_eq!("-".parse::<OutFile>().unwrap(), OutFile::Stdout);
        assert_eq!(
            "deployment.json".parse::<OutFile>().unwrap(),
            OutFile::Path("deployment.json".to_string())
        );
    }

    #[test]
    fn test_flags_only() {
        let cli = Cli::try_parse_from([
            "opcm",
            "--l1-rpc-url",
            "http://localhost:8545",
            "--private-key",
            DEV_KEY,
            "--artifacts-locator",
            "tag://op-contracts/v1.6.0",
            "--mips-version",
            "2",
            "--format",
            "toml",
        ])
        .unwrap();

        let raw = cli.load_config().unwrap();
        assert_eq!(raw.l1_rpc_url, "http://localhost:8545");
        assert_eq!(raw.artifacts_locator, "tag://op-contracts/v1.6.0");
        assert_eq!(raw.proof_params.mips_version, 2);
        assert_eq!(raw.proof_params.challenge_period_seconds, 0);
        assert_eq!(cli.format, OutputFormat::Toml);
        assert_eq!(cli.outfile, OutFile::Stdout);
    }

    #[test]
    fn test_flags_override_file() {
        let dir = TempDir::new("opcm-cli-test").unwrap();
        let path = dir.path().join("opcm.toml");
        std::fs::write(
            &path,
            format!(
                r#"
l1_rpc_url = "http://file:8545"
private_key = "{DEV_KEY}"
artifacts_locator = "file:///artifacts"
challenge_period_seconds = 3600
mips_version = 7
"#
            ),
        )
        .unwrap();

        let args = ConfigArgs {
            l1_rpc_url: Some("http://flag:8545".to_string()),
            mips_version: Some(2),
            ..Default::default()
        };
        let raw = load_config(Some(&path), &args).unwrap();

        assert_eq!(raw.l1_rpc_url, "http://flag:8545");
        assert_eq!(raw.private_key, DEV_KEY);
        assert_eq!(raw.artifacts_locator, "file:///artifacts");
        assert_eq!(raw.proof_params.challenge_period_seconds, 3600);
        assert_eq!(raw.proof_params.mips_version, 2);
        assert_eq!(raw.proof_params.withdrawal_delay_seconds, 0);
    }

    #[test]
    fn test_missing_config_file() {
        let args = ConfigArgs::default();
        assert!(load_config(Some(Path::new("/definitely/not/here.toml")), &args).is_err());
    }
}
