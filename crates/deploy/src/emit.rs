//! Deployment output rendering.

use std::io::Write;

use alloy_core::primitives::Address;
use comfy_table::{Table, presets::ASCII_MARKDOWN};
use serde::Serialize;

use crate::{DeploymentOutput, EmitError};

/// Document format of the emitted output.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, strum::Display, strum::EnumString,
)]
#[strum(serialize_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Json,
    Toml,
}

/// Writes the deployment output to a sink.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResultEmitter {
    pub format: OutputFormat,
}

impl ResultEmitter {
    pub const fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Serialize `value` and write it to `sink`, followed by a newline.
    pub fn emit<T, W>(&self, value: &T, sink: &mut W) -> Result<(), EmitError>
    where
        T: Serialize + ?Sized,
        W: Write + ?Sized,
    {
        let mut document = match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(value)?,
            OutputFormat::Toml => toml::to_string_pretty(value)?,
        };
        if !document.ends_with('\n') {
            document.push('\n');
        }

        sink.write_all(document.as_bytes())?;
        sink.flush()?;
        Ok(())
    }
}

/// A block explorer to link deployed addresses to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Explorer {
    pub name: String,
    /// Prefix the address is appended to.
    pub base_url: String,
}

impl Explorer {
    pub fn new(name: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            base_url: base_url.into(),
        }
    }

    pub fn link(&self, address: &Address) -> String {
        format!("[Link]({}{address})", self.base_url)
    }
}

/// The OP Stack testnet explorers implementations are commonly checked on.
pub fn default_explorers() -> Vec<Explorer> {
    vec![
        Explorer::new(
            "opSepolia",
            "https://optimism-sepolia.blockscout.com/address/",
        ),
        Explorer::new("arbSepolia", "https://sepolia.arbiscan.io/address/"),
        Explorer::new("baseSepolia", "https://sepolia.basescan.org/address/"),
        Explorer::new(
            "uniSepolia",
            "https://unichain-sepolia.blockscout.com/address/",
        ),
    ]
}

/// Render a markdown table linking every address in `output` on each explorer.
pub fn explorer_links_table(output: &DeploymentOutput, explorers: &[Explorer]) -> String {
    let mut table = Table::new();
    table.load_preset(ASCII_MARKDOWN);

    let mut header = vec!["Contract Name".to_string(), "Address".to_string()];
    header.extend(explorers.iter().map(|e| e.name.clone()));
    table.set_header(header);

    for (name, address) in output.addresses() {
        let mut row = vec![name.to_string(), address.to_string()];
        row.extend(explorers.iter().map(|e| e.link(&address)));
        table.add_row(row);
    }

    table.to_string()
}
