use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer};

pub(crate) const DEFAULT_POLL_INTERVAL_MS: u64 = 100;

/// How to reach the remote host. Built once by the caller and shared by
/// every command issued against that host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ConnectionDescriptor {
    pub(crate) binary: String,
    pub(crate) hostname: String,
    pub(crate) port: Option<u16>,
}

impl ConnectionDescriptor {
    pub(crate) fn from_json(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).context("parse ssh connection data")
    }
}

impl<'de> Deserialize<'de> for ConnectionDescriptor {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum DescriptorCompat {
            Triple(String, String, Option<u16>),
            Pair(String, String),
            Named {
                binary: String,
                hostname: String,
                #[serde(default)]
                port: Option<u16>,
            },
        }

        let (binary, hostname, port) = match DescriptorCompat::deserialize(deserializer)? {
            DescriptorCompat::Triple(binary, hostname, port) => (binary, hostname, port),
            DescriptorCompat::Pair(binary, hostname) => (binary, hostname, None),
            DescriptorCompat::Named {
                binary,
                hostname,
                port,
            } => (binary, hostname, port),
        };
        Ok(Self {
            binary,
            hostname,
            port,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub(crate) enum Mode {
    Ask,
    Edit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Action {
    Open,
    Edit,
    Save,
    Cancel,
}

impl Action {
    pub(crate) fn from_key(key: char) -> Self {
        match key.to_ascii_lowercase() {
            'e' => Action::Edit,
            'o' => Action::Open,
            's' => Action::Save,
            _ => Action::Cancel,
        }
    }
}

/// Outcome of the "destination already exists" menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ConflictChoice {
    Overwrite,
    Abort,
    NewName,
    AutoRename,
}

impl ConflictChoice {
    pub(crate) fn from_key(key: char) -> Self {
        match key.to_ascii_lowercase() {
            'o' => ConflictChoice::Overwrite,
            'n' => ConflictChoice::NewName,
            'r' => ConflictChoice::AutoRename,
            _ => ConflictChoice::Abort,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub(crate) struct Settings {
    #[serde(default)]
    pub(crate) editor: Option<Vec<String>>,
    #[serde(default)]
    pub(crate) open_command: Option<Vec<String>>,
    #[serde(default = "default_poll_interval_ms")]
    pub(crate) poll_interval_ms: u64,
    #[serde(default)]
    pub(crate) remove_partial_on_failure: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            editor: None,
            open_command: None,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            remove_partial_on_failure: false,
        }
    }
}

fn default_poll_interval_ms() -> u64 {
    DEFAULT_POLL_INTERVAL_MS
}

pub(crate) fn base_name(remote_path: &str) -> String {
    Path::new(remote_path)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}
