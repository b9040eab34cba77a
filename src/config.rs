//! Host configuration.
//!
//! Everything has a default, so the config file is optional. Example:
//!
//! ```toml
//! dev_root = "/dev"
//! resolve_attempts = 10
//!
//! [tools]
//! pvdisplay = "/usr/sbin/pvdisplay"
//! ```

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::lvm::resolver::DEFAULT_RESOLVE_ATTEMPTS;

const DEFAULT_DEV_ROOT: &str = "/dev";

/// Program names of the LVM2 tools.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolConfig {
    pub pvdisplay: String,
    pub lvchange: String,
    pub lvdisplay: String,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            pvdisplay: "pvdisplay".to_string(),
            lvchange: "lvchange".to_string(),
            lvdisplay: "lvdisplay".to_string(),
        }
    }
}

impl ToolConfig {
    /// (program, package) pairs for preflight checks.
    pub fn required(&self) -> Vec<(&str, &str)> {
        vec![
            (self.pvdisplay.as_str(), "lvm2"),
            (self.lvchange.as_str(), "lvm2"),
            (self.lvdisplay.as_str(), "lvm2"),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostConfig {
    /// Root under which relative parent device names are resolved.
    pub dev_root: PathBuf,
    /// Number of `pvdisplay` attempts before giving up.
    pub resolve_attempts: u32,
    pub tools: ToolConfig,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            dev_root: PathBuf::from(DEFAULT_DEV_ROOT),
            resolve_attempts: DEFAULT_RESOLVE_ATTEMPTS,
            tools: ToolConfig::default(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct HostToml {
    dev_root: Option<PathBuf>,
    resolve_attempts: Option<u32>,
    tools: Option<ToolsToml>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ToolsToml {
    pvdisplay: Option<String>,
    lvchange: Option<String>,
    lvdisplay: Option<String>,
}

impl HostConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading host config '{}'", path.display()))?;
        Self::from_toml_str(&raw)
            .with_context(|| format!("parsing host config '{}'", path.display()))
    }

    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let parsed: HostToml = toml::from_str(raw)?;
        let defaults = HostConfig::default();
        let tools = parsed.tools.unwrap_or_default();

        let config = HostConfig {
            dev_root: parsed.dev_root.unwrap_or(defaults.dev_root),
            resolve_attempts: parsed.resolve_attempts.unwrap_or(defaults.resolve_attempts),
            tools: ToolConfig {
                pvdisplay: tools.pvdisplay.unwrap_or(defaults.tools.pvdisplay),
                lvchange: tools.lvchange.unwrap_or(defaults.tools.lvchange),
                lvdisplay: tools.lvdisplay.unwrap_or(defaults.tools.lvdisplay),
            },
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.resolve_attempts == 0 {
            bail!("resolve_attempts must be at least 1");
        }
        if !self.dev_root.is_absolute() {
            bail!(
                "dev_root must be an absolute path, got '{}'",
                self.dev_root.display()
            );
        }
        for (tool, _) in self.tools.required() {
            if tool.trim().is_empty() {
                bail!("tool names must not be empty");
            }
        }
        Ok(())
    }
}
