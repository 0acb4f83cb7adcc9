//! Invocation configuration.

use std::path::{Path, PathBuf};

use crate::cmdline::{read_cmdline, CMDLINE_PATH};
use crate::error::Error;
use crate::provider::CloudProvider;

/// What a single run should do, built once from command-line arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Explicit provider identifier, not yet validated.
    provider: Option<String>,
    /// Fall back to the kernel command line when `provider` is unset.
    cmdline: bool,
    /// Location of the kernel command line.
    cmdline_path: PathBuf,
    /// Attribute file to write.
    attributes: Option<PathBuf>,
    /// User whose SSH keys are updated.
    ssh_keys_user: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            provider: None,
            cmdline: false,
            cmdline_path: PathBuf::from(CMDLINE_PATH),
            attributes: None,
            ssh_keys_user: None,
        }
    }
}

impl Config {
    /// Build a configuration, treating empty strings as unset.
    pub fn new(
        provider: Option<String>,
        cmdline: bool,
        attributes: Option<String>,
        ssh_keys_user: Option<String>,
    ) -> Self {
        Self {
            provider: non_empty(provider),
            cmdline,
            attributes: non_empty(attributes).map(PathBuf::from),
            ssh_keys_user: non_empty(ssh_keys_user),
            ..Self::default()
        }
    }

    /// Read the kernel command line from `path` instead of `/proc/cmdline`.
    pub fn with_cmdline_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.cmdline_path = path.into();
        self
    }

    /// Determine the provider: `--provider` first, then the kernel command line.
    ///
    /// Any identifier outside the supported set, including none at all, is
    /// [`Error::InvalidProvider`].
    pub fn resolve_provider(&self) -> Result<CloudProvider, Error> {
        let name = match (&self.provider, self.cmdline) {
            (Some(provider), _) => provider.clone(),
            (None, true) => read_cmdline(&self.cmdline_path)?,
            (None, false) => String::new(),
        };
        name.parse()
    }

    /// The explicit provider identifier, if one was given.
    pub fn provider(&self) -> Option<&str> {
        self.provider.as_deref()
    }

    pub fn use_cmdline(&self) -> bool {
        self.cmdline
    }

    pub fn attributes_path(&self) -> Option<&Path> {
        self.attributes.as_deref()
    }

    pub fn ssh_keys_user(&self) -> Option<&str> {
        self.ssh_keys_user.as_deref()
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}
