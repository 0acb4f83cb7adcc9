//! Turn cloud provider instance metadata into local machine state at boot.
//!
//! A run resolves the provider (explicitly or from the kernel command line),
//! fetches its metadata, writes the attributes as a shell-sourceable file and
//! installs the provider's SSH keys for a user.
//!
//! # Example
//!
//! ```ignore
//! use coreos_metadata::{run, Config, ProviderRegistry};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), coreos_metadata::Error> {
//!     let config = Config::new(
//!         Some("ec2".to_string()),
//!         false,
//!         Some("/run/metadata/coreos".to_string()),
//!         Some("core".to_string()),
//!     );
//!     let registry = ProviderRegistry::new().map_err(coreos_metadata::Error::Fetch)?;
//!     run(&config, &registry).await
//! }
//! ```
//!
//! # Providers
//!
//! | Provider | Attributes | SSH keys |
//! |----------|------------|----------|
//! | `azure` | `AZURE_IPV4_*` | not supplied |
//! | `ec2` | `EC2_*` | instance public keys |
//! | `gce` | `GCE_*` | instance and project `ssh-keys` |
//! | `packet` | `PACKET_*` | metadata `ssh_keys` |

mod attributes;
mod authorized_keys;
mod client;
mod cmdline;
mod config;
mod error;
mod metadata;
mod provider;
pub mod providers;
mod ssh_keys;

use tracing::info;

pub use attributes::{write_attributes, ATTRIBUTE_PREFIX};
pub use authorized_keys::{lookup_user, AuthorizedKeysDir, AuthorizedKeysStore};
pub use client::MetadataClient;
pub use cmdline::{parse_cmdline, read_cmdline, CMDLINE_OEM_FLAG, CMDLINE_PATH};
pub use config::Config;
pub use error::{Error, KeysError, MetadataError};
pub use metadata::Metadata;
pub use provider::CloudProvider;
pub use providers::{MetadataProvider, ProviderRegistry};
pub use ssh_keys::{install_ssh_keys, open_user_store, write_ssh_keys, KEYS_BLOCK_NAME};

/// Run once: resolve the provider, fetch, write attributes, install keys.
pub async fn run(config: &Config, registry: &ProviderRegistry) -> Result<(), Error> {
    run_with(config, registry, open_user_store).await
}

/// Like [`run`], opening the authorized keys store through `open_keys`.
///
/// Each step completes before the next starts, and the first failure ends the
/// run. The provider is validated before anything is fetched or written.
pub async fn run_with<S, F>(
    config: &Config,
    registry: &ProviderRegistry,
    open_keys: F,
) -> Result<(), Error>
where
    S: AuthorizedKeysStore,
    F: FnOnce(&str) -> Result<S, KeysError>,
{
    let provider = config.resolve_provider()?;
    run_provider(provider, config, registry, open_keys).await
}

/// Like [`run_with`], for a provider the caller has already resolved.
pub async fn run_provider<S, F>(
    provider: CloudProvider,
    config: &Config,
    registry: &ProviderRegistry,
    open_keys: F,
) -> Result<(), Error>
where
    S: AuthorizedKeysStore,
    F: FnOnce(&str) -> Result<S, KeysError>,
{
    info!(%provider, "using provider");

    let metadata = registry.fetch(provider).await.map_err(Error::Fetch)?;

    write_attributes(config.attributes_path(), &metadata).map_err(Error::Attributes)?;
    install_ssh_keys(config.ssh_keys_user(), &metadata, open_keys).map_err(Error::Keys)?;

    Ok(())
}
