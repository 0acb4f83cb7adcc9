//! CLI binary for the coreos-metadata crate.

use std::process::ExitCode;

use clap::Parser;
use coreos_metadata::{
    open_user_store, run_provider, Config, Error, MetadataError, ProviderRegistry,
};
use tracing::{debug, Level};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "coreos-metadata")]
#[command(
    version,
    about = "Fetch cloud instance metadata, write attributes and install SSH keys"
)]
struct Cli {
    /// Read the cloud provider from the kernel cmdline
    #[arg(long)]
    cmdline: bool,

    /// The name of the cloud provider (azure, ec2, gce, packet)
    #[arg(long, value_name = "NAME")]
    provider: Option<String>,

    /// The file into which the metadata attributes are written
    #[arg(long, value_name = "PATH")]
    attributes: Option<String>,

    /// Update SSH keys for the given user
    #[arg(long = "ssh-keys", value_name = "USER")]
    ssh_keys: Option<String>,

    /// Enable verbose output (repeat for more)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(level).into())
        .from_env_lossy();

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .try_init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = Config::new(cli.provider, cli.cmdline, cli.attributes, cli.ssh_keys);
    debug!(?config, "parsed arguments");

    match execute(&config, ProviderRegistry::new).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", error_chain(&e));
            ExitCode::from(e.exit_code())
        }
    }
}

/// Validate the provider, then build the registry and run.
async fn execute<B>(config: &Config, build_registry: B) -> Result<(), Error>
where
    B: FnOnce() -> Result<ProviderRegistry, MetadataError>,
{
    let provider = config.resolve_provider()?;
    let registry = build_registry().map_err(Error::Fetch)?;
    run_provider(provider, config, &registry, open_user_store).await
}

/// Render an error followed by each of its causes.
fn error_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_flags() {
        let cli = Cli::try_parse_from([
            "coreos-metadata",
            "--provider=ec2",
            "--attributes=/run/metadata/coreos",
            "--ssh-keys=core",
        ])
        .unwrap();
        let config = Config::new(cli.provider, cli.cmdline, cli.attributes, cli.ssh_keys);

        assert_eq!(config.provider(), Some("ec2"));
        assert!(!config.use_cmdline());
        assert_eq!(
            config.attributes_path(),
            Some(std::path::Path::new("/run/metadata/coreos"))
        );
        assert_eq!(config.ssh_keys_user(), Some("core"));
    }

    #[test]
    fn test_version_ignores_other_flags() {
        let err = Cli::try_parse_from(["coreos-metadata", "--provider=foo", "--version"])
            .err()
            .unwrap();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayVersion);
        assert_eq!(err.exit_code(), 0);
    }

    #[tokio::test]
    async fn test_invalid_provider_before_registry() {
        let config = Config::new(Some("foo".to_string()), false, None, None);

        let err = execute(&config, || -> Result<ProviderRegistry, MetadataError> {
            panic!("registry built before the provider was validated")
        })
        .await
        .unwrap_err();

        assert!(matches!(err, Error::InvalidProvider(ref p) if p == "foo"));
        assert_eq!(err.exit_code(), 2);
    }

    #[tokio::test]
    async fn test_registry_failure_is_runtime_error() {
        let config = Config::new(Some("ec2".to_string()), false, None, None);

        let err = execute(&config, || Err(MetadataError::NotFound))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Fetch(MetadataError::NotFound)));
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn test_error_chain() {
        let err = Error::Fetch(MetadataError::NotFound);
        assert_eq!(
            error_chain(&err),
            "failed to fetch metadata: metadata not found"
        );
    }
}
