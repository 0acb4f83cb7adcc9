//! Provider-specific metadata fetchers and the registry that dispatches to them.

pub mod azure;
pub mod ec2;
pub mod gce;
pub mod packet;

use async_trait::async_trait;
use tracing::info;

use crate::client::{MetadataClient, DEFAULT_BASE_URL};
use crate::error::MetadataError;
use crate::metadata::Metadata;
use crate::provider::CloudProvider;

/// A source of instance metadata for one provider.
#[async_trait]
pub trait MetadataProvider: Send + Sync {
    /// Fetch attributes and SSH keys for the running instance.
    async fn fetch_metadata(&self) -> Result<Metadata, MetadataError>;
}

/// Maps every [`CloudProvider`] to the fetcher that serves it.
///
/// Each variant always has exactly one fetcher; [`ProviderRegistry::with_provider`]
/// can swap the implementation behind a variant but not add new variants.
pub struct ProviderRegistry {
    azure: Box<dyn MetadataProvider>,
    ec2: Box<dyn MetadataProvider>,
    gce: Box<dyn MetadataProvider>,
    packet: Box<dyn MetadataProvider>,
}

impl ProviderRegistry {
    /// Registry talking to the real metadata services.
    pub fn new() -> Result<Self, MetadataError> {
        let link_local = MetadataClient::with_base_url(DEFAULT_BASE_URL)?;
        let packet = MetadataClient::with_base_url(packet::DEFAULT_BASE_URL)?;
        Ok(Self::from_clients(link_local, packet))
    }

    /// Registry sending every provider's requests to `base_url`.
    ///
    /// This is primarily useful for testing with mock servers.
    pub fn with_base_url(base_url: &str) -> Result<Self, MetadataError> {
        let client = MetadataClient::with_base_url(base_url)?;
        Ok(Self::from_clients(client.clone(), client))
    }

    fn from_clients(link_local: MetadataClient, packet: MetadataClient) -> Self {
        Self {
            azure: Box::new(azure::Azure::new(link_local.clone())),
            ec2: Box::new(ec2::Ec2::new(link_local.clone())),
            gce: Box::new(gce::Gce::new(link_local)),
            packet: Box::new(packet::Packet::new(packet)),
        }
    }

    /// Replace the fetcher used for `provider`.
    pub fn with_provider(
        mut self,
        provider: CloudProvider,
        fetcher: impl MetadataProvider + 'static,
    ) -> Self {
        let fetcher: Box<dyn MetadataProvider> = Box::new(fetcher);
        match provider {
            CloudProvider::Azure => self.azure = fetcher,
            CloudProvider::Ec2 => self.ec2 = fetcher,
            CloudProvider::Gce => self.gce = fetcher,
            CloudProvider::Packet => self.packet = fetcher,
        }
        self
    }

    /// The fetcher serving `provider`.
    pub fn get(&self, provider: CloudProvider) -> &dyn MetadataProvider {
        match provider {
            CloudProvider::Azure => self.azure.as_ref(),
            CloudProvider::Ec2 => self.ec2.as_ref(),
            CloudProvider::Gce => self.gce.as_ref(),
            CloudProvider::Packet => self.packet.as_ref(),
        }
    }

    /// Fetch metadata from `provider`. Failures are returned as-is, without retry.
    pub async fn fetch(&self, provider: CloudProvider) -> Result<Metadata, MetadataError> {
        info!(%provider, "fetching metadata");
        self.get(provider).fetch_metadata().await
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    struct Fixed(&'static str);

    #[async_trait]
    impl MetadataProvider for Fixed {
        async fn fetch_metadata(&self) -> Result<Metadata, MetadataError> {
            Ok(Metadata::new(
                BTreeMap::from([("NAME".to_string(), self.0.to_string())]),
                None,
            ))
        }
    }

    struct Failing;

    #[async_trait]
    impl MetadataProvider for Failing {
        async fn fetch_metadata(&self) -> Result<Metadata, MetadataError> {
            Err(MetadataError::NotFound)
        }
    }

    fn stub_registry() -> ProviderRegistry {
        ProviderRegistry::with_base_url("http://localhost:1")
            .unwrap()
            .with_provider(CloudProvider::Azure, Fixed("azure"))
            .with_provider(CloudProvider::Ec2, Fixed("ec2"))
            .with_provider(CloudProvider::Gce, Fixed("gce"))
            .with_provider(CloudProvider::Packet, Fixed("packet"))
    }

    #[tokio::test]
    async fn test_dispatch_is_one_to_one() {
        let registry = stub_registry();

        for provider in CloudProvider::ALL {
            let metadata = registry.fetch(provider).await.unwrap();
            assert_eq!(metadata.attributes()["NAME"], provider.as_str());
        }
    }

    #[tokio::test]
    async fn test_fetch_error_is_surfaced() {
        let registry = stub_registry().with_provider(CloudProvider::Gce, Failing);

        let result = registry.fetch(CloudProvider::Gce).await;
        assert!(matches!(result, Err(MetadataError::NotFound)));
        assert!(registry.fetch(CloudProvider::Ec2).await.is_ok());
    }
}
