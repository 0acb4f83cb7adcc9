//! GCE metadata implementation.

use std::collections::BTreeMap;

use async_trait::async_trait;
use tracing::debug;

use super::MetadataProvider;
use crate::client::MetadataClient;
use crate::error::MetadataError;
use crate::metadata::Metadata;

/// GCE metadata service base path.
const METADATA_PATH: &str = "/computeMetadata/v1";

/// Required header for GCE metadata requests.
const METADATA_FLAVOR_HEADER: &str = "Metadata-Flavor";

/// Required header value for GCE metadata requests.
const METADATA_FLAVOR_VALUE: &str = "Google";

const ATTRIBUTES: &[(&str, &str)] = &[
    ("GCE_HOSTNAME", "instance/hostname"),
    ("GCE_IP_LOCAL_0", "instance/network-interfaces/0/ip"),
    (
        "GCE_IP_EXTERNAL_0",
        "instance/network-interfaces/0/access-configs/0/external-ip",
    ),
];

/// Google Compute Engine fetcher.
#[derive(Debug, Clone)]
pub struct Gce {
    client: MetadataClient,
}

impl Gce {
    pub fn new(client: MetadataClient) -> Self {
        Self { client }
    }

    async fn get(&self, key: &str) -> Result<Option<String>, MetadataError> {
        let request = self
            .client
            .inner()
            .get(self.client.url(&format!("{}/{}", METADATA_PATH, key)))
            .header(METADATA_FLAVOR_HEADER, METADATA_FLAVOR_VALUE);

        self.client.fetch_optional_text(request).await
    }

    async fn ssh_keys(&self) -> Result<Vec<String>, MetadataError> {
        let mut keys = Vec::new();

        if let Some(instance_keys) = self.get("instance/attributes/ssh-keys").await? {
            keys.extend(parse_ssh_keys(&instance_keys));
        }

        let block_project = self
            .get("instance/attributes/block-project-ssh-keys")
            .await?
            .is_some_and(|v| v.trim() == "true");

        if block_project {
            debug!("project ssh keys blocked for this instance");
        } else if let Some(project_keys) = self.get("project/attributes/ssh-keys").await? {
            keys.extend(parse_ssh_keys(&project_keys));
        }

        Ok(keys)
    }
}

#[async_trait]
impl MetadataProvider for Gce {
    async fn fetch_metadata(&self) -> Result<Metadata, MetadataError> {
        let mut attributes = BTreeMap::new();
        for (name, key) in ATTRIBUTES {
            let value = self.get(key).await?.unwrap_or_default();
            attributes.insert(name.to_string(), value.trim().to_string());
        }

        let keys = self.ssh_keys().await?;
        Ok(Metadata::new(attributes, Some(keys)))
    }
}

/// Keys from an `ssh-keys` attribute: one `user:key` entry per line.
fn parse_ssh_keys(value: &str) -> impl Iterator<Item = String> + '_ {
    value
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| match line.split_once(':') {
            Some((_user, key)) => key.to_string(),
            None => line.to_string(),
        })
}
