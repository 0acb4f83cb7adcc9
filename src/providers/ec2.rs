//! EC2 IMDSv2 metadata implementation.

use std::collections::BTreeMap;

use async_trait::async_trait;
use tracing::debug;

use super::MetadataProvider;
use crate::client::MetadataClient;
use crate::error::MetadataError;
use crate::metadata::Metadata;

/// IMDSv2 token endpoint path.
const TOKEN_PATH: &str = "/latest/api/token";

/// Instance metadata tree.
const METADATA_PATH: &str = "/latest/meta-data";

/// Token TTL header name.
const TOKEN_TTL_HEADER: &str = "X-aws-ec2-metadata-token-ttl-seconds";

/// Token header name for requests.
const TOKEN_HEADER: &str = "X-aws-ec2-metadata-token";

/// Attribute name and the metadata path it is read from.
const ATTRIBUTES: &[(&str, &str)] = &[
    ("EC2_INSTANCE_ID", "instance-id"),
    ("EC2_INSTANCE_TYPE", "instance-type"),
    ("EC2_IPV4_LOCAL", "local-ipv4"),
    ("EC2_IPV4_PUBLIC", "public-ipv4"),
    ("EC2_AVAILABILITY_ZONE", "placement/availability-zone"),
    ("EC2_HOSTNAME", "hostname"),
    ("EC2_PUBLIC_HOSTNAME", "public-hostname"),
];

/// Amazon EC2 fetcher.
#[derive(Debug, Clone)]
pub struct Ec2 {
    client: MetadataClient,
}

impl Ec2 {
    pub fn new(client: MetadataClient) -> Self {
        Self { client }
    }

    /// Get an IMDSv2 session token.
    async fn get_token(&self) -> Result<String, MetadataError> {
        let request = self
            .client
            .inner()
            .put(self.client.url(TOKEN_PATH))
            .header(TOKEN_TTL_HEADER, "60");

        let token = self.client.fetch(request).await?;
        String::from_utf8(token).map_err(|_| MetadataError::Utf8)
    }

    /// Read one metadata entry; a missing entry is `None`.
    async fn get(&self, token: &str, key: &str) -> Result<Option<String>, MetadataError> {
        let request = self
            .client
            .inner()
            .get(self.client.url(&format!("{}/{}", METADATA_PATH, key)))
            .header(TOKEN_HEADER, token);

        let value = self.client.fetch_optional_text(request).await?;
        Ok(value.map(|v| v.trim().to_string()))
    }

    async fn ssh_keys(&self, token: &str) -> Result<Vec<String>, MetadataError> {
        let Some(listing) = self.get(token, "public-keys").await? else {
            debug!("no public keys advertised");
            return Ok(Vec::new());
        };

        let mut keys = Vec::new();
        for index in parse_key_indices(&listing) {
            let path = format!("public-keys/{}/openssh-key", index);
            if let Some(key) = self.get(token, &path).await? {
                keys.push(key);
            }
        }
        Ok(keys)
    }
}

#[async_trait]
impl MetadataProvider for Ec2 {
    async fn fetch_metadata(&self) -> Result<Metadata, MetadataError> {
        let token = self.get_token().await?;

        let mut attributes = BTreeMap::new();
        for (name, key) in ATTRIBUTES {
            let value = self.get(&token, key).await?.unwrap_or_default();
            attributes.insert(name.to_string(), value);
        }

        let region = region_from_zone(&attributes["EC2_AVAILABILITY_ZONE"]).to_string();
        attributes.insert("EC2_REGION".to_string(), region);

        let keys = self.ssh_keys(&token).await?;
        Ok(Metadata::new(attributes, Some(keys)))
    }
}

/// Region of an availability zone: `us-east-1a` is in `us-east-1`.
fn region_from_zone(zone: &str) -> &str {
    zone.strip_suffix(|c: char| c.is_ascii_alphabetic())
        .unwrap_or(zone)
}

/// Indices from a `public-keys` listing of `<index>=<name>` lines.
fn parse_key_indices(listing: &str) -> Vec<&str> {
    listing
        .lines()
        .filter_map(|line| line.split_once('=').map(|(index, _)| index.trim()))
        .filter(|index| !index.is_empty())
        .collect()
}
