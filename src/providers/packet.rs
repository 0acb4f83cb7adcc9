//! Packet metadata implementation.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::Deserialize;

use super::MetadataProvider;
use crate::client::MetadataClient;
use crate::error::MetadataError;
use crate::metadata::Metadata;

/// Packet metadata service base URL.
pub const DEFAULT_BASE_URL: &str = "https://metadata.packet.net";

/// Metadata document path.
const METADATA_PATH: &str = "/metadata";

#[derive(Debug, Deserialize)]
struct PacketMetadata {
    hostname: Option<String>,
    phone_home_url: Option<String>,
    #[serde(default)]
    network: PacketNetwork,
    ssh_keys: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
struct PacketNetwork {
    #[serde(default)]
    addresses: Vec<PacketAddress>,
}

#[derive(Debug, Deserialize)]
struct PacketAddress {
    address_family: u8,
    public: bool,
    address: String,
}

/// Packet bare metal fetcher.
#[derive(Debug, Clone)]
pub struct Packet {
    client: MetadataClient,
}

impl Packet {
    pub fn new(client: MetadataClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl MetadataProvider for Packet {
    async fn fetch_metadata(&self) -> Result<Metadata, MetadataError> {
        let request = self.client.inner().get(self.client.url(METADATA_PATH));
        let body = self.client.fetch(request).await?;
        let data: PacketMetadata = serde_json::from_slice(&body)?;

        let attributes = attributes(&data);
        Ok(Metadata::new(
            attributes,
            Some(data.ssh_keys.unwrap_or_default()),
        ))
    }
}

fn attributes(data: &PacketMetadata) -> BTreeMap<String, String> {
    let mut attributes = BTreeMap::from([
        (
            "PACKET_HOSTNAME".to_string(),
            data.hostname.clone().unwrap_or_default(),
        ),
        (
            "PACKET_PHONE_HOME_URL".to_string(),
            data.phone_home_url.clone().unwrap_or_default(),
        ),
    ]);

    // Addresses are numbered per family and scope in document order.
    let mut counters: BTreeMap<&str, usize> = BTreeMap::new();
    for addr in &data.network.addresses {
        let kind = match (addr.address_family, addr.public) {
            (4, true) => "IPV4_PUBLIC",
            (4, false) => "IPV4_PRIVATE",
            (6, true) => "IPV6_PUBLIC",
            (6, false) => "IPV6_PRIVATE",
            _ => continue,
        };
        let index = counters.entry(kind).or_default();
        attributes.insert(format!("PACKET_{}_{}", kind, index), addr.address.clone());
        *index += 1;
    }

    attributes
}
