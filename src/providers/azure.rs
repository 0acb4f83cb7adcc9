//! Azure IMDS metadata implementation.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::Deserialize;

use super::MetadataProvider;
use crate::client::MetadataClient;
use crate::error::MetadataError;
use crate::metadata::Metadata;

/// Azure instance network endpoint path.
const NETWORK_PATH: &str = "/metadata/instance/network";

/// API version query parameter.
const API_VERSION: &str = "2021-02-01";

/// Required header for Azure metadata requests.
const METADATA_HEADER: &str = "Metadata";

/// Required header value for Azure metadata requests.
const METADATA_VALUE: &str = "true";

#[derive(Debug, Deserialize)]
struct Network {
    #[serde(default)]
    interface: Vec<Interface>,
}

#[derive(Debug, Deserialize)]
struct Interface {
    ipv4: Option<Ipv4>,
}

#[derive(Debug, Deserialize)]
struct Ipv4 {
    #[serde(rename = "ipAddress", default)]
    ip_address: Vec<IpAddress>,
}

#[derive(Debug, Deserialize)]
struct IpAddress {
    #[serde(rename = "privateIpAddress", default)]
    private: String,
    #[serde(rename = "publicIpAddress", default)]
    public: String,
}

/// Microsoft Azure fetcher.
///
/// Azure does not publish SSH keys through this service, so the returned
/// metadata never carries keys.
#[derive(Debug, Clone)]
pub struct Azure {
    client: MetadataClient,
}

impl Azure {
    pub fn new(client: MetadataClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl MetadataProvider for Azure {
    async fn fetch_metadata(&self) -> Result<Metadata, MetadataError> {
        let request = self
            .client
            .inner()
            .get(self.client.url(NETWORK_PATH))
            .query(&[("api-version", API_VERSION)])
            .header(METADATA_HEADER, METADATA_VALUE);

        let body = self.client.fetch(request).await?;
        let network: Network = serde_json::from_slice(&body)?;

        Ok(Metadata::new(attributes(&network), None))
    }
}

fn attributes(network: &Network) -> BTreeMap<String, String> {
    let address = network
        .interface
        .iter()
        .filter_map(|iface| iface.ipv4.as_ref())
        .find_map(|ipv4| ipv4.ip_address.first());

    let (dynamic, virtual_ip) = match address {
        Some(addr) => (addr.private.clone(), addr.public.clone()),
        None => Default::default(),
    };

    BTreeMap::from([
        ("AZURE_IPV4_DYNAMIC".to_string(), dynamic),
        ("AZURE_IPV4_VIRTUAL".to_string(), virtual_ip),
    ])
}
