//! Cloud provider enumeration.

use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Supported cloud providers.
///
/// The set is closed: adding a provider means adding a variant here and a
/// fetcher in [`crate::providers`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CloudProvider {
    /// Microsoft Azure
    Azure,
    /// Amazon EC2
    Ec2,
    /// Google Compute Engine
    Gce,
    /// Packet bare metal
    Packet,
}

impl CloudProvider {
    /// All providers, in identifier order.
    pub const ALL: [CloudProvider; 4] = [
        CloudProvider::Azure,
        CloudProvider::Ec2,
        CloudProvider::Gce,
        CloudProvider::Packet,
    ];

    /// The identifier accepted by `--provider` and `coreos.oem.id`.
    pub fn as_str(&self) -> &'static str {
        match self {
            CloudProvider::Azure => "azure",
            CloudProvider::Ec2 => "ec2",
            CloudProvider::Gce => "gce",
            CloudProvider::Packet => "packet",
        }
    }
}

impl fmt::Display for CloudProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CloudProvider {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CloudProvider::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| Error::InvalidProvider(s.to_string()))
    }
}
