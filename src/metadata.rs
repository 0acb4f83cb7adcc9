//! The metadata value produced by a provider fetch.

use std::collections::BTreeMap;

/// Attributes and SSH keys retrieved from a provider for the running instance.
///
/// `ssh_keys` distinguishes a provider that does not supply keys at all
/// (`None`) from one that supplies an empty list (`Some(vec![])`). Only the
/// former suppresses key installation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metadata {
    attributes: BTreeMap<String, String>,
    ssh_keys: Option<Vec<String>>,
}

impl Metadata {
    /// Create metadata from an attribute map and an optional key list.
    pub fn new(attributes: BTreeMap<String, String>, ssh_keys: Option<Vec<String>>) -> Self {
        Self {
            attributes,
            ssh_keys,
        }
    }

    /// Attribute name to value, ordered by name. Values may be empty.
    pub fn attributes(&self) -> &BTreeMap<String, String> {
        &self.attributes
    }

    /// SSH public key lines, or `None` if the provider does not supply keys.
    pub fn ssh_keys(&self) -> Option<&[String]> {
        self.ssh_keys.as_deref()
    }
}

impl<K, V> FromIterator<(K, V)> for Metadata
where
    K: Into<String>,
    V: Into<String>,
{
    /// Collect attributes into metadata without SSH keys.
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::new(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            None,
        )
    }
}
