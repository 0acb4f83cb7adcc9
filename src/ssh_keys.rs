//! SSH key installation into a user's authorized keys store.

use tracing::{debug, info};

use crate::authorized_keys::{lookup_user, AuthorizedKeysDir, AuthorizedKeysStore};
use crate::error::KeysError;
use crate::metadata::Metadata;

/// Name of the key block owned by this tool.
pub const KEYS_BLOCK_NAME: &str = "coreos-metadata";

/// Install `metadata`'s SSH keys for `username`.
///
/// Does nothing if `username` is `None` or the provider supplied no keys.
/// An empty key list still replaces the block, clearing keys from earlier runs.
pub fn write_ssh_keys(username: Option<&str>, metadata: &Metadata) -> Result<(), KeysError> {
    install_ssh_keys(username, metadata, open_user_store)
}

/// Look up `username` and open their store, creating it if needed.
pub fn open_user_store(username: &str) -> Result<AuthorizedKeysDir, KeysError> {
    let user = lookup_user(username)?;
    AuthorizedKeysDir::open(user, true)
}

/// Install keys through a store obtained from `open`.
///
/// `open` is only called when there is something to install.
pub fn install_ssh_keys<S, F>(
    username: Option<&str>,
    metadata: &Metadata,
    open: F,
) -> Result<(), KeysError>
where
    S: AuthorizedKeysStore,
    F: FnOnce(&str) -> Result<S, KeysError>,
{
    let Some(username) = username else {
        return Ok(());
    };
    let Some(keys) = metadata.ssh_keys() else {
        debug!("provider supplies no ssh keys");
        return Ok(());
    };

    let mut store = open(username)?;
    store.add_keys(KEYS_BLOCK_NAME, &keys.join("\n"), true, true)?;
    store.sync()?;

    info!(user = username, keys = keys.len(), "installed ssh keys");
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::collections::BTreeMap;

    use super::*;

    #[derive(Debug, Default)]
    struct Recorded {
        opened: Vec<String>,
        blocks: BTreeMap<String, String>,
        syncs: usize,
    }

    struct RecordingStore<'a>(&'a RefCell<Recorded>);

    impl AuthorizedKeysStore for RecordingStore<'_> {
        fn add_keys(
            &mut self,
            name: &str,
            keys: &str,
            replace: bool,
            force: bool,
        ) -> Result<(), KeysError> {
            assert!(replace && force);
            self.0
                .borrow_mut()
                .blocks
                .insert(name.to_string(), keys.to_string());
            Ok(())
        }

        fn sync(&mut self) -> Result<(), KeysError> {
            self.0.borrow_mut().syncs += 1;
            Ok(())
        }
    }

    fn install(
        recorded: &RefCell<Recorded>,
        username: Option<&str>,
        metadata: &Metadata,
    ) -> Result<(), KeysError> {
        install_ssh_keys(username, metadata, |name| {
            recorded.borrow_mut().opened.push(name.to_string());
            Ok(RecordingStore(recorded))
        })
    }

    fn with_keys(keys: Option<&[&str]>) -> Metadata {
        Metadata::new(
            BTreeMap::new(),
            keys.map(|k| k.iter().map(|s| s.to_string()).collect()),
        )
    }

    #[test]
    fn test_absent_keys_touch_nothing() {
        let recorded = RefCell::default();
        install(&recorded, Some("core"), &with_keys(None)).unwrap();

        let recorded = recorded.into_inner();
        assert!(recorded.opened.is_empty());
        assert_eq!(recorded.syncs, 0);
    }

    #[test]
    fn test_no_user_touches_nothing() {
        let recorded = RefCell::default();
        install(&recorded, None, &with_keys(Some(&["ssh-rsa A"]))).unwrap();

        assert!(recorded.into_inner().opened.is_empty());
    }

    #[test]
    fn test_empty_list_clears_block() {
        let recorded = RefCell::default();
        install(&recorded, Some("core"), &with_keys(Some(&[]))).unwrap();

        let recorded = recorded.into_inner();
        assert_eq!(recorded.opened, ["core"]);
        assert_eq!(recorded.blocks[KEYS_BLOCK_NAME], "");
        assert_eq!(recorded.syncs, 1);
    }

    #[test]
    fn test_keys_joined_with_newlines() {
        let recorded = RefCell::default();
        let metadata = with_keys(Some(&["ssh-rsa A one", "ssh-ed25519 B two"]));
        install(&recorded, Some("core"), &metadata).unwrap();

        assert_eq!(
            recorded.into_inner().blocks[KEYS_BLOCK_NAME],
            "ssh-rsa A one\nssh-ed25519 B two"
        );
    }

    #[test]
    fn test_open_failure_propagates() {
        let result = install_ssh_keys(
            Some("ghost"),
            &with_keys(Some(&["ssh-rsa A"])),
            |name| -> Result<RecordingStore<'static>, _> {
                Err(KeysError::UnknownUser(name.to_string()))
            },
        );

        assert!(matches!(result, Err(KeysError::UnknownUser(ref n)) if n == "ghost"));
    }

    #[test]
    fn test_idempotent_on_real_store() {
        let home = tempfile::tempdir().unwrap();
        let ssh_dir = home.path().join(".ssh");
        let user = users::get_user_by_uid(users::get_current_uid()).unwrap();
        let metadata = with_keys(Some(&[
            "ssh-ed25519 AAAAC3NzaC1lZDI1NTE5AAAAIOMqqnkVzrm0SdG6UOoqKLsabgH5C9okWi0dh2l9GKJl key1",
            "ssh-ed25519 AAAAC3NzaC1lZDI1NTE5AAAAIOMqqnjVzrm0SdG6UOoqKLsabgH5C9okWi0dh2l9GKJl key2",
        ]));
        let block = ssh_dir.join("authorized_keys.d").join(KEYS_BLOCK_NAME);
        let authorized = ssh_dir.join("authorized_keys");

        install_ssh_keys(Some("core"), &metadata, |_| {
            AuthorizedKeysDir::open_in(user.clone(), true, &ssh_dir)
        })
        .unwrap();
        let first_block = std::fs::read_to_string(&block).unwrap();
        let first_authorized = std::fs::read_to_string(&authorized).unwrap();

        install_ssh_keys(Some("core"), &metadata, |_| {
            AuthorizedKeysDir::open_in(user.clone(), true, &ssh_dir)
        })
        .unwrap();

        assert_eq!(std::fs::read_to_string(&block).unwrap(), first_block);
        assert_eq!(std::fs::read_to_string(&authorized).unwrap(), first_authorized);
        assert_eq!(first_authorized.matches("key1").count(), 1);
        assert_eq!(first_authorized.matches("key2").count(), 1);
    }
}
