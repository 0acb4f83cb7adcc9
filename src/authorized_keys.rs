//! Per-user authorized keys store in the `authorized_keys.d` layout.
//!
//! The store itself is `update-ssh-keys`: it owns the lock, the import of a
//! pre-existing `authorized_keys`, disabled blocks and the regeneration of
//! `~/.ssh/authorized_keys`. This module adapts it to [`AuthorizedKeysStore`].

use std::path::PathBuf;

use tracing::debug;
use update_ssh_keys::AuthorizedKeys;
use users::User;

use crate::error::KeysError;

/// Write access to a user's named key blocks.
pub trait AuthorizedKeysStore {
    /// Add `keys` (one per line) as the block `name`.
    ///
    /// With `replace` an existing block of that name is overwritten; with
    /// `force` a block disabled by an administrator is re-enabled.
    fn add_keys(&mut self, name: &str, keys: &str, replace: bool, force: bool)
        -> Result<(), KeysError>;

    /// Persist the blocks and regenerate `authorized_keys`.
    fn sync(&mut self) -> Result<(), KeysError>;
}

/// Look up `name` in the system user database.
pub fn lookup_user(name: &str) -> Result<User, KeysError> {
    users::get_user_by_name(name).ok_or_else(|| KeysError::UnknownUser(name.to_string()))
}

/// An opened, locked `authorized_keys.d` directory.
///
/// The lock is held until the value is dropped.
pub struct AuthorizedKeysDir {
    inner: AuthorizedKeys,
}

impl AuthorizedKeysDir {
    /// Open the store under `user`'s home directory.
    pub fn open(user: User, create: bool) -> Result<Self, KeysError> {
        Self::open_at(user, create, None)
    }

    /// Open the store in `ssh_dir` instead of `~/.ssh`.
    pub fn open_in(
        user: User,
        create: bool,
        ssh_dir: impl Into<PathBuf>,
    ) -> Result<Self, KeysError> {
        Self::open_at(user, create, Some(ssh_dir.into()))
    }

    fn open_at(user: User, create: bool, ssh_dir: Option<PathBuf>) -> Result<Self, KeysError> {
        debug!(user = ?user.name(), ?ssh_dir, "opening authorized keys directory");
        let inner = AuthorizedKeys::open(user, create, ssh_dir)
            .map_err(|e| KeysError::store("failed to open authorized keys directory", anyhow::Error::msg(e.to_string())))?;
        Ok(Self { inner })
    }
}

impl AuthorizedKeysStore for AuthorizedKeysDir {
    fn add_keys(
        &mut self,
        name: &str,
        keys: &str,
        replace: bool,
        force: bool,
    ) -> Result<(), KeysError> {
        let entries = AuthorizedKeys::read_keys(keys.as_bytes())
            .map_err(|e| KeysError::store("failed to read ssh keys", anyhow::Error::msg(e.to_string())))?;
        self.inner
            .add_keys(name, entries, replace, force)
            .map_err(|e| KeysError::store("failed to update authorized keys directory", anyhow::Error::msg(e.to_string())))?;
        Ok(())
    }

    fn sync(&mut self) -> Result<(), KeysError> {
        self.inner
            .write()
            .map_err(|e| KeysError::store("failed to write authorized keys directory", anyhow::Error::msg(e.to_string())))?;
        self.inner
            .sync()
            .map_err(|e| KeysError::store("failed to update authorized keys", anyhow::Error::msg(e.to_string())))
    }
}
