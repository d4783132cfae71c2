use crate::rdo::error::{Error, Result};
use nix::unistd::{Gid, Uid, User};
use std::path::PathBuf;

/// The real (non-elevated) user invoking rdo, or the superuser target.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Identity {
    pub uid: Uid,
    pub gid: Gid,
    pub name: String,
    pub home: PathBuf,
    pub shell: PathBuf,
}

impl Identity {
    /// Resolve the password database entry for `uid`.
    ///
    /// # Errors
    /// [`Error::NoSuchUser`] when no account matches, [`Error::UserLookup`]
    /// when the database itself could not be read.
    pub fn resolve(uid: Uid) -> Result<Self> {
        match User::from_uid(uid) {
            Ok(Some(user)) => Ok(Self::from(user)),
            Ok(None) => Err(Error::NoSuchUser(uid.as_raw())),
            Err(e) => Err(Error::UserLookup(e)),
        }
    }

    /// The superuser entry that commands are launched as.
    ///
    /// # Errors
    /// Same as [`Identity::resolve`].
    pub fn superuser() -> Result<Self> {
        Self::resolve(Uid::from_raw(0))
    }
}

/// Password database lookups by uid.
pub trait UserDatabase {
    /// # Errors
    /// Same as [`Identity::resolve`].
    fn by_uid(&self, uid: Uid) -> Result<Identity>;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SystemUsers;

impl UserDatabase for SystemUsers {
    fn by_uid(&self, uid: Uid) -> Result<Identity> {
        Identity::resolve(uid)
    }
}

impl From<User> for Identity {
    fn from(user: User) -> Self {
        Self {
            uid: user.uid,
            gid: user.gid,
            name: user.name,
            home: user.dir,
            shell: user.shell,
        }
    }
}
