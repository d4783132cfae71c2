//! Authorization group membership.
//!
//! Only explicit membership in the group database entry counts. The
//! caller's primary group from the password database is not consulted.

use crate::rdo::{
    error::{Error, Result},
    identity::Identity,
};
use nix::unistd::Group;
use tracing::{debug, warn};

/// One-shot lookup of a group's member names by group name.
pub trait GroupDatabase {
    /// `Ok(None)` when no group has that name.
    ///
    /// # Errors
    /// Returns an error if the group database could not be read.
    fn members(&self, group: &str) -> Result<Option<Vec<String>>>;
}

/// The system group database (`getgrnam_r`).
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemGroups;

impl GroupDatabase for SystemGroups {
    fn members(&self, group: &str) -> Result<Option<Vec<String>>> {
        Group::from_name(group)
            .map(|entry| entry.map(|g| g.mem))
            .map_err(Error::GroupLookup)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GroupDecision {
    Authorized,
    NotMember,
    GroupNotFound,
}

pub struct GroupAuthorizer<'a, D: GroupDatabase + ?Sized> {
    db: &'a D,
    group: &'a str,
}

impl<'a, D: GroupDatabase + ?Sized> GroupAuthorizer<'a, D> {
    pub fn new(db: &'a D, group: &'a str) -> Self {
        Self { db, group }
    }

    /// # Errors
    /// Returns an error only if the group database could not be read.
    pub fn decide(&self, identity: &Identity) -> Result<GroupDecision> {
        let Some(members) = self.db.members(self.group)? else {
            return Ok(GroupDecision::GroupNotFound);
        };

        if members.iter().any(|member| *member == identity.name) {
            Ok(GroupDecision::Authorized)
        } else {
            Ok(GroupDecision::NotMember)
        }
    }

    /// Like [`GroupAuthorizer::decide`] but every outcome other than
    /// `Authorized` is turned into its fatal error.
    ///
    /// # Errors
    /// [`Error::GroupNotFound`] for a misconfigured group, [`Error::NotAllowed`]
    /// when the caller is not a member.
    pub fn authorize(&self, identity: &Identity) -> Result<()> {
        match self.decide(identity)? {
            GroupDecision::Authorized => {
                debug!(user = %identity.name, group = %self.group, "group membership confirmed");
                Ok(())
            }
            GroupDecision::NotMember => {
                warn!(user = %identity.name, group = %self.group, "user is not a group member");
                Err(Error::NotAllowed)
            }
            GroupDecision::GroupNotFound => Err(Error::GroupNotFound(self.group.to_string())),
        }
    }
}
