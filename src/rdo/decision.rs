//! The elevation decision.
//!
//! Each step either produces a terminal outcome or hands over to the next:
//! superuser caller, session bypass, group check, password check. A valid
//! session skips both the group and the password check; membership is not
//! re-verified until the session expires.

use crate::rdo::{
    config::{ConfigSource, EnvPolicy},
    credential::{CredentialSource, CredentialVerifier, Sleeper},
    error::{Error, Result},
    group::{GroupAuthorizer, GroupDatabase},
    identity::UserDatabase,
    prompt::SecretPrompt,
    session::SessionStore,
};
use nix::unistd::{Pid, Uid};
use std::io::Write;
use tracing::{debug, info, warn};

/// Who is asking, as reported by the kernel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Invocation {
    pub real_uid: Uid,
    pub effective_uid: Uid,
    /// Parent process, normally the caller's shell; scopes the session.
    pub parent: Pid,
}

/// Why elevation was granted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Grant {
    /// The caller already is the superuser.
    Superuser,
    /// A recent verification from the same parent is still valid.
    Session,
    /// The password was entered correctly after `attempts` prompts.
    Verified { attempts: u8 },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Decision {
    pub grant: Grant,
    pub env_policy: EnvPolicy,
}

/// Everything the decision talks to.
pub struct Authority<'a> {
    pub config: &'a dyn ConfigSource,
    pub users: &'a dyn UserDatabase,
    pub groups: &'a dyn GroupDatabase,
    pub sessions: &'a dyn SessionStore,
    pub credentials: &'a dyn CredentialSource,
    pub prompt: &'a mut dyn SecretPrompt,
    pub sleeper: &'a mut dyn Sleeper,
    pub notices: &'a mut dyn Write,
}

impl Authority<'_> {
    /// Decide whether `invocation` may run a command as the superuser.
    ///
    /// # Errors
    /// Every rejection and every failure is an error; there is no
    /// "denied" value.
    pub fn decide(&mut self, invocation: &Invocation) -> Result<Decision> {
        if !invocation.effective_uid.is_root() {
            return Err(Error::NotSuid);
        }

        if invocation.real_uid.is_root() {
            debug!("caller is already the superuser");
            return Ok(Decision {
                grant: Grant::Superuser,
                env_policy: EnvPolicy::default(),
            });
        }

        let config = self.config.load()?;
        let identity = self.users.by_uid(invocation.real_uid)?;

        if self
            .sessions
            .check(invocation.parent, config.session_ttl, identity.uid)
        {
            info!(user = %identity.name, parent = %invocation.parent, "valid session, skipping authentication");
            return Ok(Decision {
                grant: Grant::Session,
                env_policy: config.env_policy,
            });
        }

        GroupAuthorizer::new(self.groups, &config.group).authorize(&identity)?;

        let store = self.credentials.for_user(&identity)?;
        let attempts = CredentialVerifier::new(
            &mut *self.prompt,
            store.as_ref(),
            &mut *self.sleeper,
            &mut *self.notices,
            config.wrong_pw_sleep,
        )
        .run()?;
        drop(store);

        info!(user = %identity.name, attempts, "authenticated");

        if let Err(e) = self
            .sessions
            .record(invocation.parent, config.session_ttl, identity.uid)
        {
            warn!("could not record session: {e}");
        }

        Ok(Decision {
            grant: Grant::Verified { attempts },
            env_policy: config.env_policy,
        })
    }
}
