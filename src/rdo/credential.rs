//! Password verification with a bounded number of attempts.
//!
//! ```text
//! Prompting --match--> Granted
//!     |  ^
//!   miss |  delay, "Wrong password."
//!     v  |
//! Delaying      (3rd miss) --> Exhausted
//! ```

use crate::rdo::{
    error::{Error, Result},
    identity::Identity,
    prompt::{Secret, SecretPrompt},
};
use std::{io::Write, thread, time::Duration};
use tracing::{debug, warn};

pub const MAX_ATTEMPTS: u8 = 3;

pub const WRONG_PASSWORD: &str = "Wrong password.";

/// The stored credential of one identity.
pub trait CredentialStore {
    /// Compare `secret` against the stored credential.
    ///
    /// # Errors
    /// Returns an error if the comparison itself could not be performed.
    fn matches(&self, secret: &Secret) -> Result<bool>;
}

/// Finds the stored credential for an identity.
pub trait CredentialSource {
    /// # Errors
    /// [`Error::NoStoredCredential`] when the identity has no usable
    /// credential, or a lookup error.
    fn for_user(&self, identity: &Identity) -> Result<Box<dyn CredentialStore>>;
}

pub trait Sleeper {
    fn sleep(&mut self, duration: Duration);
}

#[derive(Clone, Copy, Debug, Default)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&mut self, duration: Duration) {
        thread::sleep(duration);
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum State {
    Prompting,
    Delaying,
    Granted,
    Exhausted,
}

pub struct CredentialVerifier<'a> {
    prompt: &'a mut dyn SecretPrompt,
    store: &'a dyn CredentialStore,
    sleeper: &'a mut dyn Sleeper,
    notices: &'a mut dyn Write,
    delay: Duration,
}

impl<'a> CredentialVerifier<'a> {
    pub fn new(
        prompt: &'a mut dyn SecretPrompt,
        store: &'a dyn CredentialStore,
        sleeper: &'a mut dyn Sleeper,
        notices: &'a mut dyn Write,
        delay: Duration,
    ) -> Self {
        Self {
            prompt,
            store,
            sleeper,
            notices,
            delay,
        }
    }

    /// Drive the state machine to a terminal state.
    ///
    /// Returns the number of prompts it took to get the right secret.
    ///
    /// # Errors
    /// [`Error::TooManyAttempts`] after the last wrong attempt; prompt and
    /// comparison failures are returned immediately and never counted.
    pub fn run(self) -> Result<u8> {
        let mut failures: u8 = 0;
        let mut state = State::Prompting;

        loop {
            state = match state {
                State::Prompting => {
                    let secret = self.prompt.read_secret()?;
                    let matched = self.store.matches(&secret);
                    drop(secret);

                    if matched? {
                        State::Granted
                    } else {
                        failures += 1;
                        debug!(failures, "wrong password");
                        if failures >= MAX_ATTEMPTS {
                            State::Exhausted
                        } else {
                            State::Delaying
                        }
                    }
                }
                State::Delaying => {
                    self.sleeper.sleep(self.delay);
                    let _ = writeln!(self.notices, "{WRONG_PASSWORD}");
                    State::Prompting
                }
                State::Granted => return Ok(failures + 1),
                State::Exhausted => {
                    warn!(attempts = failures, "too many wrong password attempts");
                    return Err(Error::TooManyAttempts);
                }
            };
        }
    }
}
