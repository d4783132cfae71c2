use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("The rdo binary needs to be installed as SUID.")]
    NotSuid,
    #[error("Could not open {}: {err}", path.display())]
    ConfigRead {
        path: PathBuf,
        err: std::io::Error,
    },
    #[error("Could not get '{0}' entry in config")]
    ConfigMissing(&'static str),
    #[error("Invalid '{key}' entry in config: {reason}")]
    ConfigInvalid { key: &'static str, reason: String },
    #[error("The group '{0}' does not exist.")]
    GroupNotFound(String),
    #[error("Could not get group info: {0}")]
    GroupLookup(nix::Error),
    #[error("No user with UID {0}")]
    NoSuchUser(u32),
    #[error("Could not get user info: {0}")]
    UserLookup(nix::Error),
    #[error("You are not allowed to execute rdo.")]
    NotAllowed,
    #[error("Could not get passphrase: {0}")]
    Prompt(std::io::Error),
    #[error("Could not get shadow entry")]
    NoStoredCredential,
    #[error("Could not get shadow entry: {0}")]
    CredentialLookup(nix::Error),
    #[error("Could not hash password, does your user have a password?")]
    HashFailed,
    #[error("Too many wrong password attempts.")]
    TooManyAttempts,
    #[error("Could not {step}: {err}")]
    PrivilegeDrop {
        step: &'static str,
        err: nix::Error,
    },
    #[error("{program}: {err}")]
    Exec {
        program: String,
        err: nix::Error,
    },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_allowed_leaks_nothing() {
        assert_eq!(
            Error::NotAllowed.to_string(),
            "You are not allowed to execute rdo."
        );
    }

    #[test]
    fn exec_error_names_program_and_cause() {
        let err = Error::Exec {
            program: "nope".to_string(),
            err: nix::Error::ENOENT,
        };
        assert_eq!(err.to_string(), "nope: ENOENT: No such file or directory");
    }
}
