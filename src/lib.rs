//! # rdo (RootDO)
//!
//! A minimal `sudo`/`doas` replacement. An unprivileged caller asks to run a
//! command as the superuser; `rdo` decides whether that is allowed and, if
//! so, becomes root and replaces itself with the command.
//!
//! ## Decision
//!
//! 1. A caller whose real uid is already 0 is launched immediately.
//! 2. `/etc/rdo.conf` is read and the caller's passwd entry resolved.
//! 3. A session recorded for the caller's parent process (its shell) within
//!    `session_ttl` minutes skips every further check.
//! 4. The caller must be an explicit member of the configured `group`.
//! 5. The caller gets three password attempts, `wrong_pw_sleep`
//!    milliseconds apart. Success records a session.
//!
//! Any rejection exits non-zero with a single line on standard error. There
//! is no partial elevation: either the command runs as root or nothing runs.
//!
//! ## Binary installation
//!
//! The binary must be owned by root and carry the set-user-id bit:
//!
//! ```text
//! chown root:root /usr/local/bin/rdo
//! chmod 4755 /usr/local/bin/rdo
//! ```

pub mod cli;
pub mod rdo;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_git_commit_hash_format() {
        if GIT_COMMIT_HASH == "unknown" {
            // Acceptable in non-git build environments
            return;
        }
        assert!(GIT_COMMIT_HASH.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
