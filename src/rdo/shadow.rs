//! Shadow database lookup and `crypt(3)` comparison.

use crate::rdo::{
    credential::{CredentialSource, CredentialStore},
    error::{Error, Result},
    identity::Identity,
    prompt::Secret,
};
use libc::{c_char, c_int, size_t, spwd};
use nix::errno::Errno;
use secrecy::{zeroize::Zeroizing, ExposeSecret, SecretBox};
use std::{
    ffi::{CStr, CString},
    mem::MaybeUninit,
    ptr,
};
use tracing::debug;

#[link(name = "crypt")]
extern "C" {
    fn crypt(key: *const c_char, salt: *const c_char) -> *mut c_char;
}

const INITIAL_BUFFER: usize = 1024;
const MAX_BUFFER: usize = 1024 * 1024;

/// Looks up entries in `/etc/shadow`; needs an effective uid of 0.
#[derive(Clone, Copy, Debug, Default)]
pub struct ShadowDatabase;

impl CredentialSource for ShadowDatabase {
    fn for_user(&self, identity: &Identity) -> Result<Box<dyn CredentialStore>> {
        Ok(Box::new(ShadowCredential::lookup(&identity.name)?))
    }
}

/// A stored password hash, kept as raw bytes. Zeroized on drop.
pub struct ShadowCredential {
    hash: Secret,
}

impl ShadowCredential {
    /// # Errors
    /// [`Error::NoStoredCredential`] when the user has no shadow entry or an
    /// empty hash, [`Error::CredentialLookup`] when the database could not
    /// be read.
    pub fn lookup(name: &str) -> Result<Self> {
        let name = CString::new(name).map_err(|_| Error::NoStoredCredential)?;
        let hash = getspnam(&name)?.ok_or(Error::NoStoredCredential)?;
        Self::from_hash(hash)
    }

    /// # Errors
    /// [`Error::NoStoredCredential`] for an empty hash.
    pub fn from_hash(hash: Secret) -> Result<Self> {
        if hash.expose_secret().is_empty() {
            return Err(Error::NoStoredCredential);
        }
        Ok(Self { hash })
    }
}

impl CredentialStore for ShadowCredential {
    fn matches(&self, secret: &Secret) -> Result<bool> {
        let stored = self.hash.expose_secret().as_slice();

        let Some(key) = nul_terminated(secret.expose_secret()) else {
            // cannot be passed to crypt(3) and cannot be anybody's password
            return Ok(false);
        };
        let salt = nul_terminated(stored).ok_or(Error::HashFailed)?;

        // SAFETY: both pointers reference NUL-terminated buffers that outlive
        // the call; the result points into libcrypt's static storage and is
        // copied before any other crypt call.
        let computed = unsafe {
            let out = crypt(key.as_ptr().cast(), salt.as_ptr().cast());
            if out.is_null() {
                return Err(Error::HashFailed);
            }
            Zeroizing::new(CStr::from_ptr(out).to_bytes().to_vec())
        };

        // libxcrypt reports failures with a token starting with '*'
        if computed.first() == Some(&b'*') {
            debug!("crypt returned a failure token");
            return Err(Error::HashFailed);
        }

        Ok(constant_time_eq(stored, &computed))
    }
}

/// Zeroizing C string copy of `bytes`; `None` on an interior NUL.
fn nul_terminated(bytes: &[u8]) -> Option<Zeroizing<Vec<u8>>> {
    if bytes.contains(&0) {
        return None;
    }
    let mut out = Zeroizing::new(Vec::with_capacity(bytes.len() + 1));
    out.extend_from_slice(bytes);
    out.push(0);
    Some(out)
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0_u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Reentrant `getspnam`, growing the buffer on `ERANGE`.
fn getspnam(name: &CStr) -> Result<Option<Secret>> {
    let mut size = INITIAL_BUFFER;

    loop {
        let mut buf = Zeroizing::new(vec![0 as c_char; size]);
        let mut entry = MaybeUninit::<spwd>::zeroed();
        let mut result: *mut spwd = ptr::null_mut();

        // SAFETY: every pointer is valid for the duration of the call and
        // `buf.len()` is the real size of `buf`.
        let rc: c_int = unsafe {
            libc::getspnam_r(
                name.as_ptr(),
                entry.as_mut_ptr(),
                buf.as_mut_ptr(),
                buf.len() as size_t,
                &mut result,
            )
        };

        if rc == libc::ERANGE && size < MAX_BUFFER {
            size *= 2;
            continue;
        }

        if result.is_null() {
            return match rc {
                0 | libc::ENOENT => Ok(None),
                errno => Err(Error::CredentialLookup(Errno::from_i32(errno))),
            };
        }

        // SAFETY: a non-null result points at `entry`, whose string fields
        // point into `buf`, which is still alive here.
        let hash = unsafe {
            let pwdp = (*result).sp_pwdp;
            if pwdp.is_null() {
                return Ok(None);
            }
            CStr::from_ptr(pwdp)
        };

        return Ok(Some(SecretBox::new(Box::new(hash.to_bytes().to_vec()))));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // "hunter2" hashed with SHA-512 crypt and the salt "saltsalt"
    const HUNTER2: &str =
        "$6$saltsalt$8iYtNHxjWRl.NF6oNZ5tF.iKFlQREaXBLlSmZKP6dy9l5z3vsooWNW0/GZ6Nej73/TFug6pIPSqbJoCT6dfnj.";

    // Latin-1 "caf\xe9", not valid UTF-8, same salt
    const CAFE_LATIN1: &str =
        "$6$saltsalt$Gg0KmiEZJ4rV7.SikS9wousUoEPNjAZTJYsCGXAGaV0VLq3zs1LHVdQpxV5KtFlPDqKca21YndFAuXNQKq9xD1";

    fn secret(bytes: &[u8]) -> Secret {
        SecretBox::new(Box::new(bytes.to_vec()))
    }

    fn credential(hash: &str) -> ShadowCredential {
        ShadowCredential::from_hash(secret(hash.as_bytes())).unwrap()
    }

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq(b"abc", b"abc"));
        assert!(!constant_time_eq(b"abc", b"abd"));
        assert!(!constant_time_eq(b"abc", b"abcd"));
        assert!(constant_time_eq(b"", b""));
    }

    #[test]
    fn test_nul_terminated() {
        assert_eq!(nul_terminated(b"abc").unwrap().as_slice(), b"abc\0");
        assert!(nul_terminated(b"a\0c").is_none());
    }

    #[test]
    fn test_empty_hash_is_no_credential() {
        assert!(matches!(
            ShadowCredential::from_hash(secret(b"")),
            Err(Error::NoStoredCredential)
        ));
    }

    #[test]
    fn test_crypt_round_trip() {
        let cred = credential(HUNTER2);
        assert!(cred.matches(&secret(b"hunter2")).unwrap());
        assert!(!cred.matches(&secret(b"hunter3")).unwrap());
    }

    #[test]
    fn test_non_utf8_password() {
        let cred = credential(CAFE_LATIN1);
        assert!(cred.matches(&secret(b"caf\xe9")).unwrap());
        assert!(!cred.matches(&secret("café".as_bytes())).unwrap());
    }

    #[test]
    fn test_interior_nul_never_matches() {
        let cred = credential(HUNTER2);
        assert!(!cred.matches(&secret(b"hunter2\0")).unwrap());
    }

    #[test]
    fn test_locked_account_fails_to_hash() {
        let cred = credential("!");
        assert!(matches!(
            cred.matches(&secret(b"hunter2")),
            Err(Error::HashFailed)
        ));
    }

    #[test]
    fn test_unknown_user_has_no_entry() {
        // unprivileged test runs may not be able to read /etc/shadow at all
        match ShadowCredential::lookup("rdo-test-user-that-does-not-exist") {
            Err(Error::NoStoredCredential | Error::CredentialLookup(_)) => {}
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("unexpected shadow entry"),
        }
    }
}
