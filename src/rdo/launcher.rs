use crate::rdo::{
    config::EnvPolicy,
    error::{Error, Result},
    identity::Identity,
};
use nix::{
    errno::Errno,
    unistd::{execvp, initgroups, setgid, setuid, Gid, Uid},
};
use std::{
    convert::Infallible,
    env,
    ffi::{CStr, CString, OsString},
    os::unix::ffi::OsStrExt,
};
use tracing::{debug, info};

/// `PATH` handed to commands when the environment is rebuilt.
pub const SECURE_PATH: &str = "/usr/local/sbin:/usr/local/bin:/usr/sbin:/usr/bin:/sbin:/bin";

/// Replaces the current process with the requested command.
pub trait Launcher {
    /// Only returns on failure.
    ///
    /// # Errors
    /// Returns an error if dropping to `target` or the exec itself fails.
    fn launch(&self, target: &Identity, argv: &[OsString], policy: EnvPolicy)
        -> Result<Infallible>;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct ExecLauncher;

impl Launcher for ExecLauncher {
    fn launch(
        &self,
        target: &Identity,
        argv: &[OsString],
        policy: EnvPolicy,
    ) -> Result<Infallible> {
        let (program, args) = command(argv)?;

        drop_to(target)?;
        apply_environment(target, policy);

        info!(program = %program_name(&program), uid = %target.uid, "executing");

        match execvp(&program, &args) {
            Ok(never) => match never {},
            Err(err) => Err(Error::Exec {
                program: program_name(&program),
                err,
            }),
        }
    }
}

/// The process credential calls [`drop_to`] is made of.
pub trait ProcessCredentials {
    /// # Errors
    /// Returns the errno of the failed call.
    fn initgroups(&mut self, user: &CStr, gid: Gid) -> nix::Result<()>;
    /// # Errors
    /// Returns the errno of the failed call.
    fn setgid(&mut self, gid: Gid) -> nix::Result<()>;
    /// # Errors
    /// Returns the errno of the failed call.
    fn setuid(&mut self, uid: Uid) -> nix::Result<()>;
}

/// The calling process itself.
#[derive(Clone, Copy, Debug, Default)]
pub struct CurrentProcess;

impl ProcessCredentials for CurrentProcess {
    fn initgroups(&mut self, user: &CStr, gid: Gid) -> nix::Result<()> {
        initgroups(user, gid)
    }

    fn setgid(&mut self, gid: Gid) -> nix::Result<()> {
        setgid(gid)
    }

    fn setuid(&mut self, uid: Uid) -> nix::Result<()> {
        setuid(uid)
    }
}

/// Become `target` with the current process credentials.
///
/// # Errors
/// Returns [`Error::PrivilegeDrop`] naming the step that failed.
pub fn drop_to(target: &Identity) -> Result<()> {
    drop_with(&mut CurrentProcess, target)
}

/// Supplementary groups, then gid, then uid. Stops at the first failure.
///
/// # Errors
/// Returns [`Error::PrivilegeDrop`] naming the step that failed.
pub fn drop_with(process: &mut dyn ProcessCredentials, target: &Identity) -> Result<()> {
    let name = CString::new(target.name.as_str()).map_err(|_| Error::PrivilegeDrop {
        step: "initgroups",
        err: Errno::EINVAL,
    })?;

    process
        .initgroups(&name, target.gid)
        .map_err(|err| Error::PrivilegeDrop {
            step: "initgroups",
            err,
        })?;
    process.setgid(target.gid).map_err(|err| Error::PrivilegeDrop {
        step: "setgid",
        err,
    })?;
    process.setuid(target.uid).map_err(|err| Error::PrivilegeDrop {
        step: "setuid",
        err,
    })?;

    debug!(uid = %target.uid, gid = %target.gid, "privileges set");

    Ok(())
}

fn program_name(program: &CStr) -> String {
    program.to_string_lossy().into_owned()
}

fn command(argv: &[OsString]) -> Result<(CString, Vec<CString>)> {
    let Some(first) = argv.first() else {
        return Err(Error::Exec {
            program: String::new(),
            err: Errno::EINVAL,
        });
    };

    let args = argv
        .iter()
        .map(|arg| CString::new(arg.as_bytes()))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| Error::Exec {
            program: first.to_string_lossy().into_owned(),
            err: Errno::EINVAL,
        })?;

    Ok((args[0].clone(), args))
}

fn apply_environment(target: &Identity, policy: EnvPolicy) {
    let current: Vec<(OsString, OsString)> = env::vars_os().collect();

    for (key, _) in &current {
        env::remove_var(key);
    }
    for (key, value) in environment(target, policy, current) {
        env::set_var(key, value);
    }
}

/// The environment the launched command receives.
#[must_use]
pub fn environment(
    target: &Identity,
    policy: EnvPolicy,
    current: Vec<(OsString, OsString)>,
) -> Vec<(OsString, OsString)> {
    let home = (OsString::from("HOME"), target.home.clone().into_os_string());

    match policy {
        EnvPolicy::Inherit => current
            .into_iter()
            .filter(|(key, _)| key != "HOME")
            .chain(std::iter::once(home))
            .collect(),
        EnvPolicy::Clear => {
            let term = current.into_iter().find(|(key, _)| key == "TERM");

            [
                home,
                ("USER".into(), target.name.clone().into()),
                ("LOGNAME".into(), target.name.clone().into()),
                ("SHELL".into(), target.shell.clone().into_os_string()),
                ("PATH".into(), SECURE_PATH.into()),
            ]
            .into_iter()
            .chain(term)
            .collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{collections::HashMap, os::unix::ffi::OsStringExt};

    fn root() -> Identity {
        Identity {
            uid: Uid::from_raw(0),
            gid: Gid::from_raw(0),
            name: "root".to_string(),
            home: "/root".into(),
            shell: "/bin/bash".into(),
        }
    }

    fn caller_env() -> Vec<(OsString, OsString)> {
        [
            ("HOME", "/home/alice"),
            ("PATH", "/home/alice/bin:/usr/bin"),
            ("TERM", "xterm-256color"),
            ("LD_PRELOAD", "/tmp/evil.so"),
        ]
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
    }

    fn as_map(env: Vec<(OsString, OsString)>) -> HashMap<String, String> {
        env.into_iter()
            .map(|(k, v)| (k.into_string().unwrap(), v.into_string().unwrap()))
            .collect()
    }

    #[test]
    fn test_inherit_only_replaces_home() {
        let env = environment(&root(), EnvPolicy::Inherit, caller_env());
        assert_eq!(env.iter().filter(|(k, _)| k == "HOME").count(), 1);

        let env = as_map(env);
        assert_eq!(env["HOME"], "/root");
        assert_eq!(env["PATH"], "/home/alice/bin:/usr/bin");
        assert_eq!(env["LD_PRELOAD"], "/tmp/evil.so");
        assert_eq!(env.len(), 4);
    }

    #[test]
    fn test_inherit_sets_home_when_absent() {
        let env = as_map(environment(&root(), EnvPolicy::Inherit, Vec::new()));
        assert_eq!(env["HOME"], "/root");
    }

    #[test]
    fn test_clear_rebuilds() {
        let env = as_map(environment(&root(), EnvPolicy::Clear, caller_env()));
        assert_eq!(env["HOME"], "/root");
        assert_eq!(env["USER"], "root");
        assert_eq!(env["LOGNAME"], "root");
        assert_eq!(env["SHELL"], "/bin/bash");
        assert_eq!(env["PATH"], SECURE_PATH);
        assert_eq!(env["TERM"], "xterm-256color");
        assert!(!env.contains_key("LD_PRELOAD"));
    }

    #[test]
    fn test_command_conversion() {
        let argv: Vec<OsString> = vec!["ls".into(), "-la".into()];
        let (program, args) = command(&argv).unwrap();
        assert_eq!(program.to_str().unwrap(), "ls");
        assert_eq!(args.len(), 2);
    }

    #[test]
    fn test_command_keeps_non_utf8_arguments() {
        let argv = vec![
            OsString::from("rm"),
            OsString::from_vec(b"caf\xe9.txt".to_vec()),
        ];
        let (_, args) = command(&argv).unwrap();
        assert_eq!(args[1].as_bytes(), b"caf\xe9.txt");
    }

    #[test]
    fn test_command_rejects_nul_and_empty() {
        assert!(matches!(
            command(&[OsString::from("a\0b")]),
            Err(Error::Exec { err: Errno::EINVAL, .. })
        ));
        assert!(matches!(command(&[]), Err(Error::Exec { .. })));
    }

    /// Records the order of credential calls, optionally failing one.
    #[derive(Default)]
    struct Recorder {
        calls: Vec<&'static str>,
        fail: Option<&'static str>,
    }

    impl Recorder {
        fn call(&mut self, step: &'static str) -> nix::Result<()> {
            self.calls.push(step);
            if self.fail == Some(step) {
                return Err(Errno::EPERM);
            }
            Ok(())
        }
    }

    impl ProcessCredentials for Recorder {
        fn initgroups(&mut self, user: &CStr, gid: Gid) -> nix::Result<()> {
            assert_eq!(user.to_str().unwrap(), "root");
            assert_eq!(gid, Gid::from_raw(0));
            self.call("initgroups")
        }

        fn setgid(&mut self, gid: Gid) -> nix::Result<()> {
            assert_eq!(gid, Gid::from_raw(0));
            self.call("setgid")
        }

        fn setuid(&mut self, uid: Uid) -> nix::Result<()> {
            assert_eq!(uid, Uid::from_raw(0));
            self.call("setuid")
        }
    }

    #[test]
    fn test_drop_sets_gid_before_uid() {
        let mut process = Recorder::default();
        drop_with(&mut process, &root()).unwrap();
        assert_eq!(process.calls, vec!["initgroups", "setgid", "setuid"]);
    }

    #[test]
    fn test_drop_stops_at_failed_setgid() {
        let mut process = Recorder {
            fail: Some("setgid"),
            ..Recorder::default()
        };
        let err = drop_with(&mut process, &root()).unwrap_err();
        assert!(matches!(
            err,
            Error::PrivilegeDrop {
                step: "setgid",
                err: Errno::EPERM
            }
        ));
        assert_eq!(process.calls, vec!["initgroups", "setgid"]);
    }
}
