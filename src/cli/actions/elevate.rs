use crate::rdo::{
    config::ConfigFile,
    credential::ThreadSleeper,
    group::SystemGroups,
    identity::{Identity, SystemUsers},
    launcher::{ExecLauncher, Launcher},
    prompt::TtyPrompt,
    session::{FileSessionStore, SESSION_DIR},
    shadow::ShadowDatabase,
    Authority, Invocation,
};
use anyhow::Result;
use nix::unistd::{geteuid, getppid, getuid};
use std::{ffi::OsString, io};
use tracing::debug;

#[derive(Debug)]
pub struct Args {
    pub argv: Vec<OsString>,
}

/// Decide, then become root and exec `args.argv`. Only returns on failure.
///
/// # Errors
/// Returns the rejection or failure that stopped the elevation.
pub fn execute(args: Args) -> Result<()> {
    let invocation = Invocation {
        real_uid: getuid(),
        effective_uid: geteuid(),
        parent: getppid(),
    };

    let config = ConfigFile::default();
    let sessions = FileSessionStore::new(SESSION_DIR);
    let mut prompt = TtyPrompt;
    let mut sleeper = ThreadSleeper;
    let mut stderr = io::stderr();

    let decision = Authority {
        config: &config,
        users: &SystemUsers,
        groups: &SystemGroups,
        sessions: &sessions,
        credentials: &ShadowDatabase,
        prompt: &mut prompt,
        sleeper: &mut sleeper,
        notices: &mut stderr,
    }
    .decide(&invocation)?;

    debug!(grant = ?decision.grant, "elevation granted");

    let target = Identity::superuser()?;

    match ExecLauncher.launch(&target, &args.argv, decision.env_policy)? {}
}
