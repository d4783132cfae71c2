use crate::cli::{
    actions::{elevate::Args, Action},
    commands::ARG_COMMAND,
};
use anyhow::Result;
use std::ffi::OsString;

/// Map validated CLI matches to an action.
///
/// # Errors
/// Currently infallible; kept fallible like every other dispatch step.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let argv: Vec<OsString> = matches
        .get_many::<OsString>(ARG_COMMAND)
        .map(|values| values.cloned().collect())
        .unwrap_or_default();

    if argv.is_empty() {
        return Ok(Action::Banner);
    }

    Ok(Action::Elevate(Args { argv }))
}
