use anyhow::Result;
use std::{
    env,
    io::{self, Write},
};

/// Name, version and usage; the only path that exits 0.
///
/// # Errors
/// Returns an error if standard output is not writable.
pub fn execute() -> Result<()> {
    let program = env::args_os()
        .next()
        .map_or_else(|| "rdo".to_string(), |arg0| arg0.to_string_lossy().into_owned());

    let mut out = io::stdout().lock();
    write_banner(&mut out, &program)?;
    out.flush()?;

    Ok(())
}

fn write_banner(out: &mut impl Write, program: &str) -> io::Result<()> {
    let short_hash = if crate::GIT_COMMIT_HASH.len() > 7 {
        &crate::GIT_COMMIT_HASH[0..7]
    } else {
        crate::GIT_COMMIT_HASH
    };

    writeln!(
        out,
        "RootDO version: {} ({short_hash})\n",
        env!("CARGO_PKG_VERSION")
    )?;
    writeln!(out, "Usage: {program} [command]")?;

    Ok(())
}
