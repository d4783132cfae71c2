use crate::rdo::error::{Error, Result};
use libc::c_int;
use nix::sys::{
    signal::{raise, sigaction, SaFlags, SigAction, SigHandler, SigSet, Signal},
    termios::{tcgetattr, tcsetattr, LocalFlags, SetArg, Termios},
};
use secrecy::{
    zeroize::{Zeroize, Zeroizing},
    SecretBox,
};
use std::{
    fs::{File, OpenOptions},
    io::{self, Read, Write},
    mem,
    sync::atomic::{AtomicI32, Ordering},
};
use tracing::debug;

pub const PROMPT: &str = "(rdo) Password: ";

const TTY_PATH: &str = "/dev/tty";

/// Longest accepted secret in bytes; the rest of a longer line is discarded.
pub const MAX_SECRET_LEN: usize = 1024;

/// A secret as typed: raw bytes, no encoding assumed. Zeroized on drop.
pub type Secret = SecretBox<Vec<u8>>;

/// Signals that would otherwise leave the terminal without echo.
const FORWARDED: [Signal; 9] = [
    Signal::SIGALRM,
    Signal::SIGHUP,
    Signal::SIGINT,
    Signal::SIGPIPE,
    Signal::SIGQUIT,
    Signal::SIGTERM,
    Signal::SIGTSTP,
    Signal::SIGTTIN,
    Signal::SIGTTOU,
];

static CAUGHT: AtomicI32 = AtomicI32::new(0);

/// Source of the caller's secret. Blocks without a timeout.
pub trait SecretPrompt {
    /// # Errors
    /// Returns [`Error::Prompt`] if no secret could be read at all.
    fn read_secret(&mut self) -> Result<Secret>;
}

/// Non-echoing prompt on the controlling terminal.
#[derive(Debug, Default)]
pub struct TtyPrompt;

impl SecretPrompt for TtyPrompt {
    fn read_secret(&mut self) -> Result<Secret> {
        let mut tty = OpenOptions::new()
            .read(true)
            .write(true)
            .open(TTY_PATH)
            .map_err(Error::Prompt)?;

        loop {
            tty.write_all(PROMPT.as_bytes()).map_err(Error::Prompt)?;
            tty.flush().map_err(Error::Prompt)?;

            let signals = SignalGuard::install().map_err(|e| Error::Prompt(e.into()))?;
            let echo = EchoGuard::disable(&tty).map_err(Error::Prompt)?;
            let line = read_line(&mut &tty);
            drop(echo);
            drop(signals);

            // the newline was swallowed together with the echo
            let _ = tty.write_all(b"\n");

            let Some(signal) = take_caught() else {
                return line.map_err(Error::Prompt);
            };

            // terminal and dispositions are back, deliver it for real
            debug!(%signal, "signal at the password prompt");
            drop(line);
            let _ = raise(signal);

            // only job control survives the raise; ask again once resumed
            if !matches!(
                signal,
                Signal::SIGTSTP | Signal::SIGTTIN | Signal::SIGTTOU
            ) {
                return Err(Error::Prompt(io::ErrorKind::Interrupted.into()));
            }
        }
    }
}

/// Restores the saved terminal attributes on every exit path.
struct EchoGuard<'a> {
    tty: &'a File,
    saved: Termios,
}

impl<'a> EchoGuard<'a> {
    fn disable(tty: &'a File) -> io::Result<Self> {
        let saved = tcgetattr(tty)?;
        let mut silent = saved.clone();
        silent.local_flags.remove(LocalFlags::ECHO);
        silent.local_flags.insert(LocalFlags::ICANON);
        tcsetattr(tty, SetArg::TCSAFLUSH, &silent)?;
        Ok(Self { tty, saved })
    }
}

impl Drop for EchoGuard<'_> {
    fn drop(&mut self) {
        let _ = tcsetattr(self.tty, SetArg::TCSAFLUSH, &self.saved);
    }
}

extern "C" fn remember(signo: c_int) {
    CAUGHT.store(signo, Ordering::SeqCst);
}

fn take_caught() -> Option<Signal> {
    Signal::try_from(CAUGHT.swap(0, Ordering::SeqCst)).ok()
}

fn caught() -> bool {
    CAUGHT.load(Ordering::SeqCst) != 0
}

/// Catches [`FORWARDED`] signals while the prompt is live so the terminal can
/// be restored before they take effect. No `SA_RESTART`: a blocked `read`
/// returns `EINTR`.
struct SignalGuard {
    previous: Vec<(Signal, SigAction)>,
}

impl SignalGuard {
    fn install() -> nix::Result<Self> {
        CAUGHT.store(0, Ordering::SeqCst);

        let action = SigAction::new(
            SigHandler::Handler(remember),
            SaFlags::empty(),
            SigSet::empty(),
        );

        let mut guard = Self {
            previous: Vec::with_capacity(FORWARDED.len()),
        };
        for signal in FORWARDED {
            // SAFETY: `remember` only stores into an atomic.
            let old = unsafe { sigaction(signal, &action) }?;
            guard.previous.push((signal, old));
        }

        Ok(guard)
    }
}

impl Drop for SignalGuard {
    fn drop(&mut self) {
        for (signal, old) in self.previous.drain(..).rev() {
            // SAFETY: reinstates the disposition that was in place before.
            let _ = unsafe { sigaction(signal, &old) };
        }
    }
}

/// Read one line byte by byte into a buffer that never reallocates, so no
/// unzeroized copy of the secret is left behind. EOF before the first byte
/// is an error, EOF later ends the line. A caught signal aborts the read.
fn read_line(input: &mut impl Read) -> io::Result<Secret> {
    let mut buf = Zeroizing::new(Vec::with_capacity(MAX_SECRET_LEN));
    let mut byte = [0_u8; 1];

    let outcome = loop {
        match input.read(&mut byte) {
            Ok(0) if buf.is_empty() => {
                break Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "no input available",
                ))
            }
            Ok(0) => break Ok(()),
            Ok(_) if byte[0] == b'\n' => break Ok(()),
            Ok(_) if buf.len() < MAX_SECRET_LEN => buf.push(byte[0]),
            Ok(_) => {}
            Err(e) if e.kind() == io::ErrorKind::Interrupted && !caught() => {}
            Err(e) => break Err(e),
        }
    };
    byte.zeroize();
    outcome?;

    if buf.last() == Some(&b'\r') {
        buf.pop();
    }

    Ok(SecretBox::new(Box::new(mem::take(&mut *buf))))
}
