pub mod logging;

use clap::{
    builder::styling::{AnsiColor, Effects, Styles},
    value_parser, Arg, ColorChoice, Command,
};
use std::ffi::OsString;

pub const ARG_COMMAND: &str = "command";

/// `rdo <command> [args...]`. There are no flags: everything after the
/// binary name belongs to the launched command, byte for byte. A leading
/// `--` is taken as end of options and not passed on.
#[must_use]
pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    Command::new("rdo")
        .about(env!("CARGO_PKG_DESCRIPTION"))
        .version(env!("CARGO_PKG_VERSION"))
        .color(ColorChoice::Auto)
        .styles(styles)
        .disable_help_flag(true)
        .disable_version_flag(true)
        .arg(
            Arg::new(ARG_COMMAND)
                .help("Command to run as root, followed by its arguments")
                .value_parser(value_parser!(OsString))
                .num_args(1..)
                .trailing_var_arg(true)
                .allow_hyphen_values(true),
        )
}
