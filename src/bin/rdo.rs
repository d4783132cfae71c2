use rdo::cli;
use std::process::ExitCode;

// Main function
fn main() -> ExitCode {
    // Start the program and handle the action; a successful elevation never returns
    match cli::start().and_then(|action| action.execute()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("rdo: {err:#}");
            ExitCode::FAILURE
        }
    }
}
