use crate::cli::actions::{banner, elevate, Action};
use anyhow::Result;

/// Execute the provided action.
// This is the single dispatch point for all CLI actions.
/// # Errors
/// Returns an error if the action fails.
pub fn execute(action: Action) -> Result<()> {
    match action {
        Action::Banner => banner::execute(),
        Action::Elevate(args) => elevate::execute(args),
    }
}
