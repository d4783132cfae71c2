pub mod banner;
pub mod elevate;

// Internal "interpreter" for `Action`.
// We keep the match in a separate module so `mod.rs` stays small as more actions are added.
mod run;

#[derive(Debug)]
pub enum Action {
    Banner,
    Elevate(elevate::Args),
}

impl Action {
    /// Execute the action. `Elevate` only returns on failure.
    /// # Errors
    /// Returns an error if the action fails.
    pub fn execute(self) -> anyhow::Result<()> {
        run::execute(self)
    }
}
